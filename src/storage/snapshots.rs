//! Snapshot store - metadata records plus one payload file per slot
//!
//! Each project gets its own directory:
//!
//! ```text
//! <root>/<projectId>/snapshots.db          432 records of 20 bytes
//! <root>/<projectId>/snapshot-<bank>-<slot>.bin
//! ```
//!
//! Listing only reads the record store; payload files are opened on load.

use super::database::Database;
use super::{io_error, remove_file_if_exists, write_atomic, StorageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SNAPSHOT_BANKS: u8 = 12;
pub const SNAPSHOT_SLOTS: u8 = 36;
pub const NUM_SNAPSHOTS: u16 = SNAPSHOT_BANKS as u16 * SNAPSHOT_SLOTS as u16;
/// bank, slot, rgb, 14-byte name, one reserved byte
pub const RECORD_SIZE: u16 = 20;

const NAME_LEN: usize = 14;
const DB_FILE: &str = "snapshots.db";
const MAX_PROJECT_ID_LEN: usize = 20;

/// Metadata of one stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub bank_number: u8,
    pub slot: u8,
    pub name: String,
    /// 0xRRGGBB
    pub color: u32,
}

impl SnapshotRecord {
    pub fn new(bank_number: u8, slot: u8, name: &str, color: u32) -> Self {
        Self {
            bank_number,
            slot,
            name: truncate_name(name),
            color: color & 0xFF_FFFF,
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE as usize] {
        let mut out = [0u8; RECORD_SIZE as usize];
        out[0] = self.bank_number;
        out[1] = self.slot;
        out[2] = (self.color >> 16) as u8;
        out[3] = (self.color >> 8) as u8;
        out[4] = self.color as u8;
        let name = truncate_name(&self.name);
        out[5..5 + name.len()].copy_from_slice(name.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let byte = |i: usize| bytes.get(i).copied().unwrap_or(0);
        let name_bytes: Vec<u8> = bytes
            .iter()
            .skip(5)
            .take(NAME_LEN)
            .take_while(|b| **b != 0)
            .copied()
            .collect();
        Self {
            bank_number: byte(0),
            slot: byte(1),
            name: String::from_utf8_lossy(&name_bytes).into_owned(),
            color: u32::from(byte(2)) << 16 | u32::from(byte(3)) << 8 | u32::from(byte(4)),
        }
    }

    /// Same record placed at another location
    pub fn relocated(&self, bank_number: u8, slot: u8) -> Self {
        Self {
            bank_number,
            slot,
            ..self.clone()
        }
    }
}

/// Longest prefix of `name` that fits the record, on a char boundary
fn truncate_name(name: &str) -> String {
    let mut end = 0;
    for (i, c) in name.char_indices() {
        if i + c.len_utf8() > NAME_LEN {
            break;
        }
        end = i + c.len_utf8();
    }
    name[..end].to_string()
}

/// `"RRGGBB"` (optionally `#`-prefixed) to 0xRRGGBB; white when unparsable
pub fn parse_color(text: &str) -> u32 {
    u32::from_str_radix(text.trim().trim_start_matches('#'), 16)
        .map(|c| c & 0xFF_FFFF)
        .unwrap_or(0xFF_FFFF)
}

pub fn format_color(color: u32) -> String {
    format!("{:06X}", color & 0xFF_FFFF)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotList<'a> {
    version: u8,
    project_id: &'a str,
    snapshots: Vec<SnapshotListEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotListEntry {
    slot: u8,
    bank_number: u8,
    name: String,
    color: String,
}

/// Uploaded set of snapshots with hex-encoded payloads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotBundle {
    pub project_id: String,
    pub snapshots: Vec<SnapshotBundleEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotBundleEntry {
    pub bank_number: u8,
    pub slot: u8,
    pub name: String,
    pub color: String,
    pub data: String,
}

/// Snapshots of one project
#[derive(Debug)]
pub struct SnapshotStore {
    pub(super) dir: PathBuf,
    project_id: String,
    pub(super) db: Database,
}

impl SnapshotStore {
    /// Open the project's store under `root`, creating it on first use and
    /// completing any swap that was interrupted
    pub fn open(root: impl AsRef<Path>, project_id: &str) -> Result<Self, StorageError> {
        validate_project_id(project_id)?;
        let dir = root.as_ref().join(project_id);
        std::fs::create_dir_all(&dir).map_err(io_error(&dir))?;

        let db = Database::open_or_create(dir.join(DB_FILE), NUM_SNAPSHOTS, RECORD_SIZE)?;
        let store = Self {
            dir,
            project_id: project_id.to_string(),
            db,
        };
        store.recover_swap()?;

        debug!("Snapshot store open for project '{}'", project_id);
        Ok(store)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record id of a bank/slot pair
    pub fn snapshot_id(bank: u8, slot: u8) -> Result<u16, StorageError> {
        if bank >= SNAPSHOT_BANKS || slot >= SNAPSHOT_SLOTS {
            return Err(StorageError::InvalidSlot { bank, slot });
        }
        Ok(u16::from(bank) * u16::from(SNAPSHOT_SLOTS) + u16::from(slot))
    }

    pub fn slot_path(&self, bank: u8, slot: u8) -> PathBuf {
        self.dir.join(format!("snapshot-{}-{}.bin", bank, slot))
    }

    pub fn info(&self, bank: u8, slot: u8) -> Result<Option<SnapshotRecord>, StorageError> {
        let id = Self::snapshot_id(bank, slot)?;
        Ok(self.db.select(id)?.map(|bytes| SnapshotRecord::from_bytes(&bytes)))
    }

    /// Store a payload and its metadata, replacing any previous snapshot
    pub fn save(
        &self,
        bank: u8,
        slot: u8,
        name: &str,
        color: u32,
        payload: &[u8],
    ) -> Result<SnapshotRecord, StorageError> {
        let id = Self::snapshot_id(bank, slot)?;
        write_atomic(&self.slot_path(bank, slot), payload)?;
        let record = SnapshotRecord::new(bank, slot, name, color);
        self.db.update(id, &record.to_bytes())?;
        info!("Snapshot saved: bank {} slot {} '{}'", bank, slot, record.name);
        Ok(record)
    }

    /// Payload of an occupied slot
    pub fn load(&self, bank: u8, slot: u8) -> Result<Vec<u8>, StorageError> {
        if self.info(bank, slot)?.is_none() {
            return Err(StorageError::EmptySlot { bank, slot });
        }
        let path = self.slot_path(bank, slot);
        std::fs::read(&path).map_err(io_error(&path))
    }

    /// Change name and colour of an occupied slot without touching the payload
    pub fn update_info(
        &self,
        bank: u8,
        slot: u8,
        name: &str,
        color: u32,
    ) -> Result<SnapshotRecord, StorageError> {
        let id = Self::snapshot_id(bank, slot)?;
        if self.db.select(id)?.is_none() {
            return Err(StorageError::EmptySlot { bank, slot });
        }
        let record = SnapshotRecord::new(bank, slot, name, color);
        self.db.update(id, &record.to_bytes())?;
        Ok(record)
    }

    pub fn remove(&self, bank: u8, slot: u8) -> Result<(), StorageError> {
        let id = Self::snapshot_id(bank, slot)?;
        self.db.remove(id)?;
        remove_file_if_exists(&self.slot_path(bank, slot))?;
        info!("Snapshot removed: bank {} slot {}", bank, slot);
        Ok(())
    }

    /// Occupied slots in id order
    pub fn list(&self) -> Result<Vec<SnapshotRecord>, StorageError> {
        let mut records = Vec::new();
        for id in 0..self.db.num_records() {
            if let Some(bytes) = self.db.select(id)? {
                records.push(SnapshotRecord::from_bytes(&bytes));
            }
        }
        Ok(records)
    }

    /// Listing document sent to the editor
    pub fn list_json(&self) -> Result<String, StorageError> {
        let snapshots = self
            .list()?
            .into_iter()
            .map(|r| SnapshotListEntry {
                slot: r.slot,
                bank_number: r.bank_number,
                color: format_color(r.color),
                name: r.name,
            })
            .collect();
        let list = SnapshotList {
            version: 1,
            project_id: &self.project_id,
            snapshots,
        };
        Ok(serde_json::to_string(&list)?)
    }

    /// Store every valid entry of a bundle. Returns how many were imported.
    ///
    /// All payloads are decoded before the first write, so a bundle with a
    /// corrupt entry leaves the store untouched.
    pub fn import(&self, bundle: &SnapshotBundle) -> Result<usize, StorageError> {
        let mut decoded = Vec::with_capacity(bundle.snapshots.len());
        for entry in &bundle.snapshots {
            if Self::snapshot_id(entry.bank_number, entry.slot).is_err() {
                warn!(
                    "Skipping imported snapshot at bank {} slot {}",
                    entry.bank_number, entry.slot
                );
                continue;
            }
            decoded.push((entry, hex::decode(entry.data.trim())?));
        }

        for (entry, payload) in &decoded {
            self.save(
                entry.bank_number,
                entry.slot,
                &entry.name,
                parse_color(&entry.color),
                payload,
            )?;
        }
        info!("Imported {} snapshots into '{}'", decoded.len(), self.project_id);
        Ok(decoded.len())
    }
}

/// Project ids become directory names: ASCII letters, digits, `-` and `_`
pub fn validate_project_id(project_id: &str) -> Result<(), StorageError> {
    let valid = !project_id.is_empty()
        && project_id.len() <= MAX_PROJECT_ID_LEN
        && project_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidProjectId(project_id.to_string()))
    }
}
