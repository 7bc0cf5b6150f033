//! Preset library and uploaded side files

use super::{io_error, remove_file_if_exists, write_atomic, StorageError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const PRESET_BANKS: u8 = 6;
pub const PRESET_SLOTS: u8 = 12;

const PENDING_CONFIG_FILE: &str = "config.pending.json";

/// Summary of a stored preset for the editor's listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetInfo {
    pub bank_number: u8,
    pub slot: u8,
    pub name: String,
    pub project_id: String,
}

/// Only the fields needed for a listing; everything else is ignored
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PresetHeader {
    name: String,
    project_id: String,
}

#[derive(Serialize)]
struct PresetList<'a> {
    version: u8,
    presets: &'a [PresetInfo],
}

/// Preset files under `<root>/presets`
#[derive(Debug, Clone)]
pub struct PresetLibrary {
    root: PathBuf,
}

impl PresetLibrary {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn presets_dir(&self) -> PathBuf {
        self.root.join("presets")
    }

    fn check_slot(bank: u8, slot: u8) -> Result<(), StorageError> {
        if bank >= PRESET_BANKS || slot >= PRESET_SLOTS {
            return Err(StorageError::InvalidSlot { bank, slot });
        }
        Ok(())
    }

    pub fn preset_path(&self, bank: u8, slot: u8) -> PathBuf {
        self.presets_dir().join(format!("{}-{}.json", bank, slot))
    }

    pub fn script_path(&self, bank: u8, slot: u8) -> PathBuf {
        self.presets_dir().join(format!("{}-{}.lua", bank, slot))
    }

    pub fn pending_config_path(&self) -> PathBuf {
        self.root.join(PENDING_CONFIG_FILE)
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        let dir = self.presets_dir();
        std::fs::create_dir_all(&dir).map_err(io_error(&dir))
    }

    pub fn save_preset(&self, bank: u8, slot: u8, data: &[u8]) -> Result<(), StorageError> {
        Self::check_slot(bank, slot)?;
        self.ensure_dir()?;
        write_atomic(&self.preset_path(bank, slot), data)?;
        info!("Preset stored in bank {} slot {} ({} bytes)", bank, slot, data.len());
        Ok(())
    }

    /// Raw preset document, `None` when the slot is empty
    pub fn load_preset(&self, bank: u8, slot: u8) -> Result<Option<Vec<u8>>, StorageError> {
        Self::check_slot(bank, slot)?;
        let path = self.preset_path(bank, slot);
        match std::fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    pub fn remove_preset(&self, bank: u8, slot: u8) -> Result<(), StorageError> {
        Self::check_slot(bank, slot)?;
        remove_file_if_exists(&self.preset_path(bank, slot))?;
        remove_file_if_exists(&self.script_path(bank, slot))
    }

    /// Scripts are stored next to their preset and never executed here
    pub fn save_script(&self, bank: u8, slot: u8, data: &[u8]) -> Result<(), StorageError> {
        Self::check_slot(bank, slot)?;
        self.ensure_dir()?;
        write_atomic(&self.script_path(bank, slot), data)?;
        debug!("Script stored for bank {} slot {}", bank, slot);
        Ok(())
    }

    /// Park an uploaded configuration until the next start
    pub fn save_pending_config(&self, data: &[u8]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.root).map_err(io_error(&self.root))?;
        write_atomic(&self.pending_config_path(), data)?;
        info!("Configuration upload stored, applied at next start");
        Ok(())
    }

    /// Pending configuration, removed from disk once taken
    pub fn take_pending_config(&self) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.pending_config_path();
        match std::fs::read(&path) {
            Ok(data) => {
                remove_file_if_exists(&path)?;
                Ok(Some(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    /// Every stored preset in bank/slot order
    pub fn list(&self) -> Result<Vec<PresetInfo>, StorageError> {
        let mut presets = Vec::new();
        for bank in 0..PRESET_BANKS {
            for slot in 0..PRESET_SLOTS {
                let Some(data) = self.load_preset(bank, slot)? else {
                    continue;
                };
                let header: PresetHeader = serde_json::from_slice(&data).unwrap_or_default();
                presets.push(PresetInfo {
                    bank_number: bank,
                    slot,
                    name: header.name,
                    project_id: header.project_id,
                });
            }
        }
        Ok(presets)
    }

    pub fn list_json(&self) -> Result<String, StorageError> {
        let presets = self.list()?;
        Ok(serde_json::to_string(&PresetList {
            version: 1,
            presets: &presets,
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_preset_slots() {
        let dir = TempDir::new().unwrap();
        let lib = PresetLibrary::new(dir.path());
        assert_eq!(lib.load_preset(1, 1).unwrap(), None);

        lib.save_preset(1, 1, br#"{"name":"Juno","projectId":"juno"}"#).unwrap();
        assert!(lib.load_preset(1, 1).unwrap().is_some());
        assert!(lib.save_preset(6, 0, b"{}").is_err());
        assert!(lib.save_preset(0, 12, b"{}").is_err());

        lib.save_preset(0, 3, b"not json").unwrap();
        let list = lib.list().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!((list[0].bank_number, list[0].slot), (0, 3));
        assert_eq!(list[0].name, "");
        assert_eq!(list[1].project_id, "juno");

        lib.remove_preset(1, 1).unwrap();
        assert_eq!(lib.load_preset(1, 1).unwrap(), None);
    }

    #[test]
    fn test_pending_config_is_taken_once() {
        let dir = TempDir::new().unwrap();
        let lib = PresetLibrary::new(dir.path());
        assert_eq!(lib.take_pending_config().unwrap(), None);
        lib.save_pending_config(b"{}").unwrap();
        assert_eq!(lib.take_pending_config().unwrap(), Some(b"{}".to_vec()));
        assert_eq!(lib.take_pending_config().unwrap(), None);
    }

    #[test]
    fn test_list_json() {
        let dir = TempDir::new().unwrap();
        let lib = PresetLibrary::new(dir.path());
        lib.save_preset(2, 4, br#"{"name":"Pad"}"#).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&lib.list_json().unwrap()).unwrap();
        assert_eq!(doc["presets"][0]["bankNumber"], 2);
        assert_eq!(doc["presets"][0]["name"], "Pad");
    }
}
