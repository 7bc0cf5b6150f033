//! Local persistence - snapshot record store, per-slot payloads, presets
//!
//! All I/O is synchronous and runs on the processing loop. Multi-step
//! operations are serialized through [`BusyFlag`].

mod database;
mod guard;
mod presets;
mod snapshots;
mod swap;

pub use database::{Database, HEADER_SIZE};
pub use guard::{BusyFlag, BusyGuard};
pub use presets::{PresetInfo, PresetLibrary, PRESET_BANKS, PRESET_SLOTS};
pub use snapshots::{
    format_color, parse_color, validate_project_id, SnapshotBundle, SnapshotBundleEntry,
    SnapshotRecord, SnapshotStore, NUM_SNAPSHOTS, RECORD_SIZE, SNAPSHOT_BANKS, SNAPSHOT_SLOTS,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record store header in {0}")]
    BadHeader(PathBuf),

    #[error("record {id} out of range (store holds {count})")]
    OutOfRange { id: u16, count: u16 },

    #[error("record of {len} bytes exceeds record size {size}")]
    RecordTooLarge { len: usize, size: u16 },

    #[error("invalid project id '{0}'")]
    InvalidProjectId(String),

    #[error("bank {bank} slot {slot} out of range")]
    InvalidSlot { bank: u8, slot: u8 },

    #[error("bank {bank} slot {slot} is empty")]
    EmptySlot { bank: u8, slot: u8 },

    #[error("storage busy")]
    Busy,

    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot payload: {0}")]
    Payload(#[from] hex::FromHexError),
}

/// Map an I/O error to [`StorageError::Io`] carrying `path`
pub(crate) fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Write `data` to `path` through a temporary sibling and a rename
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, data).map_err(io_error(&tmp))?;
    std::fs::rename(&tmp, path).map_err(io_error(path))
}

/// Delete a file, treating "already gone" as success
pub(crate) fn remove_file_if_exists(path: &Path) -> Result<(), StorageError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(path)(e)),
    }
}
