//! Fixed-slot record store
//!
//! Layout: a 4-byte header (record count u16 LE, record size u16 LE)
//! followed by `count` slots of one presence byte plus `size` payload
//! bytes. Removing a record clears only its presence byte.

use super::{io_error, StorageError};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const HEADER_SIZE: u64 = 4;

#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    num_records: u16,
    record_size: u16,
}

impl Database {
    /// Create (or truncate) a store of `num_records` zero-filled slots
    pub fn create(
        path: impl AsRef<Path>,
        num_records: u16,
        record_size: u16,
    ) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path).map_err(io_error(&path))?;

        let mut header = Vec::with_capacity(HEADER_SIZE as usize);
        header.extend_from_slice(&num_records.to_le_bytes());
        header.extend_from_slice(&record_size.to_le_bytes());
        file.write_all(&header).map_err(io_error(&path))?;

        let extent = num_records as usize * (record_size as usize + 1);
        file.write_all(&vec![0u8; extent]).map_err(io_error(&path))?;
        file.sync_all().map_err(io_error(&path))?;

        debug!(
            "Created record store {} ({} x {} bytes)",
            path.display(),
            num_records,
            record_size
        );
        Ok(Self {
            path,
            num_records,
            record_size,
        })
    }

    /// Open an existing store, reading its header
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(io_error(&path))?;
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)
            .map_err(|_| StorageError::BadHeader(path.clone()))?;

        let num_records = u16::from_le_bytes([header[0], header[1]]);
        let record_size = u16::from_le_bytes([header[2], header[3]]);
        if record_size == 0 {
            return Err(StorageError::BadHeader(path));
        }

        Ok(Self {
            path,
            num_records,
            record_size,
        })
    }

    /// Open the store, creating it when missing or when its geometry differs
    pub fn open_or_create(
        path: impl AsRef<Path>,
        num_records: u16,
        record_size: u16,
    ) -> Result<Self, StorageError> {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(db) if db.num_records == num_records && db.record_size == record_size => Ok(db),
            _ => Self::create(path, num_records, record_size),
        }
    }

    pub fn num_records(&self) -> u16 {
        self.num_records
    }

    pub fn record_size(&self) -> u16 {
        self.record_size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn offset(&self, id: u16) -> Result<u64, StorageError> {
        if id >= self.num_records {
            return Err(StorageError::OutOfRange {
                id,
                count: self.num_records,
            });
        }
        Ok(HEADER_SIZE + u64::from(id) * (u64::from(self.record_size) + 1))
    }

    /// Record `id`, or `None` when the slot is not in use
    pub fn select(&self, id: u16) -> Result<Option<Vec<u8>>, StorageError> {
        let offset = self.offset(id)?;
        let mut file = File::open(&self.path).map_err(io_error(&self.path))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(io_error(&self.path))?;

        let mut slot = vec![0u8; self.record_size as usize + 1];
        file.read_exact(&mut slot).map_err(io_error(&self.path))?;
        if slot[0] == 0 {
            return Ok(None);
        }
        slot.remove(0);
        Ok(Some(slot))
    }

    /// Write record `id` and mark it present. Short records are zero-padded.
    pub fn update(&self, id: u16, record: &[u8]) -> Result<(), StorageError> {
        if record.len() > self.record_size as usize {
            return Err(StorageError::RecordTooLarge {
                len: record.len(),
                size: self.record_size,
            });
        }
        let offset = self.offset(id)?;

        let mut slot = Vec::with_capacity(self.record_size as usize + 1);
        slot.push(1);
        slot.extend_from_slice(record);
        slot.resize(self.record_size as usize + 1, 0);

        let mut file = self.open_rw()?;
        file.seek(SeekFrom::Start(offset))
            .map_err(io_error(&self.path))?;
        file.write_all(&slot).map_err(io_error(&self.path))
    }

    /// Soft delete: clears the presence byte, payload bytes stay on disk
    pub fn remove(&self, id: u16) -> Result<(), StorageError> {
        let offset = self.offset(id)?;
        let mut file = self.open_rw()?;
        file.seek(SeekFrom::Start(offset))
            .map_err(io_error(&self.path))?;
        file.write_all(&[0]).map_err(io_error(&self.path))
    }

    fn open_rw(&self) -> Result<File, StorageError> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(io_error(&self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_starts_empty() {
        let dir = TempDir::new().unwrap();
        let db = Database::create(dir.path().join("t.db"), 10, 8).unwrap();
        for id in 0..10 {
            assert_eq!(db.select(id).unwrap(), None);
        }
        let len = std::fs::metadata(db.path()).unwrap().len();
        assert_eq!(len, HEADER_SIZE + 10 * 9);
    }

    #[test]
    fn test_update_select_remove() {
        let dir = TempDir::new().unwrap();
        let db = Database::create(dir.path().join("t.db"), 4, 4).unwrap();

        db.update(2, &[1, 2, 3, 4]).unwrap();
        assert_eq!(db.select(2).unwrap(), Some(vec![1, 2, 3, 4]));
        assert_eq!(db.select(1).unwrap(), None);
        assert_eq!(db.select(3).unwrap(), None);

        db.update(3, &[9]).unwrap();
        assert_eq!(db.select(3).unwrap(), Some(vec![9, 0, 0, 0]));

        db.remove(2).unwrap();
        assert_eq!(db.select(2).unwrap(), None);

        // payload bytes survive a soft delete
        let raw = std::fs::read(db.path()).unwrap();
        let offset = (HEADER_SIZE + 2 * 5) as usize;
        assert_eq!(&raw[offset..offset + 5], &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_bounds() {
        let dir = TempDir::new().unwrap();
        let db = Database::create(dir.path().join("t.db"), 2, 2).unwrap();
        assert!(matches!(db.select(2), Err(StorageError::OutOfRange { id: 2, count: 2 })));
        assert!(matches!(
            db.update(0, &[1, 2, 3]),
            Err(StorageError::RecordTooLarge { len: 3, size: 2 })
        ));
    }

    #[test]
    fn test_reopen_reads_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.db");
        Database::create(&path, 7, 3).unwrap().update(6, &[5, 5, 5]).unwrap();

        let db = Database::open(&path).unwrap();
        assert_eq!(db.num_records(), 7);
        assert_eq!(db.record_size(), 3);
        assert_eq!(db.select(6).unwrap(), Some(vec![5, 5, 5]));

        let db = Database::open_or_create(&path, 8, 3).unwrap();
        assert_eq!(db.num_records(), 8);
        assert_eq!(db.select(6).unwrap(), None);
    }
}
