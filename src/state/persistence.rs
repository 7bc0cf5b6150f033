//! Registry persistence to compact binary blobs
//!
//! A snapshot payload is the whole registry: every address that holds a
//! value, packed little-endian behind a short header.
//!
//! ```text
//! "ESNP" | version u8 | count u16 | count x (device u8, kind u8, number u16, value u16)
//! ```

use super::store::ParameterMap;
use super::types::{Origin, WireKey};
use crate::codec::MessageKind;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;
use tracing::{debug, warn};

const MAGIC: &[u8; 4] = b"ESNP";
const ENTRY_SIZE: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlobError {
    #[error("snapshot blob too short ({0} bytes)")]
    Truncated(usize),
    #[error("not a snapshot blob")]
    BadMagic,
    #[error("unsupported snapshot blob version {0}")]
    Version(u8),
}

/// Current blob format version
pub const BLOB_VERSION: u8 = 1;

impl ParameterMap {
    /// Serialize every stored value
    pub fn save_state(&self) -> Bytes {
        let values: Vec<(WireKey, u16)> = self
            .values()
            .filter(|(key, _)| key.kind != MessageKind::None)
            .collect();
        let count = values.len().min(u16::MAX as usize);

        let mut buf = BytesMut::with_capacity(MAGIC.len() + 3 + count * ENTRY_SIZE);
        buf.put_slice(MAGIC);
        buf.put_u8(BLOB_VERSION);
        buf.put_u16_le(count as u16);
        for (key, value) in values.into_iter().take(count) {
            buf.put_u8(key.device_id);
            buf.put_u8(key.kind.to_byte());
            buf.put_u16_le(key.parameter_number);
            buf.put_u16_le(value);
        }
        buf.freeze()
    }

    /// Load values from a blob, tagging each change with `origin`.
    ///
    /// Returns the addresses carried by the blob. Entries with an unknown
    /// message kind are skipped.
    pub fn load_state(&mut self, blob: &[u8], origin: Origin) -> Result<Vec<WireKey>, BlobError> {
        let mut buf = blob;
        if buf.remaining() < MAGIC.len() + 3 {
            return Err(BlobError::Truncated(blob.len()));
        }
        if &buf[..MAGIC.len()] != MAGIC {
            return Err(BlobError::BadMagic);
        }
        buf.advance(MAGIC.len());
        let version = buf.get_u8();
        if version != BLOB_VERSION {
            return Err(BlobError::Version(version));
        }
        let count = buf.get_u16_le() as usize;
        if buf.remaining() < count * ENTRY_SIZE {
            return Err(BlobError::Truncated(blob.len()));
        }

        let mut keys = Vec::with_capacity(count);
        for _ in 0..count {
            let device_id = buf.get_u8();
            let kind_byte = buf.get_u8();
            let parameter_number = buf.get_u16_le();
            let value = buf.get_u16_le();

            let Some(kind) = MessageKind::from_byte(kind_byte) else {
                warn!("Skipping snapshot entry with unknown kind 0x{:02X}", kind_byte);
                continue;
            };
            let key = WireKey::new(device_id, kind, parameter_number);
            self.set_value(key, value, origin);
            keys.push(key);
        }

        debug!("Loaded {} registry values ({})", keys.len(), origin);
        Ok(keys)
    }
}
