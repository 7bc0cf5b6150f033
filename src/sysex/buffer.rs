//! Reassembly of sysex frames delivered in chunks

use crate::midi::{SYSEX_END, SYSEX_START};
use bytes::{Bytes, BytesMut};
use tracing::warn;

/// Largest frame accepted from the editor (file uploads included)
pub const MAX_SYSEX_SIZE: usize = 512 * 1024;

/// Collects chunks until the frame is complete
#[derive(Debug)]
pub struct SysexBuffer {
    buf: BytesMut,
    limit: usize,
    /// Set after an overflow; the rest of that frame is ignored
    discarding: bool,
}

impl Default for SysexBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_SYSEX_SIZE)
    }
}

impl SysexBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            limit,
            discarding: false,
        }
    }

    /// Append a chunk. Returns the whole frame once `complete` is seen.
    pub fn push(&mut self, data: &[u8], complete: bool) -> Option<Bytes> {
        if data.first() == Some(&SYSEX_START) {
            self.buf.clear();
            self.discarding = false;
        }

        if !self.discarding {
            if self.buf.len() + data.len() > self.limit {
                warn!("Sysex frame exceeds {} bytes, dropped", self.limit);
                self.buf.clear();
                self.discarding = true;
            } else {
                self.buf.extend_from_slice(data);
            }
        }

        if !complete {
            return None;
        }
        if self.discarding {
            self.discarding = false;
            return None;
        }

        let frame = self.buf.split().freeze();
        if frame.first() != Some(&SYSEX_START) || frame.last() != Some(&SYSEX_END) {
            warn!("Incomplete sysex frame of {} bytes dropped", frame.len());
            return None;
        }
        Some(frame)
    }

    /// Bytes of the frame received so far
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
