//! Flush - fan dirty registry entries out to the parameter tree and the wire

use super::Surface;
use crate::codec::wire;
use tracing::trace;

impl Surface {
    /// Process every dirty entry once. Sub-values sharing an address are all
    /// updated; MIDI is generated only for locally originated changes.
    /// Returns the number of entries processed.
    pub fn flush(&mut self) -> usize {
        let dirty = self.registry.take_dirty();
        for entry in &dirty {
            for r in &entry.destinations {
                self.controls.apply_stored(*r, entry.value);
            }

            if !entry.origin.emits_midi() {
                continue;
            }
            let Some(message) = entry
                .destinations
                .first()
                .and_then(|r| self.controls.value(*r))
                .map(|cv| cv.message.clone())
            else {
                continue;
            };
            if message.is_relative() || !message.is_transmitted() {
                continue;
            }
            let Some(channel) = self.device_channel(message.device_id) else {
                continue;
            };
            trace!("Flush {} = {} ({})", entry.key, entry.value, entry.origin);
            let messages = wire::build(&message, entry.value, channel);
            self.send_to_device(message.device_id, messages);
        }
        dirty.len()
    }

    /// Periodic processing step
    pub fn tick(&mut self) -> usize {
        if !self.registry.has_dirty() {
            return 0;
        }
        self.flush()
    }
}
