//! File uploads - preset, script, configuration and snapshot bundles

use super::{Outcome, Surface};
use crate::preset::Preset;
use crate::storage::SnapshotBundle;
use crate::sysex::reply::Event;
use crate::sysex::{CommandError, ElectraCommand};
use tracing::info;

impl Surface {
    /// Store the preset in the current slot, load it and announce the slot
    pub(super) fn upload_preset(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let preset = Preset::parse(&cmd.body)?;
        let (bank, slot) = (self.nav.preset_bank, self.nav.preset_slot);
        {
            let _guard = self.busy.try_acquire().ok_or(CommandError::Busy)?;
            self.library.save_preset(bank, slot, &cmd.body)?;
        }
        self.load_preset(preset);
        self.notify(Event::PresetSlotChanged { bank, slot });
        Ok(Outcome::Ack)
    }

    /// Scripts are kept next to the preset of the current slot
    pub(super) fn upload_script(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let (bank, slot) = (self.nav.preset_bank, self.nav.preset_slot);
        self.library.save_script(bank, slot, &cmd.body)?;
        Ok(Outcome::Ack)
    }

    /// Configuration uploads take effect at the next start
    pub(super) fn upload_configuration(
        &mut self,
        cmd: &ElectraCommand,
    ) -> Result<Outcome, CommandError> {
        serde_json::from_slice::<serde_json::Value>(&cmd.body)?;
        self.library.save_pending_config(&cmd.body)?;
        Ok(Outcome::Ack)
    }

    pub(super) fn upload_snapshot_import(
        &mut self,
        cmd: &ElectraCommand,
    ) -> Result<Outcome, CommandError> {
        let bundle: SnapshotBundle = serde_json::from_slice(&cmd.body)?;
        let _guard = self.busy.try_acquire().ok_or(CommandError::Busy)?;
        let imported = self.snapshot_store(&bundle.project_id)?.import(&bundle)?;
        info!("Snapshot import: {} of {} entries", imported, bundle.snapshots.len());
        self.notify(Event::SnapshotChange);
        Ok(Outcome::Ack)
    }
}
