//! Navigation - pages, control sets, preset slots and snapshot banks

use super::Surface;
use crate::control::{CONTROL_SETS, PAGES};
use crate::midi::{cc, MidiMessage};
use crate::midi_control::SurfaceAction;
use crate::preset::Preset;
use crate::storage::{PRESET_BANKS, PRESET_SLOTS, SNAPSHOT_BANKS, SNAPSHOT_SLOTS};
use crate::sysex::reply::Event;
use crate::sysex::CommandError;
use tracing::{debug, info, warn};

/// What program changes select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Preset,
    Snapshot,
}

/// Current position of the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Navigation {
    /// 0-11
    pub page: u8,
    /// 0-2
    pub control_set: u8,
    /// 0-5
    pub preset_bank: u8,
    /// 0-11
    pub preset_slot: u8,
    /// 0-11
    pub snapshot_bank: u8,
    pub mode: Mode,
}

fn check(value: u8, limit: u8, what: &'static str) -> Result<u8, CommandError> {
    if value >= limit {
        return Err(CommandError::OutOfRange {
            what,
            value: u16::from(value),
        });
    }
    Ok(value)
}

impl Surface {
    pub fn switch_page(&mut self, page: u8) -> Result<(), CommandError> {
        self.nav.page = check(page, PAGES, "page")?;
        debug!("Page {}", page);
        Ok(())
    }

    pub fn switch_control_set(&mut self, control_set: u8) -> Result<(), CommandError> {
        self.nav.control_set = check(control_set, CONTROL_SETS, "control set")?;
        debug!("Control set {}", control_set);
        Ok(())
    }

    pub fn switch_snapshot_bank(&mut self, bank: u8) -> Result<(), CommandError> {
        self.nav.snapshot_bank = check(bank, SNAPSHOT_BANKS, "snapshot bank")?;
        debug!("Snapshot bank {}", bank);
        Ok(())
    }

    /// Select a preset slot and load the preset stored there. An empty slot
    /// loads an empty preset.
    pub fn switch_preset_slot(&mut self, bank: u8, slot: u8) -> Result<(), CommandError> {
        check(bank, PRESET_BANKS, "preset bank")?;
        check(slot, PRESET_SLOTS, "preset slot")?;

        let preset = match self.library.load_preset(bank, slot)? {
            Some(data) => Preset::parse(&data)?,
            None => {
                info!("Preset slot {}-{} is empty", bank, slot);
                Preset::default()
            }
        };
        self.nav.preset_bank = bank;
        self.nav.preset_slot = slot;
        self.load_preset(preset);
        Ok(())
    }

    /// Messages from the control port: bindings first, then bank select
    /// and program change navigation
    pub(crate) fn handle_control_message(&mut self, msg: &MidiMessage) {
        if let Some(action) = self.midi_control.resolve(msg) {
            self.apply_action(action);
            return;
        }

        match *msg {
            MidiMessage::ControlChange { controller: cc::BANK_SELECT, value, .. } => {
                self.bank_select(value)
            }
            MidiMessage::ProgramChange { program, .. } => self.program_change(program),
            _ => debug!("Control port message ignored: {}", msg),
        }
    }

    /// CC0: 1-12 enters snapshot mode on bank `value - 1`, 0 returns to presets
    fn bank_select(&mut self, value: u8) {
        match value {
            0 => {
                self.nav.mode = Mode::Preset;
                debug!("Program changes select presets");
            }
            1..=12 => {
                self.nav.mode = Mode::Snapshot;
                let bank = value - 1;
                if self.nav.snapshot_bank != bank {
                    self.nav.snapshot_bank = bank;
                    self.notify(Event::SnapshotBankSwitch { bank });
                }
                debug!("Program changes select snapshots of bank {}", bank);
            }
            _ => debug!("Bank select {} ignored", value),
        }
    }

    fn program_change(&mut self, program: u8) {
        match self.nav.mode {
            Mode::Preset => {
                let (bank, slot) = (program / PRESET_SLOTS, program % PRESET_SLOTS);
                if bank >= PRESET_BANKS {
                    debug!("Program {} has no preset slot", program);
                    return;
                }
                match self.switch_preset_slot(bank, slot) {
                    Ok(()) => self.notify(Event::PresetSlotChanged { bank, slot }),
                    Err(e) => warn!("Preset switch to {}-{} failed: {}", bank, slot, e),
                }
            }
            Mode::Snapshot => {
                if program == 0 || program > SNAPSHOT_SLOTS {
                    debug!("Program {} has no snapshot slot", program);
                    return;
                }
                let project_id = self.preset.project_id.clone();
                let (bank, slot) = (self.nav.snapshot_bank, program - 1);
                if let Err(e) = self.load_snapshot(&project_id, bank, slot) {
                    warn!("Snapshot {}-{} not loaded: {}", bank, slot, e);
                }
            }
        }
    }

    /// Perform a MIDI control binding action
    pub fn apply_action(&mut self, action: SurfaceAction) {
        let result = match action {
            SurfaceAction::PageSwitch(page) => self.switch_page(page),
            SurfaceAction::PageNext => self.switch_page((self.nav.page + 1) % PAGES),
            SurfaceAction::PagePrev => self.switch_page((self.nav.page + PAGES - 1) % PAGES),
            SurfaceAction::ControlSetSwitch(control_set) => self.switch_control_set(control_set),
            SurfaceAction::PageAndControlSet { page, control_set } => self
                .switch_control_set(control_set)
                .and_then(|_| self.switch_page(page)),
            SurfaceAction::PresetSwitch { bank, slot } => self.switch_preset_slot(bank, slot),
            SurfaceAction::PresetNext => {
                let (bank, slot) = step_preset(self.nav.preset_bank, self.nav.preset_slot, 1);
                self.switch_preset_slot(bank, slot)
            }
            SurfaceAction::PresetPrev => {
                let (bank, slot) = step_preset(self.nav.preset_bank, self.nav.preset_slot, -1);
                self.switch_preset_slot(bank, slot)
            }
        };

        match result {
            Ok(()) => self.notify_navigation(action),
            Err(e) => warn!("MIDI control {:?} failed: {}", action, e),
        }
    }

    fn notify_navigation(&mut self, action: SurfaceAction) {
        let nav = self.nav;
        match action {
            SurfaceAction::PageSwitch(_) | SurfaceAction::PageNext | SurfaceAction::PagePrev => {
                self.notify(Event::PageSwitch { page: nav.page })
            }
            SurfaceAction::ControlSetSwitch(_) => self.notify(Event::ControlSetSwitch {
                control_set: nav.control_set,
            }),
            SurfaceAction::PageAndControlSet { .. } => {
                self.notify(Event::PageSwitch { page: nav.page });
                self.notify(Event::ControlSetSwitch {
                    control_set: nav.control_set,
                });
            }
            SurfaceAction::PresetSwitch { .. }
            | SurfaceAction::PresetNext
            | SurfaceAction::PresetPrev => self.notify(Event::PresetSlotChanged {
                bank: nav.preset_bank,
                slot: nav.preset_slot,
            }),
        }
    }
}

/// Neighbouring preset slot, wrapping around the whole library
fn step_preset(bank: u8, slot: u8, step: i16) -> (u8, u8) {
    let total = i16::from(PRESET_BANKS) * i16::from(PRESET_SLOTS);
    let index = i16::from(bank) * i16::from(PRESET_SLOTS) + i16::from(slot);
    let next = (index + step).rem_euclid(total);
    ((next / i16::from(PRESET_SLOTS)) as u8, (next % i16::from(PRESET_SLOTS)) as u8)
}
