//! Surface - the local consumer of MIDI traffic
//!
//! The Surface owns the context objects of the running device:
//! - Wire registry and parameter tree of the loaded preset
//! - Preset library and the snapshot store of the active project
//! - Navigation state (page, control set, preset slot, snapshot bank)
//! - Routing matrix and MIDI control bindings
//!
//! Inbound messages are routed, then turned into registry updates,
//! navigation or sysex commands. Outbound traffic is queued in an outbox
//! that the processing loop drains after every event and tick.

mod dispatch;
mod flush;
mod input;
mod navigation;
mod uploads;

#[cfg(test)]
mod tests;

pub use dispatch::Outcome;
pub use navigation::{Mode, Navigation};

use crate::codec::{wire, MessageKind};
use crate::control::{ControlStore, ValueRef};
use crate::midi::format_hex;
use crate::midi_control::MidiControl;
use crate::preset::Preset;
use crate::router::{Interface, MidiRouter, MidiSource, CTRL_PORT};
use crate::state::{Origin, ParameterMap, WireKey};
use crate::storage::{BusyFlag, BusyGuard, PresetLibrary, SnapshotStore};
use crate::sysex::reply::Event;
use crate::sysex::{CommandError, SysexBuffer};
use input::ParameterNumberState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Bytes queued for one output port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub target: MidiSource,
    pub bytes: Vec<u8>,
}

/// System call requested by the editor, performed by the process owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCall {
    Reboot,
    UpdateMode,
}

/// Local consumer of the MIDI interfaces
pub struct Surface {
    pub(crate) registry: ParameterMap,
    pub(crate) controls: ControlStore,
    pub(crate) preset: Preset,
    pub(crate) library: PresetLibrary,
    /// Root of the per-project snapshot directories
    pub(crate) snapshots_root: PathBuf,
    /// Store of the project last addressed
    pub(crate) snapshots: Option<SnapshotStore>,
    pub(crate) router: MidiRouter,
    pub(crate) midi_control: MidiControl,
    pub(crate) nav: Navigation,
    /// Subscribed-events mask, see [`crate::sysex::events`]
    pub(crate) subscribed: u8,
    pub(crate) midi_learn: bool,
    /// NRPN/RPN selection per source and channel
    pub(crate) parameter_numbers: HashMap<(MidiSource, u8), ParameterNumberState>,
    pub(crate) sysex_buffers: HashMap<MidiSource, SysexBuffer>,
    pub(crate) outbox: Vec<Outgoing>,
    pub(crate) system_call: Option<SystemCall>,
    /// JSON document returned for configuration requests
    pub(crate) config_document: String,
    pub(crate) busy: BusyFlag,
    /// Held while a file upload is partially received
    pub(crate) transfer: Option<(MidiSource, BusyGuard)>,
}

impl Surface {
    /// Create a surface storing its files under `data_dir`
    pub fn new(data_dir: impl AsRef<Path>, router: MidiRouter, midi_control: MidiControl) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            registry: ParameterMap::new(),
            controls: ControlStore::new(),
            preset: Preset::default(),
            library: PresetLibrary::new(data_dir),
            snapshots_root: data_dir.join("snapshots"),
            snapshots: None,
            router,
            midi_control,
            nav: Navigation::default(),
            subscribed: 0,
            midi_learn: false,
            parameter_numbers: HashMap::new(),
            sysex_buffers: HashMap::new(),
            outbox: Vec::new(),
            system_call: None,
            config_document: "{}".to_string(),
            busy: BusyFlag::new(),
            transfer: None,
        }
    }

    pub fn registry(&self) -> &ParameterMap {
        &self.registry
    }

    pub fn controls(&self) -> &ControlStore {
        &self.controls
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn library(&self) -> &PresetLibrary {
        &self.library
    }

    pub fn router(&self) -> &MidiRouter {
        &self.router
    }

    pub fn navigation(&self) -> &Navigation {
        &self.nav
    }

    pub fn subscribed_events(&self) -> u8 {
        self.subscribed
    }

    pub fn midi_learn(&self) -> bool {
        self.midi_learn
    }

    pub fn busy_flag(&self) -> &BusyFlag {
        &self.busy
    }

    pub fn set_config_document(&mut self, json: String) {
        self.config_document = json;
    }

    /// Drain queued output
    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    pub fn take_system_call(&mut self) -> Option<SystemCall> {
        self.system_call.take()
    }

    /// Replace the loaded preset: rebuild the parameter tree and rebind
    /// every addressed sub-value, virtual and relative ones included
    pub fn load_preset(&mut self, preset: Preset) {
        // pending local changes belong to the outgoing preset
        self.flush();
        self.controls = preset.build_controls();
        self.registry.clear();
        self.parameter_numbers.clear();

        for r in self.controls.value_refs() {
            let Some((control_type, value, overlay)) = self.controls.resolve(r) else {
                continue;
            };
            if value.message.kind == MessageKind::None {
                continue;
            }
            let key = WireKey::for_message(&value.message);
            let stored = value.to_registry(control_type, overlay, value.value);
            self.registry.bind(key, r);
            self.registry.set_value(key, stored, Origin::File);
        }

        self.snapshots = None;
        if !preset.project_id.is_empty() {
            match SnapshotStore::open(&self.snapshots_root, &preset.project_id) {
                Ok(store) => self.snapshots = Some(store),
                Err(e) => warn!("Snapshots unavailable for '{}': {}", preset.project_id, e),
            }
        }

        info!(
            "Preset '{}' loaded: {} controls, {} wire addresses",
            preset.name,
            self.controls.len(),
            self.registry.len()
        );
        self.preset = preset;
        self.nav.page = 0;
        self.nav.control_set = 0;
    }

    /// Set a sub-value from the UI. The value goes through the registry and
    /// reaches every sub-value sharing its address on the next flush.
    /// Absolute values are transmitted by that flush; relative values are
    /// sent as a delta right away.
    pub fn set_control_value(&mut self, r: ValueRef, value: i32) -> bool {
        let Some((control_type, cv, overlay)) = self.controls.resolve(r) else {
            return false;
        };
        let stored = cv.to_registry(control_type, overlay, value);

        let Some(key) = self.registry.key_of(r) else {
            // values without a message live in the tree only
            let (lo, hi) = cv.bounds();
            let value = value.clamp(lo, hi);
            let changed = cv.value != value;
            if let Some(cv) = self.controls.value_mut(r) {
                cv.value = value;
            }
            self.refresh_label(r);
            return changed;
        };

        if cv.message.is_relative() {
            let current = self
                .registry
                .value(&key)
                .map_or(cv.value, |s| cv.from_registry(control_type, overlay, s));
            let delta = cv
                .from_registry(control_type, overlay, stored)
                .saturating_sub(current);
            let message = cv.message.clone();
            self.registry.set_value(key, stored, Origin::Internal);
            self.send_relative(&message, delta);
            return delta != 0;
        }

        self.registry.set_value(key, stored, Origin::Internal)
    }

    pub(crate) fn refresh_label(&mut self, r: ValueRef) {
        let Some((control_type, cv, overlay)) = self.controls.resolve(r) else {
            return;
        };
        let label = cv.format_label(control_type, overlay);
        if let Some(cv) = self.controls.value_mut(r) {
            cv.label = label;
        }
    }

    /// Queue a notification if the editor subscribed to it
    pub(crate) fn notify(&mut self, event: Event) {
        let bit = event.subscription_bit();
        if bit != 0 && self.subscribed & bit == 0 {
            trace!("Event {:?} not subscribed", event);
            return;
        }
        debug!("Event {:?}", event);
        self.send(editor(), event.to_frame());
    }

    pub(crate) fn send(&mut self, target: MidiSource, bytes: Vec<u8>) {
        trace!("-> {} {}", target, format_hex(&bytes));
        self.outbox.push(Outgoing { target, bytes });
    }

    /// Queue MIDI for a preset device on every interface at its port
    pub(crate) fn send_to_device(&mut self, device_id: u8, messages: Vec<Vec<u8>>) {
        if messages.is_empty() {
            return;
        }
        let Some(device) = self.preset.device(device_id) else {
            trace!("No device {} in preset, {} messages dropped", device_id, messages.len());
            return;
        };
        let port = device.port;
        for bytes in messages {
            for interface in Interface::ALL {
                self.send(MidiSource::new(interface, port), bytes.clone());
            }
        }
    }

    pub(crate) fn device_channel(&self, device_id: u8) -> Option<u8> {
        self.preset.device(device_id).map(|d| d.channel)
    }

    fn send_relative(&mut self, message: &crate::codec::Message, delta: i32) {
        let Some(channel) = self.device_channel(message.device_id) else {
            return;
        };
        let messages = wire::build_relative(message, delta, channel);
        self.send_to_device(message.device_id, messages);
    }

    /// Snapshot store of `project_id`, opened on demand
    pub(crate) fn snapshot_store(&mut self, project_id: &str) -> Result<&SnapshotStore, CommandError> {
        let reopen = self
            .snapshots
            .as_ref()
            .map_or(true, |store| store.project_id() != project_id);
        if reopen {
            self.snapshots = Some(SnapshotStore::open(&self.snapshots_root, project_id)?);
        }
        self.snapshots
            .as_ref()
            .ok_or(CommandError::NotFound("snapshot store"))
    }

    /// Restore a snapshot into the registry. Restored values are sent once
    /// here; the following flush only refreshes the parameter tree.
    pub fn load_snapshot(&mut self, project_id: &str, bank: u8, slot: u8) -> Result<(), CommandError> {
        let payload = self.snapshot_store(project_id)?.load(bank, slot)?;
        // local changes still pending are sent before the restore replaces them
        self.flush();
        let keys = self.registry.load_state(&payload, Origin::File)?;

        for key in &keys {
            let Some(value) = self.registry.value(key) else {
                continue;
            };
            let Some(r) = self
                .registry
                .get(key)
                .and_then(|entry| entry.destinations().first().copied())
            else {
                continue;
            };
            let Some(message) = self.controls.value(r).map(|cv| cv.message.clone()) else {
                continue;
            };
            if message.is_relative() || !message.is_transmitted() {
                continue;
            }
            if let Some(channel) = self.device_channel(message.device_id) {
                let messages = wire::build(&message, value, channel);
                self.send_to_device(message.device_id, messages);
            }
        }

        info!(
            "Snapshot bank {} slot {} loaded: {} values",
            bank,
            slot,
            keys.len()
        );
        Ok(())
    }

    /// Store the current registry state in a snapshot slot
    pub fn save_snapshot(
        &mut self,
        project_id: &str,
        bank: u8,
        slot: u8,
        name: &str,
        color: u32,
    ) -> Result<(), CommandError> {
        let _guard = self.busy.try_acquire().ok_or(CommandError::Busy)?;
        let payload = self.registry.save_state();
        self.snapshot_store(project_id)?
            .save(bank, slot, name, color, &payload)?;
        Ok(())
    }
}

/// Editor port on the USB device interface
pub(crate) fn editor() -> MidiSource {
    MidiSource::new(Interface::UsbDevice, CTRL_PORT)
}
