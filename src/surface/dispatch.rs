//! Sysex command dispatch
//!
//! Commands are looked up in a (command, object) handler table. Switch and
//! update handlers answer with exactly one ack or nack; file requests answer
//! with data frames; events are fire and forget.

use super::{Surface, SystemCall};
use crate::control::ValueRef;
use crate::router::{MidiSource, MAX_PORT};
use crate::storage::{format_color, parse_color};
use crate::sysex::reply::{self, Event};
use crate::sysex::{
    events, required, CommandError, CommandKind, ControlUpdateBody, ElectraCommand, ObjectKind,
    ProjectBody, SnapshotInfoBody, SnapshotLocationBody, SnapshotSwapBody, ValueLabelBody,
};
use tracing::{debug, info, warn};

/// Result of a handled command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ack,
    /// Data frames sent back instead of an ack
    Frames(Vec<Vec<u8>>),
    /// Nothing is sent back
    Silent,
}

type Handler = fn(&mut Surface, &ElectraCommand) -> Result<Outcome, CommandError>;

use CommandKind as K;
use ObjectKind as O;

const HANDLERS: &[(CommandKind, ObjectKind, Handler)] = &[
    (K::FileUpload, O::Preset, Surface::upload_preset),
    (K::FileUpload, O::Configuration, Surface::upload_configuration),
    (K::FileUpload, O::Script, Surface::upload_script),
    (K::FileUpload, O::SnapshotImport, Surface::upload_snapshot_import),
    (K::FileRequest, O::Preset, Surface::request_preset),
    (K::FileRequest, O::PresetList, Surface::request_preset_list),
    (K::FileRequest, O::SnapshotList, Surface::request_snapshot_list),
    (K::FileRequest, O::Snapshot, Surface::request_snapshot),
    (K::FileRequest, O::Configuration, Surface::request_configuration),
    (K::MidiLearnToggle, O::MidiLearn, Surface::cmd_midi_learn),
    (K::Remove, O::Snapshot, Surface::cmd_remove_snapshot),
    (K::Remove, O::PresetSlot, Surface::cmd_remove_preset),
    (K::Swap, O::Snapshot, Surface::cmd_swap_snapshots),
    (K::Switch, O::PresetSlot, Surface::cmd_switch_preset_slot),
    (K::Switch, O::Page, Surface::cmd_switch_page),
    (K::Switch, O::ControlSet, Surface::cmd_switch_control_set),
    (K::Switch, O::SnapshotBank, Surface::cmd_switch_snapshot_bank),
    (K::Switch, O::Snapshot, Surface::cmd_load_snapshot),
    (K::Update, O::Control, Surface::cmd_update_control),
    (K::Update, O::Ports, Surface::cmd_update_ports),
    (K::Update, O::SubscribedEvents, Surface::cmd_subscribe_events),
    (K::Update, O::Snapshot, Surface::cmd_save_snapshot),
    (K::Update, O::SnapshotInfo, Surface::cmd_update_snapshot_info),
    (K::UpdateRuntime, O::ControlValue, Surface::cmd_update_value_label),
    (K::Event, O::SnapshotBank, Surface::event_snapshot_bank),
    (K::SystemCall, O::Reboot, Surface::cmd_reboot),
    (K::SystemCall, O::UpdateMode, Surface::cmd_update_mode),
];

fn handler_for(kind: CommandKind, object: ObjectKind) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(k, o, _)| *k == kind && *o == object)
        .map(|(_, _, handler)| *handler)
}

/// Snapshot address taken from a command body
fn location(body: SnapshotLocationBody) -> Result<(String, u8, u8), CommandError> {
    Ok((
        required(body.project_id, "projectId")?,
        required(body.bank_number, "bankNumber")?,
        required(body.slot, "slot")?,
    ))
}

impl Surface {
    /// Decode and execute one complete frame, queueing the reply for `source`
    pub fn dispatch_frame(&mut self, source: MidiSource, frame: &[u8]) {
        let cmd = match ElectraCommand::parse(frame) {
            Ok(cmd) => cmd,
            Err(e) if e.is_silent() => {
                debug!("Sysex from {} ignored: {}", source, e);
                return;
            }
            Err(e) => {
                warn!("Sysex from {} rejected: {}", source, e);
                self.send(source, reply::nack());
                return;
            }
        };

        debug!("Sysex command {}", cmd.describe());
        let fire_and_forget = cmd.kind == CommandKind::Event;
        match self.execute(&cmd) {
            Ok(Outcome::Ack) => self.send(source, reply::ack()),
            Ok(Outcome::Frames(frames)) => {
                for frame in frames {
                    self.send(source, frame);
                }
            }
            Ok(Outcome::Silent) => {}
            Err(e) if e.is_silent() || fire_and_forget => {
                debug!("{:?}/{:?} dropped: {}", cmd.kind, cmd.object, e)
            }
            Err(e) => {
                warn!("{:?}/{:?} failed: {}", cmd.kind, cmd.object, e);
                self.send(source, reply::nack());
            }
        }
    }

    /// Run the handler of a decoded command
    pub fn execute(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let handler = handler_for(cmd.kind, cmd.object).ok_or(CommandError::Unsupported {
            kind: cmd.kind,
            object: cmd.object,
        })?;
        handler(self, cmd)
    }

    // Switch

    fn cmd_switch_preset_slot(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let bank = cmd.param_in_range(0, u8::MAX, "preset bank")?;
        let slot = cmd.param_in_range(1, u8::MAX, "preset slot")?;
        self.switch_preset_slot(bank, slot)?;
        Ok(Outcome::Ack)
    }

    fn cmd_switch_page(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let page = cmd.param_in_range(0, u8::MAX, "page")?;
        self.switch_page(page)?;
        Ok(Outcome::Ack)
    }

    fn cmd_switch_control_set(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let control_set = cmd.param_in_range(0, u8::MAX, "control set")?;
        self.switch_control_set(control_set)?;
        Ok(Outcome::Ack)
    }

    fn cmd_switch_snapshot_bank(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let bank = cmd.param_in_range(0, u8::MAX, "snapshot bank")?;
        self.switch_snapshot_bank(bank)?;
        Ok(Outcome::Ack)
    }

    fn cmd_load_snapshot(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let (project_id, bank, slot) = location(cmd.body_json()?)?;
        self.load_snapshot(&project_id, bank, slot)?;
        Ok(Outcome::Ack)
    }

    // Update

    fn cmd_update_control(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let id = cmd
            .param14(0)
            .ok_or(CommandError::Malformed("missing control id"))?;
        let body: ControlUpdateBody = cmd.body_json()?;
        let control = self
            .controls
            .get_mut(id)
            .ok_or(CommandError::NotFound("control"))?;

        if let Some(name) = body.name {
            control.name = name;
        }
        if let Some(color) = body.color {
            control.color = format_color(parse_color(&color));
        }
        if let Some(visible) = body.visible {
            control.visible = visible;
        }
        debug!("Control {} updated", id);
        Ok(Outcome::Ack)
    }

    fn cmd_update_ports(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let port = cmd.param_in_range(0, MAX_PORT, "control port")?;
        let channel = cmd.param_in_range(1, 16, "control channel")?;
        self.router.set_control_port(port, channel);
        Ok(Outcome::Ack)
    }

    fn cmd_subscribe_events(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let mask = cmd
            .param(0)
            .ok_or(CommandError::Malformed("missing event mask"))?;
        self.subscribed = mask & events::ALL;
        debug!("Subscribed events 0x{:02X}", self.subscribed);
        Ok(Outcome::Ack)
    }

    fn cmd_save_snapshot(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let body: SnapshotInfoBody = cmd.body_json()?;
        let project_id = required(body.project_id, "projectId")?;
        let bank = required(body.bank_number, "bankNumber")?;
        let slot = required(body.slot, "slot")?;
        let color = body.color.as_deref().map_or(0xFF_FFFF, parse_color);

        self.save_snapshot(&project_id, bank, slot, &body.name, color)?;
        self.notify(Event::SnapshotChange);
        Ok(Outcome::Ack)
    }

    fn cmd_update_snapshot_info(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let body: SnapshotInfoBody = cmd.body_json()?;
        let project_id = required(body.project_id, "projectId")?;
        let bank = required(body.bank_number, "bankNumber")?;
        let slot = required(body.slot, "slot")?;
        let color = body.color.as_deref().map_or(0xFF_FFFF, parse_color);

        self.snapshot_store(&project_id)?
            .update_info(bank, slot, &body.name, color)?;
        self.notify(Event::SnapshotChange);
        Ok(Outcome::Ack)
    }

    fn cmd_update_value_label(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let id = cmd
            .param14(0)
            .ok_or(CommandError::Malformed("missing control id"))?;
        let handle = cmd
            .param(2)
            .ok_or(CommandError::Malformed("missing value handle"))?;
        let body: ValueLabelBody = cmd.body_json()?;
        let value = self
            .controls
            .value_mut(ValueRef::new(id, handle))
            .ok_or(CommandError::NotFound("control value"))?;
        value.label = body.text;
        Ok(Outcome::Ack)
    }

    // Remove / swap

    fn cmd_remove_snapshot(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let (project_id, bank, slot) = location(cmd.body_json()?)?;
        let _guard = self.busy.try_acquire().ok_or(CommandError::Busy)?;
        self.snapshot_store(&project_id)?.remove(bank, slot)?;
        self.notify(Event::SnapshotChange);
        Ok(Outcome::Ack)
    }

    fn cmd_remove_preset(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let bank = cmd.param_in_range(0, u8::MAX, "preset bank")?;
        let slot = cmd.param_in_range(1, u8::MAX, "preset slot")?;
        self.library.remove_preset(bank, slot)?;
        info!("Preset {}-{} removed", bank, slot);
        Ok(Outcome::Ack)
    }

    fn cmd_swap_snapshots(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let body: SnapshotSwapBody = cmd.body_json()?;
        let project_id = required(body.project_id, "projectId")?;
        let source_bank = required(body.source_bank_number, "sourceBankNumber")?;
        let source_slot = required(body.source_slot, "sourceSlot")?;
        let dest_bank = required(body.dest_bank_number, "destBankNumber")?;
        let dest_slot = required(body.dest_slot, "destSlot")?;

        let _guard = self.busy.try_acquire().ok_or(CommandError::Busy)?;
        self.snapshot_store(&project_id)?
            .swap(source_bank, source_slot, dest_bank, dest_slot)?;
        self.notify(Event::SnapshotChange);
        Ok(Outcome::Ack)
    }

    // Misc

    fn cmd_midi_learn(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let on = cmd.param_in_range(0, 1, "midi learn")? == 1;
        self.midi_learn = on;
        info!("MIDI learn {}", if on { "on" } else { "off" });
        Ok(Outcome::Ack)
    }

    fn event_snapshot_bank(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let bank = cmd.param_in_range(0, u8::MAX, "snapshot bank")?;
        self.switch_snapshot_bank(bank)?;
        Ok(Outcome::Silent)
    }

    fn cmd_reboot(&mut self, _cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        self.system_call = Some(SystemCall::Reboot);
        Ok(Outcome::Ack)
    }

    fn cmd_update_mode(&mut self, _cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        self.system_call = Some(SystemCall::UpdateMode);
        Ok(Outcome::Ack)
    }

    // File requests

    fn request_preset(&mut self, _cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let json = serde_json::to_string(&self.preset)?;
        Ok(Outcome::Frames(reply::json_frames(ObjectKind::Preset, &json)))
    }

    fn request_preset_list(&mut self, _cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let json = self.library.list_json()?;
        Ok(Outcome::Frames(reply::json_frames(ObjectKind::PresetList, &json)))
    }

    fn request_snapshot_list(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let body: ProjectBody = cmd.body_json()?;
        let project_id = required(body.project_id, "projectId")?;
        let json = self.snapshot_store(&project_id)?.list_json()?;
        Ok(Outcome::Frames(reply::json_frames(ObjectKind::SnapshotList, &json)))
    }

    fn request_snapshot(&mut self, cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        let (project_id, bank, slot) = location(cmd.body_json()?)?;
        let payload = self.snapshot_store(&project_id)?.load(bank, slot)?;
        Ok(Outcome::Frames(reply::binary_frames(ObjectKind::Snapshot, &payload)))
    }

    fn request_configuration(&mut self, _cmd: &ElectraCommand) -> Result<Outcome, CommandError> {
        Ok(Outcome::Frames(reply::json_frames(
            ObjectKind::Configuration,
            &self.config_document,
        )))
    }
}
