//! MIDI control bindings
//!
//! Maps messages arriving on the reserved control port to surface
//! navigation actions. Bindings come from the `midi_control` section of the
//! YAML configuration:
//!
//! ```yaml
//! midi_control:
//!   - { event: page_next, type: note, number: 47 }
//!   - { event: page_and_control_set, type: cc, number: 20 }
//! ```

use crate::control::PAGES;
use crate::storage::PRESET_SLOTS;
use crate::midi::MidiMessage;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Message kind a binding listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    Cc,
    Note,
    Program,
}

/// Navigation event triggered by a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlEvent {
    PageSwitch,
    PageNext,
    PagePrev,
    PresetSwitch,
    PresetNext,
    PresetPrev,
    ControlSetSwitch,
    /// Value encodes `control_set * 12 + page`
    PageAndControlSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MidiControlBinding {
    pub event: ControlEvent,
    #[serde(rename = "type")]
    pub kind: BindingKind,
    /// Controller, note or program number
    pub number: u8,
    /// Fixed target for switch events; the message value is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u8>,
}

impl MidiControlBinding {
    /// Value carried by `msg` when it matches this binding
    fn matched_value(&self, msg: &MidiMessage) -> Option<u8> {
        match (msg, self.kind) {
            (&MidiMessage::ControlChange { controller, value, .. }, BindingKind::Cc)
                if controller == self.number =>
            {
                Some(value)
            }
            (&MidiMessage::NoteOn { note, velocity, .. }, BindingKind::Note)
                if note == self.number =>
            {
                Some(velocity)
            }
            (&MidiMessage::ProgramChange { program, .. }, BindingKind::Program)
                if program == self.number =>
            {
                Some(program)
            }
            _ => None,
        }
    }
}

/// Action requested from the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAction {
    PageSwitch(u8),
    PageNext,
    PagePrev,
    PresetSwitch { bank: u8, slot: u8 },
    PresetNext,
    PresetPrev,
    ControlSetSwitch(u8),
    PageAndControlSet { page: u8, control_set: u8 },
}

/// Binding table
#[derive(Debug, Clone, Default)]
pub struct MidiControl {
    bindings: Vec<MidiControlBinding>,
}

impl MidiControl {
    pub fn new(bindings: Vec<MidiControlBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[MidiControlBinding] {
        &self.bindings
    }

    /// First binding matching `msg`, translated to an action
    pub fn resolve(&self, msg: &MidiMessage) -> Option<SurfaceAction> {
        self.bindings.iter().find_map(|binding| {
            let value = binding.matched_value(msg)?;
            let target = binding.target.unwrap_or(value);
            let action = match binding.event {
                ControlEvent::PageSwitch => SurfaceAction::PageSwitch(target),
                ControlEvent::PageNext => SurfaceAction::PageNext,
                ControlEvent::PagePrev => SurfaceAction::PagePrev,
                ControlEvent::PresetSwitch => SurfaceAction::PresetSwitch {
                    bank: target / PRESET_SLOTS,
                    slot: target % PRESET_SLOTS,
                },
                ControlEvent::PresetNext => SurfaceAction::PresetNext,
                ControlEvent::PresetPrev => SurfaceAction::PresetPrev,
                ControlEvent::ControlSetSwitch => SurfaceAction::ControlSetSwitch(target),
                ControlEvent::PageAndControlSet => SurfaceAction::PageAndControlSet {
                    page: target % PAGES,
                    control_set: target / PAGES,
                },
            };
            debug!("MIDI control {:?} -> {:?}", binding.event, action);
            Some(action)
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (idx, binding) in self.bindings.iter().enumerate() {
            if binding.number > 127 {
                anyhow::bail!(
                    "midi_control[{}] has invalid number {} (must be 0-127)",
                    idx,
                    binding.number
                );
            }
        }
        Ok(())
    }
}
