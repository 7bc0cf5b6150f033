//! Control types and their named sub-values

use serde::{Deserialize, Serialize};

/// Arena handle of a control inside a [`super::ControlStore`]
pub type ControlId = u16;

/// Address of one sub-value: owning control plus value handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueRef {
    pub control: ControlId,
    pub handle: u8,
}

impl ValueRef {
    pub fn new(control: ControlId, handle: u8) -> Self {
        Self { control, handle }
    }
}

impl std::fmt::Display for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.control, self.handle)
    }
}

/// Maximum number of sub-values a control can own
pub const MAX_VALUES: usize = 8;

const SINGLE: &[&str] = &["value"];
const ADSR: &[&str] = &["attack", "decay", "sustain", "release"];
const ADR: &[&str] = &["attack", "decay", "release"];
const DX7_ENVELOPE: &[&str] = &["l1", "r1", "l2", "r2", "l3", "r3", "l4", "r4"];

/// Kind of on-screen control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    #[default]
    Fader,
    Vfader,
    List,
    Pad,
    Adsr,
    Adr,
    #[serde(alias = "dx7Envelope")]
    Dx7envelope,
    Knob,
    Relative,
    None,
}

impl ControlType {
    /// Sub-value names in handle order
    pub fn value_names(self) -> &'static [&'static str] {
        match self {
            ControlType::Adsr => ADSR,
            ControlType::Adr => ADR,
            ControlType::Dx7envelope => DX7_ENVELOPE,
            ControlType::None => &[],
            _ => SINGLE,
        }
    }

    /// Handle of the sub-value called `name`
    pub fn handle_of(self, name: &str) -> Option<u8> {
        self.value_names()
            .iter()
            .position(|n| *n == name)
            .map(|i| i as u8)
    }

    /// Name of the sub-value at `handle`
    pub fn name_of(self, handle: u8) -> Option<&'static str> {
        self.value_names().get(handle as usize).copied()
    }

    /// Whether the control opens a secondary editing view
    pub fn has_detail(self) -> bool {
        !matches!(self, ControlType::Pad | ControlType::Relative | ControlType::None)
    }
}

impl std::fmt::Display for ControlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlType::Fader => "fader",
            ControlType::Vfader => "vfader",
            ControlType::List => "list",
            ControlType::Pad => "pad",
            ControlType::Adsr => "adsr",
            ControlType::Adr => "adr",
            ControlType::Dx7envelope => "dx7envelope",
            ControlType::Knob => "knob",
            ControlType::Relative => "relative",
            ControlType::None => "none",
        };
        f.write_str(name)
    }
}
