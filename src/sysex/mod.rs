//! Sysex command protocol
//!
//! Frames exchanged with the host-side editor have the shape
//!
//! ```text
//! F0 <command> <object> <p1> [p2] [p3] [body...] F7
//! ```
//!
//! where the number of parameter bytes depends on the (command, object)
//! pair and the body is either JSON or raw file data. Replies reuse the
//! framing with command byte `7E`.

mod body;
mod buffer;
mod command;
pub mod reply;

pub use body::{
    ControlUpdateBody, ProjectBody, SnapshotInfoBody, SnapshotLocationBody, SnapshotSwapBody,
    ValueLabelBody,
};
pub use buffer::{SysexBuffer, MAX_SYSEX_SIZE};
pub use command::{required, CommandError, ElectraCommand};

/// Command byte of a sysex frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    FileUpload,
    FileRequest,
    MidiLearnToggle,
    Remove,
    Swap,
    Switch,
    Update,
    UpdateRuntime,
    Event,
    Reply,
    SystemCall,
}

impl CommandKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => CommandKind::FileUpload,
            0x02 => CommandKind::FileRequest,
            0x03 => CommandKind::MidiLearnToggle,
            0x05 => CommandKind::Remove,
            0x06 => CommandKind::Swap,
            0x09 => CommandKind::Switch,
            0x14 => CommandKind::Update,
            0x15 => CommandKind::UpdateRuntime,
            0x7C => CommandKind::Event,
            0x7E => CommandKind::Reply,
            0x7F => CommandKind::SystemCall,
            _ => return None,
        })
    }

    pub fn to_byte(self) -> u8 {
        match self {
            CommandKind::FileUpload => 0x01,
            CommandKind::FileRequest => 0x02,
            CommandKind::MidiLearnToggle => 0x03,
            CommandKind::Remove => 0x05,
            CommandKind::Swap => 0x06,
            CommandKind::Switch => 0x09,
            CommandKind::Update => 0x14,
            CommandKind::UpdateRuntime => 0x15,
            CommandKind::Event => 0x7C,
            CommandKind::Reply => 0x7E,
            CommandKind::SystemCall => 0x7F,
        }
    }
}

/// Object byte of a sysex frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Preset,
    Configuration,
    Script,
    PresetList,
    SnapshotList,
    Snapshot,
    SnapshotInfo,
    SnapshotBank,
    SnapshotImport,
    PresetSlot,
    Page,
    ControlSet,
    Control,
    ControlValue,
    Ports,
    SubscribedEvents,
    MidiLearn,
    Reboot,
    UpdateMode,
}

impl ObjectKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => ObjectKind::Preset,
            0x02 => ObjectKind::Configuration,
            0x03 => ObjectKind::Script,
            0x04 => ObjectKind::PresetList,
            0x05 => ObjectKind::SnapshotList,
            0x06 => ObjectKind::Snapshot,
            0x07 => ObjectKind::SnapshotInfo,
            0x08 => ObjectKind::SnapshotBank,
            0x09 => ObjectKind::SnapshotImport,
            0x0A => ObjectKind::PresetSlot,
            0x0B => ObjectKind::Page,
            0x0C => ObjectKind::ControlSet,
            0x0D => ObjectKind::Control,
            0x0E => ObjectKind::ControlValue,
            0x0F => ObjectKind::Ports,
            0x10 => ObjectKind::SubscribedEvents,
            0x11 => ObjectKind::MidiLearn,
            0x12 => ObjectKind::Reboot,
            0x13 => ObjectKind::UpdateMode,
            _ => return None,
        })
    }

    pub fn to_byte(self) -> u8 {
        match self {
            ObjectKind::Preset => 0x01,
            ObjectKind::Configuration => 0x02,
            ObjectKind::Script => 0x03,
            ObjectKind::PresetList => 0x04,
            ObjectKind::SnapshotList => 0x05,
            ObjectKind::Snapshot => 0x06,
            ObjectKind::SnapshotInfo => 0x07,
            ObjectKind::SnapshotBank => 0x08,
            ObjectKind::SnapshotImport => 0x09,
            ObjectKind::PresetSlot => 0x0A,
            ObjectKind::Page => 0x0B,
            ObjectKind::ControlSet => 0x0C,
            ObjectKind::Control => 0x0D,
            ObjectKind::ControlValue => 0x0E,
            ObjectKind::Ports => 0x0F,
            ObjectKind::SubscribedEvents => 0x10,
            ObjectKind::MidiLearn => 0x11,
            ObjectKind::Reboot => 0x12,
            ObjectKind::UpdateMode => 0x13,
        }
    }
}

/// Bits of the subscribed-events mask
pub mod events {
    pub const PAGE: u8 = 0x01;
    pub const CONTROL_SET: u8 = 0x02;
    pub const PRESET_SLOT: u8 = 0x04;
    pub const SNAPSHOT: u8 = 0x08;
    pub const SNAPSHOT_BANK: u8 = 0x10;
    pub const ALL: u8 = 0x1F;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_mappings_are_inverse() {
        for byte in 0..=0x7Fu8 {
            if let Some(kind) = CommandKind::from_byte(byte) {
                assert_eq!(kind.to_byte(), byte);
            }
            if let Some(object) = ObjectKind::from_byte(byte) {
                assert_eq!(object.to_byte(), byte);
            }
        }
        assert_eq!(CommandKind::from_byte(0x04), None);
        assert_eq!(ObjectKind::from_byte(0x00), None);
    }
}
