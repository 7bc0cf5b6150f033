//! Wire registry type definitions

use crate::codec::{Message, MessageKind};
use serde::{Deserialize, Serialize};

/// Physical wire address of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireKey {
    pub device_id: u8,
    pub kind: MessageKind,
    pub parameter_number: u16,
}

impl WireKey {
    pub fn new(device_id: u8, kind: MessageKind, parameter_number: u16) -> Self {
        Self {
            device_id,
            kind,
            parameter_number,
        }
    }

    /// Address of a message. Channel-wide kinds ignore the parameter number.
    pub fn for_message(message: &Message) -> Self {
        let parameter_number = match message.kind {
            MessageKind::Program
            | MessageKind::Pitchbend
            | MessageKind::AftertouchChannel
            | MessageKind::SongPosition
            | MessageKind::Start
            | MessageKind::Stop
            | MessageKind::Tune => 0,
            _ => message.parameter_number,
        };
        Self::new(message.device_id, message.kind, parameter_number)
    }
}

impl std::fmt::Display for WireKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "dev{}/{}/{}",
            self.device_id, self.kind, self.parameter_number
        )
    }
}

/// Source of a value change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Live MIDI input
    Midi,
    /// Local UI interaction or a sysex command
    #[default]
    Internal,
    /// Bulk restore from a snapshot or preset file; never echoed to MIDI
    File,
}

impl Origin {
    /// Whether a flush of this change generates outbound MIDI
    pub fn emits_midi(self) -> bool {
        matches!(self, Origin::Internal)
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Midi => write!(f, "midi"),
            Origin::Internal => write!(f, "internal"),
            Origin::File => write!(f, "file"),
        }
    }
}
