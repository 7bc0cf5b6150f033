//! MIDI short-message model
//!
//! Parses raw bytes delivered by the physical interfaces into typed messages
//! and encodes them back. Channels are 0-15 internally; presets and the
//! control-port configuration use 1-16.

use std::fmt;

/// Status byte that opens a System Exclusive message
pub const SYSEX_START: u8 = 0xF0;
/// Status byte that terminates a System Exclusive message
pub const SYSEX_END: u8 = 0xF7;

/// Controller numbers with a fixed meaning for parameter-number traffic
pub mod cc {
    pub const BANK_SELECT: u8 = 0;
    pub const DATA_ENTRY_MSB: u8 = 6;
    pub const DATA_ENTRY_LSB: u8 = 38;
    pub const DATA_INCREMENT: u8 = 96;
    pub const DATA_DECREMENT: u8 = 97;
    pub const NRPN_LSB: u8 = 98;
    pub const NRPN_MSB: u8 = 99;
    pub const RPN_LSB: u8 = 100;
    pub const RPN_MSB: u8 = 101;
}

/// Typed MIDI message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    PolyPressure { channel: u8, note: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit value, 8192 is centre
    PitchBend { channel: u8, value: u16 },
    SongPosition { position: u16 },
    TuneRequest,
    TimingClock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    SystemReset,
    /// Complete System Exclusive frame including F0/F7
    SysEx(Vec<u8>),
}

impl MidiMessage {
    /// Parse one complete message. Running status is not supported.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        if status < 0x80 {
            return None;
        }

        let d1 = rest.first().map(|b| b & 0x7F);
        let d2 = rest.get(1).map(|b| b & 0x7F);

        if status < 0xF0 {
            let channel = status & 0x0F;
            return match status & 0xF0 {
                0x80 => Some(MidiMessage::NoteOff { channel, note: d1?, velocity: d2? }),
                0x90 => {
                    let (note, velocity) = (d1?, d2?);
                    if velocity == 0 {
                        Some(MidiMessage::NoteOff { channel, note, velocity: 0 })
                    } else {
                        Some(MidiMessage::NoteOn { channel, note, velocity })
                    }
                }
                0xA0 => Some(MidiMessage::PolyPressure { channel, note: d1?, pressure: d2? }),
                0xB0 => Some(MidiMessage::ControlChange { channel, controller: d1?, value: d2? }),
                0xC0 => Some(MidiMessage::ProgramChange { channel, program: d1? }),
                0xD0 => Some(MidiMessage::ChannelPressure { channel, pressure: d1? }),
                0xE0 => Some(MidiMessage::PitchBend { channel, value: join14(d2?, d1?) }),
                _ => None,
            };
        }

        match status {
            SYSEX_START => {
                let end = data.iter().position(|&b| b == SYSEX_END)?;
                Some(MidiMessage::SysEx(data[..=end].to_vec()))
            }
            0xF2 => Some(MidiMessage::SongPosition { position: join14(d2?, d1?) }),
            0xF6 => Some(MidiMessage::TuneRequest),
            0xF8 => Some(MidiMessage::TimingClock),
            0xFA => Some(MidiMessage::Start),
            0xFB => Some(MidiMessage::Continue),
            0xFC => Some(MidiMessage::Stop),
            0xFE => Some(MidiMessage::ActiveSensing),
            0xFF => Some(MidiMessage::SystemReset),
            _ => None,
        }
    }

    /// Encode the message to wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                vec![0xA0 | (channel & 0x0F), note & 0x7F, pressure & 0x7F]
            }
            MidiMessage::ControlChange { channel, controller, value } => {
                vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F]
            }
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                vec![0xD0 | (channel & 0x0F), pressure & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let (msb, lsb) = split14(value);
                vec![0xE0 | (channel & 0x0F), lsb, msb]
            }
            MidiMessage::SongPosition { position } => {
                let (msb, lsb) = split14(position);
                vec![0xF2, lsb, msb]
            }
            MidiMessage::TuneRequest => vec![0xF6],
            MidiMessage::TimingClock => vec![0xF8],
            MidiMessage::Start => vec![0xFA],
            MidiMessage::Continue => vec![0xFB],
            MidiMessage::Stop => vec![0xFC],
            MidiMessage::ActiveSensing => vec![0xFE],
            MidiMessage::SystemReset => vec![0xFF],
            MidiMessage::SysEx(ref frame) => frame.clone(),
        }
    }

    /// Channel (0-15) for channel voice messages
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::PolyPressure { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::ChannelPressure { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }

    pub fn is_channel_message(&self) -> bool {
        self.channel().is_some()
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::ControlChange { channel, controller, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, controller, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "ProgramChange ch:{} p:{}", channel + 1, program)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            MidiMessage::SysEx(ref frame) => write!(f, "SysEx {} bytes", frame.len()),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// Split a 14-bit value into (msb, lsb) 7-bit halves
pub fn split14(value: u16) -> (u8, u8) {
    (((value >> 7) & 0x7F) as u8, (value & 0x7F) as u8)
}

/// Join 7-bit (msb, lsb) halves into a 14-bit value
pub fn join14(msb: u8, lsb: u8) -> u16 {
    ((msb as u16 & 0x7F) << 7) | (lsb as u16 & 0x7F)
}

/// Format MIDI bytes as hex string for logging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
