//! Outbound frames: ack/nack, notification events, file transfers

use super::{CommandKind, ObjectKind};
use crate::midi::{SYSEX_END, SYSEX_START};

const REPLY: u8 = 0x7E;
const ACK: u8 = 0x01;
const NACK: u8 = 0x00;

/// Payload bytes per file-transfer frame
pub const FILE_CHUNK_SIZE: usize = 256;

/// Notification sent to the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PresetSlotChanged { bank: u8, slot: u8 },
    SnapshotChange,
    SnapshotBankSwitch { bank: u8 },
    PageSwitch { page: u8 },
    ControlSetSwitch { control_set: u8 },
    /// Channel message observed while MIDI learn is on
    MidiLearn {
        port: u8,
        kind: u8,
        channel: u8,
        parameter: u16,
        value: u16,
    },
}

impl Event {
    fn code(&self) -> u8 {
        match self {
            Event::PresetSlotChanged { .. } => 0x02,
            Event::SnapshotChange => 0x03,
            Event::SnapshotBankSwitch { .. } => 0x04,
            Event::PageSwitch { .. } => 0x05,
            Event::ControlSetSwitch { .. } => 0x06,
            Event::MidiLearn { .. } => 0x07,
        }
    }

    /// Bit of the subscribed-events mask gating this event; 0 is always sent
    pub fn subscription_bit(&self) -> u8 {
        use super::events;
        match self {
            Event::PresetSlotChanged { .. } => events::PRESET_SLOT,
            Event::SnapshotChange => events::SNAPSHOT,
            Event::SnapshotBankSwitch { .. } => events::SNAPSHOT_BANK,
            Event::PageSwitch { .. } => events::PAGE,
            Event::ControlSetSwitch { .. } => events::CONTROL_SET,
            Event::MidiLearn { .. } => 0,
        }
    }

    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = vec![SYSEX_START, REPLY, self.code()];
        match *self {
            Event::PresetSlotChanged { bank, slot } => frame.extend([bank, slot]),
            Event::SnapshotChange => {}
            Event::SnapshotBankSwitch { bank } => frame.push(bank),
            Event::PageSwitch { page } => frame.push(page),
            Event::ControlSetSwitch { control_set } => frame.push(control_set),
            Event::MidiLearn {
                port,
                kind,
                channel,
                parameter,
                value,
            } => {
                frame.extend([port, kind, channel]);
                frame.extend(split_lsb_first(parameter));
                frame.extend(split_lsb_first(value));
            }
        }
        frame.push(SYSEX_END);
        frame
    }
}

fn split_lsb_first(value: u16) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

pub fn ack() -> Vec<u8> {
    vec![SYSEX_START, REPLY, ACK, SYSEX_END]
}

pub fn nack() -> Vec<u8> {
    vec![SYSEX_START, REPLY, NACK, SYSEX_END]
}

/// Split a 7-bit clean payload into file-transfer frames `F0 01 <object> ... F7`
pub fn file_frames(object: ObjectKind, payload: &[u8]) -> Vec<Vec<u8>> {
    let header = [SYSEX_START, CommandKind::FileUpload.to_byte(), object.to_byte()];
    if payload.is_empty() {
        let mut frame = header.to_vec();
        frame.push(SYSEX_END);
        return vec![frame];
    }
    payload
        .chunks(FILE_CHUNK_SIZE)
        .map(|chunk| {
            let mut frame = Vec::with_capacity(chunk.len() + 4);
            frame.extend_from_slice(&header);
            frame.extend(chunk.iter().map(|b| b & 0x7F));
            frame.push(SYSEX_END);
            frame
        })
        .collect()
}

/// Frames carrying a JSON document, non-ASCII characters escaped
pub fn json_frames(object: ObjectKind, json: &str) -> Vec<Vec<u8>> {
    file_frames(object, ascii_json(json).as_bytes())
}

/// Frames carrying arbitrary binary data, 7-bit packed
pub fn binary_frames(object: ObjectKind, data: &[u8]) -> Vec<Vec<u8>> {
    file_frames(object, &pack_7bit(data))
}

/// Replace every non-ASCII character by its `\uXXXX` escape
pub fn ascii_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// Pack 8-bit data into 7-bit bytes: each group of up to seven bytes is
/// preceded by one byte holding their high bits (bit i for byte i)
pub fn pack_7bit(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len().div_ceil(7));
    for group in data.chunks(7) {
        let high_bits = group
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, b)| acc | ((b >> 7) << i));
        out.push(high_bits);
        out.extend(group.iter().map(|b| b & 0x7F));
    }
    out
}

/// Inverse of [`pack_7bit`]
pub fn unpack_7bit(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for group in data.chunks(8) {
        let Some((&high_bits, rest)) = group.split_first() else {
            continue;
        };
        out.extend(
            rest.iter()
                .enumerate()
                .map(|(i, b)| (b & 0x7F) | (((high_bits >> i) & 1) << 7)),
        );
    }
    out
}
