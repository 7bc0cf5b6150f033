//! Message descriptor: the wire encoding rule for one logical value

use serde::{Deserialize, Serialize};

/// Kind of MIDI message a value is carried by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Cc7,
    Cc14,
    Nrpn,
    Rpn,
    Note,
    Program,
    Sysex,
    Start,
    Stop,
    Tune,
    #[serde(alias = "pitchBend")]
    Pitchbend,
    #[serde(rename = "atpoly", alias = "atPoly")]
    AftertouchPoly,
    #[serde(rename = "atchannel", alias = "atChannel")]
    AftertouchChannel,
    #[serde(rename = "spp")]
    SongPosition,
    #[serde(rename = "relcc", alias = "relativeCc")]
    RelativeCc,
    Virtual,
    None,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::None
    }
}

impl MessageKind {
    /// Stable byte used in snapshot blobs
    pub fn to_byte(self) -> u8 {
        match self {
            MessageKind::Virtual => 0,
            MessageKind::Cc7 => 1,
            MessageKind::Cc14 => 2,
            MessageKind::Nrpn => 3,
            MessageKind::Rpn => 4,
            MessageKind::Note => 5,
            MessageKind::Program => 6,
            MessageKind::Sysex => 7,
            MessageKind::Start => 8,
            MessageKind::Stop => 9,
            MessageKind::Tune => 10,
            MessageKind::Pitchbend => 11,
            MessageKind::AftertouchPoly => 12,
            MessageKind::AftertouchChannel => 13,
            MessageKind::SongPosition => 14,
            MessageKind::RelativeCc => 15,
            MessageKind::None => 0x7F,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => MessageKind::Virtual,
            1 => MessageKind::Cc7,
            2 => MessageKind::Cc14,
            3 => MessageKind::Nrpn,
            4 => MessageKind::Rpn,
            5 => MessageKind::Note,
            6 => MessageKind::Program,
            7 => MessageKind::Sysex,
            8 => MessageKind::Start,
            9 => MessageKind::Stop,
            10 => MessageKind::Tune,
            11 => MessageKind::Pitchbend,
            12 => MessageKind::AftertouchPoly,
            13 => MessageKind::AftertouchChannel,
            14 => MessageKind::SongPosition,
            15 => MessageKind::RelativeCc,
            0x7F => MessageKind::None,
            _ => return None,
        })
    }

    /// Natural width of the wire value
    pub fn default_bit_width(self) -> u8 {
        match self {
            MessageKind::Cc14
            | MessageKind::Nrpn
            | MessageKind::Rpn
            | MessageKind::Pitchbend
            | MessageKind::SongPosition => 14,
            _ => 7,
        }
    }

    /// Kinds that carry a parameter-number selection sequence
    pub fn is_parameter_number(self) -> bool {
        matches!(self, MessageKind::Nrpn | MessageKind::Rpn)
    }

    /// Kinds that may be marked relative
    pub fn supports_relative(self) -> bool {
        matches!(
            self,
            MessageKind::Cc14 | MessageKind::Nrpn | MessageKind::Rpn | MessageKind::RelativeCc
        )
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageKind::Cc7 => "cc7",
            MessageKind::Cc14 => "cc14",
            MessageKind::Nrpn => "nrpn",
            MessageKind::Rpn => "rpn",
            MessageKind::Note => "note",
            MessageKind::Program => "program",
            MessageKind::Sysex => "sysex",
            MessageKind::Start => "start",
            MessageKind::Stop => "stop",
            MessageKind::Tune => "tune",
            MessageKind::Pitchbend => "pitchbend",
            MessageKind::AftertouchPoly => "atpoly",
            MessageKind::AftertouchChannel => "atchannel",
            MessageKind::SongPosition => "spp",
            MessageKind::RelativeCc => "relcc",
            MessageKind::Virtual => "virtual",
            MessageKind::None => "none",
        };
        f.write_str(name)
    }
}

/// Representation of negative values inside the wire bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignMode {
    #[default]
    #[serde(alias = "none")]
    NoSign,
    TwosComplement,
    /// Sign-magnitude: the top bit of the field is the sign
    SignBit,
}

/// Interpretation of a relative (delta) byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelativeMode {
    #[default]
    TwosComplement,
    /// Bit 6 set means negative
    SignBit,
    /// Bit 6 set means positive
    SignBit2,
    /// Value minus 64
    BinOffset,
}

/// Transmission order of the two halves of a 14-bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ByteOrder {
    #[default]
    MsbFirst,
    LsbFirst,
}

/// One byte position of a sysex template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateByte {
    Literal(u8),
    Token {
        #[serde(rename = "type")]
        token: TemplateToken,
    },
}

/// Placeholder substituted when a sysex template is expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateToken {
    ValueLsb,
    ValueMsb,
    ParameterLsb,
    ParameterMsb,
    Channel,
}

/// Wire encoding rule for one logical value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    pub device_id: u8,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub parameter_number: u16,
    /// Wire range, signed interpretation when a sign mode is set
    pub min: i32,
    pub max: i32,
    pub on_value: u16,
    pub off_value: u16,
    pub sign_mode: SignMode,
    pub bit_width: u8,
    pub byte_order: ByteOrder,
    pub reset_rpn: bool,
    pub relative: bool,
    pub relative_mode: RelativeMode,
    pub accelerated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Vec<TemplateByte>>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            device_id: 1,
            kind: MessageKind::None,
            parameter_number: 0,
            min: 0,
            max: 127,
            on_value: 127,
            off_value: 0,
            sign_mode: SignMode::NoSign,
            bit_width: 7,
            byte_order: ByteOrder::MsbFirst,
            reset_rpn: false,
            relative: false,
            relative_mode: RelativeMode::TwosComplement,
            accelerated: false,
            template: None,
        }
    }
}

impl Message {
    /// Message of `kind` with its natural wire range
    pub fn new(device_id: u8, kind: MessageKind, parameter_number: u16) -> Self {
        let bit_width = kind.default_bit_width();
        Self {
            device_id,
            kind,
            parameter_number,
            max: (1 << bit_width) - 1,
            bit_width,
            ..Self::default()
        }
    }

    pub fn set_range(&mut self, min: i32, max: i32) {
        self.min = min;
        self.max = max;
    }

    pub fn set_on_off(&mut self, on_value: u16, off_value: u16) {
        self.on_value = on_value;
        self.off_value = off_value;
    }

    pub fn set_sign_mode(&mut self, sign_mode: SignMode, bit_width: u8) {
        self.sign_mode = sign_mode;
        self.bit_width = bit_width.clamp(1, 14);
    }

    pub fn set_relative(&mut self, mode: RelativeMode, accelerated: bool) {
        self.relative = true;
        self.relative_mode = mode;
        self.accelerated = accelerated;
    }

    /// Relative messages carry deltas instead of absolute values
    pub fn is_relative(&self) -> bool {
        self.kind == MessageKind::RelativeCc || (self.relative && self.kind.supports_relative())
    }

    /// Bit width limited to what the wire can carry
    pub fn effective_bit_width(&self) -> u8 {
        self.bit_width.clamp(1, 14)
    }

    /// Whether values of this message ever reach the wire
    pub fn is_transmitted(&self) -> bool {
        !matches!(self.kind, MessageKind::None | MessageKind::Virtual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_byte_mapping_is_stable() {
        for byte in 0..=15u8 {
            let kind = MessageKind::from_byte(byte).unwrap();
            assert_eq!(kind.to_byte(), byte);
        }
        assert_eq!(MessageKind::from_byte(0x40), None);
    }

    #[test]
    fn test_new_uses_natural_range() {
        let msg = Message::new(1, MessageKind::Nrpn, 300);
        assert_eq!(msg.bit_width, 14);
        assert_eq!(msg.max, 16383);

        let msg = Message::new(1, MessageKind::Cc7, 7);
        assert_eq!(msg.max, 127);
    }

    #[test]
    fn test_relative_only_for_capable_kinds() {
        let mut msg = Message::new(1, MessageKind::Note, 60);
        msg.set_relative(RelativeMode::BinOffset, false);
        assert!(!msg.is_relative());

        let mut msg = Message::new(1, MessageKind::Nrpn, 60);
        msg.set_relative(RelativeMode::BinOffset, false);
        assert!(msg.is_relative());

        assert!(Message::new(1, MessageKind::RelativeCc, 10).is_relative());
    }

    #[test]
    fn test_deserialize_is_permissive() {
        let msg: Message =
            serde_json::from_str(r#"{"deviceId": 2, "type": "cc14", "parameterNumber": 10}"#)
                .unwrap();
        assert_eq!(msg.device_id, 2);
        assert_eq!(msg.kind, MessageKind::Cc14);
        assert_eq!(msg.on_value, 127);
        assert_eq!(msg.sign_mode, SignMode::NoSign);
    }
}
