//! Wire message building
//!
//! Turns a [`Message`] descriptor and an encoded wire value into the raw
//! MIDI byte sequences sent to a device. Each inner `Vec<u8>` is one
//! complete MIDI message.

use super::message::{ByteOrder, Message, MessageKind, TemplateByte, TemplateToken};
use super::relative;
use crate::midi::{cc, split14, MidiMessage, SYSEX_END, SYSEX_START};

/// Build the MIDI messages carrying `value` for `message`.
///
/// `channel` is 1-16. Virtual and none messages produce nothing.
pub fn build(message: &Message, value: u16, channel: u8) -> Vec<Vec<u8>> {
    let ch = channel.saturating_sub(1) & 0x0F;
    let number = message.parameter_number;
    let seven = (value & 0x7F) as u8;

    match message.kind {
        MessageKind::Cc7 => vec![control_change(ch, (number & 0x7F) as u8, seven)],
        MessageKind::Cc14 => {
            let Some(controller) = cc14_controller(number) else {
                return Vec::new();
            };
            let (msb, lsb) = split14(value);
            let msb_msg = control_change(ch, controller, msb);
            let lsb_msg = control_change(ch, controller + 32, lsb);
            match message.byte_order {
                ByteOrder::MsbFirst => vec![msb_msg, lsb_msg],
                ByteOrder::LsbFirst => vec![lsb_msg, msb_msg],
            }
        }
        MessageKind::Nrpn | MessageKind::Rpn => {
            let mut out = parameter_select(message, ch);
            if message.effective_bit_width() > 7 {
                let (msb, lsb) = split14(value);
                out.push(control_change(ch, cc::DATA_ENTRY_MSB, msb));
                out.push(control_change(ch, cc::DATA_ENTRY_LSB, lsb));
            } else {
                out.push(control_change(ch, cc::DATA_ENTRY_MSB, seven));
            }
            push_rpn_reset(message, ch, &mut out);
            out
        }
        MessageKind::RelativeCc => vec![control_change(ch, (number & 0x7F) as u8, seven)],
        MessageKind::Note => {
            let note = (number & 0x7F) as u8;
            let msg = if value > 0 {
                MidiMessage::NoteOn { channel: ch, note, velocity: seven.max(1) }
            } else {
                MidiMessage::NoteOff { channel: ch, note, velocity: 0 }
            };
            vec![msg.to_bytes()]
        }
        MessageKind::Program => {
            vec![MidiMessage::ProgramChange { channel: ch, program: seven }.to_bytes()]
        }
        MessageKind::Pitchbend => {
            vec![MidiMessage::PitchBend { channel: ch, value: value & 0x3FFF }.to_bytes()]
        }
        MessageKind::AftertouchPoly => vec![MidiMessage::PolyPressure {
            channel: ch,
            note: (number & 0x7F) as u8,
            pressure: seven,
        }
        .to_bytes()],
        MessageKind::AftertouchChannel => {
            vec![MidiMessage::ChannelPressure { channel: ch, pressure: seven }.to_bytes()]
        }
        MessageKind::SongPosition => {
            vec![MidiMessage::SongPosition { position: value & 0x3FFF }.to_bytes()]
        }
        MessageKind::Start => transport(message, value, MidiMessage::Start),
        MessageKind::Stop => transport(message, value, MidiMessage::Stop),
        MessageKind::Tune => transport(message, value, MidiMessage::TuneRequest),
        MessageKind::Sysex => match &message.template {
            Some(template) => vec![expand_template(template, value, number, ch)],
            None => Vec::new(),
        },
        MessageKind::Virtual | MessageKind::None => Vec::new(),
    }
}

/// Build the MIDI messages carrying a relative change of `delta` steps.
///
/// Relative cc sends the delta byte on its controller; NRPN/RPN select the
/// parameter and send the delta on data entry MSB. Other kinds produce
/// nothing.
pub fn build_relative(message: &Message, delta: i32, channel: u8) -> Vec<Vec<u8>> {
    if delta == 0 {
        return Vec::new();
    }
    let ch = channel.saturating_sub(1) & 0x0F;
    let byte = relative::encode_delta(delta, message.relative_mode);

    match message.kind {
        MessageKind::RelativeCc => {
            vec![control_change(ch, (message.parameter_number & 0x7F) as u8, byte)]
        }
        MessageKind::Cc14 => match cc14_controller(message.parameter_number) {
            Some(controller) => vec![control_change(ch, controller, byte)],
            None => Vec::new(),
        },
        MessageKind::Nrpn | MessageKind::Rpn => {
            let mut out = parameter_select(message, ch);
            out.push(control_change(ch, cc::DATA_ENTRY_MSB, byte));
            push_rpn_reset(message, ch, &mut out);
            out
        }
        _ => Vec::new(),
    }
}

/// MSB controller of a 14-bit pair; only 0-31 have an LSB partner
fn cc14_controller(number: u16) -> Option<u8> {
    u8::try_from(number).ok().filter(|n| *n < 32)
}

fn control_change(channel: u8, controller: u8, value: u8) -> Vec<u8> {
    MidiMessage::ControlChange { channel, controller, value }.to_bytes()
}

fn parameter_select(message: &Message, ch: u8) -> Vec<Vec<u8>> {
    let (msb, lsb) = split14(message.parameter_number);
    let (msb_cc, lsb_cc) = if message.kind == MessageKind::Rpn {
        (cc::RPN_MSB, cc::RPN_LSB)
    } else {
        (cc::NRPN_MSB, cc::NRPN_LSB)
    };
    vec![control_change(ch, msb_cc, msb), control_change(ch, lsb_cc, lsb)]
}

fn push_rpn_reset(message: &Message, ch: u8, out: &mut Vec<Vec<u8>>) {
    if message.reset_rpn {
        out.push(control_change(ch, cc::RPN_MSB, 127));
        out.push(control_change(ch, cc::RPN_LSB, 127));
    }
}

fn transport(message: &Message, value: u16, msg: MidiMessage) -> Vec<Vec<u8>> {
    if value == message.on_value {
        vec![msg.to_bytes()]
    } else {
        Vec::new()
    }
}

/// Substitute template tokens and frame the result as one sysex message
pub fn expand_template(template: &[TemplateByte], value: u16, parameter: u16, ch: u8) -> Vec<u8> {
    let (value_msb, value_lsb) = split14(value);
    let (param_msb, param_lsb) = split14(parameter);

    let mut body: Vec<u8> = template
        .iter()
        .map(|byte| match byte {
            TemplateByte::Literal(b) => *b,
            TemplateByte::Token { token } => match token {
                TemplateToken::ValueLsb => value_lsb,
                TemplateToken::ValueMsb => value_msb,
                TemplateToken::ParameterLsb => param_lsb,
                TemplateToken::ParameterMsb => param_msb,
                TemplateToken::Channel => ch,
            },
        })
        .collect();

    if body.first() == Some(&SYSEX_START) {
        body.remove(0);
    }
    if body.last() == Some(&SYSEX_END) {
        body.pop();
    }

    let mut frame = Vec::with_capacity(body.len() + 2);
    frame.push(SYSEX_START);
    frame.extend(body.into_iter().map(|b| b & 0x7F));
    frame.push(SYSEX_END);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::message::RelativeMode;

    #[test]
    fn test_cc7() {
        let msg = Message::new(1, MessageKind::Cc7, 74);
        assert_eq!(build(&msg, 100, 1), vec![vec![0xB0, 74, 100]]);
        assert_eq!(build(&msg, 100, 16), vec![vec![0xBF, 74, 100]]);
    }

    #[test]
    fn test_cc14_byte_order() {
        let mut msg = Message::new(1, MessageKind::Cc14, 1);
        assert_eq!(build(&msg, 8193, 1), vec![vec![0xB0, 1, 0x40], vec![0xB0, 33, 0x01]]);

        msg.byte_order = ByteOrder::LsbFirst;
        assert_eq!(build(&msg, 8193, 1), vec![vec![0xB0, 33, 0x01], vec![0xB0, 1, 0x40]]);
    }

    #[test]
    fn test_cc14_needs_an_lsb_partner() {
        let msg = Message::new(1, MessageKind::Cc14, 31);
        assert_eq!(build(&msg, 1, 1), vec![vec![0xB0, 31, 0], vec![0xB0, 63, 1]]);

        for number in [32, 96, 288] {
            let mut msg = Message::new(1, MessageKind::Cc14, number);
            assert!(build(&msg, 8193, 1).is_empty());
            msg.set_relative(RelativeMode::TwosComplement, false);
            assert!(build_relative(&msg, 1, 1).is_empty());
        }
    }

    #[test]
    fn test_nrpn_with_rpn_reset() {
        let mut msg = Message::new(1, MessageKind::Nrpn, 300);
        msg.reset_rpn = true;
        let out = build(&msg, 1000, 2);
        assert_eq!(
            out,
            vec![
                vec![0xB1, 99, 2],
                vec![0xB1, 98, 44],
                vec![0xB1, 6, 7],
                vec![0xB1, 38, 104],
                vec![0xB1, 101, 127],
                vec![0xB1, 100, 127],
            ]
        );
    }

    #[test]
    fn test_seven_bit_rpn_sends_msb_only() {
        let mut msg = Message::new(1, MessageKind::Rpn, 0);
        msg.set_sign_mode(msg.sign_mode, 7);
        assert_eq!(
            build(&msg, 12, 1),
            vec![vec![0xB0, 101, 0], vec![0xB0, 100, 0], vec![0xB0, 6, 12]]
        );
    }

    #[test]
    fn test_note_on_off() {
        let msg = Message::new(1, MessageKind::Note, 60);
        assert_eq!(build(&msg, 127, 1), vec![vec![0x90, 60, 127]]);
        assert_eq!(build(&msg, 0, 1), vec![vec![0x80, 60, 0]]);
    }

    #[test]
    fn test_transport_only_on_value() {
        let msg = Message::new(1, MessageKind::Start, 0);
        assert_eq!(build(&msg, 127, 1), vec![vec![0xFA]]);
        assert!(build(&msg, 0, 1).is_empty());
    }

    #[test]
    fn test_virtual_emits_nothing() {
        let msg = Message::new(1, MessageKind::Virtual, 3);
        assert!(build(&msg, 64, 1).is_empty());
        let msg = Message::new(1, MessageKind::None, 3);
        assert!(build(&msg, 64, 1).is_empty());
    }

    #[test]
    fn test_sysex_template() {
        let mut msg = Message::new(1, MessageKind::Sysex, 0x0105);
        msg.template = Some(vec![
            TemplateByte::Literal(0x43),
            TemplateByte::Token { token: TemplateToken::Channel },
            TemplateByte::Token { token: TemplateToken::ParameterMsb },
            TemplateByte::Token { token: TemplateToken::ParameterLsb },
            TemplateByte::Token { token: TemplateToken::ValueLsb },
        ]);
        assert_eq!(build(&msg, 99, 3), vec![vec![0xF0, 0x43, 2, 0x02, 0x05, 99, 0xF7]]);
    }

    #[test]
    fn test_relative_outbound() {
        let mut msg = Message::new(1, MessageKind::RelativeCc, 20);
        msg.set_relative(RelativeMode::BinOffset, false);
        assert_eq!(build_relative(&msg, -1, 1), vec![vec![0xB0, 20, 63]]);
        assert!(build_relative(&msg, 0, 1).is_empty());

        let mut msg = Message::new(1, MessageKind::Nrpn, 5);
        msg.set_relative(RelativeMode::TwosComplement, false);
        assert_eq!(
            build_relative(&msg, 1, 1),
            vec![vec![0xB0, 99, 0], vec![0xB0, 98, 5], vec![0xB0, 6, 1]]
        );
    }
}
