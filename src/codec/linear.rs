//! Absolute value translation between logical ranges and wire bits
//!
//! Linear rescaling uses integer arithmetic with round-half-away-from-zero,
//! so translating a value to the wire and back returns the original value
//! whenever the wire span is at least as wide as the logical span.

use super::message::{Message, SignMode};

/// Translate a logical value onto the wire range of `message`.
///
/// The value is clamped to `[min, max]` and the result is packed into the
/// message bit width according to its sign mode.
pub fn encode(value: i32, min: i32, max: i32, message: &Message) -> u16 {
    let value = clamp_unordered(value, min, max);
    let wire = rescale(value, min, max, message.min, message.max);
    pack(wire, message.sign_mode, message.effective_bit_width())
}

/// Translate wire bits back to the logical range `[min, max]`
pub fn decode(wire: u16, min: i32, max: i32, message: &Message) -> i32 {
    let signed = unpack(wire, message.sign_mode, message.effective_bit_width());
    let signed = clamp_unordered(signed, message.min, message.max);
    rescale(signed, message.min, message.max, min, max)
}

/// Two-state translation used by pads: logical 1/0 map to on/off values
pub fn encode_toggle(value: i32, message: &Message) -> u16 {
    if value != 0 {
        message.on_value
    } else {
        message.off_value
    }
}

pub fn decode_toggle(wire: u16, message: &Message) -> i32 {
    i32::from(wire == message.on_value)
}

/// Index translation used by lists: the logical value is the wire value
pub fn encode_index(value: i32, bit_width: u8) -> u16 {
    value.clamp(0, full_scale(bit_width)) as u16
}

/// Pack a signed value into `bit_width` bits, clamping to what fits
pub fn pack(value: i32, mode: SignMode, bit_width: u8) -> u16 {
    let full = full_scale(bit_width);
    let bw = u32::from(bit_width.clamp(1, 14));
    let sign_bit = 1i32 << (bw - 1);

    match mode {
        SignMode::NoSign => value.clamp(0, full) as u16,
        SignMode::TwosComplement => (value.clamp(-sign_bit, sign_bit - 1) & full) as u16,
        SignMode::SignBit => {
            let magnitude = value.unsigned_abs().min((sign_bit - 1) as u32) as i32;
            if value < 0 && magnitude != 0 {
                (magnitude | sign_bit) as u16
            } else {
                magnitude as u16
            }
        }
    }
}

/// Inverse of [`pack`]
pub fn unpack(wire: u16, mode: SignMode, bit_width: u8) -> i32 {
    let full = full_scale(bit_width);
    let bw = u32::from(bit_width.clamp(1, 14));
    let sign_bit = 1i32 << (bw - 1);
    let raw = i32::from(wire) & full;

    match mode {
        SignMode::NoSign => raw,
        SignMode::TwosComplement => {
            if raw & sign_bit != 0 {
                raw - (1 << bw)
            } else {
                raw
            }
        }
        SignMode::SignBit => {
            let magnitude = raw & (sign_bit - 1);
            if raw & sign_bit != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
    }
}

/// Largest unsigned value representable in `bit_width` bits
pub fn full_scale(bit_width: u8) -> i32 {
    (1i32 << bit_width.clamp(1, 14)) - 1
}

/// Map `value` from `[from_a, from_b]` onto `[to_a, to_b]`; either range may be reversed.
///
/// Spans are computed in i128 so any pair of i32 ranges is accepted.
fn rescale(value: i32, from_a: i32, from_b: i32, to_a: i32, to_b: i32) -> i32 {
    if from_a == from_b {
        return to_a;
    }
    let numerator = (i128::from(value) - i128::from(from_a)) * (i128::from(to_b) - i128::from(to_a));
    let denominator = i128::from(from_b) - i128::from(from_a);
    let result = i128::from(to_a) + div_round(numerator, denominator);
    result.clamp(i128::from(to_a.min(to_b)), i128::from(to_a.max(to_b))) as i32
}

/// Integer division rounding half away from zero
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator.abs() / 2;
    if (numerator < 0) != (denominator < 0) {
        -((numerator.abs() + half) / denominator.abs())
    } else {
        (numerator.abs() + half) / denominator.abs()
    }
}

fn clamp_unordered(value: i32, a: i32, b: i32) -> i32 {
    value.clamp(a.min(b), a.max(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::message::MessageKind;
    use proptest::prelude::*;

    fn message(min: i32, max: i32, sign_mode: SignMode, bit_width: u8) -> Message {
        let mut msg = Message::new(1, MessageKind::Cc14, 1);
        msg.set_range(min, max);
        msg.set_sign_mode(sign_mode, bit_width);
        msg
    }

    #[test]
    fn test_identity_range() {
        let msg = message(0, 127, SignMode::NoSign, 7);
        assert_eq!(encode(0, 0, 127, &msg), 0);
        assert_eq!(encode(64, 0, 127, &msg), 64);
        assert_eq!(encode(127, 0, 127, &msg), 127);
        assert_eq!(decode(100, 0, 127, &msg), 100);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let msg = message(0, 127, SignMode::NoSign, 7);
        assert_eq!(encode(500, 0, 127, &msg), 127);
        assert_eq!(encode(-3, 0, 127, &msg), 0);

        // wire value above the declared wire range decodes to max
        let msg = message(0, 100, SignMode::NoSign, 7);
        assert_eq!(decode(127, 0, 100, &msg), 100);
    }

    #[test]
    fn test_scaling_rounds_to_nearest() {
        let msg = message(0, 16383, SignMode::NoSign, 14);
        assert_eq!(encode(64, 0, 127, &msg), 8256);
        assert_eq!(decode(8256, 0, 127, &msg), 64);
        assert_eq!(decode(8200, 0, 127, &msg), 64);
    }

    #[test]
    fn test_twos_complement_bipolar() {
        let msg = message(-64, 63, SignMode::TwosComplement, 7);
        assert_eq!(encode(-1, -64, 63, &msg), 0x7F);
        assert_eq!(encode(-64, -64, 63, &msg), 0x40);
        assert_eq!(decode(0x7F, -64, 63, &msg), -1);
    }

    #[test]
    fn test_sign_bit_bipolar() {
        let msg = message(-63, 63, SignMode::SignBit, 7);
        assert_eq!(encode(-5, -63, 63, &msg), 0x45);
        assert_eq!(encode(5, -63, 63, &msg), 0x05);
        assert_eq!(decode(0x45, -63, 63, &msg), -5);
    }

    #[test]
    fn test_reversed_wire_range() {
        let msg = message(127, 0, SignMode::NoSign, 7);
        assert_eq!(encode(0, 0, 127, &msg), 127);
        assert_eq!(encode(127, 0, 127, &msg), 0);
        assert_eq!(decode(27, 0, 127, &msg), 100);
    }

    #[test]
    fn test_degenerate_logical_range() {
        let msg = message(0, 127, SignMode::NoSign, 7);
        assert_eq!(encode(5, 5, 5, &msg), 0);
        assert_eq!(decode(90, 5, 5, &msg), 5);
    }

    #[test]
    fn test_full_i32_ranges() {
        let msg = message(i32::MIN, i32::MAX, SignMode::NoSign, 14);
        assert_eq!(encode(0, i32::MIN, i32::MAX, &msg), 0);
        assert_eq!(encode(i32::MIN, i32::MIN, i32::MAX, &msg), 0);

        let msg = message(0, 16383, SignMode::NoSign, 14);
        assert_eq!(encode(i32::MAX, i32::MIN, i32::MAX, &msg), 16383);
        assert_eq!(encode(i32::MIN, i32::MIN, i32::MAX, &msg), 0);
        assert_eq!(decode(16383, i32::MIN, i32::MAX, &msg), i32::MAX);
        assert_eq!(decode(0, i32::MIN, i32::MAX, &msg), i32::MIN);
    }

    #[test]
    fn test_toggle() {
        let mut msg = message(0, 127, SignMode::NoSign, 7);
        msg.set_on_off(100, 10);
        assert_eq!(encode_toggle(1, &msg), 100);
        assert_eq!(encode_toggle(0, &msg), 10);
        assert_eq!(decode_toggle(100, &msg), 1);
        assert_eq!(decode_toggle(99, &msg), 0);
    }

    #[test]
    fn test_index_is_not_scaled() {
        assert_eq!(encode_index(42, 7), 42);
        assert_eq!(encode_index(300, 7), 127);
        assert_eq!(encode_index(-1, 7), 0);
    }

    proptest! {
        #[test]
        fn prop_unsigned_round_trip(
            bit_width in 7u8..=14,
            min in -500i32..500,
            span in 0i32..127,
            seed in 0i32..10_000,
        ) {
            let max = min + span;
            let msg = message(0, full_scale(bit_width), SignMode::NoSign, bit_width);
            let value = min + seed % (span + 1);
            prop_assert_eq!(decode(encode(value, min, max, &msg), min, max, &msg), value);
        }

        #[test]
        fn prop_signed_round_trip(
            bit_width in 8u8..=14,
            signed_twos in any::<bool>(),
            span in 0i32..126,
            seed in 0i32..10_000,
        ) {
            let half = (1i32 << (bit_width - 1)) - 1;
            let (mode, wire_min) = if signed_twos {
                (SignMode::TwosComplement, -half - 1)
            } else {
                (SignMode::SignBit, -half)
            };
            let msg = message(wire_min, half, mode, bit_width);
            let min = -(span / 2);
            let max = min + span;
            let value = min + seed % (span + 1);
            prop_assert_eq!(decode(encode(value, min, max, &msg), min, max, &msg), value);
        }

        #[test]
        fn prop_any_range_is_total(
            value in any::<i32>(),
            min in any::<i32>(),
            max in any::<i32>(),
            wire_min in any::<i32>(),
            wire_max in any::<i32>(),
            bit_width in 1u8..=14,
            mode_index in 0usize..3,
        ) {
            let mode = [SignMode::NoSign, SignMode::TwosComplement, SignMode::SignBit][mode_index];
            let msg = message(wire_min, wire_max, mode, bit_width);
            let wire = encode(value, min, max, &msg);
            prop_assert!(i32::from(wire) <= full_scale(bit_width));
            let back = decode(wire, min, max, &msg);
            prop_assert!(back >= min.min(max) && back <= min.max(max));
        }

        #[test]
        fn prop_encode_fits_bit_width(
            bit_width in 1u8..=14,
            value in -20_000i32..20_000,
            mode_index in 0usize..3,
        ) {
            let mode = [SignMode::NoSign, SignMode::TwosComplement, SignMode::SignBit][mode_index];
            let packed = pack(value, mode, bit_width);
            prop_assert!(i32::from(packed) <= full_scale(bit_width));
        }
    }
}
