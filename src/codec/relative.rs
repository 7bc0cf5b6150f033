//! Delta codec for relative (endless encoder) messages

use super::message::RelativeMode;

/// Interpret a 7-bit wire byte as a signed delta
pub fn decode_delta(byte: u8, mode: RelativeMode) -> i32 {
    let byte = i32::from(byte & 0x7F);
    let magnitude = byte & 0x3F;

    match mode {
        RelativeMode::TwosComplement => {
            if byte < 0x40 {
                byte
            } else {
                byte - 0x80
            }
        }
        RelativeMode::SignBit => {
            if byte & 0x40 != 0 {
                -magnitude
            } else {
                magnitude
            }
        }
        RelativeMode::SignBit2 => {
            if byte & 0x40 != 0 {
                magnitude
            } else {
                -magnitude
            }
        }
        RelativeMode::BinOffset => byte - 0x40,
    }
}

/// Produce the wire byte carrying `delta`, clamped to what the mode can express
pub fn encode_delta(delta: i32, mode: RelativeMode) -> u8 {
    match mode {
        RelativeMode::TwosComplement => (delta.clamp(-64, 63) & 0x7F) as u8,
        RelativeMode::SignBit => {
            let magnitude = delta.unsigned_abs().min(63) as u8;
            if delta < 0 {
                0x40 | magnitude
            } else {
                magnitude
            }
        }
        RelativeMode::SignBit2 => {
            let magnitude = delta.unsigned_abs().min(63) as u8;
            if delta > 0 {
                0x40 | magnitude
            } else {
                magnitude
            }
        }
        RelativeMode::BinOffset => (delta.clamp(-64, 63) + 0x40) as u8,
    }
}

/// Delta actually applied to the logical value.
///
/// Without acceleration every non-zero wire delta moves the value by one
/// step; with acceleration the full magnitude is applied.
pub fn applied_delta(wire_delta: i32, accelerated: bool) -> i32 {
    if accelerated {
        wire_delta
    } else {
        wire_delta.signum()
    }
}

/// Apply a relative wire byte to a logical value, clamped to `[min, max]`
pub fn apply(value: i32, byte: u8, mode: RelativeMode, accelerated: bool, min: i32, max: i32) -> i32 {
    let delta = applied_delta(decode_delta(byte, mode), accelerated);
    value.saturating_add(delta).clamp(min.min(max), min.max(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MODES: [RelativeMode; 4] = [
        RelativeMode::TwosComplement,
        RelativeMode::SignBit,
        RelativeMode::SignBit2,
        RelativeMode::BinOffset,
    ];

    #[test]
    fn test_decode_known_bytes() {
        assert_eq!(decode_delta(0x01, RelativeMode::TwosComplement), 1);
        assert_eq!(decode_delta(0x7F, RelativeMode::TwosComplement), -1);
        assert_eq!(decode_delta(0x41, RelativeMode::SignBit), -1);
        assert_eq!(decode_delta(0x01, RelativeMode::SignBit), 1);
        assert_eq!(decode_delta(0x41, RelativeMode::SignBit2), 1);
        assert_eq!(decode_delta(0x01, RelativeMode::SignBit2), -1);
        assert_eq!(decode_delta(0x41, RelativeMode::BinOffset), 1);
        assert_eq!(decode_delta(0x3F, RelativeMode::BinOffset), -1);
    }

    #[test]
    fn test_acceleration_applies_full_magnitude() {
        assert_eq!(apply(10, 0x05, RelativeMode::TwosComplement, false, 0, 127), 11);
        assert_eq!(apply(10, 0x05, RelativeMode::TwosComplement, true, 0, 127), 15);
        assert_eq!(apply(126, 0x05, RelativeMode::TwosComplement, true, 0, 127), 127);
        assert_eq!(apply(2, 0x7B, RelativeMode::TwosComplement, true, 0, 127), 0);
    }

    #[test]
    fn test_apply_saturates_at_i32_bounds() {
        assert_eq!(apply(i32::MAX, 0x3F, RelativeMode::TwosComplement, true, i32::MIN, i32::MAX), i32::MAX);
        assert_eq!(apply(i32::MIN, 0x40, RelativeMode::TwosComplement, true, i32::MIN, i32::MAX), i32::MIN);
    }

    proptest! {
        #[test]
        fn prop_apply_stays_in_range(
            value in any::<i32>(),
            byte in 0u8..=127,
            min in any::<i32>(),
            max in any::<i32>(),
            accelerated in any::<bool>(),
            mode_index in 0usize..4,
        ) {
            let next = apply(value, byte, MODES[mode_index], accelerated, min, max);
            prop_assert!(next >= min.min(max) && next <= min.max(max));
        }

        #[test]
        fn prop_unaccelerated_delta_is_unit(byte in 0u8..=127, mode_index in 0usize..4) {
            let delta = applied_delta(decode_delta(byte, MODES[mode_index]), false);
            prop_assert!((-1..=1).contains(&delta));
        }

        #[test]
        fn prop_delta_byte_round_trip(delta in -63i32..=63, mode_index in 0usize..4) {
            let mode = MODES[mode_index];
            prop_assert_eq!(decode_delta(encode_delta(delta, mode), mode), delta);
        }
    }
}
