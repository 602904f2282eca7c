//! Fixed-width hexadecimal field primitives shared by both wire layouts.
//!
//! The weather stations transmit every field as ASCII hex digits. Narrow
//! signed fields are two's complement over the field width, except that the
//! firmware flags the negative range from a raised threshold (`0xCFF` for
//! 12-bit directions, `0xCFFF` for 16-bit sensor values) instead of the top
//! bit. Coordinates and altitude use the standard top-bit threshold.

use super::CodecError;

/// 12-bit wind-direction fields. Values above this decode as negative.
pub const THRESHOLD_DIR_12: u32 = 0xcff;
/// 16-bit temperature/timezone fields (and the legacy wind direction).
pub const THRESHOLD_SENSOR_16: u32 = 0xcfff;
/// 16-bit altitude, standard two's complement.
pub const THRESHOLD_ALTITUDE_16: u32 = 0x7fff;
/// 32-bit latitude/longitude, standard two's complement.
pub const THRESHOLD_COORD_32: u32 = 0x7fffffff;

/// Pressure wire values carry hPa above this baseline.
pub const BASELINE_PRESSURE: f64 = 900.00;
/// Temperature wire values carry degrees C above this baseline.
pub const BASELINE_TEMPERATURE: f64 = 50.00;
/// Gateway frames carry seconds since 2022-01-01T00:00:00Z.
pub const BASELINE_TIME: i64 = 1_640_995_200;

/// The station firmware reconstructs negative coordinates with a
/// `0xffffffff` bias, not `1 << 32`. Keep in sync with the firmware's
/// `constants.h`.
pub const COORD_NEGATIVE_BIAS: i64 = 4_294_967_295;

/// Plain base-16 parse of a field substring.
pub fn decode_unsigned(field: &'static str, hex: &str) -> Result<i64, CodecError> {
    i64::from_str_radix(hex, 16).map_err(|_| CodecError::NotHex {
        field,
        text: hex.to_string(),
    })
}

/// Two's-complement decode over `width_bits`, treating values above
/// `neg_threshold` as the negative range.
pub fn decode_signed_2c(
    field: &'static str,
    hex: &str,
    width_bits: u32,
    neg_threshold: u32,
) -> Result<i64, CodecError> {
    let raw = decode_unsigned(field, hex)?;
    if raw > neg_threshold as i64 {
        Ok(raw - (1i64 << width_bits))
    } else {
        Ok(raw)
    }
}

/// Remove the implied decimals from a raw wire integer.
pub fn scale(raw: i64, divisor: i64) -> f64 {
    raw as f64 / divisor as f64
}

/// Round to the two decimal places the wire format carries.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Bias a negative value by `2^width_bits` into the unsigned wire range.
pub fn signed_bits(value: i64, width_bits: u32) -> u64 {
    if value < 0 {
        (value + (1i64 << width_bits)) as u64
    } else {
        value as u64
    }
}

/// Hex-format `value` left-zero-padded to `width_bits / 4` digits, biasing
/// negatives by `2^width_bits`.
pub fn encode_signed_2c(value: i64, width_bits: u32) -> String {
    format!(
        "{:0width$x}",
        signed_bits(value, width_bits),
        width = (width_bits / 4) as usize
    )
}

/// Wire bits for a scaled latitude/longitude integer, biasing negatives by
/// the firmware's off-by-one constant (see [`COORD_NEGATIVE_BIAS`]).
pub fn coordinate_bits(scaled: i64) -> u32 {
    if scaled < 0 {
        (scaled + COORD_NEGATIVE_BIAS) as u32
    } else {
        scaled as u32
    }
}

/// Encode a scaled latitude/longitude integer as 8 hex digits.
pub fn encode_coordinate(scaled: i64) -> String {
    format!("{:08x}", coordinate_bits(scaled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_decodes_plain_hex() {
        assert_eq!(decode_unsigned("t", "1388").unwrap(), 5000);
        assert_eq!(decode_unsigned("t", "00000000").unwrap(), 0);
        assert_eq!(decode_unsigned("t", "ffffffff").unwrap(), 4294967295);
    }

    #[test]
    fn unsigned_rejects_non_hex() {
        assert!(decode_unsigned("t", "12g4").is_err());
        assert!(decode_unsigned("t", "").is_err());
    }

    #[test]
    fn wind_direction_sentinel_decodes_minus_one() {
        assert_eq!(decode_signed_2c("w", "fff", 12, THRESHOLD_DIR_12).unwrap(), -1);
        assert_eq!(decode_signed_2c("w", "000", 12, THRESHOLD_DIR_12).unwrap(), 0);
        assert_eq!(decode_signed_2c("w", "7ff", 12, THRESHOLD_DIR_12).unwrap(), 2047);
        // largest value still read as positive
        assert_eq!(decode_signed_2c("w", "cff", 12, THRESHOLD_DIR_12).unwrap(), 0xcff);
        assert_eq!(decode_signed_2c("w", "d00", 12, THRESHOLD_DIR_12).unwrap(), -768);
    }

    #[test]
    fn sixteen_bit_sensor_threshold() {
        assert_eq!(
            decode_signed_2c("t", "ffff", 16, THRESHOLD_SENSOR_16).unwrap(),
            -1
        );
        assert_eq!(
            decode_signed_2c("t", "cfff", 16, THRESHOLD_SENSOR_16).unwrap(),
            0xcfff
        );
    }

    #[test]
    fn coordinate_threshold_is_standard_twos_complement() {
        assert_eq!(
            decode_signed_2c("lat", "ffcc525e", 32, THRESHOLD_COORD_32).unwrap(),
            -3_386_786
        );
        assert_eq!(
            decode_signed_2c("lat", "7fffffff", 32, THRESHOLD_COORD_32).unwrap(),
            0x7fffffff
        );
    }

    #[test]
    fn temperature_baseline_decodes_to_zero() {
        let raw = decode_unsigned("temperature", "1388").unwrap();
        let celsius = round2(scale(raw, 100) - BASELINE_TEMPERATURE);
        assert_eq!(celsius, 0.00);
    }

    #[test]
    fn signed_encode_pads_and_biases() {
        assert_eq!(encode_signed_2c(190, 16), "00be");
        assert_eq!(encode_signed_2c(-2, 16), "fffe");
        assert_eq!(encode_signed_2c(10, 8), "0a");
        assert_eq!(encode_signed_2c(-1, 8), "ff");
    }

    #[test]
    fn coordinate_encode_uses_firmware_bias() {
        // -33.86785 deg scaled to -3386785: biased by 2^32 - 1, one less
        // than true two's complement would give.
        assert_eq!(encode_coordinate(-3_386_785), "ffcc525e");
        assert_eq!(encode_coordinate(5_307_024), "0050fa90");
    }

    #[test]
    fn signed_fields_round_trip_within_their_ranges() {
        for value in [-768i64, -1, 0, 1, 180, 359, 2047] {
            let hex = encode_signed_2c(value, 12);
            assert_eq!(
                decode_signed_2c("dir", &hex, 12, THRESHOLD_DIR_12).unwrap(),
                value
            );
        }
        for value in [-4000i64, -1, 0, 5000, 12000, 0xcfff] {
            let hex = encode_signed_2c(value, 16);
            assert_eq!(
                decode_signed_2c("temp", &hex, 16, THRESHOLD_SENSOR_16).unwrap(),
                value
            );
        }
        for value in [-430i64, 0, 190, 8848] {
            let hex = encode_signed_2c(value, 16);
            assert_eq!(
                decode_signed_2c("alt", &hex, 16, THRESHOLD_ALTITUDE_16).unwrap(),
                value
            );
        }
    }
}
