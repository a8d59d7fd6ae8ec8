//! Round-half-up on the decimal form of a value, for display only.
//!
//! Works on the shortest representation that round-trips (`12.345`, not the
//! binary expansion `12.3449999…`), so a printed `5` always rounds away from zero.

/// Format `value` with exactly `decimals` fractional digits, rounding half up
pub fn format_half_up(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let repr = value.abs().to_string();
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(decimals))
        .map(|b| b - b'0')
        .collect();

    let round_up = frac_part
        .as_bytes()
        .get(decimals)
        .map_or(false, |&b| b >= b'5');

    if round_up {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let split = digits.len() - decimals;
    let mut out = String::with_capacity(digits.len() + 2);
    if value.is_sign_negative() && digits.iter().any(|&d| d != 0) {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|&d| char::from(b'0' + d)));
    if decimals > 0 {
        out.push('.');
        out.extend(digits[split..].iter().map(|&d| char::from(b'0' + d)));
    }
    out
}

/// Numeric counterpart of [`format_half_up`]
pub fn round_half_up(value: f64, decimals: usize) -> f64 {
    format_half_up(value, decimals).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_up_not_half_even() {
        assert_eq!(format_half_up(12.345, 2), "12.35");
        assert_eq!(round_half_up(12.345, 2), 12.35);
        // half-to-even would give 0.12
        assert_eq!(format_half_up(0.125, 2), "0.13");
        assert_eq!(format_half_up(2.5, 0), "3");
    }

    #[test]
    fn test_padding_and_truncation() {
        assert_eq!(format_half_up(37.0, 2), "37.00");
        assert_eq!(format_half_up(0.1 + 0.2, 2), "0.30");
        assert_eq!(format_half_up(12.344, 2), "12.34");
        assert_eq!(format_half_up(0.0, 2), "0.00");
    }

    #[test]
    fn test_carry() {
        assert_eq!(format_half_up(99.995, 2), "100.00");
        assert_eq!(format_half_up(9.96, 1), "10.0");
    }

    #[test]
    fn test_negative_rounds_away_from_zero() {
        assert_eq!(format_half_up(-1.005, 2), "-1.01");
        assert_eq!(format_half_up(-0.001, 2), "0.00");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_half_up(f64::NAN, 2), "NaN");
        assert!(round_half_up(f64::NAN, 2).is_nan());
    }
}
