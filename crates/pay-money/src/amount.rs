//! Decimal string <-> minor units.
//!
//! No floating point at any stage. Excess fractional digits are truncated,
//! never rounded: `"1.239"` at scale 2 is `123`.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::MoneyError;

/// Sign, integer digits and fractional digits of a plain decimal string.
pub(crate) struct DecimalParts<'a> {
    pub negative: bool,
    pub int_part: &'a str,
    pub frac_part: &'a str,
}

/// Split a decimal string.
///
/// Accepts an optional leading `+`/`-` and an optional fractional part.
/// Rejects empty input, a bare sign, a bare `.`, non-digits and repeated `.`.
pub(crate) fn split_decimal(raw: &str) -> Result<DecimalParts<'_>, MoneyError> {
    let invalid = || MoneyError::InvalidAmount {
        raw: raw.to_string(),
    };

    let s = raw.trim();
    let (negative, digits) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    let all_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }

    Ok(DecimalParts {
        negative,
        int_part,
        frac_part,
    })
}

/// Parse a run of ASCII digits (possibly empty or zero-padded) as a BigInt.
pub(crate) fn digits_to_bigint(digits: &str) -> BigInt {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return BigInt::zero();
    }
    // Only ASCII digits reach this point.
    BigInt::parse_bytes(trimmed.as_bytes(), 10).unwrap_or_default()
}

/// Convert a decimal string to minor units at `scale`.
///
/// The fractional part is padded or truncated to exactly `scale` digits.
pub fn to_minor_units(raw: &str, scale: u32) -> Result<BigInt, MoneyError> {
    let parts = split_decimal(raw)?;
    let scale = scale as usize;

    let mut frac: String = parts.frac_part.chars().take(scale).collect();
    while frac.len() < scale {
        frac.push('0');
    }

    let mut digits = String::with_capacity(parts.int_part.len() + frac.len());
    digits.push_str(parts.int_part);
    digits.push_str(&frac);

    let magnitude = digits_to_bigint(&digits);
    Ok(if parts.negative { -magnitude } else { magnitude })
}

/// Render minor units at `scale` as the shortest decimal string.
///
/// Trailing fractional zeros are trimmed; the integer part is always present
/// (`"5"`, `"0.05"`, `"-1.5"`).
pub fn from_minor_units(amount: &BigInt, scale: u32) -> String {
    let scale = scale as usize;
    let mut digits = amount.abs().to_string();
    let sign = if amount.is_negative() { "-" } else { "" };

    if scale == 0 {
        return format!("{sign}{digits}");
    }

    if digits.len() <= scale {
        let pad = scale + 1 - digits.len();
        digits.insert_str(0, &"0".repeat(pad));
    }

    let (int_part, frac_part) = digits.split_at(digits.len() - scale);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part}.{frac_part}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: i64) -> BigInt {
        BigInt::from(v)
    }

    #[test]
    fn truncates_instead_of_rounding() {
        assert_eq!(to_minor_units("1.239", 2).unwrap(), big(123));
        assert_eq!(to_minor_units("-1.239", 2).unwrap(), big(-123));
    }

    #[test]
    fn pads_short_fractions() {
        assert_eq!(to_minor_units("100.5", 2).unwrap(), big(10050));
        assert_eq!(to_minor_units("1", 8).unwrap(), big(100_000_000));
        assert_eq!(to_minor_units(".5", 2).unwrap(), big(50));
        assert_eq!(to_minor_units("5.", 2).unwrap(), big(500));
    }

    #[test]
    fn strips_leading_zeros_and_plus_sign() {
        assert_eq!(to_minor_units("+0007.10", 2).unwrap(), big(710));
        assert_eq!(to_minor_units("0.00", 2).unwrap(), big(0));
    }

    #[test]
    fn scale_zero_drops_fraction() {
        assert_eq!(to_minor_units("42.99", 0).unwrap(), big(42));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "-", ".", "1.2.3", "1e5", "abc", "1,5"] {
            assert!(to_minor_units(bad, 2).is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn renders_shortest_form() {
        assert_eq!(from_minor_units(&big(500), 2), "5");
        assert_eq!(from_minor_units(&big(5), 2), "0.05");
        assert_eq!(from_minor_units(&big(-150), 2), "-1.5");
        assert_eq!(from_minor_units(&big(0), 2), "0");
        assert_eq!(from_minor_units(&big(7), 0), "7");
        assert_eq!(from_minor_units(&big(-7), 0), "-7");
    }

    #[test]
    fn huge_amounts_are_exact() {
        let raw = "123456789012345678901234567890.123456789012345678";
        let n = to_minor_units(raw, 18).unwrap();
        assert_eq!(from_minor_units(&n, 18), raw);
    }
}
