//! Exact rational helpers for amounts at different scales.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed};

use crate::amount::{digits_to_bigint, split_decimal};
use crate::MoneyError;

/// `10^exp` as a BigInt.
pub fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// Parse a decimal string exactly (no truncation).
pub fn parse_decimal(raw: &str) -> Result<BigRational, MoneyError> {
    let parts = split_decimal(raw)?;

    let mut digits = String::with_capacity(parts.int_part.len() + parts.frac_part.len());
    digits.push_str(parts.int_part);
    digits.push_str(parts.frac_part);

    let magnitude = digits_to_bigint(&digits);
    let numer = if parts.negative { -magnitude } else { magnitude };
    let denom = pow10(parts.frac_part.len() as u32);

    Ok(BigRational::new(numer, denom))
}

/// Smallest representable amount at `scale`: `10^-scale`.
pub fn quantum(scale: u32) -> BigRational {
    BigRational::new(BigInt::one(), pow10(scale))
}

/// `true` when `|a - b| <= tolerance`.
pub fn within(a: &BigRational, b: &BigRational, tolerance: &BigRational) -> bool {
    (a - b).abs() <= *tolerance
}

/// Convert an exact amount to minor units at `scale`, truncating toward zero.
pub fn rational_to_minor_units(value: &BigRational, scale: u32) -> BigInt {
    (value * BigRational::from_integer(pow10(scale))).to_integer()
}

/// Minor units at `scale` as an exact amount.
pub fn minor_units_to_rational(amount: &BigInt, scale: u32) -> BigRational {
    BigRational::new(amount.clone(), pow10(scale))
}

/// Render an exact amount at `scale` (truncated, shortest form).
pub fn format_rational(value: &BigRational, scale: u32) -> String {
    crate::from_minor_units(&rational_to_minor_units(value, scale), scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn parses_exactly() {
        assert_eq!(parse_decimal("100.5").unwrap(), r(201, 2));
        assert_eq!(parse_decimal("-0.25").unwrap(), r(-1, 4));
        assert_eq!(parse_decimal("3").unwrap(), r(3, 1));
    }

    #[test]
    fn quantum_matches_scale() {
        assert_eq!(quantum(2), r(1, 100));
        assert_eq!(quantum(0), r(1, 1));
    }

    #[test]
    fn truncation_toward_zero() {
        assert_eq!(rational_to_minor_units(&r(1239, 1000), 2), BigInt::from(123));
        assert_eq!(rational_to_minor_units(&r(-1239, 1000), 2), BigInt::from(-123));
    }

    #[test]
    fn within_tolerance_is_inclusive() {
        let q = quantum(2);
        assert!(within(&r(101, 100), &r(1, 1), &q));
        assert!(!within(&r(102, 100), &r(1, 1), &q));
    }

    #[test]
    fn format_rational_uses_scale() {
        assert_eq!(format_rational(&r(201, 2), 2), "100.5");
        assert_eq!(format_rational(&r(1, 3), 4), "0.3333");
    }
}
