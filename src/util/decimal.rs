//! Decimal-string arithmetic for monetary values.
//!
//! Every monetary value crosses module boundaries as a decimal string and all
//! math routes through these helpers. Precision loss from accumulating many
//! small additions through binary floating point is not acceptable here.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecimalError {
    #[error("Unable to parse decimal string `{value}`")]
    Parse {
        value: String,
        source: rust_decimal::Error,
    },

    #[error("Division by zero")]
    DivideByZero,

    #[error("Decimal overflow")]
    Overflow,
}

pub fn parse(value: &str) -> Result<Decimal, DecimalError> {
    Decimal::from_str(value).map_err(|source| DecimalError::Parse {
        value: value.to_string(),
        source,
    })
}

pub fn add(a: &str, b: &str) -> Result<String, DecimalError> {
    parse(a)?
        .checked_add(parse(b)?)
        .ok_or(DecimalError::Overflow)
        .map(to_decimal_string)
}

pub fn mul(a: &str, b: &str) -> Result<String, DecimalError> {
    parse(a)?
        .checked_mul(parse(b)?)
        .ok_or(DecimalError::Overflow)
        .map(to_decimal_string)
}

/// Divide `a` by `b`, truncating the quotient toward zero to `digits`
/// fractional digits.
pub fn div(a: &str, b: &str, digits: u32) -> Result<String, DecimalError> {
    let divisor = parse(b)?;
    if divisor.is_zero() {
        return Err(DecimalError::DivideByZero);
    }

    parse(a)?
        .checked_div(divisor)
        .ok_or(DecimalError::Overflow)
        .map(|quotient| {
            to_decimal_string(quotient.round_dp_with_strategy(digits, RoundingStrategy::ToZero))
        })
}

pub fn gt(a: &str, b: &str) -> Result<bool, DecimalError> {
    Ok(parse(a)? > parse(b)?)
}

fn to_decimal_string(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add() {
        assert_eq!(add("0", "1.5").unwrap(), "1.5");
        assert_eq!(add("0.1", "0.2").unwrap(), "0.3");
        assert_eq!(add("100", "-0.25").unwrap(), "99.75");
    }

    #[test]
    fn test_add_many_small() {
        // 0.1 added one thousand times is exactly 100.
        let mut acc = String::from("0");
        for _ in 0..1000 {
            acc = add(&acc, "0.1").unwrap();
        }
        assert_eq!(acc, "100");
    }

    #[test]
    fn test_mul() {
        assert_eq!(mul("0.02", "3").unwrap(), "0.06");
        assert_eq!(mul("1.5", "10000").unwrap(), "15000");
        assert_eq!(mul("2", "0.0025").unwrap(), "0.005");
    }

    #[test]
    fn test_div_truncates_toward_zero() {
        assert_eq!(div("2", "3", 8).unwrap(), "0.66666666");
        assert_eq!(div("-2", "3", 8).unwrap(), "-0.66666666");
        assert_eq!(div("1", "2", 2).unwrap(), "0.5");
        assert_eq!(div("200", "10000", 8).unwrap(), "0.02");
    }

    #[test]
    fn test_div_by_zero() {
        assert!(matches!(div("1", "0", 8), Err(DecimalError::DivideByZero)));
    }

    #[test]
    fn test_gt() {
        assert!(gt("2", "1.99").unwrap());
        assert!(!gt("1.99", "1.99").unwrap());
        assert!(gt("202005010000", "202004300000").unwrap());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(add("bogus", "1"), Err(DecimalError::Parse { .. })));
    }
}
