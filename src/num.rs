//! Numeric literals.
//!
//! Numbers live on the stack as text. They’re written back out in base 10, but literals in a
//! script may also use a `0x`, `0o`, or `0b` radix prefix.

use thiserror::Error;

#[allow(missing_docs)]
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("empty string is not a number")]
    Empty,

    #[error("invalid digit in {0:?} for base {1}")]
    InvalidDigit(String, u32),

    #[error("{0:?} doesn’t fit in a 64-bit signed integer")]
    Overflow(String),
}

/// Splits a radix prefix off of an unsigned literal.
fn split_radix(digits: &str) -> (u32, &str) {
    match digits.get(..2) {
        Some("0x" | "0X") => (16, &digits[2..]),
        Some("0o" | "0O") => (8, &digits[2..]),
        Some("0b" | "0B") => (2, &digits[2..]),
        _ => (10, digits),
    }
}

/// Convert a literal to the integer it encodes.
///
/// Accepts an optional sign, then either plain decimal digits or digits following a radix
/// prefix. Leading zeros on a decimal literal do _not_ switch to octal.
pub fn parse(s: &str) -> Result<i64, Error> {
    let (negative, unsigned) = match s.as_bytes().first() {
        None => return Err(Error::Empty),
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        Some(_) => (false, s),
    };
    let (radix, digits) = split_radix(unsigned);
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(Error::InvalidDigit(s.to_owned(), radix));
    }

    // Accumulate as `u64` so `i64::MIN` is reachable.
    let magnitude = digits
        .chars()
        .try_fold(0u64, |acc, c| {
            c.to_digit(radix)
                .and_then(|d| acc.checked_mul(radix.into())?.checked_add(d.into()))
        })
        .ok_or_else(|| Error::Overflow(s.to_owned()))?;

    if negative {
        0i64.checked_sub_unsigned(magnitude)
    } else {
        i64::try_from(magnitude).ok()
    }
    .ok_or_else(|| Error::Overflow(s.to_owned()))
}

/// The canonical text of a number, which is always base 10.
pub fn serialize(value: i64) -> String {
    value.to_string()
}
