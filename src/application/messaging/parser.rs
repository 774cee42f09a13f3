//! Value parser - Turns free-text measurements into fixed-point integers

use crate::application::errors::ParseError;
use crate::domain::entities::measurement::FIXED_POINT_SCALE;

/// Parses user input such as `3001`, `4.058` or `5,140`.
///
/// Decimal input is scaled by [`FIXED_POINT_SCALE`] and truncated toward
/// zero, whole numbers are kept as typed.
#[derive(Debug, Clone)]
pub struct ValueParser {
    scale: i64,
}

impl ValueParser {
    pub fn new() -> Self {
        Self {
            scale: FIXED_POINT_SCALE,
        }
    }

    pub fn parse(&self, text: &str) -> Result<i64, ParseError> {
        let normalized = normalize_decimal_comma(text);

        if normalized.contains('.') {
            self.parse_decimal(&normalized)
        } else {
            parse_integer(&normalized)
        }
    }

    fn parse_decimal(&self, text: &str) -> Result<i64, ParseError> {
        let invalid = |reason: String| ParseError::InvalidFloatFormat {
            input: text.to_string(),
            reason,
        };

        if let Some((negative, whole, fraction)) = split_plain_decimal(text) {
            return self
                .scale_digits(negative, whole, fraction)
                .ok_or_else(|| invalid("value out of range".to_string()));
        }

        // Exponent forms such as `1.5e2` still go through f64
        let value: f64 = text.parse().map_err(|e: std::num::ParseFloatError| invalid(e.to_string()))?;
        if !value.is_finite() {
            return Err(invalid("value is not finite".to_string()));
        }

        // `as` truncates toward zero and saturates at the i64 bounds
        Ok((value * self.scale as f64) as i64)
    }

    /// Exact `whole.fraction * scale`, digits past the scale are dropped
    fn scale_digits(&self, negative: bool, whole: &str, fraction: &str) -> Option<i64> {
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };

        let mut scaled_fraction = 0i64;
        let mut place = self.scale;
        for digit in fraction.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            scaled_fraction += i64::from(digit - b'0') * place;
        }

        let magnitude = whole.checked_mul(self.scale)?.checked_add(scaled_fraction)?;
        if negative {
            magnitude.checked_neg()
        } else {
            Some(magnitude)
        }
    }
}

impl Default for ValueParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A single comma is a decimal separator; anything else is left alone
fn normalize_decimal_comma(text: &str) -> String {
    match text.split_once(',') {
        Some((whole, fraction)) if !fraction.contains(',') => {
            format!("{}.{}", whole.trim(), fraction.trim())
        }
        _ => text.to_string(),
    }
}

/// `[+-]digits.digits` with at least one digit on either side
fn split_plain_decimal(text: &str) -> Option<(bool, &str, &str)> {
    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let (whole, fraction) = unsigned.split_once('.')?;
    let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction) {
        return None;
    }

    Some((negative, whole, fraction))
}

/// Signed integer, decimal or with a `0x`/`0o`/`0b` radix prefix
fn parse_integer(text: &str) -> Result<i64, ParseError> {
    let invalid = |reason: &str| ParseError::InvalidIntFormat {
        input: text.to_string(),
        reason: reason.to_string(),
    };

    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        Some(_) => (false, text),
        None => return Err(invalid("empty input")),
    };

    let (radix, digits) = split_radix_prefix(unsigned);
    if digits.is_empty() {
        return Err(invalid("no digits"));
    }
    if digits.starts_with(['+', '-']) {
        return Err(invalid("misplaced sign"));
    }

    let signed = if negative {
        format!("-{}", digits)
    } else {
        digits.to_string()
    };

    i64::from_str_radix(&signed, radix).map_err(|e| invalid(&e.to_string()))
}

fn split_radix_prefix(text: &str) -> (u32, &str) {
    let lower = text.get(..2).map(|p| p.to_ascii_lowercase());
    match lower.as_deref() {
        Some("0x") => (16, &text[2..]),
        Some("0o") => (8, &text[2..]),
        Some("0b") => (2, &text[2..]),
        _ => (10, text),
    }
}
