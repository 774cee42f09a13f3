//! Reply texts sent back to users

/// Indicator for a non-negative change
pub const UP: &str = "📈";
/// Indicator for a negative change
pub const DOWN: &str = "📉";

pub const INVALID_VALUE: &str =
    "Please enter a valid numeric value, for example: 3001 or 4.058 or 5,140";

pub const START: &str = "Send me a weight in grams and I will save it and reply with the \
difference from the previous measurement.\n\nFor example: 3001 or 4.058 or 5,140";

/// Previous and current values with their signed difference
pub fn delta(previous: i64, current: i64) -> String {
    let difference = current.saturating_sub(previous);
    let indicator = if difference < 0 { DOWN } else { UP };
    format!(
        "Previous: {} g.\nCurrent: {} g.\n---------\nDifference: {} g. {}",
        previous, current, difference, indicator
    )
}
