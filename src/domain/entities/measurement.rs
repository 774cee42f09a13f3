use chrono::{DateTime, Utc};

/// Number of smallest units in one whole unit of a measurement
pub const FIXED_POINT_SCALE: i64 = 1000;

/// One persisted reading.
///
/// `value` is a fixed-point integer: kilograms typed with a decimal
/// separator are stored as grams, whole numbers are stored as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measurement {
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    pub value: i64,
}

impl Measurement {
    /// Create a measurement stamped with the current time
    pub fn new(user_id: i64, value: i64) -> Self {
        Self::at(Utc::now(), user_id, value)
    }

    pub fn at(timestamp: DateTime<Utc>, user_id: i64, value: i64) -> Self {
        Self {
            timestamp,
            user_id,
            value,
        }
    }
}
