//! Timestamp codec for JWT numeric dates.
//!
//! RFC 7519 numeric dates are seconds since the Unix epoch. Tokens issued by
//! third parties sometimes carry fractional seconds, so decoding accepts both
//! integer and fractional values and truncates to whole seconds.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{JwtError, Result};

/// A point in time with second granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumericDate(DateTime<Utc>);

impl NumericDate {
    /// Truncate `time` to whole seconds
    pub fn new(time: DateTime<Utc>) -> Self {
        // Whole seconds of a valid DateTime are always representable.
        Self(DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time))
    }

    /// Build from seconds since the epoch
    pub fn from_seconds(seconds: i64) -> Option<Self> {
        DateTime::from_timestamp(seconds, 0).map(Self)
    }

    /// Seconds since the epoch
    pub fn seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// The instant as a `DateTime`
    pub fn to_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Decode an integer or fractional epoch value.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::MalformedToken`] when the value is not numeric or
    /// lies outside the representable time range.
    pub fn from_json(value: &Value) -> Result<Self> {
        let Value::Number(number) = value else {
            return Err(JwtError::malformed(format!(
                "timestamp must be numeric, got {value}"
            )));
        };
        let seconds = if let Some(seconds) = number.as_i64() {
            Some(seconds)
        } else if number.as_u64().is_some() {
            None
        } else {
            number.as_f64().and_then(truncate_seconds)
        };
        seconds
            .and_then(Self::from_seconds)
            .ok_or_else(|| JwtError::malformed(format!("timestamp {number} out of range")))
    }
}

impl From<DateTime<Utc>> for NumericDate {
    fn from(time: DateTime<Utc>) -> Self {
        Self::new(time)
    }
}

impl From<NumericDate> for DateTime<Utc> {
    fn from(date: NumericDate) -> Self {
        date.0
    }
}

fn truncate_seconds(value: f64) -> Option<i64> {
    if !value.is_finite() || value >= i64::MAX as f64 || value < i64::MIN as f64 {
        return None;
    }
    Some(value.trunc() as i64)
}

impl Serialize for NumericDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.seconds())
    }
}

struct NumericDateVisitor;

impl Visitor<'_> for NumericDateVisitor {
    type Value = NumericDate;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an integer or fractional number of seconds since the epoch")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<NumericDate, E> {
        NumericDate::from_seconds(v).ok_or_else(|| E::custom(format!("timestamp {v} out of range")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<NumericDate, E> {
        i64::try_from(v)
            .ok()
            .and_then(NumericDate::from_seconds)
            .ok_or_else(|| E::custom(format!("timestamp {v} out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<NumericDate, E> {
        truncate_seconds(v)
            .and_then(NumericDate::from_seconds)
            .ok_or_else(|| E::custom(format!("timestamp {v} out of range")))
    }
}

impl<'de> Deserialize<'de> for NumericDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(NumericDateVisitor)
    }
}
