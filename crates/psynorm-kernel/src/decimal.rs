//! Fixed-point statistics with exactly three fractional digits.
//!
//! Norm tables are diffed and hashed as text, so `mean`/`sd` are held as
//! integer thousandths. Rendering and parsing are exact inverses for every
//! value the table can contain.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Lower bound applied to standard deviations before rounding.
pub const SD_EPSILON: f64 = 0.0001;

const SCALE: f64 = 1000.0;

/// A value in thousandths (`1.234` is `Milli(1234)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Milli(i64);

impl Milli {
    pub const ZERO: Milli = Milli(0);

    pub fn from_thousandths(raw: i64) -> Self {
        Self(raw)
    }

    pub fn thousandths(self) -> i64 {
        self.0
    }

    /// Round half away from zero to three places. Non-finite or
    /// out-of-range input yields `None`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * SCALE).round();
        if scaled.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Self(scaled as i64))
    }

    /// Standard-deviation rounding: clamp to [`SD_EPSILON`], round, and never
    /// let the stored text read `0.000`.
    pub fn sd_from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let rounded = Self::from_f64(value.max(SD_EPSILON))?;
        Some(Self(rounded.0.max(1)))
    }

    /// Re-apply the sd floor to an already rounded value.
    pub fn clamp_sd(self) -> Self {
        Self(self.0.max(1))
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Parse stored text. Accepts any finite decimal and rounds it; rejects
    /// blanks, `NaN` and infinities.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty numeric value".to_string());
        }
        let value: f64 = trimmed
            .parse()
            .map_err(|_| format!("not a number: {trimmed:?}"))?;
        Self::from_f64(value).ok_or_else(|| format!("not a finite number: {trimmed:?}"))
    }
}

impl fmt::Display for Milli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
    }
}

impl FromStr for Milli {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Milli {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Milli {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
