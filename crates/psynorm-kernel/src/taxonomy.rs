//! BIG5 metric taxonomy: 5 domains, 6 facets each.
//!
//! Codes are emitted in taxonomy order (domains first, then facets grouped
//! N, E, O, A, C). Table order is a separate concern: rows are sorted by the
//! code text, see [`MetricCode::cmp`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

pub const DOMAIN_CODES: [&str; 5] = ["O", "C", "E", "A", "N"];

pub const FACET_CODES: [&str; 30] = [
    "N1", "N2", "N3", "N4", "N5", "N6", //
    "E1", "E2", "E3", "E4", "E5", "E6", //
    "O1", "O2", "O3", "O4", "O5", "O6", //
    "A1", "A2", "A3", "A4", "A5", "A6", //
    "C1", "C2", "C3", "C4", "C5", "C6",
];

/// Rows in one complete group.
pub const METRIC_COUNT: usize = DOMAIN_CODES.len() + FACET_CODES.len();

/// Two-level hierarchy position of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricLevel {
    Domain,
    Facet,
}

impl MetricLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Facet => "facet",
        }
    }

    /// Sort rank used by the table order: domain rows before facet rows.
    pub fn rank(self) -> u8 {
        match self {
            Self::Domain => 0,
            Self::Facet => 1,
        }
    }

    /// Lenient parse of stored level text (`" Domain "` → `Domain`).
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "domain" => Some(Self::Domain),
            "facet" => Some(Self::Facet),
            _ => None,
        }
    }
}

impl fmt::Display for MetricLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| format!("unknown metric level: {s:?}"))
    }
}

/// One of the 35 taxonomy codes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricCode(u8);

impl MetricCode {
    /// All codes in taxonomy order.
    pub fn all() -> impl Iterator<Item = MetricCode> {
        (0..METRIC_COUNT as u8).map(MetricCode)
    }

    /// Exact lookup; stored codes are upper-case.
    pub fn parse(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        DOMAIN_CODES
            .iter()
            .chain(FACET_CODES.iter())
            .position(|candidate| *candidate == code)
            .map(|idx| MetricCode(idx as u8))
    }

    pub fn as_str(self) -> &'static str {
        let idx = self.0 as usize;
        if idx < DOMAIN_CODES.len() {
            DOMAIN_CODES[idx]
        } else {
            FACET_CODES[idx - DOMAIN_CODES.len()]
        }
    }

    pub fn level(self) -> MetricLevel {
        if (self.0 as usize) < DOMAIN_CODES.len() {
            MetricLevel::Domain
        } else {
            MetricLevel::Facet
        }
    }

    /// Position in taxonomy order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Ord for MetricCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for MetricCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for MetricCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetricCode({})", self.as_str())
    }
}

impl fmt::Display for MetricCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown metric code: {s:?}"))
    }
}

impl Serialize for MetricCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetricCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
