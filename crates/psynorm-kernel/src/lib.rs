//! # psynorm kernel
//!
//! Shared vocabulary for norms builds and report checks.
//!
//! ## Architecture
//!
//! ```text
//! MetricCode / MetricLevel  ← the 35-code BIG5 taxonomy (5 domains, 30 facets)
//!     │
//! Milli                     ← fixed-point value, always 3 fractional digits
//!     │
//! NormRow                   ← one (group, metric) statistic, 18 columns
//!     │
//! digest                    ← canonical JSON bytes + SHA-256 hex
//! ```
//!
//! Nothing here touches the filesystem; storage lives in `psynorm-table`.

pub mod decimal;
pub mod digest;
pub mod error;
pub mod row;
pub mod taxonomy;

pub use decimal::{Milli, SD_EPSILON};
pub use digest::{canonical_json_bytes, sha256_hex, stable_sha256};
pub use error::NormsError;
pub use row::{MetricStat, NORM_COLUMNS, NormRow, Publication, SourceCells};
pub use taxonomy::{DOMAIN_CODES, FACET_CODES, METRIC_COUNT, MetricCode, MetricLevel};
