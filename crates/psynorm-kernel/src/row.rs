//! The norms table row schema.

use crate::decimal::Milli;
use crate::error::NormsError;
use crate::taxonomy::{MetricCode, MetricLevel};
use serde::{Deserialize, Serialize};

/// Column order of the table file. Fixed; readers accept any order but
/// writers always emit this one.
pub const NORM_COLUMNS: [&str; 18] = [
    "scale_code",
    "norms_version",
    "locale",
    "region",
    "group_id",
    "gender",
    "age_min",
    "age_max",
    "metric_level",
    "metric_code",
    "mean",
    "sd",
    "sample_n",
    "source_id",
    "source_type",
    "status",
    "is_active",
    "published_at",
];

/// One published statistic for one (group, metric) pair.
///
/// `metric_level`/`metric_code` keep their stored text so rows belonging to
/// other scales survive a merge. Rows produced by this workspace always carry
/// a taxonomy code, see [`NormRow::taxonomy_metric`].
///
/// A row read from a table file remembers its cell text and renders it back
/// byte for byte; only stamped rows use the canonical rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormRow {
    pub scale_code: String,
    pub norms_version: String,
    pub locale: String,
    pub region: String,
    pub group_id: String,
    pub gender: String,
    pub age_min: u32,
    pub age_max: u32,
    pub metric_level: String,
    pub metric_code: String,
    pub mean: Milli,
    pub sd: Milli,
    pub sample_n: u64,
    pub source_id: String,
    pub source_type: String,
    pub status: String,
    pub is_active: bool,
    pub published_at: String,
    #[serde(skip)]
    pub source_cells: SourceCells,
}

/// Cell text exactly as read, in [`NORM_COLUMNS`] order. Not part of a row's
/// value: rows compare equal whatever text they were parsed from.
#[derive(Debug, Clone, Default)]
pub struct SourceCells(Option<Box<[String; 18]>>);

impl SourceCells {
    pub fn get(&self) -> Option<&[String; 18]> {
        self.0.as_deref()
    }
}

impl PartialEq for SourceCells {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for SourceCells {}

impl NormRow {
    /// Typed metric when the stored level/code pair is a consistent taxonomy
    /// entry; `None` for foreign rows.
    pub fn taxonomy_metric(&self) -> Option<MetricCode> {
        let level = MetricLevel::parse_lenient(&self.metric_level)?;
        let code = MetricCode::parse(&self.metric_code)?;
        (code.level() == level).then_some(code)
    }

    /// Table sort rank of the level column: `domain` first, anything else after.
    pub fn level_rank(&self) -> u8 {
        match MetricLevel::parse_lenient(&self.metric_level) {
            Some(MetricLevel::Domain) => 0,
            _ => 1,
        }
    }

    /// Render cells in [`NORM_COLUMNS`] order: the source text when the row
    /// was read from a file, the canonical form otherwise.
    pub fn to_cells(&self) -> [String; 18] {
        match self.source_cells.get() {
            Some(cells) => cells.clone(),
            None => self.canonical_cells(),
        }
    }

    pub fn canonical_cells(&self) -> [String; 18] {
        [
            self.scale_code.clone(),
            self.norms_version.clone(),
            self.locale.clone(),
            self.region.clone(),
            self.group_id.clone(),
            self.gender.clone(),
            self.age_min.to_string(),
            self.age_max.to_string(),
            self.metric_level.clone(),
            self.metric_code.clone(),
            self.mean.to_string(),
            self.sd.to_string(),
            self.sample_n.to_string(),
            self.source_id.clone(),
            self.source_type.clone(),
            self.status.clone(),
            if self.is_active { "1" } else { "0" }.to_string(),
            self.published_at.clone(),
        ]
    }

    /// Parse cells given in [`NORM_COLUMNS`] order. Text columns are trimmed;
    /// numeric columns must parse.
    pub fn from_cells(cells: [&str; 18], source_label: &str) -> Result<Self, NormsError> {
        let text = |idx: usize| cells[idx].trim().to_string();
        let bad = |idx: usize, cause: String| {
            NormsError::malformed(source_label, format!("column {}: {cause}", NORM_COLUMNS[idx]))
        };
        let int = |idx: usize| -> Result<u64, NormsError> {
            let raw = cells[idx].trim();
            raw.parse::<u64>()
                .map_err(|_| bad(idx, format!("not a non-negative integer: {raw:?}")))
        };
        let age = |idx: usize| -> Result<u32, NormsError> {
            let value = int(idx)?;
            u32::try_from(value).map_err(|_| bad(idx, format!("out of range: {value}")))
        };
        let decimal = |idx: usize| -> Result<Milli, NormsError> {
            Milli::parse(cells[idx]).map_err(|e| bad(idx, e))
        };

        let is_active = match cells[16].trim().to_ascii_lowercase().as_str() {
            "1" | "true" => true,
            "0" | "false" => false,
            other => return Err(bad(16, format!("expected 0 or 1, got {other:?}"))),
        };

        Ok(Self {
            scale_code: text(0),
            norms_version: text(1),
            locale: text(2),
            region: text(3),
            group_id: text(4),
            gender: text(5),
            age_min: age(6)?,
            age_max: age(7)?,
            metric_level: text(8),
            metric_code: text(9),
            mean: decimal(10)?,
            sd: decimal(11)?,
            sample_n: int(12)?,
            source_id: text(13),
            source_type: text(14),
            status: text(15),
            is_active,
            published_at: text(17),
            source_cells: SourceCells(Some(Box::new(cells.map(str::to_string)))),
        })
    }
}

/// Aggregated statistic for one metric, before publication metadata is
/// attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricStat {
    pub code: MetricCode,
    pub mean: Milli,
    pub sd: Milli,
    pub sample_n: u64,
}

/// Publication metadata shared by the 35 rows of one group build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub scale_code: String,
    pub norms_version: String,
    pub locale: String,
    pub region: String,
    pub group_id: String,
    pub gender: String,
    pub age_min: u32,
    pub age_max: u32,
    pub source_id: String,
    pub source_type: String,
    pub status: String,
    pub published_at: String,
}

impl Publication {
    /// Stamp one metric statistic with this publication's metadata.
    pub fn stamp(&self, stat: &MetricStat) -> NormRow {
        let code = stat.code;
        NormRow {
            scale_code: self.scale_code.clone(),
            norms_version: self.norms_version.clone(),
            locale: self.locale.clone(),
            region: self.region.clone(),
            group_id: self.group_id.clone(),
            gender: self.gender.clone(),
            age_min: self.age_min,
            age_max: self.age_max,
            metric_level: code.level().as_str().to_string(),
            metric_code: code.as_str().to_string(),
            mean: stat.mean,
            sd: stat.sd.clamp_sd(),
            sample_n: stat.sample_n,
            source_id: self.source_id.clone(),
            source_type: self.source_type.clone(),
            status: self.status.clone(),
            is_active: true,
            published_at: self.published_at.clone(),
            source_cells: SourceCells::default(),
        }
    }
}
