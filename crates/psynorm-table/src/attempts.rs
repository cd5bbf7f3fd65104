//! Attempt-level input: one record per completed assessment.
//!
//! The file carries a `quality_level` column plus one column per taxonomy
//! code. Values stay textual here; the aggregator decides what parses.

use crate::csv::parse_csv;
use crate::table::read_text_if_exists;
use psynorm_kernel::{METRIC_COUNT, MetricCode, NormsError};
use std::path::Path;

pub const QUALITY_COLUMN: &str = "quality_level";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 1-based line the record starts on.
    pub line: usize,
    pub quality_level: String,
    values: Vec<String>,
}

impl AttemptRecord {
    /// Raw cell for `code`, untrimmed.
    pub fn value(&self, code: MetricCode) -> &str {
        self.values
            .get(code.index())
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSet {
    pub source_label: String,
    pub records: Vec<AttemptRecord>,
}

impl AttemptSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parse attempt CSV text. The header is validated before any record is
/// looked at.
pub fn parse_attempts(text: &str, label: &str) -> Result<AttemptSet, NormsError> {
    let doc = parse_csv(text).map_err(|e| NormsError::malformed(label, e.to_string()))?;

    let required = std::iter::once(QUALITY_COLUMN).chain(MetricCode::all().map(MetricCode::as_str));
    let missing = doc.missing_columns(required);
    if !missing.is_empty() {
        return Err(NormsError::malformed(
            label,
            format!("missing required columns: {}", missing.join(",")),
        ));
    }

    let quality_idx = doc.column(QUALITY_COLUMN).unwrap_or_default();
    let mut metric_idx = [0usize; METRIC_COUNT];
    for code in MetricCode::all() {
        metric_idx[code.index()] = doc.column(code.as_str()).unwrap_or_default();
    }

    let records = doc
        .records
        .iter()
        .map(|record| AttemptRecord {
            line: record.line,
            quality_level: record.cell(quality_idx).to_string(),
            values: metric_idx
                .iter()
                .map(|&idx| record.cell(idx).to_string())
                .collect(),
        })
        .collect();

    Ok(AttemptSet {
        source_label: label.to_string(),
        records,
    })
}

/// Load an attempt file; `Ok(None)` when the file does not exist.
pub fn load_attempts(path: impl AsRef<Path>) -> Result<Option<AttemptSet>, NormsError> {
    let path = path.as_ref();
    read_text_if_exists(path)?
        .map(|text| parse_attempts(&text, &path.display().to_string()))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
        std::iter::once(QUALITY_COLUMN.to_string())
            .chain(MetricCode::all().map(|code| code.to_string()))
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn parses_values_by_taxonomy_code() {
        let values: Vec<String> = (0..METRIC_COUNT).map(|idx| format!("{idx}.5")).collect();
        let text = format!("{}\nA,{}\n", header(), values.join(","));
        let set = parse_attempts(&text, "attempts.csv").expect("attempts should parse");
        assert_eq!(set.len(), 1);
        let record = &set.records[0];
        assert_eq!(record.line, 2);
        assert_eq!(record.quality_level, "A");
        for code in MetricCode::all() {
            assert_eq!(record.value(code), format!("{}.5", code.index()));
        }
    }

    #[test]
    fn column_order_does_not_matter() {
        let mut columns: Vec<String> = header().split(',').map(str::to_string).collect();
        columns.reverse();
        let cells: Vec<&str> = columns
            .iter()
            .map(|c| if c == "N" { "4.2" } else if c == QUALITY_COLUMN { "B" } else { "1" })
            .collect();
        let text = format!("{}\n{}\n", columns.join(","), cells.join(","));
        let set = parse_attempts(&text, "attempts.csv").expect("attempts should parse");
        let n = MetricCode::parse("N").expect("known code");
        assert_eq!(set.records[0].value(n), "4.2");
        assert_eq!(set.records[0].quality_level, "B");
    }

    #[test]
    fn missing_columns_fail_before_rows() {
        let text = "quality_level,O,C,E,A\nA,not,even,numbers,here\n";
        let err = parse_attempts(text, "attempts.csv").expect_err("should fail");
        match err {
            NormsError::MalformedInput { cause, .. } => {
                assert!(cause.starts_with("missing required columns: N,"));
            }
            other => panic!("expected malformed input, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_none() {
        let path = std::env::temp_dir().join(format!(
            "psynorm-attempts-missing-{}.csv",
            std::process::id()
        ));
        assert!(load_attempts(&path).expect("missing file is not an error").is_none());
    }
}
