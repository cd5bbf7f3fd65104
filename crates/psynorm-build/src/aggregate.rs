//! Per-metric statistics from attempt-level data.

use psynorm_kernel::{METRIC_COUNT, MetricCode, MetricStat, Milli, NormsError};
use psynorm_table::AttemptSet;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Grades the filter can name.
pub const QUALITY_GRADES: [char; 4] = ['A', 'B', 'C', 'D'];

/// Accepted attempt quality grades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityFilter {
    grades: BTreeSet<char>,
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self {
            grades: ['A', 'B'].into_iter().collect(),
        }
    }
}

impl QualityFilter {
    /// Parse `"AB"`, `"A,B"` or `"A B"`. Unknown grades are ignored; an empty
    /// or fully invalid selection yields the default `{A, B}`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_uppercase();
        let parts: Vec<&str> = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect();
        // A single run like "AB" spells one grade per character.
        let parts: Vec<String> = match parts.as_slice() {
            [single] if single.chars().count() > 1 => single.chars().map(String::from).collect(),
            _ => parts.iter().map(|part| part.to_string()).collect(),
        };

        let grades: BTreeSet<char> = parts
            .iter()
            .filter_map(|part| {
                let mut chars = part.chars();
                match (chars.next(), chars.next()) {
                    (Some(grade), None) if QUALITY_GRADES.contains(&grade) => Some(grade),
                    _ => None,
                }
            })
            .collect();

        if grades.is_empty() {
            Self::default()
        } else {
            Self { grades }
        }
    }

    pub fn accepts(&self, quality_level: &str) -> bool {
        let level = quality_level.trim().to_ascii_uppercase();
        let mut chars = level.chars();
        match (chars.next(), chars.next()) {
            (Some(grade), None) => self.grades.contains(&grade),
            _ => false,
        }
    }

    /// Accepted grades in sorted order.
    pub fn levels(&self) -> Vec<String> {
        self.grades.iter().map(char::to_string).collect()
    }
}

impl fmt::Display for QualityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.levels().join(","))
    }
}

impl Serialize for QualityFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.levels().serialize(serializer)
    }
}

/// Result of reducing one attempt set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregateOutcome {
    /// One stat per taxonomy code in taxonomy order, or empty when no record
    /// passed the filter.
    pub stats: Vec<MetricStat>,
    pub sample_n_raw: u64,
    pub sample_n_kept: u64,
}

impl AggregateOutcome {
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N).
pub fn population_sd(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let acc: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some((acc / values.len() as f64).sqrt())
}

/// Reduce accepted attempts to one `(mean, sd, sample_n)` per metric.
///
/// Every accepted record must carry a finite value for every metric; a blank
/// or unparseable cell fails the whole aggregation.
pub fn aggregate(set: &AttemptSet, filter: &QualityFilter) -> Result<AggregateOutcome, NormsError> {
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); METRIC_COUNT];
    let mut kept = 0u64;

    for record in &set.records {
        if !filter.accepts(&record.quality_level) {
            continue;
        }
        kept += 1;
        for code in MetricCode::all() {
            let raw = record.value(code).trim();
            let line = || format!("{} line {}", set.source_label, record.line);
            if raw.is_empty() {
                return Err(NormsError::malformed(
                    line(),
                    format!("column {code}: missing value"),
                ));
            }
            let value = raw
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    NormsError::malformed(
                        line(),
                        format!("column {code}: not a finite number: {raw:?}"),
                    )
                })?;
            columns[code.index()].push(value);
        }
    }

    let sample_n_raw = set.records.len() as u64;
    if kept == 0 {
        return Ok(AggregateOutcome {
            stats: Vec::new(),
            sample_n_raw,
            sample_n_kept: 0,
        });
    }

    let mut stats = Vec::with_capacity(METRIC_COUNT);
    for code in MetricCode::all() {
        let values = &columns[code.index()];
        let missing = || NormsError::MissingMetricData {
            metric_code: code.to_string(),
        };
        let mean = mean(values).ok_or_else(missing)?;
        let sd = population_sd(values).ok_or_else(missing)?;
        let overflow = || {
            NormsError::malformed(
                set.source_label.clone(),
                format!("column {code}: statistic out of range"),
            )
        };
        stats.push(MetricStat {
            code,
            mean: Milli::from_f64(mean).ok_or_else(overflow)?,
            sd: Milli::sd_from_f64(sd).ok_or_else(overflow)?,
            sample_n: values.len() as u64,
        });
    }

    Ok(AggregateOutcome {
        stats,
        sample_n_raw,
        sample_n_kept: kept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use psynorm_table::{QUALITY_COLUMN, parse_attempts};

    fn attempts(rows: &[(&str, f64)]) -> AttemptSet {
        let header: Vec<String> = std::iter::once(QUALITY_COLUMN.to_string())
            .chain(MetricCode::all().map(|code| code.to_string()))
            .collect();
        let mut text = header.join(",");
        text.push('\n');
        for (grade, value) in rows {
            let cells: Vec<String> = std::iter::once(grade.to_string())
                .chain(MetricCode::all().map(|_| value.to_string()))
                .collect();
            text.push_str(&cells.join(","));
            text.push('\n');
        }
        parse_attempts(&text, "attempts.csv").expect("fixture should parse")
    }

    fn code(raw: &str) -> MetricCode {
        MetricCode::parse(raw).expect("known code")
    }

    #[test]
    fn quality_filter_parsing() {
        assert_eq!(QualityFilter::parse("AB").levels(), vec!["A", "B"]);
        assert_eq!(QualityFilter::parse("a, c").levels(), vec!["A", "C"]);
        assert_eq!(QualityFilter::parse("D B").levels(), vec!["B", "D"]);
        assert_eq!(QualityFilter::parse("").levels(), vec!["A", "B"]);
        assert_eq!(QualityFilter::parse("XYZ").levels(), vec!["A", "B"]);
        assert_eq!(QualityFilter::parse("AB,C").levels(), vec!["C"]);
        assert_eq!(QualityFilter::default().to_string(), "A,B");
    }

    #[test]
    fn filter_accepts_trimmed_case_insensitive_grades() {
        let filter = QualityFilter::default();
        assert!(filter.accepts(" a "));
        assert!(filter.accepts("B"));
        assert!(!filter.accepts("C"));
        assert!(!filter.accepts(""));
        assert!(!filter.accepts("AB"));
    }

    #[test]
    fn population_sd_divides_by_n() {
        assert_eq!(population_sd(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(2.0));
        assert_eq!(population_sd(&[3.0]), Some(0.0));
        assert_eq!(population_sd(&[]), None);
        assert_eq!(mean(&[1.0, 2.0]), Some(1.5));
    }

    #[test]
    fn aggregates_accepted_records_only() {
        let set = attempts(&[("A", 2.0), ("b", 4.0), ("C", 100.0), ("", 100.0)]);
        let outcome = aggregate(&set, &QualityFilter::default()).expect("aggregate should succeed");
        assert_eq!(outcome.sample_n_raw, 4);
        assert_eq!(outcome.sample_n_kept, 2);
        assert_eq!(outcome.stats.len(), METRIC_COUNT);
        let stat = outcome.stats[code("E3").index()];
        assert_eq!(stat.code, code("E3"));
        assert_eq!(stat.mean.to_string(), "3.000");
        assert_eq!(stat.sd.to_string(), "1.000");
        assert_eq!(stat.sample_n, 2);
    }

    #[test]
    fn identical_values_floor_sd() {
        let set = attempts(&[("A", 3.0), ("A", 3.0)]);
        let outcome = aggregate(&set, &QualityFilter::default()).expect("aggregate should succeed");
        assert!(outcome.stats.iter().all(|stat| stat.sd.thousandths() == 1));
    }

    #[test]
    fn no_accepted_records_is_empty_not_error() {
        let set = attempts(&[("C", 1.0), ("D", 2.0)]);
        let outcome = aggregate(&set, &QualityFilter::default()).expect("aggregate should succeed");
        assert!(outcome.is_empty());
        assert_eq!(outcome.sample_n_raw, 2);
        assert_eq!(outcome.sample_n_kept, 0);
    }

    #[test]
    fn blank_cell_in_accepted_record_names_line_and_column() {
        let mut text = String::from(QUALITY_COLUMN);
        for code in MetricCode::all() {
            text.push(',');
            text.push_str(code.as_str());
        }
        text.push('\n');
        // Line 3 leaves O blank.
        for blank in [None, Some("O")] {
            text.push('A');
            for code in MetricCode::all() {
                text.push(',');
                if Some(code.as_str()) != blank {
                    text.push_str("4.0");
                }
            }
            text.push('\n');
        }
        let set = parse_attempts(&text, "attempts.csv").expect("fixture should parse");
        let err = aggregate(&set, &QualityFilter::default()).expect_err("should fail");
        match err {
            NormsError::MalformedInput {
                source_label,
                cause,
            } => {
                assert_eq!(source_label, "attempts.csv line 3");
                assert_eq!(cause, "column O: missing value");
            }
            other => panic!("expected malformed input, got {other:?}"),
        }
    }

    #[test]
    fn blank_cell_in_rejected_record_is_ignored() {
        let mut text = String::from(QUALITY_COLUMN);
        for code in MetricCode::all() {
            text.push(',');
            text.push_str(code.as_str());
        }
        text.push('\n');
        text.push('A');
        for _ in MetricCode::all() {
            text.push_str(",2.0");
        }
        text.push('\n');
        text.push('D');
        for _ in MetricCode::all() {
            text.push(',');
        }
        text.push('\n');
        let set = parse_attempts(&text, "attempts.csv").expect("fixture should parse");
        let outcome = aggregate(&set, &QualityFilter::default()).expect("aggregate should succeed");
        assert_eq!(outcome.sample_n_raw, 2);
        assert_eq!(outcome.sample_n_kept, 1);
        assert!(outcome.stats.iter().all(|stat| stat.sample_n == 1));
    }

    #[test]
    fn non_numeric_value_names_line_and_column() {
        let mut set = attempts(&[("A", 1.0), ("B", 2.0)]);
        let text = {
            let mut cells: Vec<String> = vec!["B".to_string()];
            cells.extend(MetricCode::all().map(|code| {
                if code.as_str() == "A2" { "n/a".to_string() } else { "1".to_string() }
            }));
            cells.join(",")
        };
        let extra = parse_attempts(
            &format!(
                "{},{}\n{text}\n",
                QUALITY_COLUMN,
                MetricCode::all().map(MetricCode::as_str).collect::<Vec<_>>().join(",")
            ),
            "attempts.csv",
        )
        .expect("fixture should parse");
        let mut bad = extra.records[0].clone();
        bad.line = 4;
        set.records.push(bad);

        let err = aggregate(&set, &QualityFilter::default()).expect_err("should fail");
        let message = err.to_string();
        assert!(message.contains("attempts.csv line 4"), "{message}");
        assert!(message.contains("column A2"), "{message}");

        // The same cell in a rejected record is never parsed.
        set.records[2].quality_level = "C".into();
        assert!(aggregate(&set, &QualityFilter::default()).is_ok());
    }
}
