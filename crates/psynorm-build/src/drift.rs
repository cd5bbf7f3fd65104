//! Threshold comparison of two norms tables.

use psynorm_kernel::{METRIC_COUNT, MetricCode, Milli, NormRow, NormsError};
use psynorm_table::NormsTable;
use serde::Serialize;

pub const DRIFT_CHECK_KIND: &str = "psynorm.drift.check.v1";
pub const DEFAULT_THRESHOLD_MEAN: f64 = 0.35;
pub const DEFAULT_THRESHOLD_SD: f64 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftThresholds {
    pub mean: Milli,
    pub sd: Milli,
}

impl Default for DriftThresholds {
    fn default() -> Self {
        Self {
            mean: Milli::from_thousandths(350),
            sd: Milli::from_thousandths(350),
        }
    }
}

impl DriftThresholds {
    /// Thresholds must be finite and non-negative.
    pub fn new(mean: f64, sd: f64) -> Result<Self, NormsError> {
        let parse = |name: &str, value: f64| {
            Milli::from_f64(value)
                .filter(|milli| milli.thousandths() >= 0)
                .ok_or_else(|| {
                    NormsError::config(format!(
                        "threshold {name} must be a non-negative number, got {value}"
                    ))
                })
        };
        Ok(Self {
            mean: parse("mean", mean)?,
            sd: parse("sd", sd)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftBreach {
    pub group_id: String,
    pub metric_level: String,
    pub metric_code: String,
    pub mean_from: Milli,
    pub mean_to: Milli,
    pub mean_diff: Milli,
    pub sd_from: Milli,
    pub sd_to: Milli,
    pub sd_diff: Milli,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub check_kind: String,
    pub result: String,
    pub groups: Vec<String>,
    pub compared_metrics: usize,
    pub max_mean_diff: Milli,
    pub max_sd_diff: Milli,
    pub thresholds: DriftThresholds,
    pub breaches: Vec<DriftBreach>,
}

impl DriftReport {
    pub fn accepted(&self) -> bool {
        self.result == "accepted"
    }
}

/// Taxonomy rows of one group indexed by code; incomplete groups fail.
fn complete_group<'a>(
    table: &'a NormsTable,
    group_id: &str,
    side: &str,
) -> Result<Vec<&'a NormRow>, NormsError> {
    let mut slots: Vec<Option<&NormRow>> = vec![None; METRIC_COUNT];
    for row in table.group(group_id) {
        if let Some(code) = row.taxonomy_metric() {
            slots[code.index()].get_or_insert(row);
        }
    }
    if let Some(missing) = MetricCode::all().find(|code| slots[code.index()].is_none()) {
        return Err(NormsError::MissingMetricData {
            metric_code: format!("{missing} in {side} group {group_id}"),
        });
    }
    Ok(slots.into_iter().flatten().collect())
}

fn abs_diff(a: Milli, b: Milli) -> Milli {
    Milli::from_thousandths((a.thousandths() - b.thousandths()).abs())
}

/// Compare every group present in both tables (or only `group_filter`).
pub fn check_drift(
    from: &NormsTable,
    to: &NormsTable,
    group_filter: Option<&str>,
    thresholds: DriftThresholds,
) -> Result<DriftReport, NormsError> {
    let to_groups = to.group_ids();
    let groups: Vec<String> = from
        .group_ids()
        .into_iter()
        .filter(|group| to_groups.contains(group))
        .filter(|group| group_filter.is_none_or(|only| only == *group))
        .map(str::to_string)
        .collect();
    if groups.is_empty() {
        let field = match group_filter {
            Some(only) => format!("group {only} in both tables"),
            None => "a group common to both tables".to_string(),
        };
        return Err(NormsError::MissingRequiredField { field });
    }

    // Breach order: group, then domain before facet, then code.
    let mut order: Vec<MetricCode> = MetricCode::all().collect();
    order.sort_by_key(|code| (code.level().rank(), code.as_str()));

    let mut breaches = Vec::new();
    let mut compared_metrics = 0;
    let mut max_mean_diff = Milli::ZERO;
    let mut max_sd_diff = Milli::ZERO;

    for group_id in &groups {
        let before = complete_group(from, group_id, "from")?;
        let after = complete_group(to, group_id, "to")?;
        for code in &order {
            let (a, b) = (before[code.index()], after[code.index()]);
            let mean_diff = abs_diff(a.mean, b.mean);
            let sd_diff = abs_diff(a.sd, b.sd);
            compared_metrics += 1;
            max_mean_diff = max_mean_diff.max(mean_diff);
            max_sd_diff = max_sd_diff.max(sd_diff);

            if mean_diff > thresholds.mean || sd_diff > thresholds.sd {
                breaches.push(DriftBreach {
                    group_id: group_id.clone(),
                    metric_level: code.level().as_str().to_string(),
                    metric_code: code.to_string(),
                    mean_from: a.mean,
                    mean_to: b.mean,
                    mean_diff,
                    sd_from: a.sd,
                    sd_to: b.sd,
                    sd_diff,
                });
            }
        }
    }

    let result = if breaches.is_empty() {
        "accepted".to_string()
    } else {
        "rejected".to_string()
    };
    Ok(DriftReport {
        check_kind: DRIFT_CHECK_KIND.to_string(),
        result,
        groups,
        compared_metrics,
        max_mean_diff,
        max_sd_diff,
        thresholds,
        breaches,
    })
}
