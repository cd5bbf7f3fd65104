//! Reuse a previously published group when no primary data is available.

use psynorm_kernel::{METRIC_COUNT, MetricStat, NormsError};
use psynorm_table::NormsTable;

/// Default lower bound for a fallback row's `sample_n`.
pub const DEFAULT_FALLBACK_MIN_SAMPLE_N: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub group_id: String,
    /// One stat per taxonomy code in taxonomy order.
    pub stats: Vec<MetricStat>,
    /// Largest clamped `sample_n` among the group's rows.
    pub sample_n: u64,
}

/// Take the 35 taxonomy rows of `group_id` from `table`.
///
/// Rows whose level/code pair is not a consistent taxonomy entry are
/// ignored. Anything other than exactly one row per code fails with
/// `IncompleteFallbackGroup`.
pub fn resolve_fallback(
    table: &NormsTable,
    group_id: &str,
    min_sample_n: u64,
) -> Result<FallbackOutcome, NormsError> {
    let mut slots: Vec<Option<MetricStat>> = vec![None; METRIC_COUNT];
    let mut found = 0;
    let mut duplicated = false;

    for row in table.group(group_id) {
        let Some(code) = row.taxonomy_metric() else {
            continue;
        };
        found += 1;
        let slot = &mut slots[code.index()];
        if slot.is_some() {
            duplicated = true;
        }
        *slot = Some(MetricStat {
            code,
            mean: row.mean,
            sd: row.sd.clamp_sd(),
            sample_n: row.sample_n.max(min_sample_n),
        });
    }

    let stats: Vec<MetricStat> = slots.into_iter().flatten().collect();
    if duplicated || found != METRIC_COUNT || stats.len() != METRIC_COUNT {
        return Err(NormsError::IncompleteFallbackGroup {
            group_id: group_id.to_string(),
            found,
        });
    }

    let sample_n = stats.iter().map(|stat| stat.sample_n).max().unwrap_or(min_sample_n);
    Ok(FallbackOutcome {
        group_id: group_id.to_string(),
        stats,
        sample_n,
    })
}
