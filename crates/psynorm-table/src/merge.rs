//! Replace-by-group upsert.

use crate::table::NormsTable;
use psynorm_kernel::{METRIC_COUNT, MetricCode, MetricStat, NormsError, Publication};
use serde::Serialize;

/// What a merge did to the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub group_id: String,
    pub removed: usize,
    pub inserted: usize,
    pub total: usize,
}

/// Return a new table in which every row of `publication.group_id` is
/// replaced by one row per stat, stamped with the publication metadata.
///
/// `stats` must hold exactly one entry per taxonomy code. Rows of other
/// groups are carried over unchanged; the result is re-sorted.
pub fn merge_group(
    table: &NormsTable,
    publication: &Publication,
    stats: &[MetricStat],
) -> Result<(NormsTable, MergeSummary), NormsError> {
    let group_id = publication.group_id.trim();
    if group_id.is_empty() {
        return Err(NormsError::MissingRequiredField {
            field: "group_id".to_string(),
        });
    }

    let mut seen = [false; METRIC_COUNT];
    for stat in stats {
        let slot = &mut seen[stat.code.index()];
        if *slot {
            return Err(NormsError::malformed(
                format!("metric stats for {group_id}"),
                format!("duplicate metric={}", stat.code),
            ));
        }
        *slot = true;
    }
    if let Some(missing) = MetricCode::all().find(|code| !seen[code.index()]) {
        return Err(NormsError::MissingMetricData {
            metric_code: missing.to_string(),
        });
    }

    let mut rows = Vec::with_capacity(table.len() + stats.len());
    let mut removed = 0;
    for row in table.rows() {
        if row.group_id == group_id {
            removed += 1;
        } else {
            rows.push(row.clone());
        }
    }
    rows.extend(stats.iter().map(|stat| publication.stamp(stat)));

    let merged = NormsTable::from_rows(rows);
    let summary = MergeSummary {
        group_id: group_id.to_string(),
        removed,
        inserted: stats.len(),
        total: merged.len(),
    };
    Ok((merged, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use psynorm_kernel::{Milli, NORM_COLUMNS, NormRow};

    fn publication(group_id: &str, version: &str) -> Publication {
        Publication {
            scale_code: "BIG5_OCEAN".into(),
            norms_version: version.into(),
            locale: "zh-CN".into(),
            region: "CN_MAINLAND".into(),
            group_id: group_id.into(),
            gender: "ALL".into(),
            age_min: 18,
            age_max: 60,
            source_id: "SRC".into(),
            source_type: "internal_prod".into(),
            status: "CALIBRATED".into(),
            published_at: "2026-02-21T00:00:00Z".into(),
        }
    }

    fn full_stats(offset: i64) -> Vec<MetricStat> {
        MetricCode::all()
            .enumerate()
            .map(|(idx, code)| MetricStat {
                code,
                mean: Milli::from_thousandths(3000 + offset + idx as i64),
                sd: Milli::from_thousandths(600),
                sample_n: 100,
            })
            .collect()
    }

    fn foreign_row() -> NormRow {
        let mut row = publication("other_scale_group", "legacy").stamp(&full_stats(0)[0]);
        row.scale_code = "OTHER".into();
        row.metric_level = "total".into();
        row.metric_code = "TOTAL".into();
        row
    }

    #[test]
    fn merge_replaces_target_group_only() {
        let (base, _) = merge_group(&NormsTable::new(), &publication("g_b", "v0"), &full_stats(0))
            .expect("seed merge should succeed");
        let mut rows = base.into_rows();
        rows.push(foreign_row());
        let base = NormsTable::from_rows(rows);

        let (first, _) = merge_group(&base, &publication("g_a", "v1"), &full_stats(10))
            .expect("merge should succeed");
        let (second, summary) = merge_group(&first, &publication("g_a", "v2"), &full_stats(20))
            .expect("merge should succeed");

        assert_eq!(summary.removed, 35);
        assert_eq!(summary.inserted, 35);
        assert_eq!(summary.total, 71);
        assert!(second.group("g_a").all(|row| row.norms_version == "v2"));

        let untouched: Vec<&NormRow> = base.rows().iter().collect();
        let after: Vec<&NormRow> = second
            .rows()
            .iter()
            .filter(|row| row.group_id != "g_a")
            .collect();
        assert_eq!(untouched, after);
    }

    #[test]
    fn merge_keeps_other_groups_byte_for_byte() {
        let kept = "BIG5_OCEAN,v0,zh-CN,CN_MAINLAND,h_group,ALL,18,60,domain,O,\
                    3.14159,0.6666,12, t ,internal_prod,CALIBRATED,true,2026-01-01T00:00:00Z";
        let text = format!("{}\n{kept}\n", NORM_COLUMNS.join(","));
        let base = NormsTable::parse_csv(&text, "seed.csv").expect("table should parse");

        let (merged, summary) = merge_group(&base, &publication("g", "v1"), &full_stats(0))
            .expect("merge should succeed");
        assert_eq!(summary.removed, 0);

        let rendered = merged.render_csv();
        let h_lines: Vec<&str> = rendered
            .lines()
            .filter(|line| line.contains(",h_group,"))
            .collect();
        assert_eq!(h_lines, vec![kept]);

        let reread = NormsTable::parse_csv(&rendered, "seed.csv").expect("table should parse");
        let (again, _) = merge_group(&reread, &publication("g", "v1"), &full_stats(0))
            .expect("merge should succeed");
        assert_eq!(again.render_csv(), rendered);
    }

    #[test]
    fn merge_is_idempotent() {
        let publication = publication("g_a", "v1");
        let (once, _) = merge_group(&NormsTable::new(), &publication, &full_stats(5))
            .expect("merge should succeed");
        let (twice, _) =
            merge_group(&once, &publication, &full_stats(5)).expect("merge should succeed");
        assert_eq!(once.render_csv(), twice.render_csv());
    }

    #[test]
    fn merge_requires_every_code_once() {
        let mut stats = full_stats(0);
        stats.retain(|stat| stat.code.as_str() != "C4");
        let err = merge_group(&NormsTable::new(), &publication("g", "v"), &stats)
            .expect_err("should fail");
        assert!(matches!(
            err,
            NormsError::MissingMetricData { ref metric_code } if metric_code == "C4"
        ));

        let mut stats = full_stats(0);
        stats.push(stats[0]);
        let err = merge_group(&NormsTable::new(), &publication("g", "v"), &stats)
            .expect_err("should fail");
        assert_eq!(err.class(), "malformed_input");
    }

    #[test]
    fn merge_requires_group_id() {
        let err = merge_group(&NormsTable::new(), &publication("  ", "v"), &full_stats(0))
            .expect_err("should fail");
        assert!(matches!(err, NormsError::MissingRequiredField { .. }));
    }
}
