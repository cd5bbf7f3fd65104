//! Completeness audit over a whole norms table.

use crate::table::NormsTable;
use psynorm_kernel::{METRIC_COUNT, MetricCode, MetricLevel, NormRow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const TABLE_CHECK_KIND: &str = "psynorm.table.check.v1";

pub const FAILURE_CLASS_GROUP_INCOMPLETE: &str = "norms_table.group_incomplete";
pub const FAILURE_CLASS_DUPLICATE_METRIC: &str = "norms_table.duplicate_metric";
pub const FAILURE_CLASS_SD_NOT_POSITIVE: &str = "norms_table.sd_not_positive";
pub const FAILURE_CLASS_REQUIRED_GROUP_MISSING: &str = "norms_table.required_group_missing";
pub const WARNING_CLASS_FOREIGN_GROUP: &str = "norms_table.foreign_group";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableFinding {
    pub group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_code: Option<String>,
    pub class: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableCheckSummary {
    pub row_count: usize,
    pub group_count: usize,
    pub complete_group_count: usize,
    pub required_group_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableCheckReport {
    pub check_kind: String,
    pub result: String,
    pub failure_classes: Vec<String>,
    pub warning_classes: Vec<String>,
    pub errors: Vec<TableFinding>,
    pub warnings: Vec<TableFinding>,
    pub summary: TableCheckSummary,
}

impl TableCheckReport {
    pub fn accepted(&self) -> bool {
        self.result == "accepted"
    }
}

fn collect_classes(findings: &[TableFinding]) -> Vec<String> {
    findings
        .iter()
        .map(|finding| finding.class.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn finding(
    group_id: &str,
    metric_code: Option<&str>,
    class: &str,
    message: String,
) -> TableFinding {
    TableFinding {
        group_id: group_id.to_string(),
        metric_code: metric_code.map(str::to_string),
        class: class.to_string(),
        message,
    }
}

/// Audit every group of `table` and the presence of `required_groups`.
pub fn check_table(table: &NormsTable, required_groups: &[String]) -> TableCheckReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut complete_group_count = 0;

    let group_ids = table.group_ids();
    for group_id in &group_ids {
        let rows: Vec<&NormRow> = table.group(group_id).collect();

        let mut per_code: BTreeMap<&str, usize> = BTreeMap::new();
        for row in &rows {
            *per_code.entry(row.metric_code.as_str()).or_default() += 1;
        }
        for (code, count) in &per_code {
            if *count > 1 {
                errors.push(finding(
                    group_id,
                    Some(*code),
                    FAILURE_CLASS_DUPLICATE_METRIC,
                    format!("metric_code {code} appears {count} times"),
                ));
            }
        }

        let taxonomy: Vec<(MetricCode, &NormRow)> = rows
            .iter()
            .filter_map(|row| row.taxonomy_metric().map(|code| (code, *row)))
            .collect();
        if taxonomy.is_empty() {
            warnings.push(finding(
                group_id,
                None,
                WARNING_CLASS_FOREIGN_GROUP,
                format!("group has {} rows and none use the BIG5 taxonomy", rows.len()),
            ));
            continue;
        }

        for (code, row) in &taxonomy {
            if !row.sd.is_positive() {
                errors.push(finding(
                    group_id,
                    Some(code.as_str()),
                    FAILURE_CLASS_SD_NOT_POSITIVE,
                    format!("sd must be > 0, got {}", row.sd),
                ));
            }
        }

        let present: BTreeSet<MetricCode> = taxonomy.iter().map(|(code, _)| *code).collect();
        let domains = present
            .iter()
            .filter(|code| code.level() == MetricLevel::Domain)
            .count();
        let facets = present.len() - domains;
        if taxonomy.len() == METRIC_COUNT && present.len() == METRIC_COUNT {
            complete_group_count += 1;
        } else {
            let missing: Vec<&str> = MetricCode::all()
                .filter(|code| !present.contains(code))
                .map(MetricCode::as_str)
                .collect();
            let mut message = format!(
                "group has {} taxonomy rows ({domains} domain, {facets} facet distinct); \
                 expected {METRIC_COUNT} (5 domain, 30 facet)",
                taxonomy.len()
            );
            if !missing.is_empty() {
                message.push_str(&format!("; missing {}", missing.join(",")));
            }
            errors.push(finding(group_id, None, FAILURE_CLASS_GROUP_INCOMPLETE, message));
        }
    }

    for required in required_groups {
        if !group_ids.contains(&required.as_str()) {
            errors.push(finding(
                required,
                None,
                FAILURE_CLASS_REQUIRED_GROUP_MISSING,
                "required group is absent from the table".to_string(),
            ));
        }
    }

    let failure_classes = collect_classes(&errors);
    let warning_classes = collect_classes(&warnings);
    let result = if errors.is_empty() {
        "accepted".to_string()
    } else {
        "rejected".to_string()
    };
    let summary = TableCheckSummary {
        row_count: table.len(),
        group_count: group_ids.len(),
        complete_group_count,
        required_group_count: required_groups.len(),
        error_count: errors.len(),
        warning_count: warnings.len(),
    };

    TableCheckReport {
        check_kind: TABLE_CHECK_KIND.to_string(),
        result,
        failure_classes,
        warning_classes,
        errors,
        warnings,
        summary,
    }
}
