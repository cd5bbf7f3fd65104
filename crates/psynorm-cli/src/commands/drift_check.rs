use crate::support::{exit_with, load_table_or_exit, print_json_or_exit};
use psynorm_build::{DriftReport, DriftThresholds, check_drift};

fn print_report(report: &DriftReport) {
    println!(
        "[norms-drift] {} (groups={}, metrics={}, breaches={})",
        if report.accepted() { "OK" } else { "FAIL" },
        report.groups.len(),
        report.compared_metrics,
        report.breaches.len()
    );
    println!(
        "  Max diff: mean={} sd={} (thresholds: mean={} sd={})",
        report.max_mean_diff, report.max_sd_diff, report.thresholds.mean, report.thresholds.sd
    );
    for breach in &report.breaches {
        println!(
            "  - {} {} {}: mean {} -> {} (diff {}), sd {} -> {} (diff {})",
            breach.group_id,
            breach.metric_level,
            breach.metric_code,
            breach.mean_from,
            breach.mean_to,
            breach.mean_diff,
            breach.sd_from,
            breach.sd_to,
            breach.sd_diff
        );
    }
}

pub fn run(
    from: String,
    to: String,
    group: Option<String>,
    threshold_mean: f64,
    threshold_sd: f64,
    json_output: bool,
) {
    let thresholds =
        DriftThresholds::new(threshold_mean, threshold_sd).unwrap_or_else(|e| exit_with(&e));
    let before = load_table_or_exit(&from, "from");
    let after = load_table_or_exit(&to, "to");

    let report = check_drift(&before, &after, group.as_deref(), thresholds)
        .unwrap_or_else(|e| exit_with(&e));

    if json_output {
        print_json_or_exit(&report, "drift-check");
    } else {
        print_report(&report);
    }

    if !report.accepted() {
        std::process::exit(1);
    }
}
