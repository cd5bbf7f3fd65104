use crate::support::{exit_with, load_config_or_exit, load_table_or_exit, print_json_or_exit};
use psynorm_build::DEFAULT_PROFILE;
use psynorm_table::{TableCheckReport, check_table};

fn print_report(report: &TableCheckReport, table_path: &str) {
    println!(
        "[norms-table] {} (rows={}, groups={}, complete={}, errors={}, warnings={})",
        if report.accepted() { "OK" } else { "FAIL" },
        report.summary.row_count,
        report.summary.group_count,
        report.summary.complete_group_count,
        report.summary.error_count,
        report.summary.warning_count
    );
    println!("  Table: {table_path}");
    for finding in &report.errors {
        println!(
            "  - {} {} ({})",
            finding.group_id, finding.class, finding.message
        );
    }
    for finding in &report.warnings {
        println!(
            "  - WARN {} {} ({})",
            finding.group_id, finding.class, finding.message
        );
    }
}

pub fn run(
    table: Option<String>,
    config: Option<String>,
    required_groups: Vec<String>,
    json_output: bool,
) {
    let config = load_config_or_exit(config.as_deref());
    let table_path = match table {
        Some(table) => table,
        None => config
            .profile(DEFAULT_PROFILE)
            .map(|profile| profile.table_path.display().to_string())
            .unwrap_or_else(|e| exit_with(&e)),
    };
    let required_groups = if required_groups.is_empty() {
        config.required_groups.clone()
    } else {
        required_groups
    };

    let table = load_table_or_exit(&table_path, "norms");
    let report = check_table(&table, &required_groups);

    if json_output {
        print_json_or_exit(&report, "table-check");
    } else {
        print_report(&report, &table_path);
    }

    if !report.accepted() {
        std::process::exit(1);
    }
}
