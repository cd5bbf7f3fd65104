use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const CODES: [&str; 35] = [
    "O", "C", "E", "A", "N", "N1", "N2", "N3", "N4", "N5", "N6", "E1", "E2", "E3", "E4", "E5",
    "E6", "O1", "O2", "O3", "O4", "O5", "O6", "A1", "A2", "A3", "A4", "A5", "A6", "C1", "C2",
    "C3", "C4", "C5", "C6",
];

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "psynorm-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_psynorm<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_psynorm");
    Command::new(bin)
        .args(args)
        .output()
        .expect("psynorm command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn write_attempts(path: &Path, rows: &[(&str, f64)]) {
    let mut text = format!("quality_level,{}\n", CODES.join(","));
    for (grade, value) in rows {
        let cells = vec![value.to_string(); CODES.len()];
        text.push_str(&format!("{grade},{}\n", cells.join(",")));
    }
    fs::write(path, text).expect("attempts should be written");
}

fn assert_fixture(name: &str, file: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../psynorm-assert/tests/fixtures")
        .join(name)
        .join(file)
        .display()
        .to_string()
}

/// Build one group into `table` from attempts with the given per-record values.
fn build_group(dir: &Path, table: &Path, group: &str, values: &[(&str, f64)]) -> Output {
    let input = dir.join(format!("{group}.csv"));
    write_attempts(&input, values);
    run_psynorm([
        OsStr::new("build"),
        OsStr::new("--input"),
        input.as_os_str(),
        OsStr::new("--table"),
        table.as_os_str(),
        OsStr::new("--artifact-dir"),
        dir.join("artifacts").as_os_str(),
        OsStr::new("--group-id"),
        OsStr::new(group),
        OsStr::new("--json"),
    ])
}

#[test]
fn build_writes_table_and_artifact() {
    let dir = TempDirGuard::new("build");
    let table = dir.path().join("norms.csv");

    let output = build_group(
        dir.path(),
        &table,
        "zh-CN_prod_all_18-60",
        &[("A", 3.0), ("b", 4.0), ("C", 9.0)],
    );
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["sourceMode"], "attempts");
    assert_eq!(payload["groupId"], "zh-CN_prod_all_18-60");
    assert_eq!(payload["metricCount"], 35);
    assert_eq!(payload["merge"]["inserted"], 35);
    assert_eq!(payload["artifact"]["sample_n_raw"], 3);
    assert_eq!(payload["artifact"]["sample_n_kept"], 2);

    let text = fs::read_to_string(&table).expect("table should exist");
    assert_eq!(text.lines().count(), 36);
    assert!(text.contains(",domain,O,3.500,0.500,2,"));

    let artifact = payload["artifactPath"].as_str().expect("artifact path");
    assert!(Path::new(artifact).is_file());
}

#[test]
fn rebuilding_same_group_is_byte_identical() {
    let dir = TempDirGuard::new("rebuild");
    let table = dir.path().join("norms.csv");

    assert_success(&build_group(dir.path(), &table, "g1", &[("A", 2.0), ("A", 4.0)]));
    let first = fs::read(&table).expect("table should exist");
    assert_success(&build_group(dir.path(), &table, "g1", &[("A", 2.0), ("A", 4.0)]));
    let second = fs::read(&table).expect("table should exist");
    assert_eq!(first, second);
}

#[test]
fn build_dry_run_leaves_table_untouched() {
    let dir = TempDirGuard::new("dry-run");
    let table = dir.path().join("norms.csv");
    let input = dir.path().join("attempts.csv");
    write_attempts(&input, &[("A", 1.0), ("B", 2.0)]);

    let output = run_psynorm([
        OsStr::new("build"),
        OsStr::new("--input"),
        input.as_os_str(),
        OsStr::new("--table"),
        table.as_os_str(),
        OsStr::new("--artifact-dir"),
        dir.path().join("artifacts").as_os_str(),
        OsStr::new("--dry-run"),
    ]);
    assert_success(&output);
    assert!(stdout_text(&output).contains("(dry run)"));
    assert!(stdout_text(&output).contains("Written: no"));
    assert!(!table.exists());
    assert!(!dir.path().join("artifacts").exists());
}

#[test]
fn build_without_data_or_fallback_fails() {
    let dir = TempDirGuard::new("no-data");
    let table = dir.path().join("norms.csv");

    let output = run_psynorm([
        OsStr::new("build"),
        OsStr::new("--input"),
        dir.path().join("absent.csv").as_os_str(),
        OsStr::new("--table"),
        table.as_os_str(),
        OsStr::new("--artifact-dir"),
        dir.path().join("artifacts").as_os_str(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("incomplete_fallback_group"));
    assert!(!table.exists());
}

#[test]
fn build_rejects_unknown_profile() {
    let output = run_psynorm(["build", "--profile", "nope", "--dry-run"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("unknown profile"));
}

#[test]
fn table_check_reports_missing_required_group() {
    let dir = TempDirGuard::new("table-check");
    let table = dir.path().join("norms.csv");
    assert_success(&build_group(dir.path(), &table, "g1", &[("A", 3.0)]));

    let ok = run_psynorm([
        OsStr::new("table-check"),
        OsStr::new("--table"),
        table.as_os_str(),
        OsStr::new("--required-group"),
        OsStr::new("g1"),
    ]);
    assert_success(&ok);
    assert!(stdout_text(&ok).starts_with("[norms-table] OK"));

    let missing = run_psynorm([
        OsStr::new("table-check"),
        OsStr::new("--table"),
        table.as_os_str(),
        OsStr::new("--required-group"),
        OsStr::new("g1"),
        OsStr::new("--required-group"),
        OsStr::new("g2"),
        OsStr::new("--json"),
    ]);
    assert_eq!(missing.status.code(), Some(1));
    let payload = parse_json_stdout(&missing);
    assert_eq!(payload["result"], "rejected");
    assert_eq!(
        payload["failureClasses"],
        serde_json::json!(["norms_table.required_group_missing"])
    );
}

#[test]
fn drift_check_flags_large_mean_shift() {
    let dir = TempDirGuard::new("drift");
    let before = dir.path().join("before.csv");
    let after = dir.path().join("after.csv");
    assert_success(&build_group(dir.path(), &before, "g1", &[("A", 3.0), ("A", 4.0)]));
    assert_success(&build_group(dir.path(), &after, "g1", &[("A", 3.0), ("A", 5.0)]));

    let same = run_psynorm([
        OsStr::new("drift-check"),
        OsStr::new("--from"),
        before.as_os_str(),
        OsStr::new("--to"),
        before.as_os_str(),
    ]);
    assert_success(&same);
    assert!(stdout_text(&same).starts_with("[norms-drift] OK"));

    let shifted = run_psynorm([
        OsStr::new("drift-check"),
        OsStr::new("--from"),
        before.as_os_str(),
        OsStr::new("--to"),
        after.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_eq!(shifted.status.code(), Some(1));
    let payload = parse_json_stdout(&shifted);
    assert_eq!(payload["result"], "rejected");
    assert_eq!(payload["comparedMetrics"], 35);
    assert_eq!(payload["breaches"].as_array().map(Vec::len), Some(35));
    assert_eq!(payload["breaches"][0]["metricCode"], "A");
}

#[test]
fn drift_check_missing_table_fails() {
    let dir = TempDirGuard::new("drift-missing");
    let absent = dir.path().join("absent.csv");
    let output = run_psynorm([
        OsStr::new("drift-check"),
        OsStr::new("--from"),
        absent.as_os_str(),
        OsStr::new("--to"),
        absent.as_os_str(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("table not found"));
}

#[test]
fn assert_report_pass_prints_resolved_identity() {
    let report = assert_fixture("scenario_a_pass", "report.json");
    let share = assert_fixture("scenario_a_pass", "share.json");
    let output = run_psynorm(["assert-report", "--report", &report, "--share", &share]);
    assert_success(&output);

    let text = stdout_text(&output);
    assert!(text.starts_with("[ASSERT][OK] report/share assertions passed"));
    assert!(text.contains("  attempt_id=att_1\n"));
    assert!(text.contains("  content_pack_id=BIG5_OCEAN_v1\n"));
    assert!(text.contains("  share_id=shr_1\n"));
    assert!(text.contains(&format!("  report_path={report}\n")));
}

#[test]
fn assert_report_mismatch_exits_one() {
    let report = assert_fixture("scenario_b_attempt_id_mismatch", "report.json");
    let share = assert_fixture("scenario_b_attempt_id_mismatch", "share.json");
    let output = run_psynorm([
        "assert-report",
        "--report",
        &report,
        "--share",
        &share,
        "--json",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["result"], "rejected");
    assert_eq!(payload["failure"]["step"], "attempt_id");
    assert!(stderr_text(&output).contains("[ASSERT][FAIL] attempt_id:"));
}

#[test]
fn assert_report_pack_substring_is_checked() {
    let report = assert_fixture("scenario_a_pass", "report.json");
    let share = assert_fixture("scenario_a_pass", "share.json");
    let output = run_psynorm([
        "assert-report",
        "--report",
        &report,
        "--share",
        &share,
        "--expect-pack-prefix",
        "MBTI",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("content_pack_substring"));
}

#[test]
fn assert_report_unreadable_input_exits_two() {
    let dir = TempDirGuard::new("assert-unreadable");
    let share = assert_fixture("scenario_a_pass", "share.json");
    let report = dir.path().join("absent.json");

    let output = run_psynorm([
        OsStr::new("assert-report"),
        OsStr::new("--report"),
        report.as_os_str(),
        OsStr::new("--share"),
        OsStr::new(&share),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr_text(&output).contains("cannot read"));
}
