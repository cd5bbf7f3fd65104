use crate::support::print_json_or_exit;
use psynorm_assert::{
    AssertReport, ConsistencyExpectations, ConsistencyVerdict, assert_report_files,
};

fn print_verdict(verdict: &ConsistencyVerdict, report_path: &str, share_path: &str) {
    println!("[ASSERT][OK] report/share assertions passed");
    println!("  attempt_id={}", verdict.attempt_id);
    println!("  type_code={}", verdict.type_code.as_deref().unwrap_or(""));
    println!("  content_pack_id={}", verdict.content_pack_id);
    println!("  share_id={}", verdict.share_id);
    println!("  report_path={report_path}");
    println!("  share_path={share_path}");
}

pub fn run(
    report_path: String,
    share_path: String,
    expect_locale: String,
    expect_pack_prefix: String,
    json_output: bool,
) {
    let expectations = ConsistencyExpectations {
        locale: expect_locale,
        content_pack_substring: Some(expect_pack_prefix).filter(|s| !s.trim().is_empty()),
    };

    let result = assert_report_files(&report_path, &share_path, &expectations);
    let report = AssertReport::from_result(&result);

    if json_output {
        print_json_or_exit(&report, "assert-report");
    }
    match &result {
        Ok(verdict) => {
            if !json_output {
                print_verdict(verdict, &report_path, &share_path);
            }
        }
        Err(error) => {
            tracing::debug!(class = error.class(), "report/share assertion failed");
            eprintln!("[ASSERT][FAIL] {error}");
        }
    }

    if !report.accepted() {
        std::process::exit(report.exit_code);
    }
}
