use crate::support::{exit_with, load_config_or_exit, print_json_or_exit, yes_no};
use psynorm_build::{BuildOutcome, BuildProfile, run_build};
use std::path::PathBuf;

/// Profile selection plus per-field overrides from the command line.
pub struct BuildArgs {
    pub profile: String,
    pub config: Option<String>,
    pub input: Option<String>,
    pub table: Option<String>,
    pub artifact_dir: Option<String>,
    pub group_id: Option<String>,
    pub norms_version: Option<String>,
    pub fallback_group: Option<String>,
    pub only_quality: Option<String>,
}

impl BuildArgs {
    fn apply(self, profile: &mut BuildProfile) {
        if let Some(input) = self.input {
            profile.input_path = PathBuf::from(input);
        }
        if let Some(table) = self.table {
            profile.table_path = PathBuf::from(table);
        }
        if let Some(artifact_dir) = self.artifact_dir {
            profile.artifact_dir = PathBuf::from(artifact_dir);
        }
        if let Some(group_id) = self.group_id {
            profile.group_id = group_id;
        }
        if let Some(norms_version) = self.norms_version {
            profile.norms_version = norms_version;
        }
        if let Some(fallback_group) = self.fallback_group {
            profile.fallback_group = fallback_group;
        }
        if let Some(only_quality) = self.only_quality {
            profile.quality_levels = only_quality;
        }
    }
}

fn print_outcome(outcome: &BuildOutcome) {
    println!(
        "psynorm build{}",
        if outcome.dry_run { " (dry run)" } else { "" }
    );
    println!("  Group: {}", outcome.group_id);
    println!("  Norms version: {}", outcome.norms_version);
    println!("  Source: {}", outcome.source_mode);
    println!(
        "  Samples: raw={} kept={}",
        outcome.artifact.sample_n_raw, outcome.artifact.sample_n_kept
    );
    println!(
        "  Rows: removed={} inserted={} total={}",
        outcome.merge.removed, outcome.merge.inserted, outcome.merge.total
    );
    println!("  Table: {}", outcome.table_path);
    println!("  Table sha256: {}", outcome.output_csv_sha256);
    println!("  Artifact: {}", outcome.artifact_path);
    println!("  Written: {}", yes_no(!outcome.dry_run));
}

pub fn run(args: BuildArgs, dry_run: bool, json_output: bool) {
    let config = load_config_or_exit(args.config.as_deref());
    let mut profile = config
        .profile(&args.profile)
        .unwrap_or_else(|e| exit_with(&e));
    tracing::debug!(profile = %args.profile, "selected build profile");
    args.apply(&mut profile);

    let outcome = run_build(&profile, dry_run).unwrap_or_else(|e| exit_with(&e));

    if json_output {
        print_json_or_exit(&outcome, "build");
    } else {
        print_outcome(&outcome);
    }
}
