//! psynorm CLI: the `psynorm` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("error: invalid --log-level {level:?}: {e}");
        std::process::exit(2);
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Build {
            profile,
            config,
            input,
            table,
            artifact_dir,
            group_id,
            norms_version,
            fallback_group,
            only_quality,
            dry_run,
            json,
        } => commands::build::run(
            commands::build::BuildArgs {
                profile,
                config,
                input,
                table,
                artifact_dir,
                group_id,
                norms_version,
                fallback_group,
                only_quality,
            },
            dry_run,
            json,
        ),

        Commands::AssertReport {
            report,
            share,
            expect_locale,
            expect_pack_prefix,
            json,
        } => commands::assert_report::run(report, share, expect_locale, expect_pack_prefix, json),

        Commands::TableCheck {
            table,
            config,
            required_groups,
            json,
        } => commands::table_check::run(table, config, required_groups, json),

        Commands::DriftCheck {
            from,
            to,
            group,
            threshold_mean,
            threshold_sd,
            json,
        } => commands::drift_check::run(from, to, group, threshold_mean, threshold_sd, json),
    }
}
