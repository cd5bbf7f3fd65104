use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "psynorm",
    about = "psynorm: Big Five norms builds and report/share consistency checks",
    version
)]
pub struct Cli {
    /// Log filter for stderr diagnostics (e.g. `info`, `psynorm_build=debug`)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute one group's statistics and merge them into the norms table
    Build {
        /// Build profile name
        #[arg(long, default_value = psynorm_build::DEFAULT_PROFILE)]
        profile: String,

        /// TOML file overlaying the built-in profiles
        #[arg(long)]
        config: Option<String>,

        /// Attempts CSV (overrides the profile)
        #[arg(long)]
        input: Option<String>,

        /// Norms table CSV (overrides the profile)
        #[arg(long)]
        table: Option<String>,

        /// Directory for build artifacts (overrides the profile)
        #[arg(long)]
        artifact_dir: Option<String>,

        /// Target group id (overrides the profile)
        #[arg(long)]
        group_id: Option<String>,

        /// Norms version label (overrides the profile)
        #[arg(long)]
        norms_version: Option<String>,

        /// Group reused when no attempt data is available (overrides the profile)
        #[arg(long)]
        fallback_group: Option<String>,

        /// Accepted quality grades, e.g. `A,B` (overrides the profile)
        #[arg(long)]
        only_quality: Option<String>,

        /// Compute and report without writing the table or artifact
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a report document and its share document agree
    AssertReport {
        /// Report JSON path
        #[arg(long)]
        report: String,

        /// Share JSON path
        #[arg(long)]
        share: String,

        /// Locale the report identity card must carry
        #[arg(long, default_value = psynorm_assert::DEFAULT_EXPECT_LOCALE)]
        expect_locale: String,

        /// Substring the content-pack id must contain (empty disables)
        #[arg(long, default_value = "")]
        expect_pack_prefix: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate norms table completeness and required groups
    TableCheck {
        /// Norms table CSV (defaults to the default profile's table)
        #[arg(long)]
        table: Option<String>,

        /// TOML file providing `required_groups`
        #[arg(long)]
        config: Option<String>,

        /// Required group id (repeatable; replaces configured groups)
        #[arg(long = "required-group")]
        required_groups: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two norms tables and flag large mean/sd shifts
    DriftCheck {
        /// Baseline norms table CSV
        #[arg(long)]
        from: String,

        /// Candidate norms table CSV
        #[arg(long)]
        to: String,

        /// Compare only this group
        #[arg(long)]
        group: Option<String>,

        /// Maximum allowed absolute mean shift
        #[arg(long, default_value_t = psynorm_build::DEFAULT_THRESHOLD_MEAN)]
        threshold_mean: f64,

        /// Maximum allowed absolute sd shift
        #[arg(long, default_value_t = psynorm_build::DEFAULT_THRESHOLD_SD)]
        threshold_sd: f64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
