//! One group build: attempts (or fallback) → merge → table bytes → artifact.

use crate::aggregate::aggregate;
use crate::fallback::resolve_fallback;
use crate::profile::BuildProfile;
use crate::provenance::{
    BUILD_ARTIFACT_KIND, BUILD_ARTIFACT_SCHEMA, BuildArtifact, ComputeSpec, FiltersApplied,
    artifact_file_name,
};
use psynorm_kernel::{MetricStat, NormsError, sha256_hex};
use psynorm_table::{MergeSummary, NormsTable, load_attempts, merge_group, write_bytes_atomic};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn};

pub const SOURCE_MODE_ATTEMPTS: &str = "attempts";

/// Where the 35 statistics came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatSource {
    Attempts,
    Fallback(String),
}

impl StatSource {
    /// `attempts` or `fallback:<group_id>`.
    pub fn mode(&self) -> String {
        match self {
            Self::Attempts => SOURCE_MODE_ATTEMPTS.to_string(),
            Self::Fallback(group_id) => format!("fallback:{group_id}"),
        }
    }
}

/// Everything a build computes before touching the filesystem.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub source: StatSource,
    pub stats: Vec<MetricStat>,
    pub table: NormsTable,
    pub table_csv: String,
    pub merge: MergeSummary,
    pub artifact: BuildArtifact,
    pub table_path: PathBuf,
    pub artifact_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutcome {
    pub source_mode: String,
    pub group_id: String,
    pub norms_version: String,
    pub metric_count: usize,
    pub merge: MergeSummary,
    pub table_path: String,
    pub artifact_path: String,
    pub output_csv_sha256: String,
    pub dry_run: bool,
    pub artifact: BuildArtifact,
}

/// Compute rows, merged table and artifact without writing anything.
pub fn plan_build(profile: &BuildProfile) -> Result<BuildPlan, NormsError> {
    profile.validate()?;
    let publication = profile.publication();
    let filter = profile.quality_filter();

    let table = NormsTable::load(&profile.table_path)?;
    debug!(
        rows = table.len(),
        path = %profile.table_path.display(),
        "loaded norms table"
    );

    let aggregated = match load_attempts(&profile.input_path)? {
        Some(attempts) => {
            let outcome = aggregate(&attempts, &filter)?;
            debug!(
                raw = outcome.sample_n_raw,
                kept = outcome.sample_n_kept,
                quality = %filter,
                "aggregated attempts"
            );
            Some(outcome)
        }
        None => {
            info!(path = %profile.input_path.display(), "attempt file not found");
            None
        }
    };

    let (source, stats, sample_n_raw, sample_n_kept) = match aggregated {
        Some(outcome) if !outcome.is_empty() => (
            StatSource::Attempts,
            outcome.stats,
            outcome.sample_n_raw,
            outcome.sample_n_kept,
        ),
        _ => {
            let fallback_group = profile.fallback_group.trim();
            warn!(
                group = %publication.group_id,
                fallback = fallback_group,
                "no accepted attempts; using fallback group"
            );
            let fallback =
                resolve_fallback(&table, fallback_group, profile.fallback_min_sample_n)?;
            (
                StatSource::Fallback(fallback.group_id),
                fallback.stats,
                fallback.sample_n,
                fallback.sample_n,
            )
        }
    };

    let (merged, merge) = merge_group(&table, &publication, &stats)?;
    let table_csv = merged.render_csv();
    let output_csv_sha256 = sha256_hex(table_csv.as_bytes());
    let compute_spec_hash =
        ComputeSpec::new(&publication.scale_code, &filter, profile.fallback_min_sample_n).hash()?;

    let artifact = BuildArtifact {
        schema: BUILD_ARTIFACT_SCHEMA,
        artifact_kind: BUILD_ARTIFACT_KIND.to_string(),
        scale_code: publication.scale_code.clone(),
        norms_version: publication.norms_version.clone(),
        source_id: publication.source_id.clone(),
        source_type: publication.source_type.clone(),
        pack_locale: publication.locale.clone(),
        group_id: publication.group_id.clone(),
        sample_n_raw,
        sample_n_kept,
        filters_applied: FiltersApplied {
            quality_levels: filter.levels(),
            source_mode: source.mode(),
            input_path: profile.input_path.display().to_string(),
        },
        compute_spec_hash,
        output_csv_sha256,
        output_csv_path: profile.table_path.display().to_string(),
    };
    let artifact_path = profile
        .artifact_dir
        .join(artifact_file_name(&artifact.norms_version, &artifact.group_id));

    Ok(BuildPlan {
        source,
        stats,
        table: merged,
        table_csv,
        merge,
        artifact,
        table_path: profile.table_path.clone(),
        artifact_path,
    })
}

/// Plan a build and, unless `dry_run`, write the table and its artifact.
pub fn run_build(profile: &BuildProfile, dry_run: bool) -> Result<BuildOutcome, NormsError> {
    let span = info_span!("build", group = %profile.group_id, version = %profile.norms_version);
    let _guard = span.enter();

    let plan = plan_build(profile)?;
    if dry_run {
        info!(sha256 = %plan.artifact.output_csv_sha256, "dry run; nothing written");
    } else {
        // A table is only replaced once its artifact is staged.
        let artifact = plan.artifact.stage_in_dir(&profile.artifact_dir)?;
        write_bytes_atomic(&plan.table_path, plan.table_csv.as_bytes())?;
        artifact.commit()?;
        info!(
            table = %plan.table_path.display(),
            artifact = %plan.artifact_path.display(),
            rows = plan.table.len(),
            "build written"
        );
    }

    Ok(BuildOutcome {
        source_mode: plan.source.mode(),
        group_id: plan.artifact.group_id.clone(),
        norms_version: plan.artifact.norms_version.clone(),
        metric_count: plan.stats.len(),
        merge: plan.merge,
        table_path: plan.table_path.display().to_string(),
        artifact_path: plan.artifact_path.display().to_string(),
        output_csv_sha256: plan.artifact.output_csv_sha256.clone(),
        dry_run,
        artifact: plan.artifact,
    })
}
