//! # psynorm-build
//!
//! The norms build pipeline for one demographic group:
//!
//! ```text
//! attempts CSV ──aggregate──┐
//!                           ├─► 35 MetricStat ─► merge_group ─► table bytes
//! norms table ──fallback────┘                                      │
//!                                                                  ▼
//!                                                            BuildArtifact
//! ```
//!
//! - `aggregate`: quality filter plus mean / population sd per metric
//! - `fallback`: reuse a complete published group when no attempts qualify
//! - `provenance`: compute-spec hash, output digest, artifact file
//! - `drift`: threshold comparison of two tables
//! - `profile`: built-in and TOML build profiles
//! - `pipeline`: `plan_build` / `run_build`, including dry runs

pub mod aggregate;
pub mod drift;
pub mod fallback;
pub mod pipeline;
pub mod profile;
pub mod provenance;

pub use aggregate::{
    AggregateOutcome, QUALITY_GRADES, QualityFilter, aggregate, mean, population_sd,
};
pub use drift::{
    DEFAULT_THRESHOLD_MEAN, DEFAULT_THRESHOLD_SD, DRIFT_CHECK_KIND, DriftBreach, DriftReport,
    DriftThresholds, check_drift,
};
pub use fallback::{DEFAULT_FALLBACK_MIN_SAMPLE_N, FallbackOutcome, resolve_fallback};
pub use pipeline::{
    BuildOutcome, BuildPlan, SOURCE_MODE_ATTEMPTS, StatSource, plan_build, run_build,
};
pub use profile::{BuildConfig, BuildProfile, DEFAULT_PROFILE, SCALE_CODE};
pub use provenance::{
    BUILD_ARTIFACT_KIND, BUILD_ARTIFACT_SCHEMA, BuildArtifact, COMPUTE_SPEC_VERSION, ComputeSpec,
    FiltersApplied, artifact_file_name,
};
