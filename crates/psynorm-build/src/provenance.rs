//! Build artifacts: what was computed, from what, and the digest of the
//! resulting table bytes.

use crate::aggregate::QualityFilter;
use psynorm_kernel::{MetricCode, NormsError, SD_EPSILON, stable_sha256};
use psynorm_table::{StagedFile, stage_bytes};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const BUILD_ARTIFACT_SCHEMA: u32 = 1;
pub const BUILD_ARTIFACT_KIND: &str = "psynorm.build_artifact.v1";
pub const COMPUTE_SPEC_VERSION: &str = "big5_norms_compute.v1";
pub const SD_ESTIMATOR: &str = "population";
pub const DECIMAL_PLACES: u32 = 3;

/// Descriptor of the computation. Hashed canonically into
/// `compute_spec_hash`; any change to it changes the hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeSpec {
    pub scale_code: String,
    pub spec_version: String,
    pub metric_codes: Vec<String>,
    pub quality_levels: Vec<String>,
    pub sd_estimator: String,
    pub sd_epsilon: f64,
    pub decimal_places: u32,
    pub fallback_min_sample_n: u64,
}

impl ComputeSpec {
    pub fn new(scale_code: &str, filter: &QualityFilter, fallback_min_sample_n: u64) -> Self {
        Self {
            scale_code: scale_code.to_string(),
            spec_version: COMPUTE_SPEC_VERSION.to_string(),
            metric_codes: MetricCode::all().map(|code| code.to_string()).collect(),
            quality_levels: filter.levels(),
            sd_estimator: SD_ESTIMATOR.to_string(),
            sd_epsilon: SD_EPSILON,
            decimal_places: DECIMAL_PLACES,
            fallback_min_sample_n,
        }
    }

    pub fn hash(&self) -> Result<String, NormsError> {
        let value = serde_json::to_value(self)
            .map_err(|e| NormsError::config(format!("compute spec is not serializable: {e}")))?;
        Ok(stable_sha256(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltersApplied {
    pub quality_levels: Vec<String>,
    /// `attempts` or `fallback:<group_id>`.
    pub source_mode: String,
    pub input_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    pub schema: u32,
    pub artifact_kind: String,
    pub scale_code: String,
    pub norms_version: String,
    pub source_id: String,
    pub source_type: String,
    pub pack_locale: String,
    pub group_id: String,
    pub sample_n_raw: u64,
    pub sample_n_kept: u64,
    pub filters_applied: FiltersApplied,
    pub compute_spec_hash: String,
    pub output_csv_sha256: String,
    pub output_csv_path: String,
}

fn unsafe_file_char_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("file-name regex must compile"))
}

/// `<norms_version>__<group_id>.json` with unsafe characters replaced.
pub fn artifact_file_name(norms_version: &str, group_id: &str) -> String {
    let raw = format!("{norms_version}__{group_id}.json");
    unsafe_file_char_re().replace_all(&raw, "_").into_owned()
}

impl BuildArtifact {
    pub fn file_name(&self) -> String {
        artifact_file_name(&self.norms_version, &self.group_id)
    }

    /// Pretty JSON with sorted keys and a trailing newline.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, NormsError> {
        // Round-trip through Value: its map type keeps keys sorted.
        let value = serde_json::to_value(self)
            .map_err(|e| NormsError::config(format!("artifact is not serializable: {e}")))?;
        let mut bytes = serde_json::to_vec_pretty(&value)
            .map_err(|e| NormsError::config(format!("artifact is not serializable: {e}")))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Write the artifact next to its final path in `dir`. Committing the
    /// staged file replaces an artifact of the same version and group.
    pub fn stage_in_dir(&self, dir: impl AsRef<Path>) -> Result<StagedFile, NormsError> {
        stage_bytes(dir.as_ref().join(self.file_name()), &self.to_json_bytes()?)
    }
}
