//! Named build profiles.
//!
//! A profile carries everything one group build needs: publication metadata,
//! input/output paths, the fallback group, and filter settings. Built-in
//! profiles mirror the production sources; a TOML file can add or replace
//! profiles by name:
//!
//! ```toml
//! required_groups = ["zh-CN_prod_all_18-60"]
//!
//! [profiles.zh_cn_prod]
//! norms_version = "2026Q2_prod_v1"
//! input_path = "exports/zh_cn_attempts.csv"
//! ```
//!
//! Fields omitted from a file profile take the `zh_cn_prod` defaults.

use crate::aggregate::QualityFilter;
use crate::fallback::DEFAULT_FALLBACK_MIN_SAMPLE_N;
use chrono::DateTime;
use psynorm_kernel::{NormsError, Publication};
use psynorm_table::read_text_if_exists;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "zh_cn_prod";
pub const SCALE_CODE: &str = "BIG5_OCEAN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildProfile {
    pub scale_code: String,
    pub norms_version: String,
    pub locale: String,
    pub region: String,
    pub group_id: String,
    pub gender: String,
    pub age_min: u32,
    pub age_max: u32,
    pub source_id: String,
    pub source_type: String,
    pub status: String,
    pub published_at: String,
    pub input_path: PathBuf,
    pub table_path: PathBuf,
    pub artifact_dir: PathBuf,
    pub fallback_group: String,
    pub quality_levels: String,
    pub fallback_min_sample_n: u64,
}

impl Default for BuildProfile {
    fn default() -> Self {
        Self {
            scale_code: SCALE_CODE.to_string(),
            norms_version: "2026Q1_prod_v1".to_string(),
            locale: "zh-CN".to_string(),
            region: "CN_MAINLAND".to_string(),
            group_id: "zh-CN_prod_all_18-60".to_string(),
            gender: "ALL".to_string(),
            age_min: 18,
            age_max: 60,
            source_id: "FERMATMIND_PROD_ZHCN_2026Q1".to_string(),
            source_type: "internal_prod".to_string(),
            status: "CALIBRATED".to_string(),
            published_at: "2026-02-21T00:00:00Z".to_string(),
            input_path: PathBuf::from("resources/norms/big5/input/zh_cn_prod_ab_attempts.csv"),
            table_path: PathBuf::from("resources/norms/big5/big5_norm_stats_seed.csv"),
            artifact_dir: PathBuf::from("resources/norms/big5/build_artifacts"),
            fallback_group: "zh-CN_xu_all_18-60".to_string(),
            quality_levels: "A,B".to_string(),
            fallback_min_sample_n: DEFAULT_FALLBACK_MIN_SAMPLE_N,
        }
    }
}

impl BuildProfile {
    /// Reject profiles that would publish unusable rows.
    pub fn validate(&self) -> Result<(), NormsError> {
        let required = [
            ("scale_code", &self.scale_code),
            ("norms_version", &self.norms_version),
            ("locale", &self.locale),
            ("group_id", &self.group_id),
            ("fallback_group", &self.fallback_group),
            ("source_id", &self.source_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(NormsError::MissingRequiredField {
                    field: field.to_string(),
                });
            }
        }
        if self.age_min > self.age_max {
            return Err(NormsError::config(format!(
                "age_min {} is greater than age_max {}",
                self.age_min, self.age_max
            )));
        }
        if self.fallback_min_sample_n == 0 {
            return Err(NormsError::config("fallback_min_sample_n must be at least 1"));
        }
        DateTime::parse_from_rfc3339(self.published_at.trim()).map_err(|e| {
            NormsError::config(format!(
                "published_at {:?} is not an RFC 3339 timestamp: {e}",
                self.published_at
            ))
        })?;
        Ok(())
    }

    pub fn quality_filter(&self) -> QualityFilter {
        QualityFilter::parse(&self.quality_levels)
    }

    pub fn publication(&self) -> Publication {
        Publication {
            scale_code: self.scale_code.trim().to_string(),
            norms_version: self.norms_version.trim().to_string(),
            locale: self.locale.trim().to_string(),
            region: self.region.trim().to_string(),
            group_id: self.group_id.trim().to_string(),
            gender: self.gender.trim().to_string(),
            age_min: self.age_min,
            age_max: self.age_max,
            source_id: self.source_id.trim().to_string(),
            source_type: self.source_type.trim().to_string(),
            status: self.status.trim().to_string(),
            published_at: self.published_at.trim().to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    required_groups: Option<Vec<String>>,
    #[serde(default)]
    profiles: BTreeMap<String, BuildProfile>,
}

/// Available profiles plus the groups a table must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    profiles: BTreeMap<String, BuildProfile>,
    pub required_groups: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BuildConfig {
    pub fn builtin() -> Self {
        let zh_cn_prod = BuildProfile::default();
        let zh_cn_validation = BuildProfile {
            norms_version: "2026Q1_xu_v1".to_string(),
            group_id: "zh-CN_xu_all_18-60".to_string(),
            source_id: "ZH_CN_IPIPNEO120_XU".to_string(),
            source_type: "peer_reviewed".to_string(),
            status: "PROVISIONAL".to_string(),
            input_path: PathBuf::from("norm_sources/big5/zh_cn_validation/zh_cn_attempts.csv"),
            fallback_group: "zh-CN_xu_all_18-60".to_string(),
            ..BuildProfile::default()
        };
        let johnson_osf = BuildProfile {
            norms_version: "2026Q1_bootstrap_v1".to_string(),
            locale: "en".to_string(),
            region: "GLOBAL".to_string(),
            group_id: "en_johnson_all_18-60".to_string(),
            source_id: "GLOBAL_IPIPNEO_JOHNSON_ARCHIVE".to_string(),
            source_type: "open_dataset".to_string(),
            input_path: PathBuf::from("norm_sources/big5/johnson_osf/en_attempts.csv"),
            fallback_group: "en_johnson_all_18-60".to_string(),
            ..BuildProfile::default()
        };

        let profiles = [
            (DEFAULT_PROFILE, zh_cn_prod),
            ("zh_cn_validation", zh_cn_validation),
            ("johnson_osf", johnson_osf),
        ]
        .into_iter()
        .map(|(name, profile)| (name.to_string(), profile))
        .collect();

        Self {
            profiles,
            required_groups: [
                "en_johnson_all_18-60",
                "en_johnson_f_18-29",
                "en_johnson_m_18-29",
                "zh-CN_prod_all_18-60",
                "zh-CN_prod_f_18-29",
                "zh-CN_prod_m_18-29",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }

    /// Built-in profiles overlaid with the profiles of a TOML document.
    pub fn from_toml_str(text: &str, label: &str) -> Result<Self, NormsError> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| NormsError::config(format!("invalid toml at {label}: {e}")))?;
        let mut config = Self::builtin();
        config.profiles.extend(file.profiles);
        if let Some(required_groups) = file.required_groups {
            config.required_groups = required_groups;
        }
        Ok(config)
    }

    /// Load a profile file. Unlike data files, a named config that does not
    /// exist is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NormsError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let text = read_text_if_exists(path)
            .map_err(|e| NormsError::config(e.to_string()))?
            .ok_or_else(|| NormsError::config(format!("config file not found: {label}")))?;
        Self::from_toml_str(&text, &label)
    }

    /// `load` when a path is given, otherwise the built-ins.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, NormsError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn profile(&self, name: &str) -> Result<BuildProfile, NormsError> {
        self.profiles.get(name).cloned().ok_or_else(|| {
            NormsError::config(format!(
                "unknown profile {name:?} (available: {})",
                self.profile_names().join(", ")
            ))
        })
    }
}
