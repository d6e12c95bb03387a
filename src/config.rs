//! Scorer configuration
//!
//! One JSON file drives data paths, metric weights, calibration parameters and
//! flag thresholds. Every field has a default so partial files are fine.

use crate::error::GuildError;
use crate::stores::FungalCategory;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub data: DataPaths,
    pub weights: MetricWeights,
    pub calibration: CalibrationParams,
    pub flags: FlagThresholds,
    pub explanation: ExplanationConfig,
}

impl ScorerConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: ScorerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GuildError> {
        self.weights.validate()?;
        self.calibration.validate()?;
        if self.flags.ph_range_threshold < 0.0 {
            return Err(GuildError::InvalidConfig(
                "flags.ph_range_threshold must be non-negative".into(),
            ));
        }
        if !(self.explanation.csr_conflict_distance >= 0.0) {
            return Err(GuildError::InvalidConfig(
                "explanation.csr_conflict_distance must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Input table locations (see `data::loader`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub plants: PathBuf,
    pub organisms: PathBuf,
    pub fungi: PathBuf,
    pub herbivore_predators: PathBuf,
    pub insect_parasites: PathBuf,
    pub pathogen_antagonists: PathBuf,
    pub tree: PathBuf,
    pub tree_mapping: PathBuf,
    pub calibration: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            plants: "data/plants/plants_csr_koppen.parquet".into(),
            organisms: "data/associations/organism_profiles.csv".into(),
            fungi: "data/associations/fungal_guilds.csv".into(),
            herbivore_predators: "data/associations/herbivore_predators.csv".into(),
            insect_parasites: "data/associations/insect_fungal_parasites.csv".into(),
            pathogen_antagonists: "data/associations/pathogen_antagonists.csv".into(),
            tree: "data/phylogeny/tree.nwk".into(),
            tree_mapping: "data/phylogeny/wfo_to_tree_mapping.csv".into(),
            calibration: "data/calibration/normalization_params.json".into(),
        }
    }
}

/// Which end of the tree Faith's PD is measured from for M1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdAnchor {
    /// Root-to-tip paths (classic Faith's PD)
    #[default]
    Root,
    /// Minimal subtree spanning the tips only
    Mrca,
}

/// Tunable weights for M1-M7
///
/// The specific-vs-generic weights and the fungal category weights are
/// calibration choices, not fixed constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricWeights {
    pub m1_decay_k: f64,
    pub m1_pd_anchor: PdAnchor,
    pub biocontrol: BiocontrolWeights,
    pub disease: DiseaseWeights,
    pub beneficial_fungi: BeneficialFungiWeights,
    pub pollinator: PollinatorWeights,
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self {
            m1_decay_k: 3.0,
            m1_pd_anchor: PdAnchor::Root,
            biocontrol: BiocontrolWeights::default(),
            disease: DiseaseWeights::default(),
            beneficial_fungi: BeneficialFungiWeights::default(),
            pollinator: PollinatorWeights::default(),
        }
    }
}

impl MetricWeights {
    fn validate(&self) -> Result<(), GuildError> {
        let all = [
            ("m1_decay_k", self.m1_decay_k),
            ("biocontrol.specific_predator", self.biocontrol.specific_predator),
            ("biocontrol.specific_entomopathogen", self.biocontrol.specific_entomopathogen),
            ("biocontrol.generic_entomopathogen", self.biocontrol.generic_entomopathogen),
            ("disease.specific_antagonist", self.disease.specific_antagonist),
            ("disease.generic_mycoparasite", self.disease.generic_mycoparasite),
            ("disease.generic_fungivore", self.disease.generic_fungivore),
            ("beneficial_fungi.amf", self.beneficial_fungi.amf),
            ("beneficial_fungi.emf", self.beneficial_fungi.emf),
            ("beneficial_fungi.endophytic", self.beneficial_fungi.endophytic),
            ("beneficial_fungi.saprotrophic", self.beneficial_fungi.saprotrophic),
            ("pollinator.pollinator", self.pollinator.pollinator),
            ("pollinator.flower_visitor", self.pollinator.flower_visitor),
        ];
        for (name, value) in all {
            if !value.is_finite() || value < 0.0 {
                return Err(GuildError::InvalidConfig(format!(
                    "weights.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiocontrolWeights {
    pub specific_predator: f64,
    pub specific_entomopathogen: f64,
    pub generic_entomopathogen: f64,
}

impl Default for BiocontrolWeights {
    fn default() -> Self {
        Self {
            specific_predator: 1.0,
            specific_entomopathogen: 1.0,
            generic_entomopathogen: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseWeights {
    pub specific_antagonist: f64,
    pub generic_mycoparasite: f64,
    pub generic_fungivore: f64,
}

impl Default for DiseaseWeights {
    fn default() -> Self {
        Self {
            specific_antagonist: 1.0,
            generic_mycoparasite: 1.0,
            generic_fungivore: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeneficialFungiWeights {
    pub amf: f64,
    pub emf: f64,
    pub endophytic: f64,
    pub saprotrophic: f64,
}

impl Default for BeneficialFungiWeights {
    fn default() -> Self {
        Self {
            amf: 1.0,
            emf: 1.0,
            endophytic: 0.5,
            saprotrophic: 0.5,
        }
    }
}

impl BeneficialFungiWeights {
    /// Weight for a beneficial category; other categories weigh 0
    pub fn weight(&self, category: FungalCategory) -> f64 {
        match category {
            FungalCategory::Amf => self.amf,
            FungalCategory::Emf => self.emf,
            FungalCategory::Endophytic => self.endophytic,
            FungalCategory::Saprotrophic => self.saprotrophic,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollinatorWeights {
    pub pollinator: f64,
    pub flower_visitor: f64,
}

impl Default for PollinatorWeights {
    fn default() -> Self {
        Self {
            pollinator: 1.0,
            flower_visitor: 0.5,
        }
    }
}

/// Monte Carlo calibration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    pub samples_per_stratum: usize,
    pub guild_sizes: Vec<usize>,
    pub percentiles: Vec<f64>,
    pub seed: u64,
    /// Free-form label for the tree/data snapshot the tables were built from
    pub data_version: String,
}

pub const DEFAULT_PERCENTILES: [f64; 13] = [
    1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 99.0,
];

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            samples_per_stratum: 20_000,
            guild_sizes: vec![2, 7],
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            seed: 42,
            data_version: "unversioned".to_string(),
        }
    }
}

impl CalibrationParams {
    pub fn validate(&self) -> Result<(), GuildError> {
        if self.samples_per_stratum == 0 {
            return Err(GuildError::InvalidConfig(
                "calibration.samples_per_stratum must be positive".into(),
            ));
        }
        if self.guild_sizes.is_empty() || self.guild_sizes.contains(&0) {
            return Err(GuildError::InvalidConfig(
                "calibration.guild_sizes must list at least one positive size".into(),
            ));
        }
        if self.percentiles.len() < 2 {
            return Err(GuildError::InvalidConfig(
                "calibration.percentiles needs at least two breakpoints".into(),
            ));
        }
        let in_range = self.percentiles.iter().all(|p| (0.0..=100.0).contains(p));
        let increasing = self.percentiles.windows(2).all(|w| w[0] < w[1]);
        if !in_range || !increasing {
            return Err(GuildError::InvalidConfig(
                "calibration.percentiles must be strictly increasing within 0..=100".into(),
            ));
        }
        Ok(())
    }
}

/// Thresholds for the qualitative flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagThresholds {
    /// Max tolerated EIVE-R spread within a guild
    pub ph_range_threshold: f64,
    /// More fixers than this triggers the nitrogen excess flag
    pub max_nitrogen_fixers: usize,
    /// EIVE-N at or above this marks a heavy feeder
    pub heavy_feeder_eive_n: f64,
}

impl Default for FlagThresholds {
    fn default() -> Self {
        Self {
            ph_range_threshold: 2.0,
            max_nitrogen_fixers: 2,
            heavy_feeder_eive_n: 7.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    pub top_n: usize,
    /// CSR distance at or above which a plant pair is listed as a conflict
    pub csr_conflict_distance: f64,
}

impl Default for ExplanationConfig {
    fn default() -> Self {
        Self { top_n: 10, csr_conflict_distance: 70.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "calibration": { "samples_per_stratum": 500, "seed": 7 } }"#;
        let config: ScorerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.calibration.samples_per_stratum, 500);
        assert_eq!(config.calibration.seed, 7);
        assert_eq!(config.calibration.guild_sizes, vec![2, 7]);
        assert_eq!(config.weights.m1_decay_k, 3.0);
        assert_eq!(config.weights.m1_pd_anchor, PdAnchor::Root);
        assert_eq!(config.flags.max_nitrogen_fixers, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pd_anchor_parses_snake_case() {
        let json = r#"{ "m1_pd_anchor": "mrca" }"#;
        let weights: MetricWeights = serde_json::from_str(json).unwrap();
        assert_eq!(weights.m1_pd_anchor, PdAnchor::Mrca);
    }

    #[test]
    fn test_rejects_unsorted_percentiles() {
        let mut params = CalibrationParams::default();
        params.percentiles = vec![5.0, 1.0, 50.0];
        assert!(matches!(params.validate(), Err(GuildError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = ScorerConfig::default();
        config.weights.disease.generic_fungivore = -0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_guild_size() {
        let mut params = CalibrationParams::default();
        params.guild_sizes = vec![0, 2];
        assert!(params.validate().is_err());
    }
}
