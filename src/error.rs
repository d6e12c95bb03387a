//! Domain errors for guild scoring and calibration
//!
//! Loader and binary code uses `anyhow`; everything a caller can act on
//! (unknown plants, empty PD sets, missing calibration) is a `GuildError`.

use crate::data::ClimateTier;
use crate::utils::normalization::Metric;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GuildError {
    #[error("plant '{0}' is not in the plant table")]
    UnknownPlant(String),

    #[error("guild must contain at least one plant")]
    EmptyGuild,

    #[error("plant '{0}' appears more than once in the guild")]
    DuplicatePlant(String),

    #[error("plant index {index} is out of range for a table of {n_plants} plants")]
    PlantIndexOutOfRange { index: usize, n_plants: usize },

    /// Every requested taxon was missing from the tree, so PD is undefined.
    #[error("no taxa matched a tree leaf ({unmatched} of {requested} unmatched)")]
    InsufficientTaxa { requested: usize, unmatched: usize },

    #[error("no calibration for tier {tier} metric {metric}; re-run calibration for this tier")]
    MissingCalibrationTable { tier: ClimateTier, metric: Metric },

    #[error("calibration for tier {tier} metric {metric} has unusable breakpoints")]
    InvalidCalibrationTable { tier: ClimateTier, metric: Metric },

    #[error("tier {tier} has no calibrated guild sizes")]
    NoCalibratedGuildSize { tier: ClimateTier },

    #[error("newick parse error at byte {position}: {message}")]
    TreeParse { position: usize, message: String },

    #[error("negative branch length {length} on node '{label}'")]
    NegativeBranchLength { label: String, length: f64 },

    #[error("leaf label '{0}' occurs more than once in the tree")]
    DuplicateLeaf(String),

    #[error("calibration cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type GuildResult<T> = std::result::Result<T, GuildError>;
