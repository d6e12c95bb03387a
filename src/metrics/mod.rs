//! Metric modules for guild scoring
//!
//! Each metric is implemented in its own module. All calculators are pure
//! functions of a `ScoringContext` and a `Guild`; they never mutate shared
//! state and can run concurrently for different guilds.

pub mod m1_pest_pathogen_indep;
pub mod m2_growth_compatibility;
pub mod m3_insect_control;
pub mod m4_disease_control;
pub mod m5_beneficial_fungi;
pub mod m6_structural_diversity;
pub mod m7_pollinator_support;

pub use m1_pest_pathogen_indep::{calculate_m1, M1Result};
pub use m2_growth_compatibility::{calculate_m2, M2Result};
pub use m3_insect_control::{calculate_m3, M3Result};
pub use m4_disease_control::{calculate_m4, M4Result};
pub use m5_beneficial_fungi::{calculate_m5, M5Result};
pub use m6_structural_diversity::{calculate_m6, M6Result};
pub use m7_pollinator_support::{calculate_m7, M7Result};

use crate::config::MetricWeights;
use crate::data::{Guild, GuildData};
use crate::error::GuildResult;
use crate::phylo::PhyloEngine;
use crate::utils::Metric;
use serde::Serialize;

/// Leaf node for every plant (by dense index), `None` when off-tree
pub fn plant_leaves(data: &GuildData, phylo: &PhyloEngine) -> Vec<Option<u32>> {
    data.plants.iter().map(|p| phylo.leaf_for(&p.taxon_id)).collect()
}

/// Read-only inputs shared by all calculators
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
    pub data: &'a GuildData,
    pub phylo: &'a PhyloEngine,
    pub weights: &'a MetricWeights,
    leaves: &'a [Option<u32>],
}

impl<'a> ScoringContext<'a> {
    /// `leaves` comes from `plant_leaves(data, phylo)`, built once
    pub fn new(
        data: &'a GuildData,
        phylo: &'a PhyloEngine,
        weights: &'a MetricWeights,
        leaves: &'a [Option<u32>],
    ) -> Self {
        Self { data, phylo, weights, leaves }
    }

    pub fn leaf(&self, plant: usize) -> Option<u32> {
        self.leaves.get(plant).copied().flatten()
    }
}

/// Raw scores for all 7 metrics (unnormalized)
///
/// `None` marks an undefined value: M1 with no guild plant on the tree, M6
/// with fewer than two known heights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawScores {
    pub m1: Option<f64>,
    pub m2: f64,
    pub m3: f64,
    pub m4: f64,
    pub m5: f64,
    pub m6: Option<f64>,
    pub m7: f64,
}

impl RawScores {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::M1 => self.m1,
            Metric::M2 => Some(self.m2),
            Metric::M3 => Some(self.m3),
            Metric::M4 => Some(self.m4),
            Metric::M5 => Some(self.m5),
            Metric::M6 => self.m6,
            Metric::M7 => Some(self.m7),
        }
    }
}

/// Full per-metric results with the detail the explanation layer reads
#[derive(Debug, Clone)]
pub struct MetricResults {
    pub m1: GuildResult<M1Result>,
    pub m2: M2Result,
    pub m3: M3Result,
    pub m4: M4Result,
    pub m5: M5Result,
    pub m6: M6Result,
    pub m7: M7Result,
}

impl MetricResults {
    pub fn raw_scores(&self) -> RawScores {
        RawScores {
            m1: self.m1.as_ref().ok().map(|r| r.raw),
            m2: self.m2.raw,
            m3: self.m3.raw,
            m4: self.m4.raw,
            m5: self.m5.raw,
            m6: self.m6.raw,
            m7: self.m7.raw,
        }
    }
}

/// Run all seven calculators
pub fn compute_all(ctx: &ScoringContext<'_>, guild: &Guild) -> MetricResults {
    MetricResults {
        m1: calculate_m1(ctx, guild),
        m2: calculate_m2(ctx, guild),
        m3: calculate_m3(ctx, guild),
        m4: calculate_m4(ctx, guild),
        m5: calculate_m5(ctx, guild),
        m6: calculate_m6(ctx, guild),
        m7: calculate_m7(ctx, guild),
    }
}

/// Raw scores only (calibration path)
pub fn compute_raw_scores(ctx: &ScoringContext<'_>, guild: &Guild) -> RawScores {
    compute_all(ctx, guild).raw_scores()
}
