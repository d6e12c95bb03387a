//! Guild Scorer - Main coordinator for scoring plant guilds
//!
//! Applies the climate filter, runs the seven calculators, normalizes each
//! raw value against the calibration table for the guild's climate tier and
//! size, and attaches flags and network summaries.
//!
//! All state is loaded once and read-only afterwards, so one scorer can serve
//! any number of threads (`score_many` uses rayon).

use crate::config::ScorerConfig;
use crate::data::{ClimateTier, Guild, GuildData, TierSet};
use crate::error::{GuildError, GuildResult};
use crate::explanation::{climate_incompatible, collect_flags, summarize_networks, NetworkSummaries, WarningCard};
use crate::metrics::{compute_all, compute_raw_scores, plant_leaves, RawScores, ScoringContext};
use crate::phylo::PhyloEngine;
use crate::utils::{CalibrationTables, Metric};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

/// Main guild scorer
pub struct GuildScorer {
    data: GuildData,
    phylo: PhyloEngine,
    leaves: Vec<Option<u32>>,
    calibration: CalibrationTables,
    config: ScorerConfig,
}

/// One metric of a scored guild
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricScore {
    pub metric: Metric,
    pub label: &'static str,
    /// `None` when undefined for this guild
    pub raw: Option<f64>,
    /// Percentile within the calibration stratum (0-100)
    pub percentile: Option<f64>,
    /// Percentile as shown; inverted for M1 and M2 so that high is good
    pub display: Option<f64>,
}

/// Guild score result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Guild taxon IDs in plant table order
    pub plant_ids: Vec<String>,
    pub climate_compatible: bool,
    /// Tiers every plant belongs to
    pub shared_tiers: Vec<ClimateTier>,
    /// Tier whose calibration was used
    pub climate_tier: Option<ClimateTier>,
    /// Calibrated guild size used for normalization
    pub calibrated_guild_size: Option<usize>,
    /// Mean of the defined display values; `None` when not scored
    pub overall_score: Option<f64>,
    /// M1-M7 in order; empty when the guild is climate-incompatible
    pub metrics: Vec<MetricScore>,
    pub faiths_pd: Option<f64>,
    /// Guild plants missing from the phylogeny
    pub unmatched_taxa: usize,
    pub flags: Vec<WarningCard>,
    pub networks: Option<NetworkSummaries>,
}

impl ScoreResult {
    pub fn metric(&self, metric: Metric) -> Option<&MetricScore> {
        self.metrics.iter().find(|m| m.metric == metric)
    }
}

impl GuildScorer {
    /// Load data, phylogeny and calibration from the configured paths
    pub fn new(config: ScorerConfig) -> Result<Self> {
        config.validate()?;
        info!("Initializing guild scorer");

        let data = GuildData::load(&config.data)?;
        let phylo = PhyloEngine::from_files(&config.data.tree, &config.data.tree_mapping)?;
        let calibration = CalibrationTables::load(&config.data.calibration)
            .with_context(|| format!("Failed to load calibration: {:?}", config.data.calibration))?;

        Ok(Self::from_parts(data, phylo, calibration, config))
    }

    /// Assemble a scorer from already-built parts
    pub fn from_parts(
        data: GuildData,
        phylo: PhyloEngine,
        calibration: CalibrationTables,
        config: ScorerConfig,
    ) -> Self {
        let leaves = plant_leaves(&data, &phylo);
        check_snapshot(&calibration, &data, &phylo);
        info!(
            plants = data.n_plants(),
            on_tree = leaves.iter().filter(|l| l.is_some()).count(),
            calibrated_tiers = calibration.tiers.len(),
            "Guild scorer ready"
        );
        Self { data, phylo, leaves, calibration, config }
    }

    pub fn data(&self) -> &GuildData {
        &self.data
    }

    pub fn phylo(&self) -> &PhyloEngine {
        &self.phylo
    }

    pub fn calibration(&self) -> &CalibrationTables {
        &self.calibration
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn context(&self) -> ScoringContext<'_> {
        ScoringContext::new(&self.data, &self.phylo, &self.config.weights, &self.leaves)
    }

    /// Raw scores without normalization
    pub fn compute_raw_scores<S: AsRef<str>>(&self, plant_ids: &[S]) -> GuildResult<RawScores> {
        let guild = self.data.resolve(plant_ids)?;
        Ok(compute_raw_scores(&self.context(), &guild))
    }

    /// Score a guild given by taxon IDs
    ///
    /// `climate_context`, when given, must be one of the tiers every plant
    /// shares; otherwise the guild is reported climate-incompatible.
    pub fn score<S: AsRef<str>>(
        &self,
        plant_ids: &[S],
        climate_context: Option<ClimateTier>,
    ) -> GuildResult<ScoreResult> {
        let guild = self.data.resolve(plant_ids)?;
        self.score_guild(&guild, climate_context)
    }

    /// Score many guilds in parallel; output order follows input order
    pub fn score_many<S: AsRef<str> + Sync>(
        &self,
        guilds: &[Vec<S>],
        climate_context: Option<ClimateTier>,
    ) -> Vec<GuildResult<ScoreResult>> {
        guilds.par_iter().map(|ids| self.score(ids, climate_context)).collect()
    }

    /// Score an already-resolved guild of plant table indices
    pub fn score_guild(&self, guild: &Guild, climate_context: Option<ClimateTier>) -> GuildResult<ScoreResult> {
        if guild.is_empty() {
            return Err(GuildError::EmptyGuild);
        }
        let n_plants = self.data.n_plants();
        if let Some(&index) = guild.members().iter().find(|&&p| p >= n_plants) {
            return Err(GuildError::PlantIndexOutOfRange { index, n_plants });
        }

        let plant_ids: Vec<String> =
            guild.members().iter().map(|&p| self.data.plant(p).taxon_id.clone()).collect();
        let unmatched_taxa = guild.members().iter().filter(|&&p| self.leaves[p].is_none()).count();

        // STEP 1: Climate filter
        let shared = guild
            .members()
            .iter()
            .fold(TierSet::from_tiers(&ClimateTier::ALL), |acc, &p| {
                acc.intersection(self.data.plant(p).tiers)
            });
        let shared_tiers: Vec<ClimateTier> = shared.iter().collect();

        let Some(tier) = self.select_tier(shared, climate_context) else {
            let plants: Vec<_> = guild.members().iter().map(|&p| self.data.plant(p)).collect();
            return Ok(ScoreResult {
                plant_ids,
                climate_compatible: false,
                shared_tiers,
                climate_tier: None,
                calibrated_guild_size: None,
                overall_score: None,
                metrics: Vec::new(),
                faiths_pd: None,
                unmatched_taxa,
                flags: vec![climate_incompatible(&plants)],
                networks: None,
            });
        };

        // STEP 2: Raw metrics
        let results = compute_all(&self.context(), guild);
        let raw = results.raw_scores();

        // STEP 3-4: Normalize against the (tier, size) stratum, invert M1/M2
        let mut metrics = Vec::with_capacity(Metric::ALL.len());
        let mut calibrated_guild_size = None;
        for metric in Metric::ALL {
            let raw_value = raw.get(metric);
            let percentile = match raw_value {
                Some(value) => {
                    let (size, cal) = self.calibration.metric(tier, guild.len(), metric)?;
                    calibrated_guild_size = Some(size);
                    let percentile = cal
                        .normalize(value)
                        .ok_or(GuildError::InvalidCalibrationTable { tier, metric })?;
                    Some(percentile)
                }
                None => None,
            };
            let display = percentile.map(|p| if metric.is_inverted() { 100.0 - p } else { p });
            metrics.push(MetricScore { metric, label: metric.label(), raw: raw_value, percentile, display });
        }

        // STEP 5: Overall = mean of the defined display values
        let defined: Vec<f64> = metrics.iter().filter_map(|m| m.display).collect();
        let overall_score = (!defined.is_empty()).then(|| defined.iter().sum::<f64>() / defined.len() as f64);

        // STEP 6-7: Flags and network summaries
        let flags = collect_flags(&self.data, guild, &results, &self.config.flags);
        let networks = summarize_networks(&self.data, guild, &results, &self.config.explanation);

        Ok(ScoreResult {
            plant_ids,
            climate_compatible: true,
            shared_tiers,
            climate_tier: Some(tier),
            calibrated_guild_size,
            overall_score,
            metrics,
            faiths_pd: results.m1.as_ref().ok().map(|r| r.faiths_pd),
            unmatched_taxa,
            flags,
            networks: Some(networks),
        })
    }

    /// Calibration tier for a set of shared tiers
    ///
    /// A given context must be shared. Without one, the most specific shared
    /// tier wins: smallest calibrated pool, enum order on ties.
    fn select_tier(&self, shared: TierSet, climate_context: Option<ClimateTier>) -> Option<ClimateTier> {
        match climate_context {
            Some(tier) => shared.contains(tier).then_some(tier),
            None => shared.iter().min_by_key(|&tier| {
                let pool = self.calibration.tier(tier).map_or(usize::MAX, |t| t.pool_size);
                (pool, tier)
            }),
        }
    }
}

fn check_snapshot(calibration: &CalibrationTables, data: &GuildData, phylo: &PhyloEngine) {
    let snap = &calibration.snapshot;
    let tree_length = phylo.total_branch_length();
    let length_drift = (snap.total_branch_length - tree_length).abs() > 1e-6 * tree_length.abs().max(1.0);
    if snap.n_plants != data.n_plants() || snap.n_tree_leaves != phylo.n_leaves() || length_drift {
        warn!(
            data_version = %snap.data_version,
            calibrated_plants = snap.n_plants,
            loaded_plants = data.n_plants(),
            calibrated_leaves = snap.n_tree_leaves,
            loaded_leaves = phylo.n_leaves(),
            "Calibration snapshot does not match loaded data; percentiles may be stale"
        );
    }
}
