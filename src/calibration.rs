//! Köppen-stratified calibration
//!
//! For every climate tier and guild size, draw random guilds from the tier's
//! plant pool, compute the seven raw metrics and reduce each metric's values
//! to percentile breakpoints. Each stratum has its own seeded RNG, so a run
//! is reproducible regardless of how rayon schedules the scoring work.

use crate::config::CalibrationParams;
use crate::data::{ClimateTier, Guild, PlantTable};
use crate::error::{GuildError, GuildResult};
use crate::metrics::{compute_raw_scores, RawScores, ScoringContext};
use crate::utils::{CalibrationTables, Metric, MetricCalibration, SnapshotInfo, TierCalibration};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Plant pools per Köppen tier
#[derive(Debug, Clone, Default)]
pub struct ClimateOrganizer {
    pools: BTreeMap<ClimateTier, Vec<usize>>,
}

impl ClimateOrganizer {
    /// Partition plant indices by tier membership (a plant may sit in several)
    pub fn from_plants(plants: &PlantTable) -> Self {
        let mut pools: BTreeMap<ClimateTier, Vec<usize>> =
            ClimateTier::ALL.iter().map(|&t| (t, Vec::new())).collect();
        for (idx, plant) in plants.iter().enumerate() {
            for tier in plant.tiers.iter() {
                if let Some(pool) = pools.get_mut(&tier) {
                    pool.push(idx);
                }
            }
        }
        for (tier, pool) in &pools {
            debug!(%tier, plants = pool.len(), "tier pool");
        }
        Self { pools }
    }

    pub fn tiers(&self) -> impl Iterator<Item = ClimateTier> + '_ {
        self.pools.keys().copied()
    }

    pub fn tier_plants(&self, tier: ClimateTier) -> &[usize] {
        self.pools.get(&tier).map(|p| &p[..]).unwrap_or(&[])
    }

    pub fn pool_size(&self, tier: ClimateTier) -> usize {
        self.tier_plants(tier).len()
    }
}

/// Cooperative cancellation shared between a calibration run and its caller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// RNG seed for one (tier, guild size) stratum
pub fn stratum_seed(seed: u64, tier: ClimateTier, guild_size: usize) -> u64 {
    // splitmix64 finalizer over the combined key
    let mut z = seed ^ ((tier as u64 + 1) << 40) ^ guild_size as u64;
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Draw `n_guilds` guilds of `guild_size` distinct plants from `pool`
pub fn sample_guilds(pool: &[usize], guild_size: usize, n_guilds: usize, rng: &mut StdRng) -> Vec<Guild> {
    (0..n_guilds)
        .map(|_| Guild::from_indices(pool.choose_multiple(rng, guild_size).copied()))
        .collect()
}

/// Score sampled guilds in parallel, keeping sample order
pub fn score_samples(
    ctx: &ScoringContext<'_>,
    guilds: &[Guild],
    cancel: &CancellationToken,
) -> GuildResult<Vec<RawScores>> {
    let progress = AtomicUsize::new(0);
    let total = guilds.len();

    guilds
        .par_iter()
        .map(|guild| {
            if cancel.is_cancelled() {
                return Err(GuildError::Cancelled);
            }
            let scores = compute_raw_scores(ctx, guild);
            let count = progress.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 5000 == 0 {
                debug!(count, total, "scoring progress");
            }
            Ok(scores)
        })
        .collect()
}

/// Percentile tables for every metric from one stratum's raw scores
///
/// Undefined values are left out per metric; a metric with no defined value
/// at all gets no table.
pub fn reduce_samples(scores: &[RawScores], percentiles: &[f64]) -> BTreeMap<Metric, MetricCalibration> {
    let mut tables = BTreeMap::new();
    for metric in Metric::ALL {
        let values: Vec<f64> = scores.iter().filter_map(|s| s.get(metric)).collect();
        match MetricCalibration::from_samples(values, percentiles) {
            Some(cal) => {
                tables.insert(metric, cal);
            }
            None => warn!(%metric, "no defined values in stratum, metric left uncalibrated"),
        }
    }
    tables
}

/// Calibrate one (tier, guild size) stratum
pub fn calibrate_stratum(
    ctx: &ScoringContext<'_>,
    pool: &[usize],
    tier: ClimateTier,
    guild_size: usize,
    params: &CalibrationParams,
    cancel: &CancellationToken,
) -> GuildResult<BTreeMap<Metric, MetricCalibration>> {
    let mut rng = StdRng::seed_from_u64(stratum_seed(params.seed, tier, guild_size));

    let start = Instant::now();
    let guilds = sample_guilds(pool, guild_size, params.samples_per_stratum, &mut rng);
    let scores = score_samples(ctx, &guilds, cancel)?;
    let elapsed = start.elapsed().as_secs_f64();

    info!(
        %tier,
        guild_size,
        guilds = scores.len(),
        seconds = elapsed,
        guilds_per_sec = (scores.len() as f64 / elapsed.max(1e-9)).round(),
        "stratum scored"
    );

    Ok(reduce_samples(&scores, &params.percentiles))
}

/// Full stratified calibration over every tier and configured guild size
pub fn calibrate(
    ctx: &ScoringContext<'_>,
    organizer: &ClimateOrganizer,
    params: &CalibrationParams,
    cancel: &CancellationToken,
) -> GuildResult<CalibrationTables> {
    params.validate()?;

    let mut tiers = BTreeMap::new();
    for tier in organizer.tiers() {
        let pool = organizer.tier_plants(tier);
        let mut guild_sizes = BTreeMap::new();

        for &size in &params.guild_sizes {
            if pool.len() < size {
                warn!(%tier, pool = pool.len(), guild_size = size, "pool smaller than guild size, stratum skipped");
                continue;
            }
            let tables = calibrate_stratum(ctx, pool, tier, size, params, cancel)?;
            guild_sizes.insert(size, tables);
        }

        if !guild_sizes.is_empty() {
            tiers.insert(tier, TierCalibration { pool_size: pool.len(), guild_sizes });
        }
    }

    Ok(CalibrationTables {
        percentiles: params.percentiles.clone(),
        snapshot: snapshot_info(ctx, params),
        tiers,
    })
}

/// Snapshot of the data a calibration run is built from
pub fn snapshot_info(ctx: &ScoringContext<'_>, params: &CalibrationParams) -> SnapshotInfo {
    SnapshotInfo {
        data_version: params.data_version.clone(),
        n_plants: ctx.data.n_plants(),
        n_tree_leaves: ctx.phylo.n_leaves(),
        total_branch_length: ctx.phylo.total_branch_length(),
        seed: params.seed,
        samples_per_stratum: params.samples_per_stratum,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricWeights;
    use crate::data::{GuildData, GuildDataBuilder, Plant};
    use crate::metrics::plant_leaves;
    use crate::phylo::PhyloEngine;

    fn data() -> GuildData {
        let mut builder = GuildDataBuilder::new();
        for i in 0..6 {
            let mut tiers = vec![ClimateTier::HumidTemperate];
            if i < 2 {
                tiers.push(ClimateTier::Arid);
            }
            builder = builder.plant(
                Plant::new(format!("p{i}"), format!("Plant {i}"))
                    .with_tiers(&tiers)
                    .with_height(i as f64 * 1.5)
                    .with_csr(100.0 - i as f64 * 10.0, i as f64 * 10.0, 0.0),
            );
        }
        builder.build().unwrap()
    }

    const TREE: &str = "(((p0:1,p1:1):1,(p2:1,p3:1):1):1,(p4:2,p5:2):1);";

    fn params() -> CalibrationParams {
        CalibrationParams { samples_per_stratum: 200, guild_sizes: vec![2, 3], ..CalibrationParams::default() }
    }

    #[test]
    fn test_organizer_pools() {
        let data = data();
        let organizer = ClimateOrganizer::from_plants(&data.plants);
        assert_eq!(organizer.pool_size(ClimateTier::HumidTemperate), 6);
        assert_eq!(organizer.tier_plants(ClimateTier::Arid), &[0, 1]);
        assert_eq!(organizer.pool_size(ClimateTier::Tropical), 0);
    }

    #[test]
    fn test_stratum_seeds_differ() {
        let a = stratum_seed(42, ClimateTier::Arid, 2);
        assert_ne!(a, stratum_seed(42, ClimateTier::Arid, 7));
        assert_ne!(a, stratum_seed(42, ClimateTier::Tropical, 2));
        assert_ne!(a, stratum_seed(43, ClimateTier::Arid, 2));
        assert_eq!(a, stratum_seed(42, ClimateTier::Arid, 2));
    }

    #[test]
    fn test_sampled_guilds_are_distinct_plants() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = [3, 5, 8, 13, 21];
        for guild in sample_guilds(&pool, 3, 50, &mut rng) {
            assert_eq!(guild.len(), 3);
            assert!(guild.members().iter().all(|m| pool.contains(m)));
        }
    }

    #[test]
    fn test_small_pools_skipped() {
        let data = data();
        let engine = PhyloEngine::build_identity(TREE).unwrap();
        let weights = MetricWeights::default();
        let leaves = plant_leaves(&data, &engine);
        let ctx = ScoringContext::new(&data, &engine, &weights, &leaves);
        let organizer = ClimateOrganizer::from_plants(&data.plants);

        let tables = calibrate(&ctx, &organizer, &params(), &CancellationToken::new()).unwrap();
        let arid = tables.tier(ClimateTier::Arid).unwrap();
        assert_eq!(arid.pool_size, 2);
        assert!(arid.guild_sizes.contains_key(&2));
        assert!(!arid.guild_sizes.contains_key(&3));
        assert!(tables.tier(ClimateTier::Tropical).is_none());

        let temperate = tables.tier(ClimateTier::HumidTemperate).unwrap();
        for metrics in temperate.guild_sizes.values() {
            assert_eq!(metrics.len(), 7);
            assert!(metrics.values().all(|m| m.is_monotonic()));
        }
    }

    #[test]
    fn test_cancellation() {
        let data = data();
        let engine = PhyloEngine::build_identity(TREE).unwrap();
        let weights = MetricWeights::default();
        let leaves = plant_leaves(&data, &engine);
        let ctx = ScoringContext::new(&data, &engine, &weights, &leaves);
        let organizer = ClimateOrganizer::from_plants(&data.plants);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = calibrate(&ctx, &organizer, &params(), &cancel).unwrap_err();
        assert_eq!(err, GuildError::Cancelled);
    }

    #[test]
    fn test_undefined_values_left_out() {
        let scores = vec![
            RawScores { m1: None, m2: 1.0, m3: 0.0, m4: 0.0, m5: 0.0, m6: None, m7: 0.0 },
            RawScores { m1: Some(0.5), m2: 2.0, m3: 0.0, m4: 0.0, m5: 0.0, m6: None, m7: 0.0 },
        ];
        let tables = reduce_samples(&scores, &[50.0]);
        assert_eq!(tables[&Metric::M1].n_samples, 1);
        assert_eq!(tables[&Metric::M2].n_samples, 2);
        assert!(!tables.contains_key(&Metric::M6));
    }
}
