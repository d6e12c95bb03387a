//! Köppen-Stratified Calibration Pipeline
//!
//! For each Köppen tier and configured guild size (default 2 and 7), samples
//! random guilds from the tier's plants, computes raw M1-M7 and writes the
//! percentile tables the scorer normalizes against.

use clap::Parser;
use guild_scorer::calibration::{calibrate, CancellationToken, ClimateOrganizer};
use guild_scorer::metrics::{plant_leaves, ScoringContext};
use guild_scorer::{GuildData, PhyloEngine, ScorerConfig};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Build Köppen-stratified calibration tables")]
struct Args {
    /// Scorer configuration (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,
    /// Override the number of guilds sampled per (tier, size) stratum
    #[arg(long)]
    samples: Option<usize>,
    /// Override the guild sizes, e.g. --guild-sizes 2,7
    #[arg(long, value_delimiter = ',')]
    guild_sizes: Option<Vec<usize>>,
    /// Override the output path (defaults to data.calibration)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guild_scorer=info,warn")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => ScorerConfig::load(path)?,
        None => ScorerConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.calibration.seed = seed;
    }
    if let Some(samples) = args.samples {
        config.calibration.samples_per_stratum = samples;
    }
    if let Some(sizes) = args.guild_sizes {
        config.calibration.guild_sizes = sizes;
    }
    let output = args.output.unwrap_or_else(|| config.data.calibration.clone());
    config.validate()?;

    let total_start = Instant::now();

    let data = GuildData::load(&config.data)?;
    let phylo = PhyloEngine::from_files(&config.data.tree, &config.data.tree_mapping)?;
    let leaves = plant_leaves(&data, &phylo);
    let ctx = ScoringContext::new(&data, &phylo, &config.weights, &leaves);

    let organizer = ClimateOrganizer::from_plants(&data.plants);
    for tier in organizer.tiers() {
        info!(%tier, plants = organizer.pool_size(tier), "tier pool");
    }

    let tables = calibrate(&ctx, &organizer, &config.calibration, &CancellationToken::new())?;
    tables.persist(&output)?;

    let strata: usize = tables.tiers.values().map(|t| t.guild_sizes.len()).sum();
    info!(
        path = ?output,
        tiers = tables.tiers.len(),
        strata,
        guilds = strata * config.calibration.samples_per_stratum,
        seconds = total_start.elapsed().as_secs_f64(),
        "calibration written"
    );

    Ok(())
}
