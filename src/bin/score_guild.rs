//! Score one guild and print the result as JSON
//!
//! Example:
//!   score_guild --config scorer.json wfo-0000832453 wfo-0000649136

use clap::Parser;
use guild_scorer::{ClimateTier, GuildScorer, ScorerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Score a plant guild")]
struct Args {
    /// Scorer configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Climate context, e.g. tier_3_humid_temperate
    #[arg(long)]
    climate: Option<ClimateTier>,
    /// Compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
    /// Plant taxon IDs
    #[arg(required = true)]
    plants: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guild_scorer=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ScorerConfig::load(path)?,
        None => ScorerConfig::default(),
    };

    let scorer = GuildScorer::new(config)?;
    let result = scorer.score(&args.plants, args.climate)?;

    let json = if args.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{json}");

    Ok(())
}
