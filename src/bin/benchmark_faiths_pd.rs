//! Faith's PD throughput benchmark
//!
//! Times PD queries on the configured tree, either for guilds listed in a
//! CSV (`guild_id,guild_size,species`, species separated by `;;`) or for
//! random guilds drawn from the mapped taxa.

use anyhow::{Context, Result};
use clap::Parser;
use guild_scorer::{PhyloEngine, ScorerConfig};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Benchmark Faith's PD queries")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Guild CSV; random guilds are used when omitted
    #[arg(long)]
    guilds: Option<PathBuf>,
    /// Number of random guilds
    #[arg(long, default_value_t = 10_000)]
    n_guilds: usize,
    /// Random guild size
    #[arg(long, default_value_t = 7)]
    guild_size: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Write guild_id,guild_size,faiths_pd rows here
    #[arg(long)]
    output: Option<PathBuf>,
}

fn read_guilds(path: &PathBuf) -> Result<Vec<Vec<String>>> {
    let contents = fs::read_to_string(path).with_context(|| format!("Failed to read guilds: {:?}", path))?;
    let mut guilds = Vec::new();
    for (i, line) in contents.lines().enumerate().skip(1) {
        let parts: Vec<&str> = line.splitn(3, ',').collect();
        if parts.len() < 3 {
            warn!(line = i + 1, "skipping malformed guild row");
            continue;
        }
        // Species entries may carry a display name: "wfo-0000832453|Fraxinus_excelsior"
        let species: Vec<String> = parts[2]
            .split(";;")
            .map(|s| s.split('|').next().unwrap_or(s).trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        guilds.push(species);
    }
    Ok(guilds)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("guild_scorer=info,warn")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ScorerConfig::load(path)?,
        None => ScorerConfig::default(),
    };

    let load_start = Instant::now();
    let engine = PhyloEngine::from_files(&config.data.tree, &config.data.tree_mapping)?;
    info!(
        nodes = engine.tree().n_nodes(),
        leaves = engine.n_leaves(),
        load_ms = load_start.elapsed().as_secs_f64() * 1000.0,
        "tree loaded"
    );

    let guilds = match &args.guilds {
        Some(path) => read_guilds(path)?,
        None => {
            let mut taxa: Vec<&str> = engine.taxa().collect();
            taxa.sort_unstable();
            let mut rng = StdRng::seed_from_u64(args.seed);
            (0..args.n_guilds)
                .map(|_| taxa.choose_multiple(&mut rng, args.guild_size).map(|s| s.to_string()).collect())
                .collect()
        }
    };
    anyhow::ensure!(!guilds.is_empty(), "no guilds to benchmark");

    // Warm-up
    for _ in 0..3 {
        let _ = engine.pd(&guilds[0]);
    }

    let start = Instant::now();
    let results: Vec<Option<f64>> = guilds.iter().map(|g| engine.pd(g).ok().map(|r| r.pd)).collect();
    let total_sec = start.elapsed().as_secs_f64();

    let undefined = results.iter().filter(|r| r.is_none()).count();
    if undefined > 0 {
        warn!(undefined, "guilds with no taxon on the tree");
    }

    if let Some(path) = &args.output {
        let mut out = BufWriter::new(File::create(path).with_context(|| format!("Failed to create {:?}", path))?);
        writeln!(out, "guild_id,guild_size,faiths_pd")?;
        for (i, (guild, pd)) in guilds.iter().zip(&results).enumerate() {
            match pd {
                Some(pd) => writeln!(out, "{},{},{:.10}", i, guild.len(), pd)?,
                None => writeln!(out, "{},{},NA", i, guild.len())?,
            }
        }
        out.flush()?;
    }

    let mean_us = total_sec / results.len() as f64 * 1e6;
    println!("Guilds processed: {}", results.len());
    println!("Total time: {:.3} seconds", total_sec);
    println!("Mean time per guild: {:.3} μs", mean_us);
    println!("Throughput: {:.0} guilds/second", results.len() as f64 / total_sec.max(1e-12));

    Ok(())
}
