//! Guild Scorer
//!
//! Scores how well a set of plants ("guild") grows together. Seven metrics
//! cover pest independence (Faith's PD), growth-strategy conflict, insect
//! biocontrol, disease control, beneficial fungi, vertical stratification
//! and pollinator support. Raw values are normalized against Köppen-tier
//! stratified calibration tables built from random guilds.
//!
//! Module layout:
//! - `phylo/`: Newick parsing and the LCA-based PD engine
//! - `data/`, `stores`: plant table and association stores, loaded with Polars
//! - `metrics/`: the seven calculators (M1-M7)
//! - `calibration`: stratified Monte Carlo calibration
//! - `scorer`: the `GuildScorer` orchestrator
//! - `explanation/`: flags and network summaries
//! - `utils/`: normalization, organism counting, LazyFrame helpers

pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod explanation;
pub mod metrics;
pub mod phylo;
pub mod scorer;
pub mod stores;
pub mod utils;

// Re-export commonly used types
pub use calibration::{calibrate, CancellationToken, ClimateOrganizer};
pub use config::{MetricWeights, PdAnchor, ScorerConfig};
pub use data::{ClimateTier, Guild, GuildData, GuildDataBuilder, Plant};
pub use error::{GuildError, GuildResult};
pub use explanation::{FlagKind, NetworkSummaries, Severity, WarningCard};
pub use metrics::{compute_all, compute_raw_scores, plant_leaves, RawScores, ScoringContext};
pub use phylo::{PdResult, PhyloEngine, PhyloTree};
pub use scorer::{GuildScorer, MetricScore, ScoreResult};
pub use utils::{percentile_normalize, CalibrationTables, Metric};
