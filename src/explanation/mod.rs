//! Qualitative flags and explanatory network summaries
//!
//! Everything here runs after scoring, from the metric results and the guild
//! itself; nothing feeds back into the numeric score. Organism connectivity
//! counts are built here so that calibration only pays for raw scores.

pub mod biocontrol_network_analysis;
pub mod coverage;
pub mod csr_strategy_analysis;
pub mod fungi_network_analysis;
pub mod nitrogen;
pub mod pathogen_control_network_analysis;
pub mod pest_analysis;
pub mod pollinator_network_analysis;
pub mod soil_ph;
pub mod structural_diversity_analysis;
pub mod types;

pub use types::{FlagKind, MatchedPair, NetworkSummaries, PlantBiocontrolHub, Severity, WarningCard};

pub use biocontrol_network_analysis::{analyze_biocontrol_network, BiocontrolNetworkProfile};
pub use coverage::{check_unmatched_taxa, climate_incompatible};
pub use csr_strategy_analysis::{analyze_csr_strategies, CsrConflict, CsrStrategy, CsrStrategyProfile};
pub use fungi_network_analysis::{analyze_fungi_network, FungiNetworkProfile, SharedFungiByCategory};
pub use nitrogen::{check_nitrogen_deficit, check_nitrogen_fixation};
pub use pathogen_control_network_analysis::{analyze_pathogen_control_network, PathogenControlNetworkProfile};
pub use pest_analysis::{analyze_guild_pests, PestProfile, VulnerablePlant};
pub use pollinator_network_analysis::{analyze_pollinator_network, PollinatorNetworkProfile};
pub use soil_ph::{check_soil_ph_compatibility, PhCategory};
pub use structural_diversity_analysis::{
    analyze_structural_diversity, check_structural_diversity, StructuralDiversityProfile,
};

use crate::config::{ExplanationConfig, FlagThresholds};
use crate::data::{Guild, GuildData, Plant};
use crate::metrics::MetricResults;

/// Flags for a climate-compatible guild, most severe first
pub fn collect_flags(
    data: &GuildData,
    guild: &Guild,
    results: &MetricResults,
    thresholds: &FlagThresholds,
) -> Vec<WarningCard> {
    let plants: Vec<&Plant> = guild.members().iter().map(|&p| data.plant(p)).collect();

    let mut flags: Vec<WarningCard> = [
        check_nitrogen_fixation(&plants, thresholds),
        check_nitrogen_deficit(&plants, thresholds),
        check_soil_ph_compatibility(&plants, thresholds),
        check_structural_diversity(&results.m6, guild.len()),
        check_unmatched_taxa(&results.m1, guild.len()),
    ]
    .into_iter()
    .flatten()
    .collect();

    flags.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.kind.cmp(&b.kind)));
    flags
}

/// Network summaries and profiles for a scored guild
pub fn summarize_networks(
    data: &GuildData,
    guild: &Guild,
    results: &MetricResults,
    config: &ExplanationConfig,
) -> NetworkSummaries {
    let top_n = config.top_n;
    NetworkSummaries {
        pollinators: analyze_pollinator_network(data, guild, &results.m7, top_n),
        biocontrol: analyze_biocontrol_network(data, guild, &results.m3, top_n),
        pathogen_control: analyze_pathogen_control_network(data, guild, &results.m4, top_n),
        beneficial_fungi: analyze_fungi_network(data, guild, &results.m5, top_n),
        pests: analyze_guild_pests(data, guild, top_n),
        csr: analyze_csr_strategies(data, guild, &results.m2, config.csr_conflict_distance, top_n),
        structure: analyze_structural_diversity(data, guild, &results.m6),
    }
}
