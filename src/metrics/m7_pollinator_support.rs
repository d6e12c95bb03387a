//! METRIC 7: POLLINATOR SUPPORT (SHARED POLLINATORS)
//!
//! Scores shared pollinator networks: for every unordered pair, shared
//! pollinators count fully and shared flower visitors count at a reduced
//! weight (the visitor records are noisier).

use super::ScoringContext;
use crate::data::Guild;
use crate::stores::intersection_count;

/// Result of M7 calculation
#[derive(Debug, Clone, Default)]
pub struct M7Result {
    /// Weighted shared pollinator count over unordered pairs
    pub raw: f64,
    /// Shared pollinators summed over pairs
    pub shared_pollinators: usize,
    /// Shared flower visitors summed over pairs
    pub shared_visitors: usize,
    /// Number of plants with ≥1 documented pollinator
    pub plants_with_pollinators: usize,
}

pub fn calculate_m7(ctx: &ScoringContext<'_>, guild: &Guild) -> M7Result {
    let w = &ctx.weights.pollinator;
    let mut result = M7Result::default();

    for (a, b) in guild.pairs() {
        let pa = ctx.data.associations.get(a);
        let pb = ctx.data.associations.get(b);
        let pollinators = intersection_count(&pa.pollinators, &pb.pollinators);
        let visitors = intersection_count(&pa.flower_visitors, &pb.flower_visitors);
        result.shared_pollinators += pollinators;
        result.shared_visitors += visitors;
        result.raw += pollinators as f64 * w.pollinator + visitors as f64 * w.flower_visitor;
    }

    result.plants_with_pollinators = guild
        .members()
        .iter()
        .filter(|&&p| !ctx.data.associations.get(p).pollinators.is_empty())
        .count();

    result
}
