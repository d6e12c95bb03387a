//! METRIC 5: BENEFICIAL FUNGI NETWORKS (MYCORRHIZAE & ENDOPHYTES)
//!
//! Scores common mycorrhizal networks and shared fungal associations. For
//! every unordered pair the shared fungi of each beneficial category (AMF,
//! EMF, endophytic, saprotrophic) are counted and weighted by category.

use super::ScoringContext;
use crate::data::Guild;
use crate::stores::{intersection_count, FungalCategory};

/// Result of M5 calculation
#[derive(Debug, Clone, Default)]
pub struct M5Result {
    /// Weighted shared-fungi count over unordered pairs
    pub raw: f64,
    /// Shared fungi per category over all pairs (AMF, EMF, endophytic, saprotrophic)
    pub shared_by_category: [usize; 4],
    /// Number of plants with any beneficial fungus
    pub plants_with_beneficial: usize,
}

pub fn calculate_m5(ctx: &ScoringContext<'_>, guild: &Guild) -> M5Result {
    let w = &ctx.weights.beneficial_fungi;
    let mut result = M5Result::default();

    for (a, b) in guild.pairs() {
        let fa = ctx.data.fungi.get(a);
        let fb = ctx.data.fungi.get(b);
        for (slot, cat) in FungalCategory::BENEFICIAL.into_iter().enumerate() {
            let shared = intersection_count(fa.category(cat), fb.category(cat));
            result.shared_by_category[slot] += shared;
            result.raw += shared as f64 * w.weight(cat);
        }
    }

    result.plants_with_beneficial = guild
        .members()
        .iter()
        .filter(|&&p| {
            let f = ctx.data.fungi.get(p);
            FungalCategory::BENEFICIAL.iter().any(|&c| !f.category(c).is_empty())
        })
        .count();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricWeights;
    use crate::data::{FungalRecord, GuildData, GuildDataBuilder, Plant};
    use crate::metrics::plant_leaves;
    use crate::phylo::PhyloEngine;
    use approx::assert_relative_eq;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn data() -> GuildData {
        GuildDataBuilder::new()
            .plant(Plant::new("oak", "Quercus robur"))
            .plant(Plant::new("birch", "Betula pendula"))
            .plant(Plant::new("clover", "Trifolium repens"))
            .fungi(
                "oak",
                FungalRecord {
                    emf: names(&["amanita", "boletus"]),
                    endophytic: names(&["phomopsis"]),
                    ..Default::default()
                },
            )
            .fungi(
                "birch",
                FungalRecord {
                    emf: names(&["amanita", "boletus", "leccinum"]),
                    endophytic: names(&["phomopsis"]),
                    ..Default::default()
                },
            )
            .fungi("clover", FungalRecord { amf: names(&["glomus"]), ..Default::default() })
            .build()
            .unwrap()
    }

    fn run(ids: &[&str]) -> M5Result {
        let data = data();
        let engine = PhyloEngine::build_identity("(oak:1,birch:1);").unwrap();
        let weights = MetricWeights::default();
        let leaves = plant_leaves(&data, &engine);
        let ctx = ScoringContext::new(&data, &engine, &weights, &leaves);
        calculate_m5(&ctx, &data.resolve(ids).unwrap())
    }

    #[test]
    fn test_category_weights() {
        let r = run(&["oak", "birch"]);
        // 2 shared EMF × 1.0 + 1 shared endophyte × 0.5
        assert_relative_eq!(r.raw, 2.5, epsilon = 1e-12);
        assert_eq!(r.shared_by_category, [0, 2, 1, 0]);
    }

    #[test]
    fn test_counts_and_coverage() {
        let r = run(&["oak", "birch", "clover"]);
        assert_relative_eq!(r.raw, 2.5, epsilon = 1e-12);
        assert_eq!(r.plants_with_beneficial, 3);
    }

    #[test]
    fn test_single_plant_neutral() {
        let r = run(&["oak"]);
        assert_eq!(r.raw, 0.0);
        assert_eq!(r.plants_with_beneficial, 1);
    }
}
