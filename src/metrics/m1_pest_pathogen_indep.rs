//! M1: Pest & Pathogen Independence
//!
//! Scores phylogenetic diversity using Faith's PD as a proxy for pest/pathogen
//! risk reduction. Higher diversity (more evolutionary distance) = lower risk.
//!
//! Ecological Rationale:
//! - Host specificity: Most pests are genus/family-specific
//! - Dilution effect: Non-host plants reduce pest transmission
//! - Associational resistance: Non-hosts interfere with pest foraging
//!
//! raw = exp(-k × PD). Clustered guilds get a high raw risk, which the
//! scorer inverts for display.

use super::ScoringContext;
use crate::config::PdAnchor;
use crate::data::Guild;
use crate::error::{GuildError, GuildResult};
use smallvec::SmallVec;

/// Result of M1 calculation
#[derive(Debug, Clone, PartialEq)]
pub struct M1Result {
    /// Pest risk: exp(-k × PD)
    pub raw: f64,
    pub faiths_pd: f64,
    /// Guild plants found on the tree
    pub matched: usize,
    /// Guild plants missing from the tree (excluded from PD)
    pub unmatched: usize,
}

/// Calculate M1
///
/// Plants without a tree leaf are excluded and counted. If none of the guild
/// is on the tree, PD is undefined and `InsufficientTaxa` is returned.
pub fn calculate_m1(ctx: &ScoringContext<'_>, guild: &Guild) -> GuildResult<M1Result> {
    let mut leaves: SmallVec<[u32; 16]> = SmallVec::new();
    let mut unmatched = 0;
    for &plant in guild.members() {
        match ctx.leaf(plant) {
            Some(leaf) => leaves.push(leaf),
            None => unmatched += 1,
        }
    }

    if leaves.is_empty() {
        return Err(GuildError::InsufficientTaxa { requested: guild.len(), unmatched });
    }

    let faiths_pd = match ctx.weights.m1_pd_anchor {
        PdAnchor::Root => ctx.phylo.pd_of_leaves(&leaves),
        PdAnchor::Mrca => ctx.phylo.mrca_pd_of_leaves(&leaves),
    };
    let raw = (-ctx.weights.m1_decay_k * faiths_pd).exp();

    Ok(M1Result { raw, faiths_pd, matched: leaves.len(), unmatched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricWeights;
    use crate::data::{GuildDataBuilder, Plant};
    use crate::metrics::plant_leaves;
    use crate::phylo::PhyloEngine;
    use approx::assert_relative_eq;

    fn setup() -> (crate::data::GuildData, PhyloEngine) {
        let data = GuildDataBuilder::new()
            .plant(Plant::new("a", "A"))
            .plant(Plant::new("b", "B"))
            .plant(Plant::new("c", "C"))
            .plant(Plant::new("x", "Off tree"))
            .build()
            .unwrap();
        let engine = PhyloEngine::build_identity("((a:0.1,b:0.1):1,c:1.1);").unwrap();
        (data, engine)
    }

    #[test]
    fn test_exp_transform() {
        let (data, engine) = setup();
        let weights = MetricWeights::default();
        let leaves = plant_leaves(&data, &engine);
        let ctx = ScoringContext::new(&data, &engine, &weights, &leaves);

        let guild = data.resolve(&["a", "c"]).unwrap();
        let r = calculate_m1(&ctx, &guild).unwrap();
        assert_relative_eq!(r.faiths_pd, 2.2, epsilon = 1e-12);
        assert_relative_eq!(r.raw, (-3.0f64 * 2.2).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_close_relatives_carry_more_risk() {
        let (data, engine) = setup();
        let weights = MetricWeights::default();
        let leaves = plant_leaves(&data, &engine);
        let ctx = ScoringContext::new(&data, &engine, &weights, &leaves);

        let close = calculate_m1(&ctx, &data.resolve(&["a", "b"]).unwrap()).unwrap();
        let far = calculate_m1(&ctx, &data.resolve(&["a", "c"]).unwrap()).unwrap();
        assert!(close.raw > far.raw);
    }

    #[test]
    fn test_mrca_anchor() {
        let (data, engine) = setup();
        let weights = MetricWeights { m1_pd_anchor: PdAnchor::Mrca, ..MetricWeights::default() };
        let leaves = plant_leaves(&data, &engine);
        let ctx = ScoringContext::new(&data, &engine, &weights, &leaves);

        let r = calculate_m1(&ctx, &data.resolve(&["a", "b"]).unwrap()).unwrap();
        assert_relative_eq!(r.faiths_pd, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_unmatched_plants() {
        let (data, engine) = setup();
        let weights = MetricWeights::default();
        let leaves = plant_leaves(&data, &engine);
        let ctx = ScoringContext::new(&data, &engine, &weights, &leaves);

        let r = calculate_m1(&ctx, &data.resolve(&["a", "x"]).unwrap()).unwrap();
        assert_eq!(r.matched, 1);
        assert_eq!(r.unmatched, 1);
        assert_relative_eq!(r.faiths_pd, 1.1, epsilon = 1e-12);

        let err = calculate_m1(&ctx, &data.resolve(&["x"]).unwrap()).unwrap_err();
        assert_eq!(err, GuildError::InsufficientTaxa { requested: 1, unmatched: 1 });
    }
}
