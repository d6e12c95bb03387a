//! METRIC 3: BENEFICIAL INSECT NETWORKS (BIOCONTROL)
//!
//! Scores natural pest control provided by predators and entomopathogenic
//! fungi. Uses pairwise analysis to identify protective relationships
//! between vulnerable plant A and protective plant B.
//!
//! Per ordered pair (A, B), A ≠ B, A with at least one herbivore:
//!   1. Specific predators: each herbivore of A whose known predators visit B
//!   2. Specific fungi: each herbivore of A whose known entomopathogenic
//!      fungi live on B
//!   3. General entomopathogenic fungi on B (non-specific signal)
//!
//! Weights come from `BiocontrolWeights` (defaults 1.0 / 1.0 / 0.2).

use super::ScoringContext;
use crate::data::Guild;
use crate::stores::Sym;

/// Result of M3 calculation
#[derive(Debug, Clone, Default)]
pub struct M3Result {
    /// Weighted sum over ordered pairs
    pub raw: f64,
    /// Number of (pair, herbivore) mechanisms detected
    pub n_mechanisms: usize,
    /// Count of specific predator matches (herbivore → known predator)
    pub specific_predator_matches: usize,
    /// Count of specific fungi matches (herbivore → known fungus)
    pub specific_fungi_matches: usize,
    /// Contribution of the general entomopathogenic fungi term
    pub general_fungi_score: f64,
    /// Matched (herbivore, predator) pairs, sorted and deduplicated
    pub matched_predator_pairs: Vec<(Sym, Sym)>,
    /// Matched (herbivore, fungus) pairs, sorted and deduplicated
    pub matched_fungi_pairs: Vec<(Sym, Sym)>,
}

/// Elements of sorted `candidates` present in sorted `hosted`
fn find_matches<'s>(candidates: &'s [Sym], hosted: &'s [Sym]) -> impl Iterator<Item = Sym> + 's {
    candidates.iter().copied().filter(move |c| hosted.binary_search(c).is_ok())
}

pub fn calculate_m3(ctx: &ScoringContext<'_>, guild: &Guild) -> M3Result {
    let w = &ctx.weights.biocontrol;
    let lookups = &ctx.data.lookups;
    let mut result = M3Result::default();

    for (a, b) in guild.ordered_pairs() {
        let herbivores_a = &ctx.data.associations.get(a).herbivores;
        if herbivores_a.is_empty() {
            continue;
        }
        let predators_b = &ctx.data.associations.get(b).predators;
        let entomo_b = &ctx.data.fungi.get(b).entomopathogenic;

        // MECHANISM 1: Specific animal predators
        for &herbivore in herbivores_a.iter() {
            let mut n = 0;
            for pred in find_matches(lookups.predators_of(herbivore), predators_b) {
                result.matched_predator_pairs.push((herbivore, pred));
                n += 1;
            }
            if n > 0 {
                result.raw += n as f64 * w.specific_predator;
                result.n_mechanisms += 1;
                result.specific_predator_matches += 1;
            }
        }

        if entomo_b.is_empty() {
            continue;
        }

        // MECHANISM 2: Specific entomopathogenic fungi
        for &herbivore in herbivores_a.iter() {
            let mut n = 0;
            for fungus in find_matches(lookups.entomopathogens_of(herbivore), entomo_b) {
                result.matched_fungi_pairs.push((herbivore, fungus));
                n += 1;
            }
            if n > 0 {
                result.raw += n as f64 * w.specific_entomopathogen;
                result.n_mechanisms += 1;
                result.specific_fungi_matches += 1;
            }
        }

        // MECHANISM 3: General entomopathogenic fungi
        let general = entomo_b.len() as f64 * w.generic_entomopathogen;
        result.raw += general;
        result.general_fungi_score += general;
    }

    result.matched_predator_pairs.sort_unstable();
    result.matched_predator_pairs.dedup();
    result.matched_fungi_pairs.sort_unstable();
    result.matched_fungi_pairs.dedup();

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetricWeights;
    use crate::data::{AssociationRecord, FungalRecord, GuildData, GuildDataBuilder, Plant};
    use crate::metrics::plant_leaves;
    use crate::phylo::PhyloEngine;
    use approx::assert_relative_eq;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn data() -> GuildData {
        GuildDataBuilder::new()
            .plant(Plant::new("rose", "Rosa canina"))
            .plant(Plant::new("fennel", "Foeniculum vulgare"))
            .plant(Plant::new("bare", "No records"))
            .associations(
                "rose",
                AssociationRecord { herbivores: names(&["aphid", "sawfly"]), ..Default::default() },
            )
            .associations(
                "fennel",
                AssociationRecord {
                    predators: names(&["ladybird", "hoverfly", "random_spider"]),
                    ..Default::default()
                },
            )
            .fungi(
                "fennel",
                FungalRecord { entomopathogenic: names(&["beauveria", "metarhizium"]), ..Default::default() },
            )
            .herbivore_predator("aphid", "ladybird")
            .herbivore_predator("aphid", "hoverfly")
            .herbivore_predator("sawfly", "wasp")
            .insect_parasite("aphid", "beauveria")
            .build()
            .unwrap()
    }

    fn run(ids: &[&str]) -> M3Result {
        let data = data();
        let engine = PhyloEngine::build_identity("(rose:1,fennel:1);").unwrap();
        let weights = MetricWeights::default();
        let leaves = plant_leaves(&data, &engine);
        let ctx = ScoringContext::new(&data, &engine, &weights, &leaves);
        calculate_m3(&ctx, &data.resolve(ids).unwrap())
    }

    #[test]
    fn test_pairwise_mechanisms() {
        let r = run(&["rose", "fennel"]);
        // 2 predator matches + 1 fungus match + 0.2 × 2 general fungi
        assert_relative_eq!(r.raw, 2.0 + 1.0 + 0.4, epsilon = 1e-12);
        assert_eq!(r.specific_predator_matches, 1);
        assert_eq!(r.specific_fungi_matches, 1);
        assert_eq!(r.n_mechanisms, 2);
        assert_eq!(r.matched_predator_pairs.len(), 2);
        assert_relative_eq!(r.general_fungi_score, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_no_herbivores_no_score() {
        let r = run(&["fennel", "bare"]);
        assert_eq!(r.raw, 0.0);
    }

    #[test]
    fn test_single_plant_neutral() {
        assert_eq!(run(&["rose"]).raw, 0.0);
    }
}
