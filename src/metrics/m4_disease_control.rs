//! METRIC 4: DISEASE SUPPRESSION (FUNGAL & ANIMAL BIOCONTROL)
//!
//! Scores disease control provided by mycoparasitic fungi and fungivorous
//! animals. Uses pairwise analysis to identify protective relationships
//! between vulnerable (disease-prone) and protective (biocontrol-hosting)
//! plants.
//!
//! Per ordered pair (A, B), A ≠ B, where A carries at least one pathogen
//! (association `pathogens` ∪ fungal `pathogenic`):
//!   1. Specific antagonists: each pathogen of A with known antagonists
//!      hosted as mycoparasites on B
//!   2. General mycoparasites on B
//!   3. General fungivores visiting B

use super::ScoringContext;
use crate::data::Guild;
use crate::stores::{union, Sym};

/// Result of M4 calculation
#[derive(Debug, Clone, Default)]
pub struct M4Result {
    /// Weighted sum over ordered pairs
    pub raw: f64,
    /// Number of mechanisms detected
    pub n_mechanisms: usize,
    /// Count of specific antagonist matches (pathogen → known mycoparasite)
    pub specific_antagonist_matches: usize,
    /// Matched (pathogen, antagonist) pairs, sorted and deduplicated
    pub matched_antagonist_pairs: Vec<(Sym, Sym)>,
}

pub fn calculate_m4(ctx: &ScoringContext<'_>, guild: &Guild) -> M4Result {
    let w = &ctx.weights.disease;
    let lookups = &ctx.data.lookups;
    let mut result = M4Result::default();

    // Pathogen sets per member, merged once
    let pathogens: Vec<_> = guild
        .members()
        .iter()
        .map(|&p| union(&ctx.data.associations.get(p).pathogens, &ctx.data.fungi.get(p).pathogenic))
        .collect();
    let slot = |plant: usize| guild.members().binary_search(&plant).ok();

    for (a, b) in guild.ordered_pairs() {
        let Some(pathogens_a) = slot(a).map(|i| &pathogens[i]) else {
            continue;
        };
        if pathogens_a.is_empty() {
            continue;
        }
        let mycoparasites_b = &ctx.data.fungi.get(b).mycoparasitic;
        let fungivores_b = &ctx.data.associations.get(b).fungivores;

        if !mycoparasites_b.is_empty() {
            // MECHANISM 1: Specific antagonists
            for &pathogen in pathogens_a.iter() {
                let mut n = 0;
                for &antagonist in lookups.antagonists_of(pathogen) {
                    if mycoparasites_b.binary_search(&antagonist).is_ok() {
                        result.matched_antagonist_pairs.push((pathogen, antagonist));
                        n += 1;
                    }
                }
                if n > 0 {
                    result.raw += n as f64 * w.specific_antagonist;
                    result.n_mechanisms += 1;
                    result.specific_antagonist_matches += 1;
                }
            }

            // MECHANISM 2: General mycoparasites
            result.raw += mycoparasites_b.len() as f64 * w.generic_mycoparasite;
            result.n_mechanisms += 1;
        }

        // MECHANISM 3: General fungivores
        if !fungivores_b.is_empty() {
            result.raw += fungivores_b.len() as f64 * w.generic_fungivore;
            result.n_mechanisms += 1;
        }
    }

    result.matched_antagonist_pairs.sort_unstable();
    result.matched_antagonist_pairs.dedup();

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

    const PATHOGENS: [&str; 5] = ["rust", "mildew", "blight", "wilt", "scab"];

    fn data(shared_pathogens: bool) -> GuildData {
        let pathogens = if shared_pathogens { names(&PATHOGENS) } else { Vec::new() };
        GuildDataBuilder::new()
            .plant(Plant::new("a", "Host A"))
            .plant(Plant::new("b", "Host B"))
            .fungi("a", FungalRecord { pathogenic: pathogens.clone(), ..Default::default() })
            .fungi(
                "b",
                FungalRecord {
                    pathogenic: pathogens,
                    mycoparasitic: names(&["trichoderma", "ampelomyces"]),
                    ..Default::default()
                },
            )
            .pathogen_antagonist("rust", "trichoderma")
            .pathogen_antagonist("mildew", "ampelomyces")
            .build()
            .unwrap()
    }

    fn run(data: &GuildData, ids: &[&str]) -> M4Result {
        let engine = PhyloEngine::build_identity("(a:1,b:1);").unwrap();
        let weights = MetricWeights::default();
        let leaves = plant_leaves(data, &engine);
        let ctx = ScoringContext::new(data, &engine, &weights, &leaves);
        calculate_m4(&ctx, &data.resolve(ids).unwrap())
    }

    #[test]
    fn test_specific_antagonists_on_partner() {
        let data = data(true);
        let r = run(&data, &["a", "b"]);
        // A→B: 2 specific matches + 2 generic mycoparasites; B→A: A hosts none
        assert_relative_eq!(r.raw, 2.0 * 1.0 + 2.0 * 1.0, epsilon = 1e-12);
        assert_eq!(r.specific_antagonist_matches, 2);
        assert_eq!(r.matched_antagonist_pairs.len(), 2);
    }

    #[test]
    fn test_no_pathogens_scores_lower() {
        let with = run(&data(true), &["a", "b"]);
        let without = run(&data(false), &["a", "b"]);
        assert!(with.raw > without.raw);
        assert_eq!(without.raw, 0.0);
    }

    #[test]
    fn test_fungivores_generic_weight() {
        let data = GuildDataBuilder::new()
            .plant(Plant::new("a", "Host"))
            .plant(Plant::new("b", "Fungivore magnet"))
            .associations("a", AssociationRecord { pathogens: names(&["blight"]), ..Default::default() })
            .associations(
                "b",
                AssociationRecord { fungivores: names(&["springtail", "mite"]), ..Default::default() },
            )
            .build()
            .unwrap();
        let r = run(&data, &["a", "b"]);
        assert_relative_eq!(r.raw, 0.4, epsilon = 1e-12);
        assert_eq!(r.n_mechanisms, 1);
    }

    #[test]
    fn test_single_plant_neutral() {
        assert_eq!(run(&data(true), &["b"]).raw, 0.0);
    }
}
