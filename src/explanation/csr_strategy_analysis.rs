//! CSR Strategy Profile Analysis for M2 (Growth Compatibility)
//!
//! Classifies each plant by its dominant Grime strategy and lists the pairs
//! whose strategies are far enough apart to compete badly.

use crate::data::{Csr, Guild, GuildData};
use crate::metrics::M2Result;
use serde::Serialize;

/// Share (%) a component needs to dominate a plant's strategy
const DOMINANT_SHARE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CsrStrategy {
    Competitor,
    StressTolerator,
    Ruderal,
    Mixed,
}

impl CsrStrategy {
    pub fn dominant(csr: &Csr) -> Self {
        if csr.c >= DOMINANT_SHARE {
            CsrStrategy::Competitor
        } else if csr.s >= DOMINANT_SHARE {
            CsrStrategy::StressTolerator
        } else if csr.r >= DOMINANT_SHARE {
            CsrStrategy::Ruderal
        } else {
            CsrStrategy::Mixed
        }
    }
}

/// Two plants far apart in CSR space
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsrConflict {
    pub plants: [String; 2],
    pub strategies: [CsrStrategy; 2],
    pub distance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CsrStrategyProfile {
    /// Plants with a valid CSR triple
    pub n_defined: usize,
    /// Plant pairs behind the mean distance
    pub n_pairs: usize,
    pub mean_distance: f64,
    pub max_distance: f64,
    /// Scientific names of the most distant pair
    pub most_distant_pair: Option<[String; 2]>,
    pub competitor_count: usize,
    pub stress_tolerator_count: usize,
    pub ruderal_count: usize,
    pub mixed_count: usize,
    /// Most distant pair first
    pub conflicts: Vec<CsrConflict>,
}

pub fn analyze_csr_strategies(
    data: &GuildData,
    guild: &Guild,
    m2: &M2Result,
    conflict_distance: f64,
    top_n: usize,
) -> CsrStrategyProfile {
    let defined: Vec<(&str, Csr, CsrStrategy)> = guild
        .members()
        .iter()
        .filter_map(|&p| {
            let plant = data.plant(p);
            plant.csr.map(|csr| (plant.scientific_name.as_str(), csr, CsrStrategy::dominant(&csr)))
        })
        .collect();

    let mut profile = CsrStrategyProfile {
        n_defined: m2.n_defined,
        n_pairs: m2.n_pairs,
        mean_distance: m2.raw,
        max_distance: m2.max_distance,
        most_distant_pair: m2.most_conflicting.map(|(a, b)| {
            [
                data.plant(a).scientific_name.clone(),
                data.plant(b).scientific_name.clone(),
            ]
        }),
        ..Default::default()
    };
    for (_, _, strategy) in &defined {
        match strategy {
            CsrStrategy::Competitor => profile.competitor_count += 1,
            CsrStrategy::StressTolerator => profile.stress_tolerator_count += 1,
            CsrStrategy::Ruderal => profile.ruderal_count += 1,
            CsrStrategy::Mixed => profile.mixed_count += 1,
        }
    }

    // Nothing reaches the threshold when the widest pair stays below it
    if m2.max_distance < conflict_distance {
        return profile;
    }

    for (i, a) in defined.iter().enumerate() {
        for b in &defined[i + 1..] {
            let distance = a.1.distance(&b.1);
            if distance >= conflict_distance {
                profile.conflicts.push(CsrConflict {
                    plants: [a.0.to_string(), b.0.to_string()],
                    strategies: [a.2, b.2],
                    distance,
                });
            }
        }
    }
    profile.conflicts.sort_by(|a, b| {
        b.distance
            .total_cmp(&a.distance)
            .then_with(|| a.plants.cmp(&b.plants))
    });
    profile.conflicts.truncate(top_n);
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GuildDataBuilder, Plant};
    use approx::assert_relative_eq;

    fn m2(raw: f64, max_distance: f64, n_defined: usize) -> M2Result {
        M2Result { raw, n_defined, n_pairs: 0, max_distance, most_conflicting: None }
    }

    fn data() -> GuildData {
        GuildDataBuilder::new()
            .plant(Plant::new("nettle", "Urtica dioica").with_csr(80.0, 10.0, 10.0))
            .plant(Plant::new("thyme", "Thymus vulgaris").with_csr(10.0, 80.0, 10.0))
            .plant(Plant::new("poppy", "Papaver rhoeas").with_csr(10.0, 10.0, 80.0))
            .plant(Plant::new("yarrow", "Achillea millefolium").with_csr(40.0, 30.0, 30.0))
            .plant(Plant::new("unknown", "No CSR"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_dominant_strategy() {
        assert_eq!(CsrStrategy::dominant(&Csr { c: 60.0, s: 20.0, r: 20.0 }), CsrStrategy::Competitor);
        assert_eq!(CsrStrategy::dominant(&Csr { c: 20.0, s: 20.0, r: 60.0 }), CsrStrategy::Ruderal);
        assert_eq!(CsrStrategy::dominant(&Csr { c: 34.0, s: 33.0, r: 33.0 }), CsrStrategy::Mixed);
    }

    #[test]
    fn test_conflicts_above_threshold() {
        let data = data();
        let guild = data.resolve(&["nettle", "thyme", "yarrow", "unknown"]).unwrap();
        // corner pair: √(70² + 70²) ≈ 98.99
        let profile = analyze_csr_strategies(&data, &guild, &m2(60.0, 98.99, 3), 70.0, 10);

        assert_eq!(profile.competitor_count, 1);
        assert_eq!(profile.stress_tolerator_count, 1);
        assert_eq!(profile.mixed_count, 1);
        assert_eq!(profile.conflicts.len(), 1);
        let conflict = &profile.conflicts[0];
        assert_eq!(conflict.plants, ["Urtica dioica".to_string(), "Thymus vulgaris".to_string()]);
        assert_eq!(conflict.strategies, [CsrStrategy::Competitor, CsrStrategy::StressTolerator]);
        assert_relative_eq!(conflict.distance, 70.0 * 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_compatible_guild_has_no_conflicts() {
        let data = data();
        let guild = data.resolve(&["yarrow", "nettle"]).unwrap();
        let profile = analyze_csr_strategies(&data, &guild, &m2(50.0, 50.0, 2), 70.0, 10);
        assert!(profile.conflicts.is_empty());
        assert_relative_eq!(profile.mean_distance, 50.0);
    }

    #[test]
    fn test_most_distant_pair_named() {
        let data = data();
        let guild = data.resolve(&["nettle", "poppy"]).unwrap();
        let summary = M2Result {
            raw: 98.99,
            n_defined: 2,
            n_pairs: 1,
            max_distance: 98.99,
            most_conflicting: Some((0, 2)),
        };
        let profile = analyze_csr_strategies(&data, &guild, &summary, 70.0, 10);
        assert_eq!(profile.n_pairs, 1);
        assert_eq!(
            profile.most_distant_pair,
            Some(["Urtica dioica".to_string(), "Papaver rhoeas".to_string()])
        );
        assert_eq!(profile.ruderal_count, 1);
        assert_eq!(profile.conflicts.len(), 1);
    }
}
