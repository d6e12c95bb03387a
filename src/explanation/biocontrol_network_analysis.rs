//! Biocontrol Network Analysis for M3 (Insect Pest Control)
//!
//! Identifies generalist biocontrol agents and the hub plants that attract
//! the most of them. Agent counts are limited to predators and fungi that
//! the lookup tables know to attack some herbivore.

use crate::data::{Guild, GuildData};
use crate::explanation::types::{MatchedPair, PlantBiocontrolHub};
use crate::metrics::M3Result;
use crate::stores::Sym;
use crate::utils::{count_shared_organisms, top_organisms, OrganismCount};
use serde::Serialize;
use smallvec::smallvec;

/// Biocontrol part of the network summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BiocontrolNetworkProfile {
    pub top_predators: Vec<OrganismCount>,
    pub top_entomo_fungi: Vec<OrganismCount>,
    pub hub_plants: Vec<PlantBiocontrolHub>,
    /// (herbivore, predator or entomopathogenic fungus) matches behind M3
    pub matched_pairs: Vec<MatchedPair>,
    pub specific_predator_matches: usize,
    pub specific_fungi_matches: usize,
    /// Herbivores on one plant controlled by agents on another, over all pairs
    pub n_mechanisms: usize,
    /// M3 share from non-specific entomopathogenic fungi
    pub general_fungi_score: f64,
}

pub fn analyze_biocontrol_network(
    data: &GuildData,
    guild: &Guild,
    m3: &M3Result,
    top_n: usize,
) -> BiocontrolNetworkProfile {
    let lookups = &data.lookups;

    let mut predator_counts =
        count_shared_organisms(guild, |p| smallvec![&data.associations.get(p).predators[..]]);
    predator_counts.retain(|&sym, _| lookups.is_known_predator(sym));
    let mut entomo_fungi_counts =
        count_shared_organisms(guild, |p| smallvec![&data.fungi.get(p).entomopathogenic[..]]);
    entomo_fungi_counts.retain(|&sym, _| lookups.is_known_entomopathogen(sym));

    BiocontrolNetworkProfile {
        top_predators: top_organisms(&predator_counts, &data.names, 1, top_n),
        top_entomo_fungi: top_organisms(&entomo_fungi_counts, &data.names, 1, top_n),
        hub_plants: find_biocontrol_hubs(data, guild, top_n),
        matched_pairs: named_pairs(
            data,
            m3.matched_predator_pairs.iter().chain(&m3.matched_fungi_pairs),
        ),
        specific_predator_matches: m3.specific_predator_matches,
        specific_fungi_matches: m3.specific_fungi_matches,
        n_mechanisms: m3.n_mechanisms,
        general_fungi_score: m3.general_fungi_score,
    }
}

/// Plants with at least one known agent, most agents first
fn find_biocontrol_hubs(data: &GuildData, guild: &Guild, top_n: usize) -> Vec<PlantBiocontrolHub> {
    let lookups = &data.lookups;
    let mut hubs: Vec<PlantBiocontrolHub> = guild
        .members()
        .iter()
        .filter_map(|&plant| {
            let total_predators = data
                .associations
                .get(plant)
                .predators
                .iter()
                .filter(|&&s| lookups.is_known_predator(s))
                .count();
            let total_entomo_fungi = data
                .fungi
                .get(plant)
                .entomopathogenic
                .iter()
                .filter(|&&s| lookups.is_known_entomopathogen(s))
                .count();
            if total_predators + total_entomo_fungi == 0 {
                return None;
            }
            let p = data.plant(plant);
            Some(PlantBiocontrolHub {
                taxon_id: p.taxon_id.clone(),
                plant_name: p.scientific_name.clone(),
                total_predators,
                total_entomo_fungi,
                total_biocontrol_agents: total_predators + total_entomo_fungi,
            })
        })
        .collect();

    // Sort by total_biocontrol_agents descending, then plant_name ascending
    hubs.sort_by(|a, b| {
        b.total_biocontrol_agents
            .cmp(&a.total_biocontrol_agents)
            .then_with(|| a.plant_name.cmp(&b.plant_name))
    });
    hubs.truncate(top_n);
    hubs
}

/// Resolve symbol pairs to names, sorted by (target, agent)
pub(crate) fn named_pairs<'p>(data: &GuildData, pairs: impl Iterator<Item = &'p (Sym, Sym)>) -> Vec<MatchedPair> {
    let mut named: Vec<MatchedPair> = pairs
        .map(|&(target, agent)| MatchedPair {
            target: data.name(target).to_string(),
            agent: data.name(agent).to_string(),
        })
        .collect();
    named.sort_by(|a, b| a.target.cmp(&b.target).then_with(|| a.agent.cmp(&b.agent)));
    named.dedup();
    named
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AssociationRecord, FungalRecord, GuildDataBuilder, Plant};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn data() -> GuildData {
        GuildDataBuilder::new()
            .plant(Plant::new("a", "Achillea millefolium"))
            .plant(Plant::new("b", "Anethum graveolens"))
            .plant(Plant::new("c", "Carex pendula"))
            .plant(Plant::new("d", "Daucus carota"))
            .associations(
                "a",
                AssociationRecord { predators: names(&["ladybird", "lacewing"]), ..Default::default() },
            )
            .associations(
                "b",
                AssociationRecord {
                    predators: names(&["ladybird", "lacewing", "hoverfly", "random_spider"]),
                    ..Default::default()
                },
            )
            .associations("d", AssociationRecord { predators: names(&["ladybird"]), ..Default::default() })
            .fungi(
                "a",
                FungalRecord { entomopathogenic: names(&["beauveria", "metarhizium"]), ..Default::default() },
            )
            .herbivore_predator("aphid", "ladybird")
            .herbivore_predator("aphid", "lacewing")
            .herbivore_predator("aphid", "hoverfly")
            .insect_parasite("aphid", "beauveria")
            .build()
            .unwrap()
    }

    #[test]
    fn test_hub_ranking() {
        let data = data();
        let guild = data.resolve(&["a", "b", "c", "d"]).unwrap();
        let profile = analyze_biocontrol_network(&data, &guild, &M3Result::default(), 2);

        let names: Vec<&str> = profile.hub_plants.iter().map(|h| h.plant_name.as_str()).collect();
        // a: 2 predators + 1 known fungus, b: 3 known predators; tie broken by name
        assert_eq!(names, vec!["Achillea millefolium", "Anethum graveolens"]);
        assert_eq!(profile.hub_plants[0].total_biocontrol_agents, 3);
        assert_eq!(profile.hub_plants[0].total_entomo_fungi, 1);
    }

    #[test]
    fn test_unknown_agents_filtered_from_counts() {
        let data = data();
        let guild = data.resolve(&["a", "b", "c", "d"]).unwrap();
        let profile = analyze_biocontrol_network(&data, &guild, &M3Result::default(), 10);

        // random_spider is not in any lookup table
        let predators: Vec<(&str, usize)> =
            profile.top_predators.iter().map(|o| (o.name.as_str(), o.plant_count)).collect();
        assert_eq!(predators, vec![("ladybird", 3), ("lacewing", 2), ("hoverfly", 1)]);
        // metarhizium is not a known parasite of any herbivore
        assert_eq!(profile.top_entomo_fungi.len(), 1);
    }

    #[test]
    fn test_matched_pairs_named_and_sorted() {
        let mut data = data();
        let guild = data.resolve(&["a", "b"]).unwrap();
        let aphid = data.names.intern("aphid");
        let ladybird = data.names.intern("ladybird");
        let beauveria = data.names.intern("beauveria");

        let m3 = M3Result {
            matched_predator_pairs: vec![(aphid, ladybird)],
            matched_fungi_pairs: vec![(aphid, beauveria)],
            specific_predator_matches: 1,
            specific_fungi_matches: 1,
            n_mechanisms: 2,
            general_fungi_score: 0.5,
            ..Default::default()
        };
        let profile = analyze_biocontrol_network(&data, &guild, &m3, 10);
        assert_eq!(
            profile.matched_pairs,
            vec![
                MatchedPair { target: "aphid".into(), agent: "beauveria".into() },
                MatchedPair { target: "aphid".into(), agent: "ladybird".into() },
            ]
        );
        assert_eq!(profile.n_mechanisms, 2);
        assert_eq!(profile.general_fungi_score, 0.5);
    }
}
