//! Shared Organism Counter Utility
//!
//! Counts how many plants in a guild share each organism (pollinator, fungus,
//! predator, ...). Used by M5 and M7 and by the network summaries.

use crate::data::Guild;
use crate::stores::{NameInterner, Sym};
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

/// Count organisms shared across plants in a guild
///
/// `columns` returns the symbol sets to aggregate for one plant (e.g.
/// pollinators + flower visitors); an organism in several of a plant's sets
/// is counted once for that plant.
///
/// Returns a map of organism → plant_count
pub fn count_shared_organisms<'d, F>(guild: &Guild, columns: F) -> FxHashMap<Sym, usize>
where
    F: Fn(usize) -> SmallVec<[&'d [Sym]; 4]>,
{
    let mut counts: FxHashMap<Sym, usize> = FxHashMap::default();

    for &plant in guild.members() {
        // Most plants have < 16 organisms per role
        let mut plant_organisms: SmallVec<[Sym; 16]> = SmallVec::new();
        for set in columns(plant) {
            plant_organisms.extend_from_slice(set);
        }
        plant_organisms.sort_unstable();
        plant_organisms.dedup();

        for org in plant_organisms {
            *counts.entry(org).or_insert(0) += 1;
        }
    }

    counts
}

/// Named organism with the number of guild plants it connects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganismCount {
    pub name: String,
    pub plant_count: usize,
}

/// Rank counts by plant count desc, then name asc; keep `min_plants` and up
pub fn top_organisms(
    counts: &FxHashMap<Sym, usize>,
    names: &NameInterner,
    min_plants: usize,
    top_n: usize,
) -> Vec<OrganismCount> {
    let mut ranked: Vec<OrganismCount> = counts
        .iter()
        .filter(|(_, &n)| n >= min_plants)
        .map(|(&sym, &n)| OrganismCount { name: names.name(sym).to_string(), plant_count: n })
        .collect();
    ranked.sort_by(|a, b| b.plant_count.cmp(&a.plant_count).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(top_n);
    ranked
}
