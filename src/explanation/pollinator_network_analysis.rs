//! Pollinator Network Analysis
//!
//! Shared pollinators ranked by how many guild plants they visit.

use crate::data::{Guild, GuildData};
use crate::metrics::M7Result;
use crate::utils::{count_shared_organisms, top_organisms, OrganismCount};
use serde::Serialize;
use smallvec::smallvec;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollinatorNetworkProfile {
    /// Pollinators on at least two guild plants, most connected first
    pub top_shared_pollinators: Vec<OrganismCount>,
    /// Plants with at least one documented pollinator
    pub plants_with_pollinators: usize,
    /// Shared pollinators summed over plant pairs
    pub shared_pollinator_links: usize,
    /// Shared flower visitors summed over plant pairs
    pub shared_visitor_links: usize,
}

pub fn analyze_pollinator_network(
    data: &GuildData,
    guild: &Guild,
    m7: &M7Result,
    top_n: usize,
) -> PollinatorNetworkProfile {
    let counts = count_shared_organisms(guild, |p| smallvec![&data.associations.get(p).pollinators[..]]);
    PollinatorNetworkProfile {
        top_shared_pollinators: top_organisms(&counts, &data.names, 2, top_n),
        plants_with_pollinators: m7.plants_with_pollinators,
        shared_pollinator_links: m7.shared_pollinators,
        shared_visitor_links: m7.shared_visitors,
    }
}
