//! Beneficial fungi network analysis for M5
//!
//! Mycorrhizal, endophytic and saprotrophic fungi shared across the guild.

use crate::data::{Guild, GuildData};
use crate::metrics::M5Result;
use crate::stores::FungalCategory;
use crate::utils::{count_shared_organisms, top_organisms, OrganismCount};
use serde::Serialize;
use smallvec::SmallVec;

/// Shared fungi per beneficial category, summed over plant pairs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SharedFungiByCategory {
    pub amf: usize,
    pub emf: usize,
    pub endophytic: usize,
    pub saprotrophic: usize,
}

impl From<[usize; 4]> for SharedFungiByCategory {
    fn from([amf, emf, endophytic, saprotrophic]: [usize; 4]) -> Self {
        Self { amf, emf, endophytic, saprotrophic }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FungiNetworkProfile {
    /// Beneficial fungi on at least two guild plants, most connected first
    pub top_beneficial_fungi: Vec<OrganismCount>,
    pub shared_by_category: SharedFungiByCategory,
    /// Plants with any beneficial fungus
    pub plants_with_beneficial: usize,
}

pub fn analyze_fungi_network(data: &GuildData, guild: &Guild, m5: &M5Result, top_n: usize) -> FungiNetworkProfile {
    let counts = count_shared_organisms(guild, |p| {
        let f = data.fungi.get(p);
        FungalCategory::BENEFICIAL.iter().map(|&c| f.category(c)).collect::<SmallVec<_>>()
    });
    FungiNetworkProfile {
        top_beneficial_fungi: top_organisms(&counts, &data.names, 2, top_n),
        shared_by_category: m5.shared_by_category.into(),
        plants_with_beneficial: m5.plants_with_beneficial,
    }
}
