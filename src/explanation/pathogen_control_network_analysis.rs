//! Pathogen Control Network Analysis for M4
//!
//! Mycoparasites and fungivores ranked by guild connectivity, plus the
//! pathogen → antagonist matches that drove the specific M4 term.

use crate::data::{Guild, GuildData};
use crate::explanation::biocontrol_network_analysis::named_pairs;
use crate::explanation::types::MatchedPair;
use crate::metrics::M4Result;
use crate::utils::{count_shared_organisms, top_organisms, OrganismCount};
use serde::Serialize;
use smallvec::smallvec;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathogenControlNetworkProfile {
    pub top_mycoparasites: Vec<OrganismCount>,
    pub top_fungivores: Vec<OrganismCount>,
    /// (pathogen, antagonist) matches behind M4
    pub matched_pairs: Vec<MatchedPair>,
    pub specific_antagonist_matches: usize,
    pub n_mechanisms: usize,
}

pub fn analyze_pathogen_control_network(
    data: &GuildData,
    guild: &Guild,
    m4: &M4Result,
    top_n: usize,
) -> PathogenControlNetworkProfile {
    let mycoparasite_counts =
        count_shared_organisms(guild, |p| smallvec![&data.fungi.get(p).mycoparasitic[..]]);
    let fungivore_counts =
        count_shared_organisms(guild, |p| smallvec![&data.associations.get(p).fungivores[..]]);

    PathogenControlNetworkProfile {
        top_mycoparasites: top_organisms(&mycoparasite_counts, &data.names, 1, top_n),
        top_fungivores: top_organisms(&fungivore_counts, &data.names, 1, top_n),
        matched_pairs: named_pairs(data, m4.matched_antagonist_pairs.iter()),
        specific_antagonist_matches: m4.specific_antagonist_matches,
        n_mechanisms: m4.n_mechanisms,
    }
}
