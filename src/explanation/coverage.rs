//! Climate and phylogenetic coverage flags

use crate::data::Plant;
use crate::error::GuildResult;
use crate::explanation::types::{FlagKind, Severity, WarningCard};
use crate::metrics::M1Result;

/// No Köppen tier shared by every plant
pub fn climate_incompatible(plants: &[&Plant]) -> WarningCard {
    let per_plant: Vec<String> = plants
        .iter()
        .map(|p| {
            let tiers: Vec<String> = p.tiers.iter().map(|t| t.to_string()).collect();
            if tiers.is_empty() {
                format!("{}: no tier", p.scientific_name)
            } else {
                format!("{}: {}", p.scientific_name, tiers.join("/"))
            }
        })
        .collect();

    WarningCard {
        kind: FlagKind::ClimateIncompatible,
        severity: Severity::High,
        message: "Plants share no climate tier".to_string(),
        detail: per_plant.join("; "),
        advice: "Choose plants that grow in a common climate".to_string(),
    }
}

/// Guild plants missing from the phylogeny
///
/// Covers both partial coverage (PD over the matched plants only) and no
/// coverage at all (M1 undefined).
pub fn check_unmatched_taxa(m1: &GuildResult<M1Result>, guild_size: usize) -> Option<WarningCard> {
    match m1 {
        Ok(r) if r.unmatched == 0 => None,
        Ok(r) => Some(WarningCard {
            kind: FlagKind::UnmatchedTaxa,
            severity: Severity::Low,
            message: format!("{} of {} plants are not on the phylogeny", r.unmatched, guild_size),
            detail: format!("Phylogenetic diversity uses the {} matched plants only", r.matched),
            advice: "Pest independence may be overestimated for close relatives".to_string(),
        }),
        Err(_) => Some(WarningCard {
            kind: FlagKind::UnmatchedTaxa,
            severity: Severity::High,
            message: "No guild plant is on the phylogeny".to_string(),
            detail: "Phylogenetic diversity is undefined".to_string(),
            advice: "Pest independence is left out of the overall score".to_string(),
        }),
    }
}
