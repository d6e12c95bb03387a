//! Pest and pathogen pressure profile
//!
//! Herbivores and pathogens that several guild plants share, and the plants
//! carrying the most of them. Shared enemies are what M1 penalises through
//! phylogenetic closeness; this lists them by name.

use crate::data::{Guild, GuildData};
use crate::stores::union;
use crate::utils::{count_shared_organisms, top_organisms, OrganismCount};
use serde::Serialize;
use smallvec::smallvec;

/// Plant with its pest and pathogen load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VulnerablePlant {
    pub taxon_id: String,
    pub plant_name: String,
    pub pest_count: usize,
    pub pathogen_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PestProfile {
    pub total_unique_pests: usize,
    pub total_unique_pathogens: usize,
    /// Herbivores on two or more guild plants
    pub shared_pests: Vec<OrganismCount>,
    /// Pathogens (animal records and pathogenic fungi) on two or more plants
    pub shared_pathogens: Vec<OrganismCount>,
    /// Plants with any known pest or pathogen, heaviest load first
    pub vulnerable_plants: Vec<VulnerablePlant>,
}

pub fn analyze_guild_pests(data: &GuildData, guild: &Guild, top_n: usize) -> PestProfile {
    let pest_counts = count_shared_organisms(guild, |p| smallvec![&data.associations.get(p).herbivores[..]]);
    let pathogen_counts = count_shared_organisms(guild, |p| {
        smallvec![&data.associations.get(p).pathogens[..], &data.fungi.get(p).pathogenic[..]]
    });

    let mut vulnerable_plants: Vec<VulnerablePlant> = guild
        .members()
        .iter()
        .map(|&p| {
            let plant = data.plant(p);
            VulnerablePlant {
                taxon_id: plant.taxon_id.clone(),
                plant_name: plant.scientific_name.clone(),
                pest_count: data.associations.get(p).herbivores.len(),
                pathogen_count: union(&data.associations.get(p).pathogens, &data.fungi.get(p).pathogenic).len(),
            }
        })
        .filter(|v| v.pest_count + v.pathogen_count > 0)
        .collect();
    vulnerable_plants.sort_by(|a, b| {
        (b.pest_count + b.pathogen_count)
            .cmp(&(a.pest_count + a.pathogen_count))
            .then_with(|| a.plant_name.cmp(&b.plant_name))
    });
    vulnerable_plants.truncate(top_n);

    PestProfile {
        total_unique_pests: pest_counts.len(),
        total_unique_pathogens: pathogen_counts.len(),
        shared_pests: top_organisms(&pest_counts, &data.names, 2, top_n),
        shared_pathogens: top_organisms(&pathogen_counts, &data.names, 2, top_n),
        vulnerable_plants,
    }
}
