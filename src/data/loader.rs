//! Polars ingestion of the upstream tables
//!
//! Reads the plant table, organism and fungal profiles and the three
//! cross-reference tables, and hands the rows to `GuildDataBuilder`.

use super::{AssociationRecord, ClimateTier, FungalRecord, GuildData, GuildDataBuilder, LightPreference, Plant};
use crate::config::DataPaths;
use crate::utils::lazy_helpers::{
    bool_values, f64_values, materialize_with_columns, scan_table, str_values, string_lists,
};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

const PLANT_ID: &str = "wfo_taxon_id";
const PROFILE_ID: &str = "plant_wfo_id";

impl GuildData {
    /// Load every table named in `paths`
    pub fn load(paths: &DataPaths) -> Result<Self> {
        info!("Loading guild scoring datasets");
        let plants = load_plants(&paths.plants)?;
        let associations = load_associations(&paths.organisms)?;
        let fungi = load_fungi(&paths.fungi)?;
        let herbivore_predators = load_pairs(&paths.herbivore_predators, "herbivore", "predators")?;
        let insect_parasites = load_pairs(&paths.insect_parasites, "herbivore", "entomopathogenic_fungi")?;
        let pathogen_antagonists = load_pairs(&paths.pathogen_antagonists, "pathogen", "antagonists")?;

        info!(
            plants = plants.len(),
            organism_rows = associations.len(),
            fungal_rows = fungi.len(),
            herbivore_predators = herbivore_predators.len(),
            insect_parasites = insect_parasites.len(),
            pathogen_antagonists = pathogen_antagonists.len(),
            "tables read"
        );

        let mut builder = GuildDataBuilder::new();
        for plant in plants {
            builder = builder.plant(plant);
        }
        for (id, record) in associations {
            builder = builder.associations(id, record);
        }
        for (id, record) in fungi {
            builder = builder.fungi(id, record);
        }
        for (h, p) in herbivore_predators {
            builder = builder.herbivore_predator(h, p);
        }
        for (i, f) in insect_parasites {
            builder = builder.insect_parasite(i, f);
        }
        for (p, a) in pathogen_antagonists {
            builder = builder.pathogen_antagonist(p, a);
        }
        builder.build()
    }
}

/// Plant rows with CSR, height, light, tiers and the soil/nitrogen traits
pub fn load_plants(path: &Path) -> Result<Vec<Plant>> {
    let lazy = scan_table(path)?;
    let mut required = vec![PLANT_ID, "wfo_scientific_name", "C", "S", "R", "height_m"];
    required.extend(ClimateTier::ALL.iter().map(|t| t.column()));
    let df = materialize_with_columns(
        &lazy,
        &required,
        &["light_pref", "EIVEres-L", "nitrogen_fixation", "nitrogen_eive", "EIVEres-N", "soil_reaction_eive", "EIVEres-R"],
        "plants",
    )?;

    let ids = str_values(&df, PLANT_ID)?;
    let names = str_values(&df, "wfo_scientific_name")?;
    let c = f64_values(&df, "C")?;
    let s = f64_values(&df, "S")?;
    let r = f64_values(&df, "R")?;
    let height = f64_values(&df, "height_m")?;
    let light = first_present(str_values(&df, "light_pref")?, str_values(&df, "EIVEres-L")?);
    let fixer = bool_values(&df, "nitrogen_fixation")?;
    let eive_n = first_present(f64_values(&df, "nitrogen_eive")?, f64_values(&df, "EIVEres-N")?);
    let eive_r = first_present(f64_values(&df, "soil_reaction_eive")?, f64_values(&df, "EIVEres-R")?);
    let tiers = ClimateTier::ALL
        .iter()
        .map(|t| bool_values(&df, t.column()))
        .collect::<Result<Vec<_>>>()?;

    let mut plants = Vec::with_capacity(df.height());
    let mut undefined_csr = 0usize;
    for idx in 0..df.height() {
        let Some(id) = ids[idx].clone() else { continue };
        let mut plant = Plant::new(id, names[idx].clone().unwrap_or_default());

        if let (Some(c), Some(s), Some(r)) = (c[idx], s[idx], r[idx]) {
            plant = plant.with_csr(c, s, r);
        }
        if plant.csr.is_none() {
            undefined_csr += 1;
        }
        if let Some(h) = height[idx] {
            plant = plant.with_height(h);
        }
        plant.light = light[idx].as_deref().map_or(LightPreference::Unknown, LightPreference::parse);
        plant.nitrogen_fixer = fixer[idx].unwrap_or(false);
        plant.nitrogen_eive = eive_n[idx];
        plant.soil_reaction = eive_r[idx];
        for (tier, flags) in ClimateTier::ALL.iter().zip(&tiers) {
            if flags[idx] == Some(true) {
                plant.tiers.insert(*tier);
            }
        }
        plants.push(plant);
    }

    if undefined_csr > 0 {
        debug!(undefined_csr, "plants without a valid CSR triple");
    }
    Ok(plants)
}

fn first_present<T>(primary: Vec<Option<T>>, fallback: Vec<Option<T>>) -> Vec<Option<T>> {
    primary.into_iter().zip(fallback).map(|(a, b)| a.or(b)).collect()
}

/// Organism profiles keyed by `plant_wfo_id`
pub fn load_associations(path: &Path) -> Result<Vec<(String, AssociationRecord)>> {
    let lazy = scan_table(path)?;
    let df = materialize_with_columns(
        &lazy,
        &[PROFILE_ID],
        &[
            "pollinators",
            "herbivores",
            "pathogens",
            "flower_visitors",
            "predators_hasHost",
            "predators_interactsWith",
            "predators_adjacentTo",
            "fungivores_eats",
        ],
        "organisms",
    )?;

    let ids = str_values(&df, PROFILE_ID)?;
    let mut pollinators = string_lists(&df, "pollinators")?;
    let mut herbivores = string_lists(&df, "herbivores")?;
    let mut pathogens = string_lists(&df, "pathogens")?;
    let mut visitors = string_lists(&df, "flower_visitors")?;
    let mut has_host = string_lists(&df, "predators_hasHost")?;
    let mut interacts = string_lists(&df, "predators_interactsWith")?;
    let mut adjacent = string_lists(&df, "predators_adjacentTo")?;
    let mut fungivores = string_lists(&df, "fungivores_eats")?;

    let mut out = Vec::with_capacity(df.height());
    for (idx, id) in ids.into_iter().enumerate() {
        let Some(id) = id else { continue };
        let mut predators = std::mem::take(&mut has_host[idx]);
        predators.append(&mut interacts[idx]);
        predators.append(&mut adjacent[idx]);
        out.push((
            id,
            AssociationRecord {
                pollinators: std::mem::take(&mut pollinators[idx]),
                herbivores: std::mem::take(&mut herbivores[idx]),
                pathogens: std::mem::take(&mut pathogens[idx]),
                flower_visitors: std::mem::take(&mut visitors[idx]),
                predators,
                fungivores: std::mem::take(&mut fungivores[idx]),
            },
        ));
    }
    Ok(out)
}

/// Fungal guild profiles keyed by `plant_wfo_id`
pub fn load_fungi(path: &Path) -> Result<Vec<(String, FungalRecord)>> {
    const COLUMNS: [&str; 7] = [
        "pathogenic_fungi",
        "amf_fungi",
        "emf_fungi",
        "endophytic_fungi",
        "saprotrophic_fungi",
        "mycoparasite_fungi",
        "entomopathogenic_fungi",
    ];
    let lazy = scan_table(path)?;
    let df = materialize_with_columns(&lazy, &[PROFILE_ID], &COLUMNS, "fungi")?;

    let ids = str_values(&df, PROFILE_ID)?;
    let mut lists = COLUMNS
        .iter()
        .map(|c| string_lists(&df, c))
        .collect::<Result<Vec<_>>>()?;

    let mut out = Vec::with_capacity(df.height());
    for (idx, id) in ids.into_iter().enumerate() {
        let Some(id) = id else { continue };
        let mut take = |c: usize| std::mem::take(&mut lists[c][idx]);
        out.push((
            id,
            FungalRecord {
                pathogenic: take(0),
                amf: take(1),
                emf: take(2),
                endophytic: take(3),
                saprotrophic: take(4),
                mycoparasitic: take(5),
                entomopathogenic: take(6),
            },
        ));
    }
    Ok(out)
}

/// Cross-reference table as (key, value) pairs
///
/// The value column may hold one name per row or a pipe-separated list.
pub fn load_pairs(path: &Path, key_col: &str, value_col: &str) -> Result<Vec<(String, String)>> {
    let lazy = scan_table(path)?;
    let df = materialize_with_columns(&lazy, &[key_col, value_col], &[], "lookup table")
        .with_context(|| format!("Failed to load lookup table: {:?}", path))?;

    let keys = str_values(&df, key_col)?;
    let values = string_lists(&df, value_col)?;

    let mut pairs = Vec::new();
    for (key, vals) in keys.into_iter().zip(values) {
        let Some(key) = key else { continue };
        for v in vals {
            pairs.push((key.clone(), v));
        }
    }
    Ok(pairs)
}

/// `wfo_taxon_id → tree_tip` mapping; NA or empty tips are skipped
pub fn load_tree_mapping(path: &Path) -> Result<Vec<(String, String)>> {
    let lazy = scan_table(path)?;
    let df = materialize_with_columns(&lazy, &[PLANT_ID, "tree_tip"], &[], "tree mapping")?;
    let ids = str_values(&df, PLANT_ID)?;
    let tips = str_values(&df, "tree_tip")?;
    Ok(ids
        .into_iter()
        .zip(tips)
        .filter_map(|(id, tip)| Some((id?, tip?)))
        .collect())
}
