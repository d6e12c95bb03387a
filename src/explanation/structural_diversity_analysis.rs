//! Structural Diversity Analysis for M6
//!
//! Sorts guild plants into vertical layers and reports how well the
//! understorey tolerates the shade cast by taller layers. M6 needs at least
//! two plants with a known height; otherwise the guild is flagged instead.

use crate::data::{Guild, GuildData, LightPreference};
use crate::explanation::types::{FlagKind, Severity, WarningCard};
use crate::metrics::M6Result;
use serde::Serialize;

/// Layer name, lower height bound (m), height label; tallest first
const LAYERS: [(&str, f64, &str); 4] = [
    ("Canopy", 15.0, ">15m"),
    ("Understory", 5.0, "5-15m"),
    ("Shrub", 1.0, "1-5m"),
    ("Ground", 0.0, "<1m"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerPlant {
    pub plant_name: String,
    pub height_m: f64,
    pub light: LightPreference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralLayer {
    pub name: &'static str,
    pub height_range: &'static str,
    /// Tallest first
    pub plants: Vec<LayerPlant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralDiversityProfile {
    /// Tallest minus shortest known height (m)
    pub height_range: f64,
    pub height_sd: f64,
    /// Share of layered height difference over shade-tolerant plants (0-1)
    pub light_factor: f64,
    pub valid_stratification: f64,
    pub invalid_stratification: f64,
    /// Occupied layers only, tallest first
    pub layers: Vec<StructuralLayer>,
    pub shade_tolerant_count: usize,
    pub flexible_count: usize,
    pub sun_loving_count: usize,
}

/// Layered view of a guild with a defined M6; `None` otherwise
pub fn analyze_structural_diversity(
    data: &GuildData,
    guild: &Guild,
    m6: &M6Result,
) -> Option<StructuralDiversityProfile> {
    if m6.raw.is_none() {
        return None;
    }

    let mut plants: Vec<LayerPlant> = guild
        .members()
        .iter()
        .filter_map(|&p| {
            let plant = data.plant(p);
            plant.height_m.map(|height_m| LayerPlant {
                plant_name: plant.scientific_name.clone(),
                height_m,
                light: plant.light,
            })
        })
        .collect();
    plants.sort_by(|a, b| b.height_m.total_cmp(&a.height_m).then_with(|| a.plant_name.cmp(&b.plant_name)));

    let count = |light: LightPreference| plants.iter().filter(|p| p.light == light).count();
    let (shade_tolerant_count, flexible_count, sun_loving_count) =
        (count(LightPreference::Shade), count(LightPreference::Flexible), count(LightPreference::Sun));

    let mut layers: Vec<StructuralLayer> = LAYERS
        .iter()
        .map(|&(name, _, height_range)| StructuralLayer { name, height_range, plants: Vec::new() })
        .collect();
    for plant in plants {
        let slot = LAYERS
            .iter()
            .position(|&(_, lower, _)| plant.height_m > lower)
            .unwrap_or(LAYERS.len() - 1);
        layers[slot].plants.push(plant);
    }
    layers.retain(|l| !l.plants.is_empty());

    Some(StructuralDiversityProfile {
        height_range: m6.height_range,
        height_sd: m6.height_sd,
        light_factor: m6.light_factor,
        valid_stratification: m6.valid_stratification,
        invalid_stratification: m6.invalid_stratification,
        layers,
        shade_tolerant_count,
        flexible_count,
        sun_loving_count,
    })
}

pub fn check_structural_diversity(m6: &M6Result, guild_size: usize) -> Option<WarningCard> {
    if m6.raw.is_some() {
        return None;
    }

    let detail = if guild_size < 2 {
        "A single plant has no vertical structure to assess".to_string()
    } else {
        format!("Only {} of {} plants have a known height", m6.n_heights, guild_size)
    };

    Some(WarningCard {
        kind: FlagKind::InsufficientStructuralDiversity,
        severity: Severity::Info,
        message: "Insufficient diversity to assess vertical stratification".to_string(),
        detail,
        advice: "Stratification is left out of the overall score".to_string(),
    })
}
