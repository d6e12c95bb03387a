//! METRIC 6: STRUCTURAL DIVERSITY (VERTICAL STRATIFICATION)
//!
//! Scores vertical stratification: the spread of plant heights, scaled by
//! whether the shorter plant of each layered pair tolerates being shaded.
//!
//! raw = population SD of heights × light compatibility factor. Undefined
//! (`None`) with fewer than two known heights.

use super::ScoringContext;
use crate::data::{Guild, LightPreference};

/// Height difference (m) that separates two canopy layers
const LAYER_GAP_M: f64 = 2.0;

/// Result of M6 calculation
#[derive(Debug, Clone, PartialEq)]
pub struct M6Result {
    /// SD × light factor, `None` when undefined
    pub raw: Option<f64>,
    /// Population SD of known heights
    pub height_sd: f64,
    /// Light compatibility factor (0-1)
    pub light_factor: f64,
    /// Height difference under compatible short plants (weighted)
    pub valid_stratification: f64,
    /// Height difference over sun-loving short plants
    pub invalid_stratification: f64,
    /// Height range in meters
    pub height_range: f64,
    /// Plants with a known height
    pub n_heights: usize,
}

fn shade_tolerance(light: LightPreference) -> Option<f64> {
    match light {
        LightPreference::Shade => Some(1.0),
        LightPreference::Flexible => Some(0.6),
        LightPreference::Unknown => Some(0.5),
        LightPreference::Sun => None,
    }
}

pub fn calculate_m6(ctx: &ScoringContext<'_>, guild: &Guild) -> M6Result {
    // Sorted by height so that i < j means i is the shorter plant
    let mut plants: Vec<(f64, LightPreference)> = guild
        .members()
        .iter()
        .filter_map(|&p| {
            let plant = ctx.data.plant(p);
            plant.height_m.map(|h| (h, plant.light))
        })
        .collect();
    plants.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = plants.len();
    if n < 2 {
        return M6Result {
            raw: None,
            height_sd: 0.0,
            light_factor: 1.0,
            valid_stratification: 0.0,
            invalid_stratification: 0.0,
            height_range: 0.0,
            n_heights: n,
        };
    }

    let mut valid = 0.0;
    let mut invalid = 0.0;
    for i in 0..n - 1 {
        let (short_height, short_light) = plants[i];
        for &(tall_height, _) in &plants[i + 1..] {
            let diff = tall_height - short_height;
            if diff <= LAYER_GAP_M {
                continue;
            }
            match shade_tolerance(short_light) {
                Some(w) => valid += diff * w,
                None => invalid += diff,
            }
        }
    }

    let total = valid + invalid;
    let light_factor = if total > 0.0 { valid / total } else { 1.0 };

    let mean = plants.iter().map(|p| p.0).sum::<f64>() / n as f64;
    let variance = plants.iter().map(|p| (p.0 - mean).powi(2)).sum::<f64>() / n as f64;
    let height_sd = variance.sqrt();

    M6Result {
        raw: Some(height_sd * light_factor),
        height_sd,
        light_factor,
        valid_stratification: valid,
        invalid_stratification: invalid,
        height_range: plants[n - 1].0 - plants[0].0,
        n_heights: n,
    }
}
