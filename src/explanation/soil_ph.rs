use crate::config::FlagThresholds;
use crate::data::Plant;
use crate::explanation::types::{FlagKind, Severity, WarningCard};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal soil reaction category on the EIVE-R scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhCategory {
    Acidic,
    Neutral,
    Alkaline,
}

impl PhCategory {
    pub fn from_eive(r: f64) -> Self {
        if r < 4.0 {
            PhCategory::Acidic
        } else if r <= 7.0 {
            PhCategory::Neutral
        } else {
            PhCategory::Alkaline
        }
    }
}

impl fmt::Display for PhCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhCategory::Acidic => "acidic",
            PhCategory::Neutral => "neutral",
            PhCategory::Alkaline => "alkaline",
        })
    }
}

/// Check soil pH compatibility of guild
///
/// Returns warning if EIVE-R preferences differ by more than the threshold
pub fn check_soil_ph_compatibility(plants: &[&Plant], thresholds: &FlagThresholds) -> Option<WarningCard> {
    let ph_prefs: Vec<f64> = plants.iter().filter_map(|p| p.soil_reaction).collect();
    if ph_prefs.is_empty() {
        return None;
    }

    let min_ph = ph_prefs.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ph = ph_prefs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ph_range = max_ph - min_ph;

    if ph_range <= thresholds.ph_range_threshold {
        return None;
    }

    let mut categories: Vec<PhCategory> = ph_prefs.iter().map(|&r| PhCategory::from_eive(r)).collect();
    categories.sort_unstable();
    categories.dedup();
    let categories: Vec<String> = categories.iter().map(|c| c.to_string()).collect();

    Some(WarningCard {
        kind: FlagKind::PhIncompatible,
        severity: Severity::High,
        message: "Incompatible soil pH preferences detected".to_string(),
        detail: format!(
            "EIVE-R range: {:.1}-{:.1} (difference: {:.1} units; {})",
            min_ph,
            max_ph,
            ph_range,
            categories.join(" to ")
        ),
        advice: "Group acid-loving and alkaline-preferring plants separately".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plants(values: &[Option<f64>]) -> Vec<Plant> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let p = Plant::new(format!("plant{i}"), format!("Plant {i}"));
                match v {
                    Some(r) => p.with_soil_reaction(*r),
                    None => p,
                }
            })
            .collect()
    }

    fn check(values: &[Option<f64>]) -> Option<WarningCard> {
        let plants = plants(values);
        let refs: Vec<&Plant> = plants.iter().collect();
        check_soil_ph_compatibility(&refs, &FlagThresholds::default())
    }

    #[test]
    fn test_incompatible_ph() {
        let w = check(&[Some(3.5), Some(7.8), Some(5.2)]).unwrap();
        assert_eq!(w.kind, FlagKind::PhIncompatible);
        assert_eq!(w.severity, Severity::High);
        assert!(w.detail.contains("3.5-7.8"));
        assert!(w.detail.contains("acidic to neutral to alkaline"));
    }

    #[test]
    fn test_compatible_ph() {
        assert!(check(&[Some(6.0), Some(6.5), Some(7.5)]).is_none());
    }

    #[test]
    fn test_missing_ph_values() {
        assert!(check(&[None, None, None]).is_none());
    }

    #[test]
    fn test_category_bounds() {
        assert_eq!(PhCategory::from_eive(3.99), PhCategory::Acidic);
        assert_eq!(PhCategory::from_eive(4.0), PhCategory::Neutral);
        assert_eq!(PhCategory::from_eive(7.0), PhCategory::Neutral);
        assert_eq!(PhCategory::from_eive(7.01), PhCategory::Alkaline);
    }
}
