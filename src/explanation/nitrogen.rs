use crate::config::FlagThresholds;
use crate::data::Plant;
use crate::explanation::types::{FlagKind, Severity, WarningCard};

/// Check nitrogen fixation status of guild
///
/// Returns warning if more than `max_nitrogen_fixers` plants fix nitrogen
/// (risk of over-fertilization)
pub fn check_nitrogen_fixation(plants: &[&Plant], thresholds: &FlagThresholds) -> Option<WarningCard> {
    let n_fixers = plants.iter().filter(|p| p.nitrogen_fixer).count();

    (n_fixers > thresholds.max_nitrogen_fixers).then(|| WarningCard {
        kind: FlagKind::NitrogenExcess,
        severity: Severity::Medium,
        message: format!("{} nitrogen-fixing plants may over-fertilize", n_fixers),
        detail: "Excess nitrogen can favor fast-growing weeds and reduce soil biodiversity".to_string(),
        advice: format!(
            "Reduce to 1-{} nitrogen fixers or add nitrogen-demanding plants",
            thresholds.max_nitrogen_fixers
        ),
    })
}

/// Heavy feeders (high EIVE-N) with no nitrogen fixer in the guild
pub fn check_nitrogen_deficit(plants: &[&Plant], thresholds: &FlagThresholds) -> Option<WarningCard> {
    if plants.iter().any(|p| p.nitrogen_fixer) {
        return None;
    }

    let mut heavy_feeders: Vec<&str> = plants
        .iter()
        .filter(|p| p.nitrogen_eive.is_some_and(|n| n >= thresholds.heavy_feeder_eive_n))
        .map(|p| p.scientific_name.as_str())
        .collect();
    if heavy_feeders.is_empty() {
        return None;
    }
    heavy_feeders.sort_unstable();

    Some(WarningCard {
        kind: FlagKind::NitrogenDeficit,
        severity: Severity::Low,
        message: format!("{} nitrogen-demanding plants and no nitrogen fixer", heavy_feeders.len()),
        detail: format!("Heavy feeders (EIVE-N ≥ {:.0}): {}", thresholds.heavy_feeder_eive_n, heavy_feeders.join(", ")),
        advice: "Add a nitrogen-fixing plant or plan for supplementary feeding".to_string(),
    })
}
