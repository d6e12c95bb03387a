//! Normalization Utilities
//!
//! Converts raw metric scores to percentiles using Köppen climate
//! tier-stratified calibration tables.

use crate::data::ClimateTier;
use crate::error::{GuildError, GuildResult};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The seven guild metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::M1,
        Metric::M2,
        Metric::M3,
        Metric::M4,
        Metric::M5,
        Metric::M6,
        Metric::M7,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::M1 => "m1",
            Metric::M2 => "m2",
            Metric::M3 => "m3",
            Metric::M4 => "m4",
            Metric::M5 => "m5",
            Metric::M6 => "m6",
            Metric::M7 => "m7",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::M1 => "Pest & pathogen independence",
            Metric::M2 => "Growth strategy compatibility",
            Metric::M3 => "Insect pest control",
            Metric::M4 => "Disease control",
            Metric::M5 => "Beneficial fungi networks",
            Metric::M6 => "Vertical stratification",
            Metric::M7 => "Pollinator support",
        }
    }

    /// High raw values are bad for M1 (risk) and M2 (conflict)
    pub fn is_inverted(self) -> bool {
        matches!(self, Metric::M1 | Metric::M2)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One (percentile, raw value) point of a calibrated CDF
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub percentile: f64,
    pub value: f64,
}

/// Calibrated distribution of one metric in one stratum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCalibration {
    pub breakpoints: Vec<Breakpoint>,
    pub mean: f64,
    pub sd: f64,
    pub n_samples: usize,
}

impl MetricCalibration {
    /// Summarise raw samples; `None` when there are none
    ///
    /// Breakpoint for percentile p is the nearest-rank value at sorted index
    /// `round(p / 100 · (n − 1))`.
    pub fn from_samples(mut values: Vec<f64>, percentiles: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let n = values.len();
        let last = (n - 1) as f64;

        let breakpoints = percentiles
            .iter()
            .map(|&p| {
                let idx = ((p / 100.0) * last).round() as usize;
                Breakpoint { percentile: p, value: values[idx.min(n - 1)] }
            })
            .collect();

        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

        Some(Self { breakpoints, mean, sd: variance.sqrt(), n_samples: n })
    }

    /// Percentile of `raw`; `None` when the breakpoints are unusable
    pub fn normalize(&self, raw: f64) -> Option<f64> {
        percentile_normalize(raw, &self.breakpoints)
    }

    pub fn is_monotonic(&self) -> bool {
        self.breakpoints
            .windows(2)
            .all(|w| w[0].percentile < w[1].percentile && w[0].value <= w[1].value)
    }

    /// Structural checks for a table read from disk
    fn check(&self, percentiles: &[f64]) -> Result<()> {
        if self.n_samples == 0 {
            bail!("table was built from zero samples");
        }
        if self.breakpoints.is_empty() {
            bail!("table has no breakpoints");
        }
        if self.breakpoints.iter().any(|b| !b.value.is_finite()) {
            bail!("table has a non-finite breakpoint value");
        }
        let table_percentiles: Vec<f64> = self.breakpoints.iter().map(|b| b.percentile).collect();
        if table_percentiles != percentiles {
            bail!("breakpoint percentiles {:?} differ from {:?}", table_percentiles, percentiles);
        }
        if !self.is_monotonic() {
            bail!("breakpoint values decrease");
        }
        Ok(())
    }
}

/// Percentile normalize using linear interpolation
///
/// 1. Clamp: at or below the first breakpoint → 0, at or above the last → 100
/// 2. Find bracketing breakpoints where v_i <= raw <= v_i+1
/// 3. percentile = p_i + fraction × (p_i+1 − p_i)
///
/// Returns `None` for an empty or non-monotonic breakpoint list.
pub fn percentile_normalize(raw_value: f64, breakpoints: &[Breakpoint]) -> Option<f64> {
    let (first, last) = (breakpoints.first()?, breakpoints.last()?);
    let monotonic = breakpoints
        .windows(2)
        .all(|w| w[0].percentile < w[1].percentile && w[0].value <= w[1].value);
    if !monotonic {
        return None;
    }

    if raw_value <= first.value {
        return Some(0.0);
    }
    if raw_value >= last.value {
        return Some(100.0);
    }

    breakpoints.windows(2).find_map(|w| {
        let (lo, hi) = (w[0], w[1]);
        (lo.value <= raw_value && raw_value <= hi.value).then(|| {
            let fraction = if hi.value - lo.value > 0.0 {
                (raw_value - lo.value) / (hi.value - lo.value)
            } else {
                0.0
            };
            lo.percentile + fraction * (hi.percentile - lo.percentile)
        })
    })
}

/// Tree/data snapshot and sampling parameters a table set was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub data_version: String,
    pub n_plants: usize,
    pub n_tree_leaves: usize,
    pub total_branch_length: f64,
    pub seed: u64,
    pub samples_per_stratum: usize,
}

/// Calibration for one Köppen tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCalibration {
    /// Plants available in this tier when sampling
    pub pool_size: usize,
    pub guild_sizes: BTreeMap<usize, BTreeMap<Metric, MetricCalibration>>,
}

impl TierCalibration {
    /// Exact calibrated size, else the nearest one (smaller on ties)
    pub fn nearest_size(&self, guild_size: usize) -> Option<usize> {
        self.guild_sizes
            .keys()
            .copied()
            .min_by_key(|&s| (s.abs_diff(guild_size), s))
    }
}

/// Calibration tables for all tiers, sizes and metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTables {
    pub percentiles: Vec<f64>,
    pub snapshot: SnapshotInfo,
    pub tiers: BTreeMap<ClimateTier, TierCalibration>,
}

impl CalibrationTables {
    /// Load calibration from JSON file and check every table
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read calibration file: {:?}", path))?;
        let tables: Self =
            serde_json::from_str(&contents).with_context(|| "Failed to parse calibration JSON")?;
        tables
            .validate()
            .with_context(|| format!("Invalid calibration file: {:?}", path))?;
        Ok(tables)
    }

    /// Every table must be non-empty, monotonic and use the shared percentiles
    pub fn validate(&self) -> Result<()> {
        if self.percentiles.len() < 2 || !self.percentiles.windows(2).all(|w| w[0] < w[1]) {
            bail!("percentiles must be strictly increasing with at least two entries");
        }
        for (tier, cal) in &self.tiers {
            if cal.guild_sizes.is_empty() {
                bail!("tier {} has no calibrated guild sizes", tier);
            }
            for (size, metrics) in &cal.guild_sizes {
                for (metric, table) in metrics {
                    table
                        .check(&self.percentiles)
                        .with_context(|| format!("tier {} guild size {} metric {}", tier, size, metric))?;
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize calibration tables")
    }

    /// Replace `path` atomically via a temp file in the same directory
    pub fn persist(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .with_context(|| format!("Failed to create calibration directory: {:?}", parent))?;

        let mut tmp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temp file in {:?}", parent))?;
        tmp.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write temp file for {:?}", path))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to sync temp file for {:?}", path))?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace calibration file: {:?}", path))?;
        Ok(())
    }

    pub fn tier(&self, tier: ClimateTier) -> Option<&TierCalibration> {
        self.tiers.get(&tier)
    }

    /// Table for (tier, nearest calibrated guild size, metric)
    pub fn metric(
        &self,
        tier: ClimateTier,
        guild_size: usize,
        metric: Metric,
    ) -> GuildResult<(usize, &MetricCalibration)> {
        let tier_cal = self
            .tier(tier)
            .ok_or(GuildError::MissingCalibrationTable { tier, metric })?;
        let size = tier_cal
            .nearest_size(guild_size)
            .ok_or(GuildError::NoCalibratedGuildSize { tier })?;
        tier_cal
            .guild_sizes
            .get(&size)
            .and_then(|m| m.get(&metric))
            .map(|cal| (size, cal))
            .ok_or(GuildError::MissingCalibrationTable { tier, metric })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mock_breakpoints() -> Vec<Breakpoint> {
        let percentiles = [1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 99.0];
        let values = [0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8, 0.85, 0.9, 0.95, 1.0, 1.05, 1.1];
        percentiles
            .iter()
            .zip(values)
            .map(|(&percentile, value)| Breakpoint { percentile, value })
            .collect()
    }

    #[test]
    fn test_percentile_normalize_edge_cases() {
        let bp = mock_breakpoints();

        // Below minimum
        assert_relative_eq!(percentile_normalize(0.4, &bp).unwrap(), 0.0, epsilon = 0.0001);
        // Above maximum
        assert_relative_eq!(percentile_normalize(1.2, &bp).unwrap(), 100.0, epsilon = 0.0001);
        // At midpoint (p50 = 0.8)
        assert_relative_eq!(percentile_normalize(0.8, &bp).unwrap(), 50.0, epsilon = 0.0001);
        // Halfway between p50 and p60
        assert_relative_eq!(percentile_normalize(0.825, &bp).unwrap(), 55.0, epsilon = 0.0001);
    }

    #[test]
    fn test_flat_segments() {
        let bp = vec![
            Breakpoint { percentile: 1.0, value: 0.0 },
            Breakpoint { percentile: 50.0, value: 0.0 },
            Breakpoint { percentile: 99.0, value: 4.0 },
        ];
        assert_eq!(percentile_normalize(0.0, &bp), Some(0.0));
        assert_relative_eq!(percentile_normalize(2.0, &bp).unwrap(), 74.5);
    }

    #[test]
    fn test_unusable_breakpoints_have_no_percentile() {
        assert_eq!(percentile_normalize(123.0, &[]), None);

        let descending = vec![
            Breakpoint { percentile: 1.0, value: 5.0 },
            Breakpoint { percentile: 50.0, value: 1.0 },
            Breakpoint { percentile: 99.0, value: 9.0 },
        ];
        assert_eq!(percentile_normalize(6.0, &descending), None);

        let cal = MetricCalibration { breakpoints: Vec::new(), mean: 0.0, sd: 0.0, n_samples: 10 };
        assert_eq!(cal.normalize(1.0), None);
    }

    #[test]
    fn test_from_samples_nearest_rank() {
        let values: Vec<f64> = (0..=100).rev().map(|v| v as f64).collect();
        let cal = MetricCalibration::from_samples(values, &[1.0, 50.0, 99.0]).unwrap();

        assert_eq!(cal.n_samples, 101);
        assert_eq!(cal.breakpoints[0].value, 1.0);
        assert_eq!(cal.breakpoints[1].value, 50.0);
        assert_eq!(cal.breakpoints[2].value, 99.0);
        assert_relative_eq!(cal.mean, 50.0);
        assert!(cal.is_monotonic());
    }

    #[test]
    fn test_from_samples_empty() {
        assert!(MetricCalibration::from_samples(Vec::new(), &[1.0, 99.0]).is_none());
    }

    #[test]
    fn test_nearest_size() {
        let mut guild_sizes = BTreeMap::new();
        guild_sizes.insert(2, BTreeMap::new());
        guild_sizes.insert(7, BTreeMap::new());
        let tier = TierCalibration { pool_size: 10, guild_sizes };

        assert_eq!(tier.nearest_size(2), Some(2));
        assert_eq!(tier.nearest_size(3), Some(2));
        assert_eq!(tier.nearest_size(5), Some(7));
        assert_eq!(tier.nearest_size(12), Some(7));

        let empty = TierCalibration { pool_size: 0, guild_sizes: BTreeMap::new() };
        assert_eq!(empty.nearest_size(3), None);
    }

    fn tables_with(cal: MetricCalibration) -> CalibrationTables {
        let mut metrics = BTreeMap::new();
        metrics.insert(Metric::M3, cal);
        let mut guild_sizes = BTreeMap::new();
        guild_sizes.insert(2, metrics);
        let mut tiers = BTreeMap::new();
        tiers.insert(ClimateTier::HumidTemperate, TierCalibration { pool_size: 5, guild_sizes });
        CalibrationTables {
            percentiles: vec![1.0, 50.0, 99.0],
            snapshot: SnapshotInfo {
                data_version: "test".into(),
                n_plants: 5,
                n_tree_leaves: 5,
                total_branch_length: 10.0,
                seed: 1,
                samples_per_stratum: 10,
            },
            tiers,
        }
    }

    fn good_table() -> MetricCalibration {
        MetricCalibration::from_samples(vec![0.0, 1.0, 2.0, 3.0], &[1.0, 50.0, 99.0]).unwrap()
    }

    #[test]
    fn test_validate_rejects_corrupt_tables() {
        assert!(tables_with(good_table()).validate().is_ok());

        let mut empty = good_table();
        empty.breakpoints.clear();
        assert!(tables_with(empty).validate().is_err());

        let mut descending = good_table();
        descending.breakpoints[1].value = -1.0;
        assert!(tables_with(descending).validate().is_err());

        let mut no_samples = good_table();
        no_samples.n_samples = 0;
        assert!(tables_with(no_samples).validate().is_err());

        let mut other_percentiles = good_table();
        other_percentiles.breakpoints[1].percentile = 60.0;
        let err = tables_with(other_percentiles).validate().unwrap_err();
        assert!(format!("{err:#}").contains("metric m3"));
    }

    #[test]
    fn test_load_rejects_blanked_breakpoints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");

        let mut blank = good_table();
        blank.breakpoints.clear();
        fs::write(&path, tables_with(blank).to_json().unwrap()).unwrap();
        let err = CalibrationTables::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("no breakpoints"));

        tables_with(good_table()).persist(&path).unwrap();
        assert!(CalibrationTables::load(&path).is_ok());
    }

    #[test]
    fn test_metric_serde_names() {
        assert_eq!(serde_json::to_string(&Metric::M4).unwrap(), "\"m4\"");
        assert_eq!(Metric::M6.to_string(), "m6");
        assert!(Metric::M1.is_inverted() && Metric::M2.is_inverted());
        assert!(!Metric::M7.is_inverted());
    }
}
