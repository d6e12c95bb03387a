//! Data Loading and Management
//!
//! Typed plant table plus the association stores every metric reads. Built
//! once, either from the upstream tables (`loader`) or in memory through
//! `GuildDataBuilder`, then shared read-only.

pub mod loader;

use crate::error::{GuildError, GuildResult};
use crate::stores::{
    union, AssociationProfile, AssociationStore, FungalProfile, FungalStore, InteractionLookups,
    NameInterner, Sym,
};
use anyhow::{bail, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Köppen climate tiers, ordered as in the plant table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClimateTier {
    #[serde(rename = "tier_1_tropical")]
    Tropical,
    #[serde(rename = "tier_2_mediterranean")]
    Mediterranean,
    #[serde(rename = "tier_3_humid_temperate")]
    HumidTemperate,
    #[serde(rename = "tier_4_continental")]
    Continental,
    #[serde(rename = "tier_5_boreal_polar")]
    BorealPolar,
    #[serde(rename = "tier_6_arid")]
    Arid,
}

impl ClimateTier {
    pub const ALL: [ClimateTier; 6] = [
        ClimateTier::Tropical,
        ClimateTier::Mediterranean,
        ClimateTier::HumidTemperate,
        ClimateTier::Continental,
        ClimateTier::BorealPolar,
        ClimateTier::Arid,
    ];

    /// Column name in the plant table (also the serialized name)
    pub fn column(self) -> &'static str {
        match self {
            ClimateTier::Tropical => "tier_1_tropical",
            ClimateTier::Mediterranean => "tier_2_mediterranean",
            ClimateTier::HumidTemperate => "tier_3_humid_temperate",
            ClimateTier::Continental => "tier_4_continental",
            ClimateTier::BorealPolar => "tier_5_boreal_polar",
            ClimateTier::Arid => "tier_6_arid",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for ClimateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for ClimateTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClimateTier::ALL
            .into_iter()
            .find(|t| t.column() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ClimateTier::ALL.iter().map(|t| t.column()).collect();
                format!("unknown climate tier '{}' (expected one of {})", s, names.join(", "))
            })
    }
}

/// Set of climate tiers as a bitset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TierSet(u8);

impl TierSet {
    pub const EMPTY: TierSet = TierSet(0);

    pub fn from_tiers(tiers: &[ClimateTier]) -> Self {
        let mut set = TierSet::EMPTY;
        for &t in tiers {
            set.insert(t);
        }
        set
    }

    pub fn insert(&mut self, tier: ClimateTier) {
        self.0 |= tier.bit();
    }

    pub fn contains(self, tier: ClimateTier) -> bool {
        self.0 & tier.bit() != 0
    }

    pub fn intersection(self, other: TierSet) -> TierSet {
        TierSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Member tiers in enum order
    pub fn iter(self) -> impl Iterator<Item = ClimateTier> {
        ClimateTier::ALL.into_iter().filter(move |&t| self.contains(t))
    }
}

/// CSR strategy percentages
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Csr {
    pub c: f64,
    pub s: f64,
    pub r: f64,
}

impl Csr {
    const SUM_TOLERANCE: f64 = 0.5;

    /// `None` unless all three are finite, non-negative and sum to 100
    pub fn new(c: f64, s: f64, r: f64) -> Option<Self> {
        let parts = [c, s, r];
        if parts.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return None;
        }
        if (c + s + r - 100.0).abs() > Self::SUM_TOLERANCE {
            return None;
        }
        Some(Self { c, s, r })
    }

    pub fn distance(&self, other: &Csr) -> f64 {
        let dc = self.c - other.c;
        let ds = self.s - other.s;
        let dr = self.r - other.r;
        (dc * dc + ds * ds + dr * dr).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightPreference {
    Shade,
    Flexible,
    Sun,
    #[default]
    Unknown,
}

impl LightPreference {
    /// EIVE-L below this is shade-tolerant
    pub const SHADE_MAX: f64 = 3.2;
    /// EIVE-L above this is sun-demanding
    pub const SUN_MIN: f64 = 7.47;

    pub fn from_eive(light: Option<f64>) -> Self {
        match light {
            Some(l) if !l.is_finite() => LightPreference::Unknown,
            Some(l) if l < Self::SHADE_MAX => LightPreference::Shade,
            Some(l) if l > Self::SUN_MIN => LightPreference::Sun,
            Some(_) => LightPreference::Flexible,
            None => LightPreference::Unknown,
        }
    }

    /// Text category or numeric EIVE-L
    pub fn parse(value: &str) -> Self {
        let v = value.trim();
        match v.to_ascii_lowercase().as_str() {
            "shade" | "shade_tolerant" => LightPreference::Shade,
            "flexible" | "partial" | "semi_shade" => LightPreference::Flexible,
            "sun" | "full_sun" => LightPreference::Sun,
            _ => Self::from_eive(v.parse::<f64>().ok()),
        }
    }
}

/// One row of the plant table
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub taxon_id: String,
    pub scientific_name: String,
    pub csr: Option<Csr>,
    pub height_m: Option<f64>,
    pub light: LightPreference,
    pub tiers: TierSet,
    pub nitrogen_fixer: bool,
    /// EIVE-N (nutrient demand)
    pub nitrogen_eive: Option<f64>,
    /// EIVE-R (soil reaction)
    pub soil_reaction: Option<f64>,
}

impl Plant {
    pub fn new(taxon_id: impl Into<String>, scientific_name: impl Into<String>) -> Self {
        Self {
            taxon_id: taxon_id.into(),
            scientific_name: scientific_name.into(),
            csr: None,
            height_m: None,
            light: LightPreference::Unknown,
            tiers: TierSet::EMPTY,
            nitrogen_fixer: false,
            nitrogen_eive: None,
            soil_reaction: None,
        }
    }

    pub fn with_csr(mut self, c: f64, s: f64, r: f64) -> Self {
        self.csr = Csr::new(c, s, r);
        self
    }

    pub fn with_height(mut self, height_m: f64) -> Self {
        self.height_m = (height_m.is_finite() && height_m >= 0.0).then_some(height_m);
        self
    }

    pub fn with_light(mut self, light: LightPreference) -> Self {
        self.light = light;
        self
    }

    pub fn with_tiers(mut self, tiers: &[ClimateTier]) -> Self {
        self.tiers = TierSet::from_tiers(tiers);
        self
    }

    pub fn with_nitrogen_fixer(mut self, fixer: bool) -> Self {
        self.nitrogen_fixer = fixer;
        self
    }

    pub fn with_nitrogen_eive(mut self, n: f64) -> Self {
        self.nitrogen_eive = Some(n);
        self
    }

    pub fn with_soil_reaction(mut self, r: f64) -> Self {
        self.soil_reaction = Some(r);
        self
    }
}

/// Plants with dense indices and a taxon-ID index
#[derive(Debug, Clone, Default)]
pub struct PlantTable {
    plants: Vec<Plant>,
    by_id: FxHashMap<String, usize>,
}

impl PlantTable {
    pub fn get(&self, idx: usize) -> &Plant {
        &self.plants[idx]
    }

    pub fn index_of(&self, taxon_id: &str) -> Option<usize> {
        self.by_id.get(taxon_id).copied()
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plant> {
        self.plants.iter()
    }
}

/// Sorted, duplicate-free dense plant indices
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Guild {
    members: SmallVec<[usize; 8]>,
}

impl Guild {
    /// Sorts and drops duplicate indices
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut members: SmallVec<[usize; 8]> = indices.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        Self { members }
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Unordered pairs (i < j)
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.members.iter().enumerate().flat_map(move |(i, &a)| {
            self.members[i + 1..].iter().map(move |&b| (a, b))
        })
    }

    /// Ordered pairs of distinct members
    pub fn ordered_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.members.iter().flat_map(move |&a| {
            self.members.iter().filter(move |&&b| b != a).map(move |&b| (a, b))
        })
    }
}

/// Main data holder for guild scoring
#[derive(Debug, Clone, Default)]
pub struct GuildData {
    pub plants: PlantTable,
    pub names: NameInterner,
    pub associations: AssociationStore,
    pub fungi: FungalStore,
    pub lookups: InteractionLookups,
}

impl GuildData {
    pub fn plant(&self, idx: usize) -> &Plant {
        self.plants.get(idx)
    }

    pub fn n_plants(&self) -> usize {
        self.plants.len()
    }

    /// Organism or fungus name behind a symbol
    pub fn name(&self, sym: Sym) -> &str {
        self.names.name(sym)
    }

    /// Resolve taxon IDs into a guild
    pub fn resolve<S: AsRef<str>>(&self, taxon_ids: &[S]) -> GuildResult<Guild> {
        if taxon_ids.is_empty() {
            return Err(GuildError::EmptyGuild);
        }
        let mut members: SmallVec<[usize; 8]> = SmallVec::with_capacity(taxon_ids.len());
        for id in taxon_ids {
            let id = id.as_ref();
            let idx = self
                .plants
                .index_of(id)
                .ok_or_else(|| GuildError::UnknownPlant(id.to_string()))?;
            if members.contains(&idx) {
                return Err(GuildError::DuplicatePlant(id.to_string()));
            }
            members.push(idx);
        }
        Ok(Guild::from_indices(members))
    }
}

/// Organism names for one plant, as read from the association table
#[derive(Debug, Clone, Default)]
pub struct AssociationRecord {
    pub pollinators: Vec<String>,
    pub herbivores: Vec<String>,
    pub pathogens: Vec<String>,
    pub flower_visitors: Vec<String>,
    pub predators: Vec<String>,
    pub fungivores: Vec<String>,
}

/// Fungus names for one plant, as read from the fungal guild table
#[derive(Debug, Clone, Default)]
pub struct FungalRecord {
    pub pathogenic: Vec<String>,
    pub amf: Vec<String>,
    pub emf: Vec<String>,
    pub endophytic: Vec<String>,
    pub saprotrophic: Vec<String>,
    pub mycoparasitic: Vec<String>,
    pub entomopathogenic: Vec<String>,
}

/// Assembles `GuildData` from plant rows, profile records and lookup pairs
#[derive(Debug, Default)]
pub struct GuildDataBuilder {
    plants: Vec<Plant>,
    associations: Vec<(String, AssociationRecord)>,
    fungi: Vec<(String, FungalRecord)>,
    herbivore_predators: Vec<(String, String)>,
    insect_parasites: Vec<(String, String)>,
    pathogen_antagonists: Vec<(String, String)>,
}

impl GuildDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plant(mut self, plant: Plant) -> Self {
        self.plants.push(plant);
        self
    }

    pub fn associations(mut self, taxon_id: impl Into<String>, record: AssociationRecord) -> Self {
        self.associations.push((taxon_id.into(), record));
        self
    }

    pub fn fungi(mut self, taxon_id: impl Into<String>, record: FungalRecord) -> Self {
        self.fungi.push((taxon_id.into(), record));
        self
    }

    pub fn herbivore_predator(mut self, herbivore: impl Into<String>, predator: impl Into<String>) -> Self {
        self.herbivore_predators.push((herbivore.into(), predator.into()));
        self
    }

    pub fn insect_parasite(mut self, insect: impl Into<String>, fungus: impl Into<String>) -> Self {
        self.insect_parasites.push((insect.into(), fungus.into()));
        self
    }

    pub fn pathogen_antagonist(mut self, pathogen: impl Into<String>, antagonist: impl Into<String>) -> Self {
        self.pathogen_antagonists.push((pathogen.into(), antagonist.into()));
        self
    }

    pub fn build(self) -> Result<GuildData> {
        let mut by_id = FxHashMap::default();
        for (idx, plant) in self.plants.iter().enumerate() {
            if by_id.insert(plant.taxon_id.clone(), idx).is_some() {
                bail!("Duplicate taxon id in plant table: {}", plant.taxon_id);
            }
        }
        let n = self.plants.len();
        let mut names = NameInterner::default();

        let mut associations = vec![AssociationProfile::default(); n];
        let mut orphan_rows = 0usize;
        for (id, rec) in &self.associations {
            let Some(&idx) = by_id.get(id) else {
                orphan_rows += 1;
                continue;
            };
            let profile = &mut associations[idx];
            // Repeated rows for one plant accumulate
            profile.pollinators = union(&profile.pollinators, &names.intern_all(&rec.pollinators));
            profile.herbivores = union(&profile.herbivores, &names.intern_all(&rec.herbivores));
            profile.pathogens = union(&profile.pathogens, &names.intern_all(&rec.pathogens));
            profile.flower_visitors = union(&profile.flower_visitors, &names.intern_all(&rec.flower_visitors));
            profile.predators = union(&profile.predators, &names.intern_all(&rec.predators));
            profile.fungivores = union(&profile.fungivores, &names.intern_all(&rec.fungivores));
        }

        let mut fungi = vec![FungalProfile::default(); n];
        for (id, rec) in &self.fungi {
            let Some(&idx) = by_id.get(id) else {
                orphan_rows += 1;
                continue;
            };
            let profile = &mut fungi[idx];
            profile.pathogenic = union(&profile.pathogenic, &names.intern_all(&rec.pathogenic));
            profile.amf = union(&profile.amf, &names.intern_all(&rec.amf));
            profile.emf = union(&profile.emf, &names.intern_all(&rec.emf));
            profile.endophytic = union(&profile.endophytic, &names.intern_all(&rec.endophytic));
            profile.saprotrophic = union(&profile.saprotrophic, &names.intern_all(&rec.saprotrophic));
            profile.mycoparasitic = union(&profile.mycoparasitic, &names.intern_all(&rec.mycoparasitic));
            profile.entomopathogenic =
                union(&profile.entomopathogenic, &names.intern_all(&rec.entomopathogenic));
        }
        if orphan_rows > 0 {
            debug!(orphan_rows, "profile rows for plants missing from the plant table were skipped");
        }

        let lookups = InteractionLookups::new(
            intern_pairs(&mut names, &self.herbivore_predators),
            intern_pairs(&mut names, &self.insect_parasites),
            intern_pairs(&mut names, &self.pathogen_antagonists),
        );

        Ok(GuildData {
            plants: PlantTable { plants: self.plants, by_id },
            names,
            associations: AssociationStore::new(associations),
            fungi: FungalStore::new(fungi),
            lookups,
        })
    }
}

fn intern_pairs(names: &mut NameInterner, pairs: &[(String, String)]) -> FxHashMap<Sym, Vec<Sym>> {
    let mut map: FxHashMap<Sym, Vec<Sym>> = FxHashMap::default();
    for (key, value) in pairs {
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let k = names.intern(key);
        let v = names.intern(value);
        map.entry(k).or_default().push(v);
    }
    map
}
