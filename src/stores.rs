//! Read-only association stores
//!
//! Organism and fungus names are interned once to dense `u32` symbols. Each
//! plant's sets are sorted, duplicate-free symbol slices, indexed by the dense
//! plant index, so membership is a binary search and shared counts are a
//! merge walk. A plant with no row gets empty sets.

use rustc_hash::{FxHashMap, FxHashSet};

pub type Sym = u32;
pub type SymSet = Box<[Sym]>;

/// Sort, dedup and freeze a symbol list
pub fn sym_set(mut syms: Vec<Sym>) -> SymSet {
    syms.sort_unstable();
    syms.dedup();
    syms.into_boxed_slice()
}

/// |a ∩ b| for two sorted symbol slices
pub fn intersection_count(a: &[Sym], b: &[Sym]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

/// Sorted union of two sorted symbol slices
pub fn union(a: &[Sym], b: &[Sym]) -> SymSet {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    sym_set(out)
}

#[derive(Debug, Clone, Default)]
pub struct NameInterner {
    ids: FxHashMap<Box<str>, Sym>,
    names: Vec<Box<str>>,
}

impl NameInterner {
    pub fn intern(&mut self, name: &str) -> Sym {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as Sym;
        let boxed: Box<str> = name.into();
        self.names.push(boxed.clone());
        self.ids.insert(boxed, id);
        id
    }

    /// Intern every non-blank name, trimmed
    pub fn intern_all<S: AsRef<str>>(&mut self, names: &[S]) -> SymSet {
        let syms = names
            .iter()
            .map(|n| n.as_ref().trim())
            .filter(|n| !n.is_empty())
            .map(|n| self.intern(n))
            .collect();
        sym_set(syms)
    }

    pub fn get(&self, name: &str) -> Option<Sym> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, sym: Sym) -> &str {
        &self.names[sym as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Organisms recorded on one plant
#[derive(Debug, Clone, Default)]
pub struct AssociationProfile {
    pub pollinators: SymSet,
    pub herbivores: SymSet,
    pub pathogens: SymSet,
    pub flower_visitors: SymSet,
    /// hasHost + interactsWith + adjacentTo predators, merged
    pub predators: SymSet,
    pub fungivores: SymSet,
}

impl AssociationProfile {
    pub fn is_empty(&self) -> bool {
        self.pollinators.is_empty()
            && self.herbivores.is_empty()
            && self.pathogens.is_empty()
            && self.flower_visitors.is_empty()
            && self.predators.is_empty()
            && self.fungivores.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FungalCategory {
    Pathogenic,
    Amf,
    Emf,
    Endophytic,
    Saprotrophic,
    Mycoparasitic,
    Entomopathogenic,
}

impl FungalCategory {
    /// Categories counted as beneficial for shared-network scoring
    pub const BENEFICIAL: [FungalCategory; 4] = [
        FungalCategory::Amf,
        FungalCategory::Emf,
        FungalCategory::Endophytic,
        FungalCategory::Saprotrophic,
    ];
}

/// Fungi recorded on one plant, by guild category
#[derive(Debug, Clone, Default)]
pub struct FungalProfile {
    pub pathogenic: SymSet,
    pub amf: SymSet,
    pub emf: SymSet,
    pub endophytic: SymSet,
    pub saprotrophic: SymSet,
    pub mycoparasitic: SymSet,
    pub entomopathogenic: SymSet,
}

impl FungalProfile {
    pub fn category(&self, category: FungalCategory) -> &[Sym] {
        match category {
            FungalCategory::Pathogenic => &self.pathogenic,
            FungalCategory::Amf => &self.amf,
            FungalCategory::Emf => &self.emf,
            FungalCategory::Endophytic => &self.endophytic,
            FungalCategory::Saprotrophic => &self.saprotrophic,
            FungalCategory::Mycoparasitic => &self.mycoparasitic,
            FungalCategory::Entomopathogenic => &self.entomopathogenic,
        }
    }

    /// Union of the four beneficial categories
    pub fn beneficial(&self) -> SymSet {
        let mut all = Vec::new();
        for cat in FungalCategory::BENEFICIAL {
            all.extend_from_slice(self.category(cat));
        }
        sym_set(all)
    }
}

/// Plant-indexed association profiles
#[derive(Debug, Clone, Default)]
pub struct AssociationStore {
    profiles: Vec<AssociationProfile>,
}

impl AssociationStore {
    pub fn new(profiles: Vec<AssociationProfile>) -> Self {
        Self { profiles }
    }

    pub fn get(&self, plant: usize) -> &AssociationProfile {
        &self.profiles[plant]
    }

    /// Plants with at least one recorded organism
    pub fn n_with_data(&self) -> usize {
        self.profiles.iter().filter(|p| !p.is_empty()).count()
    }
}

/// Plant-indexed fungal guild profiles
#[derive(Debug, Clone, Default)]
pub struct FungalStore {
    profiles: Vec<FungalProfile>,
}

impl FungalStore {
    pub fn new(profiles: Vec<FungalProfile>) -> Self {
        Self { profiles }
    }

    pub fn get(&self, plant: usize) -> &FungalProfile {
        &self.profiles[plant]
    }
}

/// Many-to-many cross-reference tables
#[derive(Debug, Clone, Default)]
pub struct InteractionLookups {
    herbivore_predators: FxHashMap<Sym, SymSet>,
    insect_parasites: FxHashMap<Sym, SymSet>,
    pathogen_antagonists: FxHashMap<Sym, SymSet>,
    known_predators: FxHashSet<Sym>,
    known_entomopathogens: FxHashSet<Sym>,
    known_antagonists: FxHashSet<Sym>,
}

fn freeze(map: FxHashMap<Sym, Vec<Sym>>) -> FxHashMap<Sym, SymSet> {
    map.into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k, sym_set(v)))
        .collect()
}

fn values(map: &FxHashMap<Sym, SymSet>) -> FxHashSet<Sym> {
    map.values().flat_map(|v| v.iter().copied()).collect()
}

impl InteractionLookups {
    pub fn new(
        herbivore_predators: FxHashMap<Sym, Vec<Sym>>,
        insect_parasites: FxHashMap<Sym, Vec<Sym>>,
        pathogen_antagonists: FxHashMap<Sym, Vec<Sym>>,
    ) -> Self {
        let herbivore_predators = freeze(herbivore_predators);
        let insect_parasites = freeze(insect_parasites);
        let pathogen_antagonists = freeze(pathogen_antagonists);
        Self {
            known_predators: values(&herbivore_predators),
            known_entomopathogens: values(&insect_parasites),
            known_antagonists: values(&pathogen_antagonists),
            herbivore_predators,
            insect_parasites,
            pathogen_antagonists,
        }
    }

    pub fn predators_of(&self, herbivore: Sym) -> &[Sym] {
        self.herbivore_predators.get(&herbivore).map(|v| &v[..]).unwrap_or(&[])
    }

    pub fn entomopathogens_of(&self, insect: Sym) -> &[Sym] {
        self.insect_parasites.get(&insect).map(|v| &v[..]).unwrap_or(&[])
    }

    pub fn antagonists_of(&self, pathogen: Sym) -> &[Sym] {
        self.pathogen_antagonists.get(&pathogen).map(|v| &v[..]).unwrap_or(&[])
    }

    pub fn is_known_predator(&self, sym: Sym) -> bool {
        self.known_predators.contains(&sym)
    }

    pub fn is_known_entomopathogen(&self, sym: Sym) -> bool {
        self.known_entomopathogens.contains(&sym)
    }

    pub fn is_known_antagonist(&self, sym: Sym) -> bool {
        self.known_antagonists.contains(&sym)
    }

    /// (herbivore→predator, insect→fungus, pathogen→antagonist) key counts
    pub fn sizes(&self) -> (usize, usize, usize) {
        (
            self.herbivore_predators.len(),
            self.insect_parasites.len(),
            self.pathogen_antagonists.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interner_is_stable() {
        let mut names = NameInterner::default();
        let a = names.intern("Apis mellifera");
        let b = names.intern("Bombus terrestris");
        assert_eq!(names.intern("Apis mellifera"), a);
        assert_ne!(a, b);
        assert_eq!(names.name(b), "Bombus terrestris");
        assert_eq!(names.get("missing"), None);
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_intern_all_trims_and_dedups() {
        let mut names = NameInterner::default();
        let set = names.intern_all(&[" x ", "y", "", "x", "  "]);
        assert_eq!(set.len(), 2);
        assert!(set.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_intersection_and_union() {
        let a = [1, 3, 5, 7];
        let b = [2, 3, 4, 7, 9];
        assert_eq!(intersection_count(&a, &b), 2);
        assert_eq!(intersection_count(&a, &[]), 0);
        assert_eq!(&*union(&a, &b), &[1, 2, 3, 4, 5, 7, 9]);
    }

    #[test]
    fn test_lookups_unknown_key_is_empty() {
        let mut hp = FxHashMap::default();
        hp.insert(1, vec![5, 4, 5]);
        let lookups = InteractionLookups::new(hp, FxHashMap::default(), FxHashMap::default());

        assert_eq!(lookups.predators_of(1), &[4, 5]);
        assert!(lookups.predators_of(2).is_empty());
        assert!(lookups.is_known_predator(4));
        assert!(!lookups.is_known_predator(1));
        assert_eq!(lookups.sizes(), (1, 0, 0));
    }

    #[test]
    fn test_beneficial_union() {
        let profile = FungalProfile {
            amf: sym_set(vec![1, 2]),
            endophytic: sym_set(vec![2, 3]),
            pathogenic: sym_set(vec![9]),
            ..FungalProfile::default()
        };
        assert_eq!(&*profile.beneficial(), &[1, 2, 3]);
    }
}
