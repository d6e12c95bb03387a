//! Shared in-memory fixture: a small temperate garden plus one olive
//!
//! Tree tips double as taxon IDs (`PhyloEngine::build_identity`), except
//! `orphan`, which has no tip.

#![allow(dead_code)]

use guild_scorer::calibration::{calibrate, CancellationToken, ClimateOrganizer};
use guild_scorer::config::CalibrationParams;
use guild_scorer::data::{AssociationRecord, FungalRecord, LightPreference};
use guild_scorer::{
    plant_leaves, ClimateTier, GuildData, GuildDataBuilder, GuildScorer, PhyloEngine, Plant,
    ScorerConfig, ScoringContext,
};
use std::collections::HashSet;

use ClimateTier::{Continental, HumidTemperate, Mediterranean};

pub const GARDEN_TREE: &str = "((((malus:1,pyrus:1):1,rubus:2):1,((trifolium:0.5,vicia:0.5):1.5,ribes:2):1):1,(allium:3,mentha:3):1,olea:4);";

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn garden_data() -> GuildData {
    let plant = |id: &str, name: &str| Plant::new(id, name);
    GuildDataBuilder::new()
        .plant(
            plant("malus", "Malus domestica")
                .with_tiers(&[HumidTemperate, Continental])
                .with_csr(30.0, 50.0, 20.0)
                .with_height(6.0)
                .with_light(LightPreference::Flexible)
                .with_nitrogen_eive(6.0)
                .with_soil_reaction(6.0),
        )
        .plant(
            plant("pyrus", "Pyrus communis")
                .with_tiers(&[HumidTemperate, Continental])
                .with_csr(35.0, 45.0, 20.0)
                .with_height(8.0)
                .with_light(LightPreference::Flexible)
                .with_soil_reaction(6.5),
        )
        .plant(
            plant("trifolium", "Trifolium repens")
                .with_tiers(&[HumidTemperate, Continental])
                .with_csr(20.0, 20.0, 60.0)
                .with_height(0.3)
                .with_light(LightPreference::Sun)
                .with_nitrogen_fixer(true)
                .with_soil_reaction(6.5),
        )
        .plant(
            plant("vicia", "Vicia faba")
                .with_tiers(&[HumidTemperate])
                .with_csr(25.0, 15.0, 60.0)
                .with_height(0.8)
                .with_light(LightPreference::Flexible)
                .with_nitrogen_fixer(true)
                .with_soil_reaction(7.0),
        )
        .plant(
            plant("allium", "Allium schoenoprasum")
                .with_tiers(&[HumidTemperate, Continental])
                .with_csr(10.0, 30.0, 60.0)
                .with_height(0.5)
                .with_light(LightPreference::Sun)
                .with_nitrogen_eive(7.5),
        )
        .plant(
            plant("mentha", "Mentha spicata")
                .with_tiers(&[HumidTemperate])
                .with_csr(40.0, 20.0, 40.0)
                .with_height(0.6)
                .with_light(LightPreference::Shade)
                .with_soil_reaction(6.8),
        )
        .plant(
            plant("ribes", "Ribes nigrum")
                .with_tiers(&[HumidTemperate, Continental])
                .with_csr(30.0, 50.0, 20.0)
                .with_height(1.5)
                .with_light(LightPreference::Shade),
        )
        .plant(
            plant("rubus", "Rubus idaeus")
                .with_tiers(&[HumidTemperate, Continental])
                .with_csr(50.0, 30.0, 20.0)
                .with_height(2.0)
                .with_light(LightPreference::Flexible),
        )
        .plant(
            plant("olea", "Olea europaea")
                .with_tiers(&[Mediterranean])
                .with_csr(10.0, 80.0, 10.0)
                .with_height(8.0)
                .with_light(LightPreference::Sun)
                .with_soil_reaction(8.0),
        )
        .plant(plant("orphan", "Unplaced species").with_tiers(&[HumidTemperate]).with_height(1.0))
        .associations(
            "malus",
            AssociationRecord {
                herbivores: names(&["aphid", "codling_moth"]),
                pathogens: names(&["scab", "fireblight"]),
                pollinators: names(&["apis", "bombus", "osmia"]),
                ..Default::default()
            },
        )
        .associations(
            "pyrus",
            AssociationRecord {
                herbivores: names(&["aphid"]),
                pathogens: names(&["scab", "fireblight"]),
                pollinators: names(&["apis", "osmia"]),
                ..Default::default()
            },
        )
        .associations(
            "trifolium",
            AssociationRecord {
                pollinators: names(&["apis", "bombus"]),
                predators: names(&["ladybird"]),
                flower_visitors: names(&["syrphid"]),
                ..Default::default()
            },
        )
        .associations(
            "allium",
            AssociationRecord {
                herbivores: names(&["onion_fly"]),
                predators: names(&["lacewing"]),
                flower_visitors: names(&["syrphid"]),
                ..Default::default()
            },
        )
        .associations(
            "mentha",
            AssociationRecord {
                pollinators: names(&["apis"]),
                predators: names(&["ladybird", "lacewing"]),
                fungivores: names(&["mite"]),
                ..Default::default()
            },
        )
        .associations(
            "rubus",
            AssociationRecord {
                herbivores: names(&["aphid"]),
                pollinators: names(&["apis", "bombus"]),
                predators: names(&["ladybird"]),
                ..Default::default()
            },
        )
        .fungi(
            "malus",
            FungalRecord { pathogenic: names(&["venturia"]), amf: names(&["glomus"]), ..Default::default() },
        )
        .fungi(
            "pyrus",
            FungalRecord { pathogenic: names(&["venturia"]), amf: names(&["glomus"]), ..Default::default() },
        )
        .fungi(
            "trifolium",
            FungalRecord {
                amf: names(&["glomus", "rhizophagus"]),
                endophytic: names(&["epichloe"]),
                ..Default::default()
            },
        )
        .fungi(
            "allium",
            FungalRecord {
                amf: names(&["rhizophagus"]),
                mycoparasitic: names(&["trichoderma"]),
                entomopathogenic: names(&["beauveria"]),
                ..Default::default()
            },
        )
        .fungi(
            "mentha",
            FungalRecord {
                mycoparasitic: names(&["trichoderma"]),
                entomopathogenic: names(&["beauveria", "metarhizium"]),
                ..Default::default()
            },
        )
        .herbivore_predator("aphid", "ladybird")
        .herbivore_predator("aphid", "lacewing")
        .herbivore_predator("onion_fly", "lacewing")
        .insect_parasite("aphid", "beauveria")
        .pathogen_antagonist("venturia", "trichoderma")
        .pathogen_antagonist("scab", "trichoderma")
        .build()
        .unwrap()
}

pub fn garden_engine() -> PhyloEngine {
    PhyloEngine::build_identity(GARDEN_TREE).unwrap()
}

pub fn calibration_params(samples: usize, guild_sizes: &[usize]) -> CalibrationParams {
    CalibrationParams {
        samples_per_stratum: samples,
        guild_sizes: guild_sizes.to_vec(),
        seed: 7,
        data_version: "garden-fixture".to_string(),
        ..CalibrationParams::default()
    }
}

/// Scorer with calibration built from the fixture itself
pub fn calibrated_scorer(data: GuildData, engine: PhyloEngine, params: CalibrationParams) -> GuildScorer {
    let mut config = ScorerConfig::default();
    config.calibration = params;

    let leaves = plant_leaves(&data, &engine);
    let ctx = ScoringContext::new(&data, &engine, &config.weights, &leaves);
    let organizer = ClimateOrganizer::from_plants(&data.plants);
    let tables = calibrate(&ctx, &organizer, &config.calibration, &CancellationToken::new()).unwrap();

    GuildScorer::from_parts(data, engine, tables, config)
}

pub fn garden_scorer() -> GuildScorer {
    calibrated_scorer(garden_data(), garden_engine(), calibration_params(400, &[2, 3, 5]))
}

/// Faith's PD by walking every leaf up to the root and summing each edge once
pub fn naive_pd(engine: &PhyloEngine, leaves: &[u32]) -> f64 {
    let tree = engine.tree();
    let mut seen = HashSet::new();
    for &leaf in leaves {
        let mut node = leaf;
        while let Some(parent) = tree.parent(node) {
            if !seen.insert(node) {
                break;
            }
            node = parent;
        }
    }
    seen.iter().map(|&n| tree.branch_length(n)).sum()
}

/// Root-to-node path, root first
pub fn ancestry(engine: &PhyloEngine, node: u32) -> Vec<u32> {
    let tree = engine.tree();
    let mut path = vec![node];
    let mut cur = node;
    while let Some(parent) = tree.parent(cur) {
        path.push(parent);
        cur = parent;
    }
    path.reverse();
    path
}

/// Branch-length distance from the root, summed edge by edge
pub fn naive_depth(engine: &PhyloEngine, node: u32) -> f64 {
    let tree = engine.tree();
    ancestry(engine, node)[1..].iter().map(|&n| tree.branch_length(n)).sum()
}

/// Deepest node shared by every leaf's ancestry
pub fn naive_mrca(engine: &PhyloEngine, leaves: &[u32]) -> u32 {
    let paths: Vec<Vec<u32>> = leaves.iter().map(|&l| ancestry(engine, l)).collect();
    let shortest = paths.iter().map(Vec::len).min().unwrap_or(0);
    let mut mrca = paths[0][0];
    for i in 0..shortest {
        let node = paths[0][i];
        if paths.iter().all(|p| p[i] == node) {
            mrca = node;
        } else {
            break;
        }
    }
    mrca
}
