use serde::{Deserialize, Serialize};

use crate::explanation::biocontrol_network_analysis::BiocontrolNetworkProfile;
use crate::explanation::csr_strategy_analysis::CsrStrategyProfile;
use crate::explanation::fungi_network_analysis::FungiNetworkProfile;
use crate::explanation::pathogen_control_network_analysis::PathogenControlNetworkProfile;
use crate::explanation::pest_analysis::PestProfile;
use crate::explanation::pollinator_network_analysis::PollinatorNetworkProfile;
use crate::explanation::structural_diversity_analysis::StructuralDiversityProfile;

/// Qualitative flag kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    ClimateIncompatible,
    NitrogenExcess,
    NitrogenDeficit,
    PhIncompatible,
    InsufficientStructuralDiversity,
    UnmatchedTaxa,
}

/// Warning card for potential issues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningCard {
    pub kind: FlagKind,
    pub severity: Severity,
    pub message: String,
    pub detail: String,
    pub advice: String,
}

/// Severity level for warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

/// A biocontrol agent (predator or entomopathogenic fungus) hub plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantBiocontrolHub {
    pub taxon_id: String,
    /// Plant scientific name
    pub plant_name: String,
    /// Known predators visiting this plant
    pub total_predators: usize,
    /// Known entomopathogenic fungi on this plant
    pub total_entomo_fungi: usize,
    /// Combined total biocontrol agents
    pub total_biocontrol_agents: usize,
}

/// Explanatory network summaries; these never feed back into the score
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkSummaries {
    pub pollinators: PollinatorNetworkProfile,
    pub biocontrol: BiocontrolNetworkProfile,
    pub pathogen_control: PathogenControlNetworkProfile,
    pub beneficial_fungi: FungiNetworkProfile,
    pub pests: PestProfile,
    pub csr: CsrStrategyProfile,
    /// `None` when M6 is undefined
    pub structure: Option<StructuralDiversityProfile>,
}

/// Matched (target, agent) relationship, e.g. herbivore → predator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub target: String,
    pub agent: String,
}
