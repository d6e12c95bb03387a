//! Phylogenetic distance engine
//!
//! - `newick`: tree-description parser
//! - `tree`: flat-array rooted tree
//! - `engine`: Euler-tour LCA and Faith's PD queries

pub mod engine;
mod newick;
pub mod tree;

pub use engine::{PdResult, PhyloEngine};
pub use tree::PhyloTree;
