//! Flat-array rooted tree
//!
//! Nodes are `u32` indices into parallel arrays; children are stored in CSR
//! layout. Node 0 is always the root.

use super::newick::{self, RawNode};
use crate::error::{GuildError, GuildResult};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct PhyloTree {
    parent: Vec<Option<u32>>,
    branch_length: Vec<f64>,
    label: Vec<Option<Box<str>>>,
    child_offsets: Vec<u32>,
    child_index: Vec<u32>,
    leaf_by_label: FxHashMap<Box<str>, u32>,
    n_leaves: usize,
}

impl PhyloTree {
    pub const ROOT: u32 = 0;

    /// Parse a Newick string
    pub fn from_newick(src: &str) -> GuildResult<Self> {
        Self::from_raw(newick::parse(src)?)
    }

    pub(crate) fn from_raw(raw: Vec<RawNode>) -> GuildResult<Self> {
        let n = raw.len();
        let mut parent = Vec::with_capacity(n);
        let mut branch_length = Vec::with_capacity(n);
        let mut label = Vec::with_capacity(n);
        let mut child_offsets = Vec::with_capacity(n + 1);
        let mut child_index = Vec::with_capacity(n.saturating_sub(1));
        let mut leaf_by_label = FxHashMap::default();
        let mut n_leaves = 0;

        child_offsets.push(0);
        for (id, node) in raw.into_iter().enumerate() {
            if node.length < 0.0 {
                return Err(GuildError::NegativeBranchLength {
                    label: node.label.unwrap_or_default(),
                    length: node.length,
                });
            }
            let is_leaf = node.children.is_empty();
            let node_label = node.label.map(String::into_boxed_str);
            if is_leaf {
                n_leaves += 1;
                if let Some(l) = &node_label {
                    if leaf_by_label.insert(l.clone(), id as u32).is_some() {
                        return Err(GuildError::DuplicateLeaf(l.to_string()));
                    }
                }
            }
            parent.push(node.parent);
            branch_length.push(node.length);
            label.push(node_label);
            child_index.extend_from_slice(&node.children);
            child_offsets.push(child_index.len() as u32);
        }

        Ok(Self { parent, branch_length, label, child_offsets, child_index, leaf_by_label, n_leaves })
    }

    pub fn n_nodes(&self) -> usize {
        self.parent.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn parent(&self, node: u32) -> Option<u32> {
        self.parent[node as usize]
    }

    pub fn branch_length(&self, node: u32) -> f64 {
        self.branch_length[node as usize]
    }

    pub fn label(&self, node: u32) -> Option<&str> {
        self.label[node as usize].as_deref()
    }

    pub fn children(&self, node: u32) -> &[u32] {
        let start = self.child_offsets[node as usize] as usize;
        let end = self.child_offsets[node as usize + 1] as usize;
        &self.child_index[start..end]
    }

    pub fn is_leaf(&self, node: u32) -> bool {
        self.children(node).is_empty()
    }

    /// Leaf node carrying this label
    pub fn leaf(&self, label: &str) -> Option<u32> {
        self.leaf_by_label.get(label).copied()
    }

    /// Labelled leaves in node order
    pub fn leaves(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        (0..self.n_nodes() as u32)
            .filter(|&n| self.is_leaf(n))
            .filter_map(|n| self.label(n).map(|l| (n, l)))
    }

    pub fn total_branch_length(&self) -> f64 {
        self.branch_length.iter().sum()
    }
}
