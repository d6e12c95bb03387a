//! Faith's PD query engine
//!
//! Built once per process. Precomputes root depths, an Euler tour and a
//! sparse table over tour levels, giving O(1) LCA queries. A PD query sorts
//! tips by first Euler occurrence and applies
//!
//! ```text
//! PD(S) = Σ depth(tip) − Σ depth(LCA(tip_i, tip_i+1))
//! ```
//!
//! over consecutive tips, which counts every shared ancestor edge once.

use super::tree::PhyloTree;
use crate::error::{GuildError, GuildResult};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a PD query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PdResult {
    pub pd: f64,
    /// Distinct leaves that took part in the query
    pub matched: usize,
    /// Requested taxa with no leaf in the tree
    pub unmatched: usize,
}

/// Range-minimum over Euler tour positions, keyed by node level
#[derive(Debug, Clone)]
struct SparseTable {
    /// `rows[k][i]` = shallowest node in tour[i .. i + 2^k]
    rows: Vec<Vec<u32>>,
}

impl SparseTable {
    fn build(tour: &[u32], level: &[u32]) -> Self {
        let mut rows = vec![tour.to_vec()];
        let mut width = 1;
        while 2 * width <= tour.len() {
            let prev = &rows[rows.len() - 1];
            let next: Vec<u32> = (0..=tour.len() - 2 * width)
                .map(|i| {
                    let (a, b) = (prev[i], prev[i + width]);
                    if level[a as usize] <= level[b as usize] { a } else { b }
                })
                .collect();
            rows.push(next);
            width *= 2;
        }
        Self { rows }
    }

    /// Shallowest node between tour positions `l` and `r` inclusive
    fn query(&self, l: usize, r: usize, level: &[u32]) -> u32 {
        let (l, r) = if l <= r { (l, r) } else { (r, l) };
        let span = r - l + 1;
        let k = (usize::BITS - 1 - span.leading_zeros()) as usize;
        let a = self.rows[k][l];
        let b = self.rows[k][r + 1 - (1 << k)];
        if level[a as usize] <= level[b as usize] { a } else { b }
    }
}

#[derive(Debug, Clone)]
pub struct PhyloEngine {
    tree: PhyloTree,
    depth: Vec<f64>,
    level: Vec<u32>,
    first: Vec<u32>,
    sparse: SparseTable,
    taxon_to_leaf: FxHashMap<String, u32>,
}

impl PhyloEngine {
    /// Build the engine from a Newick string and `taxon_id → leaf label` pairs
    ///
    /// Pairs whose label is not a leaf of the tree are skipped (they surface
    /// later as unmatched taxa).
    pub fn build<I, K, V>(newick: &str, taxon_to_leaf: I) -> GuildResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let tree = PhyloTree::from_newick(newick)?;

        let mut mapping = FxHashMap::default();
        let mut skipped = 0usize;
        for (taxon, label) in taxon_to_leaf {
            match tree.leaf(label.as_ref()) {
                Some(leaf) => {
                    mapping.insert(taxon.into(), leaf);
                }
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, "taxon mapping entries point at labels missing from the tree");
        }

        Ok(Self::from_tree(tree, mapping))
    }

    /// Build with every leaf label acting as its own taxon ID
    pub fn build_identity(newick: &str) -> GuildResult<Self> {
        let tree = PhyloTree::from_newick(newick)?;
        let mapping = tree.leaves().map(|(n, l)| (l.to_string(), n)).collect();
        Ok(Self::from_tree(tree, mapping))
    }

    /// Load a Newick file and a `wfo_taxon_id, tree_tip` mapping table
    pub fn from_files(tree_path: &Path, mapping_path: &Path) -> Result<Self> {
        let newick = fs::read_to_string(tree_path)
            .with_context(|| format!("Failed to read tree file: {:?}", tree_path))?;
        let mapping = crate::data::loader::load_tree_mapping(mapping_path)?;
        let engine = Self::build(&newick, mapping)
            .with_context(|| format!("Failed to build phylogenetic engine from {:?}", tree_path))?;

        info!(
            nodes = engine.tree.n_nodes(),
            leaves = engine.n_leaves(),
            mapped_taxa = engine.taxon_to_leaf.len(),
            "phylogenetic engine ready"
        );
        Ok(engine)
    }

    fn from_tree(tree: PhyloTree, taxon_to_leaf: FxHashMap<String, u32>) -> Self {
        let n = tree.n_nodes();
        let mut depth = vec![0.0; n];
        let mut level = vec![0u32; n];
        let mut first = vec![0u32; n];
        let mut tour: Vec<u32> = Vec::with_capacity(2 * n);

        // (node, next child to visit)
        let mut stack: Vec<(u32, usize)> = vec![(PhyloTree::ROOT, 0)];
        tour.push(PhyloTree::ROOT);
        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let children = tree.children(node);
            if top.1 < children.len() {
                let child = children[top.1];
                top.1 += 1;
                depth[child as usize] = depth[node as usize] + tree.branch_length(child);
                level[child as usize] = level[node as usize] + 1;
                first[child as usize] = tour.len() as u32;
                tour.push(child);
                stack.push((child, 0));
            } else {
                stack.pop();
                if let Some(&(parent, _)) = stack.last() {
                    tour.push(parent);
                }
            }
        }

        let sparse = SparseTable::build(&tour, &level);
        Self { tree, depth, level, first, sparse, taxon_to_leaf }
    }

    pub fn tree(&self) -> &PhyloTree {
        &self.tree
    }

    pub fn n_leaves(&self) -> usize {
        self.tree.n_leaves()
    }

    pub fn total_branch_length(&self) -> f64 {
        self.tree.total_branch_length()
    }

    /// Mapped taxon IDs, in no particular order
    pub fn taxa(&self) -> impl Iterator<Item = &str> + '_ {
        self.taxon_to_leaf.keys().map(|k| k.as_str())
    }

    /// Leaf node for a taxon ID
    pub fn leaf_for(&self, taxon: &str) -> Option<u32> {
        self.taxon_to_leaf.get(taxon).copied()
    }

    /// Cumulative branch length from the root
    pub fn depth(&self, node: u32) -> f64 {
        self.depth[node as usize]
    }

    /// Root-to-leaf branch-length sum for a taxon
    pub fn root_distance(&self, taxon: &str) -> Option<f64> {
        self.leaf_for(taxon).map(|leaf| self.depth(leaf))
    }

    pub fn lca(&self, a: u32, b: u32) -> u32 {
        self.sparse.query(self.first[a as usize] as usize, self.first[b as usize] as usize, &self.level)
    }

    /// Root-anchored Faith's PD over taxon IDs
    pub fn pd<S: AsRef<str>>(&self, taxa: &[S]) -> GuildResult<PdResult> {
        let (mut leaves, unmatched) = self.resolve(taxa)?;
        let matched = self.sort_leaves(&mut leaves);
        Ok(PdResult { pd: self.rooted_pd_sorted(&leaves), matched, unmatched })
    }

    /// PD of the minimal subtree spanning the tips, without the root-to-MRCA stem
    pub fn pd_from_mrca<S: AsRef<str>>(&self, taxa: &[S]) -> GuildResult<PdResult> {
        let (mut leaves, unmatched) = self.resolve(taxa)?;
        let matched = self.sort_leaves(&mut leaves);
        Ok(PdResult { pd: self.mrca_pd_sorted(&leaves), matched, unmatched })
    }

    /// Rooted PD over leaf nodes; order and duplicates do not matter
    pub fn pd_of_leaves(&self, leaves: &[u32]) -> f64 {
        let mut sorted: SmallVec<[u32; 16]> = leaves.iter().copied().collect();
        self.sort_leaves(&mut sorted);
        self.rooted_pd_sorted(&sorted)
    }

    /// MRCA-anchored PD over leaf nodes
    pub fn mrca_pd_of_leaves(&self, leaves: &[u32]) -> f64 {
        let mut sorted: SmallVec<[u32; 16]> = leaves.iter().copied().collect();
        self.sort_leaves(&mut sorted);
        self.mrca_pd_sorted(&sorted)
    }

    fn resolve<S: AsRef<str>>(&self, taxa: &[S]) -> GuildResult<(SmallVec<[u32; 16]>, usize)> {
        let mut leaves = SmallVec::new();
        let mut unmatched = 0;
        for taxon in taxa {
            match self.leaf_for(taxon.as_ref()) {
                Some(leaf) => leaves.push(leaf),
                None => unmatched += 1,
            }
        }
        if leaves.is_empty() && !taxa.is_empty() {
            return Err(GuildError::InsufficientTaxa { requested: taxa.len(), unmatched });
        }
        Ok((leaves, unmatched))
    }

    /// Sort by Euler first occurrence and drop duplicates; returns the count
    fn sort_leaves(&self, leaves: &mut SmallVec<[u32; 16]>) -> usize {
        leaves.sort_unstable_by_key(|&n| self.first[n as usize]);
        leaves.dedup();
        leaves.len()
    }

    fn rooted_pd_sorted(&self, sorted: &[u32]) -> f64 {
        let tips: f64 = sorted.iter().map(|&n| self.depth(n)).sum();
        let shared: f64 = sorted.windows(2).map(|w| self.depth(self.lca(w[0], w[1]))).sum();
        tips - shared
    }

    fn mrca_pd_sorted(&self, sorted: &[u32]) -> f64 {
        match (sorted.first(), sorted.last()) {
            (Some(&a), Some(&b)) => self.rooted_pd_sorted(sorted) - self.depth(self.lca(a, b)),
            _ => 0.0,
        }
    }
}
