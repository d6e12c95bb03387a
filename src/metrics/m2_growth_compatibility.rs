//! METRIC 2: GROWTH COMPATIBILITY (CSR CONFLICTS)
//!
//! Scores strategy conflict as the mean pairwise Euclidean distance between
//! plants in (C, S, R) space. Higher = more conflicting strategies; the
//! scorer inverts it for display.
//!
//! Plants with an undefined CSR triple are left out. Fewer than two defined
//! plants gives a neutral 0.

use super::ScoringContext;
use crate::data::{Csr, Guild};
use smallvec::SmallVec;

/// Result of M2 calculation
#[derive(Debug, Clone, PartialEq)]
pub struct M2Result {
    /// Mean pairwise CSR distance
    pub raw: f64,
    /// Plants with a valid CSR triple
    pub n_defined: usize,
    /// Pairs that contributed to the mean
    pub n_pairs: usize,
    /// Largest single pairwise distance
    pub max_distance: f64,
    /// Plant indices of the most distant pair
    pub most_conflicting: Option<(usize, usize)>,
}

pub fn calculate_m2(ctx: &ScoringContext<'_>, guild: &Guild) -> M2Result {
    let strategies: SmallVec<[(usize, Csr); 8]> = guild
        .members()
        .iter()
        .filter_map(|&p| ctx.data.plant(p).csr.map(|csr| (p, csr)))
        .collect();

    let n_defined = strategies.len();
    let mut total = 0.0;
    let mut n_pairs = 0;
    let mut max_distance: f64 = 0.0;
    let mut most_conflicting = None;

    for i in 0..n_defined {
        for j in i + 1..n_defined {
            let d = strategies[i].1.distance(&strategies[j].1);
            total += d;
            if most_conflicting.is_none() || d > max_distance {
                max_distance = d;
                most_conflicting = Some((strategies[i].0, strategies[j].0));
            }
            n_pairs += 1;
        }
    }

    let raw = if n_pairs > 0 { total / n_pairs as f64 } else { 0.0 };

    M2Result { raw, n_defined, n_pairs, max_distance, most_conflicting }
}
