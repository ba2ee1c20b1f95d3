// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

use std::collections::BTreeMap;

use crate::base::distribution::Distribution;
use crate::base::spatial_index::SpatialIndex;

/// The witness datum on a state-node -> distribution-node edge: the
/// actuation that was sampled to produce the child distribution.
#[derive(Clone, Debug)]
pub struct StateToDistributionEdge {
    pub actuation: Vec<f64>,
}

/// The witness datum on a distribution-node -> state-node edge: the parent
/// distribution's relative density at the child's state.
#[derive(Clone, Debug)]
pub struct DistributionToStateEdge {
    pub density: f64,
}

/// One state in the search tree.
///
/// A state node's children are distribution nodes reached by sampling an
/// actuation from `next_actuation_distribution`. `value`/`child_error`/
/// `sparsity_error`/`total_error` are recomputed by
/// [`SearchTree`](crate::engine::tree::SearchTree)'s backup pass and start
/// out equal to the node's own `direct_value` with zero error until it has
/// been visited at least once.
pub struct StateNode {
    pub id: u64,
    pub state: Vec<f64>,
    pub next_actuation_distribution: Distribution,
    pub direct_value: f64,
    pub value: f64,
    pub child_error: f64,
    pub sparsity_error: f64,
    pub total_error: f64,
    pub depth: u32,
    pub next_distribution_nodes: BTreeMap<u64, StateToDistributionEdge>,
    /// Every actuation this node has sampled so far, kept so the aim
    /// heuristic can judge how novel a candidate actuation is.
    pub actuations_so_far: SpatialIndex,
}

impl StateNode {
    pub(crate) fn new(
        id: u64,
        state: Vec<f64>,
        direct_value: f64,
        next_actuation_distribution: Distribution,
    ) -> Self {
        StateNode {
            id,
            state,
            next_actuation_distribution,
            direct_value,
            value: direct_value,
            child_error: 0.0,
            sparsity_error: 0.0,
            total_error: 0.0,
            depth: 0,
            next_distribution_nodes: BTreeMap::new(),
            actuations_so_far: SpatialIndex::new(),
        }
    }
}

/// One distribution in the search tree.
///
/// A distribution node's children are state nodes reached by sampling a
/// next state from `next_state_distribution`.
pub struct DistributionNode {
    pub id: u64,
    pub next_state_distribution: Distribution,
    pub value: f64,
    pub child_error: f64,
    pub sparsity_error: f64,
    pub total_error: f64,
    pub depth: u32,
    pub next_state_nodes: BTreeMap<u64, DistributionToStateEdge>,
}

impl DistributionNode {
    pub(crate) fn new(id: u64, next_state_distribution: Distribution, value: f64) -> Self {
        DistributionNode {
            id,
            next_state_distribution,
            value,
            child_error: 0.0,
            sparsity_error: 0.0,
            total_error: 0.0,
            depth: 0,
            next_state_nodes: BTreeMap::new(),
        }
    }
}
