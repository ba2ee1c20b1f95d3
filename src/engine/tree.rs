// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

use std::collections::BTreeMap;

use rand::{rngs::SmallRng, Rng};
use tracing::{debug, trace};

use crate::base::error::FigurerError;
use crate::base::plan::Plan;
use crate::base::spatial_index::{self, SpatialIndex};
use crate::engine::callbacks::Callbacks;
use crate::engine::node::{DistributionNode, DistributionToStateEdge, StateNode, StateToDistributionEdge};

/// The minimum distribution-relative density (as a fraction of the density
/// at the freshly sampled point) that an existing nearby state must retain
/// before `create_from_distribution_node` will reuse it instead of minting
/// a new state node.
const REUSE_DENSITY_FLOOR: f64 = 0.1;

/// Aim heuristic: how much closer the inverse-predicted landing point must
/// be to the target than the original sample, measured in squared distance.
const AIM_IMPROVEMENT_FACTOR: f64 = 0.04;

/// Aim heuristic: how much worse (times this factor) the aim actuation's
/// density-weighted novelty may be relative to the original actuation's
/// before the aim is rejected in favor of the original.
const AIM_ACCEPT_FACTOR: f64 = 0.2;

/// The minimum number of distribution children a state node must have
/// before `create_or_explore_from_state_node` will ever choose to refine
/// (explore an existing child) rather than expand (create a new one).
const STATE_MIN_FANOUT: usize = 3;

/// The minimum number of state children a distribution node must have
/// before `create_or_explore_from_distribution_node` will ever refine.
const DISTRIBUTION_MIN_FANOUT: usize = 2;

/// EWMA weight given to the previous `avg_dist_sparsity` estimate when
/// folding in a freshly observed distribution-node sparsity.
const AVG_DIST_SPARSITY_DECAY: f64 = 0.95;

/// Weight blended in from the runner-up child when computing a state
/// node's optimistic upper bound, so a single outlier child can't make the
/// node look arbitrarily more promising than its next-best alternative.
const CHILD_HI_BLEND: f64 = 0.1;

/// The incrementally grown bipartite tree of state and distribution nodes.
///
/// `SearchTree` holds no callbacks and no RNG of its own — both are
/// supplied by [`Context`](crate::Context) on each call, which keeps the
/// tree's own state limited to the node tables and the handful of running
/// statistics the backup formulas need.
pub struct SearchTree {
    configured_depth: u32,
    state_nodes: BTreeMap<u64, StateNode>,
    distribution_nodes: BTreeMap<u64, DistributionNode>,
    state_to_node_id: SpatialIndex,
    initial_state_node_id: Option<u64>,
    next_state_node_id: u64,
    next_distribution_node_id: u64,
    root_spread: Option<f64>,
    max_value_so_far: Option<f64>,
    min_value_so_far: Option<f64>,
    avg_dist_sparsity: Option<f64>,
    iterations_run: u64,
}

impl SearchTree {
    pub(crate) fn new(configured_depth: u32) -> Self {
        SearchTree {
            configured_depth,
            state_nodes: BTreeMap::new(),
            distribution_nodes: BTreeMap::new(),
            state_to_node_id: SpatialIndex::new(),
            initial_state_node_id: None,
            next_state_node_id: 0,
            next_distribution_node_id: 0,
            root_spread: None,
            max_value_so_far: None,
            min_value_so_far: None,
            avg_dist_sparsity: None,
            iterations_run: 0,
        }
    }

    pub fn state_nodes(&self) -> &BTreeMap<u64, StateNode> {
        &self.state_nodes
    }

    pub fn distribution_nodes(&self) -> &BTreeMap<u64, DistributionNode> {
        &self.distribution_nodes
    }

    pub fn root_id(&self) -> Option<u64> {
        self.initial_state_node_id
    }

    pub fn root_spread(&self) -> Option<f64> {
        self.root_spread
    }

    pub fn iterations_run(&self) -> u64 {
        self.iterations_run
    }

    pub(crate) fn is_rooted_at(&self, initial_state: &[f64]) -> bool {
        match self.initial_state_node_id {
            Some(id) => self.state_nodes[&id].state == initial_state,
            None => false,
        }
    }

    /// Wipes the tree and plants a fresh root at `initial_state`. Called by
    /// `Context::ensure_consistent_state` the first time it runs, and again
    /// whenever the configured initial state changes underneath it.
    pub(crate) fn reset_with_root(
        &mut self,
        initial_state: Vec<f64>,
        callbacks: &Callbacks<'_>,
    ) -> Result<(), FigurerError> {
        self.state_nodes.clear();
        self.distribution_nodes.clear();
        self.state_to_node_id = SpatialIndex::new();
        self.next_state_node_id = 0;
        self.next_distribution_node_id = 0;
        self.root_spread = None;
        self.max_value_so_far = None;
        self.min_value_so_far = None;
        self.avg_dist_sparsity = None;
        self.iterations_run = 0;

        let direct_value = (callbacks.value_fn)(&initial_state);
        let policy_dist = (callbacks.policy_fn)(&initial_state);
        let root_id = self.alloc_state_node_id();
        self.state_nodes.insert(
            root_id,
            StateNode::new(root_id, initial_state.clone(), direct_value, policy_dist),
        );
        self.state_to_node_id.add(root_id, initial_state)?;
        self.record_value_extent(direct_value);
        self.initial_state_node_id = Some(root_id);
        debug!(root_id, direct_value, "planted new root state node");
        Ok(())
    }

    fn alloc_state_node_id(&mut self) -> u64 {
        let id = self.next_state_node_id;
        self.next_state_node_id += 1;
        id
    }

    fn alloc_distribution_node_id(&mut self) -> u64 {
        let id = self.next_distribution_node_id;
        self.next_distribution_node_id += 1;
        id
    }

    fn record_value_extent(&mut self, value: f64) {
        self.max_value_so_far = Some(self.max_value_so_far.map_or(value, |m| m.max(value)));
        self.min_value_so_far = Some(self.min_value_so_far.map_or(value, |m| m.min(value)));
    }

    fn is_grandchild(&self, sid: u64, nid: u64) -> bool {
        let Some(state_node) = self.state_nodes.get(&sid) else {
            return false;
        };
        state_node.next_distribution_nodes.keys().any(|did| {
            self.distribution_nodes
                .get(did)
                .is_some_and(|dnode| dnode.next_state_nodes.contains_key(&nid))
        })
    }

    /// Runs one tree-growth iteration: descends `configured_depth` plies
    /// from the root alternately expanding/refining state and distribution
    /// nodes, then backs the visited path up in reverse.
    pub(crate) fn figure_once(
        &mut self,
        callbacks: &Callbacks<'_>,
        rng: &mut SmallRng,
    ) -> Result<(), FigurerError> {
        let root_id = self
            .initial_state_node_id
            .expect("figure_once requires ensure_consistent_state to have planted a root");

        let mut visited_state_nodes = vec![root_id];
        let mut visited_distribution_nodes = Vec::with_capacity(self.configured_depth as usize);

        let mut current_sid = root_id;
        for _ in 0..self.configured_depth {
            let did = self.create_or_explore_from_state_node(current_sid, callbacks, rng)?;
            visited_distribution_nodes.push(did);
            let next_sid = self.create_or_explore_from_distribution_node(did, callbacks, rng)?;
            visited_state_nodes.push(next_sid);
            current_sid = next_sid;
        }

        for i in (0..visited_distribution_nodes.len()).rev() {
            self.refresh_distribution_node(visited_distribution_nodes[i]);
            self.refresh_state_node(visited_state_nodes[i]);
        }

        self.iterations_run += 1;
        Ok(())
    }

    /// Expands a fresh distribution child from `sid`, or refines an
    /// existing one if `sid` already has at least [`STATE_MIN_FANOUT`]
    /// children and its sparsity error no longer exceeds its child error.
    fn create_or_explore_from_state_node(
        &mut self,
        sid: u64,
        callbacks: &Callbacks<'_>,
        rng: &mut SmallRng,
    ) -> Result<u64, FigurerError> {
        let (num_children, sparsity_error, child_error) = {
            let state_node = &self.state_nodes[&sid];
            (
                state_node.next_distribution_nodes.len(),
                state_node.sparsity_error,
                state_node.child_error,
            )
        };

        if num_children < STATE_MIN_FANOUT || sparsity_error > child_error {
            return self.create_from_state_node(sid, callbacks, rng);
        }

        let state_node = &self.state_nodes[&sid];
        let mut best: Option<(u64, f64)> = None;
        for did in state_node.next_distribution_nodes.keys() {
            let dnode = &self.distribution_nodes[did];
            let score = dnode.value + dnode.total_error;
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((*did, score));
            }
        }
        Ok(best.expect("num_children >= STATE_MIN_FANOUT > 0").0)
    }

    /// Samples a new actuation (possibly redirected by the aim heuristic)
    /// from `sid`'s policy, asks the world model for the resulting
    /// distribution over next states, and registers a fresh distribution
    /// child for it.
    fn create_from_state_node(
        &mut self,
        sid: u64,
        callbacks: &Callbacks<'_>,
        rng: &mut SmallRng,
    ) -> Result<u64, FigurerError> {
        let state = self.state_nodes[&sid].state.clone();
        let mut actuation = self.state_nodes[&sid].next_actuation_distribution.sample(rng)?;
        let mut next_dist = (callbacks.predict_fn)(&state, &actuation);

        if let Some(predict_inverse_fn) = callbacks.predict_inverse_fn {
            if let Some((aim_actuation, aim_dist)) =
                self.try_aim(sid, &state, &actuation, &next_dist, predict_inverse_fn, callbacks, rng)?
            {
                trace!(sid, "aim heuristic redirected actuation");
                actuation = aim_actuation;
                next_dist = aim_dist;
            }
        }

        let did = self.alloc_distribution_node_id();
        let parent_value = self.state_nodes[&sid].value;
        self.distribution_nodes
            .insert(did, DistributionNode::new(did, next_dist, parent_value));

        let state_node = self.state_nodes.get_mut(&sid).unwrap();
        state_node
            .next_distribution_nodes
            .insert(did, StateToDistributionEdge { actuation: actuation.clone() });
        let actuation_idx = state_node.actuations_so_far.len() as u64;
        state_node.actuations_so_far.add(actuation_idx, actuation)?;

        Ok(did)
    }

    /// The aim heuristic: having sampled `actuation` and landed on
    /// `next_dist`, see whether the inverse model can instead aim at an
    /// existing nearby state closely enough, and cheaply enough, to be
    /// worth preferring over the original random sample.
    #[allow(clippy::too_many_arguments)]
    fn try_aim(
        &self,
        sid: u64,
        state: &[f64],
        actuation: &[f64],
        next_dist: &crate::base::distribution::Distribution,
        predict_inverse_fn: &(dyn Fn(&[f64], &[f64]) -> Vec<f64>),
        callbacks: &Callbacks<'_>,
        rng: &mut SmallRng,
    ) -> Result<Option<(Vec<f64>, crate::base::distribution::Distribution)>, FigurerError> {
        let x = next_dist.sample(rng)?;
        let (nid, near) = self.state_to_node_id.closest(&x)?;
        if self.is_grandchild(sid, nid) {
            return Ok(None);
        }

        let aim_actuation = predict_inverse_fn(state, &near);
        let aim_dist = (callbacks.predict_fn)(state, &aim_actuation);
        let aim_x = aim_dist.sample(rng)?;

        let d0_sq = spatial_index::squared_distance(&x, &near);
        let da_sq = spatial_index::squared_distance(&aim_x, &near);
        if !(da_sq < AIM_IMPROVEMENT_FACTOR * d0_sq) {
            return Ok(None);
        }

        let state_node = &self.state_nodes[&sid];
        let novelty = |a: &[f64]| state_node.actuations_so_far.closest_distance(a).unwrap_or(1.0);
        let aim_density = state_node.next_actuation_distribution.density(&aim_actuation);
        let original_density = state_node.next_actuation_distribution.density(actuation);
        let accept = aim_density * novelty(&aim_actuation)
            > AIM_ACCEPT_FACTOR * original_density * novelty(actuation);

        if accept {
            Ok(Some((aim_actuation, aim_dist)))
        } else {
            Ok(None)
        }
    }

    /// Expands a fresh state child from `did`, or refines an existing one
    /// if `did` already has at least [`DISTRIBUTION_MIN_FANOUT`] children
    /// and its sparsity error no longer exceeds its child error.
    fn create_or_explore_from_distribution_node(
        &mut self,
        did: u64,
        callbacks: &Callbacks<'_>,
        rng: &mut SmallRng,
    ) -> Result<u64, FigurerError> {
        let (num_children, sparsity_error, child_error) = {
            let dnode = &self.distribution_nodes[&did];
            let sparsity_error = if dnode.next_state_nodes.len() < DISTRIBUTION_MIN_FANOUT {
                self.default_sparsity_error_for_distribution_node()
            } else {
                dnode.sparsity_error
            };
            (dnode.next_state_nodes.len(), sparsity_error, dnode.child_error)
        };

        if num_children == 0 || sparsity_error > child_error {
            return self.create_from_distribution_node(did, callbacks, rng);
        }

        let dnode = &self.distribution_nodes[&did];
        let mut best: Option<(u64, f64)> = None;
        for sid in dnode.next_state_nodes.keys() {
            let s = &self.state_nodes[sid];
            let score = s.value + s.total_error;
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((*sid, score));
            }
        }
        Ok(best.expect("num_children > 0").0)
    }

    /// Samples a next state from `did`'s distribution. If a registered
    /// state already sits close enough to keep nontrivial density under
    /// that distribution, reuses it with a fresh edge instead of minting a
    /// new state node.
    fn create_from_distribution_node(
        &mut self,
        did: u64,
        callbacks: &Callbacks<'_>,
        rng: &mut SmallRng,
    ) -> Result<u64, FigurerError> {
        let x = self.distribution_nodes[&did].next_state_distribution.sample(rng)?;
        let s_d = self.distribution_nodes[&did].next_state_distribution.density(&x);

        let (nid, near) = self.state_to_node_id.closest(&x)?;
        let already_child = self.distribution_nodes[&did].next_state_nodes.contains_key(&nid);

        if !already_child {
            let near_density = self.distribution_nodes[&did].next_state_distribution.density(&near);
            if near_density > REUSE_DENSITY_FLOOR * s_d {
                self.distribution_nodes
                    .get_mut(&did)
                    .unwrap()
                    .next_state_nodes
                    .insert(nid, DistributionToStateEdge { density: near_density });
                trace!(did, nid, "reused existing state node");
                return Ok(nid);
            }
        }

        let direct_value = (callbacks.value_fn)(&x);
        let policy_dist = (callbacks.policy_fn)(&x);
        let new_id = self.alloc_state_node_id();
        self.state_nodes
            .insert(new_id, StateNode::new(new_id, x.clone(), direct_value, policy_dist));
        self.state_to_node_id.add(new_id, x.clone())?;
        self.record_value_extent(direct_value);

        self.distribution_nodes
            .get_mut(&did)
            .unwrap()
            .next_state_nodes
            .insert(new_id, DistributionToStateEdge { density: s_d });
        debug!(new_id, direct_value, "created new state node");
        Ok(new_id)
    }

    /// Recomputes a state node's value/error fields from its current
    /// distribution children. A no-op on the bounds themselves if the node
    /// has no children yet (it then just reports its own direct value).
    fn refresh_state_node(&mut self, sid: u64) {
        let is_root = Some(sid) == self.initial_state_node_id;
        let child_ids: Vec<u64> = self.state_nodes[&sid].next_distribution_nodes.keys().copied().collect();

        if child_ids.is_empty() {
            let direct_value = self.state_nodes[&sid].direct_value;
            let state_node = self.state_nodes.get_mut(&sid).unwrap();
            state_node.value = direct_value;
            state_node.child_error = 0.0;
            state_node.sparsity_error = 0.0;
            state_node.total_error = 0.0;
            state_node.depth = 0;
            return;
        }

        let mut max_v = f64::NEG_INFINITY;
        let mut min_v = f64::INFINITY;
        let mut max_v_depth = 0u32;
        let mut top1 = f64::NEG_INFINITY;
        let mut top2 = f64::NEG_INFINITY;
        let mut max_v_minus_err = f64::NEG_INFINITY;

        for did in &child_ids {
            let d = &self.distribution_nodes[did];
            if d.value > max_v {
                max_v = d.value;
                max_v_depth = d.depth;
            }
            if d.value < min_v {
                min_v = d.value;
            }
            let plus = d.value + d.total_error;
            if plus > top1 {
                top2 = top1;
                top1 = plus;
            } else if plus > top2 {
                top2 = plus;
            }
            let minus = d.value - d.total_error;
            if minus > max_v_minus_err {
                max_v_minus_err = minus;
            }
        }
        if child_ids.len() == 1 {
            top2 = top1;
        }

        let this_depth = max_v_depth + 1;
        let num_children = child_ids.len();

        let sparsity_error = if num_children < 2 {
            self.default_sparsity_error_for_state_node() * this_depth as f64 / self.configured_depth as f64
        } else {
            (max_v - min_v).max(0.01) / num_children as f64
        };

        let child_lo = max_v_minus_err;
        let child_hi_floor = child_lo.max(top2);
        let child_hi = child_hi_floor + CHILD_HI_BLEND * (top1 - child_hi_floor);

        let direct_value = self.state_nodes[&sid].direct_value;
        let final_lo = (direct_value + this_depth as f64 * child_lo) / (this_depth as f64 + 1.0);
        let final_hi = (direct_value + this_depth as f64 * child_hi) / (this_depth as f64 + 1.0);

        let value = (final_lo + final_hi) / 2.0;
        let child_error = value - final_lo;
        let total_error = (child_error.powi(2) + sparsity_error.powi(2)).sqrt();

        if is_root && num_children > 2 {
            self.root_spread = Some(max_v - min_v);
        }

        let state_node = self.state_nodes.get_mut(&sid).unwrap();
        state_node.value = value;
        state_node.child_error = child_error;
        state_node.sparsity_error = sparsity_error;
        state_node.total_error = total_error;
        state_node.depth = this_depth;
    }

    fn default_sparsity_error_for_state_node(&self) -> f64 {
        if let Some(root_spread) = self.root_spread {
            return root_spread;
        }
        if let (Some(max_v), Some(min_v)) = (self.max_value_so_far, self.min_value_so_far) {
            if max_v - min_v > 1.0 {
                return max_v - min_v;
            }
        }
        1000.0
    }

    /// Recomputes a distribution node's value/error fields from its
    /// current state children, and folds the observed sparsity into the
    /// running `avg_dist_sparsity` estimate.
    fn refresh_distribution_node(&mut self, did: u64) {
        let child_ids: Vec<u64> = self.distribution_nodes[&did].next_state_nodes.keys().copied().collect();

        if child_ids.is_empty() {
            let sparsity_error = self.default_sparsity_error_for_distribution_node();
            let dnode = self.distribution_nodes.get_mut(&did).unwrap();
            dnode.value = 0.0;
            dnode.child_error = 0.0;
            dnode.sparsity_error = sparsity_error;
            dnode.total_error = sparsity_error;
            dnode.depth = 0;
            return;
        }

        let n = child_ids.len();
        let mut sum_v = 0.0;
        let mut sum_sq_total_err = 0.0;
        let mut max_v = f64::NEG_INFINITY;
        let mut min_v = f64::INFINITY;
        let mut max_depth = 0u32;
        for sid in &child_ids {
            let s = &self.state_nodes[sid];
            sum_v += s.value;
            sum_sq_total_err += s.total_error.powi(2);
            if s.value > max_v {
                max_v = s.value;
            }
            if s.value < min_v {
                min_v = s.value;
            }
            if s.depth > max_depth {
                max_depth = s.depth;
            }
        }

        let value = sum_v / n as f64;
        let child_error = sum_sq_total_err.sqrt() / n as f64;
        let sparsity_error = if n < 2 {
            self.default_sparsity_error_for_distribution_node()
        } else {
            (max_v - min_v + child_error) / n as f64
        };
        let total_error = (child_error.powi(2) + sparsity_error.powi(2)).sqrt();

        if n > 1 {
            let new_estimate = ((total_error - child_error) * n as f64).max(0.01);
            self.avg_dist_sparsity = Some(match self.avg_dist_sparsity {
                None => new_estimate,
                Some(prev) => AVG_DIST_SPARSITY_DECAY * prev + (1.0 - AVG_DIST_SPARSITY_DECAY) * new_estimate,
            });
        }

        let dnode = self.distribution_nodes.get_mut(&did).unwrap();
        dnode.value = value;
        dnode.child_error = child_error;
        dnode.sparsity_error = sparsity_error;
        dnode.total_error = total_error;
        dnode.depth = max_depth;
    }

    fn default_sparsity_error_for_distribution_node(&self) -> f64 {
        if let Some(avg) = self.avg_dist_sparsity {
            return avg;
        }
        if let Some(root_spread) = self.root_spread {
            return root_spread;
        }
        if let (Some(max_v), Some(min_v)) = (self.max_value_so_far, self.min_value_so_far) {
            return max_v - min_v;
        }
        1000.0
    }

    /// Greedily realizes a plan: at each state, follow the distribution
    /// child with the greatest value, sample uniformly among that
    /// distribution's state children, and repeat up to `horizon` times.
    /// Stops early (without error) if the path runs off the expanded part
    /// of the tree.
    pub(crate) fn sample_plan(&self, horizon: u32, rng: &mut SmallRng) -> Plan {
        let root_id = self
            .initial_state_node_id
            .expect("sample_plan requires ensure_consistent_state to have planted a root");
        let mut plan = Plan::new(self.state_nodes[&root_id].state.clone());
        let mut current_sid = root_id;

        for _ in 0..horizon {
            let state_node = &self.state_nodes[&current_sid];
            if state_node.next_distribution_nodes.is_empty() {
                break;
            }

            let mut best_did = None;
            let mut best_value = f64::NEG_INFINITY;
            for did in state_node.next_distribution_nodes.keys() {
                let dnode = &self.distribution_nodes[did];
                if dnode.value > best_value {
                    best_value = dnode.value;
                    best_did = Some(*did);
                }
            }
            let did = best_did.expect("next_distribution_nodes is non-empty");
            let actuation = state_node.next_distribution_nodes[&did].actuation.clone();

            let dnode = &self.distribution_nodes[&did];
            if dnode.next_state_nodes.is_empty() {
                break;
            }
            let ids: Vec<u64> = dnode.next_state_nodes.keys().copied().collect();
            let next_sid = ids[rng.random_range(0..ids.len())];
            let next_state = self.state_nodes[&next_sid].state.clone();

            plan.push(actuation, next_state);
            current_sid = next_sid;
        }

        plan
    }
}
