// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

/// A realized alternating sequence of states and actuations produced by
/// [`Context::sample_plan`](crate::Context::sample_plan).
///
/// `states` has one more entry than `actuations`: `states[0]` is always the
/// tree's root state, and `states[i + 1]` is the realized result of
/// applying `actuations[i]` from `states[i]`. The plan may be shorter than
/// the requested horizon if the tree hasn't been expanded that deep along
/// the greedy path — that is a normal outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub states: Vec<Vec<f64>>,
    pub actuations: Vec<Vec<f64>>,
}

impl Plan {
    pub(crate) fn new(initial_state: Vec<f64>) -> Self {
        Plan {
            states: vec![initial_state],
            actuations: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, actuation: Vec<f64>, state: Vec<f64>) {
        self.actuations.push(actuation);
        self.states.push(state);
    }
}
