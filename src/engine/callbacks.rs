// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

use crate::base::distribution::Distribution;

/// The black-box model the engine grows a tree against, owned by
/// [`Context`](crate::Context) and borrowed by
/// [`SearchTree`](crate::engine::tree::SearchTree) for the duration of a
/// single `figure_once` call.
///
/// `predict_inverse_fn` is optional: without it the engine falls back to
/// plain random exploration and never attempts the aim heuristic.
pub(crate) struct Callbacks<'a> {
    pub value_fn: &'a dyn Fn(&[f64]) -> f64,
    pub policy_fn: &'a dyn Fn(&[f64]) -> Distribution,
    pub predict_fn: &'a dyn Fn(&[f64], &[f64]) -> Distribution,
    pub predict_inverse_fn: Option<&'a dyn Fn(&[f64], &[f64]) -> Vec<f64>>,
}
