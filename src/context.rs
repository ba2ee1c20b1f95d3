// Copyright (c) 2026 Figurer Contributors
//
// SPDX-License-Identifier: BSD-3-Clause

use tracing::debug;

use crate::base::distribution::Distribution;
use crate::base::error::{ConfigField, FigurerError};
use crate::base::plan::Plan;
use crate::engine::callbacks::Callbacks;
use crate::engine::tree::SearchTree;
use crate::rng::EngineRng;
use crate::time::Instant;

/// The entry point: configure a `Context` with the four world-model
/// callbacks and a planning depth, drive it with [`figure_seconds`] or
/// [`figure_iterations`], then read out a plan with [`sample_plan`].
///
/// Mirrors the teacher's `Option<T>`-per-field setter pattern: every
/// setter takes `&mut self` and returns `&mut Self` so configuration can
/// be chained, and nothing is validated until a setter-dependent
/// operation actually needs it.
///
/// [`figure_seconds`]: Context::figure_seconds
/// [`figure_iterations`]: Context::figure_iterations
/// [`sample_plan`]: Context::sample_plan
pub struct Context {
    state_size: Option<usize>,
    actuation_size: Option<usize>,
    depth: Option<u32>,
    initial_state: Option<Vec<f64>>,
    value_fn: Option<Box<dyn Fn(&[f64]) -> f64>>,
    policy_fn: Option<Box<dyn Fn(&[f64]) -> Distribution>>,
    predict_fn: Option<Box<dyn Fn(&[f64], &[f64]) -> Distribution>>,
    predict_inverse_fn: Option<Box<dyn Fn(&[f64], &[f64]) -> Vec<f64>>>,
    rng: EngineRng,
    tree: Option<SearchTree>,
}

/// Borrows the four callback fields individually (rather than through a
/// `&self` method) so the borrow checker sees them as disjoint from
/// `Context::tree` and `Context::rng` — both get mutated while a
/// `Callbacks` built from this is still in scope.
fn build_callbacks<'a>(
    value_fn: &'a Option<Box<dyn Fn(&[f64]) -> f64>>,
    policy_fn: &'a Option<Box<dyn Fn(&[f64]) -> Distribution>>,
    predict_fn: &'a Option<Box<dyn Fn(&[f64], &[f64]) -> Distribution>>,
    predict_inverse_fn: &'a Option<Box<dyn Fn(&[f64], &[f64]) -> Vec<f64>>>,
) -> Result<Callbacks<'a>, FigurerError> {
    Ok(Callbacks {
        value_fn: value_fn
            .as_deref()
            .ok_or(FigurerError::ConfigMissing(ConfigField::ValueFn))?,
        policy_fn: policy_fn
            .as_deref()
            .ok_or(FigurerError::ConfigMissing(ConfigField::PolicyFn))?,
        predict_fn: predict_fn
            .as_deref()
            .ok_or(FigurerError::ConfigMissing(ConfigField::PredictFn))?,
        predict_inverse_fn: predict_inverse_fn.as_deref(),
    })
}

impl Context {
    pub fn new() -> Self {
        Context {
            state_size: None,
            actuation_size: None,
            depth: None,
            initial_state: None,
            value_fn: None,
            policy_fn: None,
            predict_fn: None,
            predict_inverse_fn: None,
            rng: EngineRng::unseeded(),
            tree: None,
        }
    }

    /// Dimension the initial state and every sampled state must satisfy.
    /// Unset (the default) skips the check.
    pub fn set_state_size(&mut self, state_size: usize) -> &mut Self {
        self.state_size = Some(state_size);
        self
    }

    /// Dimension every sampled actuation must satisfy. Unset skips the check.
    pub fn set_actuation_size(&mut self, actuation_size: usize) -> &mut Self {
        self.actuation_size = Some(actuation_size);
        self
    }

    pub fn set_depth(&mut self, depth: u32) -> &mut Self {
        self.depth = Some(depth);
        self
    }

    pub fn set_initial_state(&mut self, initial_state: Vec<f64>) -> &mut Self {
        self.initial_state = Some(initial_state);
        self
    }

    pub fn set_value_fn(&mut self, value_fn: impl Fn(&[f64]) -> f64 + 'static) -> &mut Self {
        self.value_fn = Some(Box::new(value_fn));
        self
    }

    pub fn set_policy_fn(&mut self, policy_fn: impl Fn(&[f64]) -> Distribution + 'static) -> &mut Self {
        self.policy_fn = Some(Box::new(policy_fn));
        self
    }

    pub fn set_predict_fn(
        &mut self,
        predict_fn: impl Fn(&[f64], &[f64]) -> Distribution + 'static,
    ) -> &mut Self {
        self.predict_fn = Some(Box::new(predict_fn));
        self
    }

    /// Enables the aim heuristic. Without this, expansion never attempts
    /// to redirect a sampled actuation toward an existing nearby state.
    pub fn set_predict_inverse_fn(
        &mut self,
        predict_inverse_fn: impl Fn(&[f64], &[f64]) -> Vec<f64> + 'static,
    ) -> &mut Self {
        self.predict_inverse_fn = Some(Box::new(predict_inverse_fn));
        self
    }

    /// Seeds the engine's RNG so `figure_*`/`sample_plan` are reproducible
    /// given deterministic callbacks. Without this, the RNG falls back to
    /// OS entropy on first use.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.rng = EngineRng::seed(seed);
        self
    }

    /// The number of `figure_once` iterations this tree has run since it
    /// was last (re)planted. Resets to 0 whenever `initial_state` changes.
    pub fn iterations_run(&self) -> u64 {
        self.tree.as_ref().map_or(0, SearchTree::iterations_run)
    }

    /// Read-only access to the underlying tree, for introspection and
    /// testing. `None` until the root has been planted by the first
    /// `figure_*` or `sample_plan` call.
    pub fn tree(&self) -> Option<&SearchTree> {
        self.tree.as_ref()
    }

    /// Validates configuration and lazily (re)plants the root state node.
    ///
    /// Called at the start of both `figure_seconds` and `figure_iterations`
    /// (and, for robustness, `sample_plan`): on the first call, or whenever
    /// the configured `initial_state` no longer matches the tree's
    /// recorded root, the tree is reset and a fresh root is grown from the
    /// current `initial_state`.
    fn ensure_consistent_state(&mut self) -> Result<(), FigurerError> {
        let depth = self.depth.ok_or(FigurerError::ConfigMissing(ConfigField::Depth))?;
        if depth < 1 {
            return Err(FigurerError::ConfigInconsistent(format!(
                "depth must be >= 1, got {depth}"
            )));
        }

        let initial_state = self
            .initial_state
            .clone()
            .ok_or(FigurerError::ConfigMissing(ConfigField::InitialState))?;
        if initial_state.is_empty() {
            return Err(FigurerError::ConfigInconsistent(
                "initial_state must be non-empty".to_string(),
            ));
        }
        if let Some(state_size) = self.state_size {
            if initial_state.len() != state_size {
                return Err(FigurerError::DimensionMismatch {
                    expected: state_size,
                    found: initial_state.len(),
                });
            }
        }

        let callbacks = build_callbacks(
            &self.value_fn,
            &self.policy_fn,
            &self.predict_fn,
            &self.predict_inverse_fn,
        )?;

        let needs_reset = match &self.tree {
            None => true,
            Some(tree) => !tree.is_rooted_at(&initial_state),
        };

        if needs_reset {
            debug!("initial_state changed (or first call): replanting root");
            let mut tree = SearchTree::new(depth);
            tree.reset_with_root(initial_state, &callbacks)?;

            if let Some(actuation_size) = self.actuation_size {
                let root_id = tree.root_id().expect("reset_with_root just planted one");
                if let Some(found) = tree.state_nodes()[&root_id]
                    .next_actuation_distribution
                    .dimension()
                {
                    if found != actuation_size {
                        return Err(FigurerError::DimensionMismatch {
                            expected: actuation_size,
                            found,
                        });
                    }
                }
            }

            self.tree = Some(tree);
        }

        Ok(())
    }

    /// Runs `figure_once` iterations until `seconds` of wall-clock time
    /// have elapsed. `seconds <= 0.0` runs zero iterations.
    pub fn figure_seconds(&mut self, seconds: f64) -> Result<(), FigurerError> {
        self.ensure_consistent_state()?;
        let callbacks = build_callbacks(
            &self.value_fn,
            &self.policy_fn,
            &self.predict_fn,
            &self.predict_inverse_fn,
        )?;
        let start = Instant::now();
        while start.elapsed().as_secs_f64() < seconds {
            self.tree.as_mut().unwrap().figure_once(&callbacks, self.rng.get())?;
        }
        Ok(())
    }

    /// Runs exactly `iterations` `figure_once` iterations. `iterations <= 0`
    /// is a no-op.
    pub fn figure_iterations(&mut self, iterations: i64) -> Result<(), FigurerError> {
        self.ensure_consistent_state()?;
        let callbacks = build_callbacks(
            &self.value_fn,
            &self.policy_fn,
            &self.predict_fn,
            &self.predict_inverse_fn,
        )?;
        for _ in 0..iterations.max(0) {
            self.tree.as_mut().unwrap().figure_once(&callbacks, self.rng.get())?;
        }
        Ok(())
    }

    /// Realizes a plan of the configured `depth`. See [`Context::sample_plan_to`]
    /// for a caller-chosen horizon.
    pub fn sample_plan(&mut self) -> Result<Plan, FigurerError> {
        let depth = self.depth.ok_or(FigurerError::ConfigMissing(ConfigField::Depth))?;
        self.sample_plan_to(depth)
    }

    /// Realizes a plan up to `horizon` steps long (shorter if the greedy
    /// path runs off the expanded part of the tree).
    pub fn sample_plan_to(&mut self, horizon: u32) -> Result<Plan, FigurerError> {
        self.ensure_consistent_state()?;
        Ok(self.tree.as_ref().unwrap().sample_plan(horizon, self.rng.get()))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
