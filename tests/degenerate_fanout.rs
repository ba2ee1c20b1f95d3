// SPDX-License-Identifier: BSD-3-Clause

//! Depth 1, a constant value function, and a single-point predict
//! distribution: the smallest possible tree that still exercises a full
//! expand-then-backup cycle.

use figurer::{base::distribution::uniform, Context};

fn constant_value_fn(_state: &[f64]) -> f64 {
    7.0
}

fn policy_fn(_state: &[f64]) -> figurer::Distribution {
    uniform(vec![0.0, 1.0]).unwrap()
}

fn single_point_predict_fn(state: &[f64], _actuation: &[f64]) -> figurer::Distribution {
    let mut dist = figurer::Distribution::new();
    let point: Vec<f64> = state.iter().map(|s| s + 100.0).collect();
    dist.set_dimension(point.len());
    dist.set_seed_dimension(1);
    let sample_point = point.clone();
    dist.set_sample_fn(move |_seed| sample_point.clone());
    dist.set_density_fn(move |p| if p == point { 1.0 } else { 0.0 });
    dist
}

#[test]
fn single_child_reaches_constant_value_after_backup() {
    let mut context = Context::new();
    context
        .set_depth(1)
        .set_initial_state(vec![0.0])
        .set_value_fn(constant_value_fn)
        .set_policy_fn(policy_fn)
        .set_predict_fn(single_point_predict_fn)
        .seed(1);

    context.figure_iterations(1).unwrap();
    let tree = context.tree().unwrap();
    let root = &tree.state_nodes()[&tree.root_id().unwrap()];
    assert_eq!(root.next_distribution_nodes.len(), 1);

    let did = *root.next_distribution_nodes.keys().next().unwrap();
    let dist_node = &tree.distribution_nodes()[&did];
    assert_eq!(dist_node.value, 7.0);

    // A second iteration backs the same edge up again; the estimate is
    // already exact so total_error collapses to zero.
    context.figure_iterations(1).unwrap();
    let tree = context.tree().unwrap();
    let root = &tree.state_nodes()[&tree.root_id().unwrap()];
    let did = *root.next_distribution_nodes.keys().next().unwrap();
    let dist_node = &tree.distribution_nodes()[&did];
    assert_eq!(dist_node.total_error, 0.0);
}
