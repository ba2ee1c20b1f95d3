// SPDX-License-Identifier: BSD-3-Clause

use figurer::{base::distribution::uniform, ConfigField, Context, FigurerError};

#[test]
fn figure_iterations_without_value_fn_reports_missing_config() {
    let mut context = Context::new();
    context
        .set_depth(1)
        .set_initial_state(vec![0.0])
        .set_policy_fn(|_state| uniform(vec![0.0, 1.0]).unwrap())
        .set_predict_fn(|state, _actuation| uniform(vec![state[0], state[0] + 1.0]).unwrap());

    let err = context.figure_iterations(1).unwrap_err();
    assert_eq!(err, FigurerError::ConfigMissing(ConfigField::ValueFn));
}

#[test]
fn figure_iterations_without_initial_state_reports_missing_config() {
    let mut context = Context::new();
    context
        .set_depth(1)
        .set_value_fn(|_state| 0.0)
        .set_policy_fn(|_state| uniform(vec![0.0, 1.0]).unwrap())
        .set_predict_fn(|state, _actuation| uniform(vec![state[0], state[0] + 1.0]).unwrap());

    let err = context.figure_iterations(1).unwrap_err();
    assert_eq!(err, FigurerError::ConfigMissing(ConfigField::InitialState));
}

#[test]
fn sample_plan_without_depth_reports_missing_config() {
    let mut context = Context::new();
    context
        .set_initial_state(vec![0.0])
        .set_value_fn(|_state| 0.0)
        .set_policy_fn(|_state| uniform(vec![0.0, 1.0]).unwrap())
        .set_predict_fn(|state, _actuation| uniform(vec![state[0], state[0] + 1.0]).unwrap());

    let err = context.sample_plan().unwrap_err();
    assert_eq!(err, FigurerError::ConfigMissing(ConfigField::Depth));
}

#[test]
fn actuation_size_mismatch_is_reported_with_both_dimensions() {
    let mut context = Context::new();
    context
        .set_actuation_size(3)
        .set_depth(1)
        .set_initial_state(vec![0.0])
        .set_value_fn(|_state| 0.0)
        .set_policy_fn(|_state| uniform(vec![0.0, 1.0]).unwrap())
        .set_predict_fn(|state, _actuation| uniform(vec![state[0], state[0] + 1.0]).unwrap());

    let err = context.figure_iterations(1).unwrap_err();
    assert_eq!(
        err,
        FigurerError::DimensionMismatch {
            expected: 3,
            found: 1
        }
    );
}

#[test]
fn state_size_mismatch_is_reported_with_both_dimensions() {
    let mut context = Context::new();
    context
        .set_state_size(3)
        .set_depth(1)
        .set_initial_state(vec![0.0, 1.0])
        .set_value_fn(|_state| 0.0)
        .set_policy_fn(|_state| uniform(vec![0.0, 1.0]).unwrap())
        .set_predict_fn(|state, _actuation| uniform(vec![state[0], state[0] + 1.0]).unwrap());

    let err = context.figure_iterations(1).unwrap_err();
    assert_eq!(
        err,
        FigurerError::DimensionMismatch {
            expected: 3,
            found: 2
        }
    );
}
