use ndarray::arr1;

use crate::env::{Action, Observation, RelayEnv, StateCodec, StateMode};
use crate::error::SkyrelayError;
use crate::map::Cell;

#[test]
fn test_reset_places_relay_at_start() {
    let mut env = RelayEnv::reference(StateMode::Stateful);
    let obs = env.reset();
    assert_eq!(obs.cell, Cell::new(0, 14));
    assert_eq!(obs.step, 0);
    assert_eq!(env.elapsed_steps(), 0);
    assert_eq!(env.horizon(), 50);
}

#[test]
fn test_action_indices_fixed_order() {
    assert_eq!(Action::ALL.map(Action::index), [0, 1, 2, 3]);
    assert_eq!(Action::from_index(0), Some(Action::Up));
    assert_eq!(Action::from_index(3), Some(Action::Right));
    assert_eq!(Action::from_index(4), None);
}

#[test]
fn test_legal_actions_at_corner() {
    let env = RelayEnv::reference(StateMode::Stateful);
    // bottom-left launch corner: only up and right stay on the grid
    let legal = env.legal_actions(Cell::new(0, 14));
    assert_eq!(legal, vec![Action::Up, Action::Right]);
}

#[test]
fn test_legal_actions_exclude_obstacles() {
    let env = RelayEnv::reference(StateMode::Stateful);
    // (8, 8) borders the obstacle block to its east
    assert!(!env.is_legal(Cell::new(8, 8), Action::Right));
    let legal = env.legal_actions(Cell::new(8, 8));
    assert_eq!(legal, vec![Action::Up, Action::Down, Action::Left]);
    // (9, 7) sits directly above the block
    assert!(!env.is_legal(Cell::new(9, 7), Action::Down));
}

#[test]
fn test_illegal_move_is_noop_but_consumes_time() {
    let mut env = RelayEnv::reference(StateMode::Stateful);
    env.reset();
    let r = env.min_rate(Cell::new(0, 14));

    // left from the corner: position unchanged, clock advanced, and the
    // relay is sitting on the landing cell with 49 steps left
    let outcome = env.step(Action::Left);
    assert_eq!(outcome.obs.cell, Cell::new(0, 14));
    assert_eq!(outcome.obs.step, 1);
    assert!(outcome.truncated);
    assert!(!outcome.terminated);
    assert!((outcome.reward - (r - r * 49.0)).abs() < 1e-9);
}

#[test]
fn test_try_step_rejects_illegal_move() {
    let mut env = RelayEnv::reference(StateMode::Stateful);
    env.reset();
    let result = env.try_step(Action::Left);
    assert!(matches!(
        result,
        Err(SkyrelayError::InvalidAction { action: 2, cell: (0, 14) })
    ));
    // untouched: no time consumed
    assert_eq!(env.elapsed_steps(), 0);
    assert!(env.try_step(Action::Up).is_ok());
    assert_eq!(env.elapsed_steps(), 1);
}

#[test]
fn test_premature_return_penalty() {
    let mut env = RelayEnv::reference(StateMode::Stateful);
    env.reset();
    let r_start = env.min_rate(Cell::new(0, 14));

    let first = env.step(Action::Up);
    assert!(!first.done());
    assert!((first.reward - env.min_rate(Cell::new(0, 13))).abs() < 1e-12);

    // back on the landing cell at t = 2, 48 steps early
    let second = env.step(Action::Down);
    assert!(second.truncated);
    assert!(!second.terminated);
    assert!((second.reward - (r_start - r_start * 48.0)).abs() < 1e-9);
}

#[test]
fn test_failure_to_return_penalty() {
    let mut env = RelayEnv::reference(StateMode::Stateful);
    env.reset();

    // drift east and run the clock out pinned against the far wall
    let mut last = env.step(Action::Right);
    for _ in 1..50 {
        assert!(!last.done());
        last = env.step(Action::Right);
    }
    assert_eq!(env.elapsed_steps(), 50);
    assert_eq!(last.obs.cell, Cell::new(14, 14));
    assert!(last.truncated);
    assert!(!last.terminated);
    let r = env.min_rate(Cell::new(14, 14));
    assert!((last.reward - (r - r * 10.0)).abs() < 1e-9);
}

#[test]
fn test_on_time_return_terminates_unpenalized() {
    let mut env = RelayEnv::reference(StateMode::Stateful);
    env.reset();

    // loiter one cell east of the launch pad until the last step
    let mut last = env.step(Action::Right);
    for _ in 0..24 {
        last = env.step(Action::Up);
        assert!(!last.done());
        last = env.step(Action::Down);
        assert!(!last.done());
    }
    assert_eq!(env.elapsed_steps(), 49);
    last = env.step(Action::Left);

    assert!(last.terminated);
    assert!(!last.truncated);
    assert_eq!(last.obs.cell, Cell::new(0, 14));
    assert!((last.reward - env.min_rate(Cell::new(0, 14))).abs() < 1e-12);
}

#[test]
fn test_codec_state_counts() {
    let env = RelayEnv::reference(StateMode::Stateless);
    assert_eq!(env.codec().num_states(), 225);
    let env = RelayEnv::reference(StateMode::Stateful);
    assert_eq!(env.codec().num_states(), 225 * 51);
}

#[test]
fn test_codec_index_stateful_vs_stateless() {
    let stateless = StateCodec {
        rows: 15,
        cols: 15,
        horizon: 50,
        mode: StateMode::Stateless,
    };
    let stateful = StateCodec {
        mode: StateMode::Stateful,
        ..stateless
    };

    let at_launch = Observation {
        cell: Cell::new(0, 14),
        step: 0,
    };
    let later = Observation {
        cell: Cell::new(0, 14),
        step: 1,
    };

    assert_eq!(stateless.index(&at_launch), 210);
    assert_eq!(stateless.index(&at_launch), stateless.index(&later));
    assert_eq!(stateful.index(&at_launch), 210 * 51);
    assert_eq!(stateful.index(&later), 210 * 51 + 1);
    assert!(stateful.index(&later) < stateful.num_states());
}

#[test]
fn test_codec_features_normalized() {
    let codec = StateCodec {
        rows: 15,
        cols: 15,
        horizon: 50,
        mode: StateMode::Stateful,
    };
    assert_eq!(codec.feature_len(), 3);
    let obs = Observation {
        cell: Cell::new(0, 14),
        step: 25,
    };
    assert_eq!(codec.features(&obs), arr1(&[0.0, 1.0, 0.5]));

    let codec = StateCodec {
        mode: StateMode::Stateless,
        ..codec
    };
    assert_eq!(codec.feature_len(), 2);
    assert_eq!(codec.features(&obs), arr1(&[0.0, 1.0]));
}

#[test]
fn test_reward_is_min_rate_at_new_cell() {
    let mut env = RelayEnv::reference(StateMode::Stateful);
    env.reset();
    let outcome = env.step(Action::Up);
    let expected = env.rates().min_rate(Cell::new(0, 13));
    assert!((outcome.reward - expected).abs() < 1e-12);
}
