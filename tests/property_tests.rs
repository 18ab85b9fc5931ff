#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;
    use skyrelay::env::{Action, RelayEnv, StateMode};

    fn action_sequence() -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(0usize..4, 1..=60)
    }

    proptest! {
        #[test]
        fn relay_never_leaves_free_cells(sequence in action_sequence()) {
            let mut env = RelayEnv::reference(StateMode::Stateful);
            env.reset();
            for index in sequence {
                let action = Action::from_index(index).unwrap();
                let outcome = env.step(action);
                let cell = env.relay_position();
                prop_assert!(env.map().in_bounds(cell.col as i64, cell.row as i64));
                prop_assert!(!env.map().is_obstacle(cell));
                if outcome.done() {
                    break;
                }
            }
        }

        #[test]
        fn episode_always_ends_by_the_horizon(sequence in action_sequence()) {
            let mut env = RelayEnv::reference(StateMode::Stateful);
            env.reset();
            let mut done = false;
            // cycle the sequence so the walk always reaches the horizon
            for index in sequence.iter().cycle().take(60) {
                let outcome = env.step(Action::from_index(*index).unwrap());
                if outcome.done() {
                    done = true;
                    break;
                }
            }
            prop_assert!(done);
            prop_assert!(env.elapsed_steps() <= env.horizon());
        }

        #[test]
        fn observations_encode_within_bounds(sequence in action_sequence()) {
            let mut env = RelayEnv::reference(StateMode::Stateful);
            let codec = env.codec();
            let mut obs = env.reset();
            loop {
                prop_assert!(codec.index(&obs) < codec.num_states());
                for &feature in codec.features(&obs).iter() {
                    prop_assert!((0.0..=1.0).contains(&feature));
                }
                let Some(index) = sequence.get(obs.step) else { break };
                let outcome = env.step(Action::from_index(*index).unwrap());
                obs = outcome.obs;
                if outcome.done() {
                    break;
                }
            }
        }

        #[test]
        fn rewards_are_finite_and_shaped_once(sequence in action_sequence()) {
            let mut env = RelayEnv::reference(StateMode::Stateful);
            env.reset();
            for index in sequence {
                let outcome = env.step(Action::from_index(index).unwrap());
                prop_assert!(outcome.reward.is_finite());
                // penalties only ever fire on the final step
                if !outcome.done() {
                    prop_assert!(outcome.reward > 0.0);
                }
                if outcome.done() {
                    prop_assert!(outcome.terminated != outcome.truncated);
                    break;
                }
            }
        }
    }
}
