use crate::agent::{Agent, DqnAgent, DqnConfig, EpsilonSchedule, TargetSync};
use crate::env::{Action, Observation, StateCodec, StateMode};
use crate::map::Cell;

fn small_codec() -> StateCodec {
    StateCodec {
        rows: 3,
        cols: 3,
        horizon: 5,
        mode: StateMode::Stateful,
    }
}

fn small_config() -> DqnConfig {
    DqnConfig {
        hidden_sizes: vec![8],
        batch_size: 4,
        min_fill: 4,
        buffer_capacity: 64,
        epsilon: 1.0,
        schedule: EpsilonSchedule::Fixed,
        seed: 11,
        ..DqnConfig::default()
    }
}

fn obs(col: usize, row: usize, step: usize) -> Observation {
    Observation {
        cell: Cell::new(col, row),
        step,
    }
}

/// Feed `n` distinct transitions through the replay path.
fn feed(agent: &mut DqnAgent, n: usize) {
    for i in 0..n {
        let from = obs(i % 3, (i / 3) % 3, i % 5);
        let to = obs((i + 1) % 3, (i / 3) % 3, (i + 1) % 5);
        agent
            .observe(&from, Action::ALL[i % 4], 1.0, &to, &Action::ALL, false)
            .unwrap();
    }
}

#[test]
fn test_network_shapes_follow_codec() {
    let agent = DqnAgent::new(small_codec(), small_config());
    // 3 features in, one Q-value per action out
    assert_eq!(agent.online.architecture(), vec![3, 8, 4]);
    assert_eq!(agent.target.architecture(), vec![3, 8, 4]);
    assert_eq!(agent.buffer_len(), 0);
    assert_eq!(agent.train_steps(), 0);
}

#[test]
fn test_target_starts_as_online_copy() {
    let agent = DqnAgent::new(small_codec(), small_config());
    for (a, b) in agent.online.layers.iter().zip(&agent.target.layers) {
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.biases, b.biases);
    }
}

#[test]
fn test_greedy_action_restricted_to_legal() {
    let agent = DqnAgent::new(small_codec(), small_config());
    let observation = obs(1, 1, 0);
    assert_eq!(agent.greedy_action(&observation, &[Action::Left]), Action::Left);
    let action = agent.greedy_action(&observation, &[Action::Up, Action::Down]);
    assert!(action == Action::Up || action == Action::Down);
}

#[test]
fn test_select_action_stays_legal_under_full_exploration() {
    let mut agent = DqnAgent::new(small_codec(), small_config());
    let legal = [Action::Down, Action::Right];
    for i in 0..50 {
        let action = agent.select_action(&obs(i % 3, 0, 0), &legal);
        assert!(legal.contains(&action));
    }
    // Fixed schedule: epsilon untouched
    assert_eq!(agent.epsilon(), 1.0);
}

#[test]
fn test_no_updates_below_min_fill() {
    let mut agent = DqnAgent::new(small_codec(), DqnConfig { min_fill: 6, ..small_config() });
    feed(&mut agent, 5);
    assert_eq!(agent.buffer_len(), 5);
    assert_eq!(agent.train_steps(), 0);
}

#[test]
fn test_updates_start_once_buffer_filled() {
    let mut agent = DqnAgent::new(small_codec(), small_config());
    feed(&mut agent, 3);
    assert_eq!(agent.train_steps(), 0);
    feed(&mut agent, 3);
    // one update per observe from the fourth transition on
    assert_eq!(agent.train_steps(), 3);
    assert_eq!(agent.buffer_len(), 6);
}

#[test]
fn test_min_fill_clamped_to_batch_size() {
    // min_fill below the batch size would sample short; it is raised
    let mut agent = DqnAgent::new(small_codec(), DqnConfig { min_fill: 1, ..small_config() });
    feed(&mut agent, 3);
    assert_eq!(agent.train_steps(), 0);
    feed(&mut agent, 1);
    assert_eq!(agent.train_steps(), 1);
}

#[test]
fn test_hard_sync_copies_every_n_steps() {
    let config = DqnConfig {
        target_sync: TargetSync::Hard { every: 2 },
        ..small_config()
    };
    let mut agent = DqnAgent::new(small_codec(), config);

    // two train steps: sync point, networks agree
    feed(&mut agent, 5);
    assert_eq!(agent.train_steps(), 2);
    for (a, b) in agent.online.layers.iter().zip(&agent.target.layers) {
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.biases, b.biases);
    }

    // third step updates the online network past the sync point
    feed(&mut agent, 1);
    assert_eq!(agent.train_steps(), 3);
    let online_bias = &agent.online.layers.last().unwrap().biases;
    let target_bias = &agent.target.layers.last().unwrap().biases;
    assert_ne!(online_bias, target_bias);
}

#[test]
fn test_soft_sync_with_full_tau_tracks_online() {
    let config = DqnConfig {
        target_sync: TargetSync::Soft { tau: 1.0 },
        ..small_config()
    };
    let mut agent = DqnAgent::new(small_codec(), config);
    feed(&mut agent, 7);
    assert!(agent.train_steps() > 0);
    for (a, b) in agent.online.layers.iter().zip(&agent.target.layers) {
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.biases, b.biases);
    }
}

#[test]
fn test_soft_sync_moves_target_toward_online() {
    let config = DqnConfig {
        target_sync: TargetSync::Soft { tau: 0.1 },
        ..small_config()
    };
    let mut agent = DqnAgent::new(small_codec(), config);
    feed(&mut agent, 5);
    assert!(agent.train_steps() > 0);
    // target has moved off the initial copy but not all the way
    let online_bias = &agent.online.layers.last().unwrap().biases;
    let target_bias = &agent.target.layers.last().unwrap().biases;
    assert_ne!(online_bias, target_bias);
    assert!(target_bias.iter().any(|&b| b != 0.0));
}

#[test]
fn test_checkpoint_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dqn.bin");

    let mut agent = DqnAgent::new(small_codec(), small_config());
    feed(&mut agent, 20);
    agent.save(&path).unwrap();

    let restored = DqnAgent::load(&path).unwrap();
    assert_eq!(restored.codec(), agent.codec());
    assert_eq!(restored.train_steps(), agent.train_steps());
    assert_eq!(restored.epsilon(), agent.epsilon());
    // bit-exact networks: same greedy policy everywhere
    for col in 0..3 {
        for row in 0..3 {
            for step in 0..5 {
                let observation = obs(col, row, step);
                assert_eq!(
                    restored.greedy_action(&observation, &Action::ALL),
                    agent.greedy_action(&observation, &Action::ALL)
                );
            }
        }
    }
}

#[test]
fn test_load_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dqn.bin");
    std::fs::write(&path, b"not a checkpoint").unwrap();
    assert!(DqnAgent::load(&path).is_err());
}
