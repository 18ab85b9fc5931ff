//! Episode state machine for the relay mission.
//!
//! A mission is a fixed-horizon flight: launch from the start/landing cell,
//! serve both terminals along the way and land back on time. The reward is
//! the minimum per-terminal rate at the relay's cell, shaped by a
//! premature-return penalty and a failure-to-return penalty so that a
//! time-blind policy can still learn to come home at the final step.
//!
//! Dynamics are fully deterministic; all stochasticity lives in the agents.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelParams, RateField};
use crate::map::{Cell, GridMap};

/// Relay movement. Indices are the fixed order used everywhere a
/// deterministic tie-break is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        match self {
            Action::Up => 0,
            Action::Down => 1,
            Action::Left => 2,
            Action::Right => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Action> {
        Action::ALL.get(index).copied()
    }

    /// (dcol, drow) with rows growing downward.
    fn delta(self) -> (i64, i64) {
        match self {
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
        }
    }
}

/// Whether the elapsed step count is part of the learning-visible state.
///
/// `Stateful` lets an agent learn time-dependent behavior such as when to
/// turn back; `Stateless` forces a single time-independent policy that
/// relies on the reward shaping alone. Orthogonal to the algorithm choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateMode {
    Stateful,
    Stateless,
}

/// What the agent sees after reset/step. `step` is always populated; under
/// `StateMode::Stateless` the codec simply ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub cell: Cell,
    pub step: usize,
}

/// Translates observations into the two representations the agents consume:
/// a dense table index for the tabular learner and a normalized feature
/// vector for the function approximator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCodec {
    pub rows: usize,
    pub cols: usize,
    pub horizon: usize,
    pub mode: StateMode,
}

impl StateCodec {
    pub fn num_states(&self) -> usize {
        match self.mode {
            StateMode::Stateful => self.rows * self.cols * (self.horizon + 1),
            StateMode::Stateless => self.rows * self.cols,
        }
    }

    /// Dense index of an observation; position-major, time-minor.
    pub fn index(&self, obs: &Observation) -> usize {
        let cell = obs.cell.row * self.cols + obs.cell.col;
        match self.mode {
            StateMode::Stateful => cell * (self.horizon + 1) + obs.step,
            StateMode::Stateless => cell,
        }
    }

    pub fn feature_len(&self) -> usize {
        match self.mode {
            StateMode::Stateful => 3,
            StateMode::Stateless => 2,
        }
    }

    /// Feature vector in [0, 1] per dimension.
    pub fn features(&self, obs: &Observation) -> Array1<f32> {
        let col = obs.cell.col as f32 / (self.cols - 1).max(1) as f32;
        let row = obs.cell.row as f32 / (self.rows - 1).max(1) as f32;
        match self.mode {
            StateMode::Stateful => {
                let t = obs.step as f32 / self.horizon as f32;
                Array1::from_vec(vec![col, row, t])
            }
            StateMode::Stateless => Array1::from_vec(vec![col, row]),
        }
    }
}

/// One step's outcome. `terminated` means the relay landed back on time;
/// `truncated` means the episode was cut short (early return or out of
/// time). Either way the episode is over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub obs: Observation,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

impl StepOutcome {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// The grid-world environment: owns the map and the precomputed rate field,
/// enforces movement legality and applies the finite-horizon shaping.
#[derive(Debug, Clone)]
pub struct RelayEnv {
    map: GridMap,
    rates: RateField,
    mode: StateMode,
    horizon: usize,
    /// Per-cell bitmask of legal actions, bit = `Action::index`
    legal: Vec<u8>,
    relay: Cell,
    step_count: usize,
    /// Rate component of the most recent step's reward, before shaping
    last_rate: f64,
}

impl RelayEnv {
    pub fn new(map: GridMap, params: &ChannelParams, mode: StateMode, horizon: usize) -> Self {
        let rates = RateField::build(&map, params);
        let legal = build_legal_masks(&map);
        let relay = map.start();
        RelayEnv {
            map,
            rates,
            mode,
            horizon,
            legal,
            relay,
            step_count: 0,
            last_rate: 0.0,
        }
    }

    /// Reference scenario: 15x15 map, 50-step flight time.
    pub fn reference(mode: StateMode) -> Self {
        RelayEnv::new(GridMap::reference(), &ChannelParams::default(), mode, 50)
    }

    /// Start a new episode: relay at the landing cell, t = 0.
    pub fn reset(&mut self) -> Observation {
        self.relay = self.map.start();
        self.step_count = 0;
        self.last_rate = 0.0;
        self.observation()
    }

    /// Apply one action. Illegal moves (out of bounds or into an obstacle)
    /// leave the position unchanged but still consume a time step, so the
    /// relay can never leave the grid or sit on an obstacle.
    pub fn step(&mut self, action: Action) -> StepOutcome {
        if self.is_legal(self.relay, action) {
            let (dc, dr) = action.delta();
            self.relay = Cell::new(
                (self.relay.col as i64 + dc) as usize,
                (self.relay.row as i64 + dr) as usize,
            );
        }
        self.step_count += 1;

        let rate = self.rates.min_rate(self.relay);
        self.last_rate = rate;
        let mut reward = rate;

        let at_landing = self.relay == self.map.start();
        let out_of_time = self.step_count == self.horizon;
        let mut terminated = false;
        let mut truncated = false;
        if at_landing && out_of_time {
            terminated = true;
        } else if at_landing {
            // came home with flight time to spare
            truncated = true;
            reward -= self.last_rate * (self.horizon - self.step_count) as f64;
        } else if out_of_time {
            // never made it home
            truncated = true;
            reward -= self.last_rate * 10.0;
        }

        StepOutcome {
            obs: self.observation(),
            reward,
            terminated,
            truncated,
        }
    }

    /// Like [`step`](Self::step), but an illegal action is reported as an
    /// error instead of being absorbed as a no-op. The environment state is
    /// untouched on error.
    pub fn try_step(&mut self, action: Action) -> crate::error::Result<StepOutcome> {
        if !self.is_legal(self.relay, action) {
            return Err(crate::error::SkyrelayError::InvalidAction {
                action: action.index(),
                cell: (self.relay.col, self.relay.row),
            });
        }
        Ok(self.step(action))
    }

    pub fn observation(&self) -> Observation {
        Observation {
            cell: self.relay,
            step: self.step_count,
        }
    }

    pub fn is_legal(&self, cell: Cell, action: Action) -> bool {
        self.legal[self.map.cell_index(cell)] & (1 << action.index()) != 0
    }

    /// Legal actions at a cell, in the fixed action order.
    pub fn legal_actions(&self, cell: Cell) -> Vec<Action> {
        let mask = self.legal[self.map.cell_index(cell)];
        Action::ALL
            .iter()
            .copied()
            .filter(|a| mask & (1 << a.index()) != 0)
            .collect()
    }

    pub fn codec(&self) -> StateCodec {
        StateCodec {
            rows: self.map.rows(),
            cols: self.map.cols(),
            horizon: self.horizon,
            mode: self.mode,
        }
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn relay_position(&self) -> Cell {
        self.relay
    }

    pub fn elapsed_steps(&self) -> usize {
        self.step_count
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn state_mode(&self) -> StateMode {
        self.mode
    }

    /// Immediate (unshaped) reward the relay would collect at a cell.
    pub fn min_rate(&self, cell: Cell) -> f64 {
        self.rates.min_rate(cell)
    }

    pub fn rates(&self) -> &RateField {
        &self.rates
    }
}

/// Precompute the legal-action bitmask for every cell: moves that stay in
/// bounds and do not enter an obstacle.
fn build_legal_masks(map: &GridMap) -> Vec<u8> {
    let mut masks = vec![0u8; map.num_cells()];
    for row in 0..map.rows() {
        for col in 0..map.cols() {
            let cell = Cell::new(col, row);
            let mut mask = 0u8;
            for action in Action::ALL {
                let (dc, dr) = action.delta();
                let (nc, nr) = (col as i64 + dc, row as i64 + dr);
                if map.in_bounds(nc, nr) && !map.is_obstacle(Cell::new(nc as usize, nr as usize)) {
                    mask |= 1 << action.index();
                }
            }
            masks[map.cell_index(cell)] = mask;
        }
    }
    masks
}
