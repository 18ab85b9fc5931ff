//! Air-to-ground channel model: line-of-sight classification against the
//! obstacle layout and a Shannon-capacity rate, precomputed per cell.
//!
//! Everything here is a pure function of (map, parameters); no learning and
//! no mutable state.

use serde::{Deserialize, Serialize};

use crate::map::{Cell, GridMap, Terminal};

/// Channel model parameters. The defaults reproduce the reference scenario:
/// free-space pathloss exponent, 20 dB NLOS excess loss, 15 dBm transmit
/// power against -174 dBm/Hz thermal noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelParams {
    /// Pathloss exponent alpha
    pub pathloss_exponent: f64,
    /// Shadowing attenuation under line-of-sight
    pub beta_los: f64,
    /// Shadowing attenuation under non-line-of-sight
    pub beta_nlos: f64,
    /// Transmit power in dBm
    pub tx_power_dbm: f64,
    /// Thermal noise density in dBm per Hz
    pub noise_dbm_per_hz: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        ChannelParams {
            pathloss_exponent: 2.0,
            beta_los: 1.0,
            beta_nlos: 0.01,
            tx_power_dbm: 15.0,
            noise_dbm_per_hz: -174.0,
        }
    }
}

fn dbm_to_watts(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0) / 1000.0
}

impl ChannelParams {
    pub fn tx_power_watts(&self) -> f64 {
        dbm_to_watts(self.tx_power_dbm)
    }

    pub fn noise_watts(&self) -> f64 {
        dbm_to_watts(self.noise_dbm_per_hz)
    }

    /// Achievable rate in bit/s/Hz at the given 3-D distance.
    ///
    /// Strictly decreasing in distance for a fixed LOS state, and strictly
    /// lower under NLOS than LOS at equal distance.
    pub fn rate(&self, distance_m: f64, nlos: bool) -> f64 {
        let beta = if nlos { self.beta_nlos } else { self.beta_los };
        let pathloss = distance_m.powf(-self.pathloss_exponent) * beta;
        let snr = self.tx_power_watts() * pathloss / self.noise_watts();
        (1.0 + snr).log2()
    }
}

/// Cross product orientation of (b - a) x (c - a).
fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Segment intersection test, touching counts as intersecting.
fn segments_intersect(p1: (f64, f64), p2: (f64, f64), q1: (f64, f64), q2: (f64, f64)) -> bool {
    let o1 = orientation(p1, p2, q1);
    let o2 = orientation(p1, p2, q2);
    let o3 = orientation(q1, q2, p1);
    let o4 = orientation(q1, q2, p2);

    if ((o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0))
        && ((o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0))
    {
        return true;
    }

    // collinear touch cases
    (o1 == 0.0 && on_segment(p1, p2, q1))
        || (o2 == 0.0 && on_segment(p1, p2, q2))
        || (o3 == 0.0 && on_segment(q1, q2, p1))
        || (o4 == 0.0 && on_segment(q1, q2, p2))
}

/// Does the segment p1-p2 touch the axis-aligned rectangle [x0,x1] x [y0,y1]?
fn segment_hits_rect(p1: (f64, f64), p2: (f64, f64), x0: f64, y0: f64, x1: f64, y1: f64) -> bool {
    let inside = |p: (f64, f64)| p.0 >= x0 && p.0 <= x1 && p.1 >= y0 && p.1 <= y1;
    if inside(p1) || inside(p2) {
        return true;
    }
    let corners = [(x0, y0), (x1, y0), (x1, y1), (x0, y1)];
    for i in 0..4 {
        if segments_intersect(p1, p2, corners[i], corners[(i + 1) % 4]) {
            return true;
        }
    }
    false
}

/// Straight-line obstacle intersection test between the relay's ground
/// projection at `cell` and the terminal. Any obstacle footprint touching
/// the segment blocks sight.
pub fn line_of_sight(map: &GridMap, cell: Cell, terminal: Terminal) -> bool {
    let geometry = map.geometry();
    let p1 = geometry.terminal_center(terminal);
    let p2 = geometry.cell_center(cell);
    let edge = geometry.cell_edge;
    for obstacle in map.obstacle_cells() {
        let x0 = obstacle.col as f64 * edge;
        let y0 = obstacle.row as f64 * edge;
        if segment_hits_rect(p1, p2, x0, y0, x0 + edge, y0 + edge) {
            return false;
        }
    }
    true
}

/// Precomputed per-terminal achievable rate for every cell of a map.
///
/// Built once per (map, params) pair; the environment's reward is the
/// minimum of the per-terminal rates at the relay's cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateField {
    cols: usize,
    /// `per_terminal[t][cell_index]` in bit/s/Hz
    per_terminal: Vec<Vec<f64>>,
}

impl RateField {
    pub fn build(map: &GridMap, params: &ChannelParams) -> Self {
        let geometry = map.geometry();
        let per_terminal = map
            .terminals()
            .iter()
            .map(|&terminal| {
                let mut rates = vec![0.0; map.num_cells()];
                for row in 0..map.rows() {
                    for col in 0..map.cols() {
                        let cell = Cell::new(col, row);
                        let nlos = !line_of_sight(map, cell, terminal);
                        let d = geometry.ground_air_distance_m(cell, terminal);
                        rates[map.cell_index(cell)] = params.rate(d, nlos);
                    }
                }
                rates
            })
            .collect();
        RateField {
            cols: map.cols(),
            per_terminal,
        }
    }

    pub fn num_terminals(&self) -> usize {
        self.per_terminal.len()
    }

    /// Rate toward one terminal at a cell.
    pub fn rate(&self, terminal_idx: usize, cell: Cell) -> f64 {
        self.per_terminal[terminal_idx][cell.row * self.cols + cell.col]
    }

    /// Minimum rate over all terminals at a cell: the immediate reward.
    ///
    /// Taking the minimum rather than the sum places the policy optimum
    /// between the terminals instead of collapsing onto the nearest one.
    pub fn min_rate(&self, cell: Cell) -> f64 {
        self.per_terminal
            .iter()
            .map(|rates| rates[cell.row * self.cols + cell.col])
            .fold(f64::INFINITY, f64::min)
    }

    /// Sum of the per-terminal rates at a cell. Not used as the reward;
    /// kept for comparing reward definitions.
    pub fn sum_rate(&self, cell: Cell) -> f64 {
        self.per_terminal
            .iter()
            .map(|rates| rates[cell.row * self.cols + cell.col])
            .sum()
    }
}
