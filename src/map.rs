//! Static grid map: obstacle layout, start/landing cell, ground terminals
//! and the screen-unit geometry the channel model measures distances in.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyrelayError};

/// Integer grid coordinates, column-major like the reference layout diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub col: usize,
    pub row: usize,
}

impl Cell {
    pub fn new(col: usize, row: usize) -> Self {
        Cell { col, row }
    }
}

/// Fixed ground terminal. Coordinates are fractional grid units: the
/// reference terminals sit on grid-line intersections, not cell centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub col: f64,
    pub row: f64,
}

impl Terminal {
    pub fn new(col: f64, row: f64) -> Self {
        Terminal { col, row }
    }
}

/// Geometry of the map in abstract distance units. The reference scenario
/// uses a 53-unit cell edge with 2 m per unit and a 20-unit flight
/// altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Edge length of one cell, in units
    pub cell_edge: f64,
    /// Relay flight altitude, in units
    pub altitude: f64,
    /// Conversion from units to meters
    pub meters_per_unit: f64,
}

impl Geometry {
    /// Cell-center offset from the cell corner. Truncated to whole units to
    /// match the reference scenario's integer screen arithmetic.
    fn half_edge(&self) -> f64 {
        (self.cell_edge / 2.0).floor()
    }

    /// Center of a grid cell, in units.
    pub fn cell_center(&self, cell: Cell) -> (f64, f64) {
        (
            cell.col as f64 * self.cell_edge + self.half_edge(),
            cell.row as f64 * self.cell_edge + self.half_edge(),
        )
    }

    /// Center of a terminal position, in units.
    pub fn terminal_center(&self, terminal: Terminal) -> (f64, f64) {
        (
            terminal.col * self.cell_edge + self.half_edge(),
            terminal.row * self.cell_edge + self.half_edge(),
        )
    }

    /// 3-D distance in meters from a ground terminal to the relay flying
    /// above the given cell.
    pub fn ground_air_distance_m(&self, cell: Cell, terminal: Terminal) -> f64 {
        let (cx, cy) = self.cell_center(cell);
        let (tx, ty) = self.terminal_center(terminal);
        let dx = cx - tx;
        let dy = cy - ty;
        (self.altitude * self.altitude + dx * dx + dy * dy).sqrt() * self.meters_per_unit
    }
}

impl Default for Geometry {
    fn default() -> Self {
        // 800-unit map edge split into 15 cells, integer division
        Geometry {
            cell_edge: 53.0,
            altitude: 20.0,
            meters_per_unit: 2.0,
        }
    }
}

/// Immutable grid map. Holds the obstacle set, the start/landing cell and
/// the two ground terminals; validated once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridMap {
    rows: usize,
    cols: usize,
    obstacle_mask: Vec<bool>,
    obstacle_cells: Vec<Cell>,
    start: Cell,
    terminals: [Terminal; 2],
    geometry: Geometry,
}

impl GridMap {
    pub fn new(
        rows: usize,
        cols: usize,
        obstacles: Vec<Cell>,
        start: Cell,
        terminals: [Terminal; 2],
        geometry: Geometry,
    ) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(SkyrelayError::InvalidMapConfiguration(format!(
                "grid dimensions must be non-zero, got {}x{}",
                rows, cols
            )));
        }

        let mut obstacle_mask = vec![false; rows * cols];
        for cell in &obstacles {
            if cell.col >= cols || cell.row >= rows {
                return Err(SkyrelayError::InvalidMapConfiguration(format!(
                    "obstacle ({}, {}) is outside the {}x{} grid",
                    cell.col, cell.row, cols, rows
                )));
            }
            obstacle_mask[cell.row * cols + cell.col] = true;
        }

        if start.col >= cols || start.row >= rows {
            return Err(SkyrelayError::InvalidMapConfiguration(format!(
                "start cell ({}, {}) is outside the grid",
                start.col, start.row
            )));
        }
        if obstacle_mask[start.row * cols + start.col] {
            return Err(SkyrelayError::InvalidMapConfiguration(format!(
                "start cell ({}, {}) is an obstacle",
                start.col, start.row
            )));
        }

        for terminal in &terminals {
            let (tc, tr) = (terminal.col, terminal.row);
            if tc < 0.0 || tr < 0.0 || tc >= cols as f64 || tr >= rows as f64 {
                return Err(SkyrelayError::InvalidMapConfiguration(format!(
                    "terminal ({}, {}) is outside the grid",
                    tc, tr
                )));
            }
            let host = Cell::new(tc.floor() as usize, tr.floor() as usize);
            if obstacle_mask[host.row * cols + host.col] {
                return Err(SkyrelayError::InvalidMapConfiguration(format!(
                    "terminal ({}, {}) sits inside obstacle cell ({}, {})",
                    tc, tr, host.col, host.row
                )));
            }
        }

        Ok(GridMap {
            rows,
            cols,
            obstacle_mask,
            obstacle_cells: obstacles,
            start,
            terminals,
            geometry,
        })
    }

    /// The reference 15x15 scenario: a 2x4 obstacle block in the upper-right
    /// quadrant, launch from the bottom-left corner, terminals on the grid
    /// intersections at (4.5, 2.5) and (11.5, 6.5).
    pub fn reference() -> Self {
        let mut obstacles = Vec::new();
        for col in 9..11 {
            for row in 8..12 {
                obstacles.push(Cell::new(col, row));
            }
        }
        GridMap::new(
            15,
            15,
            obstacles,
            Cell::new(0, 14),
            [Terminal::new(4.5, 2.5), Terminal::new(11.5, 6.5)],
            Geometry::default(),
        )
        .expect("reference layout is valid")
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn terminals(&self) -> &[Terminal; 2] {
        &self.terminals
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn obstacle_cells(&self) -> &[Cell] {
        &self.obstacle_cells
    }

    pub fn in_bounds(&self, col: i64, row: i64) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.cols && (row as usize) < self.rows
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.obstacle_mask[cell.row * self.cols + cell.col]
    }

    /// Dense row-major index of a cell.
    pub fn cell_index(&self, cell: Cell) -> usize {
        cell.row * self.cols + cell.col
    }

    pub fn num_cells(&self) -> usize {
        self.rows * self.cols
    }
}
