//! Maze grid topology
//!
//! Cells live in a flat row-major arena and refer to each other only by
//! coordinates. Removing a wall always writes both sides.

use std::collections::VecDeque;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{MazeError, Result};

/// Grid coordinates of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// One of the four walls of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    /// Neighbor order used by the generator (up, right, down, left)
    pub const ALL: [Direction; 4] = [
        Direction::Top,
        Direction::Right,
        Direction::Bottom,
        Direction::Left,
    ];

    /// Parse `top`/`right`/`bottom`/`left`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "top" => Some(Direction::Top),
            "right" => Some(Direction::Right),
            "bottom" => Some(Direction::Bottom),
            "left" => Some(Direction::Left),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Right => Direction::Left,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
        }
    }

    /// (row, col) step
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Top => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Bottom => (1, 0),
            Direction::Left => (0, -1),
        }
    }
}

/// Wall flags of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Walls {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Walls {
    pub const CLOSED: Walls = Walls {
        top: true,
        right: true,
        bottom: true,
        left: true,
    };

    pub fn get(&self, dir: Direction) -> bool {
        match dir {
            Direction::Top => self.top,
            Direction::Right => self.right,
            Direction::Bottom => self.bottom,
            Direction::Left => self.left,
        }
    }

    fn set(&mut self, dir: Direction, present: bool) {
        match dir {
            Direction::Top => self.top = present,
            Direction::Right => self.right = present,
            Direction::Bottom => self.bottom = present,
            Direction::Left => self.left = present,
        }
    }
}

/// A maze cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub pos: CellPos,
    pub walls: Walls,
    /// Generation bookkeeping only
    #[serde(skip)]
    pub(crate) visited: bool,
}

/// Rectangular maze of cells with fixed start (top-left) and finish (bottom-right)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    pub start: CellPos,
    pub finish: CellPos,
}

impl MazeGrid {
    /// Create a grid with every wall standing
    pub fn fully_walled(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(MazeError::InvalidDimensions { rows, cols });
        }

        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell {
                    pos: CellPos::new(row, col),
                    walls: Walls::CLOSED,
                    visited: false,
                });
            }
        }

        Ok(Self {
            rows,
            cols,
            cells,
            start: CellPos::new(0, 0),
            finish: CellPos::new(rows - 1, cols - 1),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub fn contains(&self, pos: CellPos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    #[inline]
    pub fn index_of(&self, pos: CellPos) -> usize {
        pos.row * self.cols + pos.col
    }

    pub fn get(&self, pos: CellPos) -> Option<&Cell> {
        if self.contains(pos) {
            self.cells.get(self.index_of(pos))
        } else {
            None
        }
    }

    /// Cell at `pos`. Panics if `pos` lies outside the grid.
    pub fn cell(&self, pos: CellPos) -> &Cell {
        &self.cells[self.index_of(pos)]
    }

    pub(crate) fn cell_mut(&mut self, pos: CellPos) -> &mut Cell {
        let idx = self.index_of(pos);
        &mut self.cells[idx]
    }

    /// Adjacent cell in `dir`, if inside the grid
    pub fn neighbor(&self, pos: CellPos, dir: Direction) -> Option<CellPos> {
        let (dr, dc) = dir.delta();
        let row = pos.row.checked_add_signed(dr)?;
        let col = pos.col.checked_add_signed(dc)?;
        let next = CellPos::new(row, col);
        self.contains(next).then_some(next)
    }

    pub fn has_wall(&self, pos: CellPos, dir: Direction) -> bool {
        self.get(pos).is_none_or(|c| c.walls.get(dir))
    }

    /// True when the wall in `dir` is part of the outer boundary
    pub fn is_boundary(&self, pos: CellPos, dir: Direction) -> bool {
        self.neighbor(pos, dir).is_none()
    }

    /// Open the wall between `pos` and its neighbor in `dir`, on both sides.
    ///
    /// Boundary walls are never removed. Returns true if a wall was opened.
    pub(crate) fn remove_wall(&mut self, pos: CellPos, dir: Direction) -> bool {
        let Some(other) = self.neighbor(pos, dir) else {
            return false;
        };
        if !self.cell(pos).walls.get(dir) {
            return false;
        }
        self.cell_mut(pos).walls.set(dir, false);
        self.cell_mut(other).walls.set(dir.opposite(), false);
        true
    }

    pub(crate) fn clear_visited(&mut self) {
        for cell in &mut self.cells {
            cell.visited = false;
        }
    }

    /// Cells reachable from `pos` through open walls
    pub fn open_neighbors(&self, pos: CellPos) -> impl Iterator<Item = CellPos> + '_ {
        Direction::ALL.into_iter().filter_map(move |dir| {
            if self.has_wall(pos, dir) {
                None
            } else {
                self.neighbor(pos, dir)
            }
        })
    }

    /// Number of interior wall slots between adjacent cells
    pub fn interior_walls(&self) -> usize {
        self.rows * (self.cols - 1) + self.cols * (self.rows - 1)
    }

    /// Number of interior walls that are open
    pub fn open_passages(&self) -> usize {
        self.cells
            .iter()
            .map(|c| {
                let right = c.pos.col + 1 < self.cols && !c.walls.right;
                let down = c.pos.row + 1 < self.rows && !c.walls.bottom;
                right as usize + down as usize
            })
            .sum()
    }

    /// Flood fill from `from`, returning the number of cells reached
    pub fn reachable_from(&self, from: CellPos) -> usize {
        if !self.contains(from) {
            return 0;
        }
        let mut seen = vec![false; self.cells.len()];
        let mut queue = VecDeque::from([from]);
        seen[self.index_of(from)] = true;
        let mut count = 0;

        while let Some(pos) = queue.pop_front() {
            count += 1;
            for next in self.open_neighbors(pos) {
                let idx = self.index_of(next);
                if !seen[idx] {
                    seen[idx] = true;
                    queue.push_back(next);
                }
            }
        }
        count
    }

    /// Every cell reachable from start
    pub fn is_connected(&self) -> bool {
        self.reachable_from(self.start) == self.cells.len()
    }

    /// Every shared wall agrees on both sides and the boundary is closed
    pub fn walls_consistent(&self) -> bool {
        self.cells.iter().all(|c| {
            Direction::ALL.into_iter().all(|dir| match self.neighbor(c.pos, dir) {
                Some(other) => c.walls.get(dir) == self.cell(other).walls.get(dir.opposite()),
                None => c.walls.get(dir),
            })
        })
    }

    /// Map a continuous position to its owning cell
    pub fn cell_at(&self, pos: Vec2, cell_size: f32) -> Option<CellPos> {
        if !(pos.x >= 0.0 && pos.y >= 0.0) || cell_size <= 0.0 {
            return None;
        }
        let col = (pos.x / cell_size).floor() as usize;
        let row = (pos.y / cell_size).floor() as usize;
        let cell = CellPos::new(row, col);
        self.contains(cell).then_some(cell)
    }

    /// Pixel-space center of a cell
    pub fn cell_center(&self, pos: CellPos, cell_size: f32) -> Vec2 {
        Vec2::new(
            (pos.col as f32 + 0.5) * cell_size,
            (pos.row as f32 + 0.5) * cell_size,
        )
    }
}

impl fmt::Display for MazeGrid {
    /// Text dump: `+---+` posts and walls, `S`/`F` markers
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let top = self.cell(CellPos::new(row, col)).walls.top;
                write!(f, "+{}", if top { "---" } else { "   " })?;
            }
            writeln!(f, "+")?;
            for col in 0..self.cols {
                let pos = CellPos::new(row, col);
                let walls = self.cell(pos).walls;
                let mark = if pos == self.start {
                    " S "
                } else if pos == self.finish {
                    " F "
                } else {
                    "   "
                };
                write!(f, "{}{}", if walls.left { "|" } else { " " }, mark)?;
            }
            writeln!(f, "|")?;
        }
        for _ in 0..self.cols {
            write!(f, "+---")?;
        }
        writeln!(f, "+")
    }
}
