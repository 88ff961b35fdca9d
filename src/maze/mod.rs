//! Maze topology
//!
//! Grid data model, randomized generation and path solving. A generated
//! grid is immutable; sessions own their grid exclusively.

pub mod generate;
pub mod grid;
pub mod solve;

pub use generate::generate;
pub use grid::{Cell, CellPos, Direction, MazeGrid, Walls};
pub use solve::shortest_path;
