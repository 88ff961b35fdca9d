//! Randomized maze generation
//!
//! Depth-first "recursive backtracker" carve produces a spanning tree, then
//! loop injection opens extra interior walls to create alternate routes.
//! Opening walls only ever adds edges, so connectivity from the carve holds.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::grid::{CellPos, Direction, MazeGrid};
use crate::error::{MazeError, Result};

/// Generate a maze using the supplied RNG
pub fn generate<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    loop_factor: f32,
    rng: &mut R,
) -> Result<MazeGrid> {
    if !loop_factor.is_finite() || loop_factor < 0.0 {
        return Err(MazeError::InvalidLoopFactor(loop_factor));
    }

    let mut grid = MazeGrid::fully_walled(rows, cols)?;
    carve_spanning_tree(&mut grid, rng);
    let opened = inject_loops(&mut grid, loop_factor, rng);

    log::debug!(
        "Generated {}x{} maze (loop factor {}, {} extra passages)",
        rows,
        cols,
        loop_factor,
        opened
    );

    Ok(grid)
}

impl MazeGrid {
    /// Generate a reproducible maze from a seed
    pub fn generate_seeded(rows: usize, cols: usize, loop_factor: f32, seed: u64) -> Result<Self> {
        let mut rng = Pcg32::seed_from_u64(seed);
        generate(rows, cols, loop_factor, &mut rng)
    }
}

/// Carve a spanning tree from `grid.start` with an explicit stack
pub(crate) fn carve_spanning_tree<R: Rng + ?Sized>(grid: &mut MazeGrid, rng: &mut R) {
    let start = grid.start;
    grid.cell_mut(start).visited = true;
    let mut stack = vec![start];
    let mut candidates: Vec<(Direction, CellPos)> = Vec::with_capacity(4);

    while let Some(&current) = stack.last() {
        candidates.clear();
        for dir in Direction::ALL {
            if let Some(next) = grid.neighbor(current, dir) {
                if !grid.cell(next).visited {
                    candidates.push((dir, next));
                }
            }
        }

        if candidates.is_empty() {
            stack.pop();
            continue;
        }

        let (dir, next) = candidates[rng.random_range(0..candidates.len())];
        grid.remove_wall(current, dir);
        grid.cell_mut(next).visited = true;
        stack.push(next);
    }
}

/// Open `floor(rows * cols * loop_factor)` random interior walls.
///
/// Returns the number of walls actually opened; picks that land on a cell
/// with no remaining interior walls open nothing. Stops early once every
/// interior wall is open.
pub(crate) fn inject_loops<R: Rng + ?Sized>(
    grid: &mut MazeGrid,
    loop_factor: f32,
    rng: &mut R,
) -> usize {
    grid.clear_visited();

    let walls_to_remove = (grid.len() as f64 * loop_factor as f64).floor() as usize;
    let mut closed = grid.interior_walls() - grid.open_passages();
    let mut opened = 0;
    let mut candidates: Vec<Direction> = Vec::with_capacity(4);

    for _ in 0..walls_to_remove {
        if closed == 0 {
            break;
        }

        let pos = CellPos::new(
            rng.random_range(0..grid.rows()),
            rng.random_range(0..grid.cols()),
        );

        candidates.clear();
        candidates.extend(
            Direction::ALL
                .into_iter()
                .filter(|&dir| grid.cell(pos).walls.get(dir) && !grid.is_boundary(pos, dir)),
        );

        if candidates.is_empty() {
            continue;
        }

        let dir = candidates[rng.random_range(0..candidates.len())];
        if grid.remove_wall(pos, dir) {
            opened += 1;
            closed -= 1;
        }
    }

    opened
}
