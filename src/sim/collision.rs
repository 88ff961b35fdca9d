//! Collision resolution against maze walls
//!
//! Two strategies, one per view:
//! - 2D: the player is a circle of `radius`; each standing wall of the
//!   owning cell pushes the circle back to `boundary ± radius`.
//! - 3D: a fixed clearance `margin` from each standing wall of the owning
//!   cell, independent of player size.
//!
//! Both clamp axes independently. Where two perpendicular walls meet, the
//! circle can still graze the far corner post; that approximation is kept.

use glam::Vec2;

use crate::maze::{CellPos, MazeGrid, Walls};

/// Result of a collision query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// Whether any wall (or the grid edge) stopped the movement
    pub blocked: bool,
    /// Corrected position
    pub pos: Vec2,
}

impl Resolution {
    pub fn clear(pos: Vec2) -> Self {
        Self {
            blocked: false,
            pos,
        }
    }

    pub fn blocked(pos: Vec2) -> Self {
        Self { blocked: true, pos }
    }
}

/// Cell-space bounds of one cell
#[derive(Debug, Clone, Copy)]
struct CellBounds {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

impl CellBounds {
    fn of(cell: CellPos, cell_size: f32) -> Self {
        let left = cell.col as f32 * cell_size;
        let top = cell.row as f32 * cell_size;
        Self {
            left,
            right: left + cell_size,
            top,
            bottom: top + cell_size,
        }
    }
}

/// Push `pos` at least `clearance` away from every standing wall
fn clamp_to_walls(pos: Vec2, walls: Walls, bounds: CellBounds, clearance: f32) -> Resolution {
    let mut out = pos;
    let mut blocked = false;

    // Compare against the clamped value itself so a corrected position is a
    // fixed point with no float round-off.
    let min_x = bounds.left + clearance;
    let max_x = bounds.right - clearance;
    let min_y = bounds.top + clearance;
    let max_y = bounds.bottom - clearance;

    if walls.left && out.x < min_x {
        out.x = min_x;
        blocked = true;
    }
    if walls.right && out.x > max_x {
        out.x = max_x;
        blocked = true;
    }
    if walls.top && out.y < min_y {
        out.y = min_y;
        blocked = true;
    }
    if walls.bottom && out.y > max_y {
        out.y = max_y;
        blocked = true;
    }

    Resolution { blocked, pos: out }
}

/// Resolve a 2D circle against the walls of the cell that owns its center.
///
/// Positions outside the grid come back blocked and unchanged.
pub fn resolve(maze: &MazeGrid, pos: Vec2, radius: f32, cell_size: f32) -> Resolution {
    let Some(cell) = maze.cell_at(pos, cell_size) else {
        return Resolution::blocked(pos);
    };
    let walls = maze.cell(cell).walls;
    clamp_to_walls(pos, walls, CellBounds::of(cell, cell_size), radius)
}

/// Resolve a 3D ground-plane candidate `(x, z)` with a fixed wall margin.
///
/// `candidate.y` carries the z coordinate (rows grow along +z). Candidates
/// outside the grid come back blocked and unchanged; callers keep their
/// previous position in that case.
pub fn resolve_margin(maze: &MazeGrid, candidate: Vec2, margin: f32, cell_size: f32) -> Resolution {
    let Some(cell) = maze.cell_at(candidate, cell_size) else {
        return Resolution::blocked(candidate);
    };
    let walls = maze.cell(cell).walls;
    clamp_to_walls(candidate, walls, CellBounds::of(cell, cell_size), margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::Direction;

    const CELL: f32 = 40.0;
    const RADIUS: f32 = 10.0;

    /// 2x2 grid with only the wall between (0,0) and (0,1) open
    fn corridor() -> MazeGrid {
        let mut grid = MazeGrid::fully_walled(2, 2).unwrap();
        grid.remove_wall(CellPos::new(0, 0), Direction::Right);
        grid
    }

    #[test]
    fn test_free_position_not_blocked() {
        let grid = corridor();
        let r = resolve(&grid, Vec2::new(20.0, 20.0), RADIUS, CELL);
        assert!(!r.blocked);
        assert_eq!(r.pos, Vec2::new(20.0, 20.0));
    }

    #[test]
    fn test_closed_wall_clamps() {
        let grid = corridor();
        // (0,0) bottom wall is closed; circle pokes 5px past it
        let r = resolve(&grid, Vec2::new(20.0, 35.0), RADIUS, CELL);
        assert!(r.blocked);
        assert_eq!(r.pos, Vec2::new(20.0, 30.0));
    }

    #[test]
    fn test_open_wall_passes() {
        let grid = corridor();
        let r = resolve(&grid, Vec2::new(36.0, 20.0), RADIUS, CELL);
        assert!(!r.blocked);
        assert_eq!(r.pos.x, 36.0);
    }

    #[test]
    fn test_corner_clamps_both_axes() {
        let grid = MazeGrid::fully_walled(1, 1).unwrap();
        let r = resolve(&grid, Vec2::new(2.0, 39.0), RADIUS, CELL);
        assert!(r.blocked);
        assert_eq!(r.pos, Vec2::new(10.0, 30.0));
    }

    #[test]
    fn test_out_of_grid_reported_blocked_unchanged() {
        let grid = corridor();
        for pos in [Vec2::new(-5.0, 10.0), Vec2::new(10.0, 80.0), Vec2::new(500.0, 500.0)] {
            let r = resolve(&grid, pos, RADIUS, CELL);
            assert!(r.blocked);
            assert_eq!(r.pos, pos);
        }
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let grid = MazeGrid::generate_seeded(6, 6, 0.1, 17).unwrap();
        let radius = 7.3;
        let cell = 33.3;
        let mut x = 0.5;
        while x < 6.0 * cell {
            let mut y = 0.5;
            while y < 6.0 * cell {
                let first = resolve(&grid, Vec2::new(x, y), radius, cell);
                let second = resolve(&grid, first.pos, radius, cell);
                assert!(!second.blocked, "({x}, {y}) -> {:?} not stable", first.pos);
                assert_eq!(second.pos, first.pos);
                y += 3.7;
            }
            x += 3.7;
        }
    }

    #[test]
    fn test_margin_clamp_3d() {
        let grid = corridor();
        let cell = 4.0;
        // Near the closed top wall of (0,0)
        let r = resolve_margin(&grid, Vec2::new(2.0, 0.2), 0.5, cell);
        assert!(r.blocked);
        assert_eq!(r.pos, Vec2::new(2.0, 0.5));

        // Right wall of (0,0) is open
        let r = resolve_margin(&grid, Vec2::new(3.9, 2.0), 0.5, cell);
        assert!(!r.blocked);

        let r = resolve_margin(&grid, Vec2::new(9.0, 2.0), 0.5, cell);
        assert!(r.blocked);
        assert_eq!(r.pos, Vec2::new(9.0, 2.0));
    }
}
