//! Movement integration
//!
//! 2D runs on a fixed 60 Hz tick; 3D runs once per display frame with the
//! measured `dt`. Both split each move into sub-steps short enough that the
//! per-wall clamps cannot be skipped over.

use glam::Vec2;

use super::collision::{resolve, resolve_margin};
use super::input::{ControlSource, ControlVector};
use super::state::{GameEvent, Phase, PlayState2d, PlayState3d, TickReport};
use crate::consts::*;
use crate::normalize_angle;

/// Upper bound on sub-steps per tick
const MAX_SUBSTEPS: u32 = 64;

fn substeps(distance: f32, max_step: f32) -> u32 {
    if max_step <= 0.0 {
        return 1;
    }
    ((distance / max_step).ceil() as u32).clamp(1, MAX_SUBSTEPS)
}

/// Advance a 2D run by one fixed tick
pub fn tick_2d(state: &mut PlayState2d, control: &ControlVector) -> TickReport {
    if state.phase != Phase::Playing {
        return TickReport::default();
    }

    state.time_ticks += 1;
    state.elapsed_ms = state.time_ticks as f64 * TICK_MS;

    // Already inside the finish: complete regardless of velocity
    if state.at_finish() {
        return complete_2d(state, false);
    }

    let player = &mut state.player;

    // 1. Control
    match control.source {
        ControlSource::Tilt => {
            player.vel =
                player.vel * TILT_SMOOTHING + control.as_vec2() * state.profile.sensitivity;
        }
        ControlSource::Touch if control.fresh => {
            player.vel = (control.as_vec2() * TOUCH_SPEED)
                .clamp(Vec2::splat(-TOUCH_SPEED), Vec2::splat(TOUCH_SPEED));
        }
        ControlSource::Keys if control.fresh => {
            player.vel = control.as_vec2() * KEY_SPEED;
        }
        _ => {}
    }
    if !player.vel.is_finite() {
        player.vel = Vec2::ZERO;
    }

    // Sub-steps no longer than half the radius
    let max_step = player.radius * 0.5;
    let max_travel = max_step * MAX_SUBSTEPS as f32;
    player.vel = player.vel.clamp(Vec2::splat(-max_travel), Vec2::splat(max_travel));
    let n = substeps(player.vel.abs().max_element(), max_step);
    let mut step = player.vel / n as f32;

    // 2-3. Integrate and resolve; a clamped axis loses its velocity
    let mut blocked = false;
    for _ in 0..n {
        let candidate = player.pos + step;
        if state.maze.cell_at(candidate, state.cell_size).is_none() {
            blocked = true;
            player.vel = Vec2::ZERO;
            break;
        }
        let res = resolve(&state.maze, candidate, player.radius, state.cell_size);
        if res.blocked {
            blocked = true;
            if res.pos.x != candidate.x {
                player.vel.x = 0.0;
                step.x = 0.0;
            }
            if res.pos.y != candidate.y {
                player.vel.y = 0.0;
                step.y = 0.0;
            }
        }
        player.pos = res.pos;
    }

    // 4. Friction
    player.vel *= FRICTION;
    if control.source == ControlSource::Touch && control.released {
        player.vel *= TOUCH_RELEASE_DAMPING;
    }

    state.last_blocked = blocked;

    // 5. Finish
    if state.at_finish() {
        return complete_2d(state, blocked);
    }

    TickReport {
        blocked,
        completed: false,
    }
}

fn complete_2d(state: &mut PlayState2d, blocked: bool) -> TickReport {
    state.phase = Phase::Complete;
    state.player.vel = Vec2::ZERO;
    state.events.push(GameEvent::Completed {
        elapsed_ms: state.elapsed_ms,
    });
    log::info!(
        "Maze complete in {:.0} ms ({} ticks)",
        state.elapsed_ms,
        state.time_ticks
    );
    TickReport {
        blocked,
        completed: true,
    }
}

/// Advance a 3D run by one display frame of `dt` seconds
pub fn update_3d(state: &mut PlayState3d, control: &ControlVector, dt: f32) -> TickReport {
    if state.phase != Phase::Playing {
        return TickReport::default();
    }

    let dt = if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DT)
    } else {
        0.0
    };
    state.elapsed_ms += dt as f64 * 1000.0;

    if state.at_finish() {
        return complete_3d(state, false);
    }

    let player = &mut state.player;

    // Control → velocity
    let gain = match control.source {
        ControlSource::Tilt => Some(state.profile.sensitivity),
        ControlSource::Touch | ControlSource::Keys if control.fresh => Some(1.0),
        _ => None,
    };
    match gain {
        Some(gain) => {
            player.velocity.forward = (control.forward() * gain).clamp(-1.0, 1.0) * MOVE_SPEED_3D;
            player.velocity.turn = (control.turn() * gain).clamp(-1.0, 1.0) * TURN_SPEED_3D;
        }
        None => {
            // Coast with the 2D per-tick friction scaled to this frame
            let decay = FRICTION.powf(dt * TICK_HZ);
            player.velocity.forward *= decay;
            player.velocity.turn *= decay;
        }
    }
    if control.source == ControlSource::Touch && control.released {
        player.velocity.forward *= TOUCH_RELEASE_DAMPING;
        player.velocity.turn *= TOUCH_RELEASE_DAMPING;
    }

    // 1. Turn
    player.rotation = normalize_angle(player.rotation + player.velocity.turn * dt);

    // 2. Heading delta
    let delta = Vec2::new(
        player.rotation.sin() * player.velocity.forward * dt,
        -player.rotation.cos() * player.velocity.forward * dt,
    );

    // 3. Margin check in sub-steps no longer than half the margin
    let n = substeps(delta.abs().max_element(), WALL_MARGIN_3D * 0.5);
    let step = delta / n as f32;
    let mut blocked = false;
    for _ in 0..n {
        let candidate = player.ground_pos() + step;
        if state.maze.cell_at(candidate, CELL_SIZE_3D).is_none() {
            blocked = true;
            break;
        }
        let res = resolve_margin(&state.maze, candidate, WALL_MARGIN_3D, CELL_SIZE_3D);
        blocked |= res.blocked;
        player.x = res.pos.x;
        player.z = res.pos.y;
    }
    state.last_blocked = blocked;

    // 4. Finish
    if state.at_finish() {
        return complete_3d(state, blocked);
    }

    TickReport {
        blocked,
        completed: false,
    }
}

fn complete_3d(state: &mut PlayState3d, blocked: bool) -> TickReport {
    state.phase = Phase::Complete;
    state.player.velocity = Default::default();
    state.events.push(GameEvent::Completed {
        elapsed_ms: state.elapsed_ms,
    });
    log::info!("3D maze complete in {:.0} ms", state.elapsed_ms);
    TickReport {
        blocked,
        completed: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationProfile;
    use crate::maze::{CellPos, Direction, MazeGrid};

    const CELL: f32 = 40.0;

    fn idle() -> ControlVector {
        ControlVector::default()
    }

    fn keys(x: f32, y: f32) -> ControlVector {
        ControlVector {
            x,
            y,
            source: ControlSource::Keys,
            fresh: x != 0.0 || y != 0.0,
            released: false,
        }
    }

    fn playing_2d(maze: MazeGrid) -> PlayState2d {
        let mut state = PlayState2d::new(maze, CELL, CalibrationProfile::default());
        state.start();
        state
    }

    #[test]
    fn test_idle_phase_does_not_move() {
        let maze = MazeGrid::generate_seeded(3, 3, 0.0, 1).unwrap();
        let mut state = PlayState2d::new(maze, CELL, CalibrationProfile::default());
        state.player.vel = Vec2::new(3.0, 0.0);
        let before = state.player.pos;
        tick_2d(&mut state, &idle());
        assert_eq!(state.player.pos, before);
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_closed_wall_blocks_fast_player() {
        // 1x2 grid, the dividing wall stays closed
        let maze = MazeGrid::fully_walled(1, 2).unwrap();
        let mut state = playing_2d(maze);
        state.player.pos = Vec2::new(28.0, 20.0);
        state.player.vel = Vec2::new(10.0, 0.0);

        let report = tick_2d(&mut state, &idle());
        assert!(report.blocked);
        assert!(!report.completed);
        let wall = CELL;
        assert!(state.player.pos.x <= wall - state.player.radius);
        assert!((wall - state.player.pos.x - state.player.radius).abs() < 1e-4);
        assert_eq!(state.player.vel.x, 0.0);
    }

    #[test]
    fn test_huge_velocity_never_tunnels() {
        let maze = MazeGrid::fully_walled(1, 3).unwrap();
        let mut state = playing_2d(maze);
        state.player.vel = Vec2::new(500.0, 0.0);
        tick_2d(&mut state, &idle());
        assert_eq!(state.player_cell(), Some(CellPos::new(0, 0)));
    }

    #[test]
    fn test_player_at_finish_completes_next_tick() {
        let maze = MazeGrid::generate_seeded(4, 4, 0.0, 8).unwrap();
        let mut state = playing_2d(maze);
        state.player.pos = state.maze.cell_center(state.maze.finish, CELL);
        state.player.vel = Vec2::new(-400.0, -400.0);

        let report = tick_2d(&mut state, &idle());
        assert!(report.completed);
        assert_eq!(state.phase, Phase::Complete);
        assert_eq!(state.events.len(), 1);
        assert!(matches!(state.events[0], GameEvent::Completed { elapsed_ms } if elapsed_ms > 0.0));

        // Frozen afterwards, no second event
        let pos = state.player.pos;
        tick_2d(&mut state, &keys(1.0, 0.0));
        assert_eq!(state.player.pos, pos);
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn test_tilt_smoothing_and_friction() {
        let maze = MazeGrid::fully_walled(1, 1).unwrap();
        let mut state = PlayState2d::new(maze, 400.0, CalibrationProfile::default());
        // Keep the 1x1 finish from ending the run
        state.maze.finish = CellPos::new(5, 5);
        state.start();
        state.player.vel = Vec2::new(2.0, 0.0);

        let tilt = ControlVector {
            x: 0.5,
            y: 0.0,
            source: ControlSource::Tilt,
            ..Default::default()
        };
        tick_2d(&mut state, &tilt);
        // (2.0 * 0.9 + 0.5 * 1.0) * 0.95
        assert!((state.player.vel.x - 2.185).abs() < 1e-5);
    }

    #[test]
    fn test_touch_release_damping() {
        let maze = MazeGrid::fully_walled(1, 1).unwrap();
        let mut state = PlayState2d::new(maze, 400.0, CalibrationProfile::default());
        state.maze.finish = CellPos::new(5, 5);
        state.start();
        state.player.vel = Vec2::new(0.0, 4.0);

        let release = ControlVector {
            source: ControlSource::Touch,
            released: true,
            ..Default::default()
        };
        tick_2d(&mut state, &release);
        assert!((state.player.vel.y - 4.0 * 0.95 * 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_keys_walk_through_open_wall() {
        let mut maze = MazeGrid::fully_walled(1, 2).unwrap();
        maze.remove_wall(CellPos::new(0, 0), Direction::Right);
        let mut state = playing_2d(maze);

        let mut completed = false;
        for _ in 0..60 {
            let report = tick_2d(&mut state, &keys(1.0, 0.0));
            if report.completed {
                completed = true;
                break;
            }
        }
        assert!(completed);
        assert_eq!(state.events.len(), 1);
    }

    #[test]
    fn test_3d_margin_stops_at_wall() {
        let maze = MazeGrid::fully_walled(1, 2).unwrap();
        let mut state = PlayState3d::new(maze, CalibrationProfile::default());
        state.start();
        state.player.rotation = std::f32::consts::FRAC_PI_2; // +x

        let forward = ControlVector {
            x: 0.0,
            y: -1.0,
            source: ControlSource::Keys,
            fresh: true,
            released: false,
        };
        for _ in 0..100 {
            update_3d(&mut state, &forward, 1.0 / 60.0);
        }
        assert!(state.last_blocked);
        assert!((state.player.x - (CELL_SIZE_3D - WALL_MARGIN_3D)).abs() < 1e-4);
        assert_eq!(state.phase, Phase::Playing);
    }

    #[test]
    fn test_3d_reaches_finish_and_uses_wall_clock() {
        let mut maze = MazeGrid::fully_walled(1, 2).unwrap();
        maze.remove_wall(CellPos::new(0, 0), Direction::Right);
        let mut state = PlayState3d::new(maze, CalibrationProfile::default());
        state.start();
        assert!((state.player.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-6);

        let forward = ControlVector {
            y: -1.0,
            source: ControlSource::Keys,
            fresh: true,
            ..Default::default()
        };
        let mut frames = 0;
        while state.phase == Phase::Playing && frames < 200 {
            update_3d(&mut state, &forward, 0.05);
            frames += 1;
        }
        assert_eq!(state.phase, Phase::Complete);
        // 2 units to the boundary at 5 units/s, in 0.05 s frames
        match state.events[..] {
            [GameEvent::Completed { elapsed_ms }] => {
                assert!((elapsed_ms - frames as f64 * 50.0).abs() < 1e-3)
            }
            _ => panic!("expected one completion event"),
        }
    }

    #[test]
    fn test_3d_turning_wraps() {
        let maze = MazeGrid::fully_walled(1, 1).unwrap();
        let mut state = PlayState3d::new(maze, CalibrationProfile::default());
        state.maze.finish = CellPos::new(3, 3);
        state.start();
        let turn = ControlVector {
            x: 1.0,
            source: ControlSource::Keys,
            fresh: true,
            ..Default::default()
        };
        for _ in 0..200 {
            update_3d(&mut state, &turn, 0.1);
        }
        assert!(state.player.rotation >= -std::f32::consts::PI);
        assert!(state.player.rotation < std::f32::consts::PI);
    }

    #[test]
    fn test_3d_long_frame_is_clamped() {
        let maze = MazeGrid::fully_walled(1, 1).unwrap();
        let mut state = PlayState3d::new(maze, CalibrationProfile::default());
        state.maze.finish = CellPos::new(3, 3);
        state.start();
        update_3d(&mut state, &idle(), 5.0);
        assert!((state.elapsed_ms - 100.0).abs() < 1e-3);
        update_3d(&mut state, &idle(), f32::NAN);
        assert!((state.elapsed_ms - 100.0).abs() < 1e-3);
    }
}
