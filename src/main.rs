//! Tilt Maze entry point
//!
//! The browser build drives sessions from JS; natively this binary generates
//! a maze, prints it, and walks the shortest path with simulated key input.
//!
//! Usage: `tilt-maze [difficulty] [seed]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use tilt_maze::persistence::MemoryStore;
    use tilt_maze::platform;
    use tilt_maze::records::format_time;
    use tilt_maze::{BestTimes, CalibrationProfile, Difficulty, Session2d};

    platform::init_logging();

    let mut args = std::env::args().skip(1);
    let difficulty = args
        .next()
        .and_then(|s| {
            let parsed = Difficulty::from_str(&s);
            if parsed.is_none() {
                log::warn!("Unknown difficulty '{}', using easy", s);
            }
            parsed
        })
        .unwrap_or_default();
    let seed = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or_else(platform::random_seed);

    log::info!("Tilt Maze (native) starting: {} seed {}", difficulty.as_str(), seed);

    let mut store = MemoryStore::new();
    let profile = CalibrationProfile::load(&store, platform::now_ms());
    let mut best = BestTimes::load(&store);

    const BOARD_PX: f32 = 600.0;
    let mut session = match Session2d::for_difficulty(difficulty, BOARD_PX, profile, seed) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Could not build maze: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", session.maze());

    let Some(path) = session.maze().solution() else {
        log::error!("Maze has no solution");
        std::process::exit(1);
    };
    println!("Shortest path: {} cells", path.len());

    let finished = std::rc::Rc::new(std::cell::Cell::new(None));
    let sink = finished.clone();
    session.on_complete(move |ms| sink.set(Some(ms)));

    best.record_start(difficulty);
    let Some(handle) = session.start() else {
        log::error!("Session could not start");
        std::process::exit(1);
    };
    autopilot::run(&mut session, handle, &path);

    match finished.get() {
        Some(elapsed_ms) => {
            let is_best = best.record_completion(difficulty, elapsed_ms, platform::now_ms());
            println!(
                "Finished in {}{}",
                format_time(elapsed_ms),
                if is_best { " (new best)" } else { "" }
            );
            if let Err(e) = best.save(&mut store) {
                log::warn!("Could not save best times: {}", e);
            }
        }
        None => println!("Autopilot gave up"),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is tilt_maze::web::wasm_start, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod autopilot {
    use tilt_maze::maze::CellPos;
    use tilt_maze::session::LoopHandle;
    use tilt_maze::sim::{InputMessage, Key};
    use tilt_maze::Session2d;

    const MAX_TICKS: u32 = 200_000;

    /// Hold the key toward the next path cell until the run completes
    pub fn run(session: &mut Session2d, handle: LoopHandle, path: &[CellPos]) {
        let cell_size = session.state().cell_size;
        // Slack of half a key step keeps each axis from oscillating
        let slack = tilt_maze::consts::KEY_SPEED * 0.5;
        let mut target = 1.min(path.len() - 1);
        let mut held: Option<Key> = None;

        for _ in 0..MAX_TICKS {
            if !session.is_running() {
                return;
            }
            let pos = session.state().player.pos;
            let mut delta = session.maze().cell_center(path[target], cell_size) - pos;
            if delta.length() < slack * 1.5 && target + 1 < path.len() {
                target += 1;
                delta = session.maze().cell_center(path[target], cell_size) - pos;
            }

            let want = if delta.x > slack {
                Some(Key::Right)
            } else if delta.x < -slack {
                Some(Key::Left)
            } else if delta.y > slack {
                Some(Key::Down)
            } else if delta.y < -slack {
                Some(Key::Up)
            } else {
                None
            };

            if want != held {
                if let Some(key) = held {
                    session.push_input(InputMessage::KeyUp(key));
                }
                if let Some(key) = want {
                    session.push_input(InputMessage::KeyDown(key));
                }
                held = want;
            }

            if session.tick(handle).is_none() {
                return;
            }
        }
        log::warn!("Autopilot stopped after {} ticks", MAX_TICKS);
    }
}
