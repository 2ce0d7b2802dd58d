//! Headless demo: agents hunt a target walking a loop through the level
//!
//! Usage: `haunt [config.ron|config.json]`

use std::error::Error;

use haunt::prelude::*;

const DT: f32 = 1.0 / 30.0;
const DURATION: f32 = 90.0;
const HUNT_AT: f32 = 2.0;
const REPORT_EVERY: f32 = 5.0;
const TARGET_SPEED: f32 = 1.5;

/// Walks the target back and forth along a fixed list of waypoints
struct Patrol {
    waypoints: Vec<Vec2>,
    index: usize,
    position: Vec2,
}

impl Patrol {
    fn new(waypoints: Vec<Vec2>) -> Option<Self> {
        let position = *waypoints.first()?;
        Some(Self {
            waypoints,
            index: 0,
            position,
        })
    }

    fn step(&mut self, dt: f32) -> Vec2 {
        let goal = self.waypoints[self.index];
        self.position = haunt::ai::move_towards(self.position, goal, TARGET_SPEED * dt);
        if self.position == goal {
            self.index = (self.index + 1) % self.waypoints.len();
        }
        self.position
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading configuration from {path}");
            HauntConfig::load(&path)?
        }
        None => HauntConfig::default(),
    };

    let mut haunt = Haunt::from_config(&config)?;

    // Loop through every zone's first node
    let graph = haunt.graph();
    let waypoints = graph
        .zones()
        .iter()
        .filter_map(|&zone| graph.zone_nodes(zone).first().copied())
        .filter_map(|node| graph.position(node))
        .collect();
    let Some(mut patrol) = Patrol::new(waypoints) else {
        return Err("level has no navigation nodes".into());
    };

    let mut hunt_started = false;
    let mut next_report = 0.0;
    while haunt.time() < DURATION {
        if !hunt_started && haunt.time() >= HUNT_AT {
            let started = haunt.start_hunt_all();
            log::info!("Hunt started for {started} agent(s)");
            hunt_started = true;
        }

        haunt.set_target(Some(patrol.step(DT)));
        haunt.tick(DT);

        for event in haunt.events().iter() {
            match event {
                HauntEvent::TargetCaught { position, .. } => {
                    log::info!("[{:6.2}] target caught at {position}", haunt.time());
                }
                other => log::debug!("[{:6.2}] {other:?}", haunt.time()),
            }
        }

        if haunt.time() >= next_report {
            for snapshot in haunt.snapshots() {
                log::info!(
                    "[{:6.2}] {:<8} {:<10} at ({:5.2}, {:5.2}) facing {:<5} speed {:.2}",
                    haunt.time(),
                    snapshot.name,
                    snapshot.state,
                    snapshot.position.x,
                    snapshot.position.y,
                    snapshot.facing.name(),
                    snapshot.speed
                );
            }
            next_report += REPORT_EVERY;
        }
    }

    Ok(())
}
