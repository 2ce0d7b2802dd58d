//! Zone-aware chase agents for tile-based levels
//!
//! This crate provides:
//! - Navigation graphs built from tile maps, with zone tags and A* search
//! - Line-of-sight checks against the tile grid or rapier3d wall colliders
//! - A wander/hunt/chase/return state machine driving each agent
//! - A hecs-backed host that ticks every agent of a level

pub mod ai;
pub mod core;
pub mod nav;
pub mod perception;
pub mod physics;
pub mod sim;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{Agent, AgentState, Facing, Signal};
    pub use crate::core::{AgentConfig, HauntConfig, HauntEvent, LevelDesc, SearchRefresh};
    pub use crate::nav::{NavGraph, Pathfinder, TileMap, VisibilityOracle, ZoneId};
    pub use crate::physics::Physics;
    pub use crate::sim::{AgentSnapshot, Haunt};
    pub use glam::Vec2;
}
