//! Core module
//!
//! Configuration and the event queue shared by the simulation and its consumers

mod config;
mod events;

pub use config::{
    AgentConfig, AgentSpawn, ConfigError, HauntConfig, LevelDesc, NavConfig, OracleKind,
    SearchRefresh,
};
pub use events::{EventQueue, HauntEvent};
