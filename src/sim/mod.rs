//! Simulation module
//!
//! Hosts a level's agents in a hecs world and ticks them against a target.

mod haunt;

pub use haunt::{AgentSnapshot, Haunt, Name};
