//! Physics module
//!
//! Wall colliders and ray queries built on top of rapier3d

mod world;

pub use world::{ColliderHandle, Physics, RaycastHit};
