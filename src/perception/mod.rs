//! Agent perception
//!
//! Geometric sight tests against a visibility oracle.

mod vision;

pub use vision::{ViewCone, is_visible};
