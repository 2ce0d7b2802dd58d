//! View-cone visibility
//!
//! A target is seen when it lies within range, inside the field-of-view
//! half-angle around the observer's forward direction, and nothing blocks the
//! straight segment to it.

use std::f32::consts::PI;

use glam::Vec2;

use crate::nav::VisibilityOracle;

/// Field of view of an observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCone {
    /// Half-angle in radians measured from the forward direction
    pub half_angle: f32,
    /// Maximum sight distance in world units
    pub range: f32,
}

impl ViewCone {
    #[must_use]
    pub const fn new(half_angle: f32, range: f32) -> Self {
        Self { half_angle, range }
    }

    /// Whether `target` is visible from `observer` looking along `forward`
    #[must_use]
    pub fn sees(
        &self,
        observer: Vec2,
        forward: Vec2,
        target: Vec2,
        oracle: &dyn VisibilityOracle,
    ) -> bool {
        is_visible(observer, forward, self.half_angle, self.range, target, oracle)
    }
}

/// Range, cone and occlusion test.
///
/// A target on top of the observer is always visible. A zero `forward` has no
/// direction, so only a full circle (`half_angle >= PI`) sees anything.
#[must_use]
pub fn is_visible(
    observer: Vec2,
    forward: Vec2,
    half_angle: f32,
    range: f32,
    target: Vec2,
    oracle: &dyn VisibilityOracle,
) -> bool {
    let to_target = target - observer;
    let distance = to_target.length();
    if !distance.is_finite() || distance > range {
        return false;
    }
    let Some(direction) = to_target.try_normalize() else {
        return true;
    };

    if half_angle < PI {
        let Some(forward) = forward.try_normalize() else {
            return false;
        };
        let angle = forward.dot(direction).clamp(-1.0, 1.0).acos();
        if angle > half_angle {
            return false;
        }
    }

    oracle.is_visible(observer, target)
}
