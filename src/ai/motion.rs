//! Path following for agents
//!
//! Moves an agent along its [`Path`] at a fixed speed, node by node.

use glam::Vec2;

use crate::nav::{NavGraph, NodeId, Path};

/// Default distance at which a node counts as reached
pub const DEFAULT_ARRIVAL_TOLERANCE: f32 = 0.1;

/// Four-way facing for sprite and animation selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Facing along the dominant axis of `direction`. Ties favour the vertical axis.
    #[must_use]
    pub fn from_direction(direction: Vec2) -> Option<Self> {
        if direction == Vec2::ZERO || !direction.is_finite() {
            return None;
        }
        Some(if direction.x.abs() > direction.y.abs() {
            if direction.x > 0.0 { Self::Right } else { Self::Left }
        } else if direction.y > 0.0 {
            Self::Up
        } else {
            Self::Down
        })
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Where an agent is and which way it faces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub position: Vec2,
    /// Unit vector of the last movement, or the spawn orientation
    pub forward: Vec2,
    /// Last node reached
    pub current_node: NodeId,
}

impl Kinematics {
    #[must_use]
    pub fn new(position: Vec2, current_node: NodeId) -> Self {
        Self {
            position,
            forward: Vec2::NEG_Y,
            current_node,
        }
    }

    #[must_use]
    pub fn facing(&self) -> Facing {
        Facing::from_direction(self.forward).unwrap_or_default()
    }
}

/// Result of one motion step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// Still travelling towards the head node
    Moving,
    /// Reached an intermediate node; more remain
    ReachedNode(NodeId),
    /// Reached the last node of the path
    Arrived(NodeId),
    /// Path was empty or referenced a node outside the graph
    NoPath,
}

/// Moves agents along paths
#[derive(Debug, Clone, Copy)]
pub struct MotionController {
    arrival_tolerance: f32,
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new(DEFAULT_ARRIVAL_TOLERANCE)
    }
}

impl MotionController {
    #[must_use]
    pub fn new(arrival_tolerance: f32) -> Self {
        Self {
            arrival_tolerance: arrival_tolerance.max(0.0),
        }
    }

    #[must_use]
    pub const fn arrival_tolerance(&self) -> f32 {
        self.arrival_tolerance
    }

    /// Move `kinematics` towards the head of `path` by `speed * dt`.
    ///
    /// At most one node is consumed per call. An invalid head node clears the
    /// whole path.
    pub fn advance(
        &self,
        graph: &NavGraph,
        path: &mut Path,
        kinematics: &mut Kinematics,
        speed: f32,
        dt: f32,
    ) -> MotionOutcome {
        let Some(head) = path.head() else {
            return MotionOutcome::NoPath;
        };
        let Some(target) = graph.position(head) else {
            log::debug!("Path references unknown node {head}, dropping it");
            path.clear();
            return MotionOutcome::NoPath;
        };

        let step = (speed * dt).max(0.0);
        let to_target = target - kinematics.position;
        if let Some(direction) = to_target.try_normalize() {
            kinematics.forward = direction;
        }
        kinematics.position = move_towards(kinematics.position, target, step);

        if kinematics.position.distance(target) > self.arrival_tolerance {
            return MotionOutcome::Moving;
        }

        path.pop_front();
        kinematics.current_node = head;
        if path.is_empty() {
            MotionOutcome::Arrived(head)
        } else {
            MotionOutcome::ReachedNode(head)
        }
    }
}

/// Move `current` towards `target` by at most `max_delta`
#[must_use]
pub fn move_towards(current: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let offset = target - current;
    let distance = offset.length();
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + offset / distance * max_delta
    }
}
