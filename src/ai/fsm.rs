//! Behavior states for haunting agents
//!
//! Each state is a stateless behavior with `enter`/`update`/`exit` hooks that
//! act on the [`Agent`] it drives. The lifecycle is:
//!
//! 1. `enter()` - called once when the agent switches to the state
//! 2. `update()` - called every tick while the state is active
//! 3. `exit()` - called once when the agent leaves the state
//!
//! Timer and visibility driven switches are decided by [`Agent::tick`] before
//! `update()` runs, so they take priority over anything a state requests.

use std::fmt;

use glam::Vec2;

use super::agent::Agent;
use super::motion::MotionOutcome;
use crate::nav::{NodeId, Path, PathStatus};

// ============================================================================
// States
// ============================================================================

/// High-level behavior of an agent, also used for animation selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentState {
    /// Roaming the current zone, pausing between legs
    Wandering,
    /// Roaming the whole level at hunt speed
    Hunting,
    /// Pursuing the target's last known position
    Chasing,
    /// Heading back to the home zone after a hunt
    Returning,
}

impl AgentState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wandering => "Wandering",
            Self::Hunting => "Hunting",
            Self::Chasing => "Chasing",
            Self::Returning => "Returning",
        }
    }

    /// Whether the hunt timer runs in this state
    #[must_use]
    pub const fn is_hunting(self) -> bool {
        matches!(self, Self::Hunting | Self::Chasing)
    }

    pub(super) fn behavior(self) -> &'static dyn Behavior {
        match self {
            Self::Wandering => &Wander,
            Self::Hunting => &Hunt,
            Self::Chasing => &Chase,
            Self::Returning => &Return,
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A state's decision at the end of its update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stay in the current state.
    None,
    /// Switch to another state.
    To(AgentState),
}

// ============================================================================
// Signals
// ============================================================================

/// Something that happened to an agent during a tick.
///
/// Collected per agent and drained by the host for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    StateChanged { from: AgentState, to: AgentState },
    /// A path was requested; `status` is the pathfinder's answer
    PathRequested { goal: NodeId, status: PathStatus },
    /// The requested goal cannot be reached from the current node
    PathFailed { goal: NodeId },
    /// The target came into view at this position
    TargetSpotted(Vec2),
    /// The target left view while being chased
    TargetLost,
    /// An intermediate path node was reached
    ReachedNode(NodeId),
    /// The final node of a path was reached
    Arrived(NodeId),
    /// `start_hunt` was refused
    HuntIgnored {
        state: AgentState,
        cooldown_remaining: f32,
    },
}

// ============================================================================
// Behavior trait
// ============================================================================

pub(super) trait Behavior: fmt::Debug {
    fn enter(&self, _agent: &mut Agent) {}

    fn update(&self, agent: &mut Agent, dt: f32) -> Transition;

    fn exit(&self, _agent: &mut Agent) {}
}

/// Wandering: pause, walk to a random node of the current zone, repeat.
#[derive(Debug)]
struct Wander;

impl Behavior for Wander {
    fn enter(&self, agent: &mut Agent) {
        agent.path.clear();
        agent.begin_wait();
    }

    fn update(&self, agent: &mut Agent, dt: f32) -> Transition {
        if agent.waiting {
            if agent.timers.wait.is_expired() {
                agent.end_wait();
                let zone = agent.current_zone();
                let moving = agent
                    .random_node(Some(zone))
                    .is_some_and(|goal| agent.request_path(goal).is_found());
                if !moving {
                    agent.begin_wait();
                }
            }
            return Transition::None;
        }

        match agent.step_motion(dt) {
            MotionOutcome::Arrived(_) | MotionOutcome::NoPath => agent.begin_wait(),
            MotionOutcome::Moving | MotionOutcome::ReachedNode(_) => {}
        }
        Transition::None
    }

    fn exit(&self, agent: &mut Agent) {
        agent.end_wait();
    }
}

/// Hunting: walk to random nodes anywhere in the level.
#[derive(Debug)]
struct Hunt;

impl Hunt {
    fn pick_destination(agent: &mut Agent) {
        let moving = agent
            .random_node(None)
            .is_some_and(|goal| agent.request_path(goal).is_found());
        if !moving {
            // Retry after a pause
            agent.begin_wait();
        }
    }
}

impl Behavior for Hunt {
    fn enter(&self, agent: &mut Agent) {
        if !agent.timers.hunt.is_active() {
            agent.timers.hunt.start(agent.config.hunt_duration);
        }
        agent.end_wait();
        Self::pick_destination(agent);
    }

    fn update(&self, agent: &mut Agent, dt: f32) -> Transition {
        if agent.waiting {
            if agent.timers.wait.is_expired() {
                agent.end_wait();
                Self::pick_destination(agent);
            }
            return Transition::None;
        }

        match agent.step_motion(dt) {
            MotionOutcome::Arrived(_) | MotionOutcome::NoPath => Self::pick_destination(agent),
            MotionOutcome::Moving | MotionOutcome::ReachedNode(_) => {}
        }
        Transition::None
    }

    fn exit(&self, agent: &mut Agent) {
        agent.end_wait();
    }
}

/// Chasing: re-path towards the target every tick it is visible, otherwise
/// head for where it was last seen.
#[derive(Debug)]
struct Chase;

impl Behavior for Chase {
    fn enter(&self, agent: &mut Agent) {
        agent.end_wait();
        agent.path.clear();
        agent.timers.search.start(agent.config.search_duration);
        if let Some(target) = agent.sighting {
            agent.last_known_target = Some(target);
            agent.emit(Signal::TargetSpotted(target));
            agent.request_path_towards(target);
        }
    }

    fn update(&self, agent: &mut Agent, dt: f32) -> Transition {
        if let Some(target) = agent.sighting {
            agent.last_known_target = Some(target);
            agent.request_path_towards(target);
        }

        if agent.step_motion(dt) == MotionOutcome::NoPath {
            // Standing on the node nearest the target; close the last gap directly
            if let Some(target) = agent.sighting {
                agent.approach(target, dt);
            }
        }
        Transition::None
    }

    fn exit(&self, agent: &mut Agent) {
        agent.timers.search.stop();
    }
}

/// Returning: walk to the nearest home-zone node at reduced speed.
#[derive(Debug)]
struct Return;

impl Return {
    fn head_home(agent: &mut Agent, goal: NodeId) {
        match agent.request_path(goal) {
            PathStatus::Found { .. } => {}
            PathStatus::AlreadyAtGoal => {
                // Step back onto the node if a chase left us beside it
                if let Some(position) = agent.pathfinder.graph().position(goal) {
                    let offset = agent.kinematics.position.distance(position);
                    if offset > agent.motion.arrival_tolerance() {
                        agent.path = Path::new([goal], offset);
                    }
                }
            }
            PathStatus::Unreachable => agent.begin_wait(),
        }
    }
}

impl Behavior for Return {
    fn enter(&self, agent: &mut Agent) {
        agent.speed *= agent.config.return_speed_factor;
        agent.timers.cooldown.start(agent.config.cooldown_duration);
        agent.timers.hunt.stop();
        agent.end_wait();
        agent.path.clear();

        let graph = agent.pathfinder.graph();
        agent.return_goal = graph.nearest_node_in_zone(agent.kinematics.position, agent.home_zone);
        match agent.return_goal {
            Some(goal) => Self::head_home(agent, goal),
            None => log::warn!(
                "Home {} has no navigation nodes; returning completes in place",
                agent.home_zone
            ),
        }
    }

    fn update(&self, agent: &mut Agent, dt: f32) -> Transition {
        let Some(goal) = agent.return_goal else {
            return Transition::To(AgentState::Wandering);
        };

        if agent.waiting {
            if agent.timers.wait.is_expired() {
                agent.end_wait();
                Self::head_home(agent, goal);
            }
            return Transition::None;
        }

        match agent.step_motion(dt) {
            MotionOutcome::Arrived(node) if node == goal => Transition::To(AgentState::Wandering),
            MotionOutcome::NoPath if agent.kinematics.current_node == goal => {
                Transition::To(AgentState::Wandering)
            }
            MotionOutcome::Arrived(_) | MotionOutcome::NoPath => {
                Self::head_home(agent, goal);
                Transition::None
            }
            MotionOutcome::Moving | MotionOutcome::ReachedNode(_) => Transition::None,
        }
    }

    fn exit(&self, agent: &mut Agent) {
        agent.speed = agent.base_speed;
        agent.timers.cooldown.start(agent.config.cooldown_duration);
        agent.return_goal = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(AgentState::Wandering.to_string(), "Wandering");
        assert_eq!(AgentState::Returning.name(), "Returning");
        assert!(AgentState::Chasing.is_hunting());
        assert!(!AgentState::Returning.is_hunting());
    }

    #[test]
    fn test_behavior_table_is_total() {
        let states = [
            AgentState::Wandering,
            AgentState::Hunting,
            AgentState::Chasing,
            AgentState::Returning,
        ];
        let names: Vec<String> = states
            .iter()
            .map(|s| format!("{:?}", s.behavior()))
            .collect();
        assert_eq!(names, ["Wander", "Hunt", "Chase", "Return"]);
    }
}
