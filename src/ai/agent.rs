//! A single haunting agent
//!
//! Owns its position, path, timers and random stream. The navigation graph and
//! pathfinder are shared read-only between all agents of a level.

use std::sync::Arc;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

use super::fsm::{AgentState, Signal, Transition};
use super::motion::{Facing, Kinematics, MotionController, MotionOutcome, move_towards};
use super::timer::Countdown;
use crate::core::{AgentConfig, SearchRefresh};
use crate::nav::{NodeId, Path, PathResult, PathStatus, Pathfinder, ZoneId};

/// The four independent countdowns an agent runs
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentTimers {
    /// Remaining hunt time, counting in Hunting and Chasing
    pub hunt: Countdown,
    /// Time until `start_hunt` is accepted again
    pub cooldown: Countdown,
    /// Time a chaser keeps looking after losing sight
    pub search: Countdown,
    /// Pause between legs, or retry delay after a failed path
    pub wait: Countdown,
}

impl AgentTimers {
    fn advance(&mut self, dt: f32, state: AgentState, waiting: bool, target_visible: bool) {
        self.cooldown.tick(dt);
        if waiting {
            self.wait.tick(dt);
        }
        if state.is_hunting() {
            self.hunt.tick(dt);
        }
        if state == AgentState::Chasing && !target_visible {
            self.search.tick(dt);
        }
    }
}

/// A non-player agent that wanders its home zone, hunts on command and chases
/// a target it can see.
#[derive(Debug)]
pub struct Agent {
    pub(super) config: AgentConfig,
    pub(super) pathfinder: Arc<Pathfinder>,
    pub(super) home_zone: ZoneId,
    pub(super) kinematics: Kinematics,
    pub(super) path: Path,
    pub(super) state: AgentState,
    /// Wandering sub-mode, also used as retry back-off in other states
    pub(super) waiting: bool,
    pub(super) timers: AgentTimers,
    /// Target position seen this tick, if any
    pub(super) sighting: Option<Vec2>,
    pub(super) last_known_target: Option<Vec2>,
    pub(super) return_goal: Option<NodeId>,
    pub(super) speed: f32,
    pub(super) base_speed: f32,
    pub(super) motion: MotionController,
    rng: ChaCha8Rng,
    signals: SmallVec<[Signal; 8]>,
}

impl Agent {
    /// Create an agent at the graph node nearest `position`.
    ///
    /// Returns `None` when the graph has no nodes. The first wander leg is
    /// chosen on the first tick.
    #[must_use]
    pub fn new(
        config: AgentConfig,
        pathfinder: Arc<Pathfinder>,
        home_zone: ZoneId,
        position: Vec2,
        seed: u64,
    ) -> Option<Self> {
        let graph = pathfinder.graph();
        let node = graph.nearest_node(position)?;
        let snapped = graph.position(node)?;

        let mut agent = Self {
            motion: MotionController::new(config.arrival_tolerance),
            speed: config.base_speed,
            base_speed: config.base_speed,
            config,
            pathfinder,
            home_zone,
            kinematics: Kinematics::new(snapped, node),
            path: Path::default(),
            state: AgentState::Wandering,
            waiting: false,
            timers: AgentTimers::default(),
            sighting: None,
            last_known_target: None,
            return_goal: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            signals: SmallVec::new(),
        };
        AgentState::Wandering.behavior().enter(&mut agent);
        agent.timers.wait.start(0.0);
        Some(agent)
    }

    /// Advance the agent by `dt` seconds.
    ///
    /// `sighting` is the target position when the agent can see it this tick.
    /// Order: timers advance, then hunt expiry, then visibility changes, then
    /// the active state's update. A tick that switches state on a timer or
    /// visibility change skips the update.
    pub fn tick(&mut self, dt: f32, sighting: Option<Vec2>) {
        let was_visible = self.sighting.is_some();
        self.sighting = sighting;
        self.timers
            .advance(dt, self.state, self.waiting, sighting.is_some());

        if let Some(next) = self.forced_transition() {
            // The new state's path request was made in enter(); movement starts next tick
            self.change_state(next);
            return;
        }

        if self.state == AgentState::Chasing {
            match (was_visible, sighting) {
                (false, Some(target)) => {
                    self.emit(Signal::TargetSpotted(target));
                    if self.config.search_refresh == SearchRefresh::Restart {
                        self.timers.search.start(self.config.search_duration);
                    }
                }
                (true, None) => self.emit(Signal::TargetLost),
                _ => {}
            }
        }

        if let Transition::To(next) = self.state.behavior().update(self, dt) {
            self.change_state(next);
        }
    }

    /// Timer and visibility driven switches, highest priority first
    fn forced_transition(&self) -> Option<AgentState> {
        let visible = self.sighting.is_some();
        match self.state {
            AgentState::Hunting | AgentState::Chasing if self.timers.hunt.is_expired() => {
                Some(AgentState::Returning)
            }
            AgentState::Wandering | AgentState::Hunting if visible => Some(AgentState::Chasing),
            AgentState::Chasing if !visible && self.timers.search.is_expired() => {
                Some(AgentState::Hunting)
            }
            _ => None,
        }
    }

    /// Begin a hunt.
    ///
    /// Ignored while the cooldown runs or when the agent is not wandering.
    /// Returns whether the hunt started.
    pub fn start_hunt(&mut self) -> bool {
        if self.timers.cooldown.is_running() || self.state != AgentState::Wandering {
            log::debug!(
                "Hunt ignored in {} (cooldown {:.1}s)",
                self.state,
                self.timers.cooldown.remaining()
            );
            self.emit(Signal::HuntIgnored {
                state: self.state,
                cooldown_remaining: self.timers.cooldown.remaining(),
            });
            return false;
        }

        self.timers.hunt.start(self.config.hunt_duration);
        self.speed = self.config.hunt_speed();
        self.change_state(AgentState::Hunting);
        true
    }

    pub(super) fn change_state(&mut self, to: AgentState) {
        let from = self.state;
        if from == to {
            return;
        }
        from.behavior().exit(self);
        self.state = to;
        log::debug!(
            "Agent at {} changed {from} -> {to} (speed {:.2})",
            self.kinematics.current_node,
            self.speed
        );
        self.emit(Signal::StateChanged { from, to });
        to.behavior().enter(self);
    }

    // ------------------------------------------------------------------------
    // Helpers used by the state behaviors
    // ------------------------------------------------------------------------

    pub(super) fn emit(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// Start a pause with a duration drawn from the configured interval
    pub(super) fn begin_wait(&mut self) {
        let (min, max) = (self.config.wait_min, self.config.wait_max);
        let duration = if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        };
        self.waiting = true;
        self.timers.wait.start(duration);
    }

    pub(super) fn end_wait(&mut self) {
        self.waiting = false;
        self.timers.wait.stop();
    }

    /// Zone of the current node, or the home zone on untagged floor
    pub(super) fn current_zone(&self) -> ZoneId {
        self.pathfinder
            .graph()
            .zone_of(self.kinematics.current_node)
            .unwrap_or(self.home_zone)
    }

    /// A uniformly random node of `zone` (or of the whole level), avoiding the
    /// current node whenever there is another choice
    pub(super) fn random_node(&mut self, zone: Option<ZoneId>) -> Option<NodeId> {
        let graph = self.pathfinder.graph();
        let candidates = match zone {
            Some(zone) => graph.zone_nodes(zone),
            None => graph.node_ids(),
        };
        pick_excluding(&mut self.rng, candidates, self.kinematics.current_node)
    }

    /// Replace the current path with a fresh one to `goal`
    pub(super) fn request_path(&mut self, goal: NodeId) -> PathStatus {
        let result = self
            .pathfinder
            .generate_path(self.kinematics.current_node, goal);
        let status = result.status();
        self.emit(Signal::PathRequested { goal, status });

        match result {
            PathResult::Found(path) => self.path = path,
            PathResult::AlreadyAtGoal => self.path.clear(),
            PathResult::Unreachable => {
                log::trace!(
                    "No path from {} to {goal} in {}",
                    self.kinematics.current_node,
                    self.state
                );
                self.path.clear();
                self.emit(Signal::PathFailed { goal });
            }
        }
        status
    }

    /// Path to the node nearest a world position
    pub(super) fn request_path_towards(&mut self, position: Vec2) -> PathStatus {
        match self.pathfinder.graph().nearest_node(position) {
            Some(goal) => self.request_path(goal),
            None => {
                self.path.clear();
                PathStatus::Unreachable
            }
        }
    }

    /// Follow the path for one tick and report node events
    pub(super) fn step_motion(&mut self, dt: f32) -> MotionOutcome {
        let outcome = self.motion.advance(
            self.pathfinder.graph(),
            &mut self.path,
            &mut self.kinematics,
            self.speed,
            dt,
        );
        match outcome {
            MotionOutcome::ReachedNode(node) => self.emit(Signal::ReachedNode(node)),
            MotionOutcome::Arrived(node) => self.emit(Signal::Arrived(node)),
            MotionOutcome::Moving | MotionOutcome::NoPath => {}
        }
        outcome
    }

    /// Move straight towards a point, off the graph
    pub(super) fn approach(&mut self, target: Vec2, dt: f32) {
        let position = self.kinematics.position;
        if let Some(direction) = (target - position).try_normalize() {
            self.kinematics.forward = direction;
        }
        self.kinematics.position = move_towards(position, target, self.speed * dt);
    }

    // ------------------------------------------------------------------------
    // Presentation and inspection
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> AgentState {
        self.state
    }

    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.kinematics.position
    }

    /// Unit vector the agent faces
    #[must_use]
    pub fn facing(&self) -> Vec2 {
        self.kinematics.forward
    }

    /// Four-way facing for sprite selection
    #[must_use]
    pub fn cardinal_facing(&self) -> Facing {
        self.kinematics.facing()
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[must_use]
    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    #[must_use]
    pub fn current_node(&self) -> NodeId {
        self.kinematics.current_node
    }

    #[must_use]
    pub fn home_zone(&self) -> ZoneId {
        self.home_zone
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn last_known_target(&self) -> Option<Vec2> {
        self.last_known_target
    }

    /// Whether the target was visible on the last tick
    #[must_use]
    pub fn target_visible(&self) -> bool {
        self.sighting.is_some()
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    #[must_use]
    pub fn timers(&self) -> &AgentTimers {
        &self.timers
    }

    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    #[must_use]
    pub fn pathfinder(&self) -> &Arc<Pathfinder> {
        &self.pathfinder
    }

    /// Take the signals collected since the last drain
    pub fn drain_signals(&mut self) -> impl Iterator<Item = Signal> + '_ {
        self.signals.drain(..)
    }
}

/// Uniform choice among `candidates` other than `exclude`, unless it is the only one
fn pick_excluding(rng: &mut impl Rng, candidates: &[NodeId], exclude: NodeId) -> Option<NodeId> {
    match candidates {
        [] => None,
        [only] => Some(*only),
        _ => match candidates.iter().position(|&id| id == exclude) {
            Some(skip) => {
                let i = rng.gen_range(0..candidates.len() - 1);
                Some(candidates[if i >= skip { i + 1 } else { i }])
            }
            None => Some(candidates[rng.gen_range(0..candidates.len())]),
        },
    }
}
