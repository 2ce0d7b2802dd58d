//! Double-buffered event queue for presentation consumers
//!
//! Agents collect [`Signal`]s while they tick. The simulation forwards them
//! here, tagged with the agent's entity, so audio, animation or debug layers
//! can react without reaching into the agents.
//!
//! Events pushed during a tick become readable when that tick finishes and
//! stay readable until the next one finishes.
//!
//! # Example
//!
//! ```ignore
//! haunt.set_target(Some(player_position));
//! haunt.tick(dt);
//! for event in haunt.events().iter() {
//!     if let HauntEvent::TargetCaught { agent, .. } = event {
//!         game_over(*agent);
//!     }
//! }
//! ```

use std::collections::VecDeque;

use glam::Vec2;
use hecs::Entity;

use crate::ai::Signal;
use crate::nav::ZoneId;

// ============================================================================
// Event Types
// ============================================================================

/// Things that happened in the simulation.
///
/// `#[non_exhaustive]` so new variants do not break consumers using wildcards.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HauntEvent {
    /// An agent entered the level.
    AgentSpawned {
        agent: Entity,
        name: String,
        home_zone: ZoneId,
        position: Vec2,
    },

    /// An agent was removed.
    AgentDespawned { agent: Entity },

    /// Something happened to one agent during its tick.
    Agent { agent: Entity, signal: Signal },

    /// An agent got within catch distance of the target.
    TargetCaught {
        agent: Entity,
        /// Where the target was caught
        position: Vec2,
    },
}

impl HauntEvent {
    /// The agent this event concerns
    #[must_use]
    pub fn agent(&self) -> Entity {
        match self {
            Self::AgentSpawned { agent, .. }
            | Self::AgentDespawned { agent }
            | Self::Agent { agent, .. }
            | Self::TargetCaught { agent, .. } => *agent,
        }
    }
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue for tick-consistent event processing.
///
/// Readers only ever see the complete output of a finished tick, never a
/// partially ticked set of agents.
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written this tick
    pending: VecDeque<HauntEvent>,
    /// Events from the previous tick, ready for processing
    processing: VecDeque<HauntEvent>,
}

impl EventQueue {
    const DEFAULT_CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be read after the next `swap()`.
    #[inline]
    pub fn push(&mut self, event: HauntEvent) {
        self.pending.push_back(event);
    }

    /// Make this tick's events readable and start a fresh pending buffer.
    ///
    /// Events from the previous tick that were not drained are dropped.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Events from the previous tick
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &HauntEvent> {
        self.processing.iter()
    }

    /// Take ownership of the previous tick's events
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = HauntEvent> + '_ {
        self.processing.drain(..)
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Number of events waiting for the next swap
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear both buffers, e.g. on level teardown
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
