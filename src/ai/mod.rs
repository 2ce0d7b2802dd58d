//! Agent behavior module
//!
//! Provides the wander/hunt/chase/return state machine, path following and
//! the countdown timers that drive it.

mod agent;
mod fsm;
mod motion;
mod timer;

pub use agent::{Agent, AgentTimers};
pub use fsm::{AgentState, Signal, Transition};
pub use motion::{
    DEFAULT_ARRIVAL_TOLERANCE, Facing, Kinematics, MotionController, MotionOutcome, move_towards,
};
pub use timer::Countdown;
