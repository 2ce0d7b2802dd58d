//! Countdown timers polled once per tick

/// A decrement-and-compare countdown.
///
/// Waiting is a guard checked each tick, never a suspension: callers
/// `tick()` the timer and test `is_expired()`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Countdown {
    remaining: f32,
    active: bool,
}

impl Countdown {
    /// A stopped timer
    pub const fn stopped() -> Self {
        Self {
            remaining: 0.0,
            active: false,
        }
    }

    /// (Re)start the timer with `duration` seconds remaining
    pub fn start(&mut self, duration: f32) {
        self.remaining = duration.max(0.0);
        self.active = true;
    }

    /// Advance by `dt`. Stopped timers are unaffected.
    pub fn tick(&mut self, dt: f32) {
        if self.active {
            self.remaining = (self.remaining - dt).max(0.0);
        }
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.remaining = 0.0;
    }

    /// Started and reached zero
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.active && self.remaining <= 0.0
    }

    /// Started and time left
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active && self.remaining > 0.0
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Seconds left; zero when stopped
    #[must_use]
    pub fn remaining(&self) -> f32 {
        if self.active { self.remaining } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_expires() {
        let mut timer = Countdown::stopped();
        assert!(!timer.is_expired());
        assert!(!timer.is_running());

        timer.start(2.0);
        assert!(timer.is_running());
        timer.tick(1.5);
        assert!(!timer.is_expired());
        timer.tick(1.0);
        assert!(timer.is_expired());
        assert_eq!(timer.remaining(), 0.0);
    }

    #[test]
    fn test_stopped_timer_ignores_ticks() {
        let mut timer = Countdown::default();
        timer.tick(10.0);
        assert!(!timer.is_active());

        timer.start(1.0);
        timer.stop();
        timer.tick(5.0);
        assert!(!timer.is_expired());
    }

    #[test]
    fn test_zero_duration_expires_immediately() {
        let mut timer = Countdown::stopped();
        timer.start(0.0);
        assert!(timer.is_expired());

        timer.start(-3.0);
        assert!(timer.is_expired());
    }
}
