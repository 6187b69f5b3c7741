//! Countdown timer driven by explicit elapsed-time intake.
//!
//! The countdown never reads a clock itself. Callers feed it elapsed time
//! through [`Countdown::advance`] and receive tick/expiry as return values, so
//! the same code runs under a real interval ticker and under unit tests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Observable timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_secs: u64,
    pub running: bool,
}

/// Token identifying one `start` of a countdown.
///
/// Cancelling with a token from an earlier start is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct TimerToken(u64);

/// What a call to [`Countdown::advance`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// No whole second elapsed, or the timer is not running.
    Idle,
    /// One or more seconds elapsed.
    Ticked { remaining_secs: u64 },
    /// The countdown reached zero during this advance. Fired once per start.
    Expired,
}

/// A one-second-granularity countdown with pause and resume.
#[derive(Debug, Clone, Default)]
pub struct Countdown {
    remaining_secs: u64,
    running: bool,
    expired: bool,
    /// Sub-second progress carried across pause/resume.
    carry: Duration,
    generation: u64,
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) the countdown and sets it running.
    pub fn start(&mut self, duration_secs: u64) -> TimerToken {
        self.generation += 1;
        self.remaining_secs = duration_secs;
        self.running = true;
        self.expired = false;
        self.carry = Duration::ZERO;
        TimerToken(self.generation)
    }

    /// Pauses the countdown. Returns whether the state changed.
    pub fn pause(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        true
    }

    /// Resumes a paused countdown. Returns whether the state changed.
    ///
    /// An expired countdown stays stopped.
    pub fn resume(&mut self) -> bool {
        if self.running || self.expired || self.generation == 0 {
            return false;
        }
        self.running = true;
        true
    }

    /// Stops the countdown and drops any partial second.
    pub fn stop(&mut self) {
        self.running = false;
        self.carry = Duration::ZERO;
    }

    /// Cancels the countdown started with `token`, returning it to idle.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        if token.0 != self.generation {
            return false;
        }
        self.stop();
        self.remaining_secs = 0;
        self.expired = false;
        true
    }

    /// Feeds elapsed wall time into the countdown.
    pub fn advance(&mut self, elapsed: Duration) -> TimerSignal {
        if !self.running {
            return TimerSignal::Idle;
        }

        self.carry += elapsed;
        let whole = self.carry.as_secs();
        self.carry -= Duration::from_secs(whole);
        debug_assert!(self.carry < ONE_SECOND);

        self.remaining_secs = self.remaining_secs.saturating_sub(whole);
        if self.remaining_secs == 0 {
            self.running = false;
            self.expired = true;
            self.carry = Duration::ZERO;
            return TimerSignal::Expired;
        }

        if whole == 0 {
            TimerSignal::Idle
        } else {
            TimerSignal::Ticked {
                remaining_secs: self.remaining_secs,
            }
        }
    }

    #[must_use]
    pub const fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub const fn is_expired(&self) -> bool {
        self.expired
    }

    #[must_use]
    pub const fn state(&self) -> TimerState {
        TimerState {
            remaining_secs: self.remaining_secs,
            running: self.running,
        }
    }
}

/// Renders seconds as `MM:SS`. Minutes are not wrapped into hours.
#[must_use]
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn decrements_once_per_elapsed_second() {
        let mut timer = Countdown::new();
        let _token = timer.start(10);

        assert_eq!(timer.advance(ms(400)), TimerSignal::Idle);
        assert_eq!(timer.remaining_secs(), 10);
        assert_eq!(
            timer.advance(ms(700)),
            TimerSignal::Ticked { remaining_secs: 9 }
        );
        assert_eq!(
            timer.advance(ms(2_300)),
            TimerSignal::Ticked { remaining_secs: 7 }
        );
    }

    #[test]
    fn expires_exactly_once_and_stops() {
        let mut timer = Countdown::new();
        let _token = timer.start(2);

        assert_eq!(
            timer.advance(ms(1_000)),
            TimerSignal::Ticked { remaining_secs: 1 }
        );
        assert_eq!(timer.advance(ms(5_000)), TimerSignal::Expired);
        assert_eq!(timer.remaining_secs(), 0);
        assert!(!timer.is_running());
        assert_eq!(timer.advance(ms(1_000)), TimerSignal::Idle);
        assert!(!timer.resume());
    }

    #[test]
    fn pause_mid_second_keeps_partial_progress() {
        let mut timer = Countdown::new();
        let _token = timer.start(5);

        timer.advance(ms(600));
        assert!(timer.pause());
        assert_eq!(timer.advance(ms(10_000)), TimerSignal::Idle);
        assert_eq!(timer.remaining_secs(), 5);

        assert!(timer.resume());
        assert_eq!(
            timer.advance(ms(400)),
            TimerSignal::Ticked { remaining_secs: 4 }
        );
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let mut timer = Countdown::new();
        assert!(!timer.resume());

        let _token = timer.start(30);
        assert!(!timer.resume());
        assert!(timer.pause());
        assert!(!timer.pause());
        assert!(timer.resume());
        assert!(timer.is_running());
    }

    #[test]
    fn remaining_is_monotonic_across_pause_resume_sequences() {
        let mut timer = Countdown::new();
        let _token = timer.start(20);
        let steps = [
            (true, 700),
            (false, 3_000),
            (true, 1_500),
            (false, 100),
            (true, 2_900),
            (true, 50),
            (false, 9_000),
            (true, 4_000),
        ];

        let mut last = timer.remaining_secs();
        for (running, millis) in steps {
            if running {
                timer.resume();
            } else {
                timer.pause();
            }
            timer.advance(ms(millis));
            let now = timer.remaining_secs();
            if running {
                assert!(now <= last, "remaining grew while running");
            } else {
                assert_eq!(now, last, "remaining changed while paused");
            }
            last = now;
        }
        assert_eq!(last, 11);
    }

    #[test]
    fn cancel_ignores_stale_token() {
        let mut timer = Countdown::new();
        let first = timer.start(10);
        let second = timer.start(20);

        assert!(!timer.cancel(first));
        assert_eq!(timer.remaining_secs(), 20);
        assert!(timer.cancel(second));
        assert_eq!(timer.state(), TimerState::default());
    }

    #[test]
    fn zero_duration_expires_on_first_advance() {
        let mut timer = Countdown::new();
        let _token = timer.start(0);
        assert_eq!(timer.advance(Duration::ZERO), TimerSignal::Expired);
    }

    #[test]
    fn format_clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(360), "06:00");
        assert_eq!(format_clock(25 * 60 - 1), "24:59");
        assert_eq!(format_clock(6_000), "100:00");
    }
}
