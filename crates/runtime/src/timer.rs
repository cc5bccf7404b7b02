use foundation::time::Clock;

/// Suggested host polling cadence for responsive countdown UI. Correctness
/// never depends on tick cadence: remaining time is always recomputed from
/// the absolute start time, so missed ticks cannot cause drift.
pub const RECOMMENDED_TICK_MS: u64 = 250;

/// One countdown observation.
///
/// `just_expired` is reported exactly once per timer, with
/// `remaining_ms == 0`; after that the timer has stopped itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimerPoll {
    pub remaining_ms: u64,
    pub just_expired: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TimerState {
    Running,
    Expired,
    Cancelled,
}

/// A cancellable countdown over host-supplied wall-clock time.
///
/// The timer is a pure state machine: the host drives it by polling with
/// the current epoch-ms time. Cancellation invalidates all future polls,
/// so a stale tick arriving after `cancel()` is suppressed by construction
/// rather than by callback bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTimer {
    limit_ms: u64,
    started_at_ms: u64,
    state: TimerState,
}

impl RoundTimer {
    /// Starts a countdown of `limit_ms` (> 0) at `now_ms`.
    pub fn start(now_ms: u64, limit_ms: u64) -> Self {
        debug_assert!(limit_ms > 0, "countdown limit must be positive");
        Self {
            limit_ms,
            started_at_ms: now_ms,
            state: TimerState::Running,
        }
    }

    pub fn start_with(clock: &impl Clock, limit_ms: u64) -> Self {
        Self::start(clock.now_ms(), limit_ms)
    }

    pub fn limit_ms(&self) -> u64 {
        self.limit_ms
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Remaining milliseconds, clamped to 0. A clock that momentarily runs
    /// backwards reads as "no time elapsed yet".
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.started_at_ms);
        self.limit_ms.saturating_sub(elapsed)
    }

    /// Observes the countdown at `now_ms`.
    ///
    /// Returns `None` once the timer has expired or been cancelled; the
    /// expiry itself is observed exactly once, as `just_expired` with a
    /// remaining time of exactly 0.
    pub fn poll(&mut self, now_ms: u64) -> Option<TimerPoll> {
        if self.state != TimerState::Running {
            return None;
        }
        let remaining_ms = self.remaining_ms(now_ms);
        if remaining_ms == 0 {
            self.state = TimerState::Expired;
            return Some(TimerPoll {
                remaining_ms: 0,
                just_expired: true,
            });
        }
        Some(TimerPoll {
            remaining_ms,
            just_expired: false,
        })
    }

    pub fn poll_with(&mut self, clock: &impl Clock) -> Option<TimerPoll> {
        self.poll(clock.now_ms())
    }

    /// Stops the countdown. Idempotent: cancelling an expired or already
    /// cancelled timer is a no-op.
    pub fn cancel(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Cancelled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RoundTimer, TimerPoll};
    use foundation::time::ManualClock;

    #[test]
    fn clock_driven_start_and_poll() {
        let clock = ManualClock::new(1_000);
        let mut t = RoundTimer::start_with(&clock, 2_000);
        clock.advance(500);
        assert_eq!(t.poll_with(&clock).unwrap().remaining_ms, 1_500);
        clock.advance(1_500);
        assert!(t.poll_with(&clock).unwrap().just_expired);
    }

    #[test]
    fn remaining_counts_down_from_limit() {
        let t = RoundTimer::start(10_000, 30_000);
        assert_eq!(t.remaining_ms(10_000), 30_000);
        assert_eq!(t.remaining_ms(25_000), 15_000);
        assert_eq!(t.remaining_ms(40_000), 0);
    }

    #[test]
    fn remaining_is_never_negative() {
        let t = RoundTimer::start(0, 1_000);
        assert_eq!(t.remaining_ms(1_000_000), 0);
        // Clock running backwards reads as nothing elapsed.
        let t = RoundTimer::start(5_000, 1_000);
        assert_eq!(t.remaining_ms(4_000), 1_000);
    }

    #[test]
    fn expiry_fires_exactly_once_at_zero() {
        let mut t = RoundTimer::start(0, 1_000);
        assert_eq!(
            t.poll(400),
            Some(TimerPoll {
                remaining_ms: 600,
                just_expired: false
            })
        );
        assert_eq!(
            t.poll(1_500),
            Some(TimerPoll {
                remaining_ms: 0,
                just_expired: true
            })
        );
        assert_eq!(t.poll(2_000), None);
        assert!(!t.is_running());
    }

    #[test]
    fn expiry_exactly_at_deadline_reports_zero() {
        let mut t = RoundTimer::start(0, 1_000);
        let p = t.poll(1_000).unwrap();
        assert_eq!(p.remaining_ms, 0);
        assert!(p.just_expired);
    }

    #[test]
    fn cancel_suppresses_future_polls() {
        let mut t = RoundTimer::start(0, 1_000);
        t.cancel();
        assert_eq!(t.poll(500), None);
        assert_eq!(t.poll(5_000), None);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut t = RoundTimer::start(0, 1_000);
        t.cancel();
        t.cancel();
        assert!(!t.is_running());

        let mut t = RoundTimer::start(0, 1_000);
        assert!(t.poll(1_000).unwrap().just_expired);
        t.cancel();
        assert_eq!(t.poll(2_000), None);
    }

    #[test]
    fn missed_polls_do_not_drift() {
        // A single very late poll sees the same deadline as frequent polls.
        let mut a = RoundTimer::start(0, 1_000);
        let mut b = RoundTimer::start(0, 1_000);
        for now in (100..=900).step_by(100) {
            assert!(!a.poll(now).unwrap().just_expired);
        }
        assert!(a.poll(1_200).unwrap().just_expired);
        assert!(b.poll(1_200).unwrap().just_expired);
    }
}
