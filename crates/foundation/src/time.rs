/// Time primitives.
///
/// Session and timer state machines take `now_ms` arguments explicitly so
/// they stay pure and replayable; `Clock` exists for hosts that need to
/// produce those values.
pub trait Clock {
    /// Current wall-clock time in epoch milliseconds. Must be monotonic
    /// within one host process.
    fn now_ms(&self) -> u64;
}

/// Wall-clock backed by the OS. Not available on wasm, where the host
/// passes `Date.now()` across the boundary instead.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default)]
pub struct SystemClock;

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests and deterministic simulation.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: std::cell::Cell<u64>,
}

impl ManualClock {
    pub fn new(now_ms: u64) -> Self {
        Self {
            now_ms: std::cell::Cell::new(now_ms),
        }
    }

    pub fn advance(&self, by_ms: u64) {
        self.now_ms.set(self.now_ms.get() + by_ms);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}
