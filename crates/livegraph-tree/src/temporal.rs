//! The merge clock: wall-clock milliseconds, clamped to never run backward.

use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond timestamp source for change records.
///
/// Reads the system clock but never yields a value smaller than the last one
/// handed out, so `changed_at` timestamps are non-decreasing across
/// sequential merges in a single process even if the wall clock steps back.
///
/// A frozen clock (see [`MergeClock::fixed`]) yields an explicit value
/// instead of reading the system clock; tests use it for deterministic
/// change records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeClock {
    last_ms: u64,
    frozen: Option<u64>,
}

impl MergeClock {
    /// Create a clock backed by the system wall clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frozen clock that always reports `ms`.
    pub fn fixed(ms: u64) -> Self {
        Self {
            last_ms: 0,
            frozen: Some(ms),
        }
    }

    /// Move a frozen clock to a new instant. No-op effect on a wall clock
    /// beyond raising the monotonic floor.
    pub fn set_ms(&mut self, ms: u64) {
        if self.frozen.is_some() {
            self.frozen = Some(ms);
        }
        self.last_ms = self.last_ms.max(ms);
    }

    /// Current timestamp in milliseconds since the UNIX epoch, clamped to be
    /// non-decreasing.
    pub fn now_ms(&mut self) -> u64 {
        let raw = match self.frozen {
            Some(ms) => ms,
            None => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        };
        self.last_ms = self.last_ms.max(raw);
        self.last_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_clock_is_reasonable() {
        let mut clock = MergeClock::new();
        // After 2020-01-01 (1577836800000 ms).
        assert!(clock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn never_decreases() {
        let mut clock = MergeClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn fixed_clock_reports_exact_value() {
        let mut clock = MergeClock::fixed(1000);
        assert_eq!(clock.now_ms(), 1000);
        assert_eq!(clock.now_ms(), 1000);
    }

    #[test]
    fn fixed_clock_clamps_against_rewind() {
        let mut clock = MergeClock::fixed(1000);
        assert_eq!(clock.now_ms(), 1000);
        clock.set_ms(500);
        // The floor holds: an earlier instant never surfaces.
        assert_eq!(clock.now_ms(), 1000);
        clock.set_ms(2000);
        assert_eq!(clock.now_ms(), 2000);
    }
}
