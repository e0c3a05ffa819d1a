//! Time sources for the synchronizer: real OS clocks and a deterministic
//! stand-in for tests and simulation.
//!
//! The synchronizer is generic over `TimeSource` rather than boxing a trait
//! object: the choice between system and deterministic time is made once at
//! construction and monomorphized away, so there is no dynamic dispatch on
//! the hot path (`learn`/`tick` are called at least once per logical tick).

use std::sync::atomic::{AtomicU64, Ordering};

/// Abstract monotonic + realtime clock.
///
/// `monotonic()` must never regress for a given instance: callers rely on
/// `elapsed = monotonic_now - epoch_start` never underflowing. `realtime()`
/// may jump arbitrarily (NTP step, manual adjustment) and is never used to
/// measure durations, only as an anchor captured once per epoch.
pub trait TimeSource {
    /// Monotonic time in nanoseconds, from an arbitrary but fixed origin.
    fn monotonic(&self) -> u64;

    /// Wall-clock time in nanoseconds since the Unix epoch.
    fn realtime(&self) -> i64;

    /// Advances the time source. A no-op for real OS time; for the
    /// deterministic variant this is what drives logical time forward.
    fn tick(&mut self);
}

/// Real OS clocks: a boot-inclusive monotonic clock (survives suspend) and
/// the wall clock.
///
/// A regressing monotonic clock would stall window progression forever
/// (every `elapsed()` computation would underflow or never advance), so
/// `monotonic()` aborts the process rather than returning a smaller value
/// than it has ever returned before. Restarting under a supervisor is
/// strictly safer than limping along on a clock that has been proven
/// untrustworthy.
#[derive(Debug, Default)]
pub struct SystemTimeSource {
    monotonic_guard: AtomicU64,
}

impl SystemTimeSource {
    /// Creates a new system time source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            monotonic_guard: AtomicU64::new(0),
        }
    }

    #[cfg(target_os = "linux")]
    #[allow(unsafe_code)]
    fn clock_gettime_ns(clock_id: libc::clockid_t) -> i64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, fully-initialized `timespec` and
        // `clock_gettime` only writes through the pointer we give it.
        let rc = unsafe { libc::clock_gettime(clock_id, &raw mut ts) };
        assert_eq!(rc, 0, "clock_gettime({clock_id}) failed");
        ts.tv_sec * 1_000_000_000 + i64::from(ts.tv_nsec)
    }

    #[cfg(target_os = "linux")]
    fn monotonic_nanos() -> u64 {
        // CLOCK_BOOTTIME includes suspend time, unlike CLOCK_MONOTONIC;
        // §4.1 requires elapsed time to include suspend so a window's
        // `window_max` timeout is not silently extended by sleep.
        Self::clock_gettime_ns(libc::CLOCK_BOOTTIME) as u64
    }

    #[cfg(not(target_os = "linux"))]
    fn monotonic_nanos() -> u64 {
        use std::time::Instant;
        static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        let start = START.get_or_init(Instant::now);
        start.elapsed().as_nanos() as u64
    }

    #[cfg(target_os = "linux")]
    fn realtime_nanos() -> i64 {
        Self::clock_gettime_ns(libc::CLOCK_REALTIME)
    }

    #[cfg(not(target_os = "linux"))]
    fn realtime_nanos() -> i64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_nanos() as i64
    }
}

impl TimeSource for SystemTimeSource {
    fn monotonic(&self) -> u64 {
        let now = Self::monotonic_nanos();
        let prev = self.monotonic_guard.fetch_max(now, Ordering::AcqRel);
        if now < prev {
            tracing::error!(
                observed_ns = now,
                previous_ns = prev,
                "monotonic clock regressed; aborting process"
            );
            std::process::abort();
        }
        now
    }

    fn realtime(&self) -> i64 {
        Self::realtime_nanos()
    }

    fn tick(&mut self) {
        // Real time advances on its own.
    }
}

/// Tick-driven deterministic time source for tests and simulation.
///
/// Logical time advances only when `tick()` is called, in fixed increments
/// of `resolution_ns`. This makes the synchronizer's window/epoch timing
/// reproducible without sleeping real wall-clock time in tests.
#[derive(Debug, Clone)]
pub struct DeterministicTimeSource {
    resolution_ns: u64,
    ticks: u64,
    realtime_epoch_ns: i64,
}

impl DeterministicTimeSource {
    /// Creates a deterministic time source starting at monotonic time zero
    /// and the given wall-clock epoch, advancing by `resolution_ns` per tick.
    #[must_use]
    pub fn new(resolution_ns: u64, realtime_epoch_ns: i64) -> Self {
        Self {
            resolution_ns,
            ticks: 0,
            realtime_epoch_ns,
        }
    }

    /// Returns the number of ticks elapsed so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances logical time by `n` ticks at once, without going through
    /// `tick()` one at a time. Useful for fast-forwarding past a window or
    /// epoch timeout in tests.
    pub fn advance(&mut self, n: u64) {
        self.ticks += n;
    }
}

impl TimeSource for DeterministicTimeSource {
    fn monotonic(&self) -> u64 {
        self.ticks * self.resolution_ns
    }

    fn realtime(&self) -> i64 {
        self.realtime_epoch_ns + self.monotonic() as i64
    }

    fn tick(&mut self) {
        self.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_advances_by_resolution() {
        let mut ts = DeterministicTimeSource::new(1_000_000_000, 0);
        assert_eq!(ts.monotonic(), 0);
        ts.tick();
        assert_eq!(ts.monotonic(), 1_000_000_000);
        ts.tick();
        assert_eq!(ts.monotonic(), 2_000_000_000);
    }

    #[test]
    fn deterministic_realtime_tracks_epoch_plus_monotonic() {
        let mut ts = DeterministicTimeSource::new(1_000_000_000, 500);
        assert_eq!(ts.realtime(), 500);
        ts.tick();
        assert_eq!(ts.realtime(), 1_000_000_500);
    }

    #[test]
    fn deterministic_bulk_advance() {
        let mut ts = DeterministicTimeSource::new(1_000_000_000, 0);
        ts.advance(20);
        assert_eq!(ts.ticks(), 20);
        assert_eq!(ts.monotonic(), 20_000_000_000);
    }

    #[test]
    fn system_time_source_monotonic_does_not_regress() {
        let ts = SystemTimeSource::new();
        let a = ts.monotonic();
        let b = ts.monotonic();
        assert!(b >= a);
    }
}
