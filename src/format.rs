//! Signed-duration rendering for log fields.
//!
//! Clock diagnostics deal almost entirely in signed nanosecond deltas
//! (offsets, interval widths, how far the OS clock sat outside an agreed
//! interval). Printing those as raw nanoseconds makes log lines unreadable;
//! [`SignedDuration`] renders them at whatever unit keeps three significant
//! digits, e.g. `+512.000ms`, `-1.250s`, `+340ns`.

use std::fmt;

/// A signed nanosecond duration, formatted for human-readable logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignedDuration(pub i64);

impl SignedDuration {
    /// Wraps a signed nanosecond value.
    #[must_use]
    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }
}

impl fmt::Display for SignedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { '-' } else { '+' };
        let abs = self.0.unsigned_abs();
        if abs >= 1_000_000_000 {
            write!(f, "{sign}{:.3}s", abs as f64 / 1_000_000_000.0)
        } else if abs >= 1_000_000 {
            write!(f, "{sign}{:.3}ms", abs as f64 / 1_000_000.0)
        } else if abs >= 1_000 {
            write!(f, "{sign}{:.3}us", abs as f64 / 1_000.0)
        } else {
            write!(f, "{sign}{abs}ns")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_seconds() {
        assert_eq!(SignedDuration(1_500_000_000).to_string(), "+1.500s");
        assert_eq!(SignedDuration(-2_000_000_000).to_string(), "-2.000s");
    }

    #[test]
    fn formats_milliseconds() {
        assert_eq!(SignedDuration(512_000_000).to_string(), "+512.000ms");
        assert_eq!(SignedDuration(-3_250_000).to_string(), "-3.250ms");
    }

    #[test]
    fn formats_microseconds() {
        assert_eq!(SignedDuration(42_000).to_string(), "+42.000us");
    }

    #[test]
    fn formats_nanoseconds() {
        assert_eq!(SignedDuration(0).to_string(), "+0ns");
        assert_eq!(SignedDuration(-340).to_string(), "-340ns");
    }
}
