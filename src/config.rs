//! Tunable constants for the synchronizer.
//!
//! Shipped as a `serde`-backed struct rather than bare `const`s so a host
//! can override them from a TOML fragment at startup, the same way the
//! rest of this codebase's config surfaces work. The defaults below match
//! §6 and are safe for a cluster on a typical datacenter network.

use serde::{Deserialize, Serialize};

const NS_PER_MS: u64 = 1_000_000;

/// Tunables for [`crate::clock::Clock`].
///
/// All fields are milliseconds in their serialized form; [`Clock`] converts
/// to nanoseconds once at construction.
///
/// [`Clock`]: crate::clock::Clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Initial Marzullo slack applied per source before adaptive tightening.
    pub clock_offset_tolerance_max_ms: u64,

    /// Maximum age of a synchronized `current` epoch before it is discarded.
    pub clock_epoch_max_ms: u64,

    /// Minimum window observation time before a synchronize attempt.
    pub clock_synchronization_window_min_ms: u64,

    /// Maximum window age before it is discarded as stale.
    pub clock_synchronization_window_max_ms: u64,

    /// Expected host tick period. Informational: the synchronizer itself
    /// does not schedule ticks, the host does.
    pub tick_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            clock_offset_tolerance_max_ms: 500,
            clock_epoch_max_ms: 30_000,
            clock_synchronization_window_min_ms: 3_000,
            clock_synchronization_window_max_ms: 10_000,
            tick_ms: 100,
        }
    }
}

impl ClockConfig {
    /// Parses a `ClockConfig` from a TOML fragment, falling back to
    /// [`ClockConfig::default`] for any field left unspecified.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub(crate) const fn offset_tolerance_max_ns(&self) -> u64 {
        self.clock_offset_tolerance_max_ms * NS_PER_MS
    }

    pub(crate) const fn epoch_max_ns(&self) -> u64 {
        self.clock_epoch_max_ms * NS_PER_MS
    }

    pub(crate) const fn window_min_ns(&self) -> u64 {
        self.clock_synchronization_window_min_ms * NS_PER_MS
    }

    pub(crate) const fn window_max_ns(&self) -> u64 {
        self.clock_synchronization_window_max_ms * NS_PER_MS
    }
}
