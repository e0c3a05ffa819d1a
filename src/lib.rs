//! # cluster-clock: fault-tolerant cluster time synchronization
//!
//! A replica's own clock cannot be trusted on its own: NTP fails, VMs get
//! migrated, and individual clocks drift. This crate fuses round-trip
//! samples from every peer replica into a single bounded interval of
//! "cluster time" using Marzullo's intersection algorithm, and only
//! reports a timestamp once a majority of replicas agree on one.
//!
//! ## Architecture
//!
//! - [`types`]: replica identifiers and quorum arithmetic
//! - [`marzullo`]: the interval-intersection algorithm itself
//! - [`time_source`]: the monotonic/realtime clock abstraction ([`SystemTimeSource`]
//!   for production, [`DeterministicTimeSource`] for tests and simulation)
//! - [`config`]: tunable windows and tolerances
//! - [`clock`]: the [`Clock`] state machine tying the above together
//! - [`format`]: human-readable rendering of signed nanosecond durations for logs
//! - [`metrics`]: atomic counters for sample/synchronization outcomes
//!
//! ## Example
//!
//! ```ignore
//! use cluster_clock::{Clock, SystemTimeSource};
//!
//! let mut clock = Clock::new(3, 0, SystemTimeSource::new());
//!
//! // On every pong received from a peer:
//! clock.learn(peer_id, m0, t1, m2);
//!
//! // Driven by the host's event loop, once per tick period:
//! clock.tick();
//!
//! if let Some(timestamp) = clock.realtime_synchronized() {
//!     // Assign timestamp to an operation.
//! } else {
//!     // Not yet synchronized; withhold the operation.
//! }
//!
//! // Replying to a ping always owes some realtime value, synchronized or not:
//! let reply_t1 = clock.realtime();
//! ```

pub mod clock;
pub mod config;
pub mod format;
pub mod marzullo;
pub mod metrics;
pub mod time_source;
pub mod types;

// Kani verification harnesses live inline in `clock` and `marzullo`, gated
// on `#[cfg(kani)]`, rather than a separate top-level module: each proof is
// scoped to the module whose invariants it checks.

pub use clock::Clock;
pub use config::ClockConfig;
pub use format::SignedDuration;
pub use marzullo::{Bound, Interval, Tuple, smallest_interval};
pub use metrics::{METRICS, Metrics, MetricsSnapshot};
pub use time_source::{DeterministicTimeSource, SystemTimeSource, TimeSource};
pub use types::{ReplicaId, quorum_size};

#[cfg(feature = "prometheus-metrics")]
pub use metrics::PrometheusExporter;
