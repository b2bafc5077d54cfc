//! Environment abstraction for deterministic testing.
//!
//! Decouples acceptance timestamps from the system clock so simulations can
//! run against a fixed or stepped clock.

use std::time::{SystemTime, UNIX_EPOCH};

/// Abstract environment providing wall clock time.
///
/// # Invariants
///
/// - `wall_clock_secs()` is seconds since the Unix epoch
/// - Implementations are infallible; a clock before the epoch reads as 0
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall clock time in seconds since the Unix epoch.
    fn wall_clock_secs(&self) -> u64;
}

/// Production environment backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn wall_clock_secs(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
    }
}
