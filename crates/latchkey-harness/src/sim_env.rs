//! Simulated environment with a manually advanced clock.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use latchkey_core::Environment;

/// Environment whose wall clock only moves when told to.
///
/// Clones share the same clock.
#[derive(Debug, Clone)]
pub struct SimEnv {
    now_secs: Arc<AtomicU64>,
}

impl SimEnv {
    /// Create an environment reading `start_secs`.
    pub fn new(start_secs: u64) -> Self {
        Self { now_secs: Arc::new(AtomicU64::new(start_secs)) }
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z
        Self::new(1_704_067_200)
    }
}

impl Environment for SimEnv {
    fn wall_clock_secs(&self) -> u64 {
        self.now_secs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_only_moves_on_advance() {
        let env = SimEnv::new(100);
        let other = env.clone();

        assert_eq!(env.wall_clock_secs(), 100);
        other.advance(5);
        assert_eq!(env.wall_clock_secs(), 105);
    }
}
