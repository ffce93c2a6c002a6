//! Random id allocation for counters and ticks
//!
//! Ids are drawn at random and retried on collision. This is collision
//! avoidance, not security: callers snapshot the existing ids and insert the
//! result before anyone else allocates from the same pool.

use std::collections::HashSet;

use rand::Rng;
use tally_config::AllocatorConfig;
use tally_shared::{TallyError, TallyResult, NOID};

/// Bounded-retry random id allocator
#[derive(Debug, Clone, Copy)]
pub struct IdentifierAllocator {
    max_attempts: u32,
}

impl Default for IdentifierAllocator {
    fn default() -> Self {
        Self::new(&AllocatorConfig::default())
    }
}

impl IdentifierAllocator {
    pub fn new(config: &AllocatorConfig) -> Self {
        Self::with_max_attempts(config.max_attempts)
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draw a random 64-bit id that is neither `NOID` nor in `existing`.
    pub fn allocate(&self, existing: &HashSet<i64>) -> TallyResult<i64> {
        let mut rng = rand::rng();
        self.allocate_with(existing, || rng.random::<i64>())
    }

    /// Same as [`Self::allocate`] with a caller-supplied source of
    /// candidates.
    pub fn allocate_with(
        &self,
        existing: &HashSet<i64>,
        draw: impl FnMut() -> i64,
    ) -> TallyResult<i64> {
        self.draw_until_free(draw, |id| existing.contains(&id))
    }

    /// Allocate against a pool the caller can only probe, such as the
    /// keys of a map held under a write lock.
    pub fn allocate_unused(&self, is_taken: impl Fn(i64) -> bool) -> TallyResult<i64> {
        let mut rng = rand::rng();
        self.draw_until_free(|| rng.random::<i64>(), is_taken)
    }

    fn draw_until_free(
        &self,
        mut draw: impl FnMut() -> i64,
        is_taken: impl Fn(i64) -> bool,
    ) -> TallyResult<i64> {
        for attempt in 1..=self.max_attempts {
            let candidate = draw();
            if candidate != NOID && !is_taken(candidate) {
                if attempt > 1 {
                    log::debug!("Allocated id after {} attempts", attempt);
                }
                return Ok(candidate);
            }
        }

        log::warn!("Id allocation gave up after {} attempts", self.max_attempts);
        Err(TallyError::AllocatorExhausted {
            attempts: self.max_attempts,
        })
    }
}
