//! Injectable tie-break noise for move ordering.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait TieBreakJitter: Send {
    /// A value in `0..=max`.
    fn jitter(&mut self, max: i32) -> i32;
}

/// Always zero; makes ordering (and therefore search) fully deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl TieBreakJitter for NoJitter {
    #[inline]
    fn jitter(&mut self, _max: i32) -> i32 {
        0
    }
}

#[derive(Debug, Clone)]
pub struct RandomJitter {
    rng: StdRng,
}

impl RandomJitter {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl TieBreakJitter for RandomJitter {
    fn jitter(&mut self, max: i32) -> i32 {
        if max <= 0 {
            return 0;
        }
        self.rng.random_range(0..=max)
    }
}
