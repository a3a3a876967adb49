use std::hint::black_box;
use std::num::NonZero;

use rand::{Rng, RngCore};
use rand_mt::Mt;

/// Seed of the master generator from which every worker's seed is derived.
pub const MASTER_SEED: u32 = 1337;

/// Derives one PRNG seed per worker slot from the master seed.
///
/// Slot `i` always receives the `i`-th draw of a freshly seeded master
/// generator, so the same slot sees the same workload sequence in every
/// trial of a sweep - results are reproducible across trials and across
/// runs.
#[must_use]
pub fn worker_seeds(count: usize) -> Vec<u32> {
    let mut master = Mt::new(MASTER_SEED);

    (0..count).map(|_| master.next_u32()).collect()
}

/// Reproducible busy-work between barrier episodes.
///
/// Each call to [`run_once`](Self::run_once) draws a uniform length
/// `r ∈ [1, upper]` from a Mersenne Twister and spins an empty loop for `r`
/// iterations. The loop counter is threaded through [`black_box`] so the
/// compiler cannot collapse the loop, no matter how hard it tries - the
/// entire point is to burn a predictable, reproducible amount of CPU.
#[derive(Debug)]
pub struct RandomWorkload {
    upper: NonZero<usize>,
    rng: Mt,
}

impl RandomWorkload {
    /// Creates a workload drawing lengths from `[1, upper]`, seeded for
    /// reproducibility.
    #[must_use]
    pub fn new(upper: NonZero<usize>, seed: u32) -> Self {
        Self {
            upper,
            rng: Mt::new(seed),
        }
    }

    /// Draws the next length and busy-loops for that many iterations.
    ///
    /// Returns the drawn length, which is useful for asserting
    /// reproducibility.
    pub fn run_once(&mut self) -> usize {
        let length = self.rng.random_range(1..=self.upper.get());

        let mut counter = 0_usize;
        while black_box(counter) < length {
            counter = black_box(counter + 1);
        }

        length
    }

    /// The inclusive upper bound of the drawn lengths.
    #[must_use]
    pub fn upper(&self) -> NonZero<usize> {
        self.upper
    }
}
