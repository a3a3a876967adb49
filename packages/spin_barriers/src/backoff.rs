use std::cell::Cell;
use std::hint;
use std::thread;

/// Occupies the CPU for `iterations` pause-hint cycles without touching
/// memory.
///
/// [`core::hint::spin_loop`] lowers to the architecture's pause/yield hint,
/// which backs the core off its speculation and frees pipeline resources for
/// the sibling hyperthread.
#[inline]
pub fn spin_delay(iterations: usize) {
    for _ in 0..iterations {
        hint::spin_loop();
    }
}

/// How long to delay after a given number of failed attempts.
///
/// Implementations receive the current attempt count and burn a
/// policy-specific number of pause cycles.
pub trait BackoffPolicy {
    /// Delays the calling thread; `tries` is the current attempt count.
    fn delay(&self, tries: usize);
}

/// Never delays. Spinning proceeds at full speed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBackoff;

impl BackoffPolicy for NoBackoff {
    fn delay(&self, _tries: usize) {}
}

/// Delays a fixed 16 pause cycles regardless of how many attempts failed.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantBackoff;

impl ConstantBackoff {
    const DELAY_ITERATIONS: usize = 16;
}

impl BackoffPolicy for ConstantBackoff {
    fn delay(&self, _tries: usize) {
        spin_delay(Self::DELAY_ITERATIONS);
    }
}

/// Delays as many pause cycles as attempts have failed.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExponentialBackoff;

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, tries: usize) {
        spin_delay(tries);
    }
}

/// Retry pacing for contended atomic operations.
///
/// Each call to [`wait`](Self::wait) delays according to the policy and
/// doubles the attempt counter; once the counter passes a threshold the
/// waiter is assumed to be oversubscribed and yields the OS thread instead.
///
/// The measured barrier variants do not use this: with exactly one
/// participant pinned per core, continuous spinning is the right call. The
/// type is part of the library for clients whose threads share cores.
#[derive(Debug)]
pub struct Backoff<P: BackoffPolicy = ExponentialBackoff> {
    policy: P,
    tries: Cell<usize>,
}

impl<P: BackoffPolicy> Backoff<P> {
    const MAX_TRIES: usize = 16;

    /// Creates a backoff controller around the given policy.
    #[must_use]
    pub fn with_policy(policy: P) -> Self {
        Self {
            policy,
            tries: Cell::new(1),
        }
    }

    /// Delays per policy, escalating to [`thread::yield_now`] once the
    /// attempt counter exceeds the spin threshold.
    pub fn wait(&self) {
        let tries = self.tries.get();

        if tries <= Self::MAX_TRIES {
            self.policy.delay(tries);
            self.tries.set(tries * 2);
        } else {
            thread::yield_now();
        }
    }

    /// Resets the attempt counter after a successful operation.
    pub fn reset(&self) {
        self.tries.set(1);
    }
}

impl Default for Backoff<ExponentialBackoff> {
    fn default() -> Self {
        Self::with_policy(ExponentialBackoff)
    }
}
