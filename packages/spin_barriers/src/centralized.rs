use std::fmt;
use std::num::NonZero;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::CACHE_LINE_SIZE;

/// Bytes between the arrival counter and the sense flag.
///
/// One cache line would be enough to rule out false sharing, but a streaming
/// hardware prefetcher that just serviced a miss on the counter line will
/// also pull the following lines. 64 lines of separation keeps the sense flag
/// out of any plausible prefetch window.
const PREFETCH_GUARD_BYTES: usize = 64 * CACHE_LINE_SIZE;

/// Shared state of the centralized barrier. Lives in one cache-line-aligned
/// heap allocation; the counter and the sense flag sit at opposite ends of
/// the prefetch guard.
#[repr(C, align(64))]
struct CentralizedState {
    /// How many participants have arrived in the current episode.
    count: AtomicUsize,

    _prefetch_guard: [u8; PREFETCH_GUARD_BYTES],

    /// The value that means "everyone has arrived, go". Written only by the
    /// releaser; alternates between episodes (sense reversal).
    sense: AtomicBool,
}

const _: () = assert!(
    std::mem::offset_of!(CentralizedState, sense) - std::mem::offset_of!(CentralizedState, count)
        >= 64 * CACHE_LINE_SIZE
);

/// A centralized sense-reversing spin barrier.
///
/// All participants arrive by incrementing one shared counter; the last
/// arriver (the *releaser*) resets the counter and flips the shared sense
/// flag, releasing everyone else from their spin.
///
/// The counter line is written by every arriver, so this barrier scales
/// linearly in coherence traffic with the participant count. For small
/// groups on one package it is hard to beat; for larger groups prefer the
/// combining-tree barriers built by [`build_tree`][crate::build_tree].
///
/// `CentralizedBarrier` itself is a factory: each thread takes a
/// [`CentralizedParticipant`] via [`participant()`](Self::participant) and
/// calls [`wait()`](CentralizedParticipant::wait) on it. The participant
/// handle carries that thread's local sense, so a single barrier instance
/// serves any number of concurrent groups of episodes without thread-local
/// statics.
///
/// # Example
///
/// ```
/// use std::thread;
///
/// use new_zealand::nz;
/// use spin_barriers::CentralizedBarrier;
///
/// let barrier = CentralizedBarrier::new(nz!(2));
///
/// let mut a = barrier.participant();
/// let mut b = barrier.participant();
///
/// let worker = thread::spawn(move || {
///     b.wait();
/// });
///
/// a.wait();
/// worker.join().unwrap();
/// ```
pub struct CentralizedBarrier {
    shared: Arc<CentralizedState>,
    participants: NonZero<usize>,
}

impl CentralizedBarrier {
    /// Creates a barrier for a group of `participants` threads.
    ///
    /// The count is fixed for the lifetime of the barrier; an episode
    /// completes only when exactly that many participants have called
    /// [`wait()`](CentralizedParticipant::wait).
    #[must_use]
    pub fn new(participants: NonZero<usize>) -> Self {
        Self {
            shared: Arc::new(CentralizedState {
                count: AtomicUsize::new(0),
                _prefetch_guard: [0; PREFETCH_GUARD_BYTES],
                sense: AtomicBool::new(true),
            }),
            participants,
        }
    }

    /// Hands out a participant handle with a fresh local sense.
    ///
    /// Create exactly one handle per participating thread. Handles must not
    /// be shared between threads mid-episode; each one tracks the episode
    /// parity of the thread that uses it.
    #[must_use]
    pub fn participant(&self) -> CentralizedParticipant {
        CentralizedParticipant {
            shared: Arc::clone(&self.shared),
            participants: self.participants.get(),
            local_sense: false,
        }
    }

    /// The fixed number of participants this barrier was built for.
    #[must_use]
    pub fn participants(&self) -> NonZero<usize> {
        self.participants
    }
}

impl fmt::Debug for CentralizedBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CentralizedBarrier")
            .field("participants", &self.participants)
            .finish_non_exhaustive()
    }
}

/// One thread's handle onto a [`CentralizedBarrier`].
///
/// Holds the thread's local sense, which must flip exactly once per episode;
/// the handle does that in [`wait()`](Self::wait).
pub struct CentralizedParticipant {
    shared: Arc<CentralizedState>,
    participants: usize,
    local_sense: bool,
}

impl CentralizedParticipant {
    /// Blocks (spinning) until every participant has arrived at the barrier.
    ///
    /// Returns `true` on exactly one handle per episode: the releaser, i.e.
    /// the last arriver. All memory effects performed by any participant
    /// before its `wait()` are visible to every participant after its
    /// `wait()` returns.
    pub fn wait(&mut self) -> bool {
        let shared = &*self.shared;

        // The release on the increment publishes this thread's work; the
        // releaser's acquire below synchronizes with all of them at once.
        let previous = shared.count.fetch_add(1, Ordering::Release);

        let is_releaser = previous + 1 == self.participants;
        if is_releaser {
            let _ = shared.count.load(Ordering::Acquire);
            shared.count.store(0, Ordering::Relaxed);
            shared.sense.store(self.local_sense, Ordering::Release);
        } else {
            while shared.sense.load(Ordering::Relaxed) != self.local_sense {}
            let _ = shared.sense.load(Ordering::Acquire);
        }

        self.local_sense = !self.local_sense;
        is_releaser
    }

    /// The episode parity of this handle: `false` before the first episode,
    /// alternating thereafter.
    #[must_use]
    pub fn local_sense(&self) -> bool {
        self.local_sense
    }
}

impl fmt::Debug for CentralizedParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CentralizedParticipant")
            .field("participants", &self.participants)
            .field("local_sense", &self.local_sense)
            .finish_non_exhaustive()
    }
}
