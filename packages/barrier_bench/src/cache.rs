use std::cell::RefCell;
use std::hint::black_box;
use std::sync::LazyLock;

// The working set must comfortably exceed the last-level cache of the
// machines this harness runs on; generously sized server parts reach north
// of 100 MB of L3 per socket.
#[cfg(not(miri))]
const WIPE_LEN_BYTES: usize = 128 * 1024 * 1024;
#[cfg(miri)]
const WIPE_LEN_BYTES: usize = 1024;

const WIPE_LEN_WORDS: usize = WIPE_LEN_BYTES / size_of::<u64>();

// One shared immutable source for all wipes.
static WIPE_SOURCE: LazyLock<Vec<u64>> =
    LazyLock::new(|| vec![0x5AA5_5AA5_5AA5_5AA5; WIPE_LEN_WORDS]);

// Each wiping thread copies into its own destination so that concurrent
// wipes never write the same buffer. The previous contents are irrelevant.
thread_local! {
    static WIPE_DESTINATION: RefCell<Vec<u64>> =
        RefCell::new(vec![0; WIPE_LEN_WORDS]);
}

/// Evicts the last-level cache before a trial.
///
/// Barrier latency depends heavily on which coherence state the shared cells
/// start in. Streaming a working set much larger than the LLC through the
/// core leaves every trial with the same cold starting point, instead of the
/// first trial paying for the misses that later trials inherit warm.
///
/// The wipe is a plain large copy; the trailing [`black_box`] read keeps the
/// compiler from deleting it.
pub fn wipe_caches() {
    WIPE_DESTINATION.with_borrow_mut(|destination| {
        destination.copy_from_slice(&WIPE_SOURCE);

        let _ = black_box(destination[0]);
    });
}
