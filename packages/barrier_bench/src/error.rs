use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running the benchmark harness.
///
/// None of these are recoverable: the harness is a measurement tool, and the
/// binary treats every error as fatal to the run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The platform would not enumerate its logical cores, so no pinning
    /// plan can be built.
    #[error("could not enumerate the logical cores of this system")]
    CoreEnumeration,

    /// A worker was assigned a logical slot with no corresponding core.
    #[error("no core available for logical slot {slot}: the system exposes {available} cores")]
    SlotOutOfRange {
        /// The slot that could not be mapped.
        slot: usize,

        /// How many cores the pinning plan covers.
        available: usize,
    },

    /// The platform rejected the affinity request for a worker thread.
    #[error("failed to pin the worker for logical slot {slot} to its core")]
    PinFailed {
        /// The slot whose worker could not be pinned.
        slot: usize,
    },

    /// The OS refused to create a worker thread.
    #[error("failed to spawn the worker for logical slot {slot}")]
    SpawnWorker {
        /// The slot whose worker could not be spawned.
        slot: usize,

        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A worker terminated before reporting that it was ready.
    #[error("a worker terminated before its trial started")]
    WorkerLost,

    /// A worker panicked while running its trial.
    #[error("a worker panicked while running its trial")]
    WorkerPanicked,

    /// The barrier topology could not be built for the requested
    /// configuration.
    #[error(transparent)]
    Topology(#[from] spin_barriers::Error),

    /// The results file could not be written.
    #[error("failed to write results to '{path}'")]
    WriteResults {
        /// The output path that failed.
        path: PathBuf,

        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// A specialized `Result` type for harness operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
