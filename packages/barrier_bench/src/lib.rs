#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Micro-benchmark harness for the spin barriers in `spin_barriers`.
//!
//! The experiment this crate drives: for every participant count `n` in
//! 1..=8 and every workload bound `w` in a configured list, have `n` pinned
//! worker threads run 10 000 episodes of *random busy-work then barrier*,
//! time the whole run, repeat 30 times, and reduce the samples to a 99.9%
//! confidence interval. The output is a tab-separated table with one row per
//! participant count and one `lower mean upper` cell per workload.
//!
//! The pieces, in data-flow order:
//!
//! * [`PinningPlan`] binds each worker to the core its barrier node was laid
//!   out for.
//! * [`wipe_caches`] streams a large working set through the core before
//!   each trial so every trial starts cold.
//! * [`RandomWorkload`] draws reproducible busy-loop lengths from a
//!   Mersenne Twister; [`worker_seeds`] gives every slot the same seed in
//!   every trial.
//! * [`run_sweep`] orchestrates trials: fresh barrier, cache wipe, pinned
//!   workers, a release/acquire start gate, wall-clock timing into a
//!   [`ConfidenceInterval`].
//! * [`write_results`] renders the table.
//!
//! Everything here treats errors as fatal: this is a measurement tool, and
//! a trial that cannot run exactly as configured has no value half-run.

mod affinity;
mod cache;
mod driver;
mod error;
mod report;
mod stats;
mod workload;

pub use affinity::*;
pub use cache::*;
pub use driver::*;
pub use error::*;
pub use report::*;
pub use stats::*;
pub use workload::*;
