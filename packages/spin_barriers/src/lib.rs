#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Spin barrier algorithms for shared-memory multicore hardware.
//!
//! A barrier lets a fixed group of threads repeatedly rendezvous: no thread
//! leaves episode `E` before every thread has entered it. This crate provides
//! three spinning implementations whose correctness rests on explicit memory
//! orderings and whose performance rests on cache-conscious data placement:
//!
//! * [`CentralizedBarrier`] - a single shared counter plus a sense flag. The
//!   last arriver resets the counter and flips the sense; everyone else spins
//!   on the sense flag.
//! * [`TreeNode`] - a static combining tree. Arrivals propagate leaf-to-root
//!   through per-child arrival slots; departures propagate root-to-leaf
//!   through per-node departure-sense cells.
//! * [`GlobalTreeNode`] - the same arrival tree, but departure is a single
//!   broadcast store to one global sense flag that every non-root spins on.
//!
//! All three use *sense reversal*: instead of resetting flags between
//! episodes, each participant tracks a local sense bit and successive
//! episodes alternate the value that means "go". This removes a whole phase
//! of cleanup stores from the critical path.
//!
//! Tree shapes are produced by [`build_tree`] and [`build_global_tree`],
//! which embed the tree into a physical core mapping with either good or bad
//! locality (see [`Locality`]). Every shared cell lives on its own cache line, and every
//! node is a separate heap allocation so that a streaming hardware prefetcher
//! cannot drag a neighbour's cell into the wrong core.
//!
//! # Example
//!
//! ```
//! use std::thread;
//!
//! use new_zealand::nz;
//! use spin_barriers::CentralizedBarrier;
//!
//! let barrier = CentralizedBarrier::new(nz!(4));
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|_| {
//!         let mut participant = barrier.participant();
//!         thread::spawn(move || {
//!             for _ in 0..100 {
//!                 participant.wait();
//!             }
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! ```
//!
//! # What these barriers do not do
//!
//! They are not reusable across differing participant counts without being
//! rebuilt, they impose no ordering among arrivers, they do not support
//! dynamic join/leave, and they have no cancellation or timeout story. An
//! episode with fewer arrivers than participants spins forever.

mod backoff;
mod cache_line;
mod centralized;
mod error;
mod topology;
mod tree;
mod tree_global;

pub use backoff::*;
pub use cache_line::*;
pub use centralized::*;
pub use error::*;
pub use topology::*;
pub use tree::*;
pub use tree_global::*;
