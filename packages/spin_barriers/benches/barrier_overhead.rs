//! Per-episode latency of the spin barriers against `std::sync::Barrier`.
//!
//! Four threads run `iters` back-to-back episodes with no workload between
//! them; the reported time is the main thread's wall-clock for the whole
//! run, so one "iteration" is one full episode. Run on an otherwise idle
//! machine with at least four cores, or the spinning variants will measure
//! the scheduler instead of the barrier.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::num::NonZero;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use criterion::{Criterion, criterion_group, criterion_main};
use spin_barriers::{CentralizedBarrier, Locality, build_global_tree, build_tree};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const PARTICIPANTS: usize = 4;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("barrier_episode");

    group.bench_function("centralized", |b| {
        b.iter_custom(|iters| {
            let barrier = CentralizedBarrier::new(NonZero::new(PARTICIPANTS).unwrap());
            let states = (0..PARTICIPANTS).map(|_| barrier.participant()).collect();

            timed_episodes(states, iters, |participant| {
                participant.wait();
            })
        });
    });

    group.bench_function("tree_good_locality", |b| {
        b.iter_custom(|iters| {
            let nodes = build_tree(NonZero::new(PARTICIPANTS).unwrap(), Locality::Good)
                .expect("four participants are within the supported layouts");

            timed_episodes(nodes, iters, |node| node.wait())
        });
    });

    group.bench_function("global_tree_good_locality", |b| {
        b.iter_custom(|iters| {
            let nodes = build_global_tree(NonZero::new(PARTICIPANTS).unwrap(), Locality::Good)
                .expect("four participants are within the supported layouts");

            timed_episodes(nodes, iters, |node| node.wait())
        });
    });

    group.bench_function("std_sync_barrier", |b| {
        b.iter_custom(|iters| {
            let barrier = Arc::new(Barrier::new(PARTICIPANTS));
            let states = (0..PARTICIPANTS).map(|_| Arc::clone(&barrier)).collect();

            timed_episodes(states, iters, |barrier| {
                barrier.wait();
            })
        });
    });

    group.finish();
}

/// Runs `iters` episodes on one thread per state and returns the lead
/// thread's elapsed time for its whole episode loop.
fn timed_episodes<S, W>(states: Vec<S>, iters: u64, wait: W) -> Duration
where
    S: Send + 'static,
    W: Fn(&mut S) + Copy + Send + 'static,
{
    // All threads (including the timing thread) line up here so the clock
    // does not start until everyone is ready to spin.
    let start_gate = Arc::new(Barrier::new(states.len()));

    let mut states = states.into_iter();
    let mut lead_state = states.next().expect("at least one participant");

    let helpers: Vec<_> = states
        .map(|mut state| {
            let start_gate = Arc::clone(&start_gate);
            thread::spawn(move || {
                start_gate.wait();
                for _ in 0..iters {
                    wait(&mut state);
                }
            })
        })
        .collect();

    start_gate.wait();

    let started = Instant::now();
    for _ in 0..iters {
        wait(&mut lead_state);
    }
    let elapsed = started.elapsed();

    for helper in helpers {
        helper.join().expect("benchmark worker panicked");
    }

    elapsed
}
