use std::fmt;
use std::num::NonZero;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use new_zealand::nz;
use spin_barriers::{
    CentralizedBarrier, CentralizedParticipant, GlobalTreeNode, Locality, TreeNode,
    build_global_tree, build_tree,
};
use tracing::debug;

use crate::error::Result;
use crate::{
    ConfidenceInterval, Error, MAX_SAMPLES, MeanInterval, PinningPlan, RandomWorkload,
    worker_seeds,
};

/// Which barrier algorithm a sweep exercises.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BarrierClass {
    /// Centralized sense-reversing barrier: one counter, one sense flag.
    Centralized,

    /// Static combining tree with tree-based departure.
    Tree,

    /// Static combining tree with a global departure flag.
    TreeGlobal,
}

impl BarrierClass {
    /// All selectable barrier classes.
    pub const ALL: [Self; 3] = [Self::Centralized, Self::Tree, Self::TreeGlobal];
}

impl FromStr for BarrierClass {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "centralized" => Ok(Self::Centralized),
            "tree" => Ok(Self::Tree),
            "tree-global" => Ok(Self::TreeGlobal),
            other => Err(format!(
                "unknown barrier class '{other}' (expected centralized, tree or tree-global)"
            )),
        }
    }
}

impl fmt::Display for BarrierClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Centralized => "centralized",
            Self::Tree => "tree",
            Self::TreeGlobal => "tree-global",
        })
    }
}

/// Parameters of a benchmark sweep.
///
/// The defaults reproduce the reference experiment: participant counts 1..=8,
/// workloads {1, 10, 100}, 30 trials of 10 000 episodes each, workers pinned
/// with good tree locality.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    /// Timed repetitions per configuration; at most
    /// [`MAX_SAMPLES`](crate::MAX_SAMPLES), at least two.
    pub trials: usize,

    /// Barrier episodes each worker runs per trial.
    pub episodes: usize,

    /// Workload upper bounds to sweep, one results column each.
    pub workloads: Vec<NonZero<usize>>,

    /// Largest participant count; rows run from one participant up to this.
    pub max_participants: NonZero<usize>,

    /// How the tree barriers are embedded into the core map. Ignored by the
    /// centralized barrier.
    pub locality: Locality,

    /// Whether workers bind themselves to their slot's core. Disable only
    /// on machines where pinning is unavailable; unpinned numbers measure
    /// the scheduler as much as the barrier.
    pub pin_workers: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            trials: 30,
            episodes: 10_000,
            workloads: vec![nz!(1), nz!(10), nz!(100)],
            max_participants: nz!(8),
            locality: Locality::Good,
            pin_workers: true,
        }
    }
}

/// Outcome of a sweep: one row per participant count, one cell per workload.
#[derive(Debug)]
pub struct SweepResults {
    /// The measured workload columns, in cell order.
    pub workloads: Vec<NonZero<usize>>,

    /// `rows[n - 1][w]` is the interval for `n` participants at workload
    /// `workloads[w]`, in nanoseconds per trial.
    pub rows: Vec<Vec<MeanInterval>>,
}

/// One worker's barrier endpoint, whichever algorithm is under test.
enum Participant {
    Centralized(CentralizedParticipant),
    Tree(TreeNode),
    TreeGlobal(GlobalTreeNode),
}

impl Participant {
    fn wait(&mut self) {
        match self {
            Self::Centralized(participant) => {
                participant.wait();
            }
            Self::Tree(node) => node.wait(),
            Self::TreeGlobal(node) => node.wait(),
        }
    }
}

/// Builds a fresh barrier of the requested class and hands out one endpoint
/// per participant, `endpoints[i]` for logical slot `i`.
fn build_participants(
    class: BarrierClass,
    count: NonZero<usize>,
    locality: Locality,
) -> Result<Vec<Participant>> {
    Ok(match class {
        BarrierClass::Centralized => {
            let barrier = CentralizedBarrier::new(count);
            (0..count.get())
                .map(|_| Participant::Centralized(barrier.participant()))
                .collect()
        }
        BarrierClass::Tree => build_tree(count, locality)?
            .into_iter()
            .map(Participant::Tree)
            .collect(),
        BarrierClass::TreeGlobal => build_global_tree(count, locality)?
            .into_iter()
            .map(Participant::TreeGlobal)
            .collect(),
    })
}

/// Runs the full sweep for one barrier class.
///
/// Iterates participant counts 1 up to the configured maximum and every
/// configured workload, measuring each combination over repeated trials and
/// reducing the samples to a confidence interval.
///
/// # Errors
///
/// Returns the first configuration or resource error encountered. No trial
/// is retried; a failed trial fails the sweep.
///
/// # Panics
///
/// Panics when the configuration itself is malformed: zero workloads, fewer
/// than two or more than [`MAX_SAMPLES`](crate::MAX_SAMPLES) trials.
pub fn run_sweep(class: BarrierClass, config: &SweepConfig) -> Result<SweepResults> {
    assert!(
        (2..=MAX_SAMPLES).contains(&config.trials),
        "trials must be in 2..={MAX_SAMPLES}"
    );
    assert!(!config.workloads.is_empty(), "no workloads configured");

    let plan = config
        .pin_workers
        .then(PinningPlan::detect)
        .transpose()?;

    let mut rows = Vec::with_capacity(config.max_participants.get());

    for count in 1..=config.max_participants.get() {
        let count = NonZero::new(count).expect("participant counts start at one");

        let mut row = Vec::with_capacity(config.workloads.len());

        for &workload in &config.workloads {
            eprintln!("{class}: {count} participant(s), workload {workload}");

            row.push(measure_configuration(
                class,
                count,
                workload,
                config,
                plan.as_ref(),
            )?);
        }

        rows.push(row);
    }

    Ok(SweepResults {
        workloads: config.workloads.clone(),
        rows,
    })
}

/// Runs the long-form profiling configuration: eight participants, workload
/// 100, ten million episodes, a single timed run with no repetition.
///
/// This exists for profiler sessions, where the sweep's short trials drown
/// the interesting signal in setup noise. Returns the elapsed nanoseconds.
///
/// # Errors
///
/// Returns any configuration or resource error from the single trial.
pub fn run_profile(class: BarrierClass, locality: Locality, pin_workers: bool) -> Result<f64> {
    const PROFILE_EPISODES: usize = 10_000_000;

    let count = nz!(8);
    let workload = nz!(100);
    let plan = pin_workers.then(PinningPlan::detect).transpose()?;
    let seeds = worker_seeds(count.get());

    eprintln!("{class}: profiling run, {count} participants, workload {workload}");

    let nanos = run_trial(
        class,
        count,
        workload,
        &seeds,
        PROFILE_EPISODES,
        locality,
        plan.as_ref(),
    )?;

    eprintln!("profiling run complete in {nanos} ns");

    Ok(nanos)
}

fn measure_configuration(
    class: BarrierClass,
    count: NonZero<usize>,
    workload: NonZero<usize>,
    config: &SweepConfig,
    plan: Option<&PinningPlan>,
) -> Result<MeanInterval> {
    // The same slot gets the same seed in every trial; reproducibility of
    // the per-worker workload sequence is part of the experiment contract.
    let seeds = worker_seeds(count.get());

    let mut samples = ConfidenceInterval::new();

    for trial in 0..config.trials {
        let nanos = run_trial(
            class,
            count,
            workload,
            &seeds,
            config.episodes,
            config.locality,
            plan,
        )?;

        debug!(%class, count = count.get(), trial, nanos, "trial complete");
        samples.add(nanos);
    }

    Ok(samples.interval())
}

/// Runs one timed trial and returns the elapsed wall-clock nanoseconds from
/// gate open to the last worker's exit.
fn run_trial(
    class: BarrierClass,
    count: NonZero<usize>,
    workload: NonZero<usize>,
    seeds: &[u32],
    episodes: usize,
    locality: Locality,
    plan: Option<&PinningPlan>,
) -> Result<f64> {
    let participants = build_participants(class, count, locality)?;

    // Start every trial from the same cold cache state. Skipped in
    // debug/test builds, where the wipe dwarfs the trials themselves and
    // the numbers are not meaningful anyway.
    #[cfg(all(not(test), not(debug_assertions)))]
    crate::wipe_caches();

    let start_gate = Arc::new(AtomicBool::new(false));
    let (ready_tx, ready_rx) = mpsc::channel();

    let mut workers = Vec::with_capacity(count.get());

    for (slot, mut participant) in participants.into_iter().enumerate() {
        let start_gate = Arc::clone(&start_gate);
        let ready_tx = ready_tx.clone();
        let plan = plan.cloned();
        let mut workload = RandomWorkload::new(workload, seeds[slot]);

        let handle = thread::Builder::new()
            .name(format!("barrier-worker-{slot}"))
            .spawn(move || {
                if let Some(plan) = &plan {
                    if let Err(error) = plan.pin_current_thread(slot) {
                        // Never enter the barrier: a worker that reports
                        // failure and then arrives anyway would let a broken
                        // trial run to completion.
                        let _ = ready_tx.send(Err(error));
                        return;
                    }
                }

                let _ = ready_tx.send(Ok(()));

                // Acquire pairs with the driver's release below; this is the
                // publication handshake for the barrier construction.
                while !start_gate.load(Ordering::Acquire) {}

                for _ in 0..episodes {
                    workload.run_once();
                    participant.wait();
                }
            })
            .map_err(|source| Error::SpawnWorker { slot, source })?;

        workers.push(handle);
    }

    drop(ready_tx);

    for _ in 0..count.get() {
        ready_rx.recv().map_err(|_| Error::WorkerLost)??;
    }

    // On the error paths above, workers already spinning at the gate are
    // abandoned; every caller treats these errors as process-fatal.

    let started = Instant::now();
    start_gate.store(true, Ordering::Release);

    for worker in workers {
        worker.join().map_err(|_| Error::WorkerPanicked)?;
    }

    Ok(started.elapsed().as_nanos() as f64)
}
