#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the barrier benchmark harness.

use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use barrier_bench::{BarrierClass, SweepConfig, run_profile, run_sweep, write_results};
use spin_barriers::Locality;

/// Measure per-episode latency of spin barrier algorithms across participant
/// counts and workloads, writing a tab-separated results table.
#[derive(FromArgs)]
struct Args {
    /// barrier algorithm to measure (centralized, tree, tree-global)
    #[argh(positional)]
    barrier: BarrierClass,

    /// path of the results file to write
    #[argh(positional)]
    out_file: PathBuf,

    /// embed the tree barriers with deliberately bad core locality
    #[argh(switch)]
    bad_locality: bool,

    /// skip the sweep and run one long profiler-friendly configuration
    #[argh(switch)]
    profile: bool,

    /// do not pin workers to cores (unpinned numbers measure the scheduler
    /// as much as the barrier)
    #[argh(switch)]
    no_pin: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Args = argh::from_env();

    let locality = if args.bad_locality {
        Locality::Bad
    } else {
        Locality::Good
    };

    let outcome = if args.profile {
        run_profile(args.barrier, locality, !args.no_pin).map(|_elapsed| ())
    } else {
        let config = SweepConfig {
            locality,
            pin_workers: !args.no_pin,
            ..SweepConfig::default()
        };

        run_sweep(args.barrier, &config)
            .and_then(|results| write_results(&args.out_file, &results))
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
