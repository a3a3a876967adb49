use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use itertools::Itertools;

use crate::error::Result;
use crate::{Error, SweepResults};

/// The workload ladder the results header names.
///
/// The header is fixed so that downstream tooling can rely on the column
/// labels; a sweep that measures only a prefix of the ladder (the default
/// measures the first three rungs) writes rows with fewer cells than the
/// header names.
pub const ADVERTISED_WORKLOADS: [usize; 7] = [1, 10, 100, 1_000, 10_000, 100_000, 1_000_000];

/// Writes the results table to a plain-text tab-separated file.
///
/// The first row is the literal `NumberOfThreads\Workload` followed by the
/// advertised workload ladder. Each following row starts with the
/// participant count and carries, per measured workload, one cell of three
/// space-separated doubles: `lower mean upper`, in nanoseconds.
///
/// # Errors
///
/// Returns [`Error::WriteResults`] when the file cannot be created or
/// written.
pub fn write_results(path: &Path, results: &SweepResults) -> Result<()> {
    let wrap_error = |source: io::Error| Error::WriteResults {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(wrap_error)?;
    let mut out = BufWriter::new(file);

    write_table(&mut out, results).map_err(wrap_error)?;

    out.flush().map_err(wrap_error)
}

fn write_table(out: &mut impl Write, results: &SweepResults) -> io::Result<()> {
    writeln!(
        out,
        "NumberOfThreads\\Workload {}",
        ADVERTISED_WORKLOADS.iter().join("\t\t")
    )?;

    for (index, row) in results.rows.iter().enumerate() {
        write!(out, "{}", index + 1)?;

        for cell in row {
            write!(out, "\t{} {} {}", cell.lower, cell.mean, cell.upper)?;
        }

        writeln!(out)?;
    }

    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::num::NonZero;

    use new_zealand::nz;

    use super::*;
    use crate::MeanInterval;

    fn sample_results() -> SweepResults {
        let cell = |base: f64| MeanInterval {
            lower: base - 1.0,
            mean: base,
            upper: base + 1.0,
        };

        SweepResults {
            workloads: vec![nz!(1), nz!(10)],
            rows: vec![vec![cell(10.0), cell(20.0)], vec![cell(30.0), cell(40.0)]],
        }
    }

    fn rendered(results: &SweepResults) -> String {
        let mut buffer = Vec::new();
        write_table(&mut buffer, results).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn header_advertises_the_full_ladder() {
        let output = rendered(&sample_results());

        assert_eq!(
            output.lines().next().unwrap(),
            "NumberOfThreads\\Workload 1\t\t10\t\t100\t\t1000\t\t10000\t\t100000\t\t1000000"
        );
    }

    #[test]
    fn rows_carry_one_cell_per_measured_workload() {
        let output = rendered(&sample_results());
        let rows: Vec<_> = output.lines().skip(1).collect();

        assert_eq!(rows, vec!["1\t9 10 11\t19 20 21", "2\t29 30 31\t39 40 41"]);
    }

    #[test]
    fn cells_parse_back_into_three_doubles() {
        let output = rendered(&sample_results());

        for row in output.lines().skip(1) {
            for cell in row.split('\t').skip(1) {
                let values: Vec<f64> = cell
                    .split(' ')
                    .map(|value| value.parse().unwrap())
                    .collect();

                assert_eq!(values.len(), 3);
                assert!(values[0] <= values[1] && values[1] <= values[2]);
            }
        }
    }

    #[test]
    fn write_results_creates_the_file() {
        let path = std::env::temp_dir().join(format!(
            "barrier_bench_report_test_{}.txt",
            std::process::id()
        ));

        write_results(&path, &sample_results()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("NumberOfThreads\\Workload"));
        assert_eq!(contents.lines().count(), 3);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unwritable_path_is_reported_with_the_path() {
        let path = Path::new("/nonexistent-directory/results.txt");

        let error = write_results(path, &sample_results()).unwrap_err();

        assert!(matches!(error, Error::WriteResults { .. }));
        assert!(error.to_string().contains("nonexistent-directory"));
    }

    #[test]
    fn workload_columns_are_preserved() {
        let results = sample_results();

        assert_eq!(
            results.workloads,
            vec![NonZero::new(1).unwrap(), NonZero::new(10).unwrap()]
        );
    }
}
