/// Largest number of samples the accumulator accepts, bounded by the extent
/// of the critical-value table.
pub const MAX_SAMPLES: usize = 30;

/// Two-sided 99.9% critical values of Student's t-distribution for
/// ν = 1..=30 degrees of freedom. `T_CRITICAL_999[v - 1]` is `t(0.999, v)`.
const T_CRITICAL_999: [f64; MAX_SAMPLES] = [
    636.6, 31.60, 12.92, 8.610, 6.869, 5.959, 5.408, 5.041, 4.781, 4.587, 4.437, 4.318, 4.221,
    4.140, 4.073, 4.015, 3.965, 3.922, 3.883, 3.850, 3.819, 3.792, 3.768, 3.745, 3.725, 3.707,
    3.690, 3.674, 3.659, 3.646,
];

/// A 99.9% confidence interval around a sample mean.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeanInterval {
    /// Lower bound of the interval.
    pub lower: f64,

    /// The sample mean.
    pub mean: f64,

    /// Upper bound of the interval.
    pub upper: f64,
}

/// Accumulates trial samples and produces a t-distribution confidence
/// interval around their mean.
///
/// Collects at most [`MAX_SAMPLES`] values. The interval uses the unbiased
/// sample variance (divide by n − 1), so at least two samples are required;
/// asking with fewer is a caller bug and asserts.
#[derive(Debug, Default)]
pub struct ConfidenceInterval {
    samples: Vec<f64>,
}

impl ConfidenceInterval {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: Vec::with_capacity(MAX_SAMPLES),
        }
    }

    /// Records one sample.
    ///
    /// # Panics
    ///
    /// Panics when more than [`MAX_SAMPLES`] samples are added; the
    /// critical-value table does not extend further.
    pub fn add(&mut self, sample: f64) {
        assert!(
            self.samples.len() < MAX_SAMPLES,
            "confidence interval accepts at most {MAX_SAMPLES} samples"
        );

        self.samples.push(sample);
    }

    /// How many samples have been recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The 99.9% confidence interval around the mean of the recorded
    /// samples.
    ///
    /// With n samples, the half-width is `t(0.999, n−1) · √(s² / n)` where
    /// `s²` is the unbiased sample variance.
    ///
    /// # Panics
    ///
    /// Panics with fewer than two samples - the variance is undefined and
    /// callers must not ask.
    #[must_use]
    pub fn interval(&self) -> MeanInterval {
        let n = self.samples.len();
        assert!(
            n >= 2,
            "confidence interval requires at least two samples, got {n}"
        );

        let count = n as f64;
        let mean = self.samples.iter().sum::<f64>() / count;
        let variance = self
            .samples
            .iter()
            .map(|sample| (sample - mean).powi(2))
            .sum::<f64>()
            / (count - 1.0);

        let margin = T_CRITICAL_999[n - 2] * (variance / count).sqrt();

        MeanInterval {
            lower: mean - margin,
            mean,
            upper: mean + margin,
        }
    }
}
