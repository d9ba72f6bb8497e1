//! Running statistics for a sampling session
//!
//! - `SampleSet`: observations of one signal in run order, never deduplicated
//! - `ConfidenceState`: mean, stdev, standard error and margin of error,
//!   recomputed from a `SampleSet` on demand
//! - `normal_quantile`: inverse standard normal CDF for the z-score

use serde::{Deserialize, Serialize};

/// Observations a signal needs before its confidence interval is evaluated
pub const MIN_SAMPLES_FOR_CONFIDENCE: usize = 30;

/// Ordered observations of one signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    values: Vec<f64>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation (run order is preserved)
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Sample standard deviation (n - 1 denominator); needs two observations
    pub fn std_dev(&self) -> Option<f64> {
        let n = self.values.len();
        if n < 2 {
            return None;
        }
        let mean = self.mean()?;
        let variance = self
            .values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        Some(variance.sqrt())
    }

    pub fn summary(&self) -> SampleSummary {
        self.summary_at(None)
    }

    /// Summary including the margin of error at z-score `z`
    pub fn summary_at(&self, z: Option<f64>) -> SampleSummary {
        let std_dev = self.std_dev();
        let standard_error = std_dev.map(|sd| sd / (self.len() as f64).sqrt());
        SampleSummary {
            count: self.len(),
            mean: self.mean(),
            std_dev,
            standard_error,
            margin: z.zip(standard_error).map(|(z, se)| z * se),
        }
    }
}

impl FromIterator<f64> for SampleSet {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// What survives a session once its samples are discarded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub standard_error: Option<f64>,
    /// Only set when a confidence level was in effect
    pub margin: Option<f64>,
}

/// Confidence interval around the mean of a sample set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceState {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    /// stdev / sqrt(n)
    pub standard_error: f64,
    /// z * standard error
    pub margin: f64,
}

impl ConfidenceState {
    /// Compute the interval for `samples` at z-score `z`; needs two observations
    pub fn compute(samples: &SampleSet, z: f64) -> Option<Self> {
        let mean = samples.mean()?;
        let std_dev = samples.std_dev()?;
        let count = samples.len();
        let standard_error = std_dev / (count as f64).sqrt();
        Some(Self {
            count,
            mean,
            std_dev,
            standard_error,
            margin: z * standard_error,
        })
    }
}

/// Two-sided z-score for a confidence level, `Φ⁻¹((1 + confidence) / 2)`
pub fn z_score(confidence: f64) -> f64 {
    normal_quantile((1.0 + confidence) / 2.0)
}

/// Standard normal quantile (inverse CDF).
///
/// Acklam's rational approximation, relative error below 1.2e-9 over (0, 1).
pub fn normal_quantile(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239e0,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838e0,
        -2.549_732_539_343_734e0,
        4.374_664_141_464_968e0,
        2.938_163_982_698_783e0,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996e0,
        3.754_408_661_907_416e0,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}
