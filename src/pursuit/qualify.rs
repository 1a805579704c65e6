use std::f64::consts::SQRT_2;
use std::sync::Arc;

use log::debug;
use statrs::function::erf::erf;

use crate::pursuit::{with_scratch, PursueProjection};
use crate::scheduler::{Board, Job};
use crate::{Parameters, Sample};

/// Values closer than this fall in the same bin of the empirical distribution.
const BIN_WIDTH: f64 = 0.001;

/// Screens one measurement: it qualifies for pursuit when its empirical distribution is far
/// from both a normal and an exponential fit, truncated to the observed range.
pub(crate) struct QualifyMeasurement<S> {
    sample: Arc<S>,
    parameters: Arc<Parameters>,
    measurement: usize,
    kld_normal: f64,
    kld_exponential: f64,
}

/// Divergences of sorted `values` from a normal and an exponential with the same mean, each
/// truncated to the range of the values. `values` must be sorted and end with a sentinel of 1.
fn kld_1d(values: &[f64], mean: f64, sigma: f64) -> (f64, f64) {
    let n = values.len() - 1;
    let normal_cdf = |x: f64| erf((x - mean) / sigma / SQRT_2);
    let exponential_survival = |x: f64| (-x / mean).exp();
    let normal_total = 0.5 * (normal_cdf(values[n]) - normal_cdf(values[0]));
    let exponential_total = exponential_survival(values[0]) - exponential_survival(values[n]);

    let mut kld_normal = 0.0;
    let mut kld_exponential = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && values[j] - values[i] < BIN_WIDTH {
            j += 1;
        }
        let p = (j - i) as f64 / n as f64;
        let q_normal = 0.5 * (normal_cdf(values[j]) - normal_cdf(values[i])) / normal_total;
        let q_exponential =
            (exponential_survival(values[i]) - exponential_survival(values[j])) / exponential_total;
        kld_normal += p * (p / q_normal).ln();
        kld_exponential += p * (p / q_exponential).ln();
        i = j;
    }
    (kld_normal, kld_exponential)
}

impl<S: Sample> QualifyMeasurement<S> {
    pub(crate) fn new(sample: Arc<S>, parameters: Arc<Parameters>, measurement: usize) -> Self {
        QualifyMeasurement {
            sample,
            parameters,
            measurement,
            kld_normal: 0.0,
            kld_exponential: 0.0,
        }
    }

    pub(crate) fn parallel(&mut self) {
        with_scratch(|scratch| {
            let values = &mut scratch.values;
            values.clear();
            let sample = self.sample.as_ref();
            values.extend(
                sample
                    .subset()
                    .iter()
                    .enumerate()
                    .filter(|&(_, &included)| included)
                    .map(|(event, _)| sample.value(event, self.measurement)),
            );
            let n = values.len();
            if n < 2 {
                return;
            }
            let sum: f64 = values.iter().sum();
            let sum_squares: f64 = values.iter().map(|v| v * v).sum();
            let mean = sum / n as f64;
            let sigma = ((sum_squares - sum * mean) / (n - 1) as f64).sqrt();
            if !(sigma > 0.0) {
                return;
            }
            values.sort_unstable_by(f64::total_cmp);
            values.push(1.0);
            (self.kld_normal, self.kld_exponential) = kld_1d(values, mean, sigma);
        });
    }

    fn qualified(&self) -> bool {
        let thresholds = self.parameters.kld;
        self.kld_normal > thresholds.normal_1d && self.kld_exponential > thresholds.exponential_1d
    }

    /// Records a qualified measurement and queues its pairings with every measurement that
    /// qualified before it.
    pub(crate) fn serial(self, board: &mut Board<S>) {
        let x = self.measurement;
        if !self.qualified() {
            debug!(
                "measurement {x} not qualified, kld {:.4} normal {:.4} exponential",
                self.kld_normal, self.kld_exponential
            );
            return;
        }
        debug!(
            "measurement {x} qualified, kld {:.4} normal {:.4} exponential",
            self.kld_normal, self.kld_exponential
        );
        if !self.parameters.qualify_only {
            let earlier = board.result_mut().qualified.clone();
            for y in earlier {
                board.enqueue(Job::Pursue(PursueProjection::new(
                    Arc::clone(&self.sample),
                    Arc::clone(&self.parameters),
                    x,
                    y,
                )));
            }
        }
        board.result_mut().qualified.push(x);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    fn sorted_with_sentinel(mut values: Vec<f64>) -> (Vec<f64>, f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let sigma = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
        values.sort_unstable_by(f64::total_cmp);
        values.push(1.0);
        (values, mean, sigma)
    }

    fn normal_values(rng: &mut ChaCha8Rng, mean: f64, sd: f64, n: usize) -> Vec<f64> {
        let normal = Normal::new(mean, sd).unwrap();
        (0..n).map(|_| normal.sample(rng).clamp(0.0, 1.0)).collect()
    }

    #[test]
    fn bimodal_beats_normal() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (normal, mean, sigma) = sorted_with_sentinel(normal_values(&mut rng, 0.5, 0.1, 4000));
        let (unimodal, _) = kld_1d(&normal, mean, sigma);

        let mut values = normal_values(&mut rng, 0.25, 0.04, 2000);
        values.extend(normal_values(&mut rng, 0.75, 0.04, 2000));
        let (bimodal, mean, sigma) = sorted_with_sentinel(values);
        let (split, exponential) = kld_1d(&bimodal, mean, sigma);

        assert!(unimodal < 0.16, "{unimodal}");
        assert!(split > 0.16, "{split}");
        assert!(exponential > 0.16, "{exponential}");
        assert!(split > unimodal);
    }

    #[test]
    fn coincident_values_share_a_bin() {
        let (values, mean, sigma) = sorted_with_sentinel(vec![0.2, 0.2, 0.2, 0.8]);
        let (normal, exponential) = kld_1d(&values, mean, sigma);
        assert!(normal.is_finite());
        assert!(exponential.is_finite());
        assert!(normal > 0.0);
    }
}
