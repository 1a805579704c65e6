use log::warn;

use crate::N;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Defaults for parameters
const W_DEFAULT: f64 = 1.0 / N as f64;
const SIGMA_DEFAULT: f64 = 5.0;
const GOAL_DEFAULT: Goal = Goal::BestBalance;
const FINALISTS_DEFAULT: usize = 1;
const KLD_THRESHOLD_DEFAULT: f64 = 0.16;
const MAX_CLUSTERS_DEFAULT: usize = 12;

// Valid bounds of parameters
const FINALISTS_MINIMUM: usize = 1;
const MAX_CLUSTERS_MINIMUM: usize = 2;
/// Clusters and boundary edges are encoded one per bit of a `u32` in the dual graph.
pub(crate) const MAX_BOOLEANS: usize = u32::BITS as usize;

/// The objective used to score a candidate split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Goal {
    /// Lowest edge weight along the separatrix.
    BestSeparation,
    /// Edge weight biased towards more even splits.
    BestBalance,
}

/// Kullback-Leibler divergence thresholds that decide what is informative.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KldThresholds {
    /// Is this pair of measurements worth splitting at all?
    pub normal_2d: f64,
    /// Is the measurement just normal?
    pub normal_1d: f64,
    /// Is the measurement an exponential tail (typical for CyTOF)?
    pub exponential_1d: f64,
}

impl Default for KldThresholds {
    fn default() -> Self {
        KldThresholds {
            normal_2d: KLD_THRESHOLD_DEFAULT,
            normal_1d: KLD_THRESHOLD_DEFAULT,
            exponential_1d: KLD_THRESHOLD_DEFAULT,
        }
    }
}

/// The immutable configuration of one pursuit run.
/// Use `Parameters::default()` unless you want to tune the run, in which case use
/// `Parameters::builder()`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameters {
    pub(crate) w: f64,
    pub(crate) sigma: f64,
    pub(crate) goal: Goal,
    pub(crate) finalists: usize,
    pub(crate) kld: KldThresholds,
    pub(crate) censor: Vec<bool>,
    pub(crate) max_clusters: usize,
    pub(crate) shuffle: bool,
    pub(crate) deterministic: bool,
    pub(crate) suppress_in_out: bool,
    pub(crate) kld_only: bool,
    pub(crate) qualify_only: bool,
}

/// Builder object to set custom parameters.
#[derive(Debug, Clone, Default)]
pub struct ParametersBuilder {
    w: Option<f64>,
    sigma: Option<f64>,
    goal: Option<Goal>,
    finalists: Option<usize>,
    kld: Option<KldThresholds>,
    censor: Option<Vec<bool>>,
    max_clusters: Option<usize>,
    shuffle: Option<bool>,
    deterministic: Option<bool>,
    suppress_in_out: Option<bool>,
    kld_only: Option<bool>,
    qualify_only: Option<bool>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Parameters {
    /// Enters the builder pattern, allowing custom parameters to be set using
    /// various setter methods.
    ///
    /// # Returns
    /// * the parameter builder
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    /// Standard deviation of the smoothing kernel, in units of the data range.
    pub fn w(&self) -> f64 {
        self.w
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn finalists(&self) -> usize {
        self.finalists
    }

    pub fn kld(&self) -> KldThresholds {
        self.kld
    }

    pub fn max_clusters(&self) -> usize {
        self.max_clusters
    }

    /// Whether the measurement should be left out of the pursuit.
    pub fn is_censored(&self, measurement: usize) -> bool {
        self.censor.get(measurement).copied().unwrap_or(false)
    }

    pub(crate) fn censor_len(&self) -> usize {
        self.censor.len()
    }
}

impl ParametersBuilder {
    /// Sets the kernel bandwidth W, the standard deviation of the smoothing kernel as a fraction
    /// of the data range. Each retry widens the kernel to `W * pass`. The finest useful value is
    /// one grid cell. Defaults to 1/N.
    ///
    /// # Parameters
    /// * w - the kernel bandwidth
    ///
    /// # Returns
    /// * the parameter builder
    pub fn w(mut self, w: f64) -> ParametersBuilder {
        self.w = Some(ParametersBuilder::validate_positive(w, W_DEFAULT, "W"));
        self
    }

    /// Sets sigma, the number of standard deviations a density peak must stand above zero
    /// before it is accepted as the seed of a cluster. Defaults to 5.
    ///
    /// # Parameters
    /// * sigma - the density threshold multiplier
    ///
    /// # Returns
    /// * the parameter builder
    pub fn sigma(mut self, sigma: f64) -> ParametersBuilder {
        self.sigma = Some(ParametersBuilder::validate_positive(sigma, SIGMA_DEFAULT, "sigma"));
        self
    }

    /// Sets the objective function. Defaults to `Goal::BestBalance`.
    pub fn goal(mut self, goal: Goal) -> ParametersBuilder {
        self.goal = Some(goal);
        self
    }

    /// Sets how many of the best candidates are remembered. Defaults to 1.
    ///
    /// # Parameters
    /// * finalists - length of the ranked candidate list
    ///
    /// # Returns
    /// * the parameter builder
    pub fn finalists(mut self, finalists: usize) -> ParametersBuilder {
        self.finalists = Some(ParametersBuilder::validate_input_left_bound(
            finalists,
            FINALISTS_MINIMUM,
            "finalists",
        ));
        self
    }

    /// Sets the Kullback-Leibler divergence thresholds. Defaults to .16 for every test.
    pub fn kld(mut self, kld: KldThresholds) -> ParametersBuilder {
        self.kld = Some(kld);
        self
    }

    /// Sets the censor mask. A `true` entry omits that measurement from consideration.
    /// Measurements past the end of the mask are not censored.
    pub fn censor(mut self, censor: Vec<bool>) -> ParametersBuilder {
        self.censor = Some(censor);
        self
    }

    /// Sets the most clusters the dual graph search should handle. When the density has
    /// more modes than this it is smoothed further. Must lie between 2 and 32 since each
    /// cluster takes one bit of the graph encoding. Defaults to 12.
    ///
    /// # Parameters
    /// * max_clusters - the largest tractable cluster count
    ///
    /// # Returns
    /// * the parameter builder
    pub fn max_clusters(mut self, max_clusters: usize) -> ParametersBuilder {
        let valid = ParametersBuilder::validate_input_left_bound(
            max_clusters,
            MAX_CLUSTERS_MINIMUM,
            "max_clusters",
        );
        let valid = if valid > MAX_BOOLEANS {
            warn!(
                "EPP_WARNING: max_clusters ({valid}) cannot be higher than \
                {MAX_BOOLEANS}. Set to {MAX_BOOLEANS}."
            );
            MAX_BOOLEANS
        } else {
            valid
        };
        self.max_clusters = Some(valid);
        self
    }

    /// Sets whether the diagonal rotation phase is derived from the measurement pair when it
    /// is reset. Only meaningful together with `deterministic`. Defaults to false.
    pub fn shuffle(mut self, shuffle: bool) -> ParametersBuilder {
        self.shuffle = Some(shuffle);
        self
    }

    /// Sets whether every pursuit restarts the diagonal rotation, making each pair's result
    /// independent of thread scheduling. Defaults to false.
    pub fn deterministic(mut self, deterministic: bool) -> ParametersBuilder {
        self.deterministic = Some(deterministic);
        self
    }

    /// Sets whether to skip building the in and out membership vectors. Defaults to false.
    pub fn suppress_in_out(mut self, suppress_in_out: bool) -> ParametersBuilder {
        self.suppress_in_out = Some(suppress_in_out);
        self
    }

    /// Sets screening mode: each pair stops after the 2-D KLD test and every interesting pair
    /// is reported unranked. Defaults to false.
    pub fn kld_only(mut self, kld_only: bool) -> ParametersBuilder {
        self.kld_only = Some(kld_only);
        self
    }

    /// Sets whether to stop after the 1-D qualification of each measurement. Defaults to false.
    pub fn qualify_only(mut self, qualify_only: bool) -> ParametersBuilder {
        self.qualify_only = Some(qualify_only);
        self
    }

    /// Finishes the building of the parameters. A call to this method is required to exit the
    /// builder pattern.
    ///
    /// # Returns
    /// * The completed parameters.
    pub fn build(self) -> Parameters {
        Parameters {
            w: self.w.unwrap_or(W_DEFAULT),
            sigma: self.sigma.unwrap_or(SIGMA_DEFAULT),
            goal: self.goal.unwrap_or(GOAL_DEFAULT),
            finalists: self.finalists.unwrap_or(FINALISTS_DEFAULT),
            kld: self.kld.unwrap_or_default(),
            censor: self.censor.unwrap_or_default(),
            max_clusters: self.max_clusters.unwrap_or(MAX_CLUSTERS_DEFAULT),
            shuffle: self.shuffle.unwrap_or(false),
            deterministic: self.deterministic.unwrap_or(false),
            suppress_in_out: self.suppress_in_out.unwrap_or(false),
            kld_only: self.kld_only.unwrap_or(false),
            qualify_only: self.qualify_only.unwrap_or(false),
        }
    }

    fn validate_input_left_bound(input_param: usize, left_bound: usize, param: &str) -> usize {
        if input_param < left_bound {
            warn!(
                "EPP_WARNING: {param} ({input_param}) cannot be lower \
                than {left_bound}. Set to {left_bound}."
            );
            left_bound
        } else {
            input_param
        }
    }

    fn validate_positive(input_param: f64, default: f64, param: &str) -> f64 {
        if input_param > 0.0 && input_param.is_finite() {
            input_param
        } else {
            warn!("EPP_WARNING: {param} ({input_param}) must be positive. Set to {default}.");
            default
        }
    }
}
