//! Exhaustive Projection Pursuit ("EPP") in Rust.
//!
//! EPP looks for the best way to split a high dimensional sample, such as flow or mass cytometry
//! events, in two. It screens every measurement for structure, then looks at the two
//! dimensional projection onto every pair of the measurements that passed. Each projection is
//! smoothed until it has only a few density modes, and the boundaries between the modes' basins
//! are cut along the valley of least density. The lowest scoring cut over all pairs wins.
//!
//! Running EPP recursively on each side of the winning split builds a hierarchy of populations,
//! which is left to the caller.
//!
//! The work is spread over a pool of threads: one work item per measurement to screen, and one
//! per pair of qualified measurements to pursue.
//!
//! # Examples
//! ```
//!use std::sync::Arc;
//!use epp::{MeasurementMajorSample, Parameters, Pursuer};
//!
//!// two tight groups, split along both measurements
//!let mut low = vec![0.3f32; 2000];
//!let mut high = vec![0.7f32; 2000];
//!for (k, (l, h)) in low.iter_mut().zip(high.iter_mut()).enumerate() {
//!    let jitter = ((k * 7919) % 101) as f32 / 2000.0;
//!    *l += jitter;
//!    *h -= jitter;
//!}
//!let mut x = low.clone();
//!x.extend(&high);
//!let mut y = low;
//!y.extend(&high);
//!
//!let sample = Arc::new(MeasurementMajorSample::new(&[x, y]).unwrap());
//!let pursuer = Pursuer::new(None);
//!let result = pursuer.pursue(sample, Parameters::default()).unwrap();
//!if let Some(winner) = result.winner() {
//!    println!("{} and {}: {}", winner.x, winner.y, winner.outcome);
//!}
//! ```

pub use crate::candidate::{Candidate, Point, PursuitResult, Status};
pub use crate::error::EppError;
pub use crate::parameters::{Goal, KldThresholds, Parameters, ParametersBuilder};
pub use crate::pursuer::Pursuer;
pub use crate::sample::{EventMajorSample, MeasurementMajorSample, Sample};

mod boundary;
mod candidate;
mod error;
mod modal;
mod parameters;
mod pursuer;
mod pursuit;
mod sample;
mod scheduler;
mod transform;
mod validation;

/// Resolution of the density grid. Projections are binned onto (N+1)x(N+1) points covering the
/// unit square.
pub const N: usize = 256;
