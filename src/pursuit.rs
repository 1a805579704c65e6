//! The two kinds of work a pursuit is made of: screening single measurements, and searching a
//! pair of qualified measurements for the best split.
//!
//! Each has a parallel stage, free to run on any thread, and a serial stage run under the
//! scheduler's lock that merges its outcome into the shared result.
use std::cell::RefCell;

use crate::boundary::{ColoredBoundary, ColoredPoint};
use crate::modal::ModalClustering;
use crate::transform::{Transform, GRID};

pub(crate) mod project;
pub(crate) mod qualify;

pub(crate) use project::PursueProjection;
pub(crate) use qualify::QualifyMeasurement;

/// Per thread working storage. The grids and transform plan are sized once and reused by every
/// work item the thread runs.
pub(crate) struct PursuitScratch {
    pub(crate) weights: Vec<f32>,
    pub(crate) cosine: Vec<f32>,
    pub(crate) filtered: Vec<f32>,
    pub(crate) density: Vec<f32>,
    pub(crate) transform: Transform,
    pub(crate) modal: ModalClustering,
    pub(crate) cluster_bounds: ColoredBoundary<i16>,
    pub(crate) subset_bounds: ColoredBoundary<bool>,
    pub(crate) values: Vec<f64>,
}

impl PursuitScratch {
    fn new() -> Self {
        PursuitScratch {
            weights: vec![0.0; GRID],
            cosine: vec![0.0; GRID],
            filtered: vec![0.0; GRID],
            density: vec![0.0; GRID],
            transform: Transform::new(),
            modal: ModalClustering::new(),
            cluster_bounds: ColoredBoundary::new(),
            subset_bounds: ColoredBoundary::new(),
            values: Vec::new(),
        }
    }
}

thread_local! {
    static SCRATCH: RefCell<PursuitScratch> = RefCell::new(PursuitScratch::new());
}

/// Runs `f` with this thread's scratch storage.
pub(crate) fn with_scratch<R>(f: impl FnOnce(&mut PursuitScratch) -> R) -> R {
    SCRATCH.with(|scratch| f(&mut scratch.borrow_mut()))
}

/// Starting phase of the diagonal rotation for a pair when `shuffle` is on.
pub(crate) fn shuffled_phase(x: usize, y: usize) -> u32 {
    (x.wrapping_mul(31).wrapping_add(y.wrapping_mul(17)) & 3) as u32
}

pub(crate) fn to_point(point: &ColoredPoint) -> crate::Point {
    crate::Point::new(point.i, point.j)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_is_reused_on_a_thread() {
        let first = with_scratch(|scratch| {
            scratch.values.push(1.0);
            scratch.values.as_ptr() as usize
        });
        let second = with_scratch(|scratch| {
            assert_eq!(scratch.values, vec![1.0]);
            scratch.values.clear();
            scratch.values.as_ptr() as usize
        });
        assert_eq!(first, second);
        assert_eq!(with_scratch(|scratch| scratch.density.len()), GRID);
    }

    #[test]
    fn shuffled_phase_is_two_bits() {
        for x in 0..8 {
            for y in 0..8 {
                assert!(shuffled_phase(x, y) < 4);
            }
        }
        assert_eq!(shuffled_phase(3, 5), shuffled_phase(3, 5));
    }
}
