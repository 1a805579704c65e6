#![allow(dead_code)]
use std::sync::Arc;

use epp::{EventMajorSample, MeasurementMajorSample, Parameters, Pursuer, Sample, Status};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Lobes along the diagonal of the first two measurements, plus measurements of noise.
/// Returns the sample by measurement and which lobe each event came from.
pub fn two_lobes(events_per_lobe: usize, noise: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<bool>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let spread = Normal::new(0.0, 0.05).unwrap();
    let background = Normal::new(0.5, 0.1).unwrap();
    let mut columns = vec![Vec::new(); 2 + noise];
    let mut upper = Vec::new();
    for (center, is_upper) in [(0.3, false), (0.7, true)] {
        for _ in 0..events_per_lobe {
            columns[0].push(center + spread.sample(&mut rng));
            columns[1].push(center + spread.sample(&mut rng));
            for column in columns.iter_mut().skip(2) {
                column.push(background.sample(&mut rng));
            }
            upper.push(is_upper);
        }
    }
    (columns, upper)
}

/// A single round gaussian blob in every measurement.
pub fn unimodal(events: usize, measurements: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let blob = Normal::new(0.5, 0.1).unwrap();
    (0..measurements)
        .map(|_| (0..events).map(|_| blob.sample(&mut rng)).collect())
        .collect()
}

/// Four lobes at the corners of a square in the first two measurements, one of the lobes twice
/// as heavy, and a third measurement with two lobes of its own.
pub fn four_lobes(seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let spread = Normal::new(0.0, 0.04).unwrap();
    let mut columns = vec![Vec::new(); 3];
    for (cx, cy, events) in [(0.3, 0.3, 4000), (0.3, 0.7, 2000), (0.7, 0.3, 2000), (0.7, 0.7, 2000)] {
        for k in 0..events {
            columns[0].push(cx + spread.sample(&mut rng));
            columns[1].push(cy + spread.sample(&mut rng));
            let cz = if k % 2 == 0 { 0.25 } else { 0.75 };
            columns[2].push(cz + spread.sample(&mut rng));
        }
    }
    columns
}

fn transpose(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    (0..columns[0].len())
        .map(|event| columns.iter().map(|column| column[event]).collect())
        .collect()
}

pub fn test_two_lobes_split(threads: Option<usize>) {
    let (columns, upper) = two_lobes(5000, 1, 11);
    let sample = Arc::new(MeasurementMajorSample::new(&columns).unwrap());
    let included = sample.subset().iter().filter(|&&included| included).count();
    let pursuer = Pursuer::new(threads);
    let result = pursuer.pursue(Arc::clone(&sample), Parameters::default()).unwrap();

    assert!(result.success(), "{:?}", result.outcome());
    assert_eq!(result.qualified.len(), 2);
    assert_eq!(result.projections, 1);
    let winner = result.winner().unwrap();
    assert_eq!((winner.x, winner.y), (0, 1));
    assert_eq!(winner.in_events + winner.out_events, included);
    assert!(winner.balance_factor > 0.98, "{}", winner.balance_factor);
    assert!(winner.separatrix.len() > 2);

    // every event lands on the side of its own lobe
    let agree = (0..sample.events())
        .filter(|&event| sample.subset()[event])
        .filter(|&event| winner.in_set[event] == upper[event])
        .count();
    let agreement = agree.max(included - agree) as f64 / included as f64;
    assert!(agreement > 0.99, "{agreement}");
    for event in 0..sample.events() {
        assert!(!(winner.in_set[event] && winner.out_set[event]));
    }
}

pub fn test_unimodal_is_not_split(threads: Option<usize>) {
    let columns = unimodal(5000, 3, 12);
    let sample = Arc::new(MeasurementMajorSample::new(&columns).unwrap());
    let pursuer = Pursuer::new(threads);
    let result = pursuer.pursue(sample, Parameters::default()).unwrap();
    assert!(!result.success());
    assert!(result.winner().map_or(true, |winner| winner.separatrix.is_empty()));
}

pub fn test_qualify_only(threads: Option<usize>) {
    let (columns, _) = two_lobes(3000, 2, 13);
    let sample = Arc::new(MeasurementMajorSample::new(&columns).unwrap());
    let pursuer = Pursuer::new(threads);
    let parameters = Parameters::builder().qualify_only(true).build();
    let result = pursuer.pursue(sample, parameters).unwrap();
    let mut qualified = result.qualified.clone();
    qualified.sort_unstable();
    assert_eq!(qualified, vec![0, 1]);
    assert_eq!(result.projections, 0);
    assert_eq!(result.outcome(), Status::NoQualified);
}

pub fn test_censored_measurements_are_skipped(threads: Option<usize>) {
    let (columns, _) = two_lobes(3000, 0, 14);
    let sample = Arc::new(MeasurementMajorSample::new(&columns).unwrap());
    let pursuer = Pursuer::new(threads);
    let parameters = Parameters::builder().censor(vec![false, true]).build();
    let result = pursuer.pursue(sample, parameters).unwrap();
    assert_eq!(result.qualified, vec![0]);
    assert_eq!(result.projections, 0);
    assert!(!result.success());
}

pub fn test_screening_keeps_every_interesting_pair(threads: Option<usize>) {
    let columns = four_lobes(15);
    let sample = Arc::new(EventMajorSample::new(&transpose(&columns)).unwrap());
    let pursuer = Pursuer::new(threads);
    let parameters = Parameters::builder().kld_only(true).build();
    let result = pursuer.pursue(sample, parameters).unwrap();
    assert_eq!(result.projections, 3);
    assert!(!result.candidates.is_empty());
    for candidate in &result.candidates {
        assert_eq!(candidate.outcome, Status::Success);
        assert!(candidate.separatrix.is_empty());
        assert!(candidate.clusters >= 2);
    }
}

pub fn test_finalists_are_ranked(threads: Option<usize>) {
    let columns = four_lobes(16);
    let sample = Arc::new(MeasurementMajorSample::new(&columns).unwrap());
    let pursuer = Pursuer::new(threads);
    let parameters = Parameters::builder().finalists(3).suppress_in_out(true).build();
    let result = pursuer.pursue(sample, parameters).unwrap();
    assert_eq!(result.projections, 3);
    assert_eq!(result.candidates.len(), 3);
    for pair in result.candidates.windows(2) {
        assert!(pair[0].rank(&pair[1]).is_le());
    }
    let winner = result.winner().unwrap();
    assert!(result.success());
    assert!(winner.in_set.is_empty());
    assert_eq!(winner.in_events + winner.out_events, 10000);
}

/// Deterministic runs depend only on the sample, never on how work was spread over threads.
pub fn test_deterministic_matches_synchronous(threads: Option<usize>) {
    let columns = four_lobes(17);
    let sample = Arc::new(MeasurementMajorSample::new(&columns).unwrap());
    let parameters = Parameters::builder().finalists(3).deterministic(true).build();

    let here = Pursuer::new(Some(0)).pursue(Arc::clone(&sample), parameters.clone()).unwrap();
    let pursuer = Pursuer::new(threads);
    let there = pursuer.pursue(sample, parameters).unwrap();

    assert_eq!(here.candidates, there.candidates);
    let mut a = here.qualified.clone();
    let mut b = there.qualified.clone();
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b);
    assert_eq!(here.passes, there.passes);
}

pub fn test_shuffled_deterministic_matches_synchronous(threads: Option<usize>) {
    let columns = four_lobes(20);
    let sample = Arc::new(MeasurementMajorSample::new(&columns).unwrap());
    let parameters = Parameters::builder()
        .finalists(3)
        .deterministic(true)
        .shuffle(true)
        .build();

    let here = Pursuer::new(Some(0)).pursue(Arc::clone(&sample), parameters.clone()).unwrap();
    let pursuer = Pursuer::new(threads);
    let there = pursuer.pursue(Arc::clone(&sample), parameters.clone()).unwrap();
    assert_eq!(here.projections, 3);
    assert_eq!(here.candidates, there.candidates);
    assert_eq!(here.passes, there.passes);
    assert_eq!(here.graphs, there.graphs);

    // running again on the same threads gives the same answer
    let again = pursuer.pursue(sample, parameters).unwrap();
    assert_eq!(again.candidates, there.candidates);
}

pub fn test_pursuer_is_reusable(threads: Option<usize>) {
    let pursuer = Pursuer::new(threads);
    let (columns, _) = two_lobes(2000, 0, 18);
    let lobes = Arc::new(MeasurementMajorSample::new(&columns).unwrap());
    let blob = Arc::new(MeasurementMajorSample::new(&unimodal(2000, 2, 19)).unwrap());

    pursuer.start(Arc::clone(&lobes), Parameters::default()).unwrap();
    pursuer.wait();
    assert!(pursuer.finished());
    let first = pursuer.result();

    pursuer.start(blob, Parameters::default()).unwrap();
    let second = pursuer.result();
    assert!(first.success());
    assert!(!second.success());
    assert_eq!(second.projections, 0);

    let again = pursuer.pursue(lobes, Parameters::default()).unwrap();
    assert_eq!(again.winner().map(|w| (w.x, w.y)), first.winner().map(|w| (w.x, w.y)));
}
