use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use crate::N;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A point of the density grid. Coordinates run from 0 to N inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub i: i16,
    pub j: i16,
}

impl Point {
    pub fn new(i: i16, j: i16) -> Self {
        Point { i, j }
    }

    /// The point's position along the X measurement, in [0, 1].
    pub fn x(&self) -> f64 {
        self.i as f64 / N as f64
    }

    /// The point's position along the Y measurement, in [0, 1].
    pub fn y(&self) -> f64 {
        self.j as f64 / N as f64
    }
}

/// How a candidate split, or a whole pursuit, turned out. The order of the variants is the
/// tie-break order when ranking candidates of equal score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Status {
    Success,
    /// No measurement passed the one dimensional screen.
    NoQualified,
    /// The density never had two clusters, or no split of them was usable.
    NoCluster,
    /// The density is too close to a bivariate normal to be worth splitting.
    NotInteresting,
    /// Never finished. Seeing this in a result is a bug.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Status::Success => "success",
            Status::NoQualified => "no measurement qualified for pursuit",
            Status::NoCluster => "no cluster found",
            Status::NotInteresting => "not interesting, the density looks unimodal",
            Status::Error => "internal error, the pursuit did not complete",
        };
        f.write_str(message)
    }
}

/// The outcome of pursuing one pair of measurements.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Candidate {
    /// The lower numbered measurement, plotted along i.
    pub x: usize,
    /// The higher numbered measurement, plotted along j.
    pub y: usize,
    /// The dividing line, oriented so the in side is on its right (clockwise).
    pub separatrix: Vec<Point>,
    /// Membership of each event on the in side. Empty when in and out sets are suppressed.
    pub in_set: Vec<bool>,
    pub out_set: Vec<bool>,
    pub in_events: usize,
    pub out_events: usize,
    /// Lower is better.
    pub score: f64,
    pub edge_weight: f64,
    /// 4P(1-P) where P is the fraction of events on one side, 1 for an even split.
    pub balance_factor: f64,
    /// Smoothing passes needed.
    pub pass: usize,
    pub clusters: usize,
    /// Dual graphs examined.
    pub graphs: usize,
    pub outcome: Status,
}

impl Candidate {
    pub(crate) fn new(x: usize, y: usize) -> Self {
        Candidate {
            x: x.min(y),
            y: x.max(y),
            separatrix: Vec::new(),
            in_set: Vec::new(),
            out_set: Vec::new(),
            in_events: 0,
            out_events: 0,
            score: f64::INFINITY,
            edge_weight: 0.0,
            balance_factor: 0.0,
            pass: 0,
            clusters: 0,
            graphs: 0,
            outcome: Status::Error,
        }
    }

    /// Ranking order: score, then outcome, then the measurement pair so the order never depends
    /// on which pursuit finished first.
    pub fn rank(&self, other: &Candidate) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.outcome.cmp(&other.outcome))
            .then((self.x, self.y).cmp(&(other.x, other.y)))
    }

    /// The separatrix closed clockwise around the border of the unit square, enclosing the in
    /// events.
    pub fn in_polygon(&self) -> Vec<Point> {
        close_clockwise(self.separatrix.clone())
    }

    /// The reversed separatrix closed clockwise around the border, enclosing the out events.
    pub fn out_polygon(&self) -> Vec<Point> {
        close_clockwise(self.separatrix.iter().rev().copied().collect())
    }
}

/// Which side of the square a border point leaves by when walking clockwise: 0 bottom, 1 left,
/// 2 top, 3 right.
fn clockwise_side(point: &Point) -> Option<u8> {
    let n = N as i16;
    if point.i == 0 && point.j < n {
        Some(1)
    } else if point.j == n && point.i < n {
        Some(2)
    } else if point.i == n && point.j > 0 {
        Some(3)
    } else if point.j == 0 && point.i > 0 {
        Some(0)
    } else {
        None
    }
}

/// Follows the border clockwise from the last point back to the first, adding corners on the
/// way. Polylines that don't start and end on the border are returned unchanged.
fn close_clockwise(mut polygon: Vec<Point>) -> Vec<Point> {
    let (tail, mut head) = match (polygon.first(), polygon.last()) {
        (Some(&tail), Some(&head)) => (tail, head),
        _ => return polygon,
    };
    let (Some(mut side), Some(_)) = (clockwise_side(&head), clockwise_side(&tail)) else {
        return polygon;
    };
    let n = N as i16;
    while head != tail {
        head = match side & 3 {
            0 if tail.j == 0 && tail.i < head.i => tail,
            0 => Point::new(0, 0),
            1 if tail.i == 0 && tail.j > head.j => tail,
            1 => Point::new(0, n),
            2 if tail.j == n && tail.i > head.i => tail,
            2 => Point::new(n, n),
            3 if tail.i == n && tail.j < head.j => tail,
            _ => Point::new(n, 0),
        };
        side += 1;
        polygon.push(head);
    }
    polygon
}

/// The aggregate outcome of a pursuit over every qualified pair of measurements.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PursuitResult {
    /// The best candidates, best first. In screening mode every interesting pair, unranked.
    pub candidates: Vec<Candidate>,
    /// Measurements that passed the one dimensional screen, in the order they qualified.
    pub qualified: Vec<usize>,
    /// Time from start until the last work item finished.
    pub duration: Duration,
    pub projections: usize,
    pub passes: usize,
    pub clusters: usize,
    pub graphs: usize,
}

impl PursuitResult {
    pub fn winner(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn outcome(&self) -> Status {
        self.winner()
            .map(|candidate| candidate.outcome)
            .unwrap_or(Status::NoQualified)
    }

    pub fn success(&self) -> bool {
        self.outcome() == Status::Success
    }

    /// Inserts `candidate` into the ranked finalists, keeping at most `finalists` of them.
    pub(crate) fn insert_finalist(&mut self, candidate: Candidate, finalists: usize) {
        let at = self
            .candidates
            .partition_point(|existing| existing.rank(&candidate) != Ordering::Greater);
        if at < finalists {
            self.candidates.insert(at, candidate);
            self.candidates.truncate(finalists);
        }
    }

    /// Adds the work counters of a finished pursuit.
    pub(crate) fn tally(&mut self, candidate: &Candidate) {
        self.projections += 1;
        self.passes += candidate.pass;
        self.clusters += candidate.clusters;
        self.graphs += candidate.graphs;
    }
}
