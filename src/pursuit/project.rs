use std::f64::consts::PI;
use std::sync::Arc;

use log::{debug, trace};

use crate::boundary::{ColoredEdge, DualGraph};
use crate::parameters::MAX_BOOLEANS;
use crate::pursuit::{shuffled_phase, to_point, with_scratch, PursuitScratch};
use crate::scheduler::Board;
use crate::{Candidate, Goal, Parameters, Sample, Status, N};

/// Searches the projection of the sample onto one pair of measurements for the cheapest way to
/// split its clusters in two.
pub(crate) struct PursueProjection<S> {
    sample: Arc<S>,
    parameters: Arc<Parameters>,
    candidate: Candidate,
}

/// Running sums for the mean and covariance of the binned events.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Moments {
    n: usize,
    x: f64,
    y: f64,
    xx: f64,
    xy: f64,
    yy: f64,
}

impl Moments {
    fn add(&mut self, x: f64, y: f64) {
        self.n += 1;
        self.x += x;
        self.y += y;
        self.xx += x * x;
        self.xy += x * y;
        self.yy += y * y;
    }

    fn mean(&self) -> (f64, f64) {
        let n = self.n as f64;
        (self.x / n, self.y / n)
    }

    /// Sample covariance as (xx, xy, yy).
    fn covariance(&self) -> (f64, f64, f64) {
        let (mx, my) = self.mean();
        let df = (self.n - 1) as f64;
        (
            (self.xx - self.x * mx) / df,
            (self.xy - self.x * my) / df,
            (self.yy - self.y * my) / df,
        )
    }
}

/// Damps the cosine coefficients by a gaussian kernel of the given width, as a fraction of the
/// data range. Filtering in the cosine domain is a convolution with reflecting edges.
pub(crate) fn apply_kernel(cosine: &[f32], filtered: &mut [f32], width: f64) {
    let kernel: Vec<f64> = (0..=N)
        .map(|i| {
            let i = i as f64;
            (-i * i * width * width * PI * PI * 2.0).exp()
        })
        .collect();
    for j in 0..=N {
        for i in 0..=N {
            let k = i + (N + 1) * j;
            filtered[k] = (cosine[k] as f64 * kernel[i] * kernel[j]) as f32;
        }
    }
}

/// Kullback-Leibler divergence of the density from the bivariate normal with the sample's mean
/// and covariance, both restricted to where the density is positive.
fn kld_normal_2d(density: &[f32], moments: &Moments) -> f64 {
    let (mx, my) = moments.mean();
    let (cxx, cxy, cyy) = moments.covariance();
    let rho2 = cxy * cxy / cxx / cyy;
    let mut np = 0.0;
    let mut nq = 0.0;
    let mut kld = 0.0;
    for j in 0..=N {
        for i in 0..=N {
            let p = density[i + (N + 1) * j] as f64;
            np += p;
            if p <= 0.0 {
                continue;
            }
            let x = i as f64 / N as f64 - mx;
            let y = j as f64 / N as f64 - my;
            let md2 = (x * x / cxx - 2.0 * x * y * cxy / cxx / cyy + y * y / cyy) / (1.0 - rho2) / 2.0;
            nq += (-md2).exp();
            kld += p * (p.ln() + md2);
        }
    }
    kld / np - (np / nq).ln()
}

/// The cheapest simple cut found by walking the dual graphs.
struct Split {
    left: u32,
    left_events: usize,
    edge_weight: f64,
    balance_factor: f64,
    score: f64,
}

impl<S: Sample> PursueProjection<S> {
    pub(crate) fn new(sample: Arc<S>, parameters: Arc<Parameters>, x: usize, y: usize) -> Self {
        PursueProjection { sample, parameters, candidate: Candidate::new(x, y) }
    }

    pub(crate) fn parallel(&mut self) {
        with_scratch(|scratch| self.pursue(scratch));
    }

    pub(crate) fn serial(self, board: &mut Board<S>) {
        let candidate = self.candidate;
        debug!(
            "pursued {} and {}: {} after {} passes, score {}",
            candidate.x, candidate.y, candidate.outcome, candidate.pass, candidate.score
        );
        let result = board.result_mut();
        result.tally(&candidate);
        if self.parameters.kld_only {
            if candidate.outcome == Status::Success {
                result.candidates.push(candidate);
            }
        } else {
            result.insert_finalist(candidate, self.parameters.finalists);
        }
    }

    /// Bins the events of the subset onto the grid, spreading each over its four nearest grid
    /// points.
    fn bin(&self, weights: &mut [f32]) -> Moments {
        let sample = self.sample.as_ref();
        let (mx, my) = (self.candidate.x, self.candidate.y);
        let mut moments = Moments::default();
        weights.fill(0.0);
        for (event, _) in sample.subset().iter().enumerate().filter(|&(_, &included)| included) {
            let x = sample.value(event, mx);
            let y = sample.value(event, my);
            moments.add(x, y);
            let (fx, fy) = (x * N as f64, y * N as f64);
            // the upper edge belongs to the last cell
            let i = (fx as usize).min(N - 1);
            let j = (fy as usize).min(N - 1);
            let dx = fx - i as f64;
            let dy = fy - j as f64;
            let k = i + (N + 1) * j;
            weights[k] += ((1.0 - dx) * (1.0 - dy)) as f32;
            weights[k + 1] += (dx * (1.0 - dy)) as f32;
            weights[k + N + 1] += ((1.0 - dx) * dy) as f32;
            weights[k + N + 2] += (dx * dy) as f32;
        }
        moments
    }

    fn pursue(&mut self, scratch: &mut PursuitScratch) {
        let PursuitScratch {
            weights,
            cosine,
            filtered,
            density,
            transform,
            modal,
            cluster_bounds,
            subset_bounds,
            ..
        } = scratch;
        let parameters = Arc::clone(&self.parameters);
        let sample = Arc::clone(&self.sample);
        let (x, y) = (self.candidate.x, self.candidate.y);

        if parameters.deterministic {
            let phase = if parameters.shuffle { shuffled_phase(x, y) } else { 0 };
            modal.rotation_mut().reset(phase);
        }

        let moments = self.bin(weights);
        if moments.n < 2 {
            self.candidate.outcome = Status::NoCluster;
            return;
        }
        transform.forward(weights, cosine);

        let mut kld_checked = false;
        let edges: Vec<ColoredEdge<i16>> = loop {
            // smooth more and more until there are few enough clusters
            let clusters = loop {
                self.candidate.pass += 1;
                let pass = self.candidate.pass;
                apply_kernel(cosine, filtered, parameters.w * pass as f64);
                transform.reverse(filtered, density);
                let clusters = modal.find_clusters(density, pass, &parameters);
                trace!("{x}, {y} pass {pass}: {clusters} clusters");
                if parameters.kld_only || clusters <= parameters.max_clusters {
                    break clusters;
                }
            };
            self.candidate.clusters = clusters;
            if clusters < 2 {
                self.candidate.outcome = Status::NoCluster;
                return;
            }

            if !kld_checked {
                kld_checked = true;
                let kld = kld_normal_2d(density, &moments);
                trace!("{x}, {y} kld {kld}");
                if !(kld >= parameters.kld.normal_2d) {
                    self.candidate.outcome = Status::NotInteresting;
                    return;
                }
                if parameters.kld_only {
                    self.candidate.outcome = Status::Success;
                    return;
                }
            }

            modal.get_boundary(density, cluster_bounds);
            // edges against the border color can't be cut, so they stay out of the graph
            let edges: Vec<ColoredEdge<i16>> = cluster_bounds
                .get_edges()
                .iter()
                .filter(|edge| edge.clockwise > 0 && edge.widdershins > 0)
                .cloned()
                .collect();
            if edges.len() <= MAX_BOOLEANS {
                break edges;
            }
            trace!("{x}, {y} pass {}: {} edges is too many", self.candidate.pass, edges.len());
        };
        let clusters = self.candidate.clusters;

        // events per cluster, color 0 collects the border
        let mut cluster_events = vec![0usize; clusters + 1];
        let map = cluster_bounds.map();
        for (event, _) in sample.subset().iter().enumerate().filter(|&(_, &included)| included) {
            let color = map.color_at(sample.value(event, x), sample.value(event, y));
            if let Some(count) = cluster_events.get_mut(color.max(0) as usize) {
                *count += 1;
            }
        }

        let Some(split) = self.best_split(&edges, &cluster_events, moments.n, cluster_bounds.colorful()) else {
            self.candidate.outcome = Status::NoCluster;
            return;
        };

        // recolor the cluster boundary with the two sides of the split
        let left = split.left;
        let side = |color: i16| color <= 0 || left & (1 << (color - 1)) == 0;
        subset_bounds.clear();
        for edge in cluster_bounds.edges() {
            let (clockwise, widdershins) = (side(edge.clockwise), side(edge.widdershins));
            if clockwise == widdershins {
                continue;
            }
            subset_bounds.add_edge(&edge.points, clockwise, widdershins, edge.weight);
            for end in [edge.first(), edge.last()].into_iter().flatten() {
                if end.on_border(N as i16) {
                    subset_bounds.add_vertex(*end);
                }
            }
        }
        subset_bounds.set_colorful(2);
        let Some(separatrix) = subset_bounds.get_edges().first() else {
            self.candidate.outcome = Status::NoCluster;
            return;
        };
        let mut points: Vec<_> = separatrix.points.iter().map(to_point).collect();
        if separatrix.widdershins {
            points.reverse();
        }

        let candidate = &mut self.candidate;
        candidate.separatrix = points;
        candidate.edge_weight = split.edge_weight;
        candidate.balance_factor = split.balance_factor;
        candidate.score = split.score;
        if parameters.suppress_in_out {
            candidate.in_events = moments.n - split.left_events;
            candidate.out_events = split.left_events;
        } else {
            let map = subset_bounds.map();
            candidate.in_set = vec![false; sample.events()];
            candidate.out_set = vec![false; sample.events()];
            for (event, _) in sample.subset().iter().enumerate().filter(|&(_, &included)| included) {
                if map.color_at(sample.value(event, x), sample.value(event, y)) {
                    candidate.in_set[event] = true;
                    candidate.in_events += 1;
                } else {
                    candidate.out_set[event] = true;
                    candidate.out_events += 1;
                }
            }
            if candidate.out_events != split.left_events {
                trace!(
                    "{x}, {y}: {} events outside the separatrix, {} in the clusters",
                    candidate.out_events,
                    split.left_events
                );
            }
        }
        candidate.outcome = Status::Success;
    }

    /// Walks every way of merging the dual graph down to two nodes and keeps the cut with the
    /// lowest score. Cuts that leave either side without events are skipped.
    fn best_split(
        &mut self,
        edges: &[ColoredEdge<i16>],
        cluster_events: &[usize],
        events: usize,
        colorful: usize,
    ) -> Option<Split> {
        let normalization = 8.0 * (N * N) as f64;
        let mut best: Option<Split> = None;
        let mut pile = vec![DualGraph::from_edges(colorful, edges)];
        while let Some(graph) = pile.pop() {
            self.candidate.graphs += 1;
            if !graph.is_simple() {
                pile.extend(graph.simplify());
                continue;
            }
            let left = graph.left();
            let left_events: usize = cluster_events
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(c, _)| left & (1 << (c - 1)) != 0)
                .map(|(_, &count)| count)
                .sum();
            if left_events == 0 || left_events >= events {
                continue;
            }
            let mask = graph.edge();
            let edge_weight = edges
                .iter()
                .enumerate()
                .filter(|(k, _)| mask & (1 << k) != 0)
                .map(|(_, edge)| edge.weight as f64)
                .sum::<f64>()
                / normalization;
            let p = left_events as f64 / events as f64;
            let balance_factor = 4.0 * p * (1.0 - p);
            let score = match self.parameters.goal {
                Goal::BestSeparation => edge_weight,
                Goal::BestBalance => edge_weight / balance_factor,
            };
            if !score.is_finite() {
                continue;
            }
            if best.as_ref().map_or(true, |best| score < best.score) {
                best = Some(Split { left, left_events, edge_weight, balance_factor, score });
            }
        }
        trace!(
            "{}, {}: {} graphs searched over {} edges",
            self.candidate.x,
            self.candidate.y,
            self.candidate.graphs,
            edges.len()
        );
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::GRID;
    use approx::assert_relative_eq;

    #[test]
    fn kernel_of_zero_width_passes_everything() {
        let cosine: Vec<f32> = (0..GRID).map(|k| (k % 7) as f32).collect();
        let mut filtered = vec![0.0; GRID];
        apply_kernel(&cosine, &mut filtered, 0.0);
        assert_eq!(cosine, filtered);
    }

    #[test]
    fn kernel_damps_high_frequencies() {
        let cosine = vec![1.0f32; GRID];
        let mut filtered = vec![0.0; GRID];
        apply_kernel(&cosine, &mut filtered, 1.0 / N as f64);
        assert_eq!(filtered[0], 1.0);
        let low = filtered[1 + (N + 1)];
        let high = filtered[N + (N + 1) * N];
        assert!(low > 0.99 && low < 1.0, "{low}");
        assert!(high < 1e-6, "{high}");
    }

    #[test]
    fn moments_of_a_line() {
        let mut moments = Moments::default();
        for k in 0..5 {
            let x = k as f64 / 4.0;
            moments.add(x, 1.0 - x);
        }
        let (mx, my) = moments.mean();
        assert_relative_eq!(mx, 0.5);
        assert_relative_eq!(my, 0.5);
        let (cxx, cxy, cyy) = moments.covariance();
        assert_relative_eq!(cxx, 0.15625, epsilon = 1e-12);
        assert_relative_eq!(cxy, -0.15625, epsilon = 1e-12);
        assert_relative_eq!(cyy, 0.15625, epsilon = 1e-12);
    }

    fn gaussian_grid(centers: &[(f64, f64)], sd: f64) -> Vec<f32> {
        (0..GRID)
            .map(|k| {
                let x = (k % (N + 1)) as f64 / N as f64;
                let y = (k / (N + 1)) as f64 / N as f64;
                centers
                    .iter()
                    .map(|(cx, cy)| (-((x - cx).powi(2) + (y - cy).powi(2)) / (2.0 * sd * sd)).exp())
                    .sum::<f64>() as f32
            })
            .collect()
    }

    fn moments_of(centers: &[(f64, f64)], sd: f64) -> Moments {
        // the exact moments of an equal mixture, as sums over a notional million events
        let n = 1_000_000.0;
        let k = centers.len() as f64;
        let mut moments = Moments { n: 1_000_000, ..Moments::default() };
        for (cx, cy) in centers {
            moments.x += n / k * cx;
            moments.y += n / k * cy;
            moments.xx += n / k * (cx * cx + sd * sd);
            moments.xy += n / k * cx * cy;
            moments.yy += n / k * (cy * cy + sd * sd);
        }
        moments
    }

    #[test]
    fn normal_density_is_not_interesting() {
        let centers = [(0.5, 0.5)];
        let kld = kld_normal_2d(&gaussian_grid(&centers, 0.1), &moments_of(&centers, 0.1));
        assert!(kld.abs() < 0.01, "{kld}");
    }

    #[test]
    fn two_lobes_are_interesting() {
        let centers = [(0.3, 0.3), (0.7, 0.7)];
        let kld = kld_normal_2d(&gaussian_grid(&centers, 0.05), &moments_of(&centers, 0.05));
        assert!(kld > 0.16, "{kld}");
    }
}
