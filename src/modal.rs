use std::f64::consts::{PI, SQRT_2};

use log::trace;

use crate::boundary::{ColoredBoundary, ColoredPoint, ColoredSlope};
use crate::{Parameters, N};

/// Side of the label grid, which has one cell of padding all round so neighbors of the density
/// grid's edge need no bounds checks.
const PADDED: usize = N + 3;
const GRID: usize = (N + 1) * (N + 1);

/// The padding is never labeled.
const UNASSIGNED: i16 = -1;
const BORDER: i16 = 0;

/// Diagonal neighbors are a factor of sqrt(2) further away than the square ones, so they are
/// only counted as contiguous three times out of four. A rotating two bit counter picks which
/// diagonal to leave out; it is deterministic, unlike a random number generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DiagonalRotation {
    counter: u32,
}

impl DiagonalRotation {
    pub(crate) fn reset(&mut self, phase: u32) {
        self.counter = phase & 3;
    }

    fn next(&mut self) -> u32 {
        let two_bits = self.counter & 3;
        self.counter = self.counter.wrapping_add(1);
        two_bits
    }
}

#[derive(Debug, Clone, Copy)]
struct GridVertex {
    f: f32,
    i: i16,
    j: i16,
}

/// Finds the modes of a smoothed density and the boundaries between their basins.
///
/// The scratch grids are large, so an instance is meant to be kept per thread and reused across
/// passes and pursuits.
#[derive(Debug, Clone)]
pub(crate) struct ModalClustering {
    clusters: usize,
    rotation: DiagonalRotation,
    cluster: Vec<i16>,
    contiguous: Vec<bool>,
    vertices: Vec<GridVertex>,
    spare: Vec<GridVertex>,
    cursor: usize,
}

impl Default for ModalClustering {
    fn default() -> Self {
        Self::new()
    }
}

impl ModalClustering {
    pub(crate) fn new() -> Self {
        ModalClustering {
            clusters: 0,
            rotation: DiagonalRotation::default(),
            cluster: vec![UNASSIGNED; PADDED * PADDED],
            contiguous: vec![false; PADDED * PADDED],
            vertices: Vec::with_capacity(GRID),
            spare: Vec::with_capacity(GRID),
            cursor: 0,
        }
    }

    pub(crate) fn rotation_mut(&mut self) -> &mut DiagonalRotation {
        &mut self.rotation
    }

    #[inline]
    fn at(i: isize, j: isize) -> usize {
        ((i + 1) as usize) * PADDED + (j + 1) as usize
    }

    #[inline]
    fn label(&self, i: isize, j: isize) -> i16 {
        self.cluster[Self::at(i, j)]
    }

    /// Folds the label of `(i, j)` into `result`: the first cluster seen is adopted and a second,
    /// different one makes the point a border.
    #[inline]
    fn visit(&self, result: &mut i32, i: isize, j: isize) {
        let label = self.label(i, j) as i32;
        if label > 0 {
            if *result < 0 {
                *result = label;
            } else if *result != label {
                *result = BORDER as i32;
            }
        }
    }

    fn mark_neighbors(&mut self, i: isize, j: isize) {
        self.contiguous[Self::at(i - 1, j)] = true;
        self.contiguous[Self::at(i + 1, j)] = true;
        self.contiguous[Self::at(i, j - 1)] = true;
        self.contiguous[Self::at(i, j + 1)] = true;
        let two_bits = self.rotation.next();
        if two_bits != 0 {
            self.contiguous[Self::at(i + 1, j + 1)] = true;
        }
        if two_bits != 1 {
            self.contiguous[Self::at(i + 1, j - 1)] = true;
        }
        if two_bits != 2 {
            self.contiguous[Self::at(i - 1, j + 1)] = true;
        }
        if two_bits != 3 {
            self.contiguous[Self::at(i - 1, j - 1)] = true;
        }
    }

    /// Labels the statistically significant peaks of `density` and returns how many distinct
    /// clusters they form.
    ///
    /// # Parameters
    /// * `density` - the (N+1)x(N+1) smoothed density, indexed `i + (N + 1) * j`
    /// * `pass` - the smoothing pass, which sets the kernel width as `W * pass`
    /// * `parameters` - supplies W, sigma and the cluster limit
    ///
    /// # Returns
    /// * The cluster count. Zero when no spot of the kernel's size holds enough mass to be
    ///   significant. Counting stops as soon as it exceeds `max_clusters`.
    pub(crate) fn find_clusters(&mut self, density: &[f32], pass: usize, parameters: &Parameters) -> usize {
        debug_assert_eq!(density.len(), GRID);
        self.clusters = 0;
        self.contiguous.fill(false);
        self.cluster.fill(UNASSIGNED);

        self.vertices.clear();
        for i in 0..=N {
            for j in 0..=N {
                self.vertices.push(GridVertex {
                    f: density[i + (N + 1) * j],
                    i: i as i16,
                    j: j as i16,
                });
            }
        }
        // densest first, ties in raster order
        self.vertices.sort_by(|a, b| b.f.total_cmp(&a.f));

        // a spot of radius 2 W pass has to carry sigma standard deviations of mass
        let n = N as f64;
        let pass = pass as f64;
        let spot = (PI * 4.0 * parameters.w * parameters.w * n * n * pass * pass + 0.5) as usize;
        let spot = spot.clamp(8, GRID);
        let threshold = parameters.sigma * parameters.sigma * 4.0 * n * n;
        let mut count = 0.0f64;
        let mut i = GRID;
        for _ in 0..spot {
            i -= 1;
            count += self.vertices[i].f as f64;
        }
        let mut j = GRID;
        while count < threshold && i > 0 {
            i -= 1;
            count += self.vertices[i].f as f64;
            j -= 1;
            count -= self.vertices[j].f as f64;
        }
        if i == 0 {
            trace!("pass {pass}: density too flat for a significant spot of {spot} points");
            self.cursor = 0;
            return 0;
        }

        for k in 0..i {
            let GridVertex { i: vi, j: vj, .. } = self.vertices[k];
            let (vi, vj) = (vi as isize, vj as isize);
            let mut result = -1;
            self.visit(&mut result, vi + 1, vj);
            self.visit(&mut result, vi - 1, vj);
            self.visit(&mut result, vi, vj + 1);
            self.visit(&mut result, vi, vj - 1);
            if result < 0 {
                self.clusters += 1;
                result = self.clusters as i32;
            }
            if self.clusters > parameters.max_clusters {
                return self.clusters;
            }
            self.cluster[Self::at(vi, vj)] = result as i16;
            if result > 0 {
                self.mark_neighbors(vi, vj);
            }
        }
        // the rest is filled out by get_boundary, only if it's needed
        self.cursor = i;
        self.clusters
    }

    /// Moves the not yet labeled points that touch a labeled one to the front of the remainder,
    /// keeping density order within each part. Returns the end of the contiguous part.
    fn partition_contiguous(&mut self) -> usize {
        let mut rest = std::mem::take(&mut self.spare);
        rest.clear();
        let mut write = self.cursor;
        for read in self.cursor..GRID {
            let vertex = self.vertices[read];
            if self.contiguous[Self::at(vertex.i as isize, vertex.j as isize)] {
                self.vertices[write] = vertex;
                write += 1;
            } else {
                rest.push(vertex);
            }
        }
        self.vertices[write..].copy_from_slice(&rest);
        self.spare = rest;
        write
    }

    /// Assigns every remaining grid point to a cluster or to the border, then traces the border
    /// points into colored segments. Requires a preceding `find_clusters` that found clusters.
    pub(crate) fn get_boundary(&mut self, density: &[f32], bounds: &mut ColoredBoundary<i16>) {
        // small densities aren't trusted so grow the clusters outwards a tranche at a time
        while self.cursor < GRID {
            let tranche = self.partition_contiguous();
            if tranche == self.cursor {
                self.cursor += 1;
                continue;
            }
            for k in self.cursor..tranche {
                let GridVertex { i, j, .. } = self.vertices[k];
                let (i, j) = (i as isize, j as isize);
                let mut result = -1;
                self.visit(&mut result, i - 1, j);
                self.visit(&mut result, i + 1, j);
                self.visit(&mut result, i, j - 1);
                self.visit(&mut result, i, j + 1);
                if result < 0 {
                    self.visit(&mut result, i - 1, j - 1);
                    self.visit(&mut result, i + 1, j - 1);
                    self.visit(&mut result, i - 1, j + 1);
                    self.visit(&mut result, i + 1, j + 1);
                }
                if result < 0 {
                    // reached only through a diagonal that was skipped
                    result = BORDER as i32;
                }
                self.cluster[Self::at(i, j)] = result as i16;
                self.mark_neighbors(i, j);
            }
            self.cursor = tranche;
        }

        bounds.clear();
        let d = |i: isize, j: isize| density[i as usize + (N + 1) * j as usize];
        for k in 0..GRID {
            let GridVertex { i: vi, j: vj, .. } = self.vertices[k];
            let (i, j) = (vi as isize, vj as isize);
            if self.label(i, j) != BORDER {
                continue;
            }
            // the neighborhood clockwise starting straight up
            let neighbor = [
                self.label(i, j + 1),
                self.label(i + 1, j + 1),
                self.label(i + 1, j),
                self.label(i + 1, j - 1),
                self.label(i, j - 1),
                self.label(i - 1, j - 1),
                self.label(i - 1, j),
                self.label(i - 1, j + 1),
            ];
            let center = d(i, j);
            let mut rank = 0;
            let mut on_edge = false;
            let mut next = 0usize;
            while next < 8 {
                let mut at = next;
                next += 1;
                if neighbor[at] > 0 {
                    continue;
                }
                if neighbor[at] < 0 {
                    on_edge = true;
                    continue;
                }
                // a border point, look for the cluster to its left
                let left = neighbor[(at + 7) & 7];
                if left <= 0 {
                    continue;
                }
                // and the first cluster to its right
                let mut far = at + 1;
                let mut right = neighbor[far & 7];
                while right == BORDER {
                    far += 1;
                    right = neighbor[far & 7];
                }
                if right < 0 || left == right {
                    continue;
                }
                let mut square = false;
                match far - at {
                    1 => {}
                    // two border points, take the one square on rather than diagonal
                    2 => {
                        if at & 1 == 1 {
                            at += 1;
                        }
                    }
                    // three in a T, take the middle one, otherwise it's a square
                    3 => {
                        if at & 1 == 1 {
                            at += 1;
                        } else {
                            square = true;
                        }
                    }
                    _ => square = true,
                }
                next = at + 1;

                if !square {
                    match at & 7 {
                        0 => bounds.add_segment(ColoredSlope::Vertical, vi, vj, right, left, center + d(i, j + 1)),
                        1 => bounds.add_segment(
                            ColoredSlope::Right,
                            vi,
                            vj,
                            right,
                            left,
                            (center + d(i + 1, j + 1)) * SQRT_2 as f32,
                        ),
                        2 => bounds.add_segment(ColoredSlope::Horizontal, vi, vj, right, left, center + d(i + 1, j)),
                        3 => bounds.add_segment(
                            ColoredSlope::Left,
                            vi,
                            vj - 1,
                            left,
                            right,
                            (center + d(i + 1, j - 1)) * SQRT_2 as f32,
                        ),
                        // the other half plane belongs to the neighbor
                        _ => {}
                    }
                    rank += 1;
                } else {
                    // the interior of a square of border points can't be colored consistently,
                    // so its sides get the border color
                    match at & 7 {
                        7 | 0 => {
                            bounds.add_segment(ColoredSlope::Vertical, vi, vj, BORDER, left, center + d(i, j + 1));
                            bounds.add_segment(ColoredSlope::Horizontal, vi, vj, right, BORDER, center + d(i + 1, j));
                        }
                        1 | 2 => {
                            bounds.add_segment(ColoredSlope::Horizontal, vi, vj, BORDER, left, center + d(i + 1, j))
                        }
                        5 | 6 => {
                            bounds.add_segment(ColoredSlope::Vertical, vi, vj, right, BORDER, center + d(i, j + 1))
                        }
                        _ => {}
                    }
                    rank += 2;
                }
            }
            if rank != 2 || on_edge {
                bounds.add_vertex(ColoredPoint::new(vi, vj));
            }
        }
        bounds.set_colorful(self.clusters + 1);
    }
}
