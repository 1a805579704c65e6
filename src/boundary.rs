//! Colored maps: planar subdivisions of the unit square built from directed, two sided unit
//! segments on the density grid.
//!
//! The map is optimized first for the point lookup, which runs once per event per candidate, and
//! second for pulling polylines back out of the segment soup.
use std::ops::Range;

pub(crate) mod graph;
pub(crate) mod map;
pub(crate) mod segment;

pub(crate) use graph::DualGraph;
pub(crate) use map::ColoredMap;
pub(crate) use segment::{Color, ColoredEdge, ColoredPoint, ColoredSegment, ColoredSlope};

/// Collects unit segments and vertices and fuses them into edges.
#[derive(Debug, Clone, Default)]
pub(crate) struct ColoredBoundary<C> {
    segments: Vec<ColoredSegment<C>>,
    vertices: Vec<ColoredPoint>,
    edges: Vec<ColoredEdge<C>>,
    colorful: usize,
}

impl<C: Color> ColoredBoundary<C> {
    pub(crate) fn new() -> Self {
        ColoredBoundary {
            segments: Vec::new(),
            vertices: Vec::new(),
            edges: Vec::new(),
            colorful: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.segments.clear();
        self.vertices.clear();
        self.edges.clear();
        self.colorful = 0;
    }

    pub(crate) fn add_segment(
        &mut self,
        slope: ColoredSlope,
        i: i16,
        j: i16,
        clockwise: C,
        widdershins: C,
        weight: f32,
    ) {
        self.segments
            .push(ColoredSegment::new(slope, i, j, clockwise, widdershins, weight));
    }

    /// Adds the unit segment from `tail` to `head`, which must be neighbors on the grid. The
    /// segment is stored in its canonical orientation with the colors swapped to match.
    pub(crate) fn add_segment_between(
        &mut self,
        tail: ColoredPoint,
        head: ColoredPoint,
        clockwise: C,
        widdershins: C,
        weight: f32,
    ) {
        debug_assert!(tail != head && head.adjacent(&tail));
        let (tail, head, clockwise, widdershins) = if head < tail {
            (head, tail, widdershins, clockwise)
        } else {
            (tail, head, clockwise, widdershins)
        };
        if tail.i == head.i {
            self.add_segment(ColoredSlope::Vertical, tail.i, tail.j, clockwise, widdershins, weight);
            return;
        }
        match head.j - tail.j {
            1 => self.add_segment(ColoredSlope::Right, tail.i, tail.j, clockwise, widdershins, weight),
            0 => self.add_segment(ColoredSlope::Horizontal, tail.i, tail.j, clockwise, widdershins, weight),
            _ => self.add_segment(ColoredSlope::Left, tail.i, head.j, widdershins, clockwise, weight),
        }
    }

    /// Adds every unit step of a polyline, sharing its weight evenly.
    pub(crate) fn add_edge(&mut self, points: &[ColoredPoint], clockwise: C, widdershins: C, weight: f32) {
        debug_assert!(points.len() > 1);
        let share = weight / (points.len() - 1).max(1) as f32;
        for step in points.windows(2) {
            self.add_segment_between(step[0], step[1], clockwise, widdershins, share);
        }
    }

    pub(crate) fn add_vertex(&mut self, vertex: ColoredPoint) {
        self.vertices.push(vertex);
    }

    /// Declares how many colors are in use and sorts everything for searching. Must be called
    /// after the last segment is added and before edges or maps are taken.
    pub(crate) fn set_colorful(&mut self, colors: usize) {
        self.colorful = colors;
        self.vertices.sort_unstable();
        self.vertices.dedup();
        self.segments.sort_by(|a, b| a.cmp_position(b));
    }

    pub(crate) fn colorful(&self) -> usize {
        self.colorful
    }

    #[cfg(test)]
    pub(crate) fn segments(&self) -> &[ColoredSegment<C>] {
        &self.segments
    }

    #[cfg(test)]
    pub(crate) fn vertices(&self) -> &[ColoredPoint] {
        &self.vertices
    }

    pub(crate) fn is_vertex(&self, point: &ColoredPoint) -> bool {
        self.vertices.binary_search(point).is_ok()
    }

    pub(crate) fn map(&self) -> ColoredMap<C> {
        ColoredMap::new(&self.segments)
    }

    /// Segments stored in column `i` with `j` in `low..=high`.
    fn column(&self, i: i16, low: i16, high: i16) -> Range<usize> {
        let start = self.segments.partition_point(|s| (s.i, s.j) < (i, low));
        let end = self.segments.partition_point(|s| (s.i, s.j) <= (i, high));
        start..end.max(start)
    }

    /// Indices of the segments that could touch `point`: those in the four squares around it.
    fn around(&self, point: &ColoredPoint) -> impl Iterator<Item = usize> {
        self.column(point.i - 1, point.j - 1, point.j)
            .chain(self.column(point.i, point.j - 1, point.j))
    }

    /// Claims any unused segment touching `point`.
    fn take_any(&self, point: &ColoredPoint, done: &mut [bool]) -> Option<usize> {
        let found = self
            .around(point)
            .find(|&k| !done[k] && self.segments[k].touches(point))?;
        done[found] = true;
        Some(found)
    }

    /// Claims the unused segment that continues a walk through `point` with the given coloring
    /// and returns it along with the far end.
    fn take_next(
        &self,
        point: &ColoredPoint,
        clockwise: C,
        widdershins: C,
        done: &mut [bool],
    ) -> Option<(usize, ColoredPoint)> {
        let found = self.around(point).find_map(|k| {
            if done[k] {
                return None;
            }
            self.segments[k]
                .continues(point, clockwise, widdershins)
                .map(|next| (k, next))
        })?;
        done[found.0] = true;
        Some(found)
    }

    /// Fuses the segments into polylines. Open edges run from vertex to vertex, and whatever is
    /// left over forms closed loops. Every edge has a single consistent coloring.
    pub(crate) fn get_edges(&mut self) -> &[ColoredEdge<C>] {
        let mut edges = Vec::new();
        let mut done = vec![false; self.segments.len()];

        // open edges starting at a vertex
        for v in 0..self.vertices.len() {
            let vertex = self.vertices[v];
            while let Some(first) = self.take_any(&vertex, &mut done) {
                let segment = self.segments[first];
                let (clockwise, widdershins, mut point) = if segment.tail() == vertex {
                    (segment.clockwise, segment.widdershins, segment.head())
                } else {
                    (segment.widdershins, segment.clockwise, segment.tail())
                };
                let mut points = vec![vertex, point];
                let mut weight = segment.weight;
                while !self.is_vertex(&point) {
                    match self.take_next(&point, clockwise, widdershins, &mut done) {
                        Some((k, next)) => {
                            weight += self.segments[k].weight;
                            points.push(next);
                            point = next;
                        }
                        None => break,
                    }
                }
                edges.push(ColoredEdge::new(points, clockwise, widdershins, weight));
            }
        }

        // closed edges, or remnants that never reached a vertex
        let mut cursor = 0;
        while cursor < self.segments.len() {
            if done[cursor] {
                cursor += 1;
                continue;
            }
            done[cursor] = true;
            let segment = self.segments[cursor];
            let (clockwise, widdershins) = (segment.clockwise, segment.widdershins);
            let start = segment.tail();
            let mut head = segment.head();
            let mut points = vec![start, head];
            let mut weight = segment.weight;
            while head != start {
                match self.take_next(&head, clockwise, widdershins, &mut done) {
                    Some((k, next)) => {
                        weight += self.segments[k].weight;
                        points.push(next);
                        head = next;
                    }
                    None => break,
                }
            }
            if head != start {
                // not a loop so pick up whatever leads into the start too
                let mut before = Vec::new();
                let mut tail = start;
                while let Some((k, previous)) = self.take_next(&tail, widdershins, clockwise, &mut done) {
                    weight += self.segments[k].weight;
                    before.push(previous);
                    tail = previous;
                }
                if !before.is_empty() {
                    before.reverse();
                    before.extend(points);
                    points = before;
                }
            }
            edges.push(ColoredEdge::new(points, clockwise, widdershins, weight));
        }

        debug_assert!(done.iter().all(|&d| d));
        self.edges = edges;
        &self.edges
    }

    pub(crate) fn edges(&self) -> &[ColoredEdge<C>] {
        &self.edges
    }
}
