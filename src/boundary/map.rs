use crate::boundary::segment::{Color, ColoredSegment, ColoredSlope};
use crate::N;

/// Fast lookup of the region color at any point of the unit square. Built from a sorted
/// segment list; each grid column keeps the index of its first segment and the color just below
/// it, so a lookup only scans the few segments in one column up to the target square.
#[derive(Debug, Clone)]
pub(crate) struct ColoredMap<C> {
    segments: Vec<ColoredSegment<C>>,
    index: Vec<usize>,
    edge_color: Vec<C>,
}

impl<C: Color> ColoredMap<C> {
    pub(crate) fn new(segments: &[ColoredSegment<C>]) -> Self {
        let segments = segments.to_vec();
        let end = segments.len();
        let mut index = vec![end; N];
        let mut edge_color = vec![C::default(); N];

        // the color below the first column
        let mut outside = match segments.first() {
            None => C::default(),
            Some(s) if s.j == 0 => {
                if s.slope == ColoredSlope::Horizontal {
                    s.clockwise
                } else {
                    s.widdershins
                }
            }
            Some(s) => {
                if s.slope == ColoredSlope::Left {
                    s.widdershins
                } else {
                    s.clockwise
                }
            }
        };

        let mut k = 0;
        for i in 0..N {
            let column = i as i16;
            if k < end && segments[k].i == column {
                let s = &segments[k];
                outside = if s.j == 0 || s.slope != ColoredSlope::Left {
                    s.clockwise
                } else {
                    s.widdershins
                };
                index[i] = k;
                k += 1;
            }
            edge_color[i] = outside;
            while k < end && segments[k].i == column {
                k += 1;
            }
        }

        ColoredMap { segments, index, edge_color }
    }

    /// The color of the region containing `(x, y)`, both in [0, 1]. This is called once per event
    /// per candidate so it is the innermost loop of the whole pursuit.
    pub(crate) fn color_at(&self, x: f64, y: f64) -> C {
        let scaled_x = x * N as f64;
        let scaled_y = y * N as f64;
        let i = (scaled_x as usize).min(N - 1);
        let j = (scaled_y as usize).min(N - 1);
        let dx = scaled_x - i as f64;
        let dy = scaled_y - j as f64;
        let (column, row) = (i as i16, j as i16);

        let mut result = self.edge_color[i];
        for segment in &self.segments[self.index[i]..] {
            if segment.i != column || segment.j > row {
                break;
            }
            if segment.j < row {
                // the point is somewhere above this segment
                match segment.slope {
                    ColoredSlope::Left => result = segment.clockwise,
                    ColoredSlope::Right | ColoredSlope::Horizontal => result = segment.widdershins,
                    ColoredSlope::Vertical => {}
                }
                continue;
            }
            return match segment.slope {
                ColoredSlope::Left => {
                    if dy > 1.0 - dx {
                        segment.clockwise
                    } else {
                        segment.widdershins
                    }
                }
                ColoredSlope::Right => {
                    if dy <= dx {
                        segment.clockwise
                    } else {
                        segment.widdershins
                    }
                }
                ColoredSlope::Horizontal => segment.widdershins,
                ColoredSlope::Vertical => result,
            };
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::segment::ColoredPoint;
    use crate::boundary::ColoredBoundary;

    fn square_loop(low: i16, high: i16) -> ColoredBoundary<i16> {
        // a clockwise loop with region 2 inside and 1 outside
        let mut boundary = ColoredBoundary::new();
        for j in low..high {
            boundary.add_segment_between(ColoredPoint::new(low, j), ColoredPoint::new(low, j + 1), 2, 1, 1.0);
            boundary.add_segment_between(ColoredPoint::new(high, j + 1), ColoredPoint::new(high, j), 2, 1, 1.0);
        }
        for i in low..high {
            boundary.add_segment_between(ColoredPoint::new(i, high), ColoredPoint::new(i + 1, high), 2, 1, 1.0);
            boundary.add_segment_between(ColoredPoint::new(i + 1, low), ColoredPoint::new(i, low), 2, 1, 1.0);
        }
        boundary.set_colorful(3);
        boundary
    }

    fn unit(cell: usize) -> f64 {
        (cell as f64 + 0.5) / N as f64
    }

    #[test]
    fn empty_map_has_default_color() {
        let map = ColoredMap::<bool>::new(&[]);
        assert!(!map.color_at(0.5, 0.5));
        assert!(!map.color_at(1.0, 1.0));
    }

    #[test]
    fn interior_points_agree_regardless_of_nearest_segment() {
        let boundary = square_loop(100, 140);
        let map = boundary.map();
        // every cell strictly inside, including those hugging each side of the square
        for i in 100..140 {
            for j in 100..140 {
                assert_eq!(map.color_at(unit(i), unit(j)), 2, "cell ({i}, {j})");
            }
        }
        for (i, j) in [(10, 10), (99, 120), (140, 120), (120, 99), (120, 140), (250, 250), (0, 255)] {
            assert_eq!(map.color_at(unit(i), unit(j)), 1, "cell ({i}, {j})");
        }
    }

    #[test]
    fn diagonal_segments_split_their_square() {
        let mut boundary = ColoredBoundary::new();
        // a diamond around (128, 128)
        let corners = [
            ColoredPoint::new(128, 120),
            ColoredPoint::new(120, 128),
            ColoredPoint::new(128, 136),
            ColoredPoint::new(136, 128),
        ];
        for k in 0..4 {
            let (from, to) = (corners[k], corners[(k + 1) % 4]);
            let di = (to.i - from.i).signum();
            let dj = (to.j - from.j).signum();
            let mut p = from;
            while p != to {
                let q = ColoredPoint::new(p.i + di, p.j + dj);
                boundary.add_segment_between(p, q, 1i16, 2, 1.0);
                p = q;
            }
        }
        boundary.set_colorful(3);
        let map = boundary.map();
        let inside = map.color_at(128.5 / N as f64, 128.5 / N as f64);
        let outside = map.color_at(10.0 / N as f64, 10.0 / N as f64);
        assert_ne!(inside, outside);
        // the square (124, 123) is cut by the diagonal from (128, 120) to (120, 128)
        assert_eq!(map.color_at(124.9 / N as f64, 123.9 / N as f64), inside);
        assert_eq!(map.color_at(124.05 / N as f64, 123.05 / N as f64), outside);
        // and (131, 132) by the one from (128, 136) to (136, 128)
        assert_eq!(map.color_at(131.9 / N as f64, 132.9 / N as f64), outside);
        assert_eq!(map.color_at(131.1 / N as f64, 132.1 / N as f64), inside);
    }
}
