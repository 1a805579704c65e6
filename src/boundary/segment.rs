use std::cmp::Ordering;
use std::fmt::Debug;

/// Anything that can label the two sides of a boundary. Clusters use `i16` labels, a two way
/// split uses `bool`.
pub(crate) trait Color: Copy + PartialEq + Default + Debug {}

impl<C: Copy + PartialEq + Default + Debug> Color for C {}

/// The four orientations a unit segment can take within a grid square. The declaration order is
/// the sort order, which the map lookup relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum ColoredSlope {
    Horizontal,
    Right,
    Left,
    Vertical,
}

/// A grid vertex. Points are compared in raster order, `i` first, so they can be binary searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub(crate) struct ColoredPoint {
    pub(crate) i: i16,
    pub(crate) j: i16,
}

impl ColoredPoint {
    pub(crate) fn new(i: i16, j: i16) -> Self {
        ColoredPoint { i, j }
    }

    pub(crate) fn adjacent(&self, other: &ColoredPoint) -> bool {
        (self.i - other.i).abs() <= 1 && (self.j - other.j).abs() <= 1
    }

    pub(crate) fn on_border(&self, n: i16) -> bool {
        self.i == 0 || self.i == n || self.j == 0 || self.j == n
    }
}

/// A directed unit edge with each side labeled by a color. A segment always lives in one grid
/// square and is stored by the lower left corner of that square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColoredSegment<C> {
    pub(crate) slope: ColoredSlope,
    pub(crate) i: i16,
    pub(crate) j: i16,
    pub(crate) clockwise: C,
    pub(crate) widdershins: C,
    pub(crate) weight: f32,
}

impl<C: Color> ColoredSegment<C> {
    /// Non-positive weights are bumped to the smallest positive float so every edge costs
    /// something.
    pub(crate) fn new(
        slope: ColoredSlope,
        i: i16,
        j: i16,
        clockwise: C,
        widdershins: C,
        weight: f32,
    ) -> Self {
        let weight = if weight > 0.0 { weight } else { f32::MIN_POSITIVE };
        ColoredSegment { slope, i, j, clockwise, widdershins, weight }
    }

    pub(crate) fn tail(&self) -> ColoredPoint {
        match self.slope {
            ColoredSlope::Left => ColoredPoint::new(self.i + 1, self.j),
            ColoredSlope::Right | ColoredSlope::Horizontal | ColoredSlope::Vertical => {
                ColoredPoint::new(self.i, self.j)
            }
        }
    }

    pub(crate) fn head(&self) -> ColoredPoint {
        match self.slope {
            ColoredSlope::Left => ColoredPoint::new(self.i, self.j + 1),
            ColoredSlope::Right => ColoredPoint::new(self.i + 1, self.j + 1),
            ColoredSlope::Horizontal => ColoredPoint::new(self.i + 1, self.j),
            ColoredSlope::Vertical => ColoredPoint::new(self.i, self.j + 1),
        }
    }

    pub(crate) fn touches(&self, point: &ColoredPoint) -> bool {
        self.head() == *point || self.tail() == *point
    }

    /// Sort key: raster order of the square, then slope.
    pub(crate) fn key(&self) -> (i16, i16, ColoredSlope) {
        (self.i, self.j, self.slope)
    }

    pub(crate) fn cmp_position(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }

    /// Where this segment leads when entered at `point` while walking with `clockwise` on the
    /// right and `widdershins` on the left, or `None` if it doesn't continue such a walk.
    pub(crate) fn continues(&self, point: &ColoredPoint, clockwise: C, widdershins: C) -> Option<ColoredPoint> {
        if self.tail() == *point && self.clockwise == clockwise && self.widdershins == widdershins {
            Some(self.head())
        } else if self.head() == *point
            && self.widdershins == clockwise
            && self.clockwise == widdershins
        {
            Some(self.tail())
        } else {
            None
        }
    }
}

/// A polyline of fused unit segments with consistent coloring along its whole length.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColoredEdge<C> {
    pub(crate) points: Vec<ColoredPoint>,
    pub(crate) clockwise: C,
    pub(crate) widdershins: C,
    pub(crate) weight: f32,
}

impl<C: Color> ColoredEdge<C> {
    pub(crate) fn new(points: Vec<ColoredPoint>, clockwise: C, widdershins: C, weight: f32) -> Self {
        ColoredEdge { points, clockwise, widdershins, weight }
    }

    pub(crate) fn first(&self) -> Option<&ColoredPoint> {
        self.points.first()
    }

    pub(crate) fn last(&self) -> Option<&ColoredPoint> {
        self.points.last()
    }
}
