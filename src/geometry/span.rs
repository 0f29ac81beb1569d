use serde::{Deserialize, Serialize};

use super::{snap_to_grid, Int};

/// A closed one-dimensional interval `[start, stop]`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Span {
    start: Int,
    stop: Int,
}

impl Span {
    /// Creates a span from two endpoints given in any order.
    pub fn new(a: Int, b: Int) -> Self {
        Self {
            start: a.min(b),
            stop: a.max(b),
        }
    }

    /// A span of length `span` centered on `center`.
    pub fn from_center_span(center: Int, span: Int) -> Self {
        assert!(span >= 0);
        Self::new(center - span / 2, center - span / 2 + span)
    }

    /// A span of length `span` centered as closely as possible on `center`,
    /// with both endpoints on the grid.
    ///
    /// `span` must be a multiple of `grid`.
    pub fn from_center_span_gridded(center: Int, span: Int, grid: Int) -> Self {
        assert!(span >= 0);
        assert_eq!(span % grid, 0);
        let start = snap_to_grid(center - span / 2, grid);
        Self::new(start, start + span)
    }

    #[inline]
    pub fn start(&self) -> Int {
        self.start
    }

    #[inline]
    pub fn stop(&self) -> Int {
        self.stop
    }

    #[inline]
    pub fn length(&self) -> Int {
        self.stop - self.start
    }

    #[inline]
    pub fn center(&self) -> Int {
        (self.start + self.stop) / 2
    }

    /// The upper edge if `pos` is true, otherwise the lower edge.
    #[inline]
    pub fn edge(&self, pos: bool) -> Int {
        if pos {
            self.stop
        } else {
            self.start
        }
    }

    /// The edge farther from `x`.
    pub fn edge_farther_from(&self, x: Int) -> Int {
        if (x - self.start).abs() > (x - self.stop).abs() {
            self.start
        } else {
            self.stop
        }
    }

    #[inline]
    pub fn contains(&self, x: Int) -> bool {
        self.start <= x && x <= self.stop
    }

    #[inline]
    pub fn contains_span(&self, other: Span) -> bool {
        self.start <= other.start && other.stop <= self.stop
    }

    /// Whether the two spans share any interior length.
    #[inline]
    pub fn intersects(&self, other: &Span) -> bool {
        self.start < other.stop && other.start < self.stop
    }

    pub fn union(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.stop.max(other.stop))
    }

    /// The smallest span containing both this span and `x`.
    pub fn add_point(self, x: Int) -> Span {
        Span::new(self.start.min(x), self.stop.max(x))
    }

    pub fn expand(self, dist: Int) -> Span {
        Span::new(self.start - dist, self.stop + dist)
    }

    pub fn translate(self, dist: Int) -> Span {
        Span::new(self.start + dist, self.stop + dist)
    }
}
