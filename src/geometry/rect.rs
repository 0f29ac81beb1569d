use serde::{Deserialize, Serialize};

use super::{BoundBox, BoundBoxTrait, Dir, Int, Point, Span};

/// An axis-aligned rectangle.
///
/// `p0` is always the lower-left corner and `p1` the upper-right corner.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub p0: Point,
    pub p1: Point,
}

impl Rect {
    /// Creates a rectangle from two opposite corners given in any order.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            p0: Point::new(a.x.min(b.x), a.y.min(b.y)),
            p1: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn from_spans(hspan: Span, vspan: Span) -> Self {
        Self {
            p0: Point::new(hspan.start(), vspan.start()),
            p1: Point::new(hspan.stop(), vspan.stop()),
        }
    }

    /// Creates a rectangle from a span along `dir` and a span across it.
    pub fn from_dir_spans(dir: Dir, along: Span, across: Span) -> Self {
        match dir {
            Dir::Horiz => Self::from_spans(along, across),
            Dir::Vert => Self::from_spans(across, along),
        }
    }

    /// Creates a rectangle from its lower-left corner and its dimensions.
    pub fn ll_wh(x: Int, y: Int, w: Int, h: Int) -> Self {
        assert!(w >= 0 && h >= 0);
        Self {
            p0: Point::new(x, y),
            p1: Point::new(x + w, y + h),
        }
    }

    /// Creates a rectangle of the given dimensions centered on `center`.
    pub fn from_center(center: Point, w: Int, h: Int) -> Self {
        Self::from_spans(
            Span::from_center_span(center.x, w),
            Span::from_center_span(center.y, h),
        )
    }

    #[inline]
    pub fn left(&self) -> Int {
        self.p0.x
    }
    #[inline]
    pub fn right(&self) -> Int {
        self.p1.x
    }
    #[inline]
    pub fn bottom(&self) -> Int {
        self.p0.y
    }
    #[inline]
    pub fn top(&self) -> Int {
        self.p1.y
    }

    #[inline]
    pub fn width(&self) -> Int {
        self.p1.x - self.p0.x
    }

    #[inline]
    pub fn height(&self) -> Int {
        self.p1.y - self.p0.y
    }

    #[inline]
    pub fn area(&self) -> Int {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }

    #[inline]
    pub fn hspan(&self) -> Span {
        Span::new(self.p0.x, self.p1.x)
    }

    #[inline]
    pub fn vspan(&self) -> Span {
        Span::new(self.p0.y, self.p1.y)
    }

    /// The span of this rectangle along `dir`.
    pub fn span(&self, dir: Dir) -> Span {
        match dir {
            Dir::Horiz => self.hspan(),
            Dir::Vert => self.vspan(),
        }
    }

    /// The length of this rectangle along `dir`.
    #[inline]
    pub fn length(&self, dir: Dir) -> Int {
        self.span(dir).length()
    }

    #[inline]
    pub fn lower_edge(&self, dir: Dir) -> Int {
        self.span(dir).start()
    }

    #[inline]
    pub fn upper_edge(&self, dir: Dir) -> Int {
        self.span(dir).stop()
    }

    pub fn edge_farther_from(&self, x: Int, dir: Dir) -> Int {
        self.span(dir).edge_farther_from(x)
    }

    /// The direction along which this rectangle is longer.
    ///
    /// Squares are considered vertical.
    pub fn longer_dir(&self) -> Dir {
        if self.width() > self.height() {
            Dir::Horiz
        } else {
            Dir::Vert
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.hspan().contains(p.x) && self.vspan().contains(p.y)
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.hspan().contains_span(other.hspan()) && self.vspan().contains_span(other.vspan())
    }

    /// Whether the two rectangles share a region of nonzero area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.hspan().intersects(&other.hspan()) && self.vspan().intersects(&other.vspan())
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_spans(
            self.hspan().union(other.hspan()),
            self.vspan().union(other.vspan()),
        )
    }

    /// The overlapping region of the two rectangles, if any.
    ///
    /// Rectangles that only touch along an edge produce a degenerate rectangle.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let p0 = Point::new(self.p0.x.max(other.p0.x), self.p0.y.max(other.p0.y));
        let p1 = Point::new(self.p1.x.min(other.p1.x), self.p1.y.min(other.p1.y));
        if p0.x > p1.x || p0.y > p1.y {
            None
        } else {
            Some(Rect { p0, p1 })
        }
    }

    /// Grows the rectangle by `dist` on every side.
    pub fn expand(&self, dist: Int) -> Rect {
        Rect::from_spans(self.hspan().expand(dist), self.vspan().expand(dist))
    }

    /// Grows the rectangle by `dist` on both sides along `dir`.
    pub fn expand_dir(&self, dir: Dir, dist: Int) -> Rect {
        Rect::from_dir_spans(dir, self.span(dir).expand(dist), self.span(!dir))
    }

    /// Grows only the upper (`pos = true`) or lower side along `dir`.
    pub fn expand_side(&self, dir: Dir, pos: bool, dist: Int) -> Rect {
        let s = self.span(dir);
        let s = if pos {
            Span::new(s.start(), s.stop() + dist)
        } else {
            Span::new(s.start() - dist, s.stop())
        };
        Rect::from_dir_spans(dir, s, self.span(!dir))
    }

    pub fn translated(&self, p: Point) -> Rect {
        Rect {
            p0: self.p0 + p,
            p1: self.p1 + p,
        }
    }

    /// Returns a copy of this rectangle moved so its center is at `center`.
    ///
    /// The lower-left corner is snapped to `grid`.
    pub fn centered_at_gridded(&self, center: Point, grid: Int) -> Rect {
        Rect::from_spans(
            Span::from_center_span_gridded(center.x, self.width(), grid),
            Span::from_center_span_gridded(center.y, self.height(), grid),
        )
    }
}

impl BoundBoxTrait for Rect {
    fn bbox(&self) -> BoundBox {
        BoundBox::new(self.p0, self.p1)
    }
}

impl From<BoundBox> for Rect {
    fn from(b: BoundBox) -> Self {
        b.into_rect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_basics() {
        let r = Rect::new(Point::new(10, 20), Point::new(0, 0));
        assert_eq!(r.p0, Point::zero());
        assert_eq!(r.width(), 10);
        assert_eq!(r.height(), 20);
        assert_eq!(r.area(), 200);
        assert_eq!(r.longer_dir(), Dir::Vert);
        assert_eq!(r.center(), Point::new(5, 10));
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::ll_wh(0, 0, 10, 10);
        let b = Rect::ll_wh(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Some(Rect::ll_wh(5, 5, 5, 5)));
        assert!(a.overlaps(&b));
        let c = Rect::ll_wh(20, 20, 1, 1);
        assert_eq!(a.intersection(&c), None);
        assert_eq!(a.union(&c), Rect::ll_wh(0, 0, 21, 21));
    }

    #[test]
    fn test_rect_expand_side() {
        let r = Rect::ll_wh(0, 0, 10, 10);
        assert_eq!(r.expand_side(Dir::Vert, true, 5), Rect::ll_wh(0, 0, 10, 15));
        assert_eq!(r.expand_side(Dir::Horiz, false, 5), Rect::ll_wh(-5, 0, 15, 10));
        assert_eq!(r.expand(2), Rect::ll_wh(-2, -2, 14, 14));
    }
}
