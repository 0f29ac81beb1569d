//! Rectangular bounding boxes.

use serde::{Deserialize, Serialize};

use super::{Int, Point, Rect};

/// A rectangular bounding box that may be empty.
///
/// `p0` is always closest to negative infinity in both x and y,
/// and `p1` is always closest to positive infinity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BoundBox {
    pub p0: Point,
    pub p1: Point,
}

impl BoundBox {
    pub(crate) fn new(p0: Point, p1: Point) -> Self {
        Self { p0, p1 }
    }

    /// An empty (otherwise invalid) bounding box.
    pub fn empty() -> Self {
        Self {
            p0: Point::new(Int::MAX, Int::MAX),
            p1: Point::new(Int::MIN, Int::MIN),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.p0.x > self.p1.x || self.p0.y > self.p1.y
    }

    pub fn union(&self, other: &BoundBox) -> BoundBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundBox::new(
            Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        )
    }

    #[inline]
    pub fn width(&self) -> Int {
        self.p1.x - self.p0.x
    }

    #[inline]
    pub fn height(&self) -> Int {
        self.p1.y - self.p0.y
    }

    /// Converts to a [`Rect`]. Empty boxes become a zero-size rectangle at the origin.
    pub fn into_rect(self) -> Rect {
        if self.is_empty() {
            Rect::default()
        } else {
            Rect {
                p0: self.p0,
                p1: self.p1,
            }
        }
    }
}

impl Default for BoundBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Types with a rectangular bounding box.
pub trait BoundBoxTrait {
    fn bbox(&self) -> BoundBox;
}

impl BoundBoxTrait for BoundBox {
    fn bbox(&self) -> BoundBox {
        *self
    }
}

impl<T: BoundBoxTrait> BoundBoxTrait for [T] {
    fn bbox(&self) -> BoundBox {
        self.iter()
            .fold(BoundBox::empty(), |acc, x| acc.union(&x.bbox()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_union() {
        let e = BoundBox::empty();
        assert!(e.is_empty());
        let r = Rect::ll_wh(1, 2, 3, 4).bbox();
        assert_eq!(e.union(&r), r);
        assert_eq!(r.union(&e), r);
        assert_eq!(e.into_rect(), Rect::default());
    }
}
