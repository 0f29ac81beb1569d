//! Relative placement of instances and shapes.

use super::{BoundBox, BoundBoxTrait, Int, Point, Translate};

/// Moves an object so its bounding box sits against another box.
///
/// `space` is the gap left between the two boxes.
pub trait AlignRect: Translate + BoundBoxTrait {
    fn align_left(&mut self, other: BoundBox) {
        let dx = other.p0.x - self.bbox().p0.x;
        self.translate(Point::new(dx, 0));
    }

    fn align_to_the_right_of(&mut self, other: BoundBox, space: Int) {
        let dx = other.p1.x + space - self.bbox().p0.x;
        self.translate(Point::new(dx, 0));
    }

    fn align_above(&mut self, other: BoundBox, space: Int) {
        let dy = other.p1.y + space - self.bbox().p0.y;
        self.translate(Point::new(0, dy));
    }
}

impl<T: Translate + BoundBoxTrait> AlignRect for T {}
