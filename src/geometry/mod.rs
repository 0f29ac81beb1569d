//! Axis-aligned layout geometry.
//!
//! All coordinates are integers in database units (see [`crate::tech::TechConfig::units`]).
//! Every shape in this crate is an axis-aligned rectangle; wires are Manhattan.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub mod align;
pub mod bbox;
pub mod point;
pub mod rect;
pub mod span;
pub mod transform;

pub use bbox::{BoundBox, BoundBoxTrait};
pub use point::Point;
pub use rect::Rect;
pub use span::Span;
pub use transform::{Mirror, Orient, Rotation, Transform, TransformTrait, Translate};

/// The integer type used for all layout coordinates.
pub type Int = i64;

/// A direction: horizontal or vertical.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Horiz,
    #[default]
    Vert,
}

impl Dir {
    /// Whichever direction we are, return the other one.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Self::Horiz => Self::Vert,
            Self::Vert => Self::Horiz,
        }
    }

    pub fn short_form(&self) -> &'static str {
        match *self {
            Self::Horiz => "h",
            Self::Vert => "v",
        }
    }
}

impl std::ops::Not for Dir {
    type Output = Self;
    fn not(self) -> Self::Output {
        self.other()
    }
}

impl Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Horiz => write!(f, "horizontal"),
            Self::Vert => write!(f, "vertical"),
        }
    }
}

/// Rounds `x` to the nearest multiple of `grid`, ties rounding down.
pub fn snap_to_grid(x: Int, grid: Int) -> Int {
    assert!(grid > 0);
    let lo = x.div_euclid(grid) * grid;
    let hi = lo + grid;
    if x - lo > hi - x {
        hi
    } else {
        lo
    }
}

/// Rounds `x` up to the next multiple of `grid`.
pub fn snap_up(x: Int, grid: Int) -> Int {
    assert!(grid > 0);
    let lo = x.div_euclid(grid) * grid;
    if lo == x {
        x
    } else {
        lo + grid
    }
}

/// Integer division rounding toward positive infinity, for non-negative operands.
#[inline]
pub(crate) fn div_ceil(a: Int, b: Int) -> Int {
    assert!(b > 0);
    (a + b - 1).div_euclid(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid(12, 5), 10);
        assert_eq!(snap_to_grid(13, 5), 15);
        assert_eq!(snap_to_grid(-12, 5), -10);
        assert_eq!(snap_to_grid(-13, 5), -15);
        assert_eq!(snap_to_grid(15, 5), 15);
    }

    #[test]
    fn test_snap_up() {
        assert_eq!(snap_up(11, 5), 15);
        assert_eq!(snap_up(10, 5), 10);
        assert_eq!(snap_up(-4, 5), 0);
        assert_eq!(div_ceil(11, 5), 3);
        assert_eq!(div_ceil(10, 5), 2);
    }
}
