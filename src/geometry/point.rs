use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use super::{Dir, Int};

/// A point in two-dimensional layout space.
#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Point {
    pub x: Int,
    pub y: Int,
}

impl Point {
    #[inline]
    pub const fn new(x: Int, y: Int) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// A point offset by `val` along `dir` from the origin.
    pub fn offset(val: Int, dir: Dir) -> Self {
        match dir {
            Dir::Horiz => Self::new(val, 0),
            Dir::Vert => Self::new(0, val),
        }
    }

    /// Builds a point from its coordinate along `dir` and the coordinate along `!dir`.
    pub fn from_dir_coords(dir: Dir, along: Int, across: Int) -> Self {
        match dir {
            Dir::Horiz => Self::new(along, across),
            Dir::Vert => Self::new(across, along),
        }
    }

    /// The coordinate associated with direction `dir`.
    #[inline]
    pub fn coord(&self, dir: Dir) -> Int {
        match dir {
            Dir::Horiz => self.x,
            Dir::Vert => self.y,
        }
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

impl From<(Int, Int)> for Point {
    fn from((x, y): (Int, Int)) -> Self {
        Self::new(x, y)
    }
}
