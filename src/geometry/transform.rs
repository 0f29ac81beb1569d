//! Manhattan placement transforms.
//!
//! Instances are placed by rotating, then mirroring, then translating.
//! Only multiples of 90 degrees are supported, so every transform is an exact
//! integer matrix.

use serde::{Deserialize, Serialize};

use super::{Int, Point, Rect};

/// The closed set of elementary orientations, each with a fixed 2x2 matrix.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Orient {
    #[default]
    Identity,
    /// Reflect about the x-axis: `(x, y) -> (x, -y)`.
    MirrorX,
    /// Reflect about the y-axis: `(x, y) -> (-x, y)`.
    MirrorY,
    /// Rotate 90 degrees counter-clockwise.
    R90,
    R180,
    R270,
}

impl Orient {
    /// The row-major matrix of this orientation.
    pub const fn matrix(&self) -> [[Int; 2]; 2] {
        match *self {
            Self::Identity => [[1, 0], [0, 1]],
            Self::MirrorX => [[1, 0], [0, -1]],
            Self::MirrorY => [[-1, 0], [0, 1]],
            Self::R90 => [[0, -1], [1, 0]],
            Self::R180 => [[-1, 0], [0, -1]],
            Self::R270 => [[0, 1], [-1, 0]],
        }
    }
}

/// Instance mirroring.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Mirror {
    #[default]
    None,
    /// Reflect about the x-axis.
    X,
    /// Reflect about the y-axis.
    Y,
}

impl From<Mirror> for Orient {
    fn from(m: Mirror) -> Self {
        match m {
            Mirror::None => Orient::Identity,
            Mirror::X => Orient::MirrorX,
            Mirror::Y => Orient::MirrorY,
        }
    }
}

/// Counter-clockwise instance rotation.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl From<Rotation> for Orient {
    fn from(r: Rotation) -> Self {
        match r {
            Rotation::R0 => Orient::Identity,
            Rotation::R90 => Orient::R90,
            Rotation::R180 => Orient::R180,
            Rotation::R270 => Orient::R270,
        }
    }
}

/// An integer affine transform `p -> a * p + b`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Transform {
    pub a: [[Int; 2]; 2],
    pub b: Point,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn identity() -> Self {
        Self {
            a: [[1, 0], [0, 1]],
            b: Point::zero(),
        }
    }

    pub fn translate(p: Point) -> Self {
        Self {
            a: Orient::Identity.matrix(),
            b: p,
        }
    }

    pub fn orient(o: impl Into<Orient>) -> Self {
        Self {
            a: o.into().matrix(),
            b: Point::zero(),
        }
    }

    /// The placement transform of an instance: rotate, then mirror, then translate.
    pub fn from_instance(loc: Point, mirror: Mirror, rotation: Rotation) -> Self {
        Self {
            a: matmul(&Orient::from(mirror).matrix(), &Orient::from(rotation).matrix()),
            b: loc,
        }
    }

    /// The cascade of `parent` and `child`: `child` is applied first.
    ///
    /// Not commutative.
    pub fn cascade(parent: &Transform, child: &Transform) -> Transform {
        let b = matvec(&parent.a, child.b) + parent.b;
        let a = matmul(&parent.a, &child.a);
        Self { a, b }
    }

    pub fn apply(&self, p: Point) -> Point {
        matvec(&self.a, p) + self.b
    }
}

fn matmul(a: &[[Int; 2]; 2], b: &[[Int; 2]; 2]) -> [[Int; 2]; 2] {
    [
        [
            a[0][0] * b[0][0] + a[0][1] * b[1][0],
            a[0][0] * b[0][1] + a[0][1] * b[1][1],
        ],
        [
            a[1][0] * b[0][0] + a[1][1] * b[1][0],
            a[1][0] * b[0][1] + a[1][1] * b[1][1],
        ],
    ]
}

fn matvec(a: &[[Int; 2]; 2], p: Point) -> Point {
    Point::new(a[0][0] * p.x + a[0][1] * p.y, a[1][0] * p.x + a[1][1] * p.y)
}

pub trait TransformTrait {
    /// Creates a copy of this object with `trans` applied.
    fn transform(&self, trans: &Transform) -> Self;
}

impl TransformTrait for Point {
    fn transform(&self, trans: &Transform) -> Self {
        trans.apply(*self)
    }
}

impl TransformTrait for Rect {
    fn transform(&self, trans: &Transform) -> Self {
        Rect::new(trans.apply(self.p0), trans.apply(self.p1))
    }
}

/// Objects that can be shifted in place.
pub trait Translate {
    fn translate(&mut self, p: Point);
}

impl Translate for Rect {
    fn translate(&mut self, p: Point) {
        *self = self.translated(p);
    }
}
