use std::sync::Arc;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{
    BoundBox, BoundBoxTrait, Mirror, Point, Rect, Rotation, Transform, TransformTrait, Translate,
};

use super::netlist::Mosfet;
use super::{Element, Purpose};

/// A named rectangle through which a net can be reached.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Pin {
    pub name: ArcStr,
    pub layer: ArcStr,
    pub rect: Rect,
}

impl Pin {
    pub fn new(name: impl Into<ArcStr>, layer: impl Into<ArcStr>, rect: Rect) -> Self {
        Self {
            name: name.into(),
            layer: layer.into(),
            rect,
        }
    }

    pub fn transform(&self, trans: &Transform) -> Self {
        Self {
            name: self.name.clone(),
            layer: self.layer.clone(),
            rect: self.rect.transform(trans),
        }
    }

    pub fn with_name(mut self, name: impl Into<ArcStr>) -> Self {
        self.name = name.into();
        self
    }

    pub fn into_element(self) -> Element {
        Element {
            layer: self.layer,
            purpose: Purpose::Pin,
            rect: self.rect,
        }
    }
}

impl BoundBoxTrait for Pin {
    fn bbox(&self) -> BoundBox {
        self.rect.bbox()
    }
}

/// A finalized layout cell.
///
/// Cells are immutable once built; they are shared between parents through [`Arc`].
/// Use [`super::CellBuilder`] to make one.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Cell {
    pub(crate) name: ArcStr,
    pub(crate) ports: Vec<ArcStr>,
    pub(crate) elems: Vec<Element>,
    pub(crate) pins: Vec<Pin>,
    pub(crate) insts: Vec<Instance>,
    pub(crate) devices: Vec<Mosfet>,
    pub(crate) bbox: BoundBox,
}

impl Cell {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The ordered port list. Instances bind nets to these positionally.
    #[inline]
    pub fn ports(&self) -> &[ArcStr] {
        &self.ports
    }

    #[inline]
    pub fn elems(&self) -> &[Element] {
        &self.elems
    }

    /// The pin table: every pin shape declared by this cell.
    #[inline]
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    #[inline]
    pub fn insts(&self) -> &[Instance] {
        &self.insts
    }

    #[inline]
    pub fn devices(&self) -> &[Mosfet] {
        &self.devices
    }

    #[inline]
    pub fn bbox_rect(&self) -> Rect {
        self.bbox.into_rect()
    }

    pub fn has_pin(&self, name: &str) -> bool {
        self.pins.iter().any(|p| p.name == name)
    }

    pub fn pins_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Pin> + 'a {
        self.pins.iter().filter(move |p| p.name == name)
    }

    /// The single pin shape named `name`.
    pub fn pin(&self, name: &str) -> Result<&Pin> {
        let mut iter = self.pins.iter().filter(|p| p.name == name);
        let first = iter.next().ok_or_else(|| Error::MissingPin {
            name: name.into(),
            cell: self.name.clone(),
        })?;
        if iter.next().is_some() {
            return Err(Error::AmbiguousPin {
                name: name.into(),
                insts: vec![self.name.to_string()],
            });
        }
        Ok(first)
    }

    pub fn instance(&self, name: &str) -> Result<&Instance> {
        self.insts
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::MissingInstance(name.into()))
    }

    /// Every drawn shape in this cell and its sub-cells, in this cell's coordinates.
    ///
    /// Pin shapes are included with [`Purpose::Pin`].
    pub fn flatten_elems(&self) -> Vec<Element> {
        let mut out = Vec::new();
        self.flatten_elems_inner(&Transform::identity(), &mut out);
        out
    }

    fn flatten_elems_inner(&self, trans: &Transform, out: &mut Vec<Element>) {
        out.extend(self.elems.iter().map(|e| e.transform(trans)));
        out.extend(
            self.pins
                .iter()
                .map(|p| p.transform(trans).into_element()),
        );
        for inst in self.insts.iter() {
            let t = Transform::cascade(trans, &inst.transform());
            inst.cell.flatten_elems_inner(&t, out);
        }
    }
}

impl BoundBoxTrait for Cell {
    fn bbox(&self) -> BoundBox {
        self.bbox
    }
}

/// A placed reference to another cell.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Instance {
    pub name: ArcStr,
    pub cell: Arc<Cell>,
    pub loc: Point,
    pub mirror: Mirror,
    pub rotation: Rotation,
    /// Nets bound to the cell's ports, in port order.
    pub conns: Vec<ArcStr>,
}

impl Instance {
    pub fn new(name: impl Into<ArcStr>, cell: Arc<Cell>) -> Self {
        Self {
            name: name.into(),
            cell,
            loc: Point::zero(),
            mirror: Mirror::None,
            rotation: Rotation::R0,
            conns: Vec::new(),
        }
    }

    pub fn with_loc(mut self, loc: Point) -> Self {
        self.loc = loc;
        self
    }

    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_conns<I, S>(mut self, conns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ArcStr>,
    {
        self.conns = conns.into_iter().map(Into::into).collect();
        self
    }

    #[inline]
    pub fn transform(&self) -> Transform {
        Transform::from_instance(self.loc, self.mirror, self.rotation)
    }

    /// Mirrors the instance without moving its bounding box.
    pub fn mirror_anchored(&mut self, mirror: Mirror) -> &mut Self {
        let before = self.bbox();
        self.mirror = mirror;
        let after = self.bbox();
        self.translate(before.p0 - after.p0);
        self
    }

    /// All pin shapes named `name`, in the parent's coordinates.
    pub fn pins_named(&self, name: &str) -> Vec<Pin> {
        let t = self.transform();
        self.cell.pins_named(name).map(|p| p.transform(&t)).collect()
    }

    /// The single pin shape named `name`, in the parent's coordinates.
    pub fn pin(&self, name: &str) -> Result<Pin> {
        let mut pins = self.pins_named(name);
        match pins.len() {
            0 => Err(Error::MissingPin {
                name: name.into(),
                cell: self.cell.name.clone(),
            }),
            1 => Ok(pins.remove(0)),
            _ => Err(Error::AmbiguousPin {
                name: name.into(),
                insts: vec![self.name.to_string()],
            }),
        }
    }

    /// Every pin of the referenced cell, in the parent's coordinates.
    pub fn pins(&self) -> Vec<Pin> {
        let t = self.transform();
        self.cell.pins.iter().map(|p| p.transform(&t)).collect()
    }

    /// The net bound to `port`, if the cell declares that port.
    pub fn net(&self, port: &str) -> Option<&ArcStr> {
        let idx = self.cell.ports.iter().position(|p| p == port)?;
        self.conns.get(idx)
    }
}

impl BoundBoxTrait for Instance {
    fn bbox(&self) -> BoundBox {
        if self.cell.bbox.is_empty() {
            return BoundBox::empty();
        }
        self.cell
            .bbox_rect()
            .transform(&self.transform())
            .bbox()
    }
}

impl Translate for Instance {
    fn translate(&mut self, p: Point) {
        self.loc = self.loc + p;
    }
}
