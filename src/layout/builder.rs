//! Phased construction of [`Cell`]s.
//!
//! A cell is assembled in a fixed order: sub-instances and devices are placed,
//! then routing and other shapes are drawn, then pins are declared, and finally
//! the bounding box is computed. Each step may be repeated, but once a later
//! phase has started an earlier one cannot be re-entered.

use std::collections::HashSet;
use std::sync::Arc;

use arcstr::ArcStr;
use log::trace;

use crate::error::{Error, Result};
use crate::geometry::{BoundBox, BoundBoxTrait, Rect};
use crate::route::Routing;

use super::netlist::Mosfet;
use super::{draw_rect, Cell, Element, Instance, Pin};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Phase {
    /// Placing sub-instances and devices.
    Placement,
    /// Drawing shapes and routing.
    Routing,
    /// Declaring pins.
    Pins,
    /// The bounding box has been computed; nothing may be added.
    Finalized,
}

#[derive(Debug)]
pub struct CellBuilder {
    name: ArcStr,
    phase: Phase,
    ports: Vec<ArcStr>,
    elems: Vec<Element>,
    pins: Vec<Pin>,
    insts: Vec<Instance>,
    inst_names: HashSet<ArcStr>,
    devices: Vec<Mosfet>,
    /// Ports left as several disjoint shapes for the parent to tie together.
    split: HashSet<ArcStr>,
}

impl CellBuilder {
    pub fn new<I, S>(name: impl Into<ArcStr>, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ArcStr>,
    {
        Self {
            name: name.into(),
            phase: Phase::Placement,
            ports: ports.into_iter().map(Into::into).collect(),
            elems: Vec::new(),
            pins: Vec::new(),
            insts: Vec::new(),
            inst_names: HashSet::new(),
            devices: Vec::new(),
            split: HashSet::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn ports(&self) -> &[ArcStr] {
        &self.ports
    }

    fn enter(&mut self, next: Phase) -> Result<()> {
        if next < self.phase || self.phase == Phase::Finalized {
            return Err(Error::PhaseViolation {
                cell: self.name.clone(),
                current: self.phase,
                next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Places a sub-instance.
    ///
    /// The instance must bind exactly one net per port of its cell.
    pub fn add_instance(&mut self, inst: Instance) -> Result<()> {
        self.enter(Phase::Placement)?;
        let expected = inst.cell.ports().len();
        if inst.conns.len() != expected {
            return Err(Error::BindingArity {
                inst: inst.name.clone(),
                cell: inst.cell.name().clone(),
                expected,
                found: inst.conns.len(),
            });
        }
        if !self.inst_names.insert(inst.name.clone()) {
            return Err(Error::InvalidParams(format!(
                "duplicate instance name `{}` in cell `{}`",
                inst.name, self.name
            )));
        }
        trace!("{}: placed {} ({})", self.name, inst.name, inst.cell.name());
        self.insts.push(inst);
        Ok(())
    }

    pub fn add_device(&mut self, device: Mosfet) -> Result<()> {
        self.enter(Phase::Placement)?;
        self.devices.push(device);
        Ok(())
    }

    pub fn instance(&self, name: &str) -> Result<&Instance> {
        self.insts
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::MissingInstance(name.into()))
    }

    #[inline]
    pub fn instances(&self) -> &[Instance] {
        &self.insts
    }

    pub fn add_element(&mut self, elem: Element) -> Result<()> {
        self.enter(Phase::Routing)?;
        self.elems.push(elem);
        Ok(())
    }

    pub fn draw_rect(&mut self, layer: impl Into<ArcStr>, rect: Rect) -> Result<()> {
        self.add_element(draw_rect(rect, layer))
    }

    /// Adds the wires, fillers and vias produced by a [`crate::route::Router`].
    pub fn add_routing(&mut self, routing: Routing) -> Result<()> {
        self.enter(Phase::Routing)?;
        self.elems.extend(routing.elems);
        for via in routing.vias {
            if !self.inst_names.insert(via.name.clone()) {
                return Err(Error::InvalidParams(format!(
                    "duplicate instance name `{}` in cell `{}`",
                    via.name, self.name
                )));
            }
            self.insts.push(via);
        }
        Ok(())
    }

    pub fn add_pin(&mut self, pin: Pin) -> Result<()> {
        self.enter(Phase::Pins)?;
        self.pins.push(pin);
        Ok(())
    }

    pub fn add_pins(&mut self, pins: impl IntoIterator<Item = Pin>) -> Result<()> {
        for pin in pins {
            self.add_pin(pin)?;
        }
        Ok(())
    }

    /// Removes every declared pin named `name`, returning how many were removed.
    pub fn remove_pins(&mut self, name: &str) -> Result<usize> {
        self.enter(Phase::Pins)?;
        let before = self.pins.len();
        self.pins.retain(|p| p.name != name);
        Ok(before - self.pins.len())
    }

    /// Lets port `name` keep several unconnected pin shapes, such as the
    /// gates of a transistor whose fingers are not merged.
    pub fn allow_split_pin(&mut self, name: impl Into<ArcStr>) {
        self.split.insert(name.into());
    }

    /// Re-declares all shapes of pin `pin` of instance `inst` as pin `name` of this cell.
    pub fn expose_pin(&mut self, inst: &str, pin: &str, name: impl Into<ArcStr>) -> Result<()> {
        let name = name.into();
        let inst = self.instance(inst)?;
        let pins = inst.pins_named(pin);
        if pins.is_empty() {
            return Err(Error::MissingPin {
                name: pin.into(),
                cell: inst.cell.name().clone(),
            });
        }
        for p in pins {
            self.add_pin(p.with_name(name.clone()))?;
        }
        Ok(())
    }

    /// The pin of instance `inst` named `pin`, in this cell's coordinates.
    pub fn inst_pin(&self, inst: &str, pin: &str) -> Result<Pin> {
        self.instance(inst)?.pin(pin)
    }

    /// Resolves a pin name.
    ///
    /// Pins declared on this cell take precedence. Otherwise exactly one
    /// sub-instance may carry a pin of that name; if several do, the name is
    /// ambiguous and the caller must qualify it with [`CellBuilder::inst_pin`].
    pub fn pin(&self, name: &str) -> Result<Pin> {
        let own = self
            .pins
            .iter()
            .filter(|p| p.name == name)
            .collect::<Vec<_>>();
        match own.len() {
            0 => {}
            1 => return Ok(own[0].clone()),
            _ => {
                return Err(Error::AmbiguousPin {
                    name: name.into(),
                    insts: vec![self.name.to_string()],
                })
            }
        }

        let holders = self
            .insts
            .iter()
            .filter(|i| i.cell.has_pin(name))
            .collect::<Vec<_>>();
        match holders.len() {
            0 => Err(Error::MissingPin {
                name: name.into(),
                cell: self.name.clone(),
            }),
            1 => holders[0].pin(name),
            _ => Err(Error::AmbiguousPin {
                name: name.into(),
                insts: holders.iter().map(|i| i.name.to_string()).collect(),
            }),
        }
    }

    /// The union of all shapes, pins and transformed instance footprints added so far.
    pub fn bbox(&self) -> BoundBox {
        self.elems
            .bbox()
            .union(&self.pins.bbox())
            .union(&self.insts.bbox())
    }

    /// Computes the bounding box and freezes the cell.
    ///
    /// Every declared port must have exactly one pin shape, unless it was
    /// marked with [`CellBuilder::allow_split_pin`].
    pub fn finish(mut self) -> Result<Cell> {
        self.enter(Phase::Finalized)?;
        for port in self.ports.iter() {
            let n = self.pins.iter().filter(|p| &p.name == port).count();
            if n == 0 {
                return Err(Error::MissingPin {
                    name: port.clone(),
                    cell: self.name.clone(),
                });
            }
            if n > 1 && !self.split.contains(port) {
                return Err(Error::AmbiguousPin {
                    name: port.clone(),
                    insts: vec![self.name.to_string()],
                });
            }
        }
        let bbox = self.bbox();
        Ok(Cell {
            name: self.name,
            ports: self.ports,
            elems: self.elems,
            pins: self.pins,
            insts: self.insts,
            devices: self.devices,
            bbox,
        })
    }

    /// Like [`CellBuilder::finish`], but wraps the cell for sharing.
    pub fn finish_arc(self) -> Result<Arc<Cell>> {
        Ok(Arc::new(self.finish()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn leaf(name: &str) -> Arc<Cell> {
        let mut b = CellBuilder::new(name, ["a", "b"]);
        b.draw_rect("metal1", Rect::ll_wh(0, 0, 100, 100)).unwrap();
        b.add_pin(Pin::new("a", "metal1", Rect::ll_wh(0, 0, 20, 20)))
            .unwrap();
        b.add_pin(Pin::new("b", "metal1", Rect::ll_wh(80, 80, 20, 20)))
            .unwrap();
        b.finish_arc().unwrap()
    }

    #[test]
    fn test_binding_arity() {
        let cell = leaf("leaf");
        let mut b = CellBuilder::new("top", Vec::<ArcStr>::new());
        let err = b
            .add_instance(Instance::new("xbad", cell).with_conns(["n1"]))
            .unwrap_err();
        match err {
            Error::BindingArity {
                inst,
                expected,
                found,
                ..
            } => {
                assert_eq!(inst, "xbad");
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_phase_order() {
        let cell = leaf("leaf");
        let mut b = CellBuilder::new("top", ["x"]);
        b.add_instance(Instance::new("x0", cell.clone()).with_conns(["x", "y"]))
            .unwrap();
        b.draw_rect("metal2", Rect::ll_wh(0, 0, 10, 10)).unwrap();
        assert_eq!(b.phase(), Phase::Routing);
        let err = b
            .add_instance(Instance::new("x1", cell).with_conns(["x", "y"]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PhaseViolation {
                current: Phase::Routing,
                next: Phase::Placement,
                ..
            }
        ));
        b.expose_pin("x0", "a", "x").unwrap();
        assert!(b.draw_rect("metal2", Rect::ll_wh(0, 0, 10, 10)).is_err());
        b.finish().unwrap();
    }

    #[test]
    fn test_pin_lookup() {
        let cell = leaf("leaf");
        let mut b = CellBuilder::new("top", ["a"]);
        b.add_instance(Instance::new("x0", cell.clone()).with_conns(["a", "n0"]))
            .unwrap();
        b.add_instance(
            Instance::new("x1", cell)
                .with_loc(Point::new(200, 0))
                .with_conns(["n0", "z"]),
        )
        .unwrap();

        match b.pin("a").unwrap_err() {
            Error::AmbiguousPin { name, insts } => {
                assert_eq!(name, "a");
                assert_eq!(insts, vec!["x0".to_string(), "x1".to_string()]);
            }
            e => panic!("unexpected error: {e}"),
        }
        assert_eq!(
            b.inst_pin("x1", "a").unwrap().rect,
            Rect::ll_wh(200, 0, 20, 20)
        );
        assert!(matches!(b.pin("c"), Err(Error::MissingPin { .. })));

        // A declared pin shadows sub-instance pins.
        b.expose_pin("x1", "a", "a").unwrap();
        assert_eq!(b.pin("a").unwrap().rect, Rect::ll_wh(200, 0, 20, 20));
    }

    #[test]
    fn test_finish_requires_port_pins() {
        let mut b = CellBuilder::new("top", ["a", "b"]);
        b.add_pin(Pin::new("a", "metal1", Rect::ll_wh(0, 0, 10, 10)))
            .unwrap();
        assert!(matches!(b.finish(), Err(Error::MissingPin { name, .. }) if name == "b"));
    }

    #[test]
    fn test_finish_requires_single_port_pin() {
        let build = |split: bool| {
            let mut b = CellBuilder::new("top", ["y"]);
            if split {
                b.allow_split_pin("y");
            }
            b.add_pin(Pin::new("y", "metal1", Rect::ll_wh(0, 0, 10, 10)))
                .unwrap();
            b.add_pin(Pin::new("y", "metal1", Rect::ll_wh(100, 0, 10, 10)))
                .unwrap();
            b.finish()
        };
        assert!(matches!(build(false), Err(Error::AmbiguousPin { name, .. }) if name == "y"));
        assert_eq!(build(true).unwrap().pins_named("y").count(), 2);
    }

    #[test]
    fn test_remove_pins() {
        let mut b = CellBuilder::new("top", ["g"]);
        for i in 0..3 {
            b.add_pin(Pin::new("g", "poly", Rect::ll_wh(100 * i, 0, 50, 50)))
                .unwrap();
        }
        assert_eq!(b.remove_pins("g").unwrap(), 3);
        b.add_pin(Pin::new("g", "poly", Rect::ll_wh(0, 0, 250, 50)))
            .unwrap();
        let cell = b.finish().unwrap();
        assert_eq!(cell.pin("g").unwrap().rect.width(), 250);
    }

    #[test]
    fn test_composition_is_pure() {
        let build = || {
            let cell = leaf("leaf");
            let mut b = CellBuilder::new("top", Vec::<ArcStr>::new());
            b.add_instance(
                Instance::new("x0", cell)
                    .with_loc(Point::new(15, 30))
                    .with_conns(["p", "q"]),
            )
            .unwrap();
            b.finish().unwrap()
        };
        assert_eq!(build(), build());
    }
}
