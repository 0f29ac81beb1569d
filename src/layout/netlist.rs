//! Transistor-level netlists and hierarchical flattening.

use std::collections::HashMap;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::geometry::Int;
use crate::mos::MosType;

use super::Cell;

/// A four-terminal MOSFET inside a cell.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Mosfet {
    pub name: ArcStr,
    pub mos_type: MosType,
    /// Width of one finger.
    pub width: Int,
    pub length: Int,
    pub fingers: usize,
    pub d: ArcStr,
    pub g: ArcStr,
    pub s: ArcStr,
    pub b: ArcStr,
}

/// A device in a flattened netlist.
///
/// `path` is the dot-separated chain of instance names leading to the
/// device, ending with the device's own name.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FlatDevice {
    pub path: String,
    pub mos_type: MosType,
    pub width: Int,
    pub length: Int,
    pub fingers: usize,
    pub d: ArcStr,
    pub g: ArcStr,
    pub s: ArcStr,
    pub b: ArcStr,
}

/// Flattens the netlist of `cell` down to its devices.
///
/// Ports of `cell` keep their names. Nets internal to a sub-instance are
/// prefixed with that instance's path, so two instances of one cell never
/// short their internal nodes.
pub fn flatten(cell: &Cell) -> Vec<FlatDevice> {
    let nets = cell
        .ports()
        .iter()
        .map(|p| (p.clone(), p.clone()))
        .collect::<HashMap<_, _>>();
    let mut out = Vec::new();
    flatten_inner(cell, "", &nets, &mut out);
    out
}

fn flatten_inner(
    cell: &Cell,
    prefix: &str,
    nets: &HashMap<ArcStr, ArcStr>,
    out: &mut Vec<FlatDevice>,
) {
    let resolve = |net: &ArcStr| -> ArcStr {
        match nets.get(net) {
            Some(n) => n.clone(),
            None => arcstr::format!("{prefix}{net}"),
        }
    };

    for dev in cell.devices() {
        out.push(FlatDevice {
            path: format!("{prefix}{}", dev.name),
            mos_type: dev.mos_type,
            width: dev.width,
            length: dev.length,
            fingers: dev.fingers,
            d: resolve(&dev.d),
            g: resolve(&dev.g),
            s: resolve(&dev.s),
            b: resolve(&dev.b),
        });
    }

    for inst in cell.insts() {
        if inst.cell.devices().is_empty() && inst.cell.insts().is_empty() {
            continue;
        }
        let child_nets = inst
            .cell
            .ports()
            .iter()
            .cloned()
            .zip(inst.conns.iter().map(resolve))
            .collect::<HashMap<_, _>>();
        let child_prefix = format!("{prefix}{}.", inst.name);
        flatten_inner(&inst.cell, &child_prefix, &child_nets, out);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::geometry::Rect;
    use crate::layout::{CellBuilder, Instance, Pin};

    fn pair() -> Arc<Cell> {
        let mut b = CellBuilder::new("pair", ["a", "z"]);
        for (name, d, s) in [("M0", "mid", "a"), ("M1", "z", "mid")] {
            b.add_device(Mosfet {
                name: name.into(),
                mos_type: MosType::Nmos,
                width: 400,
                length: 50,
                fingers: 1,
                d: d.into(),
                g: "a".into(),
                s: s.into(),
                b: "a".into(),
            })
            .unwrap();
        }
        b.add_pin(Pin::new("a", "metal1", Rect::ll_wh(0, 0, 10, 10)))
            .unwrap();
        b.add_pin(Pin::new("z", "metal1", Rect::ll_wh(20, 0, 10, 10)))
            .unwrap();
        b.finish_arc().unwrap()
    }

    #[test]
    fn test_flatten_prefixes_internal_nets() {
        let pair = pair();
        let mut b = CellBuilder::new("chain", ["in", "out"]);
        b.add_instance(Instance::new("x0", pair.clone()).with_conns(["in", "n1"]))
            .unwrap();
        b.add_instance(Instance::new("x1", pair).with_conns(["n1", "out"]))
            .unwrap();
        b.add_pin(Pin::new("in", "metal1", Rect::ll_wh(0, 0, 10, 10)))
            .unwrap();
        b.add_pin(Pin::new("out", "metal1", Rect::ll_wh(20, 0, 10, 10)))
            .unwrap();
        let chain = b.finish().unwrap();

        let flat = flatten(&chain);
        assert_eq!(flat.len(), 4);
        assert_eq!(flat[0].path, "x0.M0");
        assert_eq!(flat[0].d, "x0.mid");
        assert_eq!(flat[0].s, "in");
        assert_eq!(flat[1].d, "n1");
        assert_eq!(flat[2].path, "x1.M0");
        assert_eq!(flat[2].d, "x1.mid");
        assert_eq!(flat[2].g, "n1");
        assert_eq!(flat[3].d, "out");
    }
}
