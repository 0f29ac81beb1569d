use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::align::AlignRect;
use crate::geometry::{BoundBoxTrait, Dir, Int, Point};
use crate::layout::{Cell, CellBuilder, Instance, Pin};
use crate::mos::{MosParams, MosType, METAL1, POLY};
use crate::pdk::PdkLib;
use crate::route::{RouteOpts, RoutePoint, Router, Wire};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct GateParams {
    /// Width of each NMOS device.
    pub nwidth: Int,
    /// Width of each PMOS device.
    pub pwidth: Int,
}

impl Default for GateParams {
    fn default() -> Self {
        Self {
            nwidth: 600,
            pwidth: 900,
        }
    }
}

fn mos(mos_type: MosType, width: Int) -> Result<MosParams> {
    MosParams::builder()
        .mos_type(mos_type)
        .width(width)
        .build()
        .map_err(|e| Error::InvalidParams(e.to_string()))
}

fn pitch(lib: &PdkLib, layer: &str) -> Result<Int> {
    let tc = lib.tech();
    Ok(tc.minwidth(layer)? + tc.space(layer)?)
}

/// A pin on the longest segment of a wire running in direction `dir`.
fn wire_pin(name: &str, wire: &Wire, dir: Dir) -> Result<Pin> {
    wire.segments
        .iter()
        .filter(|s| s.rect.length(dir) > s.rect.length(!dir))
        .max_by_key(|s| s.rect.length(dir))
        .map(|s| Pin::new(name, s.layer.clone(), s.rect))
        .ok_or_else(|| Error::InvalidParams(format!("no wire to place pin `{name}` on")))
}

pub fn draw_inv(lib: &mut PdkLib, params: &GateParams) -> Result<Arc<Cell>> {
    let nmos = lib.draw_mos(&mos(MosType::Nmos, params.nwidth)?)?;
    let pmos = lib.draw_mos(&mos(MosType::Pmos, params.pwidth)?)?;

    let name = lib.unique_name("inv");
    log::info!("generating inverter {name}");
    let mut b = CellBuilder::new(name.clone(), ["a", "y", "vdd", "vss"]);

    let mn = Instance::new("mn", Arc::clone(&nmos.cell)).with_conns(["y", "a", "vss", "vss"]);
    let mut mp = Instance::new("mp", Arc::clone(&pmos.cell)).with_conns(["y", "a", "vdd", "vdd"]);
    mp.align_above(mn.bbox(), 0);
    mp.align_left(mn.bbox());
    b.add_instance(mn)?;
    b.add_instance(mp)?;

    let mut router = Router::new(arcstr::format!("{name}_route"), lib.pdk.clone());
    router.route_pins(
        &b.inst_pin("mn", "G")?,
        &b.inst_pin("mp", "G")?,
        Dir::Vert,
        pitch(lib, POLY)?,
    )?;
    let out = router.route_pins(
        &b.inst_pin("mn", "D")?,
        &b.inst_pin("mp", "D")?,
        Dir::Vert,
        pitch(lib, METAL1)?,
    )?;
    b.add_routing(router.finish())?;

    b.expose_pin("mn", "G", "a")?;
    b.add_pin(wire_pin("y", &out, Dir::Vert)?)?;
    b.expose_pin("mp", "S", "vdd")?;
    b.expose_pin("mn", "S", "vss")?;

    Ok(lib.add_cell(b.finish()?))
}

/// A two-input NAND gate.
///
/// The NMOS devices are in series: `mn_b` on the left pulls the internal node
/// `x` low, and `mn_a` on the right connects `x` to the output. The PMOS
/// devices sit above them in parallel, with their sources joined over the top
/// of the cell.
pub fn draw_nand2(lib: &mut PdkLib, params: &GateParams) -> Result<Arc<Cell>> {
    let nmos = lib.draw_mos(&mos(MosType::Nmos, params.nwidth)?)?;
    let pmos = lib.draw_mos(&mos(MosType::Pmos, params.pwidth)?)?;

    let name = lib.unique_name("nand2");
    log::info!("generating nand2 {name}");
    let mut b = CellBuilder::new(name.clone(), ["a", "b", "y", "vdd", "vss"]);

    let mn_b = Instance::new("mn_b", Arc::clone(&nmos.cell)).with_conns(["x", "b", "vss", "vss"]);
    let mut mn_a =
        Instance::new("mn_a", Arc::clone(&nmos.cell)).with_conns(["y", "a", "x", "vss"]);
    mn_a.align_to_the_right_of(mn_b.bbox(), 0);

    let mut mp_b =
        Instance::new("mp_b", Arc::clone(&pmos.cell)).with_conns(["y", "b", "vdd", "vdd"]);
    mp_b.align_above(mn_b.bbox().union(&mn_a.bbox()), 0);
    mp_b.align_left(mn_b.bbox());
    let mut mp_a =
        Instance::new("mp_a", Arc::clone(&pmos.cell)).with_conns(["y", "a", "vdd", "vdd"]);
    mp_a.align_above(mn_b.bbox().union(&mn_a.bbox()), 0);
    mp_a.align_left(mn_a.bbox());

    for inst in [mn_b, mn_a, mp_b, mp_a] {
        b.add_instance(inst)?;
    }

    let poly_pitch = pitch(lib, POLY)?;
    let m1_pitch = pitch(lib, METAL1)?;
    let mut router = Router::new(arcstr::format!("{name}_route"), lib.pdk.clone());

    for (n, p) in [("mn_a", "mp_a"), ("mn_b", "mp_b")] {
        router.route_pins(&b.inst_pin(n, "G")?, &b.inst_pin(p, "G")?, Dir::Vert, poly_pitch)?;
    }

    // Internal series node.
    router.route_pins(
        &b.inst_pin("mn_b", "D")?,
        &b.inst_pin("mn_a", "S")?,
        Dir::Horiz,
        m1_pitch,
    )?;

    // Output. The two PMOS drains are joined on metal2 to hop over the
    // source of `mp_a`.
    router.route_pins(
        &b.inst_pin("mn_a", "D")?,
        &b.inst_pin("mp_a", "D")?,
        Dir::Vert,
        m1_pitch,
    )?;
    let pd_b = b.inst_pin("mp_b", "D")?.rect.center();
    let pd_a = b.inst_pin("mp_a", "D")?.rect.center();
    let hop_y = pd_b.y.min(pd_a.y);
    // Vertical vias keep any metal1 filler on the drain contacts.
    router.connect_with(
        &[
            RoutePoint::new(Point::new(pd_b.x, hop_y), METAL1),
            RoutePoint::new(Point::new(pd_b.x, hop_y), "metal2"),
            RoutePoint::new(Point::new(pd_a.x, hop_y), "metal2"),
            RoutePoint::new(Point::new(pd_a.x, hop_y), METAL1),
        ],
        RouteOpts {
            width: None,
            via_dir: Some(Dir::Vert),
        },
    )?;

    // Supply. The strap clears the drain contacts by one metal1 space.
    let ps_b = b.inst_pin("mp_b", "S")?.rect.center();
    let ps_a = b.inst_pin("mp_a", "S")?.rect.center();
    let drain_top = std::cmp::max(
        b.inst_pin("mp_b", "D")?.rect.top(),
        b.inst_pin("mp_a", "D")?.rect.top(),
    );
    let tc = lib.tech();
    let strap_y = tc.snap_up(drain_top + tc.space(METAL1)? + tc.minwidth(METAL1)?);
    let vdd = router.connect(&[
        RoutePoint::new(ps_b, METAL1),
        RoutePoint::new(Point::new(ps_b.x, strap_y), METAL1),
        RoutePoint::new(Point::new(ps_a.x, strap_y), METAL1),
        RoutePoint::new(ps_a, METAL1),
    ])?;
    b.add_routing(router.finish())?;

    b.expose_pin("mn_a", "G", "a")?;
    b.expose_pin("mn_b", "G", "b")?;
    b.expose_pin("mn_a", "D", "y")?;
    b.add_pin(wire_pin("vdd", &vdd, Dir::Horiz)?)?;
    b.expose_pin("mn_b", "S", "vss")?;

    Ok(lib.add_cell(b.finish()?))
}
