use std::sync::Arc;

use crate::blocks::gate::{draw_inv, GateParams};
use crate::error::Result;
use crate::geometry::align::AlignRect;
use crate::geometry::{BoundBoxTrait, Dir, Point, Span};
use crate::layout::netlist::flatten;
use crate::layout::{Cell, CellBuilder, Instance, Pin};
use crate::mos::MosType;
use crate::pdk::PdkLib;
use crate::route::bus::Bus;
use crate::route::{RouteOpts, RoutePoint, Router};

/// Two inverters side by side, with their outputs brought up to a metal2 bus.
fn inv_row(lib: &mut PdkLib, inv: &Arc<Cell>) -> Result<Cell> {
    let name = lib.unique_name("inv_row");
    let mut b = CellBuilder::new(name.clone(), ["a0", "a1", "y0", "y1", "vdd", "vss"]);

    let x0 = Instance::new("x0", Arc::clone(inv)).with_conns(["a0", "y0", "vdd", "vss"]);
    let mut x1 = Instance::new("x1", Arc::clone(inv)).with_conns(["a1", "y1", "vdd", "vss"]);
    x1.align_to_the_right_of(x0.bbox(), 0);
    b.add_instance(x0)?;
    b.add_instance(x1)?;

    let tc = lib.tech().clone();
    let row = b.bbox().into_rect();
    let bus = Bus::builder()
        .tech_layer(&tc, "metal2")?
        .dir(Dir::Horiz)
        .allow_contact(&tc, "via1")?
        .names(["y0", "y1"])
        .align_low(row.top() + tc.space("metal2")?)
        .extent(row.hspan())
        .build()?;
    for rail in bus.draw()? {
        b.add_element(rail)?;
    }

    let mut router = Router::new(arcstr::format!("{name}_route"), lib.pdk.clone());
    for (inst, net) in [("x0", "y0"), ("x1", "y1")] {
        let target = b.instance(inst)?.pin("y")?;
        bus.tap(&mut router, net, &target)?;
    }
    // Supplies are strapped across on metal2, over the outputs.
    let mut supplies = Vec::new();
    for net in ["vdd", "vss"] {
        let p0 = b.instance("x0")?.pin(net)?.rect.center();
        let p1 = b.instance("x1")?.pin(net)?.rect.center();
        let y = p0.y.min(p1.y);
        let wire = router.connect_with(
            &[
                RoutePoint::new(Point::new(p0.x, y), "metal1"),
                RoutePoint::new(Point::new(p0.x, y), "metal2"),
                RoutePoint::new(Point::new(p1.x, y), "metal2"),
                RoutePoint::new(Point::new(p1.x, y), "metal1"),
            ],
            RouteOpts {
                width: None,
                via_dir: Some(Dir::Vert),
            },
        )?;
        let strap = wire.segments[0].clone();
        supplies.push(Pin::new(net, strap.layer, strap.rect));
    }
    b.add_routing(router.finish())?;

    b.expose_pin("x0", "a", "a0")?;
    b.expose_pin("x1", "a", "a1")?;
    b.add_pin(bus.pin("y0")?)?;
    b.add_pin(bus.pin("y1")?)?;
    b.add_pins(supplies)?;
    b.finish()
}

#[test]
fn test_inverter_netlist_matches_direct_bindings() -> Result<()> {
    let mut lib = PdkLib::sample("test_inverter_netlist_matches_direct_bindings");
    let params = GateParams::default();
    let inv = draw_inv(&mut lib, &params)?;

    let mut got = flatten(&inv)
        .into_iter()
        .map(|d| {
            (
                d.path,
                d.mos_type,
                d.width,
                [d.d, d.g, d.s, d.b].map(|n| n.to_string()),
            )
        })
        .collect::<Vec<_>>();
    got.sort_by(|a, b| a.0.cmp(&b.0));

    let nets = |xs: [&str; 4]| xs.map(String::from);
    let expected = vec![
        (
            "mn.M0".to_string(),
            MosType::Nmos,
            params.nwidth,
            nets(["y", "a", "vss", "vss"]),
        ),
        (
            "mp.M0".to_string(),
            MosType::Pmos,
            params.pwidth,
            nets(["y", "a", "vdd", "vdd"]),
        ),
    ];
    assert_eq!(got, expected);
    Ok(())
}

#[test]
fn test_row_netlist() -> Result<()> {
    let mut lib = PdkLib::sample("test_row_netlist");
    let inv = draw_inv(&mut lib, &GateParams::default())?;
    let row = inv_row(&mut lib, &inv)?;

    let devices = flatten(&row);
    assert_eq!(devices.len(), 4);
    let n = devices.iter().find(|d| d.path == "x1.mn.M0").unwrap();
    assert_eq!((n.d.as_str(), n.g.as_str()), ("y1", "a1"));
    let p = devices.iter().find(|d| d.path == "x0.mp.M0").unwrap();
    assert_eq!((p.d.as_str(), p.s.as_str()), ("y0", "vdd"));
    Ok(())
}

#[test]
fn test_row_pins_and_bbox() -> Result<()> {
    let mut lib = PdkLib::sample("test_row_pins_and_bbox");
    let inv = draw_inv(&mut lib, &GateParams::default())?;
    let row = inv_row(&mut lib, &inv)?;

    for port in row.ports() {
        assert!(row.has_pin(port), "missing pin for port {port}");
    }
    let y0: &Pin = row.pin("y0")?;
    assert_eq!(y0.layer, "metal2");
    assert!(y0.rect.bottom() > row.instance("x0")?.bbox().p1.y);

    let bbox = row.bbox_rect();
    for elem in row.flatten_elems() {
        assert!(bbox.contains_rect(&elem.rect), "{elem:?} escapes {bbox:?}");
    }

    // One via per tap and two per supply strap.
    let vias = row
        .insts()
        .iter()
        .filter(|i| i.name.contains("_via"))
        .count();
    assert_eq!(vias, 6);
    for port in row.ports() {
        assert_eq!(row.pins_named(port).count(), 1, "port {port}");
    }
    let vdd = row.pin("vdd")?;
    assert_eq!(vdd.layer, "metal2");
    assert!(vdd.rect.hspan().contains(row.instance("x1")?.pin("vdd")?.rect.center().x));
    Ok(())
}

#[test]
fn test_composition_is_pure() -> Result<()> {
    let mut lib = PdkLib::sample("test_composition_is_pure");
    let inv = draw_inv(&mut lib, &GateParams::default())?;
    let a = inv_row(&mut lib, &inv)?;
    let b = inv_row(&mut lib, &inv)?;

    assert_ne!(a.name(), b.name());
    assert_eq!(a.flatten_elems(), b.flatten_elems());
    assert_eq!(a.pins(), b.pins());
    assert_eq!(a.bbox_rect(), b.bbox_rect());
    assert_eq!(flatten(&a), flatten(&b));
    Ok(())
}

#[test]
fn test_bus_spans_row() -> Result<()> {
    let mut lib = PdkLib::sample("test_bus_spans_row");
    let inv = draw_inv(&mut lib, &GateParams::default())?;
    let row = inv_row(&mut lib, &inv)?;
    let x0 = row.instance("x0")?.bbox().into_rect();
    let x1 = row.instance("x1")?.bbox().into_rect();
    let rail = row.pin("y1")?.rect;
    assert_eq!(rail.hspan(), Span::new(x0.left(), x1.right()));
    Ok(())
}
