//! Parametric MOSFET layout.
//!
//! Gates run vertically over a horizontal active region. Source/drain
//! contacts alternate between the gates, starting with a source on the left.
//! All sizes come from the design rules of the session's technology.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use arcstr::ArcStr;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::contact::{max_cuts, ContactParams};
use crate::error::{Error, Result};
use crate::geometry::{
    div_ceil, snap_to_grid, snap_up, BoundBox, BoundBoxTrait, Dir, Int, Point, Rect, Span,
};
use crate::layout::netlist::Mosfet;
use crate::layout::{Cell, CellBuilder, Instance, Pin};
use crate::pdk::PdkLib;

pub const ACTIVE: &str = "active";
pub const POLY: &str = "poly";
pub const CONTACT: &str = "contact";
pub const METAL1: &str = "metal1";
pub const ACTIVE_CONTACT_STACK: &str = "active_contact";

/// MOSFET Types
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MosType {
    /// An n-channel transistor
    #[default]
    Nmos,
    /// A p-channel transistor
    Pmos,
}

impl MosType {
    /// The well the device sits in.
    pub fn well(&self) -> &'static str {
        match *self {
            MosType::Nmos => "pwell",
            MosType::Pmos => "nwell",
        }
    }

    /// The implant that dopes the device's source and drain.
    pub fn implant(&self) -> &'static str {
        match *self {
            MosType::Nmos => "nimplant",
            MosType::Pmos => "pimplant",
        }
    }

    /// The sign of "toward the middle of a cell" for this device type.
    ///
    /// NMOS devices sit at the bottom of a standard cell, so the middle is up.
    #[inline]
    fn inward(&self) -> Int {
        match *self {
            MosType::Nmos => 1,
            MosType::Pmos => -1,
        }
    }
}

impl Display for MosType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            MosType::Nmos => write!(f, "nmos"),
            MosType::Pmos => write!(f, "pmos"),
        }
    }
}

impl FromStr for MosType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "n" | "nmos" => Ok(MosType::Nmos),
            "p" | "pmos" => Ok(MosType::Pmos),
            _ => Err(Error::UnknownDevice(s.to_string())),
        }
    }
}

/// Layout parameters of a single (possibly multi-finger) transistor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_builder::Builder)]
pub struct MosParams {
    pub mos_type: MosType,
    /// The width of a single finger, in database units.
    pub width: Int,
    #[builder(default = "1")]
    pub fingers: usize,
    /// Join all gates with a poly bar and expose a single `G` pin.
    #[builder(default)]
    pub connect_gates: bool,
    /// Join all sources (and all drains) with metal1 rails.
    #[builder(default)]
    pub connect_diffusion: bool,
    /// Cuts per source/drain contact. Defaults to as many as fit.
    #[builder(default)]
    pub contacts_per_finger: Option<usize>,
    #[builder(default = "true")]
    pub enforce_min_area: bool,
    /// Draw a non-functional poly line one pitch beyond each outer gate.
    #[builder(default)]
    pub dummy_poly: bool,
}

impl MosParams {
    pub fn builder() -> MosParamsBuilder {
        MosParamsBuilder::default()
    }

    pub fn name(&self) -> String {
        let mut name = format!("ptx_{}_w{}_f{}", self.mos_type, self.width, self.fingers);
        if self.connect_gates {
            name.push_str("_cg");
        }
        if self.connect_diffusion {
            name.push_str("_cd");
        }
        name
    }
}

/// A source/drain contact of a drawn transistor.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SdContact {
    /// Index from the left, starting at 0.
    pub idx: usize,
    pub is_source: bool,
    /// The cut array.
    pub cuts: Rect,
    /// The metal1 landing.
    pub metal: Rect,
}

/// A drawn transistor and the key dimensions it was drawn with.
#[derive(Debug, Clone)]
pub struct Ptx {
    pub cell: Arc<Cell>,
    pub params: MosParams,
    pub poly_pitch: Int,
    pub end_to_poly: Int,
    pub active: Rect,
    pub gates: Vec<Rect>,
    pub contacts: Vec<SdContact>,
    pub gate_bar: Option<Rect>,
    /// Metal1 rails joining the sources and drains, if any.
    pub source_rail: Option<Rect>,
    pub drain_rail: Option<Rect>,
    pub well: Option<Rect>,
    pub implant: Option<Rect>,
}

impl Ptx {
    pub fn gate_centers(&self) -> Vec<Int> {
        self.gates.iter().map(|g| g.center().x).collect()
    }

    pub fn sources(&self) -> impl Iterator<Item = &SdContact> {
        self.contacts.iter().filter(|c| c.is_source)
    }

    pub fn drains(&self) -> impl Iterator<Item = &SdContact> {
        self.contacts.iter().filter(|c| !c.is_source)
    }
}

/// The rule-derived dimensions shared by every transistor in a technology.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct MosRules {
    grid: Int,
    poly_width: Int,
    poly_space: Int,
    poly_extend_active: Int,
    poly_to_active: Int,
    contact_width: Int,
    contact_to_gate: Int,
    active_enclose_contact: Int,
    minwidth_active: Int,
    minarea_active: Int,
    m1_width: Int,
    m1_space: Int,
}

impl MosRules {
    fn new(lib: &PdkLib) -> Result<Self> {
        let tc = lib.tech();
        Ok(Self {
            grid: tc.grid,
            poly_width: tc.minwidth(POLY)?,
            poly_space: tc.space(POLY)?,
            poly_extend_active: tc.extension(POLY, ACTIVE)?,
            poly_to_active: tc.space_between(POLY, ACTIVE)?,
            contact_width: tc.minwidth(CONTACT)?,
            contact_to_gate: tc.rule("contact_to_gate")?,
            active_enclose_contact: tc.enclosure(ACTIVE, CONTACT)?,
            minwidth_active: tc.minwidth(ACTIVE)?,
            minarea_active: tc.minarea(ACTIVE)?,
            m1_width: tc.minwidth(METAL1)?,
            m1_space: tc.space(METAL1)?,
        })
    }

    /// Contacted gate pitch.
    fn poly_pitch(&self) -> Int {
        std::cmp::max(
            2 * self.contact_to_gate + self.contact_width + self.poly_width,
            self.poly_space,
        )
    }

    /// Distance from the edge of the active region to the nearest gate.
    fn end_to_poly(&self) -> Int {
        self.contact_to_gate + self.contact_width + self.active_enclose_contact
    }

    fn active_width(&self, end_to_poly: Int, fingers: usize) -> Int {
        2 * end_to_poly + self.poly_width + (fingers as Int - 1) * self.poly_pitch()
    }
}

impl PdkLib {
    /// Draws a transistor, reusing an earlier drawing with the same parameters.
    pub fn draw_mos(&mut self, params: &MosParams) -> Result<Ptx> {
        if let Some(ptx) = self.cached_ptx(params) {
            debug!("ptx cache hit: {}", params.name());
            return Ok(ptx.clone());
        }
        debug!("ptx cache miss: {}", params.name());
        let ptx = draw_ptx(self, params)?;
        self.cache_ptx(params.clone(), ptx.clone());
        Ok(ptx)
    }
}

fn draw_ptx(lib: &mut PdkLib, params: &MosParams) -> Result<Ptx> {
    let rules = MosRules::new(lib)?;
    let grid = rules.grid;
    let w = params.width;
    let nf = params.fingers;

    if nf == 0 {
        return Err(Error::InvalidParams("transistor must have at least one finger".into()));
    }
    if w < rules.minwidth_active || w % grid != 0 {
        return Err(Error::InvalidParams(format!(
            "transistor width {w} must be on the {grid} grid and at least {}",
            rules.minwidth_active
        )));
    }

    let tc = lib.tech();
    let ct_stack = tc.stack(ACTIVE_CONTACT_STACK)?;
    let max_rows = max_cuts(tc, ct_stack, w)?;
    let rows = params.contacts_per_finger.unwrap_or(max_rows);
    if rows == 0 || rows > max_rows {
        return Err(Error::InvalidParams(format!(
            "{rows} contact(s) per finger requested, but at most {max_rows} fit in a width of {w}"
        )));
    }

    let pitch = rules.poly_pitch();
    let mut end_to_poly = rules.end_to_poly();
    let active_width = rules.active_width(end_to_poly, nf);
    if params.enforce_min_area && active_width * w < rules.minarea_active {
        let needed = div_ceil(rules.minarea_active, w);
        let grown = div_ceil(needed - rules.poly_width - (nf as Int - 1) * pitch, 2);
        end_to_poly = std::cmp::max(end_to_poly, snap_up(grown, grid));
        debug!(
            "{}: end_to_poly grown to {end_to_poly} to meet minarea_active",
            params.name()
        );
    }

    let mut active = Rect::ll_wh(0, 0, rules.active_width(end_to_poly, nf), w);

    // Gates
    let gate_span = Span::new(-rules.poly_extend_active, w + rules.poly_extend_active);
    let gates = (0..nf)
        .map(|i| {
            let left = end_to_poly + i as Int * pitch;
            Rect::from_spans(Span::new(left, left + rules.poly_width), gate_span)
        })
        .collect::<Vec<_>>();

    // Source/drain contacts
    let ct = lib.pdk.get_contact(
        &ContactParams::builder()
            .stack(ACTIVE_CONTACT_STACK)
            .rows(rows)
            .cols(1)
            .dir(Dir::Vert)
            .build()
            .map_err(|e| Error::InvalidParams(e.to_string()))?,
    )?;
    let cut_h = ct.footprint.cut_bbox.height();
    let cut_bot = snap_to_grid(w / 2 - cut_h / 2, grid);
    let first_contact_x = end_to_poly - rules.contact_to_gate - rules.contact_width;

    let mut contacts = Vec::with_capacity(nf + 1);
    let mut contact_insts = Vec::with_capacity(nf + 1);
    for i in 0..=nf {
        let loc = Point::new(first_contact_x + i as Int * pitch, cut_bot);
        let inst = Instance::new(format!("contact_{i}"), Arc::clone(&ct.cell)).with_loc(loc);
        let metal = ct
            .layer_rect(METAL1, loc)
            .ok_or_else(|| Error::UnknownLayer(METAL1.to_string()))?;
        contacts.push(SdContact {
            idx: i,
            is_source: i % 2 == 0,
            cuts: ct.footprint.cut_bbox.translated(loc),
            metal,
        });
        contact_insts.push(inst);
    }

    // Only reachable when the poly spacing rule, not the contact rules, sets the pitch.
    if let Some(last) = contacts.last() {
        let needed = last.cuts.right() + rules.active_enclose_contact;
        if needed > active.right() {
            active = Rect::new(active.p0, Point::new(needed, active.top()));
        }
    }

    // Fingered gate merge
    let gate_bar = if params.connect_gates && nf >= 2 {
        let poly_height = gate_span.length();
        let dist = std::cmp::max(rules.poly_to_active, poly_height / 2);
        let cy = active.center().y;
        // The bar's inner edge sits `dist` from the active center and never
        // closer than `poly_to_active` to the active region.
        let vspan = match params.mos_type {
            MosType::Nmos => {
                let inner = snap_up(
                    std::cmp::max(cy + dist, active.top() + rules.poly_to_active),
                    grid,
                );
                Span::new(inner, inner + rules.poly_width)
            }
            MosType::Pmos => {
                let inner = -snap_up(
                    -std::cmp::min(cy - dist, active.bottom() - rules.poly_to_active),
                    grid,
                );
                Span::new(inner - rules.poly_width, inner)
            }
        };
        let bar = Rect::from_spans(Span::new(gates[0].left(), gates[nf - 1].right()), vspan);
        Some(bar)
    } else {
        None
    };

    // Stubs from the gate ends to the bar, if it does not reach them.
    let gate_stubs = gate_bar
        .map(|bar| {
            gates
                .iter()
                .filter(|g| !g.overlaps(&bar))
                .map(|g| Rect::from_spans(g.hspan(), g.vspan().union(bar.vspan())))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    // Fingered diffusion merge
    let mut source_rail = None;
    let mut drain_rail = None;
    let mut diff_stubs = Vec::new();
    if params.connect_diffusion {
        let m1_h = ct.footprint.top.height();
        let offset = m1_h / 2 + rules.m1_space + rules.m1_width / 2;
        for is_source in [true, false] {
            let group = contacts
                .iter()
                .filter(|c| c.is_source == is_source)
                .collect::<Vec<_>>();
            if group.len() < 2 {
                continue;
            }
            let sign = if is_source {
                -params.mos_type.inward()
            } else {
                params.mos_type.inward()
            };
            let cy = group[0].metal.center().y + sign * offset;
            let rail = Rect::from_spans(
                Span::new(group[0].metal.left(), group[group.len() - 1].metal.right()),
                Span::from_center_span_gridded(cy, rules.m1_width, grid),
            );
            for c in group.iter() {
                diff_stubs.push(Rect::from_spans(
                    c.metal.hspan(),
                    c.metal.vspan().union(rail.vspan()),
                ));
            }
            if is_source {
                source_rail = Some(rail);
            } else {
                drain_rail = Some(rail);
            }
        }
    }

    // Wells and implants cover the active region and any merge routing.
    let merge_bbox = gate_bar
        .iter()
        .chain(source_rail.iter())
        .chain(drain_rail.iter())
        .fold(BoundBox::empty(), |acc, r| acc.union(&r.bbox()));
    let mut enclosures = Vec::new();
    for layer in [params.mos_type.implant(), params.mos_type.well()] {
        if !tc.has_layer(layer) {
            enclosures.push(None);
            continue;
        }
        let enc = tc.enclosure(layer, ACTIVE)?;
        let minw = tc.minwidth(layer)?;
        let center = active.center();
        let mut r = Rect::from_spans(
            Span::from_center_span_gridded(
                center.x,
                snap_up(std::cmp::max(active.width() + 2 * enc, minw), grid),
                grid,
            ),
            Span::from_center_span_gridded(
                center.y,
                snap_up(std::cmp::max(active.height() + 2 * enc, minw), grid),
                grid,
            ),
        );
        if !merge_bbox.is_empty() {
            r = r.union(&merge_bbox.into_rect());
        }
        enclosures.push(Some(r));
    }
    let (implant, well) = (enclosures[0], enclosures[1]);

    // Emit the cell.
    let name = lib.unique_name(&params.name());
    info!("generating transistor {name}");
    let mut b = CellBuilder::new(name, ["D", "G", "S", "B"]);
    for inst in contact_insts {
        b.add_instance(inst)?;
    }
    b.add_device(Mosfet {
        name: "M0".into(),
        mos_type: params.mos_type,
        width: w,
        length: rules.poly_width,
        fingers: nf,
        d: "D".into(),
        g: "G".into(),
        s: "S".into(),
        b: "B".into(),
    })?;

    b.draw_rect(ACTIVE, active)?;
    for g in gates.iter().chain(gate_stubs.iter()) {
        b.draw_rect(POLY, *g)?;
    }
    if params.dummy_poly {
        for x in [gates[0].left() - pitch, gates[nf - 1].left() + pitch] {
            b.draw_rect(
                POLY,
                Rect::from_spans(Span::new(x, x + rules.poly_width), gate_span),
            )?;
        }
    }
    if let Some(bar) = gate_bar {
        b.draw_rect(POLY, bar)?;
    }
    for r in diff_stubs
        .iter()
        .chain(source_rail.iter())
        .chain(drain_rail.iter())
    {
        b.draw_rect(METAL1, *r)?;
    }
    if let Some(r) = implant {
        b.draw_rect(params.mos_type.implant(), r)?;
    }
    if let Some(r) = well {
        b.draw_rect(params.mos_type.well(), r)?;
    }

    // Pins
    // Unmerged fingers keep one pin shape each; the parent ties them together.
    if gate_bar.is_none() && nf > 1 {
        b.allow_split_pin("G");
    }
    if source_rail.is_none() && contacts.iter().filter(|c| c.is_source).count() > 1 {
        b.allow_split_pin(sd_name(true));
    }
    if drain_rail.is_none() && contacts.iter().filter(|c| !c.is_source).count() > 1 {
        b.allow_split_pin(sd_name(false));
    }
    for g in gates.iter() {
        b.add_pin(Pin::new("G", POLY, *g))?;
    }
    if let Some(bar) = gate_bar {
        b.remove_pins("G")?;
        b.add_pin(Pin::new("G", POLY, bar))?;
    }
    for c in contacts.iter() {
        b.add_pin(Pin::new(sd_name(c.is_source), METAL1, c.metal))?;
    }
    for (is_source, rail) in [(true, source_rail), (false, drain_rail)] {
        if let Some(rail) = rail {
            b.remove_pins(&sd_name(is_source))?;
            b.add_pin(Pin::new(sd_name(is_source), METAL1, rail))?;
        }
    }
    match (well, implant) {
        (Some(r), _) => b.add_pin(Pin::new("B", params.mos_type.well(), r))?,
        (None, Some(r)) => b.add_pin(Pin::new("B", params.mos_type.implant(), r))?,
        (None, None) => {
            return Err(Error::UnknownLayer(format!(
                "{} or {}",
                params.mos_type.well(),
                params.mos_type.implant()
            )))
        }
    }

    let cell = lib.add_cell(b.finish()?);

    Ok(Ptx {
        cell,
        params: params.clone(),
        poly_pitch: pitch,
        end_to_poly,
        active,
        gates,
        contacts,
        gate_bar,
        source_rail,
        drain_rail,
        well,
        implant,
    })
}

#[inline]
fn sd_name(is_source: bool) -> ArcStr {
    if is_source {
        arcstr::literal!("S")
    } else {
        arcstr::literal!("D")
    }
}
