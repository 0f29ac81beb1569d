//! Manhattan wiring between pins, with automatic via stacks.
//!
//! A route is a list of points, each on a layer. Consecutive points on the
//! same layer are joined by a straight wire. When the layer changes, the wire
//! up to the second point stays on the first point's layer and a via stack is
//! dropped at the second point.

use arcstr::ArcStr;
use itertools::Itertools;
use log::{debug, trace};

use crate::contact::ContactParams;
use crate::error::{Error, Result};
use crate::geometry::{div_ceil, snap_to_grid, Dir, Int, Point, Rect, Span};
use crate::layout::{draw_rect, Element, Instance, Pin};
use crate::pdk::Pdk;

pub mod bus;
pub mod grid;

/// A point on a layer.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RoutePoint {
    pub point: Point,
    pub layer: ArcStr,
}

impl RoutePoint {
    pub fn new(point: Point, layer: impl Into<ArcStr>) -> Self {
        Self {
            point,
            layer: layer.into(),
        }
    }
}

/// Geometry accumulated by a [`Router`], ready to be added to a cell.
#[derive(Debug, Default, Clone)]
pub struct Routing {
    pub elems: Vec<Element>,
    pub vias: Vec<Instance>,
}

/// A via inserted by the router.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ViaSite {
    pub inst: ArcStr,
    pub stack: String,
    pub center: Point,
}

/// The geometry emitted by one call to [`Router::connect`].
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Wire {
    pub segments: Vec<Element>,
    pub vias: Vec<ViaSite>,
    pub fillers: Vec<Element>,
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct RouteOpts {
    /// Wire width. Defaults to the minimum width of each segment's layer.
    pub width: Option<Int>,
    /// Relaxed direction of inserted vias. Defaults to the direction of the
    /// wire entering the via, or leaving it if none enters.
    pub via_dir: Option<Dir>,
}

pub struct Router {
    name: ArcStr,
    pdk: Pdk,
    routing: Routing,
    ctr: usize,
}

struct Landing {
    layer: ArcStr,
    rect: Rect,
    dir: Dir,
}

impl Router {
    pub fn new(name: impl Into<ArcStr>, pdk: Pdk) -> Self {
        Self {
            name: name.into(),
            pdk,
            routing: Routing::default(),
            ctr: 0,
        }
    }

    #[inline]
    pub fn pdk(&self) -> &Pdk {
        &self.pdk
    }

    #[inline]
    pub fn finish(self) -> Routing {
        self.routing
    }

    #[inline]
    pub fn connect(&mut self, points: &[RoutePoint]) -> Result<Wire> {
        self.connect_with(points, RouteOpts::default())
    }

    pub fn connect_with(&mut self, points: &[RoutePoint], opts: RouteOpts) -> Result<Wire> {
        let pts = points.iter().dedup().collect::<Vec<_>>();
        if pts.len() < 2 {
            return Err(Error::InvalidParams(format!(
                "route `{}` needs at least two distinct points",
                self.name
            )));
        }

        let tc = self.pdk.config();
        for p in pts.iter() {
            tc.layer(&p.layer)?;
        }
        for (a, b) in pts.iter().map(|p| p.point).tuple_windows() {
            if a.x != b.x && a.y != b.y {
                return Err(Error::NonManhattan(a, b));
            }
        }

        let seg_dir = |a: Point, b: Point| -> Option<Dir> {
            if a == b {
                None
            } else if a.y == b.y {
                Some(Dir::Horiz)
            } else {
                Some(Dir::Vert)
            }
        };

        let mut wire = Wire::default();
        let mut landings = Vec::new();

        for i in 0..pts.len() - 1 {
            let (p, q) = (pts[i], pts[i + 1]);
            let dir = seg_dir(p.point, q.point);
            if let Some(dir) = dir {
                let rect = self.segment(p.point, q.point, dir, &p.layer, opts.width)?;
                trace!(
                    "{}: {} segment on {} {:?}",
                    self.name,
                    dir,
                    p.layer,
                    rect
                );
                wire.segments.push(draw_rect(rect, p.layer.clone()));
            }
            if p.layer != q.layer {
                let via_dir = opts
                    .via_dir
                    .or(dir)
                    .or_else(|| pts.get(i + 2).and_then(|r| seg_dir(q.point, r.point)))
                    .unwrap_or(Dir::Vert);
                self.via_stack(q.point, &p.layer, &q.layer, via_dir, &mut wire, &mut landings)?;
            }
        }

        for l in landings {
            // The landing merges with every same-layer segment touching it.
            let merged = wire
                .segments
                .iter()
                .filter(|s| s.layer == l.layer && touches(&s.rect, &l.rect))
                .fold(l.rect, |acc, s| acc.union(&s.rect));
            if merged.area() >= self.pdk.config().minarea(&l.layer)? {
                continue;
            }
            if let Some(fill) = self.min_area_fill(&l)? {
                wire.fillers.push(fill);
            }
        }

        self.routing.elems.extend(wire.segments.iter().cloned());
        self.routing.elems.extend(wire.fillers.iter().cloned());
        Ok(wire)
    }

    /// Drops a via stack from `from` to `to` centered on `at`.
    ///
    /// Every landing that violates its layer's minimum area is filled out,
    /// since no wire is known to touch it.
    pub fn via(&mut self, at: Point, from: &str, to: &str, dir: Dir) -> Result<Wire> {
        if from == to {
            return Err(Error::InvalidParams(format!(
                "via `{}` needs two different layers, got {from} twice",
                self.name
            )));
        }
        let mut wire = Wire::default();
        let mut landings = Vec::new();
        self.via_stack(at, from, to, dir, &mut wire, &mut landings)?;
        for l in landings {
            if let Some(fill) = self.min_area_fill(&l)? {
                wire.fillers.push(fill);
            }
        }
        self.routing.elems.extend(wire.fillers.iter().cloned());
        Ok(wire)
    }

    /// Connects two pins with at most one jog across `dir`.
    ///
    /// The wire leaves `src` and arrives at `dst` along `dir`. If the pins are
    /// offset across `dir` by less than `pitch`, the jog runs at the midpoint
    /// of their centers. Otherwise it runs at the center of the pin that is
    /// narrower across `dir` (`src` on a tie), so that the jog stays within
    /// that pin's extent.
    pub fn route_pins(&mut self, src: &Pin, dst: &Pin, dir: Dir, pitch: Int) -> Result<Wire> {
        let grid = self.pdk.grid();
        let points = jog_points(src, dst, dir, pitch, grid);
        self.connect(&points)
    }

    fn segment(
        &self,
        a: Point,
        b: Point,
        dir: Dir,
        layer: &str,
        width: Option<Int>,
    ) -> Result<Rect> {
        let tc = self.pdk.config();
        let grid = tc.grid;
        let width = match width {
            Some(w) => w,
            None => tc.minwidth(layer)?,
        };
        let width = tc.snap_up(width);
        let ext = tc.snap_up(div_ceil(width, 2));
        let along = Span::new(a.coord(dir), b.coord(dir)).expand(ext);
        let across = Span::from_center_span_gridded(a.coord(!dir), width, grid);
        Ok(Rect::from_dir_spans(dir, along, across))
    }

    fn via_stack(
        &mut self,
        at: Point,
        from: &str,
        to: &str,
        dir: Dir,
        wire: &mut Wire,
        landings: &mut Vec<Landing>,
    ) -> Result<()> {
        let grid = self.pdk.grid();
        let path = self
            .pdk
            .config()
            .stack_path(from, to)?
            .into_iter()
            .map(|(name, _)| name.to_string())
            .collect::<Vec<_>>();
        for stack in path {
            let ct = self.pdk.get_contact(&ContactParams::single(&stack, dir))?;
            self.ctr += 1;
            let name = arcstr::format!("{}_via{}", self.name, self.ctr);
            let inst = ct.place_centered(name.clone(), at, grid);
            debug!("{}: {} at ({}, {})", self.name, stack, at.x, at.y);
            for layer in [ct.stack.bot(), ct.stack.top()] {
                if let Some(rect) = ct.layer_rect(layer, inst.loc) {
                    landings.push(Landing {
                        layer: layer.into(),
                        rect,
                        dir,
                    });
                }
            }
            wire.vias.push(ViaSite {
                inst: name,
                stack,
                center: ct.footprint.cut_bbox.translated(inst.loc).center(),
            });
            self.routing.vias.push(inst);
        }
        Ok(())
    }

    /// A rectangle that extends a via landing along its relaxed direction
    /// far enough to meet the layer's minimum area, if the landing is too small.
    fn min_area_fill(&self, l: &Landing) -> Result<Option<Element>> {
        let tc = self.pdk.config();
        let minarea = tc.minarea(&l.layer)?;
        if l.rect.area() >= minarea {
            return Ok(None);
        }
        let across = l.rect.length(!l.dir);
        let len = tc.snap_up(div_ceil(minarea, across));
        let center = snap_to_grid(l.rect.center().coord(l.dir), tc.grid);
        let fill = Rect::from_dir_spans(
            l.dir,
            Span::from_center_span_gridded(center, len, tc.grid),
            l.rect.span(!l.dir),
        )
        .union(&l.rect);
        debug!(
            "{}: min-area filler on {} ({} < {minarea})",
            self.name,
            l.layer,
            l.rect.area()
        );
        Ok(Some(draw_rect(fill, l.layer.clone())))
    }
}

/// Whether two rectangles overlap or share an edge.
fn touches(a: &Rect, b: &Rect) -> bool {
    a.left() <= b.right() && b.left() <= a.right() && a.bottom() <= b.top() && b.bottom() <= a.top()
}

/// The points of a single-jog route between two pins.
///
/// See [`Router::route_pins`] for the jog placement rule.
pub fn jog_points(src: &Pin, dst: &Pin, dir: Dir, pitch: Int, grid: Int) -> Vec<RoutePoint> {
    let across = !dir;
    let a = src.rect.center();
    let b = dst.rect.center();
    let (ca, cb) = (a.coord(across), b.coord(across));

    let level = if (ca - cb).abs() < pitch {
        snap_to_grid((ca + cb).div_euclid(2), grid)
    } else if dst.rect.length(across) < src.rect.length(across) {
        cb
    } else {
        ca
    };

    let at = |p: Point, level: Int| Point::from_dir_coords(dir, p.coord(dir), level);
    vec![
        RoutePoint::new(a, src.layer.clone()),
        RoutePoint::new(at(a, level), src.layer.clone()),
        RoutePoint::new(at(b, level), src.layer.clone()),
        RoutePoint::new(b, dst.layer.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tech::sample;

    fn router(name: &str) -> Router {
        Router::new(name, Pdk::new(sample::tech_config().clone()))
    }

    fn pin(layer: &str, r: Rect) -> Pin {
        Pin::new("p", layer, r)
    }

    #[test]
    fn test_jog_at_midpoint() -> Result<()> {
        let mut r = router("test_jog_at_midpoint");
        let pitch = 200;
        let src = pin("metal1", Rect::from_center(Point::new(0, 0), 100, 100));
        let dst = pin(
            "metal1",
            Rect::from_center(Point::new(1000, pitch / 2), 100, 100),
        );
        let wire = r.route_pins(&src, &dst, Dir::Horiz, pitch)?;

        assert_eq!(wire.segments.len(), 3);
        assert!(wire.vias.is_empty());
        assert!(wire.fillers.is_empty());
        // The horizontal run sits at the shared midpoint height.
        let run = &wire.segments[1];
        assert_eq!(run.rect.height(), 65);
        assert!(run.rect.vspan().contains(50));
        Ok(())
    }

    #[test]
    fn test_jog_inside_smaller_pin() {
        let pitch = 200;
        let src = pin("metal1", Rect::from_center(Point::new(0, 0), 100, 1000));
        let dst = pin("metal1", Rect::from_center(Point::new(1000, 300), 100, 200));
        let pts = jog_points(&src, &dst, Dir::Horiz, pitch, 5);
        assert_eq!(pts[1].point, Point::new(0, 300));
        assert_eq!(pts[2].point, Point::new(1000, 300));

        // Equal extents: the source wins.
        let dst = pin("metal1", Rect::from_center(Point::new(1000, 300), 100, 1000));
        let pts = jog_points(&src, &dst, Dir::Horiz, pitch, 5);
        assert_eq!(pts[1].point, Point::new(0, 0));

        // Exactly one pitch apart is not "less than one pitch".
        let dst = pin("metal1", Rect::from_center(Point::new(1000, 200), 100, 100));
        let pts = jog_points(&src, &dst, Dir::Horiz, pitch, 5);
        assert_eq!(pts[1].point.y, 200);
        let pts = jog_points(&src, &dst, Dir::Horiz, pitch + 1, 5);
        assert_eq!(pts[1].point.y, 100);
    }

    #[test]
    fn test_jog_vertical_travel() {
        let src = pin("metal2", Rect::from_center(Point::new(0, 0), 70, 70));
        let dst = pin("metal2", Rect::from_center(Point::new(100, 1000), 70, 70));
        let pts = jog_points(&src, &dst, Dir::Vert, 500, 5);
        assert_eq!(pts[1].point, Point::new(50, 0));
        assert_eq!(pts[2].point, Point::new(50, 1000));
    }

    #[test]
    fn test_metal1_to_metal3() -> Result<()> {
        let mut r = router("test_metal1_to_metal3");
        let wire = r.connect(&[
            RoutePoint::new(Point::new(0, 0), "metal1"),
            RoutePoint::new(Point::new(1000, 0), "metal3"),
        ])?;
        assert_eq!(wire.segments.len(), 1);
        assert_eq!(wire.segments[0].layer, "metal1");
        assert_eq!(wire.vias.len(), 2);
        assert_eq!(wire.vias[0].stack, "via1");
        assert_eq!(wire.vias[1].stack, "via2");
        // Nothing else lands on metal2, and the bare via landings are too small.
        assert!(wire.fillers.iter().any(|f| f.layer == "metal2"));
        for f in wire.fillers.iter() {
            let minarea = sample::tech_config().minarea(&f.layer)?;
            assert!(f.rect.area() >= minarea);
        }
        let routing = r.finish();
        assert_eq!(routing.vias.len(), 2);
        Ok(())
    }

    #[test]
    fn test_filler_skipped_under_wire() -> Result<()> {
        let mut r = router("test_filler_skipped_under_wire");
        let wire = r.connect(&[
            RoutePoint::new(Point::new(0, 0), "metal1"),
            RoutePoint::new(Point::new(0, 500), "metal2"),
            RoutePoint::new(Point::new(800, 500), "metal2"),
        ])?;
        assert_eq!(wire.vias.len(), 1);
        assert_eq!(wire.segments.len(), 2);
        assert!(wire.fillers.is_empty());
        Ok(())
    }

    #[test]
    fn test_filler_under_short_wire() -> Result<()> {
        let mut r = router("test_filler_under_short_wire");
        let tc = sample::tech_config();
        let wire = r.connect(&[
            RoutePoint::new(Point::new(0, 0), "metal1"),
            RoutePoint::new(Point::new(0, 10), "metal2"),
            RoutePoint::new(Point::new(0, 20), "metal2"),
        ])?;
        assert_eq!(wire.vias.len(), 1);
        for layer in ["metal1", "metal2"] {
            let metal = wire
                .segments
                .iter()
                .chain(wire.fillers.iter())
                .filter(|e| e.layer == layer)
                .map(|e| e.rect)
                .collect::<Vec<_>>();
            assert!(wire.fillers.iter().any(|f| f.layer == layer), "no {layer} filler");
            let bbox = metal.iter().fold(metal[0], |acc, r| acc.union(r));
            assert!(bbox.area() >= tc.minarea(layer)?);
        }
        Ok(())
    }

    #[test]
    fn test_via_same_layer() {
        let mut r = router("test_via_same_layer");
        assert!(matches!(
            r.via(Point::new(0, 0), "metal1", "metal1", Dir::Vert),
            Err(Error::InvalidParams(_))
        ));
        assert!(r.finish().vias.is_empty());
    }

    #[test]
    fn test_bare_via() -> Result<()> {
        let mut r = router("test_bare_via");
        let wire = r.via(Point::new(500, 500), "metal1", "metal2", Dir::Vert)?;
        assert_eq!(wire.vias.len(), 1);
        // Odd cut widths center to within one grid step.
        let c = wire.vias[0].center;
        assert!((c.x - 500).abs() <= 5 && (c.y - 500).abs() <= 5);
        assert_eq!(wire.fillers.len(), 2);
        for f in wire.fillers.iter() {
            // Fillers grow along the relaxed direction only.
            assert!(f.rect.height() > f.rect.width());
            assert!(f.rect.area() >= sample::tech_config().minarea(&f.layer)?);
        }
        let routing = r.finish();
        assert_eq!(routing.elems.len(), 2);
        assert_eq!(routing.vias[0].name, "test_bare_via_via1");
        Ok(())
    }

    #[test]
    fn test_non_manhattan() {
        let mut r = router("test_non_manhattan");
        let err = r
            .connect(&[
                RoutePoint::new(Point::new(0, 0), "metal1"),
                RoutePoint::new(Point::new(100, 100), "metal1"),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::NonManhattan(_, _)));
    }

    #[test]
    fn test_degenerate_route() {
        let mut r = router("test_degenerate_route");
        let p = RoutePoint::new(Point::new(0, 0), "metal1");
        assert!(matches!(
            r.connect(&[p.clone(), p]),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn test_unknown_layer() {
        let mut r = router("test_unknown_layer");
        assert!(matches!(
            r.connect(&[
                RoutePoint::new(Point::new(0, 0), "metal1"),
                RoutePoint::new(Point::new(0, 100), "metal9"),
            ]),
            Err(Error::UnknownLayer(_))
        ));
    }
}
