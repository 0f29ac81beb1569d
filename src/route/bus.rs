//! Named parallel routing tracks.

use std::collections::HashMap;

use arcstr::ArcStr;
use log::debug;

use crate::contact::{contact_footprint, ContactParams};
use crate::error::{Error, Result};
use crate::geometry::{Dir, Int, Point, Rect, Span};
use crate::layout::{draw_rect, Element, Pin};
use crate::tech::TechConfig;

use super::{RouteOpts, RoutePoint, Router, Wire};

/// A table from signal name to track coordinate.
///
/// Tracks run in direction `dir`; coordinates are measured along `!dir`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TrackAllocation {
    dir: Dir,
    layer: Option<ArcStr>,
    names: Vec<ArcStr>,
    coords: Vec<Int>,
    index: HashMap<ArcStr, usize>,
}

/// Gives each name one track, with track `i` at `start + i * pitch`.
///
/// Names must be distinct within one call. Separate calls are independent:
/// nothing stops two allocations from overlapping.
pub fn allocate<I, S>(names: I, pitch: Int, start: Int, dir: Dir) -> Result<TrackAllocation>
where
    I: IntoIterator<Item = S>,
    S: Into<ArcStr>,
{
    if pitch <= 0 {
        return Err(Error::InvalidParams(format!(
            "track pitch must be positive, got {pitch}"
        )));
    }

    let mut alloc = TrackAllocation {
        dir,
        layer: None,
        names: Vec::new(),
        coords: Vec::new(),
        index: HashMap::new(),
    };
    for (i, name) in names.into_iter().enumerate() {
        let name = name.into();
        if alloc.index.insert(name.clone(), i).is_some() {
            return Err(Error::DuplicateTrack(name));
        }
        alloc.names.push(name);
        alloc.coords.push(start + i as Int * pitch);
    }
    Ok(alloc)
}

impl TrackAllocation {
    /// Tags every track with a layer.
    pub fn with_layer(mut self, layer: impl Into<ArcStr>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    #[inline]
    pub fn dir(&self) -> Dir {
        self.dir
    }

    #[inline]
    pub fn layer(&self) -> Option<&ArcStr> {
        self.layer.as_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<Int> {
        self.index.get(name).map(|&i| self.coords[i])
    }

    pub fn coord(&self, name: &str) -> Result<Int> {
        self.get(name)
            .ok_or_else(|| Error::UnknownTrack(ArcStr::from(name)))
    }

    /// Tracks in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, Int)> + '_ {
        self.names.iter().zip(self.coords.iter().copied())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BusBuilder {
    layer: Option<ArcStr>,
    line: Option<Int>,
    space: Option<Int>,
    dir: Option<Dir>,
    names: Vec<ArcStr>,
    start: Option<Int>,
    high: Option<Int>,
    extent: Option<Span>,
}

/// A set of parallel rails on one layer, one per signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bus {
    layer: ArcStr,
    line: Int,
    space: Int,
    extent: Span,
    tracks: TrackAllocation,
}

impl BusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses minimum width and spacing of `layer` for the rails.
    pub fn tech_layer(mut self, tc: &TechConfig, layer: &str) -> Result<Self> {
        self.line = Some(tc.minwidth(layer)?);
        self.space = Some(tc.space(layer)?);
        self.layer = Some(layer.into());
        Ok(self)
    }

    pub fn line(mut self, line: Int) -> Self {
        self.line = Some(line);
        self
    }

    pub fn space(mut self, space: Int) -> Self {
        self.space = Some(space);
        self
    }

    /// Widens the spacing so that a via of `stack` can land on any rail
    /// without violating spacing to its neighbors.
    ///
    /// Must be called after [`BusBuilder::tech_layer`] and [`BusBuilder::dir`].
    pub fn allow_contact(mut self, tc: &TechConfig, stack: &str) -> Result<Self> {
        let (layer, line, space, dir) = match (&self.layer, self.line, self.space, self.dir) {
            (Some(l), Some(line), Some(space), Some(dir)) => (l.clone(), line, space, dir),
            _ => {
                return Err(Error::InvalidParams(
                    "bus layer and direction must be set before allowing contacts".into(),
                ))
            }
        };
        let fp = contact_footprint(tc, &ContactParams::single(stack, dir))?;
        let st = tc.stack(stack)?;
        if layer.as_str() != st.bot() && layer.as_str() != st.top() {
            return Err(Error::InvalidParams(format!(
                "stack `{stack}` does not land on bus layer `{layer}`"
            )));
        }

        let cut = st.cut();
        let candidates = [
            space,
            fp.bot.length(!dir) + tc.space(st.bot())? - line,
            fp.top.length(!dir) + tc.space(st.top())? - line,
            // adjacent cuts
            tc.minwidth(cut)? + tc.space(cut)? - line,
        ];
        let space = candidates.into_iter().max().unwrap_or(space);
        self.space = Some(tc.snap_up(space));
        Ok(self)
    }

    /// The direction in which the rails run.
    pub fn dir(mut self, dir: Dir) -> Self {
        self.dir = Some(dir);
        self
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ArcStr>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Puts the low edge of the first rail at `x`.
    pub fn align_low(mut self, x: Int) -> Self {
        self.start = Some(x);
        self.high = None;
        self
    }

    /// Puts the high edge of the last rail at `x`.
    pub fn align_high(mut self, x: Int) -> Self {
        self.high = Some(x);
        self.start = None;
        self
    }

    /// The span covered by each rail along the bus direction.
    pub fn extent(mut self, extent: Span) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn build(self) -> Result<Bus> {
        let missing = |field: &str| Error::InvalidParams(format!("bus is missing `{field}`"));
        let layer = self.layer.ok_or_else(|| missing("layer"))?;
        let line = self.line.ok_or_else(|| missing("line"))?;
        let space = self.space.ok_or_else(|| missing("space"))?;
        let dir = self.dir.ok_or_else(|| missing("dir"))?;
        let extent = self.extent.ok_or_else(|| missing("extent"))?;
        if self.names.is_empty() {
            return Err(Error::InvalidParams("bus has no signals".into()));
        }
        if extent.length() <= 0 {
            return Err(Error::InvalidParams(format!(
                "bus extent must be nonempty, got {extent:?}"
            )));
        }

        let n = self.names.len() as Int;
        let start = match (self.start, self.high) {
            (Some(s), _) => s,
            (None, Some(h)) => h - line * n - space * (n - 1),
            (None, None) => return Err(missing("alignment")),
        };

        let tracks = allocate(self.names, line + space, start + line / 2, dir)?
            .with_layer(layer.clone());
        debug!(
            "bus of {} {} tracks on {layer} at pitch {}",
            tracks.len(),
            dir,
            line + space
        );

        Ok(Bus {
            layer,
            line,
            space,
            extent,
            tracks,
        })
    }
}

impl Bus {
    #[inline]
    pub fn builder() -> BusBuilder {
        BusBuilder::new()
    }

    #[inline]
    pub fn layer(&self) -> &ArcStr {
        &self.layer
    }

    #[inline]
    pub fn dir(&self) -> Dir {
        self.tracks.dir()
    }

    #[inline]
    pub fn pitch(&self) -> Int {
        self.line + self.space
    }

    #[inline]
    pub fn tracks(&self) -> &TrackAllocation {
        &self.tracks
    }

    /// The rail rectangle for signal `name`.
    pub fn rail(&self, name: &str) -> Result<Rect> {
        let c = self.tracks.coord(name)?;
        let lo = c - self.line / 2;
        Ok(Rect::from_dir_spans(
            self.dir(),
            self.extent,
            Span::new(lo, lo + self.line),
        ))
    }

    /// One rail per signal.
    pub fn draw(&self) -> Result<Vec<Element>> {
        self.tracks
            .iter()
            .map(|(name, _)| Ok(draw_rect(self.rail(name)?, self.layer.clone())))
            .collect()
    }

    /// The rail for `name` as a pin.
    pub fn pin(&self, name: &str) -> Result<Pin> {
        Ok(Pin::new(name, self.layer.clone(), self.rail(name)?))
    }

    /// Connects rail `name` to `target`, which must be on a different layer.
    ///
    /// A via is dropped on the rail where it crosses the target's center, and a
    /// branch runs on the target's layer from there to the target.
    pub fn tap(&self, router: &mut Router, name: &str, target: &Pin) -> Result<Wire> {
        if target.layer == self.layer {
            return Err(Error::InvalidParams(format!(
                "cannot tap bus `{name}` on its own layer `{}`",
                self.layer
            )));
        }
        let dir = self.dir();
        let t = target.rect.center();
        let on_rail = Point::from_dir_coords(dir, t.coord(dir), self.tracks.coord(name)?);
        router.connect_with(
            &[
                RoutePoint::new(on_rail, self.layer.clone()),
                RoutePoint::new(on_rail, target.layer.clone()),
                RoutePoint::new(t, target.layer.clone()),
            ],
            RouteOpts {
                width: None,
                via_dir: Some(dir),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdk::Pdk;
    use crate::tech::sample;

    #[test]
    fn test_allocate() -> Result<()> {
        let p = 140;
        let alloc = allocate(["a", "b", "c", "d", "e"], p, 0, Dir::Vert)?;
        let coords = alloc.iter().map(|(_, c)| c).collect::<Vec<_>>();
        assert_eq!(coords, vec![0, p, 2 * p, 3 * p, 4 * p]);
        assert_eq!(alloc.coord("c")?, 2 * p);
        assert!(matches!(alloc.coord("f"), Err(Error::UnknownTrack(_))));

        let err = allocate(["a", "b", "a"], p, 0, Dir::Vert).unwrap_err();
        assert!(matches!(err, Error::DuplicateTrack(ref n) if n.as_str() == "a"));
        Ok(())
    }

    #[test]
    fn test_allocations_are_independent() -> Result<()> {
        let a = allocate(["x", "y"], 100, 0, Dir::Horiz)?;
        let b = allocate(["x", "y"], 100, 50, Dir::Horiz)?.with_layer("metal2");
        assert_eq!(a.get("y"), Some(100));
        assert_eq!(b.get("y"), Some(150));
        assert_eq!(b.layer().map(|l| l.as_str()), Some("metal2"));
        assert!(allocate(["x"], 0, 0, Dir::Horiz).is_err());
        Ok(())
    }

    #[test]
    fn test_bus_draw() -> Result<()> {
        let tc = sample::tech_config();
        let bus = Bus::builder()
            .tech_layer(tc, "metal2")?
            .dir(Dir::Vert)
            .names(["addr_0", "addr_1", "addr_2"])
            .align_low(0)
            .extent(Span::new(0, 2_000))
            .build()?;
        assert_eq!(bus.pitch(), 140);
        let rails = bus.draw()?;
        assert_eq!(rails.len(), 3);
        assert_eq!(rails[0].rect, Rect::ll_wh(0, 0, 70, 2_000));
        assert_eq!(rails[2].rect, Rect::ll_wh(280, 0, 70, 2_000));
        assert_eq!(bus.rail("addr_1")?, rails[1].rect);

        let high = Bus::builder()
            .tech_layer(tc, "metal2")?
            .dir(Dir::Vert)
            .names(["addr_0", "addr_1", "addr_2"])
            .align_high(350)
            .extent(Span::new(0, 2_000))
            .build()?;
        assert_eq!(high.draw()?, rails);
        Ok(())
    }

    #[test]
    fn test_allow_contact() -> Result<()> {
        let tc = sample::tech_config();
        let bus = Bus::builder()
            .tech_layer(tc, "metal2")?
            .dir(Dir::Vert)
            .allow_contact(tc, "via1")?
            .names(["a", "b"])
            .align_low(0)
            .extent(Span::new(0, 1_000))
            .build()?;
        // Via landings on metal2 are wider than the bare rails.
        assert!(bus.pitch() > 140);
        assert_eq!(bus.pitch() % tc.grid, 0);
        Ok(())
    }

    #[test]
    fn test_bus_tap() -> Result<()> {
        let pdk = Pdk::new(sample::tech_config().clone());
        let tc = pdk.config().clone();
        let bus = Bus::builder()
            .tech_layer(&tc, "metal2")?
            .dir(Dir::Vert)
            .allow_contact(&tc, "via1")?
            .names(["en", "clk"])
            .align_low(0)
            .extent(Span::new(0, 2_000))
            .build()?;
        let mut router = Router::new("test_bus_tap", pdk);
        let target = Pin::new("clk", "metal1", Rect::from_center(Point::new(800, 1_000), 200, 200));
        let wire = bus.tap(&mut router, "clk", &target)?;
        assert_eq!(wire.vias.len(), 1);
        assert_eq!(wire.vias[0].stack, "via1");
        assert_eq!(wire.segments.len(), 1);
        assert_eq!(wire.segments[0].layer, "metal1");

        assert!(bus.tap(&mut router, "clk", &bus.pin("en")?).is_err());
        Ok(())
    }
}
