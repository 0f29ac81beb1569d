use std::fmt::Display;
use std::sync::Arc;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{div_ceil, snap_to_grid, Dir, Int, Point, Rect};
use crate::layout::{CellBuilder, Instance, Pin};
use crate::pdk::Pdk;
use crate::tech::{ContactStack, TechConfig};

/// Contact cells carry one pin of this name on each landing layer.
pub const CONTACT_PIN: &str = "x";

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, derive_builder::Builder)]
pub struct ContactParams {
    #[builder(setter(into))]
    pub stack: String,
    #[builder(default = "1")]
    pub rows: usize,
    #[builder(default = "1")]
    pub cols: usize,
    /// The "relaxed" direction, ie. the direction in which there is more margin (for overhangs,
    /// for instance).
    ///
    /// One-sided enclosure rules are satisfied by extending the landing
    /// layers in this direction.
    #[builder(default)]
    pub dir: Dir,
}

impl Display for ContactParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}x{}{}",
            &self.stack,
            self.rows,
            self.cols,
            self.dir.short_form()
        )
    }
}

impl ContactParams {
    pub fn builder() -> ContactParamsBuilder {
        ContactParamsBuilder::default()
    }

    /// A single cut of `stack`.
    pub fn single(stack: impl Into<String>, dir: Dir) -> Self {
        Self {
            stack: stack.into(),
            rows: 1,
            cols: 1,
            dir,
        }
    }
}

/// The rule-derived geometry of a contact, with the cut array's lower-left corner at the origin.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContactFootprint {
    pub cuts: Vec<Rect>,
    pub cut_bbox: Rect,
    pub bot: Rect,
    pub top: Rect,
    pub extra: Option<Rect>,
}

/// Computes the footprint of a contact without drawing it.
pub fn contact_footprint(tc: &TechConfig, params: &ContactParams) -> Result<ContactFootprint> {
    if params.rows == 0 || params.cols == 0 {
        return Err(Error::InvalidParams(format!(
            "contact {params} must have at least one row and one column"
        )));
    }
    let stack = tc.stack(&params.stack)?;
    let cut = stack.cut();
    let ctw = tc.minwidth(cut)?;
    let cts = tc.space(cut)?;
    let (rows, cols) = (params.rows as Int, params.cols as Int);
    let ctbw = ctw * cols + cts * (cols - 1);
    let ctbh = ctw * rows + cts * (rows - 1);
    let cut_bbox = Rect::ll_wh(0, 0, ctbw, ctbh);

    let mut cuts = Vec::with_capacity(params.rows * params.cols);
    for i in 0..rows {
        for j in 0..cols {
            cuts.push(Rect::ll_wh(j * (ctw + cts), i * (ctw + cts), ctw, ctw));
        }
    }

    let bot = landing(tc, stack.bot(), cut, cut_bbox, params.dir)?;
    let top = landing(tc, stack.top(), cut, cut_bbox, params.dir)?;
    let extra = match stack.extra {
        Some(ref extra) => Some(bot.expand(tc.enclosure(extra, stack.bot())?)),
        None => None,
    };

    Ok(ContactFootprint {
        cuts,
        cut_bbox,
        bot,
        top,
        extra,
    })
}

fn landing(tc: &TechConfig, layer: &str, cut: &str, cut_bbox: Rect, dir: Dir) -> Result<Rect> {
    let enc = tc.enclosure(layer, cut)?;
    let ose = tc.one_side_enclosure(layer, cut)?;
    let mut r = cut_bbox.expand(enc).expand_dir(dir, ose - enc);
    // Metal landings must also meet the layer's minimum width.
    if tc.routing_index(layer).is_some() {
        let minwidth = tc.minwidth(layer)?;
        for d in [Dir::Horiz, Dir::Vert] {
            let len = r.length(d);
            if len < minwidth {
                r = r.expand_dir(d, tc.snap_up(div_ceil(minwidth - len, 2)));
            }
        }
    }
    Ok(r)
}

/// The largest number of cuts of `stack` that fit in a bottom-layer region of length `len`.
pub fn max_cuts(tc: &TechConfig, stack: &ContactStack, len: Int) -> Result<usize> {
    let cut = stack.cut();
    let ctw = tc.minwidth(cut)?;
    let cts = tc.space(cut)?;
    let enc = tc.one_side_enclosure(stack.bot(), cut)?;
    let avail = len - 2 * enc;
    if avail < ctw {
        return Ok(0);
    }
    Ok(((avail + cts) / (ctw + cts)) as usize)
}

/// A generated contact cell.
#[derive(Debug, Clone)]
pub struct Contact {
    pub cell: Arc<crate::layout::Cell>,
    pub params: ContactParams,
    pub stack: ContactStack,
    pub footprint: ContactFootprint,
}

impl Contact {
    #[inline]
    pub fn rows(&self) -> usize {
        self.params.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.params.cols
    }

    /// Places this contact so that its cut array is centered on `center`,
    /// with the cut array's lower-left corner on the grid.
    pub fn place_centered(&self, name: impl Into<ArcStr>, center: Point, grid: Int) -> Instance {
        let cut = self.footprint.cut_bbox;
        let loc = Point::new(
            snap_to_grid(center.x - cut.width() / 2, grid),
            snap_to_grid(center.y - cut.height() / 2, grid),
        );
        Instance::new(name, Arc::clone(&self.cell)).with_loc(loc)
    }

    /// The landing rectangle on `layer` of a contact placed at `loc`.
    pub fn layer_rect(&self, layer: &str, loc: Point) -> Option<Rect> {
        let r = if layer == self.stack.bot() {
            self.footprint.bot
        } else if layer == self.stack.top() {
            self.footprint.top
        } else if Some(layer) == self.stack.extra.as_deref() {
            self.footprint.extra?
        } else if layer == self.stack.cut() {
            self.footprint.cut_bbox
        } else {
            return None;
        };
        Some(r.translated(loc))
    }
}

impl Pdk {
    pub(crate) fn draw_contact(&self, params: &ContactParams) -> Result<Contact> {
        let tc = self.config();
        let stack = tc.stack(&params.stack)?.clone();
        let footprint = contact_footprint(tc, params)?;

        let name = format!("{params}");
        let mut b = CellBuilder::new(name, Vec::<ArcStr>::new());
        for cut in footprint.cuts.iter() {
            b.draw_rect(stack.cut(), *cut)?;
        }
        b.draw_rect(stack.bot(), footprint.bot)?;
        b.draw_rect(stack.top(), footprint.top)?;
        if let (Some(extra), Some(rect)) = (stack.extra.as_deref(), footprint.extra) {
            b.draw_rect(extra, rect)?;
        }
        b.add_pin(Pin::new(CONTACT_PIN, stack.bot(), footprint.bot))?;
        b.add_pin(Pin::new(CONTACT_PIN, stack.top(), footprint.top))?;

        Ok(Contact {
            cell: b.finish_arc()?,
            params: params.clone(),
            stack,
            footprint,
        })
    }
}
