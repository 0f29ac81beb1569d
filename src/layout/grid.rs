//! Row/column tiling of cells with shared row heights and column widths.

use std::sync::Arc;

use arcstr::ArcStr;

use crate::error::{Error, Result};
use crate::geometry::{BoundBoxTrait, Int, Mirror, Point};

use super::{Cell, Instance};

#[derive(Debug, Clone)]
pub struct GridCell {
    cell: Arc<Cell>,
    mirror: Mirror,
    conns: Vec<ArcStr>,
}

#[derive(Debug)]
pub struct GridLayout {
    inner: grid::Grid<Option<GridCell>>,
    row_heights: Vec<Int>,
    col_widths: Vec<Int>,
}

impl GridCell {
    pub fn new<I, S>(cell: Arc<Cell>, mirror: Mirror, conns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ArcStr>,
    {
        Self {
            cell,
            mirror,
            conns: conns.into_iter().map(Into::into).collect(),
        }
    }
}

impl GridLayout {
    /// Checks that every occupied slot in a row has the same height and every
    /// occupied slot in a column the same width.
    ///
    /// Rows and columns with no occupied slot have zero size.
    #[allow(clippy::needless_range_loop)]
    pub fn new(grid: grid::Grid<Option<GridCell>>) -> Result<Self> {
        let (rows, cols) = grid.size();
        let mut row_heights = vec![None; rows];
        let mut col_widths = vec![None; cols];

        for i in 0..rows {
            for j in 0..cols {
                if let Some(Some(grid_cell)) = grid.get(i, j) {
                    let bbox = grid_cell.cell.bbox();
                    check_or_set(&mut row_heights[i], bbox.height(), "height", i)?;
                    check_or_set(&mut col_widths[j], bbox.width(), "width", j)?;
                }
            }
        }

        Ok(Self {
            inner: grid,
            row_heights: row_heights.into_iter().map(|x| x.unwrap_or(0)).collect(),
            col_widths: col_widths.into_iter().map(|x| x.unwrap_or(0)).collect(),
        })
    }

    #[inline]
    pub fn size(&self) -> (usize, usize) {
        self.inner.size()
    }

    /// Places every occupied slot. Row 0 is at the top; `ul` is the upper-left corner.
    ///
    /// Instances are named `{prefix}_{row}_{col}`.
    pub fn place(&self, prefix: &str, ul: Point) -> grid::Grid<Option<Instance>> {
        let (rows, cols) = self.inner.size();
        let mut instance_grid = grid::Grid::init(rows, cols, None);

        let mut row_offset = 0;
        for i in 0..rows {
            row_offset += self.row_heights[i];
            let mut col_offset = 0;
            for j in 0..cols {
                if let Some(Some(cell)) = self.inner.get(i, j) {
                    let mut inst = Instance::new(
                        arcstr::format!("{prefix}_{i}_{j}"),
                        Arc::clone(&cell.cell),
                    )
                    .with_conns(cell.conns.iter().cloned());
                    let bbox = inst.bbox();
                    inst.loc = Point::new(ul.x + col_offset, ul.y - row_offset)
                        - Point::new(bbox.p0.x, bbox.p0.y);
                    inst.mirror_anchored(cell.mirror);
                    instance_grid[i][j] = Some(inst);
                }
                col_offset += self.col_widths[j];
            }
        }

        instance_grid
    }
}

fn check_or_set(slot: &mut Option<Int>, value: Int, what: &str, idx: usize) -> Result<()> {
    match slot {
        Some(v) if *v != value => Err(Error::InvalidParams(format!(
            "grid layout: mismatched {what} in row/column {idx} ({v} vs {value})"
        ))),
        Some(_) => Ok(()),
        None => {
            *slot = Some(value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::layout::{CellBuilder, Pin};

    fn tile(name: &str, w: Int, h: Int) -> Arc<Cell> {
        let mut b = CellBuilder::new(name, ["x"]);
        b.draw_rect("metal1", Rect::ll_wh(0, 0, w, h)).unwrap();
        b.add_pin(Pin::new("x", "metal1", Rect::ll_wh(0, 0, 10, 10)))
            .unwrap();
        b.finish_arc().unwrap()
    }

    #[test]
    fn test_grid_layout() {
        let a = tile("a", 100, 50);
        let mut g = grid::Grid::init(2, 2, None);
        g[0][0] = Some(GridCell::new(a.clone(), Mirror::None, ["n0"]));
        g[0][1] = Some(GridCell::new(a.clone(), Mirror::Y, ["n1"]));
        g[1][0] = Some(GridCell::new(a.clone(), Mirror::X, ["n2"]));
        let layout = GridLayout::new(g).unwrap();
        let insts = layout.place("x", Point::new(0, 100));

        let r = |i: usize, j: usize| -> Rect { insts[i][j].as_ref().unwrap().bbox().into() };
        assert_eq!(r(0, 0), Rect::ll_wh(0, 50, 100, 50));
        assert_eq!(r(0, 1), Rect::ll_wh(100, 50, 100, 50));
        assert_eq!(r(1, 0), Rect::ll_wh(0, 0, 100, 50));
        assert!(insts[1][1].is_none());
        assert_eq!(insts[0][1].as_ref().unwrap().name, "x_0_1");
    }

    #[test]
    fn test_mismatched_heights() {
        let mut g = grid::Grid::init(1, 2, None);
        g[0][0] = Some(GridCell::new(tile("a", 100, 50), Mirror::None, ["n"]));
        g[0][1] = Some(GridCell::new(tile("b", 100, 60), Mirror::None, ["n"]));
        assert!(matches!(
            GridLayout::new(g),
            Err(Error::InvalidParams(_))
        ));
    }
}
