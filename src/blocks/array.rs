use std::sync::Arc;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;
use crate::error::{Error, Result};
use crate::geometry::{Dir, Int, Mirror, Point};
use crate::layout::{Cell, CellBuilder, Instance};
use crate::pdk::PdkLib;

#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum FlipMode {
    #[default]
    None,
    AlternateFlipVertical,
    AlternateFlipHorizontal,
}

pub struct ArrayCellParams {
    pub name: String,
    pub num: usize,
    pub cell: Arc<Cell>,
    pub spacing: Option<Int>,
    pub flip: FlipMode,
    pub direction: Dir,
    /// By default, cells 0, 2, 4, ... will be flipped according to the flip mode.
    /// If `flip_toggle` is set, cells 1, 3, 5, ... will be flipped instead.
    pub flip_toggle: bool,
}

/// Tiles `params.num` copies of a cell in a line.
///
/// Port `p` of copy `i` becomes port `p[i]` of the array, and its pins are
/// exposed under that name.
pub fn draw_cell_array(lib: &mut PdkLib, params: &ArrayCellParams) -> Result<Arc<Cell>> {
    if params.num == 0 {
        return Err(Error::InvalidParams(format!(
            "array `{}` must have at least one cell",
            params.name
        )));
    }

    let spacing = params
        .spacing
        .unwrap_or_else(|| params.cell.bbox_rect().length(params.direction));

    let ports = (0..params.num)
        .flat_map(|i| params.cell.ports().iter().map(move |p| bus_bit(p, i)))
        .collect::<Vec<_>>();

    let name = lib.unique_name(&params.name);
    log::info!("generating cell array {name} of {} {}", params.num, params.cell.name());
    let mut b = CellBuilder::new(name, ports);

    let origin = params.cell.bbox_rect().p0;
    for i in 0..params.num {
        let loc = Point::offset(spacing * i as Int, params.direction) - origin;
        let conns = params
            .cell
            .ports()
            .iter()
            .map(|p| ArcStr::from(bus_bit(p, i)));
        let mut inst = Instance::new(bus_bit("cell", i), Arc::clone(&params.cell))
            .with_loc(loc)
            .with_conns(conns);

        if (i % 2 == 0) ^ params.flip_toggle {
            match params.flip {
                FlipMode::AlternateFlipHorizontal => {
                    inst.mirror_anchored(Mirror::Y);
                }
                FlipMode::AlternateFlipVertical => {
                    inst.mirror_anchored(Mirror::X);
                }
                FlipMode::None => {}
            }
        }

        b.add_instance(inst)?;
    }

    for i in 0..params.num {
        let inst = bus_bit("cell", i);
        for port in params.cell.ports() {
            if params.cell.pins_named(port).count() > 1 {
                b.allow_split_pin(bus_bit(port, i));
            }
            b.expose_pin(&inst, port, bus_bit(port, i))?;
        }
    }

    Ok(lib.add_cell(b.finish()?))
}
