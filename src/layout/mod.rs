//! Cells, instances, pins and the phased builder used to compose them.

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundBox, BoundBoxTrait, Rect, Transform, TransformTrait};

pub mod builder;
pub mod cell;
pub mod grid;
pub mod names;
pub mod netlist;

pub use builder::{CellBuilder, Phase};
pub use cell::{Cell, Instance, Pin};
pub use names::NameRegistry;

/// The purpose of a drawn shape on its layer.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Purpose {
    #[default]
    Drawing,
    Pin,
}

/// A rectangle on a named layer.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Element {
    pub layer: ArcStr,
    pub purpose: Purpose,
    pub rect: Rect,
}

impl Element {
    pub fn transform(&self, trans: &Transform) -> Self {
        Self {
            layer: self.layer.clone(),
            purpose: self.purpose,
            rect: self.rect.transform(trans),
        }
    }
}

impl BoundBoxTrait for Element {
    fn bbox(&self) -> BoundBox {
        self.rect.bbox()
    }
}

pub fn draw_rect(r: Rect, layer: impl Into<ArcStr>) -> Element {
    Element {
        layer: layer.into(),
        purpose: Purpose::Drawing,
        rect: r,
    }
}
