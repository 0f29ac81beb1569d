//! Cells composed from synthesized transistors and other cells.

pub mod array;
pub mod gate;
