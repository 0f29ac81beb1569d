//! Design-rule driven layout synthesis for SRAM generators.
//!
//! Leaf cells (contacts and transistors) are synthesized from a technology's
//! rule table. Larger cells are composed by placing instances of smaller ones,
//! allocating routing tracks, and wiring pins together with the [`route::Router`].

pub mod blocks;
pub mod config;
pub mod contact;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod mos;
pub mod pdk;
pub mod route;
pub mod tech;

pub use error::{Error, Result};
pub use pdk::{Pdk, PdkLib};

pub fn bus_bit(name: &str, index: usize) -> String {
    format!("{name}[{index}]")
}

#[inline]
pub(crate) fn clog2(x: usize) -> usize {
    (x as f64).log2().ceil() as usize
}

#[cfg(test)]
mod tests;
