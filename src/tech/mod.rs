//! Technology description: the design-rule table, the layer table and contact stacks.
//!
//! A [`TechConfig`] is loaded once per session and never mutated during synthesis.
//! Rules are addressed by symbolic name (`minwidth_poly`, `contact_to_gate`, ...).
//! A missing rule is always an error: defaulting a DRC value would silently
//! produce illegal geometry.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{snap_to_grid, snap_up, Int};
use crate::layout::Purpose;

pub mod sample;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct ContactStack {
    /// Bottom layer, cut layer and top layer, in that order.
    pub layers: Vec<String>,
    /// An optional marking layer drawn around the bottom layer (eg. an implant for well taps).
    #[serde(default)]
    pub extra: Option<String>,
}

impl ContactStack {
    #[inline]
    pub fn bot(&self) -> &str {
        &self.layers[0]
    }

    #[inline]
    pub fn cut(&self) -> &str {
        &self.layers[1]
    }

    #[inline]
    pub fn top(&self) -> &str {
        &self.layers[2]
    }

    /// Whether this stack joins layers `a` and `b`, in either order.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.bot() == a && self.top() == b) || (self.bot() == b && self.top() == a)
    }
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub desc: String,
    pub layernum: i16,
    #[serde(default)]
    pub datatype: i16,
    /// GDS datatype used for pin shapes, if different from `datatype`.
    #[serde(default)]
    pub pin_datatype: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TechConfig {
    pub tech: String,
    /// Manufacturing grid, in database units.
    pub grid: Int,
    /// Database units per micron.
    pub units: Int,
    /// Metal layers available to the router, from lowest to highest.
    pub routing_layers: Vec<String>,
    rules: BTreeMap<String, Int>,
    layers: HashMap<String, LayerConfig>,
    stacks: BTreeMap<String, ContactStack>,
}

impl TechConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let txt = std::fs::read_to_string(path)?;
        Self::from_toml(&txt)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let tc: Self = toml::from_str(s)?;
        tc.validate()?;
        Ok(tc)
    }

    fn validate(&self) -> Result<()> {
        if self.grid <= 0 || self.units <= 0 {
            return Err(Error::InvalidParams(format!(
                "grid ({}) and units ({}) must be positive",
                self.grid, self.units
            )));
        }
        for (name, stack) in self.stacks.iter() {
            if stack.layers.len() != 3 {
                return Err(Error::InvalidParams(format!(
                    "stack `{name}` must list exactly 3 layers, found {}",
                    stack.layers.len()
                )));
            }
            for l in stack.layers.iter().chain(stack.extra.iter()) {
                self.layer(l)?;
            }
        }
        for l in self.routing_layers.iter() {
            self.layer(l)?;
        }
        Ok(())
    }

    /// Looks up a design rule by name.
    pub fn rule(&self, name: &str) -> Result<Int> {
        self.rules
            .get(name)
            .copied()
            .ok_or_else(|| Error::MissingRule(name.to_string()))
    }

    /// Looks up a rule that some technologies legitimately omit.
    ///
    /// Only for rules whose absence has a well-defined meaning, such as
    /// one-sided enclosures that are no stricter than the regular enclosure.
    pub fn rule_opt(&self, name: &str) -> Option<Int> {
        self.rules.get(name).copied()
    }

    #[inline]
    pub fn minwidth(&self, layer: &str) -> Result<Int> {
        self.rule(&format!("minwidth_{layer}"))
    }

    /// Minimum spacing between two shapes on `layer`.
    #[inline]
    pub fn space(&self, layer: &str) -> Result<Int> {
        self.rule(&format!("{layer}_to_{layer}"))
    }

    /// Minimum spacing between shapes on two different layers.
    ///
    /// The rule may be written in either order.
    pub fn space_between(&self, a: &str, b: &str) -> Result<Int> {
        let fwd = format!("{a}_to_{b}");
        self.rule_opt(&fwd)
            .or_else(|| self.rule_opt(&format!("{b}_to_{a}")))
            .ok_or(Error::MissingRule(fwd))
    }

    #[inline]
    pub fn minarea(&self, layer: &str) -> Result<Int> {
        self.rule(&format!("minarea_{layer}"))
    }

    /// Minimum enclosure of `inner` by `outer` on all sides.
    #[inline]
    pub fn enclosure(&self, outer: &str, inner: &str) -> Result<Int> {
        self.rule(&format!("{outer}_enclose_{inner}"))
    }

    /// Minimum enclosure of `inner` by `outer` on the two opposite sides
    /// of the relaxed direction.
    pub fn one_side_enclosure(&self, outer: &str, inner: &str) -> Result<Int> {
        let enc = self.enclosure(outer, inner)?;
        Ok(self
            .rule_opt(&format!("{outer}_enclose_{inner}_one_side"))
            .map_or(enc, |one| one.max(enc)))
    }

    /// Minimum extension of `layer` past the edge of `other`.
    #[inline]
    pub fn extension(&self, layer: &str, other: &str) -> Result<Int> {
        self.rule(&format!("{layer}_extend_{other}"))
    }

    pub fn layer(&self, name: &str) -> Result<&LayerConfig> {
        self.layers
            .get(name)
            .ok_or_else(|| Error::UnknownLayer(name.to_string()))
    }

    /// The GDS `(layer, datatype)` pair for shapes of the given purpose.
    ///
    /// Pin shapes use the layer's `pin_datatype` when it has one.
    pub fn gds_layer(&self, name: &str, purpose: Purpose) -> Result<(i16, i16)> {
        let l = self.layer(name)?;
        let datatype = match purpose {
            Purpose::Drawing => l.datatype,
            Purpose::Pin => l.pin_datatype.unwrap_or(l.datatype),
        };
        Ok((l.layernum, datatype))
    }

    #[inline]
    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn stack(&self, name: &str) -> Result<&ContactStack> {
        self.stacks
            .get(name)
            .ok_or_else(|| Error::UnknownStack(name.to_string()))
    }

    /// The stacks needed to change from layer `from` to layer `to`, in order.
    ///
    /// Returns the shortest chain of stacks; ties are broken by stack name.
    /// Marking-layer stacks (those with an `extra` layer) are never used.
    pub fn stack_path(&self, from: &str, to: &str) -> Result<Vec<(&str, &ContactStack)>> {
        self.layer(from)?;
        self.layer(to)?;
        if from == to {
            return Ok(Vec::new());
        }

        let mut prev: HashMap<&str, (&str, &str)> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);

        while let Some(layer) = queue.pop_front() {
            if layer == to {
                break;
            }
            for (name, stack) in self.stacks.iter().filter(|(_, s)| s.extra.is_none()) {
                let next = if stack.bot() == layer {
                    stack.top()
                } else if stack.top() == layer {
                    stack.bot()
                } else {
                    continue;
                };
                if seen.insert(next) {
                    prev.insert(next, (layer, name.as_str()));
                    queue.push_back(next);
                }
            }
        }

        let mut path = Vec::new();
        let mut cur = to;
        while cur != from {
            let &(p, name) = prev
                .get(cur)
                .ok_or_else(|| Error::NoStackBetween(from.to_string(), to.to_string()))?;
            path.push((name, &self.stacks[name]));
            cur = p;
        }
        path.reverse();
        Ok(path)
    }

    /// The metal index of `layer` in the routing stack, if it is a routing layer.
    pub fn routing_index(&self, layer: &str) -> Option<usize> {
        self.routing_layers.iter().position(|l| l == layer)
    }

    /// Converts a length in microns to database units, snapped to the grid.
    pub fn um(&self, x: f64) -> Int {
        snap_to_grid((x * self.units as f64).round() as Int, self.grid)
    }

    /// Converts a length in database units to microns.
    pub fn to_um(&self, x: Int) -> f64 {
        x as f64 / self.units as f64
    }

    /// Rounds `x` up to the manufacturing grid.
    #[inline]
    pub fn snap_up(&self, x: Int) -> Int {
        snap_up(x, self.grid)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_gds_layers() -> Result<()> {
        let tc = sample::tech_config();
        assert_eq!(tc.gds_layer("metal1", Purpose::Drawing)?, (11, 0));
        assert_eq!(tc.gds_layer("metal1", Purpose::Pin)?, (11, 1));
        assert_eq!(tc.gds_layer("poly", Purpose::Pin)?, (9, 0));
        assert!(matches!(
            tc.gds_layer("metal9", Purpose::Drawing),
            Err(Error::UnknownLayer(_))
        ));
        Ok(())
    }

    #[test]
    fn test_sample_rules() -> Result<()> {
        let tc = sample::tech_config();
        assert_eq!(tc.tech, "sample45");
        assert_eq!(tc.minwidth("poly")?, 50);
        assert_eq!(tc.space("poly")?, 140);
        assert_eq!(tc.enclosure("active", "contact")?, 5);
        assert_eq!(tc.one_side_enclosure("metal1", "via1")?, 35);
        assert_eq!(tc.one_side_enclosure("metal3", "via3")?, 10);
        assert_eq!(tc.space_between("active", "poly")?, 50);
        Ok(())
    }

    #[test]
    fn test_missing_rule_is_named() {
        let tc = sample::tech_config();
        let err = tc.rule("minwidth_unobtainium").unwrap_err();
        assert!(matches!(err, Error::MissingRule(ref r) if r == "minwidth_unobtainium"));
        assert!(err.to_string().contains("minwidth_unobtainium"));
    }

    #[test]
    fn test_stack_path() -> Result<()> {
        let tc = sample::tech_config();
        let path = tc.stack_path("metal1", "metal3")?;
        let names = path.iter().map(|(n, _)| *n).collect::<Vec<_>>();
        assert_eq!(names, vec!["via1", "via2"]);

        let path = tc.stack_path("metal2", "poly")?;
        let names = path.iter().map(|(n, _)| *n).collect::<Vec<_>>();
        assert_eq!(names, vec!["via1", "poly_contact"]);

        assert!(tc.stack_path("metal1", "metal1")?.is_empty());
        assert!(matches!(
            tc.stack_path("metal1", "nwell"),
            Err(Error::NoStackBetween(_, _))
        ));
        Ok(())
    }

    #[test]
    fn test_unit_conversion() {
        let tc = sample::tech_config();
        assert_eq!(tc.um(0.6), 600);
        assert_eq!(tc.um(0.1234), 125);
        assert_relative_eq!(tc.to_um(600), 0.6);
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(sample::SAMPLE_DRC_CONFIG_TOML.as_bytes())?;
        let tc = TechConfig::load(file.path())?;
        assert_eq!(&tc, sample::tech_config());
        Ok(())
    }

    #[test]
    fn test_bad_stack_rejected() {
        let txt = r#"
            tech = "bad"
            grid = 5
            units = 1000
            routing_layers = []
            [rules]
            [layers.metal1]
            layernum = 1
            [stacks.broken]
            layers = ["metal1", "via1"]
        "#;
        assert!(matches!(
            TechConfig::from_toml(txt),
            Err(Error::InvalidParams(_))
        ));
    }
}
