//! A generic technology bundled with the crate, used by tests and examples.

use lazy_static::lazy_static;

use super::TechConfig;

pub const SAMPLE_DRC_CONFIG_TOML: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tech/sample/drc_config.toml"
));

lazy_static! {
    static ref SAMPLE_TECH: TechConfig = match TechConfig::from_toml(SAMPLE_DRC_CONFIG_TOML) {
        Ok(tc) => tc,
        Err(e) => panic!("Error parsing sample tech config: {e}"),
    };
}

/// The bundled sample technology.
pub fn tech_config() -> &'static TechConfig {
    &SAMPLE_TECH
}
