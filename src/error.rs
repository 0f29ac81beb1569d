use arcstr::ArcStr;
use thiserror::Error;

use crate::layout::Phase;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unknown device type: {0}")]
    UnknownDevice(String),

    #[error("instance `{inst}` of cell `{cell}` has {found} connections, but the cell declares {expected} ports")]
    BindingArity {
        inst: ArcStr,
        cell: ArcStr,
        expected: usize,
        found: usize,
    },

    #[error("pin `{name}` is ambiguous: found on instances {}", .insts.join(", "))]
    AmbiguousPin { name: ArcStr, insts: Vec<String> },

    #[error("no pin named `{name}` in cell `{cell}`")]
    MissingPin { name: ArcStr, cell: ArcStr },

    #[error("no such instance: {0}")]
    MissingInstance(ArcStr),

    #[error("design rule `{0}` is not defined by the technology")]
    MissingRule(String),

    #[error("unknown layer: {0}")]
    UnknownLayer(String),

    #[error("unknown contact stack: {0}")]
    UnknownStack(String),

    #[error("no contact stack connects `{0}` and `{1}`")]
    NoStackBetween(String, String),

    #[error("duplicate track name in one bus allocation: {0}")]
    DuplicateTrack(ArcStr),

    #[error("no track named `{0}`")]
    UnknownTrack(ArcStr),

    #[error("segment from ({}, {}) to ({}, {}) is not Manhattan", .0.x, .0.y, .1.x, .1.y)]
    NonManhattan(crate::geometry::Point, crate::geometry::Point),

    #[error("cannot enter phase {next:?} of cell `{cell}` after phase {current:?}")]
    PhaseViolation {
        cell: ArcStr,
        current: Phase,
        next: Phase,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing config: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
