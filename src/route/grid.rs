//! A uniform grid of routing tracks.

use arcstr::ArcStr;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{snap_to_grid, Dir, Int, Point, Span};

use super::bus::{allocate, TrackAllocation};

#[derive(Debug, Clone, Eq, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct Grid {
    line: Int,
    space: Int,
    /// The center of track 0 in both directions.
    center: Point,
    grid: Int,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TrackLocator {
    /// The track nearest a position.
    Nearest,
    /// The track nearest a position that starts beyond that position.
    StartsBeyond,
    /// The track nearest a position that ends before that position.
    EndsBefore,
}

impl GridBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        let grid = self.grid.unwrap_or(1);
        if grid <= 0 {
            return Err(format!("manufacturing grid must be positive, got {grid}"));
        }
        if let Some(line) = self.line {
            if line <= 0 || line % grid != 0 {
                return Err(format!("track width {line} must be a positive multiple of {grid}"));
            }
        }
        if let Some(space) = self.space {
            if space < 0 || space % grid != 0 {
                return Err(format!("track space {space} must be a multiple of {grid}"));
            }
        }
        if let (Some(line), Some(center)) = (self.line, self.center) {
            for c in [center.x, center.y] {
                if (c - line / 2) % grid != 0 {
                    return Err(format!(
                        "track 0 centered at {c} does not start on the {grid} grid"
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Grid {
    #[inline]
    pub fn pitch(&self) -> Int {
        self.line + self.space
    }

    /// The `i`-th track running in the given direction.
    pub fn track(&self, dir: Dir, i: Int) -> Span {
        let start = self.center.coord(!dir) - self.line / 2;
        let tstart = start + i * self.pitch();
        debug_assert_eq!(tstart % self.grid, 0);
        Span::new(tstart, tstart + self.line)
    }

    /// The `i`-th horizontal (East to West / West to East) track.
    #[inline]
    pub fn htrack(&self, i: Int) -> Span {
        self.track(Dir::Horiz, i)
    }

    /// The `i`-th vertical (North to South / South to North) track.
    #[inline]
    pub fn vtrack(&self, i: Int) -> Span {
        self.track(Dir::Vert, i)
    }

    /// Gets the index of the track in the given direction nearest to `pos`.
    pub fn get_track_index(&self, dir: Dir, pos: Int, loc: TrackLocator) -> Int {
        let m = self.pitch();
        let idx = snap_to_grid(pos - self.center.coord(!dir), m).div_euclid(m);
        let track = self.track(dir, idx);

        match loc {
            TrackLocator::Nearest => idx,
            TrackLocator::StartsBeyond => {
                if pos > track.start() {
                    idx + 1
                } else {
                    idx
                }
            }
            TrackLocator::EndsBefore => {
                if track.stop() <= pos {
                    idx
                } else {
                    idx - 1
                }
            }
        }
    }

    /// Gets the track in the given direction nearest to `pos`.
    pub fn get_track(&self, dir: Dir, pos: Int, loc: TrackLocator) -> Span {
        self.track(dir, self.get_track_index(dir, pos, loc))
    }

    /// Assigns consecutive tracks in direction `dir`, starting from track
    /// `first`, to `names`.
    pub fn allocate<I, S>(&self, names: I, dir: Dir, first: Int) -> Result<TrackAllocation>
    where
        I: IntoIterator<Item = S>,
        S: Into<ArcStr>,
    {
        let start = self.center.coord(!dir) + first * self.pitch();
        allocate(names, self.pitch(), start, dir)
    }

    #[inline]
    pub fn builder() -> GridBuilder {
        GridBuilder::default()
    }
}
