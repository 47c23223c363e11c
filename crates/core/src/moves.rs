//! Jump and suggestion definitions.

use serde::{Deserialize, Serialize};

use crate::layout::HoleId;

/// A single jump: the peg on `start` leaps over `jumped` into `end`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Move {
    pub start: HoleId,
    pub jumped: HoleId,
    pub end: HoleId,
}

impl Move {
    pub const fn new(start: HoleId, jumped: HoleId, end: HoleId) -> Self {
        Self { start, jumped, end }
    }

    pub fn suggestion(&self) -> Suggestion {
        Suggestion {
            start: self.start,
            end: self.end,
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "peg{} -> peg{} (discard peg{})",
            self.start, self.end, self.jumped
        )
    }
}

/// What the front end shows the player: where to pick up and where to land.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Suggestion {
    pub start: HoleId,
    pub end: HoleId,
}

impl From<Move> for Suggestion {
    fn from(mv: Move) -> Self {
        mv.suggestion()
    }
}
