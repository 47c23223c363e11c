//! pegsol core crate - board topology, boards, jumps and symmetries.

mod board;
mod layout;
mod moves;
mod symmetry;

pub use board::{Board, BoardError, Cell, Snapshot};
pub use layout::{
    hole_id, row_col, Direction, Hole, HoleId, Layout, Variant, COLUMNS, HOLES, ROWS,
};
pub use moves::{Move, Suggestion};
pub use symmetry::Symmetry;
