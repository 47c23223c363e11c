//! jump generation - scans empty holes outward, so every move lands on the hole being scanned
//! order is ascending hole id, then left/up/right/down; suggestion order depends on it

use pegsol_core::{Board, Direction, HoleId, Move};
use smallvec::SmallVec;

/// Stack-allocated for the common case; an open board rarely exceeds a few dozen jumps.
pub type MoveList = SmallVec<[Move; 32]>;

#[inline(always)]
fn jump_into(board: &Board, end: HoleId, direction: Direction) -> Option<Move> {
    let layout = board.layout();
    let near = layout.hole(end).neighbor(direction)?;
    if !board.is_occupied(near) {
        return None;
    }
    let far = layout.hole(near).neighbor(direction)?;
    if !board.is_occupied(far) {
        return None;
    }
    Some(Move::new(far, near, end))
}

/// All legal jumps of `board`, in deterministic order.
pub fn generate_moves(board: &Board) -> MoveList {
    let mut moves = MoveList::new();
    for end in board.empty_holes() {
        for direction in Direction::ALL {
            if let Some(mv) = jump_into(board, end, direction) {
                moves.push(mv);
            }
        }
    }
    moves
}

pub fn count_moves(board: &Board) -> usize {
    board
        .empty_holes()
        .map(|end| {
            Direction::ALL
                .iter()
                .filter(|&&d| jump_into(board, end, d).is_some())
                .count()
        })
        .sum()
}

pub fn has_moves(board: &Board) -> bool {
    board
        .empty_holes()
        .any(|end| Direction::ALL.iter().any(|&d| jump_into(board, end, d).is_some()))
}

/// Validate one jump as a player would enter it.
pub fn is_valid_move(board: &Board, mv: &Move) -> bool {
    if !board.is_empty(mv.end) {
        return false;
    }
    Direction::ALL
        .iter()
        .any(|&d| jump_into(board, mv.end, d) == Some(*mv))
}
