use pegsol_core::{Board, Move};

use crate::movegen::has_moves;

/// Apply a jump and return the resulting board. The input is left untouched.
#[inline]
pub fn apply_move(board: &Board, mv: &Move) -> Board {
    let mut next = *board;
    next.set(mv.start, false);
    next.set(mv.jumped, false);
    next.set(mv.end, true);
    next
}

/// Undo a jump previously applied with `apply_move`.
#[inline]
pub fn unapply_move(board: &Board, mv: &Move) -> Board {
    let mut prev = *board;
    prev.set(mv.start, true);
    prev.set(mv.jumped, true);
    prev.set(mv.end, false);
    prev
}

/// One peg left and nothing to jump.
pub fn is_solved(board: &Board) -> bool {
    board.remaining_pegs() == 1 && !has_moves(board)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::generate_moves;
    use pegsol_core::Variant;

    #[test]
    fn test_apply_leaves_input_untouched() {
        let board = Board::standard(Variant::English);
        let mv = Move::new(10, 17, 24);
        let next = apply_move(&board, &mv);

        assert!(board.is_empty(24));
        assert!(board.is_occupied(10));
        assert!(next.is_empty(10));
        assert!(next.is_empty(17));
        assert!(next.is_occupied(24));
        assert_eq!(next.remaining_pegs(), board.remaining_pegs() - 1);
    }

    #[test]
    fn test_unapply_restores_every_child() {
        let board = Board::new(Variant::European, &[3, 24, 30]).unwrap();
        for mv in generate_moves(&board) {
            let next = apply_move(&board, &mv);
            assert_eq!(unapply_move(&next, &mv), board, "{mv}");
        }
    }

    #[test]
    fn test_is_solved() {
        let one = Board::with_pegs(Variant::English, &[24]).unwrap();
        assert!(is_solved(&one));

        let two = Board::with_pegs(Variant::English, &[23, 24]).unwrap();
        assert!(!is_solved(&two));
        assert!(is_solved(&apply_move(&two, &Move::new(23, 24, 25))));

        let stuck = Board::with_pegs(Variant::English, &[2, 4, 44]).unwrap();
        assert!(!is_solved(&stuck));
        assert!(generate_moves(&stuck).is_empty());
    }
}
