//! board representation - occupancy bitmask over a shared static layout
//! boards are small `Copy` values; applying a move always yields a new board

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::{hole_id, HoleId, Layout, Variant, COLUMNS, HOLES, ROWS};
use crate::symmetry::Symmetry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("hole {0} is outside the 7x7 grid")]
    OutOfRange(i64),
    #[error("hole {id} is not part of the {variant} board")]
    Disabled { id: HoleId, variant: Variant },
    #[error("snapshot enables holes {0:#015x} which match no board variant")]
    UnknownShape(u64),
}

/// Per-hole state as it travels in a snapshot.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
pub struct Cell {
    pub enabled: bool,
    pub occupied: bool,
}

/// Row-major list of all 49 cells.
pub type Snapshot = [Cell; HOLES];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "BoardRepr", into = "BoardRepr")]
pub struct Board {
    variant: Variant,
    occupied: u64,
}

#[derive(Serialize, Deserialize)]
struct BoardRepr {
    variant: Variant,
    empty: Vec<HoleId>,
}

impl TryFrom<BoardRepr> for Board {
    type Error = BoardError;

    fn try_from(repr: BoardRepr) -> Result<Self, Self::Error> {
        Board::new(repr.variant, &repr.empty)
    }
}

impl From<Board> for BoardRepr {
    fn from(board: Board) -> Self {
        Self {
            variant: board.variant,
            empty: board.empty_holes().collect(),
        }
    }
}

fn check_hole(variant: Variant, id: HoleId) -> Result<HoleId, BoardError> {
    if id as usize >= HOLES {
        return Err(BoardError::OutOfRange(id as i64));
    }
    if !variant.layout().is_enabled(id) {
        return Err(BoardError::Disabled { id, variant });
    }
    Ok(id)
}

impl Board {
    /// Every enabled hole filled except `empty`.
    pub fn new(variant: Variant, empty: &[HoleId]) -> Result<Self, BoardError> {
        let mut board = Self::full(variant);
        for &id in empty {
            board.set(check_hole(variant, id)?, false);
        }
        Ok(board)
    }

    /// Only the holes in `pegs` are filled.
    pub fn with_pegs(variant: Variant, pegs: &[HoleId]) -> Result<Self, BoardError> {
        let mut board = Self {
            variant,
            occupied: 0,
        };
        for &id in pegs {
            board.set(check_hole(variant, id)?, true);
        }
        Ok(board)
    }

    pub fn full(variant: Variant) -> Self {
        Self {
            variant,
            occupied: variant.layout().enabled_mask(),
        }
    }

    /// Full board with the centre hole empty.
    pub fn standard(variant: Variant) -> Self {
        let mut board = Self::full(variant);
        board.set(Layout::CENTER, false);
        board
    }

    /// Rebuild a board from a received snapshot. The variant is inferred from
    /// the enabled flags; an occupied disabled cell is rejected.
    pub fn from_snapshot(cells: &Snapshot) -> Result<Self, BoardError> {
        let mut enabled = 0u64;
        let mut occupied = 0u64;
        for (id, cell) in cells.iter().enumerate() {
            if cell.enabled {
                enabled |= 1u64 << id;
            }
            if cell.occupied {
                occupied |= 1u64 << id;
            }
        }
        let variant = Variant::from_enabled_mask(enabled).ok_or(BoardError::UnknownShape(enabled))?;
        let stray = occupied & !enabled;
        if stray != 0 {
            return Err(BoardError::Disabled {
                id: stray.trailing_zeros() as HoleId,
                variant,
            });
        }
        Ok(Self { variant, occupied })
    }

    pub fn snapshot(&self) -> Snapshot {
        let layout = self.layout();
        let mut cells = [Cell::default(); HOLES];
        for (id, cell) in cells.iter_mut().enumerate() {
            cell.enabled = layout.is_enabled(id as HoleId);
            cell.occupied = self.is_occupied(id as HoleId);
        }
        cells
    }

    #[inline]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[inline]
    pub fn layout(&self) -> &'static Layout {
        self.variant.layout()
    }

    #[inline(always)]
    pub fn is_occupied(&self, id: HoleId) -> bool {
        (self.occupied >> id) & 1 == 1
    }

    /// Enabled and without a peg.
    #[inline(always)]
    pub fn is_empty(&self, id: HoleId) -> bool {
        (self.empty_mask() >> id) & 1 == 1
    }

    /// Low-level occupancy write. Disabled holes are ignored.
    #[inline]
    pub fn set(&mut self, id: HoleId, occupied: bool) {
        if !self.layout().is_enabled(id) {
            return;
        }
        let mask = 1u64 << id;
        if occupied {
            self.occupied |= mask;
        } else {
            self.occupied &= !mask;
        }
    }

    #[inline(always)]
    pub fn occupied_mask(&self) -> u64 {
        self.occupied
    }

    /// Canonical dedup key: the set of empty enabled holes.
    #[inline(always)]
    pub fn empty_mask(&self) -> u64 {
        self.layout().enabled_mask() & !self.occupied
    }

    /// Empty enabled holes in ascending id order.
    pub fn empty_holes(&self) -> impl Iterator<Item = HoleId> {
        let mut bits = self.empty_mask();
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let id = bits.trailing_zeros() as HoleId;
            bits &= bits - 1;
            Some(id)
        })
    }

    pub fn pegs(&self) -> impl Iterator<Item = HoleId> {
        let occupied = self.occupied;
        (0..HOLES as HoleId).filter(move |&id| (occupied >> id) & 1 == 1)
    }

    /// Peg count of a full board of this variant.
    #[inline]
    pub fn total_pegs(&self) -> u32 {
        self.layout().hole_count()
    }

    #[inline]
    pub fn remaining_pegs(&self) -> u32 {
        self.total_pegs() - self.empty_mask().count_ones()
    }

    /// Same board after a rotation or reflection.
    pub fn transformed(&self, symmetry: Symmetry) -> Board {
        let empty = symmetry.apply_mask(self.empty_mask());
        Board {
            variant: self.variant,
            occupied: self.layout().enabled_mask() & !empty,
        }
    }

    /// Equal empty-hole sets under some symmetry of the board.
    pub fn equivalent(&self, other: &Board) -> bool {
        if self.variant != other.variant
            || self.empty_mask().count_ones() != other.empty_mask().count_ones()
        {
            return false;
        }
        let key = other.empty_mask();
        Symmetry::ALL
            .iter()
            .any(|sym| sym.apply_mask(self.empty_mask()) == key)
    }
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("variant", &self.variant)
            .field("empty", &self.empty_holes().collect::<Vec<_>>())
            .finish()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let layout = self.layout();
        for row in 0..ROWS {
            for col in 0..COLUMNS {
                let id = hole_id(row, col);
                let glyph = if !layout.is_enabled(id) {
                    "  "
                } else if self.is_occupied(id) {
                    "XX"
                } else {
                    ".."
                };
                write!(f, "{glyph}")?;
                if col + 1 < COLUMNS {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_board() {
        let b = Board::standard(Variant::English);
        assert_eq!(b.remaining_pegs(), 32);
        assert_eq!(b.empty_holes().collect::<Vec<_>>(), vec![24]);
        assert!(b.is_empty(24));
        assert!(!b.is_empty(0)); // disabled is never "empty"
        assert!(!b.is_occupied(0));
    }

    #[test]
    fn test_new_with_empties() {
        let b = Board::new(Variant::European, &[4, 10]).unwrap();
        assert_eq!(b.remaining_pegs(), 35);
        assert_eq!(b.total_pegs(), 37);
    }

    #[test]
    fn test_rejects_disabled_and_out_of_range() {
        assert_eq!(
            Board::new(Variant::English, &[0]),
            Err(BoardError::Disabled {
                id: 0,
                variant: Variant::English
            })
        );
        assert_eq!(
            Board::with_pegs(Variant::English, &[49]),
            Err(BoardError::OutOfRange(49))
        );
        assert!(Board::with_pegs(Variant::European, &[8]).is_ok());
    }

    #[test]
    fn test_with_pegs() {
        let b = Board::with_pegs(Variant::English, &[23, 24]).unwrap();
        assert_eq!(b.remaining_pegs(), 2);
        assert_eq!(b.pegs().collect::<Vec<_>>(), vec![23, 24]);
    }

    #[test]
    fn test_snapshot_roundtrip_and_shape_inference() {
        let b = Board::new(Variant::European, &[8, 24]).unwrap();
        let cells = b.snapshot();
        assert!(cells[8].enabled && !cells[8].occupied);
        assert!(!cells[0].enabled);
        assert_eq!(Board::from_snapshot(&cells), Ok(b));
    }

    #[test]
    fn test_snapshot_rejects_bad_shapes() {
        let mut cells = Board::full(Variant::English).snapshot();
        cells[0].enabled = true;
        assert!(matches!(
            Board::from_snapshot(&cells),
            Err(BoardError::UnknownShape(_))
        ));

        let mut cells = Board::full(Variant::English).snapshot();
        cells[0].occupied = true;
        assert!(matches!(
            Board::from_snapshot(&cells),
            Err(BoardError::Disabled { id: 0, .. })
        ));
    }

    #[test]
    fn test_set_ignores_disabled() {
        let mut b = Board::with_pegs(Variant::English, &[]).unwrap();
        b.set(0, true);
        assert_eq!(b.remaining_pegs(), 0);
        assert_eq!(b.occupied_mask(), 0);
    }

    #[test]
    fn test_equivalent_under_rotation() {
        let a = Board::new(Variant::English, &[2]).unwrap();
        // (0,2) rotated 90 degrees lands on (4,0)
        let b = Board::new(Variant::English, &[hole_id(4, 0)]).unwrap();
        let c = Board::new(Variant::English, &[3]).unwrap();
        assert!(a.equivalent(&b));
        assert!(!a.equivalent(&c));
        assert!(a.equivalent(&a));
    }

    #[test]
    fn test_serde_repr() {
        let b = Board::new(Variant::English, &[4, 24]).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, r#"{"variant":"english","empty":[4,24]}"#);
        let back: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(serde_json::from_str::<Board>(r#"{"variant":"english","empty":[0]}"#).is_err());
    }

    #[test]
    fn test_display_shape() {
        let text = Board::standard(Variant::English).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "      XX XX XX      ");
        assert_eq!(lines[3], "XX XX XX .. XX XX XX");
    }
}
