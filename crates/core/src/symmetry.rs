//! rotations and reflections of the 7x7 grid, used to collapse equivalent positions
//! only six of the eight dihedral symmetries are used - the diagonal reflections are not

use crate::layout::{hole_id, row_col, HoleId, COLUMNS, HOLES, ROWS};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Symmetry {
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
    /// Rows flipped top to bottom.
    ReflectHorizontal,
    /// Columns flipped left to right.
    ReflectVertical,
}

/// HOLE_MAP[sym][id] - target hole of `id` under `sym`.
const HOLE_MAP: [[HoleId; HOLES]; 6] = {
    let mut table = [[0u8; HOLES]; 6];
    let mut sym = 0;
    while sym < 6 {
        let mut id = 0;
        while id < HOLES {
            let (r, c) = row_col(id as HoleId);
            let (tr, tc) = match sym {
                0 => (r, c),
                1 => (ROWS - 1 - c, r),
                2 => (ROWS - 1 - r, COLUMNS - 1 - c),
                3 => (c, ROWS - 1 - r),
                4 => (ROWS - 1 - r, c),
                _ => (r, COLUMNS - 1 - c),
            };
            table[sym][id] = hole_id(tr, tc);
            id += 1;
        }
        sym += 1;
    }
    table
};

impl Symmetry {
    pub const ALL: [Symmetry; 6] = [
        Symmetry::Identity,
        Symmetry::Rotate90,
        Symmetry::Rotate180,
        Symmetry::Rotate270,
        Symmetry::ReflectHorizontal,
        Symmetry::ReflectVertical,
    ];

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::Identity => 0,
            Self::Rotate90 => 1,
            Self::Rotate180 => 2,
            Self::Rotate270 => 3,
            Self::ReflectHorizontal => 4,
            Self::ReflectVertical => 5,
        }
    }

    #[inline]
    pub fn map_hole(self, id: HoleId) -> HoleId {
        HOLE_MAP[self.index()][id as usize]
    }

    /// Move every set bit of a hole mask to its image.
    pub fn apply_mask(self, mask: u64) -> u64 {
        if self == Symmetry::Identity {
            return mask;
        }
        let map = &HOLE_MAP[self.index()];
        let mut out = 0u64;
        let mut bits = mask;
        while bits != 0 {
            let id = bits.trailing_zeros() as usize;
            out |= 1u64 << map[id];
            bits &= bits - 1;
        }
        out
    }
}
