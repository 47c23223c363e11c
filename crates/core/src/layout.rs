//! fixed board topology - holes, neighbours and the two cross-shaped variants
//! tables are built in const context, one per variant, and shared by every board

use serde::{Deserialize, Serialize};

pub const ROWS: usize = 7;
pub const COLUMNS: usize = 7;
pub const HOLES: usize = ROWS * COLUMNS;

/// Index of a hole, `row * COLUMNS + col`.
pub type HoleId = u8;

#[inline]
pub const fn hole_id(row: usize, col: usize) -> HoleId {
    (row * COLUMNS + col) as HoleId
}

#[inline]
pub const fn row_col(id: HoleId) -> (usize, usize) {
    (id as usize / COLUMNS, id as usize % COLUMNS)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    /// Scan order used by move generation.
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Up,
        Direction::Right,
        Direction::Down,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Up => 1,
            Self::Right => 2,
            Self::Down => 3,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// 33 holes.
    #[default]
    English,
    /// 37 holes - English plus the four holes diagonal to the inner corners.
    European,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::English, Variant::European];

    #[inline]
    pub fn layout(self) -> &'static Layout {
        match self {
            Self::English => &ENGLISH,
            Self::European => &EUROPEAN,
        }
    }

    /// Number of playable holes, i.e. the peg count of a full board.
    #[inline]
    pub fn hole_count(self) -> u32 {
        self.layout().enabled_mask().count_ones()
    }

    /// Recover the variant from the set of enabled holes.
    pub fn from_enabled_mask(mask: u64) -> Option<Variant> {
        Self::ALL
            .into_iter()
            .find(|variant| variant.layout().enabled_mask() == mask)
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::English => f.write_str("english"),
            Self::European => f.write_str("european"),
        }
    }
}

impl std::str::FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "english" => Ok(Self::English),
            "european" => Ok(Self::European),
            other => Err(format!("unknown board variant '{other}'")),
        }
    }
}

/// One cell of the 7x7 grid. Neighbours are plain indices into the layout.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Hole {
    pub id: HoleId,
    pub enabled: bool,
    neighbors: [Option<HoleId>; 4],
}

impl Hole {
    #[inline]
    pub fn neighbor(&self, direction: Direction) -> Option<HoleId> {
        self.neighbors[direction.index()]
    }
}

pub struct Layout {
    variant: Variant,
    holes: [Hole; HOLES],
    enabled: u64,
}

static ENGLISH: Layout = Layout::build(Variant::English);
static EUROPEAN: Layout = Layout::build(Variant::European);

const fn is_corner(row: usize, col: usize) -> bool {
    (row < 2 || row >= ROWS - 2) && (col < 2 || col >= COLUMNS - 2)
}

const fn is_european_extra(row: usize, col: usize) -> bool {
    (row == 1 || row == ROWS - 2) && (col == 1 || col == COLUMNS - 2)
}

impl Layout {
    const fn build(variant: Variant) -> Self {
        let european = matches!(variant, Variant::European);
        let mut holes = [Hole {
            id: 0,
            enabled: false,
            neighbors: [None; 4],
        }; HOLES];
        let mut enabled = 0u64;

        let mut row = 0;
        while row < ROWS {
            let mut col = 0;
            while col < COLUMNS {
                let id = hole_id(row, col);
                let on = !is_corner(row, col) || (european && is_european_extra(row, col));
                if on {
                    enabled |= 1u64 << id;
                }
                // links exist even towards disabled holes; movegen checks `enabled`
                holes[id as usize] = Hole {
                    id,
                    enabled: on,
                    neighbors: [
                        if col > 0 { Some(hole_id(row, col - 1)) } else { None },
                        if row > 0 { Some(hole_id(row - 1, col)) } else { None },
                        if col + 1 < COLUMNS { Some(hole_id(row, col + 1)) } else { None },
                        if row + 1 < ROWS { Some(hole_id(row + 1, col)) } else { None },
                    ],
                };
                col += 1;
            }
            row += 1;
        }

        Self {
            variant,
            holes,
            enabled,
        }
    }

    #[inline]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    #[inline]
    pub fn hole(&self, id: HoleId) -> &Hole {
        &self.holes[id as usize]
    }

    #[inline]
    pub fn is_enabled(&self, id: HoleId) -> bool {
        (id as usize) < HOLES && (self.enabled >> id) & 1 == 1
    }

    #[inline]
    pub fn enabled_mask(&self) -> u64 {
        self.enabled
    }

    #[inline]
    pub fn hole_count(&self) -> u32 {
        self.enabled.count_ones()
    }

    /// Centre hole - the conventional starting vacancy.
    pub const CENTER: HoleId = hole_id(ROWS / 2, COLUMNS / 2);
}

impl std::fmt::Debug for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layout")
            .field("variant", &self.variant)
            .field("holes", &self.hole_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hole_counts() {
        assert_eq!(Variant::English.hole_count(), 33);
        assert_eq!(Variant::European.hole_count(), 37);
    }

    #[test]
    fn test_corners_disabled() {
        let layout = Variant::English.layout();
        for &(row, col) in &[(0, 0), (0, 1), (1, 0), (1, 1), (5, 5), (6, 6), (0, 6), (6, 0)] {
            assert!(!layout.is_enabled(hole_id(row, col)), "({row},{col})");
        }
        assert!(layout.is_enabled(hole_id(0, 2)));
        assert!(layout.is_enabled(Layout::CENTER));
    }

    #[test]
    fn test_european_extras() {
        let layout = Variant::European.layout();
        assert!(layout.is_enabled(hole_id(1, 1)));
        assert!(layout.is_enabled(hole_id(5, 5)));
        assert!(!layout.is_enabled(hole_id(0, 0)));
        assert!(!Variant::English.layout().is_enabled(hole_id(1, 5)));
    }

    #[test]
    fn test_neighbors() {
        let layout = Variant::English.layout();
        let center = layout.hole(24);
        assert_eq!(center.neighbor(Direction::Left), Some(23));
        assert_eq!(center.neighbor(Direction::Up), Some(17));
        assert_eq!(center.neighbor(Direction::Right), Some(25));
        assert_eq!(center.neighbor(Direction::Down), Some(31));

        let top = layout.hole(3);
        assert_eq!(top.neighbor(Direction::Up), None);
        let edge = layout.hole(hole_id(3, 6));
        assert_eq!(edge.neighbor(Direction::Right), None);
    }

    #[test]
    fn test_variant_from_mask() {
        for variant in Variant::ALL {
            assert_eq!(
                Variant::from_enabled_mask(variant.layout().enabled_mask()),
                Some(variant)
            );
        }
        assert_eq!(Variant::from_enabled_mask(0), None);
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("English".parse::<Variant>(), Ok(Variant::English));
        assert_eq!("european".parse::<Variant>(), Ok(Variant::European));
        assert!("triangle".parse::<Variant>().is_err());
    }
}
