/*
 * Lucent, a chess analysis core
 *
 * Lucent is free software: you can redistribute it and/or modify it under the
 * terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or (at your option) any later
 * version.
 *
 * Lucent is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
 * details.
 *
 * You should have received a copy of the GNU General Public License along with
 * Lucent. If not, see <https://www.gnu.org/licenses/>.
 */

//! Precomputed attack tables: knight and king leaper masks, per-side pawn
//! attack masks, and per-square ray square lists for the eight compass
//! directions. Construction is one-shot and deterministic; callers later
//! walk each ray until the first occupied square.

use lazy_static::lazy_static;

use crate::bitboard::Bitboard;
use crate::defs::{File, Rank, Side, Square};

/// One of the eight compass directions a sliding piece can move along.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Direction {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

/// All eight compass directions, diagonal directions last (used by bishops
/// and rooks to pick their four relevant directions via slicing).
pub const ORTHOGONAL: [Direction; 4] = [
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];

/// The four diagonal directions.
pub const DIAGONAL: [Direction; 4] = [
    Direction::NorthEast,
    Direction::NorthWest,
    Direction::SouthEast,
    Direction::SouthWest,
];

impl Direction {
    /// The (file, rank) step of one move in this direction.
    const fn delta(self) -> (i8, i8) {
        match self {
            Self::North => (0, 1),
            Self::South => (0, -1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
            Self::NorthEast => (1, 1),
            Self::NorthWest => (-1, 1),
            Self::SouthEast => (1, -1),
            Self::SouthWest => (-1, -1),
        }
    }
}

/// All the one-shot, process-lifetime attack tables.
pub struct AttackTables {
    /// `knight[square]` is the knight attack mask from that square.
    knight: [Bitboard; Square::TOTAL],
    /// `king[square]` is the king attack mask from that square.
    king: [Bitboard; Square::TOTAL],
    /// `pawn[side][square]` is the attack mask of a `side` pawn on that
    /// square.
    pawn: [[Bitboard; Square::TOTAL]; Side::TOTAL],
    /// `rays[square][direction]` is the ordered list of squares traversed
    /// from `square` towards the board edge along `direction`, nearest
    /// first, excluding `square` itself.
    rays: [[Vec<Square>; 8]; Square::TOTAL],
}

lazy_static! {
    /// The shared, immutable attack tables. Built once on first access.
    pub static ref ATTACKS: AttackTables = AttackTables::build();
}

/// The square one `delta` step from `square`, or `None` if that step would
/// leave the board.
fn step(square: Square, delta: (i8, i8)) -> Option<Square> {
    let file = i8::try_from(square.file().0).ok()? + delta.0;
    let rank = i8::try_from(square.rank().0).ok()? + delta.1;
    if !(0..8).contains(&file) || !(0..8).contains(&rank) {
        return None;
    }
    Some(Square::from_file_rank(File(file as u8), Rank(rank as u8)))
}

impl AttackTables {
    /// Computes every leaper mask and ray list for all 64 squares.
    fn build() -> Self {
        let mut knight = [Bitboard::empty(); Square::TOTAL];
        let mut king = [Bitboard::empty(); Square::TOTAL];
        let mut pawn = [[Bitboard::empty(); Square::TOTAL]; Side::TOTAL];
        let mut rays: [[Vec<Square>; 8]; Square::TOTAL] =
            std::array::from_fn(|_| std::array::from_fn(|_| Vec::new()));

        const KNIGHT_DELTAS: [(i8, i8); 8] = [
            (1, 2),
            (2, 1),
            (2, -1),
            (1, -2),
            (-1, -2),
            (-2, -1),
            (-2, 1),
            (-1, 2),
        ];
        const KING_DELTAS: [(i8, i8); 8] = [
            (0, 1),
            (1, 1),
            (1, 0),
            (1, -1),
            (0, -1),
            (-1, -1),
            (-1, 0),
            (-1, 1),
        ];
        const ALL_DIRECTIONS: [Direction; 8] = [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthEast,
            Direction::SouthWest,
        ];

        for sq in 0..Square::TOTAL as u8 {
            let square = Square(sq);

            let mut knight_bb = Bitboard::empty();
            for delta in KNIGHT_DELTAS {
                if let Some(target) = step(square, delta) {
                    knight_bb |= Bitboard::from(target);
                }
            }
            knight[sq as usize] = knight_bb;

            let mut king_bb = Bitboard::empty();
            for delta in KING_DELTAS {
                if let Some(target) = step(square, delta) {
                    king_bb |= Bitboard::from(target);
                }
            }
            king[sq as usize] = king_bb;

            if let Some(target) = step(square, (1, 1)) {
                pawn[Side::WHITE.0 as usize][sq as usize] |= Bitboard::from(target);
            }
            if let Some(target) = step(square, (-1, 1)) {
                pawn[Side::WHITE.0 as usize][sq as usize] |= Bitboard::from(target);
            }
            if let Some(target) = step(square, (1, -1)) {
                pawn[Side::BLACK.0 as usize][sq as usize] |= Bitboard::from(target);
            }
            if let Some(target) = step(square, (-1, -1)) {
                pawn[Side::BLACK.0 as usize][sq as usize] |= Bitboard::from(target);
            }

            for (dir_idx, direction) in ALL_DIRECTIONS.into_iter().enumerate() {
                let mut cur = square;
                let mut ray = Vec::new();
                while let Some(next) = step(cur, direction.delta()) {
                    ray.push(next);
                    cur = next;
                }
                rays[sq as usize][dir_idx] = ray;
            }
        }

        Self {
            knight,
            king,
            pawn,
            rays,
        }
    }

    /// The knight attack mask from `square`.
    #[must_use]
    pub fn knight(&self, square: Square) -> Bitboard {
        self.knight[square.0 as usize]
    }

    /// The king attack mask from `square`.
    #[must_use]
    pub fn king(&self, square: Square) -> Bitboard {
        self.king[square.0 as usize]
    }

    /// The pawn attack mask from `square` for the given side (the squares a
    /// pawn of that side standing on `square` would attack).
    #[must_use]
    pub fn pawn(&self, square: Square, side: Side) -> Bitboard {
        self.pawn[side.0 as usize][square.0 as usize]
    }

    /// The ordered list of squares traversed from `square` towards the edge
    /// of the board along `direction`, nearest first.
    #[must_use]
    pub fn ray(&self, square: Square, direction: Direction) -> &[Square] {
        &self.rays[square.0 as usize][direction_index(direction)]
    }
}

/// The index of `direction` into a per-square `[_; 8]` ray table.
const fn direction_index(direction: Direction) -> usize {
    match direction {
        Direction::North => 0,
        Direction::South => 1,
        Direction::East => 2,
        Direction::West => 3,
        Direction::NorthEast => 4,
        Direction::NorthWest => 5,
        Direction::SouthEast => 6,
        Direction::SouthWest => 7,
    }
}

#[cfg(test)]
mod tests {
    use super::{Direction, ATTACKS};
    use crate::defs::{Side, Square};

    #[test]
    fn knight_in_corner_has_two_targets() {
        let a1 = Square::from_name("a1").unwrap();
        assert_eq!(ATTACKS.knight(a1).count(), 2);
    }

    #[test]
    fn king_in_centre_has_eight_targets() {
        let d4 = Square::from_name("d4").unwrap();
        assert_eq!(ATTACKS.king(d4).count(), 8);
    }

    #[test]
    fn pawn_attacks_are_diagonal_and_side_specific() {
        let e4 = Square::from_name("e4").unwrap();
        let white = ATTACKS.pawn(e4, Side::WHITE);
        let black = ATTACKS.pawn(e4, Side::BLACK);
        assert_eq!(white.count(), 2);
        assert_eq!(black.count(), 2);
        assert_ne!(white, black);
    }

    #[test]
    fn ray_from_a1_north_covers_the_a_file() {
        let a1 = Square::from_name("a1").unwrap();
        let ray = ATTACKS.ray(a1, Direction::North);
        assert_eq!(ray.len(), 7);
        assert_eq!(ray[0], Square::from_name("a2").unwrap());
        assert_eq!(ray[6], Square::from_name("a8").unwrap());
    }

    #[test]
    fn ray_from_edge_towards_edge_is_empty() {
        let h1 = Square::from_name("h1").unwrap();
        assert!(ATTACKS.ray(h1, Direction::East).is_empty());
    }
}
