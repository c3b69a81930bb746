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

//! A decomposable centipawn evaluator: material, piece-square tables,
//! mobility, pawn structure and king safety, plus a detailed mode that
//! exposes a per-square breakdown and a pressure heatmap for explainability.

use std::collections::HashMap;

use serde::Serialize;

use crate::attacks::{Direction, ATTACKS, DIAGONAL, ORTHOGONAL};
use crate::bitboard::Bitboard;
use crate::defs::{File, Piece, PieceType, Side, Square, PIECE_VALUES};
use crate::movegen::{is_square_attacked, mobility_targets};
use crate::position::Position;

const MOBILITY_WEIGHT: [i32; PieceType::TOTAL] = [1, 4, 5, 2, 1, 1];

#[rustfmt::skip]
const PAWN_PST: [i32; 64] = [
     0,  0,   0,   0,   0,   0,  0,  0,
     8, 10,  10, -12, -12,  10, 10,  8,
     5,  6,   8,  14,  14,   8,  6,  5,
     4,  5,   8,  24,  24,   8,  5,  4,
     2,  3,   7,  20,  20,   7,  3,  2,
     1,  1,   3,  10,  10,   3,  1,  1,
     0,  0,  -6,  -6,  -6,  -6,  0,  0,
     0,  0,   0,   0,   0,   0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_PST: [i32; 64] = [
    -45, -25, -20, -18, -18, -20, -25, -45,
    -20,  -4,   2,   6,   6,   2,  -4, -20,
    -10,   4,  10,  14,  14,  10,   4, -10,
     -8,   8,  15,  18,  18,  15,   8,  -8,
     -8,   8,  15,  18,  18,  15,   8,  -8,
    -10,   4,  10,  14,  14,  10,   4, -10,
    -20,  -4,   2,   6,   6,   2,  -4, -20,
    -45, -25, -20, -18, -18, -20, -25, -45,
];

#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
    -18,  -8,  -8,  -8,  -8,  -8,  -8, -18,
     -8,   5,   2,   2,   2,   2,   5,  -8,
     -6,   2,   8,   8,   8,   8,   2,  -6,
     -4,   5,   8,  12,  12,   8,   5,  -4,
     -4,   5,   8,  12,  12,   8,   5,  -4,
     -6,   2,   8,   8,   8,   8,   2,  -6,
     -8,   5,   2,   2,   2,   2,   5,  -8,
    -18,  -8,  -8,  -8,  -8,  -8,  -8, -18,
];

#[rustfmt::skip]
const ROOK_PST: [i32; 64] = [
     0,  4,  4,  7,  7,  4,  4,  0,
    -2,  0,  0,  2,  2,  0,  0, -2,
    -2,  0,  0,  2,  2,  0,  0, -2,
    -2,  0,  0,  2,  2,  0,  0, -2,
    -2,  0,  0,  2,  2,  0,  0, -2,
    -2,  0,  0,  2,  2,  0,  0, -2,
     5,  9,  9, 11, 11,  9,  9,  5,
     0,  4,  4,  7,  7,  4,  4,  0,
];

#[rustfmt::skip]
const QUEEN_PST: [i32; 64] = [
    -10, -6, -4, -2, -2, -4, -6, -10,
     -6, -2,  0,  1,  1,  0, -2,  -6,
     -4,  0,  1,  2,  2,  1,  0,  -4,
     -2,  1,  2,  3,  3,  2,  1,  -2,
     -2,  1,  2,  3,  3,  2,  1,  -2,
     -4,  0,  1,  2,  2,  1,  0,  -4,
     -6, -2,  0,  1,  1,  0, -2,  -6,
    -10, -6, -4, -2, -2, -4, -6, -10,
];

#[rustfmt::skip]
const KING_PST: [i32; 64] = [
     12,  24,   8,  -6,  -6,   8,  24,  12,
     12,  18,   2,  -8,  -8,   2,  18,  12,
      8,  10,  -4, -12, -12,  -4,  10,   8,
      3,   2,  -9, -16, -16,  -9,   2,   3,
     -2,  -6, -12, -20, -20, -12,  -6,  -2,
    -10, -12, -16, -22, -22, -16, -12, -10,
    -15, -14, -14, -14, -14, -14, -14, -15,
    -20, -16, -12, -10, -10, -12, -16, -20,
];

/// The piece-square table for `kind`, indexed by a white-oriented square.
fn pst_table(kind: PieceType) -> &'static [i32; 64] {
    match kind {
        PieceType::PAWN => &PAWN_PST,
        PieceType::KNIGHT => &KNIGHT_PST,
        PieceType::BISHOP => &BISHOP_PST,
        PieceType::ROOK => &ROOK_PST,
        PieceType::QUEEN => &QUEEN_PST,
        PieceType::KING => &KING_PST,
        _ => unreachable!("pst_table called with PieceType::NONE"),
    }
}

/// The five accumulated evaluation terms, summed across every piece of one
/// side.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct Components {
    pub material: i32,
    pub pst: i32,
    pub mobility: i32,
    pub pawn_structure: i32,
    pub king_safety: i32,
}

impl Components {
    /// The sum of all five terms.
    fn total(&self) -> i32 {
        self.material + self.pst + self.mobility + self.pawn_structure + self.king_safety
    }

    /// The white-minus-black difference of each term.
    fn net(white: &Self, black: &Self) -> Self {
        Self {
            material: white.material - black.material,
            pst: white.pst - black.pst,
            mobility: white.mobility - black.mobility,
            pawn_structure: white.pawn_structure - black.pawn_structure,
            king_safety: white.king_safety - black.king_safety,
        }
    }
}

/// Every term contributing to one piece's signed value, plus the value
/// itself.
#[derive(Clone, Debug, Serialize)]
pub struct PieceBreakdown {
    pub piece: String,
    pub side: String,
    pub base: i32,
    pub pst: i32,
    pub mobility: i32,
    pub pawn_structure: i32,
    pub king_safety: i32,
    pub total: i32,
    pub signed_total: i32,
}

/// The full explainable evaluation: summary score plus per-side, per-square
/// and per-piece breakdowns.
#[derive(Clone, Debug, Serialize)]
pub struct EvalDetails {
    pub score_cp: i32,
    pub score: f64,
    pub white_minus_black: i32,
    pub white: Components,
    pub black: Components,
    pub net: Components,
    pub piece_values: HashMap<String, i32>,
    pub piece_breakdown: HashMap<String, PieceBreakdown>,
    pub heatmap: HashMap<String, i32>,
}

/// The centipawn score from the side-to-move's perspective.
#[must_use]
pub fn evaluate(pos: &Position) -> i32 {
    let (white, black) = accumulate(pos);
    score_from_totals(pos, white.total(), black.total())
}

/// The full explainable evaluation: per-side components, a per-square
/// signed-value map, a per-piece breakdown, and the pressure heatmap.
#[must_use]
pub fn evaluate_detailed(pos: &Position) -> EvalDetails {
    let (white, black) = accumulate(pos);
    let white_total = white.total();
    let black_total = black.total();
    let score_cp = score_from_totals(pos, white_total, black_total);

    let mut piece_values = HashMap::new();
    let mut piece_breakdown = HashMap::new();

    for piece_idx in 0..Piece::TOTAL {
        let piece = Piece(piece_idx as i8);
        let side = piece.side_of();
        let kind = piece.kind_of();
        for sq in pos.piece_bb(piece) {
            let base = PIECE_VALUES[kind.0 as usize];
            let pst = pst_value(kind, side, sq);
            let mobility = mobility_value(pos, sq, kind, side);
            let pawn_structure = if kind == PieceType::PAWN {
                pawn_structure_delta(pos, side, sq)
            } else {
                0
            };
            let king_safety = if kind == PieceType::KING {
                king_safety_delta(pos, side)
            } else {
                0
            };
            let total = base + pst + mobility + pawn_structure + king_safety;
            let signed_total = if side.is_white() { total } else { -total };

            let key = sq.name();
            piece_values.insert(key.clone(), signed_total);
            piece_breakdown.insert(
                key,
                PieceBreakdown {
                    piece: piece.to_char().to_string(),
                    side: if side.is_white() { "w" } else { "b" }.to_string(),
                    base,
                    pst,
                    mobility,
                    pawn_structure,
                    king_safety,
                    total,
                    signed_total,
                },
            );
        }
    }

    EvalDetails {
        score_cp,
        score: f64::from(score_cp) / 100.0,
        white_minus_black: white_total - black_total,
        white,
        black,
        net: Components::net(&white, &black),
        piece_values,
        piece_breakdown,
        heatmap: pressure_heatmap(pos),
    }
}

/// The score awarded when the side to move has no legal moves: a
/// near-mate score (farther from zero the sooner it happens) if in check,
/// zero on stalemate.
#[must_use]
pub fn terminal_score(in_check: bool, ply: u16) -> i32 {
    if in_check {
        -100_000 + i32::from(ply)
    } else {
        0
    }
}

/// Folds both sides' totals into a single side-to-move-relative score.
fn score_from_totals(pos: &Position, white_total: i32, black_total: i32) -> i32 {
    let white_minus_black = white_total - black_total;
    if pos.side_to_move().is_white() {
        white_minus_black
    } else {
        -white_minus_black
    }
}

/// Sums material, pst, mobility and pawn-structure terms per side;
/// king safety is filled in afterward since it depends on the whole board.
fn accumulate(pos: &Position) -> (Components, Components) {
    let mut white = Components::default();
    let mut black = Components::default();

    for piece_idx in 0..Piece::TOTAL {
        let piece = Piece(piece_idx as i8);
        let side = piece.side_of();
        let kind = piece.kind_of();
        let totals = if side.is_white() { &mut white } else { &mut black };

        for sq in pos.piece_bb(piece) {
            totals.material += PIECE_VALUES[kind.0 as usize];
            totals.pst += pst_value(kind, side, sq);
            totals.mobility += mobility_value(pos, sq, kind, side);
            if kind == PieceType::PAWN {
                totals.pawn_structure += pawn_structure_delta(pos, side, sq);
            }
        }
    }

    white.king_safety = king_safety_delta(pos, Side::WHITE);
    black.king_safety = king_safety_delta(pos, Side::BLACK);

    (white, black)
}

/// The piece-square value of a `kind` on `sq`, mirrored for black.
fn pst_value(kind: PieceType, side: Side, sq: Square) -> i32 {
    let sq = if side.is_white() { sq } else { sq.mirror() };
    pst_table(kind)[sq.0 as usize]
}

/// The weighted legal-destination count for one piece; pawns score zero.
fn mobility_value(pos: &Position, sq: Square, kind: PieceType, side: Side) -> i32 {
    if kind == PieceType::PAWN {
        return 0;
    }
    let count = mobility_targets(pos, sq, kind, side).count() as i32;
    count * MOBILITY_WEIGHT[kind.0 as usize]
}

/// The files within `width` of `center`, inclusive, clipped to the board.
fn files_within(center: File, width: i8) -> Vec<File> {
    let mut files = Vec::new();
    for d in -width..=width {
        let f = i16::from(center.0) + i16::from(d);
        if (0..8).contains(&f) {
            files.push(File(f as u8));
        }
    }
    files
}

/// The pawn-structure penalty/bonus for one pawn: doubled, isolated and
/// passed checks, plus an advancement bonus when unblocked.
fn pawn_structure_delta(pos: &Position, side: Side, sq: Square) -> i32 {
    let own_pawns = pos.piece_bb(Piece::new(PieceType::PAWN, side));
    let enemy_pawns = pos.piece_bb(Piece::new(PieceType::PAWN, side.flip()));
    let file = sq.file();
    let rank = sq.rank().0;
    let mut delta = 0;

    if (own_pawns & Bitboard::file_bb(file)).count() > 1 {
        delta -= 14;
    }

    let has_adjacent_friend = files_within(file, 1)
        .into_iter()
        .filter(|&f| f.0 != file.0)
        .any(|f| !(own_pawns & Bitboard::file_bb(f)).is_empty());
    if !has_adjacent_friend {
        delta -= 12;
    }

    let blocked = files_within(file, 1).into_iter().any(|f| {
        (enemy_pawns & Bitboard::file_bb(f)).into_iter().any(|enemy_sq| {
            let enemy_rank = enemy_sq.rank().0;
            if side.is_white() {
                enemy_rank > rank
            } else {
                enemy_rank < rank
            }
        })
    });
    if !blocked {
        let advance = if side.is_white() { rank } else { 7 - rank };
        delta += 20 + i32::from(advance) * 6;
    }

    delta
}

/// A pawn-shield bonus and an attacked-ring penalty around `side`'s king.
fn king_safety_delta(pos: &Position, side: Side) -> i32 {
    let king_sq = pos.king_square(side);
    let own_pawn = Piece::new(PieceType::PAWN, side);
    let opponent = side.flip();

    let offsets: [i16; 3] = if side.is_white() { [7, 8, 9] } else { [-7, -8, -9] };
    let mut shield = 0;
    for offset in offsets {
        let target = i16::from(king_sq.0) + offset;
        if !(0..64).contains(&target) {
            continue;
        }
        let target_sq = Square(target as u8);
        let file_delta = i16::from(target_sq.file().0) - i16::from(king_sq.file().0);
        if file_delta.abs() > 1 {
            continue;
        }
        if pos.piece_on(target_sq) == own_pawn {
            shield += 6;
        } else {
            shield -= 8;
        }
    }

    let mut ring_penalty = 0;
    let ring = ATTACKS.king(king_sq) | Bitboard::from(king_sq);
    for sq in ring {
        if is_square_attacked(pos, sq, opponent) {
            ring_penalty -= 8;
        }
    }

    shield + ring_penalty
}

/// The set of squares one piece bears on for pressure-heatmap purposes:
/// leaper/pawn masks are used raw (a defended own square still counts),
/// sliders stop at the first blocker and exclude it when it is a friendly
/// piece.
fn pressure_squares(pos: &Position, sq: Square, kind: PieceType, side: Side) -> Bitboard {
    match kind {
        PieceType::PAWN => ATTACKS.pawn(sq, side),
        PieceType::KNIGHT => ATTACKS.knight(sq),
        PieceType::KING => ATTACKS.king(sq),
        PieceType::BISHOP => slider_pressure(pos, sq, &DIAGONAL),
        PieceType::ROOK => slider_pressure(pos, sq, &ORTHOGONAL),
        PieceType::QUEEN => slider_pressure(pos, sq, &ORTHOGONAL) | slider_pressure(pos, sq, &DIAGONAL),
        _ => Bitboard::empty(),
    }
}

/// The pressure squares of a sliding piece along `directions`: every empty
/// square up to and including the first blocker, excluding a friendly one.
fn slider_pressure(pos: &Position, sq: Square, directions: &[Direction]) -> Bitboard {
    let mut bb = Bitboard::empty();
    for &direction in directions {
        for &target in ATTACKS.ray(sq, direction) {
            let occupant = pos.piece_on(target);
            if occupant.is_none() {
                bb |= Bitboard::from(target);
                continue;
            }
            if occupant.side_of() != pos.piece_on(sq).side_of() {
                bb |= Bitboard::from(target);
            }
            break;
        }
    }
    bb
}

/// The board-wide pressure heatmap: net white-minus-black pressure per
/// square, zero entries omitted.
fn pressure_heatmap(pos: &Position) -> HashMap<String, i32> {
    let mut heat = [0i32; 64];

    for piece_idx in 0..Piece::TOTAL {
        let piece = Piece(piece_idx as i8);
        let side = piece.side_of();
        let kind = piece.kind_of();
        let sign = if side.is_white() { 1 } else { -1 };
        for sq in pos.piece_bb(piece) {
            for target in pressure_squares(pos, sq, kind, side) {
                heat[target.0 as usize] += sign;
            }
        }
    }

    heat.into_iter()
        .enumerate()
        .filter(|&(_, v)| v != 0)
        .map(|(i, v)| (Square(i as u8).name(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{evaluate, evaluate_detailed, terminal_score};
    use crate::position::Position;

    #[test]
    fn starting_position_material_matches_the_textbook_total() {
        let pos = Position::startpos();
        let details = evaluate_detailed(&pos);
        assert_eq!(details.net.material, 0);
        assert_eq!(details.white.material, 8 * 100 + 2 * 320 + 2 * 330 + 2 * 500 + 900);
    }

    #[test]
    fn detailed_breakdown_has_every_component_for_the_pushed_pawn() {
        let pos = Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
        )
        .unwrap();
        let details = evaluate_detailed(&pos);
        let e4 = details.piece_breakdown.get("e4").expect("white pawn on e4");
        assert_eq!(e4.piece, "P");
        assert_eq!(e4.side, "w");
    }

    #[test]
    fn breakdown_signed_totals_sum_to_the_net_score() {
        let pos = Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
        )
        .unwrap();
        let details = evaluate_detailed(&pos);
        let sum: i32 = details.piece_breakdown.values().map(|b| b.signed_total).sum();
        assert_eq!(sum, details.white_minus_black);
    }

    #[test]
    fn evaluation_is_symmetric_under_a_color_mirror() {
        let pos = Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
        )
        .unwrap();
        let mirrored = Position::from_fen(
            "rnbqkbnr/pppp1ppp/8/4p3/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(evaluate(&pos), evaluate(&mirrored));
    }

    #[test]
    fn terminal_score_prefers_longer_survival_when_in_check() {
        assert!(terminal_score(true, 0) < terminal_score(true, 4));
        assert_eq!(terminal_score(false, 3), 0);
    }
}
