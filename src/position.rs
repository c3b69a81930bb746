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

//! The position representation: piece-placement bitboards, side to move,
//! castling rights, en-passant target, move counters, and a history stack
//! that lets [`Position::make_move`] be exactly reversed by
//! [`Position::unmake_move`].

use std::fmt::{self, Display, Formatter};

use crate::bitboard::Bitboard;
use crate::defs::{File, Piece, PieceType, Rank, Side, Square};
use crate::error::ParseError;
use crate::movegen::Move;

/// White can castle kingside.
pub const CASTLE_WK: u8 = 1;
/// White can castle queenside.
pub const CASTLE_WQ: u8 = 2;
/// Black can castle kingside.
pub const CASTLE_BK: u8 = 4;
/// Black can castle queenside.
pub const CASTLE_BQ: u8 = 8;

/// Index into `occupancies` for the union of both sides.
const OCC_BOTH: usize = 2;

/// Everything needed to exactly reverse one `make_move`.
#[derive(Clone, Copy, Debug)]
struct Undo {
    /// The move being reversed.
    mv: Move,
    /// The piece it captured, or [`Piece::NONE`].
    captured: Piece,
    /// Castling rights as they stood before the move.
    castling_rights: u8,
    /// The en-passant target square as it stood before the move.
    en_passant: Square,
    /// The halfmove clock as it stood before the move.
    halfmove_clock: u32,
}

/// A chess position: bitboards, state, and a reversible move-application
/// interface via `make_move`/`unmake_move`.
///
/// Invariants (see the specification's data model):
/// - the twelve piece bitboards are mutually disjoint and their union equals
///   the "both sides" occupancy bitboard;
/// - `make_move` followed by `unmake_move` restores every field bit-exactly;
/// - `castling_rights` only loses bits during a search; `unmake_move`
///   restores it exactly from the undo record;
/// - `en_passant` is set only immediately after a double pawn push.
#[derive(Clone)]
pub struct Position {
    piece_bb: [Bitboard; Piece::TOTAL],
    occupancies: [Bitboard; 3],
    mailbox: [Piece; Square::TOTAL],
    side_to_move: Side,
    castling_rights: u8,
    en_passant: Square,
    halfmove_clock: u32,
    fullmove_number: u32,
    history: Vec<Undo>,
}

impl Position {
    /// An empty position with no pieces, side to move white.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            piece_bb: [Bitboard::empty(); Piece::TOTAL],
            occupancies: [Bitboard::empty(); 3],
            mailbox: [Piece::NONE; Square::TOTAL],
            side_to_move: Side::WHITE,
            castling_rights: 0,
            en_passant: Square::NONE,
            halfmove_clock: 0,
            fullmove_number: 1,
            history: Vec::new(),
        }
    }

    /// The standard starting position.
    #[must_use]
    pub fn startpos() -> Self {
        Self::from_fen(crate::START_FEN).expect("the starting FEN is well-formed")
    }

    /// Parses a standard six-field FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, ParseError> {
        let mut pos = Self::empty();
        let mut fields = fen.split_whitespace();

        let placement = fields.next().ok_or(ParseError::ExpectedToken)?;
        let mut rank = 7u8;
        let mut file = 0u8;
        for c in placement.chars() {
            match c {
                '/' => {
                    if rank == 0 {
                        return Err(ParseError::ErroneousToken);
                    }
                    rank -= 1;
                    file = 0;
                }
                '1'..='8' => {
                    file += c as u8 - b'0';
                }
                _ => {
                    if file >= 8 {
                        return Err(ParseError::ErroneousToken);
                    }
                    let piece = Piece::from_char(c)?;
                    let sq = Square::from_file_rank(File(file), Rank(rank));
                    pos.add_piece(sq, piece);
                    file += 1;
                }
            }
        }

        let side = fields.next().ok_or(ParseError::ExpectedToken)?;
        pos.side_to_move = match side {
            "w" => Side::WHITE,
            "b" => Side::BLACK,
            _ => return Err(ParseError::InvalidToken),
        };

        let castling = fields.next().ok_or(ParseError::ExpectedToken)?;
        if castling != "-" {
            for c in castling.chars() {
                pos.castling_rights |= match c {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    _ => return Err(ParseError::InvalidToken),
                };
            }
        }

        let ep = fields.next().ok_or(ParseError::ExpectedToken)?;
        pos.en_passant = if ep == "-" {
            Square::NONE
        } else {
            Square::from_name(ep)?
        };

        pos.halfmove_clock = fields.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        pos.fullmove_number = fields.next().and_then(|s| s.parse().ok()).unwrap_or(1);

        Ok(pos)
    }

    /// Formats the position as a standard six-field FEN string.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for rank in (0..8u8).rev() {
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let sq = Square::from_file_rank(File(file), Rank(rank));
                let piece = self.piece_on(sq);
                if piece.is_none() {
                    empty_run += 1;
                } else {
                    if empty_run > 0 {
                        placement.push((b'0' + empty_run) as char);
                        empty_run = 0;
                    }
                    placement.push(piece.to_char());
                }
            }
            if empty_run > 0 {
                placement.push((b'0' + empty_run) as char);
            }
            if rank > 0 {
                placement.push('/');
            }
        }

        let side = if self.side_to_move.is_white() { "w" } else { "b" };

        let mut castling = String::new();
        if self.castling_rights & CASTLE_WK != 0 {
            castling.push('K');
        }
        if self.castling_rights & CASTLE_WQ != 0 {
            castling.push('Q');
        }
        if self.castling_rights & CASTLE_BK != 0 {
            castling.push('k');
        }
        if self.castling_rights & CASTLE_BQ != 0 {
            castling.push('q');
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let ep = if self.en_passant == Square::NONE {
            "-".to_string()
        } else {
            self.en_passant.name()
        };

        format!(
            "{placement} {side} {castling} {ep} {} {}",
            self.halfmove_clock, self.fullmove_number
        )
    }

    /// O(1) lookup of the piece on `square`, or [`Piece::NONE`].
    #[must_use]
    pub fn piece_on(&self, square: Square) -> Piece {
        self.mailbox[square.0 as usize]
    }

    #[must_use]
    pub const fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    #[must_use]
    pub const fn castling_rights(&self) -> u8 {
        self.castling_rights
    }

    #[must_use]
    pub const fn en_passant(&self) -> Square {
        self.en_passant
    }

    #[must_use]
    pub const fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[must_use]
    pub const fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// The bitboard of all pieces of a single piece kind (one of the twelve).
    #[must_use]
    pub fn piece_bb(&self, piece: Piece) -> Bitboard {
        self.piece_bb[piece.0 as usize]
    }

    /// The bitboard of every piece (of either kind) belonging to `side`.
    #[must_use]
    pub fn occupancy(&self, side: Side) -> Bitboard {
        self.occupancies[side.0 as usize]
    }

    /// The bitboard of every occupied square, either side.
    #[must_use]
    pub fn occupancy_both(&self) -> Bitboard {
        self.occupancies[OCC_BOTH]
    }

    /// The square of `side`'s king. Panics if that side has no king, which
    /// should never happen while a search is running (see the data-model
    /// invariant: exactly one king bit per side).
    #[must_use]
    pub fn king_square(&self, side: Side) -> Square {
        let king = Piece::new(PieceType::KING, side);
        let mut bb = self.piece_bb(king);
        debug_assert!(!bb.is_empty(), "position has no king for {side:?}");
        bb.pop_next_square()
    }

    /// Places `piece` on `sq`, updating the mailbox and both occupancy
    /// bitboards. `sq` must currently be empty.
    fn add_piece(&mut self, sq: Square, piece: Piece) {
        self.mailbox[sq.0 as usize] = piece;
        let bb = Bitboard::from(sq);
        self.piece_bb[piece.0 as usize] |= bb;
        self.occupancies[piece.side_of().0 as usize] |= bb;
        self.occupancies[OCC_BOTH] |= bb;
    }

    /// Clears `piece` off `sq`, updating the mailbox and both occupancy
    /// bitboards. `piece` must currently occupy `sq`.
    fn remove_piece(&mut self, sq: Square, piece: Piece) {
        self.mailbox[sq.0 as usize] = Piece::NONE;
        let bb = Bitboard::from(sq);
        self.piece_bb[piece.0 as usize] &= !bb;
        self.occupancies[piece.side_of().0 as usize] &= !bb;
        self.occupancies[OCC_BOTH] &= !bb;
    }

    /// Relocates `piece` from `from` to `to`; `to` must currently be empty.
    fn move_piece(&mut self, from: Square, to: Square, piece: Piece) {
        self.remove_piece(from, piece);
        self.add_piece(to, piece);
    }

    /// Applies `mv`, which is assumed to be pseudo-legal for the side to
    /// move. Pushes an undo record so a matching [`Self::unmake_move`]
    /// restores every field bit-exactly.
    ///
    /// This does not check whether the move leaves the mover's own king in
    /// check: that legality filter lives in
    /// [`generate_legal_moves`](crate::movegen::generate_legal_moves), which
    /// drives `make_move`/`unmake_move` to decide.
    pub fn make_move(&mut self, mv: Move) {
        let us = self.side_to_move;
        let them = us.flip();

        self.history.push(Undo {
            mv,
            captured: mv.captured,
            castling_rights: self.castling_rights,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
        });

        self.en_passant = Square::NONE;

        if mv.piece.kind_of() == PieceType::PAWN || !mv.captured.is_none() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if us == Side::BLACK {
            self.fullmove_number += 1;
        }

        if mv.is_en_passant {
            let captured_sq = Square(if us.is_white() { mv.to.0 - 8 } else { mv.to.0 + 8 });
            let captured_pawn = Piece::new(PieceType::PAWN, them);
            self.remove_piece(captured_sq, captured_pawn);
            self.move_piece(mv.from, mv.to, mv.piece);
        } else if !mv.captured.is_none() {
            self.remove_piece(mv.to, mv.captured);
            self.move_piece(mv.from, mv.to, mv.piece);
        } else {
            self.move_piece(mv.from, mv.to, mv.piece);
        }

        if mv.is_castle {
            let (rook_from, rook_to) = castle_rook_squares(mv.to);
            let rook = Piece::new(PieceType::ROOK, us);
            self.move_piece(rook_from, rook_to, rook);
        }

        if mv.promotion != PieceType::NONE {
            let pawn = Piece::new(PieceType::PAWN, us);
            self.remove_piece(mv.to, pawn);
            self.add_piece(mv.to, Piece::new(mv.promotion, us));
        }

        if mv.is_double_push {
            self.en_passant = Square((mv.from.0 + mv.to.0) / 2);
        }

        self.castling_rights &= !castling_rights_cleared_by(mv.from);
        self.castling_rights &= !castling_rights_cleared_by(mv.to);

        self.side_to_move = them;
    }

    /// Reverses the most recent `make_move`. Panics if there is no move to
    /// unmake.
    pub fn unmake_move(&mut self) {
        let undo = self.history.pop().expect("unmake_move with empty history");
        let mv = undo.mv;
        let them = self.side_to_move;
        let us = them.flip();

        self.side_to_move = us;
        self.castling_rights = undo.castling_rights;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        if us == Side::BLACK {
            self.fullmove_number -= 1;
        }

        if mv.promotion != PieceType::NONE {
            let promoted = Piece::new(mv.promotion, us);
            self.remove_piece(mv.to, promoted);
            self.add_piece(mv.to, Piece::new(PieceType::PAWN, us));
        }

        if mv.is_castle {
            let (rook_from, rook_to) = castle_rook_squares(mv.to);
            let rook = Piece::new(PieceType::ROOK, us);
            self.move_piece(rook_to, rook_from, rook);
        }

        self.move_piece(mv.to, mv.from, mv.piece);

        if mv.is_en_passant {
            let captured_sq = Square(if us.is_white() { mv.to.0 - 8 } else { mv.to.0 + 8 });
            let captured_pawn = Piece::new(PieceType::PAWN, them);
            self.add_piece(captured_sq, captured_pawn);
        } else if !mv.captured.is_none() {
            self.add_piece(mv.to, mv.captured);
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            for file in 0..8u8 {
                let sq = Square::from_file_rank(File(file), Rank(rank));
                write!(f, "{} ", self.piece_on(sq).to_char())?;
            }
            writeln!(f)?;
        }
        write!(f, "FEN: {}", self.to_fen())
    }
}

/// Which castling rights `make_move` clears when a piece moves from or a
/// rook is captured on one of the four corner squares (or when a king
/// leaves its home square).
fn castling_rights_cleared_by(sq: Square) -> u8 {
    match sq.0 {
        0 => CASTLE_WQ,      // a1
        4 => CASTLE_WK | CASTLE_WQ, // e1
        7 => CASTLE_WK,      // h1
        56 => CASTLE_BQ,     // a8
        60 => CASTLE_BK | CASTLE_BQ, // e8
        63 => CASTLE_BK,     // h8
        _ => 0,
    }
}

/// The rook's (from, to) squares for a castling move, given the king's
/// destination square.
fn castle_rook_squares(king_to: Square) -> (Square, Square) {
    match king_to.0 {
        6 => (Square(7), Square(5)),   // e1g1: h1 -> f1
        2 => (Square(0), Square(3)),   // e1c1: a1 -> d1
        62 => (Square(63), Square(61)), // e8g8: h8 -> f8
        58 => (Square(56), Square(59)), // e8c8: a8 -> d8
        _ => unreachable!("castling move with an invalid king destination"),
    }
}

#[cfg(test)]
mod tests {
    use super::Position;
    use crate::movegen::generate_legal_moves;

    #[test]
    fn fen_round_trips_on_the_starting_position() {
        let pos = Position::startpos();
        assert_eq!(pos.to_fen(), crate::START_FEN);
    }

    #[test]
    fn fen_round_trips_on_an_arbitrary_position() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let pos = Position::from_fen(fen).unwrap();
        assert_eq!(pos.to_fen(), fen);
    }

    #[test]
    fn make_then_unmake_restores_every_field() {
        let mut pos = Position::startpos();
        let before = pos.to_fen();
        for mv in generate_legal_moves(&pos) {
            pos.make_move(mv);
            pos.unmake_move();
            assert_eq!(pos.to_fen(), before);
        }
    }

    #[test]
    fn make_then_unmake_restores_through_several_plies() {
        let mut pos = Position::startpos();
        let mut fens = Vec::new();
        for _ in 0..4 {
            fens.push(pos.to_fen());
            let moves = generate_legal_moves(&pos);
            let mv = *moves.first().expect("startpos-derived positions have moves");
            pos.make_move(mv);
        }
        for fen in fens.into_iter().rev() {
            pos.unmake_move();
            assert_eq!(pos.to_fen(), fen);
        }
    }

    #[test]
    fn castling_rights_lost_on_king_move_and_restored_on_unmake() {
        let mut pos = Position::from_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let before_rights = pos.castling_rights();
        let mv = generate_legal_moves(&pos)
            .into_iter()
            .find(|m| m.from == crate::defs::Square::from_name("e1").unwrap() && !m.is_castle)
            .expect("king has a non-castling move");
        pos.make_move(mv);
        assert_eq!(pos.castling_rights(), 0);
        pos.unmake_move();
        assert_eq!(pos.castling_rights(), before_rights);
    }

    #[test]
    fn en_passant_capture_removes_the_passed_pawn() {
        let mut pos =
            Position::from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 2")
                .unwrap();
        let mv = generate_legal_moves(&pos)
            .into_iter()
            .find(|m| m.is_en_passant)
            .expect("e5d6 en passant should be generated");
        assert_eq!(mv.from, crate::defs::Square::from_name("e5").unwrap());
        assert_eq!(mv.to, crate::defs::Square::from_name("d6").unwrap());
        pos.make_move(mv);
        assert!(pos
            .piece_on(crate::defs::Square::from_name("d5").unwrap())
            .is_none());
        pos.unmake_move();
        assert!(!pos
            .piece_on(crate::defs::Square::from_name("d5").unwrap())
            .is_none());
    }
}
