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

use std::fmt::{self, Display, Formatter};

/// An error that occurs when a FEN or UCI-move string cannot be parsed.
#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ParseError {
    /// A token was outside an expected range (e.g. a file/rank letter).
    ErroneousToken,
    /// Expected a token but found nothing (e.g. a FEN field was missing).
    ExpectedToken,
    /// Expected a different token (e.g. a malformed piece character).
    InvalidToken,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::ErroneousToken => "a token was outside the expected range",
            Self::ExpectedToken => "expected a token but found nothing",
            Self::InvalidToken => "encountered an invalid token",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// An invalid argument to [`Search::search`](crate::search::Search::search)
/// or [`stream::run_request`](crate::stream::run_request).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SearchError {
    /// `max_depth` was less than 1.
    InvalidDepth,
    /// The supplied FEN could not be parsed.
    InvalidFen(ParseError),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDepth => f.write_str("max_depth must be >= 1"),
            Self::InvalidFen(e) => write!(f, "invalid FEN: {e}"),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<ParseError> for SearchError {
    fn from(e: ParseError) -> Self {
        Self::InvalidFen(e)
    }
}
