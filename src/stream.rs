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

//! The JSON-shaped request/event contract a streaming transport bridges to
//! its clients. The transport itself — a websocket loop, a queue, whatever
//! carries bytes to a browser — is out of scope here; `run_request` only
//! promises to call `on_event` in the order the contract requires.

use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::position::Position;
use crate::search::{Search, SearchSnapshot};
use crate::START_FEN;

/// The standard starting position, used when a request omits `fen`.
fn default_fen() -> String {
    START_FEN.to_string()
}

/// The default `max_depth` when a request omits it.
fn default_max_depth() -> u32 {
    5
}

/// The default `time_limit_ms` when a request omits it.
fn default_time_limit_ms() -> u64 {
    3_000
}

/// The default `snapshot_interval_ms` when a request omits it.
fn default_snapshot_interval_ms() -> u64 {
    75
}

/// One incoming search request.
#[derive(Clone, Debug, Deserialize)]
pub struct Request {
    #[serde(default = "default_fen")]
    pub fen: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_time_limit_ms")]
    pub time_limit_ms: u64,
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            fen: default_fen(),
            max_depth: default_max_depth(),
            time_limit_ms: default_time_limit_ms(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
        }
    }
}

/// One outgoing message. Zero or more `Snapshot`s precede exactly one
/// terminal `Complete` or `Error`.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Snapshot {
        #[serde(flatten)]
        snapshot: SearchSnapshot,
    },
    Complete {
        #[serde(flatten)]
        snapshot: SearchSnapshot,
        best_move: Option<String>,
    },
    Error {
        message: String,
    },
}

/// Runs one request to completion, calling `on_event` for each snapshot
/// (in production order) and then exactly once more with the terminal
/// event. A malformed FEN or an invalid `max_depth` yields an `Error` event
/// rather than propagating a [`SearchError`]; the caller's event channel is
/// expected to stay open for the next request regardless of outcome.
pub fn run_request(request: &Request, mut on_event: impl FnMut(Event)) {
    let mut pos = match Position::from_fen(&request.fen) {
        Ok(pos) => pos,
        Err(e) => {
            on_event(Event::Error {
                message: SearchError::from(e).to_string(),
            });
            return;
        }
    };

    let mut search = Search::new();
    let result = {
        let mut on_snapshot = |snapshot: &SearchSnapshot| {
            on_event(Event::Snapshot {
                snapshot: snapshot.clone(),
            });
        };
        search.search(
            &mut pos,
            request.max_depth,
            request.time_limit_ms,
            None,
            Some(&mut on_snapshot),
            request.snapshot_interval_ms,
        )
    };

    match result {
        Ok(result) => on_event(Event::Complete {
            snapshot: result.snapshot,
            best_move: result.best_move,
        }),
        Err(e) => on_event(Event::Error {
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{run_request, Event, Request};

    #[test]
    fn a_well_formed_request_ends_in_exactly_one_complete_event() {
        let request = Request {
            max_depth: 2,
            time_limit_ms: 2_000,
            ..Request::default()
        };
        let mut events = Vec::new();
        run_request(&request, |event| events.push(event));

        let completes = events
            .iter()
            .filter(|e| matches!(e, Event::Complete { .. }))
            .count();
        assert_eq!(completes, 1);
        assert!(matches!(events.last(), Some(Event::Complete { .. })));
    }

    #[test]
    fn a_malformed_fen_yields_an_error_event_and_nothing_else() {
        let request = Request {
            fen: "not a fen".to_string(),
            ..Request::default()
        };
        let mut events = Vec::new();
        run_request(&request, |event| events.push(event));

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Error { .. }));
    }

    #[test]
    fn an_invalid_depth_yields_an_error_event() {
        let request = Request {
            max_depth: 0,
            ..Request::default()
        };
        let mut events = Vec::new();
        run_request(&request, |event| events.push(event));

        assert!(matches!(events.last(), Some(Event::Error { .. })));
    }

    #[test]
    fn snapshots_precede_the_terminal_event() {
        let request = Request {
            max_depth: 2,
            time_limit_ms: 2_000,
            snapshot_interval_ms: 1,
            ..Request::default()
        };
        let mut events = Vec::new();
        run_request(&request, |event| events.push(event));

        let terminal_index = events
            .iter()
            .position(|e| !matches!(e, Event::Snapshot { .. }))
            .expect("a terminal event was produced");
        assert_eq!(terminal_index, events.len() - 1);
    }
}
