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

//! Iterative-deepening negamax with fail-soft alpha-beta pruning. A deadline
//! bounds wall-clock time; progress is reported through an optional
//! throttled snapshot callback and an optional per-iteration callback.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::SearchError;
use crate::eval::{evaluate, evaluate_detailed, terminal_score, EvalDetails, PieceBreakdown};
use crate::movegen::{generate_legal_moves, in_check, Move};
use crate::position::Position;
use crate::throttle::SnapshotThrottle;

/// The alpha/beta bounds at the root and in `negamax`, widened well clear of
/// the ±100 000 mate-score constant so mate scores never saturate the
/// window at deep plies.
const OUTER_BOUND: i32 = 1_000_000;

/// Raised internally when the deadline is reached; never surfaced to a
/// caller. Every recursion frame pairs its `make_move` with an `unmake_move`
/// before propagating this upward.
struct TimedOut;

/// One root move's score, a ranked candidate-list entry.
#[derive(Clone, Debug, Serialize)]
pub struct CandidateScore {
    #[serde(rename = "move")]
    pub mv: String,
    pub score: i32,
    pub eval: f64,
    /// The typed move `mv` was formatted from, kept for heatmap composition
    /// so it never has to re-parse a UCI substring.
    #[serde(skip)]
    pub source: Move,
}

/// A point-in-time progress report: the fields a streaming transport
/// forwards to an observer.
#[derive(Clone, Debug, Serialize)]
pub struct SearchSnapshot {
    pub depth: u32,
    pub nodes: u64,
    pub nps: u64,
    pub current_move: String,
    pub pv: Vec<String>,
    pub eval: f64,
    pub eval_cp: i32,
    pub candidate_moves: HashMap<String, f64>,
    pub piece_values: HashMap<String, i32>,
    pub piece_breakdown: HashMap<String, PieceBreakdown>,
    pub heatmap: HashMap<String, i32>,
    pub cutoffs: u64,
    pub elapsed_ms: f64,
}

/// The outcome of one `Search::search` call: the last snapshot plus the
/// best move, the ranked candidate list, and the principal variation.
#[derive(Clone, Debug, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub snapshot: SearchSnapshot,
    pub best_move: Option<String>,
    pub candidates: Vec<CandidateScore>,
    #[serde(skip)]
    pub pv_moves: Vec<Move>,
}

impl SearchResult {
    /// An empty, depth-0 result carrying the root position's static
    /// evaluation, used before the first iteration completes.
    fn initial(root_eval: EvalDetails) -> Self {
        Self {
            snapshot: SearchSnapshot {
                depth: 0,
                nodes: 0,
                nps: 0,
                current_move: String::new(),
                pv: Vec::new(),
                eval: 0.0,
                eval_cp: 0,
                candidate_moves: HashMap::new(),
                piece_values: root_eval.piece_values,
                piece_breakdown: root_eval.piece_breakdown,
                heatmap: root_eval.heatmap,
                cutoffs: 0,
                elapsed_ms: 0.0,
            },
            best_move: None,
            candidates: Vec::new(),
            pv_moves: Vec::new(),
        }
    }
}

/// An iterative-deepening negamax searcher. Counters are reset at the start
/// of every [`Search::search`] call; nothing here outlives one search.
#[derive(Default)]
pub struct Search {
    /// Nodes visited so far in the current `search` call.
    nodes: u64,
    /// Alpha-beta cutoffs so far in the current `search` call.
    cutoffs: u64,
    /// The instant the current `search` call must stop by.
    deadline: Option<Instant>,
    /// The instant the current `search` call began, for elapsed-time and
    /// nodes-per-second reporting.
    start: Option<Instant>,
}

impl Search {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs iterative deepening up to `max_depth`, stopping early once
    /// `time_limit_ms` elapses. `on_iteration` fires once per completed
    /// depth; `on_snapshot` fires at a throttled rate via a
    /// [`SnapshotThrottle`] with `snapshot_interval_ms`. The position is
    /// restored to its starting state before returning, including on
    /// timeout.
    pub fn search(
        &mut self,
        pos: &mut Position,
        max_depth: u32,
        time_limit_ms: u64,
        mut on_iteration: Option<&mut dyn FnMut(&SearchResult)>,
        mut on_snapshot: Option<&mut dyn FnMut(&SearchSnapshot)>,
        snapshot_interval_ms: u64,
    ) -> Result<SearchResult, SearchError> {
        if max_depth < 1 {
            return Err(SearchError::InvalidDepth);
        }

        self.nodes = 0;
        self.cutoffs = 0;
        let start = Instant::now();
        self.start = Some(start);
        self.deadline = Some(start + Duration::from_millis(time_limit_ms));

        let root_eval = evaluate_detailed(pos);
        let mut throttle = SnapshotThrottle::new(snapshot_interval_ms);
        let mut best = SearchResult::initial(root_eval.clone());

        for depth in 1..=max_depth {
            let outcome = self.search_root(pos, depth, &root_eval, &mut throttle, &mut on_snapshot);
            let (score, best_move, pv, candidates, current_move) = match outcome {
                Ok(v) => v,
                Err(TimedOut) => break,
            };

            let elapsed_ms = self.elapsed_ms();
            let nps = self.nps(elapsed_ms);
            let pv_uci: Vec<String> = pv.iter().map(Move::to_uci).collect();
            let candidate_moves: HashMap<String, f64> =
                candidates.iter().map(|c| (c.mv.clone(), c.eval)).collect();
            let heatmap = compose_heatmap(&root_eval.heatmap, &pv, &candidates);

            let snapshot = SearchSnapshot {
                depth,
                nodes: self.nodes,
                nps,
                current_move,
                pv: pv_uci,
                eval: f64::from(score) / 100.0,
                eval_cp: score,
                candidate_moves,
                piece_values: root_eval.piece_values.clone(),
                piece_breakdown: root_eval.piece_breakdown.clone(),
                heatmap,
                cutoffs: self.cutoffs,
                elapsed_ms,
            };

            best = SearchResult {
                snapshot: snapshot.clone(),
                best_move: best_move.map(|m| m.to_uci()),
                candidates,
                pv_moves: pv,
            };

            if let Some(cb) = on_iteration.as_deref_mut() {
                cb(&best);
            }
            if let Some(cb) = on_snapshot.as_deref_mut() {
                throttle.emit(&snapshot, true, cb);
            }
        }

        Ok(best)
    }

    /// One root iteration: orders moves by [`Move::order_key`], searches
    /// each with [`Self::negamax`], and returns the best score, move,
    /// principal variation, ranked candidate list, and the move in flight
    /// when a timeout interrupts the loop.
    #[allow(clippy::too_many_arguments)]
    fn search_root(
        &mut self,
        pos: &mut Position,
        depth: u32,
        root_eval: &EvalDetails,
        throttle: &mut SnapshotThrottle,
        on_snapshot: &mut Option<&mut dyn FnMut(&SearchSnapshot)>,
    ) -> Result<(i32, Option<Move>, Vec<Move>, Vec<CandidateScore>, String), TimedOut> {
        self.check_timeout()?;

        let mut alpha = -OUTER_BOUND;
        let beta = OUTER_BOUND;

        let mut moves = generate_legal_moves(pos);
        if moves.is_empty() {
            let score = terminal_score(in_check(pos, pos.side_to_move()), 0);
            return Ok((score, None, Vec::new(), Vec::new(), String::new()));
        }
        moves.sort_by_key(|m| Reverse(m.order_key()));

        let mut best_score = -OUTER_BOUND;
        let mut best_move = None;
        let mut best_pv = Vec::new();
        let mut candidates = Vec::new();
        let mut current_move = String::new();

        for mv in moves {
            self.check_timeout()?;
            current_move = mv.to_uci();

            pos.make_move(mv);
            let outcome = self.negamax(pos, depth - 1, -beta, -alpha, 1);
            pos.unmake_move();
            let (child_score, child_pv) = outcome?;
            let score = -child_score;

            candidates.push(CandidateScore {
                mv: current_move.clone(),
                score,
                eval: f64::from(score) / 100.0,
                source: mv,
            });

            if score > best_score {
                best_score = score;
                best_move = Some(mv);
                best_pv = std::iter::once(mv).chain(child_pv).collect();
            }
            if score > alpha {
                alpha = score;
            }

            if let Some(cb) = on_snapshot.as_deref_mut() {
                let elapsed_ms = self.elapsed_ms();
                let nps = self.nps(elapsed_ms);
                let pv_uci: Vec<String> = best_pv.iter().map(Move::to_uci).collect();
                let mut ranked = candidates.clone();
                ranked.sort_by_key(|c| Reverse(c.score));
                let candidate_moves: HashMap<String, f64> =
                    ranked.iter().map(|c| (c.mv.clone(), c.eval)).collect();
                let heatmap = compose_heatmap(&root_eval.heatmap, &best_pv, &ranked);

                let snapshot = SearchSnapshot {
                    depth,
                    nodes: self.nodes,
                    nps,
                    current_move: current_move.clone(),
                    pv: pv_uci,
                    eval: f64::from(best_score) / 100.0,
                    eval_cp: best_score,
                    candidate_moves,
                    piece_values: root_eval.piece_values.clone(),
                    piece_breakdown: root_eval.piece_breakdown.clone(),
                    heatmap,
                    cutoffs: self.cutoffs,
                    elapsed_ms,
                };
                throttle.emit(&snapshot, false, cb);
            }
        }

        candidates.sort_by_key(|c| Reverse(c.score));
        Ok((best_score, best_move, best_pv, candidates, current_move))
    }

    /// Fail-soft alpha-beta negamax: the best score from `pos` at `depth`
    /// plies and the line that achieves it, from the side to move's
    /// perspective.
    fn negamax(
        &mut self,
        pos: &mut Position,
        depth: u32,
        mut alpha: i32,
        beta: i32,
        ply: u16,
    ) -> Result<(i32, Vec<Move>), TimedOut> {
        self.check_timeout()?;
        self.nodes += 1;

        if depth == 0 {
            return Ok((evaluate(pos), Vec::new()));
        }

        let mut moves = generate_legal_moves(pos);
        if moves.is_empty() {
            let score = terminal_score(in_check(pos, pos.side_to_move()), ply);
            return Ok((score, Vec::new()));
        }
        moves.sort_by_key(|m| Reverse(m.order_key()));

        let mut best_score = -OUTER_BOUND;
        let mut best_line = Vec::new();

        for mv in moves {
            pos.make_move(mv);
            let outcome = self.negamax(pos, depth - 1, -beta, -alpha, ply + 1);
            pos.unmake_move();
            let (child_score, child_line) = outcome?;
            let score = -child_score;

            if score > best_score {
                best_score = score;
                best_line = std::iter::once(mv).chain(child_line).collect();
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                self.cutoffs += 1;
                break;
            }
        }

        Ok((best_score, best_line))
    }

    /// Fails with [`TimedOut`] once the deadline has passed.
    fn check_timeout(&self) -> Result<(), TimedOut> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TimedOut),
            _ => Ok(()),
        }
    }

    /// Milliseconds since the current `search` call began.
    fn elapsed_ms(&self) -> f64 {
        self.start.map_or(0.0, |start| start.elapsed().as_secs_f64() * 1000.0)
    }

    /// Nodes visited per second, given `elapsed_ms` of wall-clock time.
    fn nps(&self, elapsed_ms: f64) -> u64 {
        let elapsed_s = (elapsed_ms / 1000.0).max(1e-9);
        (self.nodes as f64 / elapsed_s) as u64
    }
}

/// Merges the static pressure heatmap with a dynamic overlay derived from
/// the current principal variation and the ranked candidate list: an
/// undocumented but pinned visualization aid, not a search signal.
///
/// `ranked_candidates` must already be sorted best-first; `pv` is the
/// line from the root move onward.
fn compose_heatmap(
    static_heatmap: &HashMap<String, i32>,
    pv: &[Move],
    ranked_candidates: &[CandidateScore],
) -> HashMap<String, i32> {
    let mut merged = static_heatmap.clone();

    for (i, mv) in pv.iter().take(8).enumerate() {
        let weight = i32::max(1, 5 - i as i32);
        *merged.entry(mv.to.name()).or_insert(0) += weight;
    }

    for (i, candidate) in ranked_candidates.iter().take(10).enumerate() {
        let origin_weight = i32::max(1, 3 - i as i32);
        let dest_weight = i32::max(1, 4 - i as i32);
        *merged.entry(candidate.source.from.name()).or_insert(0) += origin_weight;
        *merged.entry(candidate.source.to.name()).or_insert(0) += dest_weight;
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::Search;
    use crate::position::Position;

    #[test]
    fn returns_a_legal_move_from_the_starting_position() {
        let mut pos = Position::startpos();
        let mut search = Search::new();
        let result = search.search(&mut pos, 2, 2_000, None, None, 75).unwrap();
        let legal = crate::movegen::generate_legal_moves(&Position::startpos());
        let best = result.best_move.expect("a move was found");
        assert!(legal.iter().any(|m| m.to_uci() == best));
    }

    #[test]
    fn completes_every_requested_depth_given_ample_time() {
        let mut pos = Position::startpos();
        let mut search = Search::new();
        let result = search.search(&mut pos, 2, 5_000, None, None, 75).unwrap();
        assert_eq!(result.snapshot.depth, 2);
    }

    #[test]
    fn position_is_restored_after_search() {
        let mut pos = Position::startpos();
        let before = pos.to_fen();
        let mut search = Search::new();
        search.search(&mut pos, 2, 2_000, None, None, 75).unwrap();
        assert_eq!(pos.to_fen(), before);
    }

    #[test]
    fn detects_fools_mate() {
        let mut pos = Position::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        let mut search = Search::new();
        let result = search.search(&mut pos, 1, 2_000, None, None, 75).unwrap();
        assert!(result.snapshot.eval_cp <= -99_000);
    }

    #[test]
    fn rejects_a_depth_below_one() {
        let mut pos = Position::startpos();
        let mut search = Search::new();
        assert!(search.search(&mut pos, 0, 1_000, None, None, 75).is_err());
    }

    #[test]
    fn snapshots_arrive_with_non_decreasing_elapsed_time() {
        let mut pos = Position::startpos();
        let mut search = Search::new();
        let mut elapsed = Vec::new();
        let mut on_snapshot = |snap: &super::SearchSnapshot| elapsed.push(snap.elapsed_ms);
        let result = search
            .search(&mut pos, 2, 2_000, None, Some(&mut on_snapshot), 1)
            .unwrap();
        for pair in elapsed.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(result.snapshot.depth, 2);
    }
}
