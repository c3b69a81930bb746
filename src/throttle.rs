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

//! A rate limiter for snapshot emission, so a slow or chatty callback
//! degrades update granularity rather than search correctness.

use std::time::{Duration, Instant};

use crate::search::SearchSnapshot;

/// Bounds how often snapshots are forwarded to a callback. A forced emit
/// (used at the end of every completed depth) always goes through.
pub struct SnapshotThrottle {
    /// The minimum gap between two non-forced emissions.
    interval: Duration,
    /// The earliest instant a non-forced emission is allowed, if any have
    /// been emitted yet.
    next_emit_at: Option<Instant>,
}

impl SnapshotThrottle {
    /// `interval_ms` is clamped to at least one millisecond.
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms.max(1)),
            next_emit_at: None,
        }
    }

    /// Forwards `snapshot` to `callback` if `force` is set or the interval
    /// has elapsed since the last emission; otherwise the call is a no-op.
    pub fn emit(&mut self, snapshot: &SearchSnapshot, force: bool, callback: &mut dyn FnMut(&SearchSnapshot)) {
        let now = Instant::now();
        let due = match self.next_emit_at {
            Some(next) => now >= next,
            None => true,
        };
        if force || due {
            callback(snapshot);
            self.next_emit_at = Some(now + self.interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SnapshotThrottle;
    use crate::search::SearchSnapshot;
    use std::collections::HashMap;
    use std::thread::sleep;
    use std::time::Duration;

    fn snapshot() -> SearchSnapshot {
        SearchSnapshot {
            depth: 1,
            nodes: 0,
            nps: 0,
            current_move: String::new(),
            pv: Vec::new(),
            eval: 0.0,
            eval_cp: 0,
            candidate_moves: HashMap::new(),
            piece_values: HashMap::new(),
            piece_breakdown: HashMap::new(),
            heatmap: HashMap::new(),
            cutoffs: 0,
            elapsed_ms: 0.0,
        }
    }

    #[test]
    fn suppresses_rapid_non_forced_emissions() {
        let mut throttle = SnapshotThrottle::new(1_000);
        let mut count = 0;
        let mut cb = |_: &SearchSnapshot| count += 1;
        throttle.emit(&snapshot(), false, &mut cb);
        throttle.emit(&snapshot(), false, &mut cb);
        throttle.emit(&snapshot(), false, &mut cb);
        assert_eq!(count, 1);
    }

    #[test]
    fn forced_emits_are_never_suppressed() {
        let mut throttle = SnapshotThrottle::new(1_000);
        let mut count = 0;
        let mut cb = |_: &SearchSnapshot| count += 1;
        throttle.emit(&snapshot(), true, &mut cb);
        throttle.emit(&snapshot(), true, &mut cb);
        assert_eq!(count, 2);
    }

    #[test]
    fn emits_again_once_the_interval_elapses() {
        let mut throttle = SnapshotThrottle::new(20);
        let mut count = 0;
        let mut cb = |_: &SearchSnapshot| count += 1;
        throttle.emit(&snapshot(), false, &mut cb);
        sleep(Duration::from_millis(40));
        throttle.emit(&snapshot(), false, &mut cb);
        assert_eq!(count, 2);
    }
}
