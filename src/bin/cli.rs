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

//! A terminal front-end over the `lucent_core` library: perft counting,
//! one-shot search or evaluation, and an interactive play loop.
//!
//! Accepted invocation: `lucent [--fen FEN] <subcommand> [options]`.
//! Subcommands:
//! - `perft <depth> [--divide]`
//! - `search [--depth N] [--time MS]`
//! - `eval [--depth N] [--time MS]`
//! - `play [--side white|black] [--depth N] [--time MS]`
//!
//! Exits `0` on success, non-zero on an argument or runtime error.

use std::env::args;
use std::io::{stdin, BufRead};
use std::iter::Peekable;
use std::process::exit;

use lucent_core::defs::Side;
use lucent_core::movegen::{generate_legal_moves, parse_uci_move};
use lucent_core::perft::perft_divide;
use lucent_core::{eval, Position, Search, START_FEN};

/// The remaining command-line tokens, consumed flag-by-flag.
type Args = Peekable<std::vec::IntoIter<String>>;

/// Prints `message` to stderr and exits with status 1.
fn fail(message: &str) -> ! {
    eprintln!("error: {message}");
    exit(1);
}

/// Like [`take_flag`], parsed as a `u32`, or `default` if absent.
fn take_u32_flag(args: &mut Args, name: &str, default: u32) -> u32 {
    take_flag(args, name).map_or(default, |raw| {
        raw.parse()
            .unwrap_or_else(|_| fail(&format!("{name} expects an integer, got {raw:?}")))
    })
}

/// Like [`take_flag`], parsed as a `u64`, or `default` if absent.
fn take_u64_flag(args: &mut Args, name: &str, default: u64) -> u64 {
    take_flag(args, name).map_or(default, |raw| {
        raw.parse()
            .unwrap_or_else(|_| fail(&format!("{name} expects an integer, got {raw:?}")))
    })
}

/// Scans the remaining arguments for `name` followed by a value, removing
/// both from the stream wherever they appear.
fn take_flag(args: &mut Args, name: &str) -> Option<String> {
    let mut rest = Vec::new();
    let mut found = None;
    while let Some(arg) = args.next() {
        if arg == name {
            found = args.next();
        } else {
            rest.push(arg);
        }
    }
    *args = rest.into_iter().peekable();
    found
}

/// Whether `name` appears among the remaining arguments, removing it from
/// the stream wherever it appears.
fn take_switch(args: &mut Args, name: &str) -> bool {
    let mut rest = Vec::new();
    let mut found = false;
    while let Some(arg) = args.next() {
        if arg == name {
            found = true;
        } else {
            rest.push(arg);
        }
    }
    *args = rest.into_iter().peekable();
    found
}

fn main() {
    let mut args: Args = args().skip(1).collect::<Vec<_>>().into_iter().peekable();

    let fen = take_flag(&mut args, "--fen").unwrap_or_else(|| START_FEN.to_string());
    let pos = Position::from_fen(&fen).unwrap_or_else(|e| fail(&format!("invalid --fen: {e}")));

    let Some(subcommand) = args.next() else {
        fail("expected a subcommand: perft, search, eval, play");
    };

    match subcommand.as_str() {
        "perft" => run_perft(pos, args),
        "search" => run_search(pos, args),
        "eval" => run_eval(pos, args),
        "play" => run_play(pos, args),
        other => fail(&format!("unknown subcommand: {other}")),
    }
}

/// The `perft <depth> [--divide]` subcommand.
fn run_perft(mut pos: Position, mut args: Args) {
    let divide = take_switch(&mut args, "--divide");
    let Some(depth_arg) = args.next() else {
        fail("perft requires a depth argument");
    };
    let depth: u32 = depth_arg
        .parse()
        .unwrap_or_else(|_| fail(&format!("depth expects an integer, got {depth_arg:?}")));

    let (breakdown, total) = perft_divide(&mut pos, depth);
    if divide {
        for (mv, count) in &breakdown {
            println!("{mv}: {count}");
        }
    }
    println!("Total: {total}");
}

/// The `search [--depth N] [--time MS]` subcommand.
fn run_search(mut pos: Position, mut args: Args) {
    let depth = take_u32_flag(&mut args, "--depth", 5);
    let time_limit_ms = take_u64_flag(&mut args, "--time", 3_000);

    let mut search = Search::new();
    let result = search
        .search(&mut pos, depth, time_limit_ms, None, None, 75)
        .unwrap_or_else(|e| fail(&e.to_string()));

    let pv = result.snapshot.pv.join(" ");
    println!(
        "depth {} nodes {} nps {} score {} pv {}",
        result.snapshot.depth, result.snapshot.nodes, result.snapshot.nps, result.snapshot.eval_cp, pv
    );
    match &result.best_move {
        Some(mv) => println!("bestmove {mv}"),
        None => println!("bestmove none"),
    }
}

/// The `eval [--depth N] [--time MS]` subcommand.
fn run_eval(mut pos: Position, mut args: Args) {
    let depth = take_u32_flag(&mut args, "--depth", 5);
    let time_limit_ms = take_u64_flag(&mut args, "--time", 3_000);

    let mut search = Search::new();
    let result = search
        .search(&mut pos, depth, time_limit_ms, None, None, 75)
        .unwrap_or_else(|e| fail(&e.to_string()));

    let details = eval::evaluate_detailed(&pos);
    let payload = serde_json::json!({
        "eval": result.snapshot.eval,
        "eval_cp": result.snapshot.eval_cp,
        "piece_values": details.piece_values,
        "piece_breakdown": details.piece_breakdown,
        "heatmap": details.heatmap,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).unwrap_or_else(|e| fail(&e.to_string()))
    );
}

/// The `play [--side white|black] [--depth N] [--time MS]` subcommand.
fn run_play(mut pos: Position, mut args: Args) {
    let human_side = match take_flag(&mut args, "--side").as_deref() {
        Some("white") | None => Side::WHITE,
        Some("black") => Side::BLACK,
        Some(other) => fail(&format!("--side expects white or black, got {other:?}")),
    };
    let depth = take_u32_flag(&mut args, "--depth", 5);
    let time_limit_ms = take_u64_flag(&mut args, "--time", 3_000);

    let stdin = stdin();
    let mut lines = stdin.lock().lines();

    loop {
        println!("{pos}");
        let legal_moves = generate_legal_moves(&pos);
        if legal_moves.is_empty() {
            println!("no legal moves; game over");
            break;
        }

        if pos.side_to_move() == human_side {
            println!("your move:");
            let Some(Ok(line)) = lines.next() else {
                break;
            };
            let line = line.trim();
            if line == "quit" {
                break;
            }
            match parse_uci_move(&legal_moves, line) {
                Ok(mv) => pos.make_move(mv),
                Err(e) => println!("illegal move {line:?}: {e}"),
            }
        } else {
            let mut search = Search::new();
            let result = search
                .search(&mut pos, depth, time_limit_ms, None, None, 75)
                .unwrap_or_else(|e| fail(&e.to_string()));
            let Some(mv) = result.best_move else {
                println!("engine has no move; game over");
                break;
            };
            println!("engine plays {mv}");
            let legal_moves = generate_legal_moves(&pos);
            let mv = parse_uci_move(&legal_moves, &mv)
                .unwrap_or_else(|e| fail(&format!("engine produced an illegal move: {e}")));
            pos.make_move(mv);
        }
    }
}
