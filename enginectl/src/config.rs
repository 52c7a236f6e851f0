//! Locating the engine binary.
//!
//! The engine path can come from the command line, from `UCI_ENGINE_PATH`,
//! or from a search of the usual Stockfish install locations.

use std::path::{Path, PathBuf};

/// Places Stockfish usually ends up in, checked in order.
const STOCKFISH_PATHS: &[&str] = &[
    "/usr/local/bin/stockfish",
    "/usr/bin/stockfish",
    "/opt/homebrew/bin/stockfish",
    "/usr/games/stockfish",
];

/// Resolve the engine binary.
///
/// Priority:
/// 1. `explicit` (the `--engine` flag) if given
/// 2. `UCI_ENGINE_PATH` env variable if set
/// 3. the first existing entry of [`STOCKFISH_PATHS`]
/// 4. `stockfish`, relying on `PATH` lookup
pub fn get_engine_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var("UCI_ENGINE_PATH") {
        return PathBuf::from(path);
    }

    find_stockfish_path().unwrap_or_else(|| PathBuf::from("stockfish"))
}

fn find_stockfish_path() -> Option<PathBuf> {
    STOCKFISH_PATHS
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(Path::to_path_buf)
}

/// Split `NAME=VALUE` into an option name and value. A bare `NAME` has no
/// value (button options).
pub fn parse_option_arg(arg: &str) -> (String, Option<String>) {
    match arg.split_once('=') {
        Some((name, value)) => (name.trim().to_string(), Some(value.trim().to_string())),
        None => (arg.trim().to_string(), None),
    }
}
