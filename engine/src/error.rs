use std::path::PathBuf;

/// Errors surfaced by the engine driver.
///
/// Protocol anomalies never show up here: malformed or unknown lines from the
/// engine are dropped by the parser. Write failures are logged and reported
/// through `bool` returns instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine binary could not be started (missing file, exec failure,
    /// pipe or fork failure).
    #[error("failed to spawn engine {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The child was started but one of its pipes was not handed back.
    #[error("engine has no {0}")]
    MissingPipe(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A `go` was issued while the previous search has not produced a best move
    /// and no `stop` was sent.
    #[error("a search is already pending; send stop first")]
    SearchPending,
}
