//! Driver for UCI chess engines.
//!
//! [`EngineSession`] spawns an engine, talks to it over its stdin/stdout and
//! keeps what it learns in a [`SessionState`]. Listeners registered with
//! [`EngineSession::on`] are told about every [`Event`] as lines arrive.
//!
//! ```ignore
//! let mut session = EngineSession::spawn("/usr/bin/stockfish", [""; 0])?;
//! session.on(EventKind::Info, |event| {
//!     println!("{:?}", event);
//!     Ok(())
//! });
//! if session.uci().await {
//!     session.position(&PositionSpec::startpos().moves("e2e4"));
//!     let best = session.go(&GoParams::new().movetime(500)).await?;
//! }
//! session.shutdown().await;
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod launcher;
pub mod poll;
pub mod protocol;
pub mod session;

pub use config::SessionConfig;
pub use error::EngineError;
pub use events::{CallbackRegistry, Event, EventKind, ListenerError, ListenerResult};
pub use poll::Liveness;
pub use protocol::{BestMove, EngineInfo, OptionDescriptor, OptionKind, Score, SessionState};
pub use session::{EngineSession, GoParams, PositionSpec};
