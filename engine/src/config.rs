//! Runtime tunables for an engine session.
//!
//! Every value has a compile-time default and can be overridden through a
//! dedicated environment variable. [`SessionConfig::from_env`] collects them.

use std::str::FromStr;
use std::time::Duration;

/// Default interval between two cooperative poll ticks (in milliseconds).
const DEFAULT_TICK_MS: u64 = 10;

/// Default number of ticks the `uci` handshake may take before giving up.
const DEFAULT_HANDSHAKE_TICKS: i64 = 500;

/// Default size of a single read from the engine's stdout.
const DEFAULT_READ_CHUNK: usize = 4096;

/// Default niceness increment applied to the engine process.
const DEFAULT_NICE_INCREMENT: i32 = 10;

/// Default time the engine gets to exit after `quit` (in milliseconds).
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 1000;

fn env_or<T: FromStr>(var: &str, default: T) -> T {
    match std::env::var(var) {
        Ok(value) => value.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get the interval between poll ticks.
///
/// Priority:
/// 1. `UCI_ENGINE_TICK_MS` env variable if set and parseable
/// 2. `10` ms as fallback
pub fn get_tick_interval() -> Duration {
    Duration::from_millis(env_or("UCI_ENGINE_TICK_MS", DEFAULT_TICK_MS).max(1))
}

/// Get the handshake liveness budget in ticks.
///
/// Priority:
/// 1. `UCI_ENGINE_HANDSHAKE_TICKS` env variable if set and parseable
/// 2. `500` ticks as fallback (five seconds at the default tick interval)
pub fn get_handshake_ticks() -> i64 {
    env_or("UCI_ENGINE_HANDSHAKE_TICKS", DEFAULT_HANDSHAKE_TICKS)
}

/// Get the size of one read from the engine's stdout.
///
/// Priority:
/// 1. `UCI_ENGINE_READ_CHUNK` env variable if set and parseable
/// 2. `4096` bytes as fallback
pub fn get_read_chunk_size() -> usize {
    env_or("UCI_ENGINE_READ_CHUNK", DEFAULT_READ_CHUNK).max(1)
}

/// Get the niceness increment applied to the engine process.
///
/// Priority:
/// 1. `UCI_ENGINE_NICE` env variable if set and parseable
/// 2. `10` as fallback
pub fn get_nice_increment() -> i32 {
    env_or("UCI_ENGINE_NICE", DEFAULT_NICE_INCREMENT)
}

/// Get the grace period between `quit` and a forced kill on shutdown.
///
/// Priority:
/// 1. `UCI_ENGINE_SHUTDOWN_GRACE_MS` env variable if set and parseable
/// 2. `1000` ms as fallback
pub fn get_shutdown_grace() -> Duration {
    Duration::from_millis(env_or(
        "UCI_ENGINE_SHUTDOWN_GRACE_MS",
        DEFAULT_SHUTDOWN_GRACE_MS,
    ))
}

/// Tunables for one [`EngineSession`](crate::EngineSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    /// Upper bound on the ticks `uci()` waits for `uciok`.
    pub handshake_ticks: i64,
    pub read_chunk_size: usize,
    /// Added to the engine's niceness; `0` leaves the priority alone.
    pub nice_increment: i32,
    pub shutdown_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            handshake_ticks: DEFAULT_HANDSHAKE_TICKS,
            read_chunk_size: DEFAULT_READ_CHUNK,
            nice_increment: DEFAULT_NICE_INCREMENT,
            shutdown_grace: Duration::from_millis(DEFAULT_SHUTDOWN_GRACE_MS),
        }
    }
}

impl SessionConfig {
    /// Build a config from the `UCI_ENGINE_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            tick_interval: get_tick_interval(),
            handshake_ticks: get_handshake_ticks(),
            read_chunk_size: get_read_chunk_size(),
            nice_increment: get_nice_increment(),
            shutdown_grace: get_shutdown_grace(),
        }
    }
}
