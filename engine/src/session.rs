use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout};
use std::time::Instant;

use cozy_chess::Move;

use crate::channel::{ChannelReader, ChannelWriter, ReadStatus};
use crate::config::SessionConfig;
use crate::events::{CallbackRegistry, Event, EventKind, ListenerResult};
use crate::launcher;
use crate::poll::{polling_loop, Liveness};
use crate::protocol::{
    format_move_list, parse_line, BestMove, OptionDescriptor, OptionKind, SessionState, UciMessage,
};
use crate::EngineError;

/// Where the engine should start from for the next search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionSpec {
    /// `None` or `"startpos"` for the initial position, otherwise a FEN.
    pub fen: Option<String>,
    /// Space-separated coordinate moves played from `fen`.
    pub moves: Option<String>,
}

impl PositionSpec {
    pub fn startpos() -> Self {
        Self::default()
    }

    pub fn fen(fen: impl Into<String>) -> Self {
        Self {
            fen: Some(fen.into()),
            moves: None,
        }
    }

    pub fn moves(mut self, moves: impl Into<String>) -> Self {
        self.moves = Some(moves.into());
        self
    }

    pub fn with_moves(self, moves: &[Move]) -> Self {
        self.moves(format_move_list(moves))
    }

    pub fn to_command(&self) -> String {
        let mut cmd = match self.fen.as_deref().map(str::trim) {
            None | Some("") | Some("startpos") => "position startpos".to_string(),
            Some(fen) => format!("position fen {}", fen),
        };
        if let Some(moves) = self.moves.as_deref().map(str::trim) {
            if !moves.is_empty() {
                cmd.push_str(" moves ");
                cmd.push_str(moves);
            }
        }
        cmd
    }
}

/// Arguments of a `go` command, sent as `<key> <value>` pairs in key order.
/// A key with an empty value is sent alone (`infinite`, `ponder`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    params: BTreeMap<String, String>,
}

impl GoParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn flag(self, key: impl Into<String>) -> Self {
        self.param(key, "")
    }

    pub fn movetime(self, ms: u64) -> Self {
        self.param("movetime", ms)
    }

    pub fn depth(self, depth: u32) -> Self {
        self.param("depth", depth)
    }

    pub fn nodes(self, nodes: u64) -> Self {
        self.param("nodes", nodes)
    }

    /// Clock state: remaining time and increment per side, in milliseconds.
    pub fn clock(self, wtime: u64, btime: u64, winc: u64, binc: u64) -> Self {
        self.param("wtime", wtime)
            .param("btime", btime)
            .param("winc", winc)
            .param("binc", binc)
    }

    pub fn infinite(self) -> Self {
        self.flag("infinite")
    }

    pub fn to_command(&self) -> String {
        let mut cmd = "go".to_string();
        for (key, value) in &self.params {
            cmd.push(' ');
            cmd.push_str(key);
            if !value.is_empty() {
                cmd.push(' ');
                cmd.push_str(value);
            }
        }
        cmd
    }
}

/// A UCI engine driven over its stdin/stdout.
///
/// All state lives on the caller's task. Waits ([`uci`](Self::uci),
/// [`go`](Self::go), [`wait_ready`](Self::wait_ready)) drain and parse the
/// engine's output once per tick and sleep in between, so the runtime is
/// never blocked on the engine. Hosts running their own loop can call
/// [`pump`](Self::pump) instead.
pub struct EngineSession<R = ChildStdout, W = ChildStdin> {
    child: Option<Child>,
    reader: ChannelReader<R>,
    writer: ChannelWriter<W>,
    state: SessionState,
    callbacks: CallbackRegistry,
    liveness: Liveness,
    config: SessionConfig,
    handshake_completed: bool,
    stopped: bool,
    search_pending: bool,
    eof: bool,
}

impl<R, W> std::fmt::Debug for EngineSession<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSession")
            .field("pid", &self.child.as_ref().map(Child::id))
            .field("state", &self.state)
            .field("callbacks", &self.callbacks)
            .field("liveness", &self.liveness.remaining())
            .field("stopped", &self.stopped)
            .field("search_pending", &self.search_pending)
            .field("eof", &self.eof)
            .finish()
    }
}

impl EngineSession {
    /// Spawn the engine at `path` with the environment's [`SessionConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Spawn`] if the process cannot be started.
    pub fn spawn<I, S>(path: impl AsRef<Path>, argv: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::spawn_with_config(path, argv, SessionConfig::from_env())
    }

    /// # Errors
    ///
    /// Returns [`EngineError::Spawn`] if the process cannot be started.
    pub fn spawn_with_config<I, S>(
        path: impl AsRef<Path>,
        argv: I,
        config: SessionConfig,
    ) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let process = launcher::spawn(path.as_ref(), argv, config.nice_increment)?;
        let mut session = Self::from_channels(process.stdout, process.stdin, config);
        session.child = Some(process.child);
        Ok(session)
    }

    /// Stop the engine and give it the configured grace period to exit before
    /// killing it.
    pub async fn shutdown(mut self) {
        self.stop();
        self.writer.close();

        let Some(mut child) = self.child.take() else {
            return;
        };
        let deadline = Instant::now() + self.config.shutdown_grace;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    tracing::info!("Engine exited with {}", status);
                    return;
                }
                Ok(None) if Instant::now() < deadline => {
                    tokio::time::sleep(self.config.tick_interval).await;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to poll engine exit status: {}", e);
                    break;
                }
            }
        }

        tracing::warn!("Engine did not exit within {:?}; killing it", self.config.shutdown_grace);
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl<R: Read + AsRawFd, W: Write> EngineSession<R, W> {
    /// Build a session over already-connected channels, with no child
    /// process to manage.
    pub fn from_channels(reader: R, writer: W, config: SessionConfig) -> Self {
        Self {
            child: None,
            reader: ChannelReader::new(reader, config.read_chunk_size),
            writer: ChannelWriter::new(writer),
            state: SessionState::new(),
            callbacks: CallbackRegistry::new(),
            liveness: Liveness::new(),
            config,
            handshake_completed: false,
            stopped: false,
            search_pending: false,
            eof: false,
        }
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F)
    where
        F: FnMut(&Event) -> ListenerResult + Send + 'static,
    {
        self.callbacks.on(kind, listener);
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// A handle on the wait countdown; cancelling it ends any pending wait.
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn is_search_pending(&self) -> bool {
        self.search_pending
    }

    /// One drain-and-parse pass over whatever the engine has written.
    pub fn pump(&mut self) -> ReadStatus {
        let mut lines = Vec::new();
        let status = self.reader.drain(|line| lines.push(line));
        for line in &lines {
            self.handle_line(line);
        }
        if status == ReadStatus::Eof {
            tracing::warn!("Engine stdout EOF - engine closed");
            self.eof = true;
            self.search_pending = false;
            self.emit(Event::Eof);
        }
        status
    }

    /// Run a line through the parser as if the engine had sent it.
    pub fn feed_line(&mut self, line: &str) {
        self.handle_line(line);
    }

    fn handle_line(&mut self, line: &str) {
        tracing::trace!("UCI << {}", line);
        self.emit(Event::Line(line.to_string()));

        let message = parse_line(line, self.state.id_name.is_some());
        match message {
            UciMessage::Abort => {
                tracing::debug!("Abort sentinel received; cancelling waits");
                self.liveness.cancel();
            }
            UciMessage::Unknown => {
                tracing::trace!("Ignoring UCI line: {}", line);
            }
            message => {
                for event in self.state.apply(message) {
                    match &event {
                        Event::UciOk => {
                            tracing::debug!("Received uciok");
                            self.handshake_completed = true;
                        }
                        Event::BestMove(best) => {
                            tracing::info!("Received bestmove: {}", best.mv);
                            self.search_pending = false;
                        }
                        _ => {}
                    }
                    self.emit(event);
                }
            }
        }
    }

    fn emit(&mut self, event: Event) {
        self.callbacks.emit(&event);
    }

    /// Revive a countdown cancelled by a cloned handle or the abort
    /// sentinel. Only `uci()` revives a session that was stopped or never
    /// finished its handshake.
    fn rearm(&mut self) {
        if self.handshake_completed && !self.stopped && !self.liveness.is_alive() {
            self.liveness.arm(self.config.handshake_ticks);
        }
    }

    fn send(&mut self, command: &str) -> bool {
        tracing::debug!("Sending '{}'", command);
        self.writer.write_line(command)
    }

    /// Run the `uci` handshake.
    ///
    /// Clears all session state, then waits until `uciok` arrives, the
    /// handshake budget runs out, the wait is cancelled or the engine closes.
    /// Returns whether `uciok` was seen; a timeout is not an error.
    pub async fn uci(&mut self) -> bool {
        self.state.reset();
        self.state.uci_requested = true;
        self.stopped = false;
        self.liveness.arm(self.config.handshake_ticks);

        tracing::info!("Starting UCI handshake");
        if !self.send("uci") {
            return false;
        }

        let interval = self.config.tick_interval;
        polling_loop(
            self,
            interval,
            |s| {
                s.pump();
                if !s.state.uciok {
                    s.liveness.tick();
                }
            },
            |s| !s.state.uciok && s.liveness.is_alive() && !s.eof,
        )
        .await;

        if self.state.uciok {
            tracing::info!(
                "Handshake complete: {} by {}",
                self.state.id_name.as_deref().unwrap_or("<unnamed>"),
                self.state.id_author.as_deref().unwrap_or("<unknown>")
            );
        } else {
            tracing::warn!("Handshake ended without uciok");
        }
        self.state.uciok
    }

    pub fn isready(&mut self) -> bool {
        self.state.readyok = false;
        self.send("isready")
    }

    /// Send `isready` and wait for `readyok` under the same bounds as
    /// [`go`](Self::go).
    pub async fn wait_ready(&mut self) -> bool {
        if !self.isready() {
            return false;
        }
        self.rearm();
        let interval = self.config.tick_interval;
        polling_loop(
            self,
            interval,
            |s| {
                s.pump();
            },
            |s| !s.state.readyok && s.liveness.is_alive() && !s.eof,
        )
        .await;
        self.state.readyok
    }

    /// Send `setoption` and record `value` locally, whether or not the engine
    /// ever advertised the option.
    pub fn set_option(&mut self, name: &str, value: Option<&str>) -> bool {
        let command = match value {
            Some(value) => format!("setoption name {} value {}", name, value),
            None => format!("setoption name {}", name),
        };
        tracing::info!("Setting option: {}", command);
        let sent = self.send(&command);

        let value = value.map(str::to_string);
        self.state
            .options
            .entry(name.to_string())
            .or_insert_with(|| OptionDescriptor::new(OptionKind::String))
            .value = value.clone();
        self.emit(Event::OptionSet {
            name: name.to_string(),
            value,
        });
        sent
    }

    pub fn position(&mut self, spec: &PositionSpec) -> bool {
        let command = spec.to_command();
        self.send(&command)
    }

    /// Start a search and wait for its best move.
    ///
    /// The wait ends on a `bestmove`, on cancellation (`stop()`, a cloned
    /// [`Liveness`], the abort sentinel) or when the engine closes. A
    /// cancellation only ends the wait it interrupts; the next call waits
    /// again. Without a completed handshake, or after `stop()`, this returns
    /// after a single pass. If the future is dropped the search keeps
    /// running in the engine and a later `bestmove` still clears it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SearchPending`] if the previous search has not
    /// finished and was not stopped.
    pub async fn go(&mut self, params: &GoParams) -> Result<Option<BestMove>, EngineError> {
        if self.search_pending {
            return Err(EngineError::SearchPending);
        }

        self.state.best_move = None;
        self.state.ponder_move = None;
        let command = params.to_command();
        tracing::info!("Starting engine calculation: {}", command);
        if !self.send(&command) {
            return Ok(None);
        }
        self.search_pending = true;
        self.rearm();

        let interval = self.config.tick_interval;
        polling_loop(
            self,
            interval,
            |s| {
                s.pump();
            },
            |s| s.state.best_move.is_none() && s.liveness.is_alive() && !s.eof,
        )
        .await;

        Ok(self.state.last_best_move())
    }

    /// Send `stop` and `quit` if the engine ever completed a handshake, then
    /// cancel every pending wait. Later waits return after a single pass
    /// until `uci()` runs again.
    ///
    /// A running wait holds `&mut self`, so `stop()` cannot interrupt it.
    /// Call `cancel()` on a handle taken from [`liveness`](Self::liveness)
    /// to end a wait in flight, including one mid-handshake.
    pub fn stop(&mut self) {
        if self.handshake_completed {
            tracing::info!("Sending stop and quit to engine");
            self.send("stop");
            self.send("quit");
        }
        self.stopped = true;
        self.liveness.cancel();
        self.search_pending = false;
    }

    /// Tell the engine the next search belongs to a new game.
    pub fn newgame(&mut self) -> bool {
        self.send("ucinewgame")
    }

    /// Pass an application-defined command through unchanged.
    pub fn send_raw(&mut self, line: &str) -> bool {
        self.send(line)
    }
}

impl<R, W> Drop for EngineSession<R, W> {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                tracing::debug!("Killing engine {} on drop", child.id());
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}
