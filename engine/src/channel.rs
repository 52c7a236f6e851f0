//! Line-oriented reading and writing over the engine's pipes.
//!
//! [`ChannelReader`] never blocks: every read is preceded by a zero-timeout
//! `poll(2)`. Bytes are split into lines by a [`LineBuffer`] which keeps a
//! trailing fragment until its newline arrives, so lines come out whole no
//! matter how the engine's output is chunked.

use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};

/// Outcome of one [`ChannelReader::drain`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Nothing was ready.
    Idle,
    /// One chunk of this many bytes was read.
    Data(usize),
    /// The engine closed its end. Returned exactly once.
    Eof,
    /// End of stream was already reported by an earlier pass.
    Closed,
}

/// Splits a byte stream into lines.
///
/// Lines end at `\n`; a `\r` right before it is dropped. Invalid UTF-8 is
/// replaced rather than rejected.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, calling `on_line` for every line completed by them.
    pub fn push(&mut self, bytes: &[u8], mut on_line: impl FnMut(String)) {
        let mut rest = bytes;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending.extend_from_slice(&rest[..pos]);
            on_line(decode(std::mem::take(&mut self.pending)));
            rest = &rest[pos + 1..];
        }
        self.pending.extend_from_slice(rest);
    }

    /// Hand out whatever is left as a final line.
    pub fn finish(&mut self, mut on_line: impl FnMut(String)) {
        if !self.pending.is_empty() {
            on_line(decode(std::mem::take(&mut self.pending)));
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn decode(mut raw: Vec<u8>) -> String {
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    match String::from_utf8(raw) {
        Ok(line) => line,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// Whether `fd` has something to read (data, hangup or an error) right now.
fn poll_readable(fd: RawFd) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: `pfd` is a valid, exclusively borrowed pollfd and nfds is 1.
    let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    let ready = libc::POLLIN | libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;
    Ok(rc > 0 && pfd.revents & ready != 0)
}

/// Non-blocking line reader over the engine's stdout.
#[derive(Debug)]
pub struct ChannelReader<R> {
    inner: R,
    buffer: LineBuffer,
    chunk: Vec<u8>,
    closed: bool,
}

impl<R: Read + AsRawFd> ChannelReader<R> {
    pub fn new(inner: R, chunk_size: usize) -> Self {
        Self {
            inner,
            buffer: LineBuffer::new(),
            chunk: vec![0; chunk_size.max(1)],
            closed: false,
        }
    }

    /// Read at most one chunk if one is ready, forwarding complete lines.
    ///
    /// On end of stream the buffered fragment (if any) is forwarded first and
    /// [`ReadStatus::Eof`] is returned; later calls return
    /// [`ReadStatus::Closed`] without touching the descriptor.
    pub fn drain(&mut self, mut on_line: impl FnMut(String)) -> ReadStatus {
        if self.closed {
            return ReadStatus::Closed;
        }

        match poll_readable(self.inner.as_raw_fd()) {
            Ok(true) => {}
            Ok(false) => return ReadStatus::Idle,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return ReadStatus::Idle,
            Err(e) => {
                tracing::warn!("poll on engine stdout failed: {}", e);
                return self.close(on_line);
            }
        }

        match self.inner.read(&mut self.chunk) {
            Ok(0) => self.close(on_line),
            Ok(n) => {
                self.buffer.push(&self.chunk[..n], &mut on_line);
                ReadStatus::Data(n)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) =>
            {
                ReadStatus::Idle
            }
            Err(e) => {
                tracing::warn!("Error reading from engine stdout: {}", e);
                self.close(on_line)
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn close(&mut self, on_line: impl FnMut(String)) -> ReadStatus {
        self.buffer.finish(on_line);
        self.closed = true;
        ReadStatus::Eof
    }
}

/// Line writer over the engine's stdin.
#[derive(Debug)]
pub struct ChannelWriter<W> {
    inner: Option<W>,
}

impl<W: Write> ChannelWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    /// Write `line` plus a newline in one call.
    ///
    /// Returns `false` (after logging) on an error, a short write, or when
    /// the channel was closed. Never panics.
    pub fn write_line(&mut self, line: &str) -> bool {
        let Some(inner) = self.inner.as_mut() else {
            tracing::warn!("Dropping '{}': engine stdin is closed", line);
            return false;
        };

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        tracing::trace!("UCI >> {}", line);
        match inner.write(buf.as_bytes()) {
            Ok(n) if n == buf.len() => {}
            Ok(n) => {
                tracing::warn!(
                    "Short write to engine: {} of {} bytes for '{}'",
                    n,
                    buf.len(),
                    line
                );
                return false;
            }
            Err(e) => {
                tracing::warn!("Failed to write '{}' to engine: {}", line, e);
                return false;
            }
        }
        if let Err(e) = inner.flush() {
            tracing::warn!("Failed to flush engine stdin: {}", e);
            return false;
        }
        true
    }

    /// Drop the write end so the engine sees end of input.
    pub fn close(&mut self) {
        self.inner = None;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}
