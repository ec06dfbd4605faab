//! The local terminal as a render surface.

use std::io::{self, IsTerminal, Read, Write};

use crossterm::terminal;
use tracing::{debug, warn};

use webterm_core::{Geometry, ProposedDimensions};
use webterm_transport::{RenderSurface, TransportHandle};

/// Detach key: Ctrl-]
const DETACH: u8 = 0x1d;

/// Puts the local terminal in raw mode until dropped.
///
/// Does nothing when stdin is not a terminal.
pub struct RawMode(bool);

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        if !io::stdin().is_terminal() {
            debug!("stdin is not a terminal; staying in cooked mode");
            return Ok(Self(false));
        }
        terminal::enable_raw_mode()?;
        Ok(Self(true))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if !self.0 {
            return;
        }
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Renders PTY output by writing it straight to stdout.
///
/// The local terminal does the escape-sequence parsing, so resizing only
/// records the geometry the remote side was told about.
#[derive(Debug)]
pub struct TtySurface {
    geometry: Geometry,
}

impl TtySurface {
    pub fn new() -> Self {
        let geometry = terminal::size()
            .ok()
            .and_then(|(cols, rows)| Geometry::new(cols, rows).ok())
            .unwrap_or_default();
        Self { geometry }
    }
}

impl Default for TtySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface for TtySurface {
    fn write(&mut self, bytes: &[u8]) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(bytes).and_then(|_| stdout.flush()) {
            warn!("Failed to write output: {}", e);
        }
    }

    fn propose_dimensions(&self) -> Option<ProposedDimensions> {
        match terminal::size() {
            Ok((cols, rows)) => Some(ProposedDimensions::new(cols, rows)),
            Err(e) => {
                debug!("Cannot measure terminal: {}", e);
                None
            }
        }
    }

    fn resize(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn focus(&mut self) {}
}

/// Forward stdin to the transport on a blocking thread.
///
/// Ctrl-] shuts the transport down. Stdin closing does the same.
pub fn spawn_stdin_reader(handle: TransportHandle) {
    std::thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        let mut decoder = Utf8Carry::default();
        let mut buf = [0u8; 1024];

        loop {
            let n = match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            };

            let chunk = &buf[..n];
            let (keys, detach) = match chunk.iter().position(|&b| b == DETACH) {
                Some(at) => (&chunk[..at], true),
                None => (chunk, false),
            };

            let text = decoder.push(keys);
            if !text.is_empty() {
                handle.send_input(text);
            }
            if detach || !handle.is_running() {
                break;
            }
        }

        debug!("Stdin reader stopped");
        handle.shutdown();
    });
}

/// Decodes UTF-8 across read boundaries.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut text = String::new();
        let mut rest = &self.pending[..];
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end waits for the next read
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let tail = rest.to_vec();
        self.pending = tail;
        text
    }
}

/// Writer that turns bare `\n` into `\r\n`.
///
/// Raw mode disables output newline translation, so log lines written to
/// stderr would otherwise drift to the right.
#[derive(Debug)]
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, &byte) in buf.iter().enumerate() {
            if byte == b'\n' && (i == 0 || buf[i - 1] != b'\r') {
                self.inner.write_all(&buf[start..i])?;
                self.inner.write_all(b"\r\n")?;
                start = i + 1;
            }
        }
        self.inner.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
