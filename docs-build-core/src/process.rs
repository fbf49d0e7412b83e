//! Running external tools while streaming their output.
//!
//! [`ProcessRunner`] spawns the child with piped stdout/stderr and one reader task
//! per pipe. Readers forward every read as an ANSI-stripped chunk, partial lines
//! included; `run` passes them to the configured [`LogSink`] and keeps a copy for
//! the [`ProcessResult`].
//!
//! `run` resolves when the child exits. Output still in flight is collected for
//! at most [`OUTPUT_GRACE`], so a background process holding the pipes open
//! does not hold up the result.
//!
//! Dropping a pending `run` future does not kill the child: the readers keep
//! draining the pipes until it exits and its output is discarded.

use async_trait::async_trait;
use regex::Regex;
use std::borrow::Cow;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info};

use crate::contract::{CommandRunner, LogSink};

/// CSI runs terminated by a single letter.
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap());

/// How long `run` keeps collecting output after the child has exited.
pub const OUTPUT_GRACE: Duration = Duration::from_millis(200);

/// Longest unterminated escape sequence held back between reads.
const MAX_ESCAPE_LEN: usize = 32;

pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_RE.replace_all(text, "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
    /// Lines written by the runner itself (`$ ...` echo and exit code).
    Runner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub stream: OutputStream,
    pub text: String,
}

impl LogChunk {
    pub fn runner(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Runner,
            text: text.into(),
        }
    }
}

/// Outcome of a process that exited on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub exit_code: i32,
    /// Combined stdout/stderr in arrival order, ANSI-stripped.
    pub log: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} was terminated by signal {signal}")]
    Killed {
        program: String,
        signal: i32,
        log: String,
    },
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct ProcessRunner {
    sink: Arc<dyn LogSink>,
    current_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            current_dir: None,
        }
    }

    /// Runs every tool from `dir` instead of the caller's working directory.
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ProcessResult, ProcessError> {
        let echo = if args.is_empty() {
            format!("$ {program}\n")
        } else {
            format!("$ {program} {}\n", args.join(" "))
        };
        self.sink.append(&LogChunk::runner(echo));
        info!(program, ?args, "[PROCESS] Spawning");

        let mut command = Command::new(program);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        let mut child = command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| {
                error!(program, error = %source, "[PROCESS] Failed to launch");
                self.sink
                    .append(&LogChunk::runner(format!("$ Error: {source}\n")));
                ProcessError::Launch {
                    program: program.to_string(),
                    source,
                }
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump(stdout, OutputStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump(stderr, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        let mut log = String::new();
        let mut open = true;
        let waited = loop {
            tokio::select! {
                biased;
                chunk = rx.recv(), if open => match chunk {
                    Some(chunk) => {
                        log.push_str(&chunk.text);
                        self.sink.append(&chunk);
                    }
                    None => open = false,
                },
                status = child.wait() => break status,
            }
        };
        let status = waited.map_err(|source| ProcessError::Wait {
            program: program.to_string(),
            source,
        })?;

        let deadline = Instant::now() + OUTPUT_GRACE;
        while open {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(chunk)) => {
                    log.push_str(&chunk.text);
                    self.sink.append(&chunk);
                }
                Ok(None) => open = false,
                Err(_) => {
                    debug!(program, "[PROCESS] Pipes still open after exit, not waiting");
                    break;
                }
            }
        }

        match status.code() {
            Some(exit_code) => {
                self.sink
                    .append(&LogChunk::runner(format!("$ Exit Code: {exit_code}\n")));
                info!(program, exit_code, "[PROCESS] Exited");
                Ok(ProcessResult { exit_code, log })
            }
            None => {
                let signal = terminating_signal(&status).unwrap_or(-1);
                self.sink.append(&LogChunk::runner(format!(
                    "$ Exit Code: none (signal {signal})\n"
                )));
                error!(program, signal, "[PROCESS] Terminated by signal");
                Err(ProcessError::Killed {
                    program: program.to_string(),
                    signal,
                    log,
                })
            }
        }
    }
}

#[cfg(unix)]
fn terminating_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn terminating_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Reads one pipe until EOF, forwarding each read as it arrives. Keeps draining
/// after the receiver is gone so the child never blocks on a full pipe.
async fn pump<R>(mut reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<LogChunk>)
where
    R: AsyncRead + Unpin,
{
    let mut decoder = ChunkDecoder::default();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.push(&buf[..n]);
                if !text.is_empty() {
                    let _ = tx.send(LogChunk { stream, text });
                }
            }
            Err(e) => {
                debug!(?stream, error = %e, "[PROCESS] Pipe read failed");
                break;
            }
        }
    }
    let text = decoder.finish();
    if !text.is_empty() {
        let _ = tx.send(LogChunk { stream, text });
    }
}

/// Decodes raw pipe reads into ANSI-stripped text. A UTF-8 character or a CSI
/// sequence split across two reads is held back until the next read completes it.
#[derive(Debug, Default)]
struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        let mut rest: &[u8] = &self.pending;
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
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        let incomplete_char = rest.to_vec();

        let held = text.split_off(unfinished_escape(&text));
        self.pending = held.into_bytes();
        self.pending.extend_from_slice(&incomplete_char);
        strip_ansi(&text).into_owned()
    }

    fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        strip_ansi(&String::from_utf8_lossy(&rest)).into_owned()
    }
}

/// Byte offset of a trailing `ESC[` sequence that has no final letter yet, or
/// `text.len()` when there is none.
fn unfinished_escape(text: &str) -> usize {
    let Some(at) = text.rfind('\x1b') else {
        return text.len();
    };
    let tail = &text[at..];
    if tail.len() > MAX_ESCAPE_LEN {
        return text.len();
    }
    match tail[1..].strip_prefix('[') {
        Some(params) if params.chars().all(|c| c.is_ascii_digit() || c == ';') => at,
        None if tail.len() == 1 => at,
        _ => text.len(),
    }
}

/// Sink that keeps every chunk in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    chunks: Arc<Mutex<Vec<LogChunk>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunks(&self) -> Vec<LogChunk> {
        self.chunks.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn text(&self) -> String {
        self.chunks().into_iter().map(|c| c.text).collect()
    }
}

impl LogSink for MemorySink {
    fn append(&self, chunk: &LogChunk) {
        if let Ok(mut chunks) = self.chunks.lock() {
            chunks.push(chunk.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_colour_and_cursor_sequences() {
        let coloured = "\x1b[1;32mok\x1b[0m done\x1b[2K";
        assert_eq!(strip_ansi(coloured), "ok done");
    }

    #[test]
    fn leaves_plain_text_borrowed() {
        assert!(matches!(strip_ansi("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn character_split_across_reads_is_joined() {
        let mut decoder = ChunkDecoder::default();
        let bytes = "Größe".as_bytes();
        assert_eq!(decoder.push(&bytes[..3]), "Gr");
        assert_eq!(decoder.push(&bytes[3..]), "öße");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn escape_split_across_reads_is_still_stripped() {
        let mut decoder = ChunkDecoder::default();
        assert_eq!(decoder.push(b"progress \x1b[1;3"), "progress ");
        assert_eq!(decoder.push(b"2m50%\x1b[0m\r"), "50%\r");
        assert_eq!(decoder.push(b"done\x1b"), "done");
        assert_eq!(decoder.push(b"[2K\n"), "\n");
    }

    #[test]
    fn invalid_bytes_are_replaced_not_held() {
        let mut decoder = ChunkDecoder::default();
        assert_eq!(decoder.push(b"a\xffb"), "a\u{fffd}b");
        assert!(decoder.pending.is_empty());
    }

    #[test]
    fn unfinished_tail_is_flushed_at_end_of_stream() {
        let mut decoder = ChunkDecoder::default();
        assert_eq!(decoder.push(b"half \xc3"), "half ");
        assert_eq!(decoder.finish(), "\u{fffd}");
    }
}
