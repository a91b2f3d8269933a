//! Append-only log file channel.
//!
//! A session is one JSON-lines file. Each batch is appended with a single
//! write, so the file order is the global delivery order, and a record's line
//! number is its sequence number. Subscribers tail the file, woken by
//! filesystem notifications with a polling fallback.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use crate::document::Operation;
use crate::watcher::LogWatcher;
use crate::wire;

use super::{Delivered, Subscription, Transport, TransportError};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Log file for session `code` inside `dir`.
pub fn session_log_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{code}.log"))
}

/// A participant's handle on a session log file.
#[derive(Debug, Clone)]
pub struct FileTransport {
    path: PathBuf,
    client_id: String,
    poll_interval: Duration,
}

impl FileTransport {
    /// Create a new, empty session log.
    ///
    /// # Errors
    /// Fails with [`std::io::ErrorKind::AlreadyExists`] if the session exists.
    pub fn create(path: impl Into<PathBuf>, client_id: impl Into<String>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok(Self::at(path, client_id))
    }

    /// Open an existing session log.
    ///
    /// # Errors
    /// Fails with [`std::io::ErrorKind::NotFound`] if the session does not exist.
    pub fn open(path: impl Into<PathBuf>, client_id: impl Into<String>) -> std::io::Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no session log at {}", path.display()),
            ));
        }
        Ok(Self::at(path, client_id))
    }

    fn at(path: PathBuf, client_id: impl Into<String>) -> Self {
        Self {
            path,
            client_id: client_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override how often subscribers re-read the log without a notification.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Transport for FileTransport {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn publish(&self, batch: &[Operation]) -> Result<(), TransportError> {
        let mut buf = String::new();
        for op in batch {
            buf.push_str(&wire::encode_record(&self.client_id, op)?);
            buf.push('\n');
        }
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        Ok(())
    }

    fn subscribe(&self) -> Result<Subscription, TransportError> {
        let (tx, rx) = mpsc::channel();
        let path = self.path.clone();
        let poll_interval = self.poll_interval;
        thread::spawn(move || tail_log(&path, poll_interval, &tx));
        Ok(Subscription::new(rx))
    }

    fn history(&self) -> Result<Vec<Delivered>, TransportError> {
        let bytes = fs::read(&self.path)?;
        let mut reader = LogReader::default();
        Ok(reader.feed(&bytes))
    }
}

/// Incremental parser over complete log lines.
#[derive(Debug, Default)]
struct LogReader {
    next_seq: u64,
    partial: Vec<u8>,
}

impl LogReader {
    /// Consume newly read bytes and return the records they complete.
    ///
    /// A trailing line without `\n` is held back until the rest arrives.
    fn feed(&mut self, bytes: &[u8]) -> Vec<Delivered> {
        self.partial.extend_from_slice(bytes);
        let Some(last_newline) = self.partial.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.partial.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.partial, rest);

        let mut out = Vec::new();
        for line in complete.split(|b| *b == b'\n') {
            if line.is_empty() {
                continue;
            }
            let seq = self.next_seq;
            self.next_seq += 1;
            let record = std::str::from_utf8(line)
                .map_err(|err| err.to_string())
                .and_then(|text| wire::decode_record(text).map_err(|err| err.to_string()));
            match record {
                Ok(record) => out.push(Delivered {
                    seq,
                    client_id: record.client_id,
                    op: record.op,
                }),
                Err(err) => tracing::debug!(seq, %err, "dropping malformed log record"),
            }
        }
        out
    }
}

/// Forward every record of `path` to `tx`, starting from the beginning.
///
/// Returns once the subscriber hangs up or the log becomes unreadable.
fn tail_log(path: &Path, poll_interval: Duration, tx: &Sender<Delivered>) {
    let watcher = match LogWatcher::new(path) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "log notifications unavailable; polling");
            None
        }
    };

    let mut reader = LogReader::default();
    let mut offset = 0u64;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = fs::File::open(path).and_then(|mut file| {
            file.seek(SeekFrom::Start(offset))?;
            file.read_to_end(&mut buf)
        });
        match read {
            Ok(n) => offset += n as u64,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    %err,
                    "session log unreadable; closing subscription"
                );
                return;
            }
        }

        for delivered in reader.feed(&buf) {
            if tx.send(delivered).is_err() {
                return;
            }
        }

        match &watcher {
            Some(watcher) => {
                watcher.wait_for_change(poll_interval);
            }
            None => thread::sleep(poll_interval),
        }
    }
}
