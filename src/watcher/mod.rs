//! Change notification for session log files.
//!
//! Uses notify crate for cross-platform file system events.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches a single file and wakes readers when it may have grown.
pub struct LogWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
}

impl LogWatcher {
    /// Create a watcher for `path`.
    ///
    /// # Errors
    /// Returns an error if the file watcher cannot be created or the path cannot be watched.
    pub fn new(path: impl AsRef<Path>) -> notify::Result<Self> {
        // Canonicalize so event paths from the OS (which are always absolute
        // and canonical) match our stored paths.
        let target_path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
        })
    }

    /// The canonical path of the file being watched.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Block for up to `timeout` waiting for a relevant change.
    ///
    /// Returns `true` if the watched file (or its directory) reported an
    /// event. Every already-queued event is drained before returning.
    pub fn wait_for_change(&self, timeout: Duration) -> bool {
        let first = match self.rx.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return false,
        };

        let mut relevant = self.classify(first);
        while let Ok(event) = self.rx.try_recv() {
            relevant |= self.classify(event);
        }
        relevant
    }

    fn classify(&self, event: notify::Result<Event>) -> bool {
        match event {
            Ok(ev) if self.is_relevant(&ev) => true,
            Ok(ev) => {
                tracing::trace!(kind = ?ev.kind, paths = ?ev.paths, "ignoring unrelated fs event");
                false
            }
            Err(err) => {
                tracing::debug!(%err, "watcher error");
                false
            }
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use std::io::Write;
    use std::time::Instant;
    use tempfile::tempdir;

    #[test]
    fn test_directory_level_event_is_relevant_for_watched_file() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("abc.log");
        std::fs::write(&path, "").expect("write");
        let watcher = LogWatcher::new(&path).expect("watcher");

        // Event with canonical directory path (as macOS FSEvents would report)
        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir],
            attrs: notify::event::EventAttributes::new(),
        };

        assert!(
            watcher.is_relevant(&event),
            "directory-level events should count as relevant for many backends"
        );
    }

    #[test]
    fn test_sibling_file_event_is_not_relevant() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("abc.log");
        std::fs::write(&path, "").expect("write");
        let watcher = LogWatcher::new(&path).expect("watcher");

        let event = Event {
            kind: EventKind::Any,
            paths: vec![canonical_dir.join("other.log")],
            attrs: notify::event::EventAttributes::new(),
        };

        assert!(!watcher.is_relevant(&event));
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        let root = watch_root_for(Path::new("session.log"));
        assert_eq!(root, PathBuf::from("."));
    }

    #[test]
    fn test_wait_for_change_times_out_without_events() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("quiet.log");
        std::fs::write(&path, "").expect("write");
        let watcher = LogWatcher::new(&path).expect("watcher");

        // Let any creation events settle before measuring quiet time.
        let _ = watcher.wait_for_change(Duration::from_millis(200));
        assert!(!watcher.wait_for_change(Duration::from_millis(20)));
    }

    #[test]
    fn test_append_is_detected() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("grow.log");
        std::fs::write(&path, "").expect("write");

        let watcher = LogWatcher::new(&path).expect("watcher");

        // Give FSEvents time to register the watch
        std::thread::sleep(Duration::from_millis(500));

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .expect("open");
        file.write_all(b"{}\n").expect("append");
        file.sync_all().expect("sync");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut detected = false;
        while Instant::now() < deadline {
            if watcher.wait_for_change(Duration::from_millis(100)) {
                detected = true;
                break;
            }
        }

        assert!(detected, "watcher should report an append within 5 seconds");
    }
}
