//! Persistent run counter.
//!
//! Every completed export stamps its footer with a run ordinal taken from a
//! [`RunCounter`]. The counter is a capability handed to the pipeline, so
//! tests use [`MemoryRunCounter`] while the CLI uses [`FileRunCounter`].

use std::{
    fs::OpenOptions,
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::error::{Error, Result};

/// An atomic increment-and-read counter.
pub trait RunCounter {
    /// Increments the counter and returns the new value.
    ///
    /// The first call on a fresh counter returns 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read or persisted.
    fn increment_and_read(&self) -> Result<u64>;
}

/// Counter stored in a small text file, guarded by an exclusive OS lock.
///
/// Concurrent invocations on the same installation serialize on the lock,
/// so each one observes a distinct value.
#[derive(Debug, Clone)]
pub struct FileRunCounter {
    path: PathBuf,
}

impl FileRunCounter {
    /// Counter for `installation` stored under `dir`.
    pub fn new(dir: impl AsRef<Path>, installation: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("run-counter-{installation}")),
        }
    }

    /// Counter for `installation` in the platform data directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Counter`] if the platform has no data directory.
    pub fn in_data_dir(installation: &str) -> Result<Self> {
        let dir = default_dir()
            .ok_or_else(|| Error::counter("could not determine a data directory"))?;
        Ok(Self::new(dir, installation))
    }

    /// Path of the counter file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Default counter directory: `<data dir>/cprf-audit`.
pub fn default_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("cprf-audit"))
}

impl RunCounter for FileRunCounter {
    fn increment_and_read(&self) -> Result<u64> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| Error::io(e, &self.path))?;

        let mut lock = fd_lock::RwLock::new(file);
        let mut guard = lock.write().map_err(|e| Error::io(e, &self.path))?;

        let mut text = String::new();
        guard
            .read_to_string(&mut text)
            .map_err(|e| Error::io(e, &self.path))?;
        let current = match text.trim() {
            "" => 0,
            value => value.parse::<u64>().map_err(|_| {
                Error::counter(format!(
                    "{} holds '{}', expected a number",
                    self.path.display(),
                    value
                ))
            })?,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| Error::counter("run counter overflow"))?;

        guard
            .seek(SeekFrom::Start(0))
            .and_then(|_| guard.set_len(0))
            .and_then(|()| guard.write_all(next.to_string().as_bytes()))
            .and_then(|()| guard.sync_all())
            .map_err(|e| Error::io(e, &self.path))?;

        tracing::debug!(path = %self.path.display(), run = next, "incremented run counter");
        Ok(next)
    }
}

/// In-process counter.
#[derive(Debug, Default)]
pub struct MemoryRunCounter {
    value: AtomicU64,
}

impl MemoryRunCounter {
    /// Counter whose next increment returns `start + 1`.
    pub fn new(start: u64) -> Self {
        Self {
            value: AtomicU64::new(start),
        }
    }

    /// Current value without incrementing.
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl RunCounter for MemoryRunCounter {
    fn increment_and_read(&self) -> Result<u64> {
        let previous = self.value.fetch_add(1, Ordering::SeqCst);
        previous
            .checked_add(1)
            .ok_or_else(|| Error::counter("run counter overflow"))
    }
}
