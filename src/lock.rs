//! Locking and atomic writes.
//!
//! Two layers serialize mutations of one project:
//! - `ProjectLocks`: an in-process table of busy project ids, so threads
//!   sharing a scheduler never interleave edits of the same project
//! - `FileLock`: an exclusive flock on a file, used for cross-process
//!   exclusion on the store and on per-project lock files
//!
//! Edits of different projects never wait on each other at the project
//! layer; the store file lock is only held for the read-modify-write of a
//! single commit.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};
use crate::project::ProjectId;

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Default retry interval when waiting for a file lock
const LOCK_RETRY_INTERVAL_MS: u64 = 50;

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // On Windows, fs2/libc can surface lock/sharing violations as "Other".
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?)
}

/// A file lock guard that releases the lock when dropped
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire an exclusive lock on a file, waiting up to `timeout_ms`.
    ///
    /// The file (and its parent directory) is created if missing.
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;

        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let retry_interval = Duration::from_millis(LOCK_RETRY_INTERVAL_MS);

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    return Ok(FileLock {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if is_lock_contended(&e) => {
                    if start.elapsed() >= timeout {
                        tracing::warn!(path = %path.display(), timeout_ms, "file lock timed out");
                        return Err(Error::LockFailed(path.to_path_buf()));
                    }
                    std::thread::sleep(retry_interval);
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }
    }

    /// Try to acquire a lock without waiting
    ///
    /// Returns `Ok(None)` if another holder has it.
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = open_lock_file(path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(FileLock {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if is_lock_contended(&e) => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Atomically write data to a file
///
/// Writes a temporary sibling file, syncs it, then renames it over the
/// target. Does not lock; callers hold the relevant `FileLock`.
pub fn write_atomic(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension(format!(
        "{}.tmp.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        std::process::id()
    ));

    let mut temp_file = File::create(&temp_path)?;
    temp_file.write_all(data)?;
    temp_file.sync_all()?;
    drop(temp_file);

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// In-process table of projects currently being mutated.
///
/// `acquire` blocks until the project is free or the timeout passes. When a
/// lock directory is configured, the guard also holds
/// `<dir>/project-<id>.lock` so separate processes serialize too.
#[derive(Debug)]
pub struct ProjectLocks {
    busy: Mutex<HashSet<ProjectId>>,
    released: Condvar,
    timeout: Duration,
    lock_dir: Option<PathBuf>,
}

impl ProjectLocks {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            busy: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout: Duration::from_millis(timeout_ms),
            lock_dir: None,
        }
    }

    /// Also take a per-project file lock under `dir`.
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    pub fn acquire(&self, project_id: ProjectId) -> Result<ProjectGuard<'_>> {
        let deadline = Instant::now() + self.timeout;
        let mut busy = self.table()?;
        while busy.contains(&project_id) {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(project_id, "project lock timed out");
                return Err(Error::LockFailed(self.lock_path(project_id)));
            }
            let (next, _) = self
                .released
                .wait_timeout(busy, deadline - now)
                .map_err(|_| poisoned())?;
            busy = next;
        }
        busy.insert(project_id);
        drop(busy);

        let mut guard = ProjectGuard {
            locks: self,
            project_id,
            file: None,
        };
        if self.lock_dir.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let timeout_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
            guard.file = Some(FileLock::acquire(self.lock_path(project_id), timeout_ms)?);
        }
        tracing::trace!(project_id, "project lock acquired");
        Ok(guard)
    }

    fn lock_path(&self, project_id: ProjectId) -> PathBuf {
        let name = format!("project-{project_id}.lock");
        match &self.lock_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    fn table(&self) -> Result<MutexGuard<'_, HashSet<ProjectId>>> {
        self.busy.lock().map_err(|_| poisoned())
    }

    fn release(&self, project_id: ProjectId) {
        let mut busy = match self.busy.lock() {
            Ok(busy) => busy,
            Err(poisoned) => poisoned.into_inner(),
        };
        busy.remove(&project_id);
        drop(busy);
        self.released.notify_all();
    }
}

impl Default for ProjectLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT_MS)
    }
}

fn poisoned() -> Error {
    Error::OperationFailed("project lock table poisoned".to_string())
}

/// Held while one project is being mutated.
#[derive(Debug)]
pub struct ProjectGuard<'a> {
    locks: &'a ProjectLocks,
    project_id: ProjectId,
    file: Option<FileLock>,
}

impl ProjectGuard<'_> {
    /// Release the project and remove its lock file, for a project that no
    /// longer exists.
    pub fn discard(mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        let project_id = self.project_id;
        match fs::remove_file(file.path()) {
            Ok(()) => tracing::debug!(project_id, "removed project lock file"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(project_id, error = %err, "could not remove project lock file")
            }
        }
    }
}

impl Drop for ProjectGuard<'_> {
    fn drop(&mut self) {
        // File lock first so a waiting process never sees the table free
        // while the file is still held.
        self.file.take();
        self.locks.release(self.project_id);
    }
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock").field("path", &self.path).finish()
    }
}
