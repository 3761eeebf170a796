//! On-disk store for wbs
//!
//! All schedule state lives in one JSON document under the schedule root:
//!
//! ```text
//! <root>/
//!   .wbs.toml                   # Optional configuration
//!   .wbs/
//!     store.json                # Projects, tasks and id counters
//!     store.json.lock           # Lock file guarding store.json
//!     locks/
//!       project-<id>.lock       # Held for the length of one project edit
//! ```
//!
//! Every read and every commit holds the store lock; commits are
//! read-modify-write followed by an atomic temp-file rename, so concurrent
//! readers never observe a partial document.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock};
use crate::store::{StateAccess, StoreState, STORE_SCHEMA_VERSION};

/// Name of the state directory inside the schedule root
pub const STATE_DIR: &str = ".wbs";

/// Name of the store document inside the state directory
pub const STORE_FILE: &str = "store.json";

/// JSON-document store rooted at a schedule directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, lock_timeout_ms: u64) -> Self {
        Self {
            root: root.into(),
            lock_timeout_ms,
        }
    }

    /// Open an initialized store; fails if `wbs init` has not been run.
    pub fn open(root: impl Into<PathBuf>, lock_timeout_ms: u64) -> Result<Self> {
        let store = Self::new(root, lock_timeout_ms);
        if !store.is_initialized() {
            return Err(Error::OperationFailed(format!(
                "no schedule found at {} (run `wbs init` first)",
                store.root.display()
            )));
        }
        Ok(store)
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// Path to the `.wbs/` directory
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    /// Path to the store document
    pub fn store_file(&self) -> PathBuf {
        self.state_dir().join(STORE_FILE)
    }

    /// Directory holding per-project lock files
    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir().join("locks")
    }

    fn store_lock_file(&self) -> PathBuf {
        PathBuf::from(format!("{}.lock", self.store_file().display()))
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Create the state directory and an empty store document.
    ///
    /// Returns `false` when the store already existed; it is left untouched.
    pub fn init(&self) -> Result<bool> {
        fs::create_dir_all(self.locks_dir())?;
        let _lock = FileLock::acquire(self.store_lock_file(), self.lock_timeout_ms)?;
        if self.store_file().exists() {
            return Ok(false);
        }
        write_json(&self.store_file(), &StoreState::default())?;
        tracing::info!(path = %self.store_file().display(), "initialized store");
        Ok(true)
    }

    pub fn is_initialized(&self) -> bool {
        self.store_file().exists()
    }

    fn load(&self) -> Result<StoreState> {
        let path = self.store_file();
        if !path.exists() {
            return Ok(StoreState::default());
        }
        let state: StoreState = read_json(&path)?;
        if state.schema_version > STORE_SCHEMA_VERSION {
            return Err(Error::OperationFailed(format!(
                "store schema version {} is newer than supported version {}",
                state.schema_version, STORE_SCHEMA_VERSION
            )));
        }
        Ok(state)
    }
}

impl StateAccess for FileStore {
    fn read<T>(&self, f: impl FnOnce(&StoreState) -> Result<T>) -> Result<T> {
        let _lock = FileLock::acquire(self.store_lock_file(), self.lock_timeout_ms)?;
        let state = self.load()?;
        f(&state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T> {
        let _lock = FileLock::acquire(self.store_lock_file(), self.lock_timeout_ms)?;
        let mut state = self.load()?;
        let result = f(&mut state)?;
        state.schema_version = STORE_SCHEMA_VERSION;
        write_json(&self.store_file(), &state)?;
        tracing::debug!(
            projects = state.projects.len(),
            tasks = state.tasks.len(),
            "store written"
        );
        Ok(result)
    }
}

/// Write JSON data atomically (write to temp, then rename)
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    lock::write_atomic(path, json.as_bytes())
}

/// Read JSON data from a file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    let data: T = serde_json::from_str(&content)?;
    Ok(data)
}
