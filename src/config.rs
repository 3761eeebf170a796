//! Configuration loading and management
//!
//! Handles parsing of `.wbs.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Name of the configuration file in the schedule root
pub const CONFIG_FILE: &str = ".wbs.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Task catalog and status rules
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Tasks configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Allowed task statuses
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,

    /// Default status for new tasks
    #[serde(default = "default_not_started")]
    pub default_status: String,

    /// Summary status when no child has started
    #[serde(default = "default_not_started")]
    pub not_started_status: String,

    /// Summary status while work is under way
    #[serde(default = "default_in_progress")]
    pub in_progress_status: String,

    /// Summary status once every child is done
    #[serde(default = "default_complete")]
    pub complete_status: String,

    /// Allowed task types
    #[serde(default = "default_task_types")]
    pub task_types: Vec<String>,

    /// Default type for new tasks
    #[serde(default = "default_task_type")]
    pub default_task_type: String,

    /// Zero padding of the sequence part of task codes
    #[serde(default = "default_code_width")]
    pub code_width: usize,
}

fn default_statuses() -> Vec<String> {
    ["Not Started", "In Progress", "On Hold", "Complete", "Cancelled"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_not_started() -> String {
    "Not Started".to_string()
}

fn default_in_progress() -> String {
    "In Progress".to_string()
}

fn default_complete() -> String {
    "Complete".to_string()
}

fn default_task_types() -> Vec<String> {
    vec!["Task".to_string(), "Milestone".to_string()]
}

fn default_task_type() -> String {
    "Task".to_string()
}

fn default_code_width() -> usize {
    3
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            statuses: default_statuses(),
            default_status: default_not_started(),
            not_started_status: default_not_started(),
            in_progress_status: default_in_progress(),
            complete_status: default_complete(),
            task_types: default_task_types(),
            default_task_type: default_task_type(),
            code_width: default_code_width(),
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// How long to wait for a project or store lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a `.wbs.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the schedule root, or return defaults
    pub fn load_from_root(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.tasks.validate()?;
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl TasksConfig {
    fn validate(&self) -> Result<()> {
        let statuses = unique_entries(&self.statuses, "tasks.statuses")?;
        for (field, value) in [
            ("tasks.default_status", &self.default_status),
            ("tasks.not_started_status", &self.not_started_status),
            ("tasks.in_progress_status", &self.in_progress_status),
            ("tasks.complete_status", &self.complete_status),
        ] {
            if !statuses.contains(value.trim()) {
                return Err(Error::InvalidConfig(format!(
                    "{field} '{value}' not in tasks.statuses"
                )));
            }
        }

        let types = unique_entries(&self.task_types, "tasks.task_types")?;
        if !types.contains(self.default_task_type.trim()) {
            return Err(Error::InvalidConfig(format!(
                "tasks.default_task_type '{}' not in tasks.task_types",
                self.default_task_type
            )));
        }

        if !(1..=9).contains(&self.code_width) {
            return Err(Error::InvalidConfig(
                "tasks.code_width must be between 1 and 9".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_status(&self, status: &str) -> Result<()> {
        if self.statuses.iter().any(|entry| entry == status) {
            return Ok(());
        }
        Err(Error::InvalidArgument(format!(
            "unknown status '{status}' (expected one of: {})",
            self.statuses.join(", ")
        )))
    }

    pub fn validate_task_type(&self, task_type: &str) -> Result<()> {
        if self.task_types.iter().any(|entry| entry == task_type) {
            return Ok(());
        }
        Err(Error::InvalidArgument(format!(
            "unknown task type '{task_type}' (expected one of: {})",
            self.task_types.join(", ")
        )))
    }
}

fn unique_entries<'a>(entries: &'a [String], field: &str) -> Result<HashSet<&'a str>> {
    if entries.is_empty() {
        return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
    }
    let mut seen = HashSet::new();
    for entry in entries {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{field} cannot include empty entries"
            )));
        }
        if !seen.insert(trimmed) {
            return Err(Error::InvalidConfig(format!(
                "{field} has duplicate entry '{trimmed}'"
            )));
        }
    }
    Ok(seen)
}
