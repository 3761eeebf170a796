//! wbs init command implementation
//!
//! Creates the default config and an empty store in the schedule root.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{OutputOptions, Report};
use crate::storage::{FileStore, STATE_DIR, STORE_FILE};

#[derive(serde::Serialize)]
struct InitReport {
    root: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    store: bool,
}

pub fn run(root: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let root = super::resolve_root(root)?;
    if !root.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "schedule root is not a directory: {}",
            root.display()
        )));
    }

    let created_config = ensure_config(&root)?;
    let config = Config::load_from_root(&root);
    let store = FileStore::new(&root, config.storage.lock_timeout_ms);
    let created_store = store.init()?;

    let report = InitReport {
        root: root.clone(),
        created: InitCreated {
            config: created_config,
            store: created_store,
        },
    };

    let mut created_items = Vec::new();
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    if created_store {
        created_items.push(format!("{STATE_DIR}/{STORE_FILE}"));
    }

    let header = if created_items.is_empty() {
        "wbs init: nothing to do".to_string()
    } else {
        "wbs init: initialized schedule".to_string()
    };

    let mut human = Report::new(header);
    human.field("root", root.display().to_string());
    human.field(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.suggest("wbs project new <NAME> --code <CODE>");

    OutputOptions::new(json, quiet).emit("init", &report, &human)
}

fn ensure_config(root: &Path) -> Result<bool> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "{CONFIG_FILE} exists but is not a file: {}",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    Config::default().save(&config_path)?;
    Ok(true)
}
