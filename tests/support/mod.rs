#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway schedule root with `wbs init` already run.
pub struct Schedule {
    dir: TempDir,
}

impl Schedule {
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        wbs_cmd(dir.path()).arg("init").assert().success();
        Ok(Self { dir })
    }

    /// A root without a store, for commands that must fail before `init`.
    pub fn bare() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cmd(&self) -> Command {
        wbs_cmd(self.path())
    }

    /// Run a command with `--json` and return the envelope's `data`.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(value["status"], "success");
        value["data"].clone()
    }

    pub fn project(&self, name: &str, code: &str) -> u64 {
        let data = self.json(&["project", "new", name, "--code", code]);
        data["id"].as_u64().expect("project id")
    }

    /// Append a task spanning `start..end` (days of January 2024).
    pub fn task(&self, project: &str, description: &str, start: u32, end: u32, estimate: f64) -> u64 {
        let start = format!("2024-01-{start:02}");
        let end = format!("2024-01-{end:02}");
        let estimate = estimate.to_string();
        let data = self.json(&[
            "task",
            "add",
            project,
            "--description",
            description,
            "--start",
            &start,
            "--end",
            &end,
            "--estimate",
            &estimate,
        ]);
        data["id"].as_u64().expect("task id")
    }

    pub fn tasks(&self, project: &str) -> Vec<Value> {
        let data = self.json(&["task", "list", project]);
        data["tasks"].as_array().cloned().unwrap_or_default()
    }
}

pub fn wbs_cmd(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wbs").expect("wbs binary");
    cmd.arg("--root").arg(root);
    cmd.env_remove("WBS_ROOT");
    cmd.env_remove("RUST_LOG");
    cmd
}

pub fn find<'a>(tasks: &'a [Value], id: u64) -> &'a Value {
    tasks
        .iter()
        .find(|task| task["id"].as_u64() == Some(id))
        .expect("task present")
}
