//! Project records for wbs.
//!
//! A project owns a flat list of tasks and hands out the sequence numbers
//! used in task codes. Deleting a project deletes its tasks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::Task;

pub type ProjectId = u64;

const PROJECT_CODE_MAX_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Unique upper-case short code, prefix of every task code.
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Last sequence number used for a task code.
    #[serde(default)]
    pub task_seq: u64,
}

impl Project {
    pub fn new(name: &str, code: &str, description: Option<String>) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "project name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id: 0,
            name: name.to_string(),
            code: normalize_code(code)?,
            description: description.unwrap_or_default(),
            created_at: Utc::now(),
            task_seq: 0,
        })
    }
}

/// Upper-case and validate a project code.
pub fn normalize_code(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.is_empty() {
        return Err(Error::InvalidArgument(
            "project code cannot be empty".to_string(),
        ));
    }
    if code.len() > PROJECT_CODE_MAX_LEN {
        return Err(Error::InvalidArgument(format!(
            "project code must be at most {PROJECT_CODE_MAX_LEN} characters"
        )));
    }
    if !code.chars().all(|ch| ch.is_ascii_alphanumeric()) {
        return Err(Error::InvalidArgument(
            "project code must be alphanumeric".to_string(),
        ));
    }
    Ok(code)
}

/// Aggregate figures shown alongside a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub code: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub task_count: usize,
    pub total_estimate: f64,
    pub completed_estimate: f64,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl ProjectSummary {
    /// Only leaf tasks contribute effort, so summary rows are not counted twice.
    pub fn from_tasks(project: &Project, tasks: &[Task]) -> Self {
        let leaves = tasks.iter().filter(|task| !task.is_summary);
        let (total, completed) = leaves.fold((0.0_f64, 0.0_f64), |(total, done), task| {
            (
                total + task.estimate,
                done + task.estimate * f64::from(task.progress) / 100.0,
            )
        });
        let progress = if total > 0.0 {
            (completed / total * 100.0).round().clamp(0.0, 100.0) as u8
        } else {
            0
        };

        Self {
            id: project.id,
            name: project.name.clone(),
            code: project.code.clone(),
            description: project.description.clone(),
            created_at: project.created_at,
            task_count: tasks.len(),
            total_estimate: round_tenth(total),
            completed_estimate: round_tenth(completed),
            progress,
            start_date: tasks.iter().map(|task| task.start_date).min(),
            end_date: tasks.iter().map(|task| task.end_date).max(),
        }
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
