//! Task records for wbs.
//!
//! A task is one row of a project schedule. Its hierarchy is carried by
//! `parent_id`/`level`; `wbs_code`, `is_summary`, `order_index` and the
//! dates/estimate/status of summary rows are derived by the recalculation
//! pipeline and overwritten on every run.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::project::ProjectId;

pub type TaskId = u64;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn default_expanded() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    /// Human-readable code assigned at creation, e.g. `MIG-003`.
    pub code: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub estimate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub status: String,
    pub task_type: String,
    /// Free-text predecessor list. Not validated and unrelated to `parent_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predecessors: Option<String>,
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub order_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub wbs_code: String,
    #[serde(default)]
    pub is_summary: bool,
    #[serde(default = "default_expanded")]
    pub expanded: bool,
}

impl Task {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub estimate: Option<f64>,
    pub resource: Option<String>,
    pub status: Option<String>,
    pub task_type: Option<String>,
    pub predecessors: Option<String>,
    pub progress: Option<i64>,
}

/// Partial edit of a task. `None` leaves the field untouched; for the
/// nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub estimate: Option<f64>,
    pub resource: Option<Option<String>>,
    pub status: Option<String>,
    pub task_type: Option<String>,
    pub predecessors: Option<Option<String>>,
    pub progress: Option<i64>,
    pub expanded: Option<bool>,
}

/// Format a task code as `<project code>-<sequence>` with zero padding.
pub fn format_task_code(project_code: &str, sequence: u64, width: usize) -> String {
    format!("{project_code}-{sequence:0width$}")
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(label: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|err| {
        Error::InvalidArgument(format!("{label}: expected YYYY-MM-DD, got '{value}' ({err})"))
    })
}

/// Progress is clamped rather than rejected.
pub fn clamp_progress(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

pub(crate) fn validate_span(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(Error::InvalidArgument(format!(
            "end date {end} is before start date {start}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_estimate(estimate: f64) -> Result<()> {
    if !estimate.is_finite() || estimate < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "estimate must be a non-negative number, got {estimate}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_code_is_zero_padded() {
        assert_eq!(format_task_code("MIG", 3, 3), "MIG-003");
        assert_eq!(format_task_code("MIG", 1234, 3), "MIG-1234");
        assert_eq!(format_task_code("X", 7, 5), "X-00007");
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(clamp_progress(-5), 0);
        assert_eq!(clamp_progress(42), 42);
        assert_eq!(clamp_progress(250), 100);
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(
            parse_date("start", "2024-01-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        let err = parse_date("start", "05/01/2024").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn span_and_estimate_validation() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(validate_span(a, a).is_ok());
        assert!(validate_span(a, b).is_ok());
        assert!(validate_span(b, a).is_err());
        assert!(validate_estimate(0.0).is_ok());
        assert!(validate_estimate(-1.0).is_err());
        assert!(validate_estimate(f64::NAN).is_err());
    }

    #[test]
    fn expanded_defaults_to_true_when_missing() {
        let raw = r#"{
            "id": 1, "project_id": 1, "code": "P-001", "description": "d",
            "start_date": "2024-01-01", "end_date": "2024-01-02",
            "status": "Not Started", "task_type": "Task",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert!(task.expanded);
        assert!(task.is_root());
        assert_eq!(task.level, 0);
        assert_eq!(task.wbs_code, "");
    }
}
