//! Recalculation pipeline.
//!
//! Stages always run in the fixed order WBS codes, rollup, order indices,
//! status, whatever order they were requested in. The pipeline works on an
//! in-memory task list; nothing is written until the caller commits the
//! returned change set.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::status::StatusRules;
use crate::task::{Task, TaskId};
use crate::{order, rollup, status, wbs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Wbs,
    Rollup,
    Order,
    Status,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Wbs => "wbs",
            Stage::Rollup => "rollup",
            Stage::Order => "order",
            Stage::Status => "status",
        };
        f.write_str(name)
    }
}

/// Stages run after indent, outdent and delete.
pub const STRUCTURAL: &[Stage] = &[Stage::Wbs, Stage::Rollup, Stage::Order];
/// Stages run after a caller-supplied reorder.
pub const REORDER: &[Stage] = &[Stage::Wbs, Stage::Rollup];
/// Every stage; used for full repair.
pub const FULL: &[Stage] = &[Stage::Wbs, Stage::Rollup, Stage::Order, Stage::Status];

#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
    rules: StatusRules,
}

impl Pipeline {
    pub fn new(stages: &[Stage], rules: StatusRules) -> Self {
        let mut stages = stages.to_vec();
        stages.sort();
        stages.dedup();
        Self { stages, rules }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over `tasks`, then sort them into project order.
    pub fn run(&self, tasks: &mut [Task]) -> Result<()> {
        for stage in &self.stages {
            match stage {
                Stage::Wbs => wbs::assign(tasks)?,
                Stage::Rollup => rollup::recalculate(tasks)?,
                Stage::Order => order::reindex(tasks)?,
                Stage::Status => status::propagate(tasks, &self.rules)?,
            }
            tracing::debug!(stage = %stage, tasks = tasks.len(), "pipeline stage complete");
        }
        sort_by_order(tasks);
        Ok(())
    }
}

/// Project order: `order_index`, ties broken by id.
pub fn sort_by_order(tasks: &mut [Task]) {
    tasks.sort_by_key(|task| (task.order_index, task.id));
}

/// Tasks in `after` that are new or differ from their `before` version.
pub fn changed(before: &[Task], after: &[Task]) -> Vec<Task> {
    let previous: HashMap<TaskId, &Task> = before.iter().map(|task| (task.id, task)).collect();
    after
        .iter()
        .filter(|task| previous.get(&task.id).map_or(true, |old| *old != *task))
        .cloned()
        .collect()
}
