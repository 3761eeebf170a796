//! Schedule operations.
//!
//! Every mutating operation follows the same sequence under the project's
//! lock: load the project's tasks, validate, apply the edit in memory, run
//! the recalculation stages the edit calls for, then commit every changed
//! row in one batch. Any failure before the commit leaves the store as it
//! was.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use crate::config::{Config, TasksConfig};
use crate::error::{Error, Result};
use crate::hierarchy;
use crate::lock::ProjectLocks;
use crate::pipeline::{self, Pipeline, Stage};
use crate::project::{Project, ProjectId, ProjectSummary};
use crate::status::StatusRules;
use crate::storage::FileStore;
use crate::store::{Batch, ProjectStore, TaskStore};
use crate::task::{
    clamp_progress, format_task_code, validate_estimate, validate_span, NewTask, Task, TaskId,
    TaskUpdate,
};

/// Placeholder id of a task that has not been committed yet.
const UNSAVED: TaskId = 0;

/// What an operation hands back: the touched task alone, or the whole
/// recalculated project in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scope", content = "tasks", rename_all = "snake_case")]
pub enum Outcome {
    Single(Task),
    Project(Vec<Task>),
}

impl Outcome {
    pub fn tasks(&self) -> &[Task] {
        match self {
            Outcome::Single(task) => std::slice::from_ref(task),
            Outcome::Project(tasks) => tasks,
        }
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks().iter().find(|task| task.id == task_id)
    }

    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            Outcome::Single(task) => vec![task],
            Outcome::Project(tasks) => tasks,
        }
    }
}

pub struct Scheduler<S> {
    store: S,
    tasks_config: TasksConfig,
    rules: StatusRules,
    locks: ProjectLocks,
}

impl Scheduler<FileStore> {
    /// Open the schedule rooted at `root` with its `.wbs.toml` settings.
    ///
    /// Project locks are mirrored as files so separate processes serialize
    /// their edits as well.
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load_from_root(root);
        let timeout = config.storage.lock_timeout_ms;
        let store = FileStore::open(root, timeout)?;
        let locks = ProjectLocks::new(timeout).with_lock_dir(store.locks_dir());
        Ok(Self::new(store, &config).with_locks(locks))
    }
}

impl<S: TaskStore + ProjectStore> Scheduler<S> {
    pub fn new(store: S, config: &Config) -> Self {
        Self {
            store,
            tasks_config: config.tasks.clone(),
            rules: StatusRules::from(&config.tasks),
            locks: ProjectLocks::new(config.storage.lock_timeout_ms),
        }
    }

    pub fn with_locks(mut self, locks: ProjectLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub fn create_project(
        &self,
        name: &str,
        code: &str,
        description: Option<String>,
    ) -> Result<Project> {
        let project = self
            .store
            .insert_project(Project::new(name, code, description)?)?;
        tracing::info!(project_id = project.id, code = %project.code, "created project");
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        self.store
            .list_projects()?
            .iter()
            .map(|project| {
                let tasks = self.store.list(project.id)?;
                Ok(ProjectSummary::from_tasks(project, &tasks))
            })
            .collect()
    }

    pub fn get_project(&self, project_id: ProjectId) -> Result<Project> {
        self.store.get_project(project_id)
    }

    pub fn project_summary(&self, project_id: ProjectId) -> Result<ProjectSummary> {
        let project = self.store.get_project(project_id)?;
        let tasks = self.store.list(project_id)?;
        Ok(ProjectSummary::from_tasks(&project, &tasks))
    }

    pub fn update_project(
        &self,
        project_id: ProjectId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Project> {
        let _guard = self.locks.acquire(project_id)?;
        let mut project = self.store.get_project(project_id)?;
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidArgument(
                    "project name cannot be empty".to_string(),
                ));
            }
            project.name = name.to_string();
        }
        if let Some(description) = description {
            project.description = description;
        }
        self.store.update_project(project.clone())?;
        tracing::info!(project_id, "updated project");
        Ok(project)
    }

    /// Delete a project and its tasks. Returns how many tasks were removed.
    pub fn delete_project(&self, project_id: ProjectId) -> Result<usize> {
        let guard = self.locks.acquire(project_id)?;
        let removed = self.store.delete_project(project_id)?;
        guard.discard();
        tracing::info!(project_id, removed, "deleted project");
        Ok(removed)
    }

    /// Resolve a project from a numeric id or a project code.
    pub fn resolve_project(&self, selector: &str) -> Result<Project> {
        let selector = selector.trim();
        if let Ok(id) = selector.parse::<ProjectId>() {
            return self.store.get_project(id);
        }
        self.store
            .find_project_by_code(selector)?
            .ok_or_else(|| Error::ProjectNotFound(selector.to_string()))
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn list_tasks(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        self.store.get_project(project_id)?;
        self.store.list(project_id)
    }

    pub fn get_task(&self, task_id: TaskId) -> Result<Task> {
        self.store.get(task_id)
    }

    /// Resolve a task from a numeric id or a task code such as `MIG-003`.
    pub fn resolve_task(&self, selector: &str) -> Result<Task> {
        let selector = selector.trim();
        if let Ok(id) = selector.parse::<TaskId>() {
            return self.store.get(id);
        }
        let not_found = || Error::TaskNotFound(selector.to_string());
        let (project_code, _) = selector.rsplit_once('-').ok_or_else(not_found)?;
        let project = self
            .store
            .find_project_by_code(project_code)?
            .ok_or_else(not_found)?;
        self.store
            .list(project.id)?
            .into_iter()
            .find(|task| task.code.eq_ignore_ascii_case(selector))
            .ok_or_else(not_found)
    }

    /// Append a new top-level task to the end of a project.
    pub fn create_task(&self, project_id: ProjectId, new: NewTask) -> Result<Task> {
        let _guard = self.locks.acquire(project_id)?;
        let mut project = self.store.get_project(project_id)?;
        let before = self.store.list(project_id)?;
        let draft = self.draft_task(&mut project, new, &before)?;

        let mut after = before.clone();
        after.push(draft);
        self.pipeline(&[Stage::Wbs]).run(&mut after)?;

        let (created, others): (Vec<Task>, Vec<Task>) =
            after.into_iter().partition(|task| task.id == UNSAVED);
        let updates = pipeline::changed(&before, &others);
        let mut inserted = self.store.commit(Batch {
            inserts: created,
            updates,
            project: Some(project),
            ..Batch::default()
        })?;
        let task = inserted
            .pop()
            .ok_or_else(|| Error::OperationFailed("new task was not stored".to_string()))?;

        tracing::info!(project_id, task_id = task.id, code = %task.code, "created task");
        Ok(task)
    }

    /// Edit a task's own fields. Summary tasks refuse edits of fields that
    /// are derived from their children.
    pub fn update_task(&self, task_id: TaskId, update: TaskUpdate) -> Result<Outcome> {
        let project_id = self.store.get(task_id)?.project_id;
        let _guard = self.locks.acquire(project_id)?;

        let before = self.store.list(project_id)?;
        let current = before
            .iter()
            .find(|task| task.id == task_id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let has_children = before.iter().any(|task| task.parent_id == Some(task_id));
        if has_children {
            reject_derived_edits(&current, &update)?;
        }

        let edited = self.apply_update(current.clone(), update)?;

        let mut stages = Vec::new();
        if edited.start_date != current.start_date
            || edited.end_date != current.end_date
            || edited.estimate != current.estimate
        {
            stages.push(Stage::Rollup);
        }
        if edited.status != current.status {
            stages.push(Stage::Status);
        }

        if stages.is_empty() {
            if edited != current {
                self.store.update(edited.clone())?;
            }
            tracing::info!(project_id, task_id, "updated task");
            return Ok(Outcome::Single(edited));
        }

        let mut after = before.clone();
        if let Some(slot) = after.iter_mut().find(|task| task.id == task_id) {
            *slot = edited;
        }
        self.pipeline(&stages).run(&mut after)?;
        let updates = pipeline::changed(&before, &after);
        let changed = updates.len();
        self.store.batch_update(updates)?;

        tracing::info!(project_id, task_id, changed, "updated task");
        Ok(Outcome::Project(after))
    }

    /// Delete a task; its children move up to take its place.
    pub fn delete_task(&self, task_id: TaskId) -> Result<Outcome> {
        self.restructure(task_id, pipeline::STRUCTURAL, "deleted task", |tasks| {
            hierarchy::remove(tasks, task_id).map(|removed| vec![removed.id])
        })
    }

    pub fn indent_task(&self, task_id: TaskId) -> Result<Outcome> {
        self.restructure(task_id, pipeline::STRUCTURAL, "indented task", |tasks| {
            hierarchy::indent(tasks, task_id).map(|()| Vec::new())
        })
    }

    pub fn outdent_task(&self, task_id: TaskId) -> Result<Outcome> {
        self.restructure(task_id, pipeline::STRUCTURAL, "outdented task", |tasks| {
            hierarchy::outdent(tasks, task_id).map(|()| Vec::new())
        })
    }

    /// Flip the expanded flag of a task that has children.
    pub fn toggle_expand(&self, task_id: TaskId) -> Result<Outcome> {
        let project_id = self.store.get(task_id)?.project_id;
        let _guard = self.locks.acquire(project_id)?;

        let tasks = self.store.list(project_id)?;
        let mut task = tasks
            .iter()
            .find(|task| task.id == task_id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        if !tasks.iter().any(|other| other.parent_id == Some(task_id)) {
            return Err(Error::InvalidArgument(format!(
                "task {} has no subtasks to expand or collapse",
                task.code
            )));
        }
        task.expanded = !task.expanded;
        self.store.update(task.clone())?;

        tracing::info!(project_id, task_id, expanded = task.expanded, "toggled task");
        Ok(Outcome::Single(task))
    }

    /// Apply caller-chosen order indices. Ids that do not belong to the
    /// project are skipped with a warning.
    pub fn reorder_tasks(
        &self,
        project_id: ProjectId,
        orders: &[(TaskId, i64)],
    ) -> Result<Outcome> {
        let _guard = self.locks.acquire(project_id)?;
        self.store.get_project(project_id)?;

        let before = self.store.list(project_id)?;
        let mut after = before.clone();
        for skipped in hierarchy::apply_order(&mut after, orders) {
            tracing::warn!(project_id, task_id = skipped, "reorder skipped task outside project");
        }
        self.pipeline(pipeline::REORDER).run(&mut after)?;
        let updates = pipeline::changed(&before, &after);
        let changed = updates.len();
        self.store.batch_update(updates)?;

        tracing::info!(project_id, changed, "reordered tasks");
        Ok(Outcome::Project(after))
    }

    /// Re-derive every computed field of a project.
    pub fn recalculate(&self, project_id: ProjectId) -> Result<Outcome> {
        let _guard = self.locks.acquire(project_id)?;
        self.store.get_project(project_id)?;

        let before = self.store.list(project_id)?;
        let mut after = before.clone();
        crate::tree::well_formed(&after)?;
        self.pipeline(pipeline::FULL).run(&mut after)?;
        let updates = pipeline::changed(&before, &after);
        let changed = updates.len();
        self.store.batch_update(updates)?;

        tracing::info!(project_id, changed, "recalculated project");
        Ok(Outcome::Project(after))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn pipeline(&self, stages: &[Stage]) -> Pipeline {
        Pipeline::new(stages, self.rules.clone())
    }

    /// Run a structural edit on a task's project, recalculate, and commit.
    /// `edit` returns the ids of tasks it removed.
    fn restructure<F>(
        &self,
        task_id: TaskId,
        stages: &[Stage],
        action: &'static str,
        edit: F,
    ) -> Result<Outcome>
    where
        F: FnOnce(&mut Vec<Task>) -> Result<Vec<TaskId>>,
    {
        let project_id = self.store.get(task_id)?.project_id;
        let _guard = self.locks.acquire(project_id)?;

        let before = self.store.list(project_id)?;
        let mut after = before.clone();
        let deletes = edit(&mut after)?;
        self.pipeline(stages).run(&mut after)?;

        let updates = pipeline::changed(&before, &after);
        let changed = updates.len();
        self.store.commit(Batch {
            updates,
            deletes,
            ..Batch::default()
        })?;

        tracing::info!(project_id, task_id, changed, "{action}");
        Ok(Outcome::Project(after))
    }

    fn draft_task(&self, project: &mut Project, new: NewTask, existing: &[Task]) -> Result<Task> {
        let description = required_description(&new.description)?;
        let start_date = new
            .start_date
            .ok_or_else(|| Error::InvalidArgument("start date is required".to_string()))?;
        let end_date = new
            .end_date
            .ok_or_else(|| Error::InvalidArgument("end date is required".to_string()))?;
        validate_span(start_date, end_date)?;
        let estimate = new.estimate.unwrap_or(0.0);
        validate_estimate(estimate)?;

        let status = new
            .status
            .unwrap_or_else(|| self.tasks_config.default_status.clone());
        self.tasks_config.validate_status(&status)?;
        let task_type = new
            .task_type
            .unwrap_or_else(|| self.tasks_config.default_task_type.clone());
        self.tasks_config.validate_task_type(&task_type)?;

        project.task_seq += 1;
        let code = format_task_code(&project.code, project.task_seq, self.tasks_config.code_width);
        Ok(Task {
            id: UNSAVED,
            project_id: project.id,
            code,
            description,
            start_date,
            end_date,
            estimate,
            resource: non_blank(new.resource),
            status,
            task_type,
            predecessors: non_blank(new.predecessors),
            progress: clamp_progress(new.progress.unwrap_or(0)),
            created_at: Utc::now(),
            order_index: hierarchy::append_position(existing),
            parent_id: None,
            level: 0,
            wbs_code: String::new(),
            is_summary: false,
            expanded: true,
        })
    }

    fn apply_update(&self, mut task: Task, update: TaskUpdate) -> Result<Task> {
        if let Some(description) = update.description {
            task.description = required_description(&description)?;
        }
        if let Some(start_date) = update.start_date {
            task.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            task.end_date = end_date;
        }
        validate_span(task.start_date, task.end_date)?;
        if let Some(estimate) = update.estimate {
            validate_estimate(estimate)?;
            task.estimate = estimate;
        }
        if let Some(resource) = update.resource {
            task.resource = non_blank(resource);
        }
        if let Some(status) = update.status {
            self.tasks_config.validate_status(&status)?;
            task.status = status;
        }
        if let Some(task_type) = update.task_type {
            self.tasks_config.validate_task_type(&task_type)?;
            task.task_type = task_type;
        }
        if let Some(predecessors) = update.predecessors {
            task.predecessors = non_blank(predecessors);
        }
        if let Some(progress) = update.progress {
            task.progress = clamp_progress(progress);
        }
        if let Some(expanded) = update.expanded {
            task.expanded = expanded;
        }
        Ok(task)
    }
}

fn reject_derived_edits(task: &Task, update: &TaskUpdate) -> Result<()> {
    let field = if update.start_date.is_some() {
        "start_date"
    } else if update.end_date.is_some() {
        "end_date"
    } else if update.estimate.is_some() {
        "estimate"
    } else if update.status.is_some() {
        "status"
    } else {
        return Ok(());
    };
    Err(Error::SummaryTaskReadOnly {
        task: task.code.clone(),
        field,
    })
}

fn required_description(value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidArgument(
            "task description cannot be empty".to_string(),
        ));
    }
    Ok(value.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
