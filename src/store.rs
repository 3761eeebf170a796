//! Task and project persistence contracts.
//!
//! The scheduler only talks to storage through `TaskStore` and
//! `ProjectStore`. Both are implemented for any `StateAccess` backend, which
//! exposes the whole store document for reading and for all-or-nothing
//! read-modify-write. `MemoryStore` keeps that document in memory;
//! `storage::FileStore` keeps it on disk.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::sort_by_order;
use crate::project::{Project, ProjectId};
use crate::task::{Task, TaskId};

/// Current version of the serialized store document.
pub const STORE_SCHEMA_VERSION: u32 = 1;

/// One atomic unit of change.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    /// New tasks; their `id` is ignored and assigned on commit.
    pub inserts: Vec<Task>,
    pub updates: Vec<Task>,
    pub deletes: Vec<TaskId>,
    /// Replacement project record, e.g. a bumped task sequence.
    pub project: Option<Project>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
            && self.updates.is_empty()
            && self.deletes.is_empty()
            && self.project.is_none()
    }
}

pub trait TaskStore {
    /// Tasks of one project in `(order_index, id)` order.
    fn list(&self, project_id: ProjectId) -> Result<Vec<Task>>;

    fn get(&self, task_id: TaskId) -> Result<Task>;

    /// Apply a batch atomically. Returns the inserted tasks with their ids.
    fn commit(&self, batch: Batch) -> Result<Vec<Task>>;

    fn insert(&self, task: Task) -> Result<Task> {
        let mut inserted = self.commit(Batch {
            inserts: vec![task],
            ..Batch::default()
        })?;
        inserted
            .pop()
            .ok_or_else(|| Error::OperationFailed("insert returned no task".to_string()))
    }

    fn update(&self, task: Task) -> Result<()> {
        self.batch_update(vec![task])
    }

    fn batch_update(&self, tasks: Vec<Task>) -> Result<()> {
        self.commit(Batch {
            updates: tasks,
            ..Batch::default()
        })?;
        Ok(())
    }

    fn delete(&self, task_id: TaskId) -> Result<()> {
        self.commit(Batch {
            deletes: vec![task_id],
            ..Batch::default()
        })?;
        Ok(())
    }
}

pub trait ProjectStore {
    fn list_projects(&self) -> Result<Vec<Project>>;

    fn get_project(&self, project_id: ProjectId) -> Result<Project>;

    fn find_project_by_code(&self, code: &str) -> Result<Option<Project>>;

    /// Store a new project; its `id` is assigned. Rejects duplicate codes.
    fn insert_project(&self, project: Project) -> Result<Project>;

    fn update_project(&self, project: Project) -> Result<()>;

    /// Delete a project and all of its tasks. Returns the number of tasks removed.
    fn delete_project(&self, project_id: ProjectId) -> Result<usize>;
}

/// Whole-store snapshot: every project and task plus id counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub schema_version: u32,
    #[serde(default = "first_id")]
    pub next_project_id: ProjectId,
    #[serde(default = "first_id")]
    pub next_task_id: TaskId,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

fn first_id() -> u64 {
    1
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            schema_version: STORE_SCHEMA_VERSION,
            next_project_id: first_id(),
            next_task_id: first_id(),
            projects: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

impl StoreState {
    pub fn project(&self, project_id: ProjectId) -> Result<&Project> {
        self.projects
            .iter()
            .find(|project| project.id == project_id)
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))
    }

    pub fn task(&self, task_id: TaskId) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|task| task.id == task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    pub fn project_tasks(&self, project_id: ProjectId) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|task| task.project_id == project_id)
            .cloned()
            .collect();
        sort_by_order(&mut tasks);
        tasks
    }

    /// Check every id a batch refers to, then apply it.
    pub fn apply(&mut self, batch: Batch) -> Result<Vec<Task>> {
        self.check(&batch)?;

        let deletes: HashSet<TaskId> = batch.deletes.iter().copied().collect();
        self.tasks.retain(|task| !deletes.contains(&task.id));

        for update in batch.updates {
            if let Some(slot) = self.tasks.iter_mut().find(|task| task.id == update.id) {
                *slot = update;
            }
        }

        if let Some(project) = batch.project {
            if let Some(slot) = self.projects.iter_mut().find(|p| p.id == project.id) {
                *slot = project;
            }
        }

        let mut inserted = Vec::with_capacity(batch.inserts.len());
        for mut task in batch.inserts {
            task.id = self.next_task_id;
            self.next_task_id += 1;
            self.tasks.push(task.clone());
            inserted.push(task);
        }
        Ok(inserted)
    }

    fn check(&self, batch: &Batch) -> Result<()> {
        if let Some(project) = &batch.project {
            self.project(project.id)?;
        }
        for task in &batch.inserts {
            self.project(task.project_id)?;
        }
        let mut deletes = HashSet::new();
        for &id in &batch.deletes {
            self.task(id)?;
            deletes.insert(id);
        }
        for task in &batch.updates {
            let stored = self.task(task.id)?;
            if stored.project_id != task.project_id {
                return Err(Error::OperationFailed(format!(
                    "task {} cannot move between projects",
                    task.id
                )));
            }
            if deletes.contains(&task.id) {
                return Err(Error::OperationFailed(format!(
                    "task {} is both updated and deleted",
                    task.id
                )));
            }
        }
        Ok(())
    }

    pub fn insert_project(&mut self, mut project: Project) -> Result<Project> {
        if self.projects.iter().any(|p| p.code == project.code) {
            return Err(Error::DuplicateProjectCode(project.code));
        }
        project.id = self.next_project_id;
        self.next_project_id += 1;
        self.projects.push(project.clone());
        Ok(project)
    }

    pub fn delete_project(&mut self, project_id: ProjectId) -> Result<usize> {
        self.project(project_id)?;
        self.projects.retain(|project| project.id != project_id);
        let before = self.tasks.len();
        self.tasks.retain(|task| task.project_id != project_id);
        Ok(before - self.tasks.len())
    }
}

/// Access to a store document.
///
/// `write` must be all-or-nothing: when `f` fails, the stored state stays as
/// it was before the call.
pub trait StateAccess {
    fn read<T>(&self, f: impl FnOnce(&StoreState) -> Result<T>) -> Result<T>;

    fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T>;
}

impl<S: StateAccess> TaskStore for S {
    fn list(&self, project_id: ProjectId) -> Result<Vec<Task>> {
        self.read(|state| Ok(state.project_tasks(project_id)))
    }

    fn get(&self, task_id: TaskId) -> Result<Task> {
        self.read(|state| state.task(task_id).cloned())
    }

    fn commit(&self, batch: Batch) -> Result<Vec<Task>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.write(|state| state.apply(batch))
    }
}

impl<S: StateAccess> ProjectStore for S {
    fn list_projects(&self) -> Result<Vec<Project>> {
        self.read(|state| {
            let mut projects = state.projects.clone();
            projects.sort_by_key(|project| project.id);
            Ok(projects)
        })
    }

    fn get_project(&self, project_id: ProjectId) -> Result<Project> {
        self.read(|state| state.project(project_id).cloned())
    }

    fn find_project_by_code(&self, code: &str) -> Result<Option<Project>> {
        let code = code.trim().to_ascii_uppercase();
        self.read(|state| {
            Ok(state
                .projects
                .iter()
                .find(|project| project.code == code)
                .cloned())
        })
    }

    fn insert_project(&self, project: Project) -> Result<Project> {
        self.write(|state| state.insert_project(project))
    }

    fn update_project(&self, project: Project) -> Result<()> {
        self.commit(Batch {
            project: Some(project),
            ..Batch::default()
        })?;
        Ok(())
    }

    fn delete_project(&self, project_id: ProjectId) -> Result<usize> {
        self.write(|state| state.delete_project(project_id))
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreState {
        self.guard().clone()
    }

    fn guard(&self) -> MutexGuard<'_, StoreState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl StateAccess for MemoryStore {
    fn read<T>(&self, f: impl FnOnce(&StoreState) -> Result<T>) -> Result<T> {
        f(&*self.guard())
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> Result<T>) -> Result<T> {
        let mut guard = self.guard();
        let mut next = guard.clone();
        let result = f(&mut next)?;
        *guard = next;
        Ok(result)
    }
}
