//! wbs task command implementations.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::output::{OutputOptions, Report};
use crate::scheduler::{Outcome, Scheduler};
use crate::storage::FileStore;
use crate::task::{parse_date, NewTask, Task, TaskId, TaskUpdate};

use super::{open_scheduler, TaskCommands};

#[derive(serde::Serialize)]
struct TaskListOutput<'a> {
    project: &'a str,
    total: usize,
    tasks: &'a [Task],
}

#[derive(serde::Serialize)]
struct TaskChangeOutput<'a> {
    task: &'a Task,
    /// `single` when only the task changed, `project` when the whole
    /// project was recalculated.
    scope: &'static str,
    tasks: &'a [Task],
}

#[derive(serde::Serialize)]
struct TaskRemoveOutput<'a> {
    removed: &'a Task,
    tasks: &'a [Task],
}

struct TaskContext {
    scheduler: Scheduler<FileStore>,
    output: OutputOptions,
}

pub fn run(command: TaskCommands, root: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let ctx = TaskContext {
        scheduler: open_scheduler(root)?,
        output: OutputOptions::new(json, quiet),
    };

    match command {
        TaskCommands::Add {
            project,
            description,
            start,
            end,
            estimate,
            resource,
            status,
            task_type,
            predecessors,
            progress,
        } => {
            let new = NewTask {
                description,
                start_date: Some(parse_date("--start", &start)?),
                end_date: Some(parse_date("--end", &end)?),
                estimate,
                resource,
                status,
                task_type,
                predecessors,
                progress,
            };
            run_add(&ctx, &project, new)
        }
        TaskCommands::List { project } => run_list(&ctx, &project),
        TaskCommands::Show { task } => run_show(&ctx, &task),
        TaskCommands::Edit {
            task,
            description,
            start,
            end,
            estimate,
            resource,
            clear_resource,
            status,
            task_type,
            predecessors,
            clear_predecessors,
            progress,
            expanded,
        } => {
            let update = TaskUpdate {
                description,
                start_date: start.map(|v| parse_date("--start", &v)).transpose()?,
                end_date: end.map(|v| parse_date("--end", &v)).transpose()?,
                estimate,
                resource: nullable(resource, clear_resource),
                status,
                task_type,
                predecessors: nullable(predecessors, clear_predecessors),
                progress,
                expanded,
            };
            run_edit(&ctx, &task, update)
        }
        TaskCommands::Rm { task } => run_rm(&ctx, &task),
        TaskCommands::Indent { task } => {
            let target = ctx.scheduler.resolve_task(&task)?;
            let outcome = ctx.scheduler.indent_task(target.id)?;
            emit_change(&ctx, "task indent", target.id, &outcome)
        }
        TaskCommands::Outdent { task } => {
            let target = ctx.scheduler.resolve_task(&task)?;
            let outcome = ctx.scheduler.outdent_task(target.id)?;
            emit_change(&ctx, "task outdent", target.id, &outcome)
        }
        TaskCommands::Toggle { task } => {
            let target = ctx.scheduler.resolve_task(&task)?;
            let outcome = ctx.scheduler.toggle_expand(target.id)?;
            emit_change(&ctx, "task toggle", target.id, &outcome)
        }
        TaskCommands::Reorder { project, entries } => run_reorder(&ctx, &project, &entries),
        TaskCommands::Recalc { project } => {
            let project = ctx.scheduler.resolve_project(&project)?;
            let outcome = ctx.scheduler.recalculate(project.id)?;
            let mut human = Report::new(format!("Recalculated {}", project.code));
            human.field("Tasks", outcome.tasks().len().to_string());
            push_rows(&mut human, outcome.tasks());
            ctx.output.emit("task recalc", &outcome, &human)
        }
    }
}

fn run_add(ctx: &TaskContext, project: &str, new: NewTask) -> Result<()> {
    let project = ctx.scheduler.resolve_project(project)?;
    let task = ctx.scheduler.create_task(project.id, new)?;

    let mut human = Report::new(format!("Task {} created", task.code));
    push_task(&mut human, &task);
    human.suggest(format!("wbs task indent {}", task.code));
    ctx.output.emit("task add", &task, &human)
}

fn run_list(ctx: &TaskContext, project: &str) -> Result<()> {
    let project = ctx.scheduler.resolve_project(project)?;
    let tasks = ctx.scheduler.list_tasks(project.id)?;
    let output = TaskListOutput {
        project: &project.code,
        total: tasks.len(),
        tasks: &tasks,
    };

    let mut human = Report::new(format!("Tasks in {}", project.code));
    human.field("Total", tasks.len().to_string());
    push_rows(&mut human, &tasks);
    ctx.output.emit("task list", &output, &human)
}

fn run_show(ctx: &TaskContext, selector: &str) -> Result<()> {
    let task = ctx.scheduler.resolve_task(selector)?;
    let mut human = Report::new(format!("Task {}", task.code));
    push_task(&mut human, &task);
    ctx.output.emit("task show", &task, &human)
}

fn run_edit(ctx: &TaskContext, selector: &str, update: TaskUpdate) -> Result<()> {
    let target = ctx.scheduler.resolve_task(selector)?;
    let outcome = ctx.scheduler.update_task(target.id, update)?;
    emit_change(ctx, "task edit", target.id, &outcome)
}

fn run_rm(ctx: &TaskContext, selector: &str) -> Result<()> {
    let removed = ctx.scheduler.resolve_task(selector)?;
    let outcome = ctx.scheduler.delete_task(removed.id)?;
    let output = TaskRemoveOutput {
        removed: &removed,
        tasks: outcome.tasks(),
    };

    let mut human = Report::new(format!("Task {} deleted", removed.code));
    push_rows(&mut human, outcome.tasks());
    ctx.output.emit("task rm", &output, &human)
}

fn run_reorder(ctx: &TaskContext, project: &str, entries: &[String]) -> Result<()> {
    let project = ctx.scheduler.resolve_project(project)?;
    let mut orders = Vec::with_capacity(entries.len());
    for entry in entries {
        orders.push(parse_order_entry(&ctx.scheduler, entry)?);
    }

    let known: HashSet<TaskId> = ctx
        .scheduler
        .list_tasks(project.id)?
        .iter()
        .map(|task| task.id)
        .collect();
    let outcome = ctx.scheduler.reorder_tasks(project.id, &orders)?;

    let mut human = Report::new(format!("Reordered {}", project.code));
    for (id, _) in orders.iter().filter(|(id, _)| !known.contains(id)) {
        human.warn(format!("task {id} is not in {}; skipped", project.code));
    }
    push_rows(&mut human, outcome.tasks());
    ctx.output.emit("task reorder", &outcome, &human)
}

/// `TASK=INDEX`, where TASK is an id or a task code.
fn parse_order_entry(scheduler: &Scheduler<FileStore>, entry: &str) -> Result<(TaskId, i64)> {
    let (task, index) = entry.split_once('=').ok_or_else(|| {
        Error::InvalidArgument(format!("reorder entry '{entry}' must look like TASK=INDEX"))
    })?;
    let index: i64 = index.trim().parse().map_err(|_| {
        Error::InvalidArgument(format!("reorder entry '{entry}' has a non-integer index"))
    })?;
    let task = task.trim();
    let id = match task.parse::<TaskId>() {
        Ok(id) => id,
        Err(_) => scheduler.resolve_task(task)?.id,
    };
    Ok((id, index))
}

fn emit_change(ctx: &TaskContext, command: &str, task_id: TaskId, outcome: &Outcome) -> Result<()> {
    let task = outcome
        .task(task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
    let scope = match outcome {
        Outcome::Single(_) => "single",
        Outcome::Project(_) => "project",
    };
    let output = TaskChangeOutput {
        task,
        scope,
        tasks: outcome.tasks(),
    };

    let mut human = Report::new(format!("wbs {command}: {}", task.code));
    push_task(&mut human, task);
    if let Outcome::Project(tasks) = outcome {
        push_rows(&mut human, tasks);
    }
    ctx.output.emit(command, &output, &human)
}

fn nullable(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn push_task(human: &mut Report, task: &Task) {
    human.field("ID", task.id.to_string());
    human.field("WBS", task.wbs_code.clone());
    human.field("Description", task.description.clone());
    human.field("Dates", format!("{} .. {}", task.start_date, task.end_date));
    human.field("Estimate", task.estimate.to_string());
    human.field("Status", task.status.clone());
    human.field("Type", task.task_type.clone());
    human.field("Progress", format!("{}%", task.progress));
    if let Some(resource) = &task.resource {
        human.field("Resource", resource.clone());
    }
    if let Some(predecessors) = &task.predecessors {
        human.field("Predecessors", predecessors.clone());
    }
    if task.is_summary {
        human.field(
            "Summary",
            if task.expanded { "expanded" } else { "collapsed" },
        );
    }
}

/// One outline row per visible task; rows under a collapsed summary are hidden.
fn push_rows(human: &mut Report, tasks: &[Task]) {
    for task in visible_rows(tasks) {
        let marker = match (task.is_summary, task.expanded) {
            (false, _) => " ",
            (true, true) => "-",
            (true, false) => "+",
        };
        human.row(format!(
            "{marker} {:<10} {:<10} {}{} [{} .. {}] est {} {}",
            task.wbs_code,
            task.code,
            "  ".repeat(task.level as usize),
            task.description,
            task.start_date,
            task.end_date,
            task.estimate,
            task.status,
        ));
    }
}

fn visible_rows(tasks: &[Task]) -> Vec<&Task> {
    let mut rows = Vec::with_capacity(tasks.len());
    let mut collapsed_at: Option<u32> = None;
    for task in tasks {
        if let Some(level) = collapsed_at {
            if task.level > level {
                continue;
            }
            collapsed_at = None;
        }
        if task.is_summary && !task.expanded {
            collapsed_at = Some(task.level);
        }
        rows.push(task);
    }
    rows
}
