//! wbs project command implementations.

use std::path::PathBuf;

use crate::config::{Config, TasksConfig};
use crate::error::Result;
use crate::output::{OutputOptions, Report};
use crate::project::{Project, ProjectSummary};

use super::{open_scheduler, resolve_root};

pub struct NewOptions {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct TargetOptions {
    pub project: String,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct EditOptions {
    pub project: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ProjectListOutput {
    total: usize,
    projects: Vec<ProjectSummary>,
}

#[derive(serde::Serialize)]
struct ProjectRemoveOutput {
    id: u64,
    code: String,
    tasks_removed: usize,
}

#[derive(serde::Serialize)]
struct SettingsOutput<'a> {
    statuses: &'a [String],
    default_status: &'a str,
    task_types: &'a [String],
    default_task_type: &'a str,
    rules: RulesOutput<'a>,
    code_width: usize,
}

#[derive(serde::Serialize)]
struct RulesOutput<'a> {
    not_started: &'a str,
    in_progress: &'a str,
    complete: &'a str,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let scheduler = open_scheduler(options.root)?;
    let project = scheduler.create_project(&options.name, &options.code, options.description)?;

    let mut human = Report::new("Project created");
    push_project(&mut human, &project);
    human.suggest(format!(
        "wbs task add {} --description <TEXT> --start <DATE> --end <DATE>",
        project.code
    ));
    OutputOptions::new(options.json, options.quiet).emit("project new", &project, &human)
}

pub fn run_list(root: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let scheduler = open_scheduler(root)?;
    let projects = scheduler.list_projects()?;
    let output = ProjectListOutput {
        total: projects.len(),
        projects,
    };

    let mut human = Report::new("Projects");
    human.field("Total", output.total.to_string());
    for summary in &output.projects {
        human.row(format!(
            "{} {} {} ({} tasks, {}% complete)",
            summary.id, summary.code, summary.name, summary.task_count, summary.progress
        ));
    }
    OutputOptions::new(json, quiet).emit("project list", &output, &human)
}

pub fn run_show(options: TargetOptions) -> Result<()> {
    let scheduler = open_scheduler(options.root)?;
    let project = scheduler.resolve_project(&options.project)?;
    let summary = scheduler.project_summary(project.id)?;

    let mut human = Report::new(format!("Project {}", summary.code));
    push_project(&mut human, &project);
    human.field("Tasks", summary.task_count.to_string());
    human.field("Estimate", format!("{}", summary.total_estimate));
    human.field("Completed", format!("{}", summary.completed_estimate));
    human.field("Progress", format!("{}%", summary.progress));
    if let (Some(start), Some(end)) = (summary.start_date, summary.end_date) {
        human.field("Span", format!("{start} .. {end}"));
    }
    OutputOptions::new(options.json, options.quiet).emit("project show", &summary, &human)
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let scheduler = open_scheduler(options.root)?;
    let project = scheduler.resolve_project(&options.project)?;
    let updated = scheduler.update_project(project.id, options.name, options.description)?;

    let header = if updated == project {
        "No project changes"
    } else {
        "Project updated"
    };
    let mut human = Report::new(header);
    push_project(&mut human, &updated);
    OutputOptions::new(options.json, options.quiet).emit("project edit", &updated, &human)
}

pub fn run_rm(options: TargetOptions) -> Result<()> {
    let scheduler = open_scheduler(options.root)?;
    let project = scheduler.resolve_project(&options.project)?;
    let tasks_removed = scheduler.delete_project(project.id)?;
    let output = ProjectRemoveOutput {
        id: project.id,
        code: project.code.clone(),
        tasks_removed,
    };

    let mut human = Report::new("Project deleted");
    human.field("Code", project.code);
    human.field("Tasks removed", tasks_removed.to_string());
    OutputOptions::new(options.json, options.quiet).emit("project rm", &output, &human)
}

/// Print the task catalog; works without an initialized store.
pub fn run_settings(root: Option<PathBuf>, json: bool, quiet: bool) -> Result<()> {
    let root = resolve_root(root)?;
    let config = Config::load_from_root(&root);
    let tasks: &TasksConfig = &config.tasks;
    let output = SettingsOutput {
        statuses: &tasks.statuses,
        default_status: &tasks.default_status,
        task_types: &tasks.task_types,
        default_task_type: &tasks.default_task_type,
        rules: RulesOutput {
            not_started: &tasks.not_started_status,
            in_progress: &tasks.in_progress_status,
            complete: &tasks.complete_status,
        },
        code_width: tasks.code_width,
    };

    let mut human = Report::new("Task settings");
    human.field("Statuses", tasks.statuses.join(", "));
    human.field("Default status", tasks.default_status.clone());
    human.field("Task types", tasks.task_types.join(", "));
    human.field("Default type", tasks.default_task_type.clone());
    human.field(
        "Summary rules",
        format!(
            "{} / {} / {}",
            tasks.not_started_status, tasks.in_progress_status, tasks.complete_status
        ),
    );
    OutputOptions::new(json, quiet).emit("project settings", &output, &human)
}

fn push_project(human: &mut Report, project: &Project) {
    human.field("ID", project.id.to_string());
    human.field("Code", project.code.clone());
    human.field("Name", project.name.clone());
    if !project.description.is_empty() {
        human.field("Description", project.description.clone());
    }
}
