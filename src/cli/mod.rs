//! Command-line interface for wbs
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::storage::FileStore;

mod init;
mod project;
mod task;

/// wbs - hierarchical project schedules
///
/// Keeps a work breakdown structure of tasks per project: summary tasks
/// roll up dates, effort and status from their subtasks, and WBS codes
/// follow the outline.
#[derive(Parser, Debug)]
#[command(name = "wbs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Schedule root directory (defaults to current directory)
    #[arg(long, global = true, env = "WBS_ROOT")]
    pub root: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a schedule in the root directory
    Init,

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Task management and hierarchy edits
    #[command(subcommand)]
    Task(TaskCommands),
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    New {
        /// Project name
        name: String,

        /// Short unique code used as task code prefix (e.g. MIG)
        #[arg(long)]
        code: String,

        /// Free-text description
        #[arg(long)]
        description: Option<String>,
    },

    /// List projects with their statistics
    List,

    /// Show one project (id or code)
    Show { project: String },

    /// Edit project name or description
    Edit {
        project: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a project and all of its tasks
    Rm { project: String },

    /// Show the status and task type catalog
    Settings,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Append a task to the end of a project
    Add {
        /// Project id or code
        project: String,

        #[arg(long)]
        description: String,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Effort estimate
        #[arg(long)]
        estimate: Option<f64>,

        #[arg(long)]
        resource: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Task type (e.g. Task, Milestone)
        #[arg(long = "type")]
        task_type: Option<String>,

        /// Free-text predecessor list
        #[arg(long)]
        predecessors: Option<String>,

        /// Percent complete (clamped to 0-100)
        #[arg(long, allow_negative_numbers = true)]
        progress: Option<i64>,
    },

    /// List a project's tasks in outline order
    List { project: String },

    /// Show one task (id or task code)
    Show { task: String },

    /// Edit a task's fields
    Edit {
        task: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        estimate: Option<f64>,

        #[arg(long, conflicts_with = "clear_resource")]
        resource: Option<String>,

        /// Remove the assigned resource
        #[arg(long)]
        clear_resource: bool,

        #[arg(long)]
        status: Option<String>,

        #[arg(long = "type")]
        task_type: Option<String>,

        #[arg(long, conflicts_with = "clear_predecessors")]
        predecessors: Option<String>,

        /// Remove the predecessor list
        #[arg(long)]
        clear_predecessors: bool,

        #[arg(long, allow_negative_numbers = true)]
        progress: Option<i64>,

        /// Expanded state of a summary task (true or false)
        #[arg(long)]
        expanded: Option<bool>,
    },

    /// Delete a task; its subtasks move up one level
    Rm { task: String },

    /// Make a task a subtask of the row above it
    Indent { task: String },

    /// Move a task up one level in the outline
    Outdent { task: String },

    /// Expand or collapse a summary task
    Toggle { task: String },

    /// Set order indices explicitly
    Reorder {
        project: String,

        /// Entries of the form TASK=INDEX
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Recompute WBS codes, rollups, order and statuses
    Recalc { project: String },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let root = self.root;
        let json = self.json;
        let quiet = self.quiet;
        match self.command {
            Commands::Init => init::run(root, json, quiet),
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New {
                    name,
                    code,
                    description,
                } => project::run_new(project::NewOptions {
                    name,
                    code,
                    description,
                    root,
                    json,
                    quiet,
                }),
                ProjectCommands::List => project::run_list(root, json, quiet),
                ProjectCommands::Show { project: selector } => {
                    project::run_show(project::TargetOptions {
                        project: selector,
                        root,
                        json,
                        quiet,
                    })
                }
                ProjectCommands::Edit {
                    project: selector,
                    name,
                    description,
                } => project::run_edit(project::EditOptions {
                    project: selector,
                    name,
                    description,
                    root,
                    json,
                    quiet,
                }),
                ProjectCommands::Rm { project: selector } => {
                    project::run_rm(project::TargetOptions {
                        project: selector,
                        root,
                        json,
                        quiet,
                    })
                }
                ProjectCommands::Settings => project::run_settings(root, json, quiet),
            },
            Commands::Task(cmd) => task::run(cmd, root, json, quiet),
        }
    }
}

/// Resolve the schedule root from `--root` / `WBS_ROOT` or the current directory.
pub(crate) fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(path) => Ok(path),
        None => Ok(std::env::current_dir()?),
    }
}

pub(crate) fn open_scheduler(root: Option<PathBuf>) -> Result<Scheduler<FileStore>> {
    let root = resolve_root(root)?;
    Scheduler::open(&root)
}
