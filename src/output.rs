//! What a command prints: a versioned JSON envelope under `--json`, or a
//! short plain-text report otherwise. Errors use the same envelope with
//! `status: "error"`.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "wbs.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

impl OutputOptions {
    pub fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    /// Print a successful result. `--json` takes precedence over `--quiet`;
    /// the report's warnings and next steps ride along in the envelope.
    pub fn emit<T: Serialize>(self, command: &str, data: &T, report: &Report) -> Result<()> {
        if self.json {
            let envelope = Envelope {
                data: Some(data),
                warnings: &report.warnings,
                next_steps: &report.next_steps,
                ..Envelope::new(command)
            };
            return envelope.print();
        }
        if !self.quiet {
            println!("{report}");
        }
        Ok(())
    }
}

/// Plain-text result of one command: a title line followed by optional
/// bulleted blocks.
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    fields: Vec<(String, String)>,
    rows: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// A `label: value` line; an empty value prints the label alone.
    pub fn field(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.fields.push((label.into(), value.into()));
    }

    pub fn row(&mut self, line: impl Into<String>) {
        self.rows.push(line.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn suggest(&mut self, command: impl Into<String>) {
        self.next_steps.push(command.into());
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)?;
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(label, value)| match value.as_str() {
                "" => label.clone(),
                value => format!("{label}: {value}"),
            })
            .collect();
        write_block(f, "Summary", &fields)?;
        write_block(f, "Details", &self.rows)?;
        write_block(f, "Warnings", &self.warnings)?;
        write_block(f, "Next steps", &self.next_steps)
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, title: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    write!(f, "\n\n{title}:")?;
    for item in items {
        write!(f, "\n- {item}")?;
    }
    Ok(())
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "no_items")]
    warnings: &'a [String],
    #[serde(skip_serializing_if = "no_items")]
    next_steps: &'a [String],
}

impl<'a, T: Serialize> Envelope<'a, T> {
    fn new(command: &'a str) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data: None,
            error: None,
            warnings: &[],
            next_steps: &[],
        }
    }

    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
}

fn no_items(items: &&[String]) -> bool {
    items.is_empty()
}

/// Report a failed command on stdout (`--json`) or stderr, with a hint
/// when one applies.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        let envelope: Envelope<'_, ()> = Envelope {
            status: "error",
            error: Some(ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: err.kind(),
            }),
            next_steps: &next_steps,
            ..Envelope::new(command)
        };
        return envelope.print();
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

/// `wbs task indent 4 --json` is reported as `task indent`.
fn command_name(args: impl Iterator<Item = String>) -> String {
    let mut words = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == "--root" {
            skip_value = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg);
        let done = match words[0].as_str() {
            "project" | "task" => words.len() == 2,
            _ => true,
        };
        if done {
            break;
        }
    }

    if words.is_empty() {
        "wbs".to_string()
    } else {
        words.join(" ")
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::ProjectNotFound(_) => vec!["wbs project list".to_string()],
        Error::TaskNotFound(_) => vec!["wbs task list <PROJECT>".to_string()],
        Error::SummaryTaskReadOnly { .. } => {
            vec!["edit the subtasks; summary values are rolled up from them".to_string()]
        }
        Error::Invariant(_) => vec!["wbs task recalc <PROJECT>".to_string()],
        Error::InvalidConfig(_) => vec!["fix .wbs.toml then retry".to_string()],
        Error::LockFailed(_) => vec!["retry once the other wbs process finishes".to_string()],
        Error::OperationFailed(msg) if msg.contains("wbs init") => vec!["wbs init".to_string()],
        _ => Vec::new(),
    }
}
