mod support;

use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

use support::{find, Schedule};

/// MIG with three top-level tasks: 1..2, 3..5 and 6..9.
fn three_tasks() -> Result<(Schedule, [u64; 3]), Box<dyn std::error::Error>> {
    let schedule = Schedule::init()?;
    schedule.project("Data migration", "MIG");
    let a = schedule.task("MIG", "Extract", 1, 2, 1.0);
    let b = schedule.task("MIG", "Transform", 3, 5, 2.0);
    let c = schedule.task("MIG", "Load", 6, 9, 4.0);
    Ok((schedule, [a, b, c]))
}

fn wbs_codes(tasks: &[Value]) -> Vec<String> {
    tasks
        .iter()
        .map(|task| task["wbs_code"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn add_assigns_codes_and_outline_position() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, _, c]) = three_tasks()?;

    let data = schedule.json(&["task", "show", "MIG-003"]);
    assert_eq!(data["id"].as_u64(), Some(c));
    assert_eq!(data["wbs_code"], "3");
    assert_eq!(data["order_index"], 2);
    assert_eq!(data["level"], 0);
    assert_eq!(data["status"], "Not Started");
    assert_eq!(data["task_type"], "Task");

    let data = schedule.json(&["task", "show", &a.to_string()]);
    assert_eq!(data["code"], "MIG-001");
    Ok(())
}

#[test]
fn add_validates_input() -> Result<(), Box<dyn std::error::Error>> {
    let schedule = Schedule::init()?;
    schedule.project("Data migration", "MIG");

    let base = ["task", "add", "MIG", "--description", "Extract"];
    schedule
        .cmd()
        .args(base)
        .args(["--start", "2024-01-05", "--end", "2024-01-01"])
        .assert()
        .code(2)
        .stderr(contains("before start date"));
    schedule
        .cmd()
        .args(base)
        .args(["--start", "05/01/2024", "--end", "2024-01-06"])
        .assert()
        .code(2)
        .stderr(contains("YYYY-MM-DD"));
    schedule
        .cmd()
        .args(base)
        .args(["--start", "2024-01-01", "--end", "2024-01-02", "--status", "Paused"])
        .assert()
        .code(2)
        .stderr(contains("unknown status"));
    schedule
        .cmd()
        .args(["task", "add", "NOPE", "--description", "x"])
        .args(["--start", "2024-01-01", "--end", "2024-01-02"])
        .assert()
        .code(3);

    let data = schedule.json(&[
        "task",
        "add",
        "MIG",
        "--description",
        "Kickoff",
        "--start",
        "2024-01-01",
        "--end",
        "2024-01-01",
        "--type",
        "Milestone",
        "--progress",
        "140",
    ]);
    assert_eq!(data["progress"], 100);
    assert_eq!(data["task_type"], "Milestone");
    Ok(())
}

#[test]
fn indent_builds_summary_and_rolls_up() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, b, c]) = three_tasks()?;

    let data = schedule.json(&["task", "indent", &b.to_string()]);
    assert_eq!(data["scope"], "project");
    assert_eq!(data["task"]["parent_id"].as_u64(), Some(a));
    assert_eq!(data["task"]["level"], 1);
    assert_eq!(data["task"]["wbs_code"], "1.1");

    let data = schedule.json(&["task", "indent", &c.to_string()]);
    assert_eq!(data["task"]["parent_id"].as_u64(), Some(a));

    let tasks = schedule.tasks("MIG");
    assert_eq!(wbs_codes(&tasks), vec!["1", "1.1", "1.2"]);
    let summary = find(&tasks, a);
    assert_eq!(summary["is_summary"], true);
    assert_eq!(summary["start_date"], "2024-01-03");
    assert_eq!(summary["end_date"], "2024-01-09");
    assert_eq!(summary["estimate"], 6.0);
    Ok(())
}

#[test]
fn indent_of_first_task_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, _, _]) = three_tasks()?;
    let output = schedule
        .cmd()
        .args(["task", "indent", &a.to_string(), "--json"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["command"], "task indent");
    assert_eq!(value["error"]["kind"], "validation_error");
    Ok(())
}

#[test]
fn outdent_restores_the_flat_outline() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, b, c]) = three_tasks()?;
    schedule.json(&["task", "indent", &b.to_string()]);
    schedule.json(&["task", "indent", &c.to_string()]);

    // Outdenting the first child captures its later sibling.
    let data = schedule.json(&["task", "outdent", &b.to_string()]);
    assert_eq!(data["task"]["level"], 0);
    assert_eq!(data["task"]["is_summary"], true);
    let tasks = schedule.tasks("MIG");
    assert_eq!(find(&tasks, c)["parent_id"].as_u64(), Some(b));
    assert_eq!(find(&tasks, a)["is_summary"], false);
    assert_eq!(wbs_codes(&tasks), vec!["1", "2", "2.1"]);

    schedule.json(&["task", "outdent", &c.to_string()]);
    let tasks = schedule.tasks("MIG");
    assert_eq!(wbs_codes(&tasks), vec!["1", "2", "3"]);
    assert!(tasks.iter().all(|task| task["level"] == 0));

    schedule
        .cmd()
        .args(["task", "outdent", &a.to_string()])
        .assert()
        .code(2)
        .stderr(contains("top-level"));
    Ok(())
}

#[test]
fn summary_fields_are_read_only() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, b, _]) = three_tasks()?;
    schedule.json(&["task", "indent", &b.to_string()]);

    schedule
        .cmd()
        .args(["task", "edit", "MIG-001", "--end", "2024-02-01"])
        .assert()
        .code(2)
        .stderr(contains("summary task"));
    schedule
        .cmd()
        .args(["task", "edit", &a.to_string(), "--status", "Complete"])
        .assert()
        .code(2);

    let data = schedule.json(&[
        "task",
        "edit",
        &a.to_string(),
        "--description",
        "Extract phase",
        "--resource",
        "ana",
    ]);
    assert_eq!(data["scope"], "single");
    assert_eq!(data["task"]["description"], "Extract phase");
    assert_eq!(data["task"]["resource"], "ana");
    Ok(())
}

#[test]
fn leaf_edits_roll_up_dates_and_status() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, b, c]) = three_tasks()?;
    schedule.json(&["task", "indent", &b.to_string()]);
    schedule.json(&["task", "indent", &c.to_string()]);

    let data = schedule.json(&["task", "edit", &c.to_string(), "--end", "2024-01-20"]);
    assert_eq!(data["scope"], "project");
    let tasks = data["tasks"].as_array().cloned().unwrap_or_default();
    assert_eq!(find(&tasks, a)["end_date"], "2024-01-20");

    schedule.json(&["task", "edit", &b.to_string(), "--status", "In Progress"]);
    let tasks = schedule.tasks("MIG");
    assert_eq!(find(&tasks, a)["status"], "In Progress");

    schedule.json(&["task", "edit", &b.to_string(), "--status", "Complete"]);
    let tasks = schedule.tasks("MIG");
    assert_eq!(find(&tasks, a)["status"], "In Progress");

    schedule.json(&["task", "edit", &c.to_string(), "--status", "Complete"]);
    let tasks = schedule.tasks("MIG");
    assert_eq!(find(&tasks, a)["status"], "Complete");
    Ok(())
}

#[test]
fn clear_flags_remove_optional_fields() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, _, _]) = three_tasks()?;
    let id = a.to_string();
    schedule.json(&["task", "edit", &id, "--resource", "ana", "--predecessors", "2FS"]);

    let data = schedule.json(&["task", "edit", &id, "--clear-resource", "--clear-predecessors"]);
    assert!(data["task"].get("resource").is_none());
    assert!(data["task"].get("predecessors").is_none());
    Ok(())
}

#[test]
fn remove_promotes_children_and_keeps_codes() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, b, c]) = three_tasks()?;
    schedule.json(&["task", "indent", &b.to_string()]);

    let data = schedule.json(&["task", "rm", &a.to_string()]);
    assert_eq!(data["removed"]["code"], "MIG-001");

    let tasks = schedule.tasks("MIG");
    assert_eq!(tasks.len(), 2);
    let promoted = find(&tasks, b);
    assert!(promoted.get("parent_id").is_none());
    assert_eq!(promoted["level"], 0);
    assert_eq!(promoted["wbs_code"], "1");
    assert_eq!(promoted["order_index"], 0);
    assert_eq!(find(&tasks, c)["order_index"], 1);

    // Codes come from the project sequence and are not reused.
    let d = schedule.task("MIG", "Verify", 10, 11, 1.0);
    let data = schedule.json(&["task", "show", &d.to_string()]);
    assert_eq!(data["code"], "MIG-004");

    schedule.cmd().args(["task", "rm", &a.to_string()]).assert().code(3);
    Ok(())
}

#[test]
fn toggle_collapses_summary_rows() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, b, c]) = three_tasks()?;
    schedule
        .cmd()
        .args(["task", "toggle", &a.to_string()])
        .assert()
        .code(2)
        .stderr(contains("no subtasks"));

    schedule.json(&["task", "indent", &b.to_string()]);
    let data = schedule.json(&["task", "toggle", &a.to_string()]);
    assert_eq!(data["scope"], "single");
    assert_eq!(data["task"]["expanded"], false);

    schedule
        .cmd()
        .args(["task", "list", "MIG"])
        .assert()
        .success()
        .stdout(contains("MIG-001"))
        .stdout(contains("MIG-002").not())
        .stdout(contains("MIG-003"));

    // JSON listings always carry every row.
    let tasks = schedule.tasks("MIG");
    assert_eq!(tasks.len(), 3);
    assert_eq!(find(&tasks, c)["wbs_code"], "2");
    Ok(())
}

#[test]
fn reorder_moves_rows_and_warns_on_foreign_ids() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, b, c]) = three_tasks()?;
    let output = schedule
        .cmd()
        .args([
            "task",
            "reorder",
            "MIG",
            &format!("{c}=0"),
            "MIG-001=1",
            &format!("{b}=2"),
            "99=3",
            "--json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: Value = serde_json::from_slice(&output)?;
    assert_eq!(value["data"]["scope"], "project");
    let warnings = value["warnings"].as_array().cloned().unwrap_or_default();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap_or_default().contains("99"));

    let tasks = schedule.tasks("MIG");
    let ids: Vec<u64> = tasks.iter().filter_map(|task| task["id"].as_u64()).collect();
    assert_eq!(ids, vec![c, a, b]);
    assert_eq!(wbs_codes(&tasks), vec!["1", "2", "3"]);

    schedule
        .cmd()
        .args(["task", "reorder", "MIG", "MIG-001"])
        .assert()
        .code(2)
        .stderr(contains("TASK=INDEX"));
    Ok(())
}

#[test]
fn recalc_densifies_order_after_sparse_reorder() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, [a, b, c]) = three_tasks()?;
    schedule.json(&[
        "task",
        "reorder",
        "MIG",
        &format!("{a}=10"),
        &format!("{b}=20"),
        &format!("{c}=30"),
    ]);

    let data = schedule.json(&["task", "recalc", "MIG"]);
    assert_eq!(data["scope"], "project");
    let tasks = schedule.tasks("MIG");
    let orders: Vec<i64> = tasks
        .iter()
        .filter_map(|task| task["order_index"].as_i64())
        .collect();
    assert_eq!(orders, vec![0, 1, 2]);
    assert_eq!(wbs_codes(&tasks), vec!["1", "2", "3"]);
    Ok(())
}

#[test]
fn tasks_are_scoped_to_their_project() -> Result<(), Box<dyn std::error::Error>> {
    let (schedule, _) = three_tasks()?;
    schedule.project("Website", "WEB");
    let w = schedule.task("WEB", "Design", 1, 3, 2.0);

    let data = schedule.json(&["task", "show", &w.to_string()]);
    assert_eq!(data["code"], "WEB-001");
    assert_eq!(data["wbs_code"], "1");
    assert_eq!(schedule.tasks("WEB").len(), 1);
    assert_eq!(schedule.tasks("MIG").len(), 3);

    schedule.cmd().args(["task", "show", "WEB-002"]).assert().code(3);
    schedule.cmd().args(["task", "show", "garbage"]).assert().code(3);
    Ok(())
}
