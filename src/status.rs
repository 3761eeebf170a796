//! Summary status inference.
//!
//! Children are resolved before their parent, then a parent with children
//! takes:
//! - in-progress if any child is in progress,
//! - complete if every child is complete,
//! - not-started if every child is not started,
//! - in-progress otherwise.
//!
//! Leaf statuses are user-set and never touched.

use serde::Serialize;

use crate::config::TasksConfig;
use crate::error::Result;
use crate::task::Task;
use crate::tree::TaskTree;

/// Status names the propagator reasons about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRules {
    pub not_started: String,
    pub in_progress: String,
    pub complete: String,
}

impl Default for StatusRules {
    fn default() -> Self {
        Self {
            not_started: "Not Started".to_string(),
            in_progress: "In Progress".to_string(),
            complete: "Complete".to_string(),
        }
    }
}

impl From<&TasksConfig> for StatusRules {
    fn from(config: &TasksConfig) -> Self {
        Self {
            not_started: config.not_started_status.clone(),
            in_progress: config.in_progress_status.clone(),
            complete: config.complete_status.clone(),
        }
    }
}

impl StatusRules {
    /// Status a parent derives from its children's statuses.
    pub fn derive<'a, I>(&self, children: I) -> &str
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut any_in_progress = false;
        let mut all_complete = true;
        let mut all_not_started = true;
        for status in children {
            any_in_progress |= status == self.in_progress;
            all_complete &= status == self.complete;
            all_not_started &= status == self.not_started;
        }
        if any_in_progress {
            &self.in_progress
        } else if all_complete {
            &self.complete
        } else if all_not_started {
            &self.not_started
        } else {
            &self.in_progress
        }
    }
}

pub fn propagate(tasks: &mut [Task], rules: &StatusRules) -> Result<()> {
    let tree = TaskTree::build(tasks)?;
    for pos in tree.postorder() {
        let children = tree.children(pos);
        if children.is_empty() {
            continue;
        }
        let derived = rules
            .derive(children.iter().map(|&kid| tasks[kid].status.as_str()))
            .to_string();
        tasks[pos].status = derived;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::task;

    fn with_status(mut task: Task, status: &str) -> Task {
        task.status = status.to_string();
        task
    }

    #[test]
    fn derive_rules() {
        let rules = StatusRules::default();
        assert_eq!(rules.derive(["In Progress", "Complete"]), "In Progress");
        assert_eq!(rules.derive(["Complete", "Complete"]), "Complete");
        assert_eq!(rules.derive(["Not Started", "Not Started"]), "Not Started");
        assert_eq!(rules.derive(["Complete", "Not Started"]), "In Progress");
        // Statuses outside the three named ones count as mixed.
        assert_eq!(rules.derive(["On Hold", "Complete"]), "In Progress");
    }

    #[test]
    fn nested_parents_resolve_bottom_up() {
        let mut tasks = vec![
            with_status(task(1, None, 0, 0), "Not Started"),
            with_status(task(2, Some(1), 1, 1), "Not Started"),
            with_status(task(3, Some(2), 2, 2), "Complete"),
            with_status(task(4, Some(2), 2, 3), "Complete"),
            with_status(task(5, Some(1), 1, 4), "Complete"),
        ];
        propagate(&mut tasks, &StatusRules::default()).unwrap();
        assert_eq!(tasks[1].status, "Complete");
        assert_eq!(tasks[0].status, "Complete");
    }

    #[test]
    fn leaf_change_only_touches_its_ancestors() {
        let mut tasks = vec![
            with_status(task(1, None, 0, 0), "Complete"),
            with_status(task(2, Some(1), 1, 1), "Complete"),
            with_status(task(3, None, 0, 2), "Not Started"),
            with_status(task(4, Some(3), 1, 3), "Not Started"),
        ];
        let rules = StatusRules::default();
        propagate(&mut tasks, &rules).unwrap();
        let before = tasks.clone();

        tasks[1].status = "In Progress".to_string();
        propagate(&mut tasks, &rules).unwrap();
        assert_eq!(tasks[0].status, "In Progress");
        assert_eq!(tasks[2], before[2]);
        assert_eq!(tasks[3], before[3]);
    }

    #[test]
    fn custom_names_are_honoured() {
        let rules = StatusRules {
            not_started: "todo".to_string(),
            in_progress: "doing".to_string(),
            complete: "done".to_string(),
        };
        let mut tasks = vec![
            with_status(task(1, None, 0, 0), "todo"),
            with_status(task(2, Some(1), 1, 1), "done"),
            with_status(task(3, Some(1), 1, 2), "done"),
        ];
        propagate(&mut tasks, &rules).unwrap();
        assert_eq!(tasks[0].status, "done");
    }
}
