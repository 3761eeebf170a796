//! Structural edits: indent, outdent, delete with child promotion, and
//! caller-driven reordering.
//!
//! Every edit works on the full task list of one project, sorted into
//! project order first. Edits only touch parent links, levels and the
//! summary flag; the derived fields are left to the recalculation pipeline.
//!
//! Indent and outdent scan neighbouring rows of the outline, taken in
//! depth-first order. Levels must match depth; a project that fails that
//! check is rejected untouched.

use crate::error::{Error, Result};
use crate::pipeline::sort_by_order;
use crate::task::{Task, TaskId};
use crate::tree::{well_formed, TaskTree};

/// Make a task the last child of the nearest preceding row whose level is
/// not deeper than its own.
pub fn indent(tasks: &mut [Task], task_id: TaskId) -> Result<()> {
    sort_by_order(tasks);
    let tree = traversal_rows(tasks)?;
    let pos = locate(&tree, task_id)?;
    if pos == 0 {
        return Err(Error::InvalidArgument(
            "cannot indent the first task".to_string(),
        ));
    }

    let level = tasks[pos].level;
    let parent_pos = (0..pos)
        .rev()
        .find(|&above| tasks[above].level <= level)
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "no task above {} can become its parent",
                tasks[pos].code
            ))
        })?;
    if tree.is_ancestor(pos, parent_pos) {
        return Err(Error::invariant(format!(
            "indent would make task {} its own ancestor",
            task_id
        )));
    }

    let parent_id = tasks[parent_pos].id;
    let parent_level = tasks[parent_pos].level;
    tasks[parent_pos].is_summary = true;
    tasks[pos].parent_id = Some(parent_id);
    tasks[pos].level = parent_level + 1;
    rebase_subtrees(tasks, &[task_id])?;

    tracing::debug!(task_id, parent_id, "indented task");
    Ok(())
}

/// Move a task up one level. Later siblings under the same old parent are
/// captured as the task's children until the first row at or above the old
/// parent's level.
pub fn outdent(tasks: &mut [Task], task_id: TaskId) -> Result<()> {
    sort_by_order(tasks);
    let tree = traversal_rows(tasks)?;
    let pos = locate(&tree, task_id)?;
    let old_parent_id = tasks[pos].parent_id.ok_or_else(|| {
        Error::InvalidArgument(format!(
            "cannot outdent top-level task {}",
            tasks[pos].code
        ))
    })?;
    let old_parent_pos = tree.parent(pos).ok_or_else(|| {
        Error::invariant(format!("parent {old_parent_id} of task {task_id} is missing"))
    })?;

    let old_parent_level = tasks[old_parent_pos].level;
    tasks[pos].parent_id = tasks[old_parent_pos].parent_id;
    tasks[pos].level = old_parent_level;

    let mut captured = 0usize;
    for below in pos + 1..tasks.len() {
        if tasks[below].parent_id == Some(old_parent_id) {
            tasks[below].parent_id = Some(task_id);
            tasks[below].level = old_parent_level + 1;
            captured += 1;
        } else if tasks[below].level <= old_parent_level {
            break;
        }
    }
    if captured > 0 {
        tasks[pos].is_summary = true;
    }
    rebase_subtrees(tasks, &[task_id])?;

    if !tasks
        .iter()
        .any(|task| task.parent_id == Some(old_parent_id))
    {
        tasks[old_parent_pos].is_summary = false;
    }

    tracing::debug!(task_id, old_parent_id, captured, "outdented task");
    Ok(())
}

/// Remove a task, promoting its children to the removed task's parent at
/// the removed task's level. Returns the removed task.
pub fn remove(tasks: &mut Vec<Task>, task_id: TaskId) -> Result<Task> {
    sort_by_order(tasks);
    let tree = well_formed(tasks)?;
    let pos = locate(&tree, task_id)?;

    let parent_id = tasks[pos].parent_id;
    let level = tasks[pos].level;
    let promoted: Vec<TaskId> = tree
        .children(pos)
        .iter()
        .map(|&kid| tasks[kid].id)
        .collect();
    for &kid in tree.children(pos) {
        tasks[kid].parent_id = parent_id;
        tasks[kid].level = level;
    }

    let removed = tasks.remove(pos);
    rebase_subtrees(tasks, &promoted)?;

    tracing::debug!(task_id, promoted = promoted.len(), "removed task");
    Ok(removed)
}

/// Assign caller-supplied order indices. Ids not present in `tasks` are
/// skipped and returned.
pub fn apply_order(tasks: &mut [Task], orders: &[(TaskId, i64)]) -> Vec<TaskId> {
    let mut skipped = Vec::new();
    for &(id, order_index) in orders {
        match tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => task.order_index = order_index,
            None => skipped.push(id),
        }
    }
    skipped
}

/// Order index that places a new task after every existing one.
pub fn append_position(tasks: &[Task]) -> i64 {
    tasks
        .iter()
        .map(|task| task.order_index)
        .max()
        .map_or(0, |max| max + 1)
}

fn locate(tree: &TaskTree, task_id: TaskId) -> Result<usize> {
    tree.position(task_id)
        .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
}

/// Lay the rows out in depth-first traversal order and return the tree
/// over that layout. Caller-supplied order indices may leave a child sorted
/// away from its parent; the neighbour scans of indent and outdent walk the
/// outline, not the raw index order.
fn traversal_rows(tasks: &mut [Task]) -> Result<TaskTree> {
    let tree = well_formed(tasks)?;
    let preorder = tree.preorder();
    if preorder.iter().copied().eq(0..tasks.len()) {
        return Ok(tree);
    }
    let rows: Vec<Task> = preorder.into_iter().map(|pos| tasks[pos].clone()).collect();
    tasks.clone_from_slice(&rows);
    well_formed(tasks)
}

/// Reset levels below each listed task so every child sits one level under
/// its parent.
fn rebase_subtrees(tasks: &mut [Task], roots: &[TaskId]) -> Result<()> {
    let tree = TaskTree::build(tasks)?;
    for &id in roots {
        let pos = tree
            .position(id)
            .ok_or_else(|| Error::invariant(format!("task {id} vanished during rebase")))?;
        for below in tree.descendants(pos) {
            let parent = tree
                .parent(below)
                .ok_or_else(|| Error::invariant(format!("task {} lost its parent", tasks[below].id)))?;
            tasks[below].level = tasks[parent].level + 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::task;

    fn find(tasks: &[Task], id: TaskId) -> &Task {
        tasks.iter().find(|t| t.id == id).expect("task present")
    }

    fn shape(tasks: &[Task], id: TaskId) -> (Option<TaskId>, u32) {
        let t = find(tasks, id);
        (t.parent_id, t.level)
    }

    /// 1
    /// 2
    ///   3
    ///   4
    ///     5
    ///   6
    /// 7
    fn sample() -> Vec<Task> {
        vec![
            task(1, None, 0, 0),
            task(2, None, 0, 1),
            task(3, Some(2), 1, 2),
            task(4, Some(2), 1, 3),
            task(5, Some(4), 2, 4),
            task(6, Some(2), 1, 5),
            task(7, None, 0, 6),
        ]
    }

    #[test]
    fn indent_first_task_fails() {
        let mut tasks = sample();
        let err = indent(&mut tasks, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("first task")));
        assert_eq!(tasks, sample());
    }

    #[test]
    fn indent_under_preceding_sibling_moves_subtree() {
        let mut tasks = sample();
        indent(&mut tasks, 4).unwrap();
        assert_eq!(shape(&tasks, 4), (Some(3), 2));
        assert_eq!(shape(&tasks, 5), (Some(4), 3));
        assert!(find(&tasks, 3).is_summary);
    }

    #[test]
    fn indent_root_under_previous_root() {
        let mut tasks = sample();
        indent(&mut tasks, 7).unwrap();
        assert_eq!(shape(&tasks, 7), (Some(2), 1));
        indent(&mut tasks, 2).unwrap();
        assert_eq!(shape(&tasks, 2), (Some(1), 1));
        assert_eq!(shape(&tasks, 3), (Some(2), 2));
        assert_eq!(shape(&tasks, 5), (Some(4), 3));
        assert_eq!(shape(&tasks, 7), (Some(2), 2));
    }

    #[test]
    fn outdent_root_fails() {
        let mut tasks = sample();
        let err = outdent(&mut tasks, 2).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("top-level")));
    }

    #[test]
    fn outdent_captures_later_siblings() {
        let mut tasks = sample();
        outdent(&mut tasks, 4).unwrap();
        assert_eq!(shape(&tasks, 4), (None, 0));
        assert_eq!(shape(&tasks, 5), (Some(4), 1));
        assert_eq!(shape(&tasks, 6), (Some(4), 1));
        assert_eq!(shape(&tasks, 3), (Some(2), 1));
        assert_eq!(shape(&tasks, 7), (None, 0));
        assert!(find(&tasks, 4).is_summary);
        assert!(tasks.iter().any(|t| t.parent_id == Some(2)));
    }

    #[test]
    fn outdent_last_child_clears_old_parent_summary() {
        let mut tasks = vec![task(1, None, 0, 0), task(2, Some(1), 1, 1)];
        tasks[0].is_summary = true;
        outdent(&mut tasks, 2).unwrap();
        assert_eq!(shape(&tasks, 2), (None, 0));
        assert!(!find(&tasks, 1).is_summary);
        assert!(!find(&tasks, 2).is_summary);
    }

    #[test]
    fn indent_then_outdent_restores_parent_and_level() {
        let mut tasks = sample();
        indent(&mut tasks, 6).unwrap();
        assert_eq!(shape(&tasks, 6), (Some(4), 2));
        outdent(&mut tasks, 6).unwrap();
        assert_eq!(shape(&tasks, 6), (Some(2), 1));
    }

    #[test]
    fn remove_promotes_children_and_rebases_grandchildren() {
        let mut tasks = sample();
        let removed = remove(&mut tasks, 2).unwrap();
        assert_eq!(removed.id, 2);
        assert_eq!(tasks.len(), 6);
        assert_eq!(shape(&tasks, 3), (None, 0));
        assert_eq!(shape(&tasks, 4), (None, 0));
        assert_eq!(shape(&tasks, 5), (Some(4), 1));
        assert_eq!(shape(&tasks, 6), (None, 0));
        assert!(well_formed(&tasks).is_ok());
    }

    #[test]
    fn remove_nested_promotes_to_grandparent() {
        let mut tasks = sample();
        remove(&mut tasks, 4).unwrap();
        assert_eq!(shape(&tasks, 5), (Some(2), 1));
        assert!(tasks.iter().all(|t| t.parent_id != Some(4)));
    }

    #[test]
    fn malformed_tree_is_rejected_before_any_change() {
        let mut tasks = sample();
        tasks[4].level = 7;
        let before = tasks.clone();
        let err = outdent(&mut tasks, 4).unwrap_err();
        assert!(matches!(err, Error::Invariant(_)));
        assert_eq!(tasks, before);
    }

    #[test]
    fn indent_walks_the_outline_after_a_reorder() {
        // 1, 2 (child 3 at index 5), 4 as stored after an explicit reorder.
        let mut tasks = vec![
            task(1, None, 0, 0),
            task(2, None, 0, 1),
            task(3, Some(2), 1, 5),
            task(4, None, 0, 2),
        ];
        indent(&mut tasks, 4).unwrap();
        assert_eq!(shape(&tasks, 4), (Some(2), 1));
        assert!(find(&tasks, 2).is_summary);
        assert!(well_formed(&tasks).is_ok());
    }

    #[test]
    fn outdent_walks_the_outline_after_a_reorder() {
        // Child 3 sorts before its parent; its sibling 4 still follows it.
        let mut tasks = sample();
        tasks[2].order_index = -1;
        outdent(&mut tasks, 3).unwrap();
        assert_eq!(shape(&tasks, 3), (None, 0));
        assert_eq!(shape(&tasks, 4), (Some(3), 1));
        assert_eq!(shape(&tasks, 5), (Some(4), 2));
        assert_eq!(shape(&tasks, 6), (Some(3), 1));
        assert!(!find(&tasks, 2).is_summary);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let mut tasks = sample();
        assert!(matches!(indent(&mut tasks, 99), Err(Error::TaskNotFound(_))));
        assert!(matches!(remove(&mut tasks, 99), Err(Error::TaskNotFound(_))));
    }

    #[test]
    fn apply_order_skips_unknown_ids() {
        let mut tasks = sample();
        let skipped = apply_order(&mut tasks, &[(7, -1), (42, 3)]);
        assert_eq!(skipped, vec![42]);
        assert_eq!(find(&tasks, 7).order_index, -1);
    }

    #[test]
    fn append_position_after_last() {
        assert_eq!(append_position(&[]), 0);
        assert_eq!(append_position(&sample()), 7);
    }
}
