//! Dotted WBS codes.
//!
//! The i-th root (1-based, by `order_index`) is coded `i`; the j-th child of
//! a task coded `C` is coded `C.j`. The same pass sets `is_summary` from
//! whether the task currently has children.

use crate::error::Result;
use crate::task::Task;
use crate::tree::TaskTree;

pub fn assign(tasks: &mut [Task]) -> Result<()> {
    let tree = TaskTree::canonical(tasks)?;

    // (node, code) frames, processed depth-first.
    let mut stack: Vec<(usize, String)> = Vec::new();
    for (idx, &root) in tree.roots().iter().enumerate().rev() {
        stack.push((root, child_code("", idx)));
    }
    while let Some((pos, code)) = stack.pop() {
        let children = tree.children(pos);
        for (idx, &kid) in children.iter().enumerate().rev() {
            stack.push((kid, child_code(&code, idx)));
        }
        let task = &mut tasks[pos];
        task.is_summary = !children.is_empty();
        task.wbs_code = code;
    }
    Ok(())
}

/// Code a task would receive as the `sibling_index`-th (0-based) child of `prefix`.
pub fn child_code(prefix: &str, sibling_index: usize) -> String {
    if prefix.is_empty() {
        (sibling_index + 1).to_string()
    } else {
        format!("{prefix}.{}", sibling_index + 1)
    }
}
