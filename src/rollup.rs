//! Bottom-up date and estimate rollup for summary tasks.
//!
//! A leaf contributes its own span and estimate. A summary task spans the
//! earliest start to the latest end of its children's aggregated spans and
//! carries the sum of their aggregated estimates; its own stored values
//! never feed back into the result.

use chrono::NaiveDate;

use crate::error::Result;
use crate::task::Task;
use crate::tree::TaskTree;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub estimate: f64,
}

/// Aggregated `(start, end)` of the node at `pos`, by direct recursion.
pub fn date_range(tasks: &[Task], tree: &TaskTree, pos: usize) -> (NaiveDate, NaiveDate) {
    let children = tree.children(pos);
    if children.is_empty() {
        return (tasks[pos].start_date, tasks[pos].end_date);
    }
    children
        .iter()
        .map(|&kid| date_range(tasks, tree, kid))
        .reduce(|(start, end), (kid_start, kid_end)| (start.min(kid_start), end.max(kid_end)))
        .unwrap_or((tasks[pos].start_date, tasks[pos].end_date))
}

/// Aggregated estimate of the node at `pos`, by direct recursion.
pub fn total_estimate(tasks: &[Task], tree: &TaskTree, pos: usize) -> f64 {
    let children = tree.children(pos);
    if children.is_empty() {
        return tasks[pos].estimate;
    }
    children
        .iter()
        .map(|&kid| total_estimate(tasks, tree, kid))
        .sum()
}

/// Aggregates for every node in one post-order pass.
pub fn aggregate_all(tasks: &[Task], tree: &TaskTree) -> Vec<Aggregate> {
    let mut out: Vec<Option<Aggregate>> = vec![None; tasks.len()];
    for pos in tree.postorder() {
        let own = Aggregate {
            start: tasks[pos].start_date,
            end: tasks[pos].end_date,
            estimate: tasks[pos].estimate,
        };
        let merged = tree
            .children(pos)
            .iter()
            .filter_map(|&kid| out[kid])
            .reduce(|acc, kid| Aggregate {
                start: acc.start.min(kid.start),
                end: acc.end.max(kid.end),
                estimate: acc.estimate + kid.estimate,
            });
        out[pos] = Some(merged.unwrap_or(own));
    }
    out.into_iter()
        .zip(tasks)
        .map(|(agg, task)| {
            agg.unwrap_or(Aggregate {
                start: task.start_date,
                end: task.end_date,
                estimate: task.estimate,
            })
        })
        .collect()
}

/// Overwrite dates and estimate of every task that has children and mark
/// it as a summary. Leaves are left untouched.
pub fn recalculate(tasks: &mut [Task]) -> Result<()> {
    let tree = TaskTree::build(tasks)?;
    let aggregates = aggregate_all(tasks, &tree);
    for (pos, agg) in aggregates.into_iter().enumerate() {
        if !tree.has_children(pos) {
            continue;
        }
        let task = &mut tasks[pos];
        task.start_date = agg.start;
        task.end_date = agg.end;
        task.estimate = agg.estimate;
        task.is_summary = true;
    }
    Ok(())
}
