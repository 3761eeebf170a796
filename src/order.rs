//! Dense depth-first order indices.
//!
//! Roots and siblings are visited in current `order_index` order and every
//! visited task receives the next value of one counter shared by the whole
//! traversal, so the result is a permutation of `0..n`.

use crate::error::Result;
use crate::task::Task;
use crate::tree::TaskTree;

pub fn reindex(tasks: &mut [Task]) -> Result<()> {
    let tree = TaskTree::canonical(tasks)?;
    for (counter, pos) in tree.preorder().into_iter().enumerate() {
        tasks[pos].order_index = counter as i64;
    }
    Ok(())
}

/// True when `order_index` is a dense `0..n` preorder of the forest.
pub fn is_dense_preorder(tasks: &[Task]) -> Result<bool> {
    let tree = TaskTree::canonical(tasks)?;
    Ok(tree
        .preorder()
        .into_iter()
        .enumerate()
        .all(|(expected, pos)| tasks[pos].order_index == expected as i64))
}
