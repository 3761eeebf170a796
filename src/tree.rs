//! Forest view over a project's flat task list.
//!
//! Nodes are addressed by their position in the task slice the tree was
//! built from; the tree never holds references to tasks, so callers keep
//! full mutable access to the slice while walking it.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::task::{Task, TaskId};

#[derive(Debug, Clone)]
pub struct TaskTree {
    index: HashMap<TaskId, usize>,
    roots: Vec<usize>,
    children: Vec<Vec<usize>>,
    parent: Vec<Option<usize>>,
}

impl TaskTree {
    /// Build the parent/children index. Sibling lists keep input order.
    ///
    /// Fails with an invariant error when an id is duplicated, a parent is
    /// not part of the list, or the parent links contain a cycle.
    pub fn build(tasks: &[Task]) -> Result<Self> {
        let mut index = HashMap::with_capacity(tasks.len());
        for (pos, task) in tasks.iter().enumerate() {
            if index.insert(task.id, pos).is_some() {
                return Err(Error::invariant(format!("duplicate task id {}", task.id)));
            }
        }

        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); tasks.len()];
        let mut parent = vec![None; tasks.len()];
        for (pos, task) in tasks.iter().enumerate() {
            match task.parent_id {
                None => roots.push(pos),
                Some(parent_id) => {
                    let parent_pos = *index.get(&parent_id).ok_or_else(|| {
                        Error::invariant(format!(
                            "task {} references missing parent {}",
                            task.id, parent_id
                        ))
                    })?;
                    children[parent_pos].push(pos);
                    parent[pos] = Some(parent_pos);
                }
            }
        }

        let tree = Self {
            index,
            roots,
            children,
            parent,
        };
        tree.ensure_acyclic(tasks)?;
        Ok(tree)
    }

    /// Build the tree with roots and every sibling list ordered by the
    /// current `order_index` (ties keep input order).
    pub fn canonical(tasks: &[Task]) -> Result<Self> {
        let mut tree = Self::build(tasks)?;
        tree.roots.sort_by_key(|&pos| tasks[pos].order_index);
        for siblings in &mut tree.children {
            siblings.sort_by_key(|&pos| tasks[pos].order_index);
        }
        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn children(&self, pos: usize) -> &[usize] {
        &self.children[pos]
    }

    pub fn parent(&self, pos: usize) -> Option<usize> {
        self.parent[pos]
    }

    pub fn has_children(&self, pos: usize) -> bool {
        !self.children[pos].is_empty()
    }

    /// Parent id to direct child ids, in sibling order.
    pub fn children_map(&self, tasks: &[Task]) -> HashMap<TaskId, Vec<TaskId>> {
        self.children
            .iter()
            .enumerate()
            .filter(|(_, kids)| !kids.is_empty())
            .map(|(pos, kids)| {
                (
                    tasks[pos].id,
                    kids.iter().map(|&kid| tasks[kid].id).collect(),
                )
            })
            .collect()
    }

    /// Depth-first preorder over the whole forest, siblings in list order.
    pub fn preorder(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(pos) = stack.pop() {
            out.push(pos);
            stack.extend(self.children[pos].iter().rev().copied());
        }
        out
    }

    /// Depth-first postorder: every node appears after all of its descendants.
    pub fn postorder(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<(usize, bool)> = self.roots.iter().rev().map(|&pos| (pos, false)).collect();
        while let Some((pos, expanded)) = stack.pop() {
            if expanded {
                out.push(pos);
                continue;
            }
            stack.push((pos, true));
            stack.extend(self.children[pos].iter().rev().map(|&kid| (kid, false)));
        }
        out
    }

    /// All strict descendants of `pos` in preorder.
    pub fn descendants(&self, pos: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children[pos].iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children[next].iter().rev().copied());
        }
        out
    }

    pub fn is_ancestor(&self, ancestor: usize, mut pos: usize) -> bool {
        while let Some(up) = self.parent[pos] {
            if up == ancestor {
                return true;
            }
            pos = up;
        }
        false
    }

    /// Check that every `level` equals its depth in the forest.
    pub fn ensure_levels(&self, tasks: &[Task]) -> Result<()> {
        for pos in self.preorder() {
            let expected = match self.parent[pos] {
                None => 0,
                Some(up) => tasks[up].level + 1,
            };
            if tasks[pos].level != expected {
                return Err(Error::invariant(format!(
                    "task {} has level {} but sits at depth {}",
                    tasks[pos].id, tasks[pos].level, expected
                )));
            }
        }
        Ok(())
    }

    fn ensure_acyclic(&self, tasks: &[Task]) -> Result<()> {
        // Every node reachable from a root is cycle-free; anything left over
        // sits on (or below) a cycle.
        let mut seen = vec![false; self.len()];
        let mut stack: Vec<usize> = self.roots.clone();
        while let Some(pos) = stack.pop() {
            seen[pos] = true;
            stack.extend(self.children[pos].iter().copied());
        }
        match seen.iter().position(|visited| !visited) {
            None => Ok(()),
            Some(pos) => Err(Error::invariant(format!(
                "cycle detected in parent links at task {}",
                tasks[pos].id
            ))),
        }
    }
}

/// Build a canonical tree and require levels to match depth.
pub fn well_formed(tasks: &[Task]) -> Result<TaskTree> {
    let tree = TaskTree::canonical(tasks)?;
    tree.ensure_levels(tasks)?;
    Ok(tree)
}
