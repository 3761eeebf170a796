//! wbsplan - hierarchical project schedule engine
//!
//! A project is a flat list of tasks whose `parent_id` links form a forest.
//! Structural edits (indent, outdent, delete, reorder) and field edits are
//! followed by a fixed-order recalculation pipeline that keeps the derived
//! fields consistent.
//!
//! # Module Organization
//!
//! - `task`, `project`: records and request types
//! - `tree`: forest view over a task list, well-formedness checks
//! - `rollup`: summary dates and estimates from leaves
//! - `wbs`: dotted outline codes and the summary flag
//! - `order`: dense depth-first order indices
//! - `status`: summary status inference
//! - `pipeline`: fixed-order stage runner and change detection
//! - `hierarchy`: indent, outdent, delete with promotion, reorder
//! - `store`: persistence traits and the in-memory store
//! - `storage`: JSON-document store on disk
//! - `lock`: file locks, atomic writes, per-project locks
//! - `scheduler`: the operation surface tying it all together
//! - `config`: `.wbs.toml` loading
//! - `cli`, `output`: the `wbs` command line

pub mod cli;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod lock;
pub mod order;
pub mod output;
pub mod pipeline;
pub mod project;
pub mod rollup;
pub mod scheduler;
pub mod status;
pub mod storage;
pub mod store;
pub mod task;
pub mod tree;
pub mod wbs;

pub use error::{Error, Result};
pub use scheduler::{Outcome, Scheduler};
