//! taskdb - plain-text task storage
//!
//! Task records live in five line-oriented files under one data directory.
//! This library loads them lazily, buffers changes in memory and writes them
//! back on commit, appending when it can and rewriting when it must.
//!
//! # Core Concepts
//!
//! - **Task file**: one data file with lazily loaded contents, lines and tasks
//! - **Task database**: the five files, routed by task status
//! - **Numeric ids**: short per-process handles for live tasks, assigned on load
//! - **Undo journal**: before/after records of every add and modify
//! - **Backlog**: every changed task, kept for synchronization
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.taskdb.toml`
//! - `db`: The five-file task database
//! - `error`: Error types and result aliases
//! - `hooks`: Garbage-collection and synchronization hooks
//! - `lock`: Advisory file locking for reads and commits
//! - `output`: Human and JSON output for the CLI
//! - `store`: A single lazily loaded data file
//! - `task`: Task records and their one-line form
//! - `undo`: Undo journal entries

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod lock;
pub mod output;
pub mod store;
pub mod task;
pub mod undo;

pub use db::TaskDb;
pub use error::{Error, Result};
pub use task::{Status, Task};
