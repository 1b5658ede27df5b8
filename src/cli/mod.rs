//! Command-line interface for taskdb
//!
//! This module defines the CLI structure using clap derive macros.
//! Commands live in submodules grouped by what they touch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::db::TaskDb;
use crate::error::{Error, Result};
use crate::output::OutputOptions;
use crate::task::{is_valid_attribute_name, Task};

mod history;
mod stats;
mod task;

/// taskdb - plain-text task storage
///
/// Reads and writes the pending, completed, undo, backlog and synch files
/// of a task data directory.
#[derive(Parser, Debug)]
#[command(name = "taskdb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (overrides `data_location` from the config)
    #[arg(long, global = true, env = "TASKDB_DATA")]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to .taskdb.toml in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task description
        #[arg(required = true)]
        description: Vec<String>,

        /// Initial status: pending, waiting, recurring, completed, deleted
        #[arg(long)]
        status: Option<String>,

        /// Uuid of the parent task
        #[arg(long)]
        parent: Option<String>,

        /// Extra attribute as name=value (repeatable)
        #[arg(long = "attr", value_name = "NAME=VALUE")]
        attrs: Vec<String>,
    },

    /// Change an existing task
    Modify {
        /// Numeric id or uuid
        target: String,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New status
        #[arg(long)]
        status: Option<String>,

        /// Attribute to set as name=value (repeatable)
        #[arg(long = "attr", value_name = "NAME=VALUE")]
        attrs: Vec<String>,

        /// Attribute to remove (repeatable)
        #[arg(long = "unset", value_name = "NAME")]
        unset: Vec<String>,
    },

    /// List live tasks
    List {
        /// Include completed and deleted tasks
        #[arg(long)]
        all: bool,
    },

    /// Show every attribute of a task
    Show {
        /// Numeric id or uuid
        target: String,
    },

    /// List live tasks sharing a task's parent
    Siblings {
        /// Numeric id or uuid
        target: String,
    },

    /// Show the undo journal
    History {
        /// Only the most recent entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show per-file statistics
    Stats,

    /// Run the synchronization hook and commit
    Synch,
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub(crate) struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: OutputOptions,
}

impl GlobalOptions {
    pub(crate) fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load(path),
            None => {
                let cwd = std::env::current_dir()?;
                Config::load_from_dir(&cwd)
            }
        }
    }

    /// Open the data directory from the flags or the config
    pub(crate) fn open_db(&self) -> Result<TaskDb> {
        let config = self.load_config()?;
        match &self.data_dir {
            Some(dir) => TaskDb::open(dir, &config),
            None => TaskDb::from_config(&config).map_err(|err| match err {
                Error::InvalidConfig(_) => Error::InvalidConfig(
                    "no data directory; pass --data-dir or set data_location".to_string(),
                ),
                other => other,
            }),
        }
    }
}

/// Find a task by numeric id or uuid
pub(crate) fn resolve_task(db: &mut TaskDb, target: &str) -> Result<Task> {
    let found = match target.parse::<u64>() {
        Ok(id) => db.get_by_id(id)?,
        Err(_) => db.get_by_uuid(target)?,
    };
    found.ok_or_else(|| Error::TaskNotFound(target.to_string()))
}

/// Split `name=value` and check the name
pub(crate) fn parse_attr(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw.split_once('=').ok_or_else(|| {
        Error::InvalidArgument(format!("attribute '{raw}' must be NAME=VALUE"))
    })?;
    if !is_valid_attribute_name(name) {
        return Err(Error::InvalidArgument(format!(
            "invalid attribute name '{name}'"
        )));
    }
    Ok((name.to_string(), value.to_string()))
}

impl Cli {
    /// Config the command will run with
    pub fn load_config(&self) -> Result<Config> {
        self.globals().load_config()
    }

    fn globals(&self) -> GlobalOptions {
        GlobalOptions {
            data_dir: self.data_dir.clone(),
            config: self.config.clone(),
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = self.globals();
        match self.command {
            Commands::Add {
                description,
                status,
                parent,
                attrs,
            } => task::run_add(
                &globals,
                task::AddOptions {
                    description,
                    status,
                    parent,
                    attrs,
                },
            ),
            Commands::Modify {
                target,
                description,
                status,
                attrs,
                unset,
            } => task::run_modify(
                &globals,
                task::ModifyOptions {
                    target,
                    description,
                    status,
                    attrs,
                    unset,
                },
            ),
            Commands::List { all } => task::run_list(&globals, all),
            Commands::Show { target } => task::run_show(&globals, &target),
            Commands::Siblings { target } => task::run_siblings(&globals, &target),
            Commands::History { limit } => history::run(&globals, limit),
            Commands::Stats => stats::run_stats(&globals),
            Commands::Synch => stats::run_synch(&globals),
        }
    }
}
