//! taskdb stats and synch commands

use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::db::StoreRole;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct StatsReport {
    location: String,
    pending: usize,
    live: usize,
    completed: usize,
    undo_entries: usize,
    backlog_lines: usize,
    files: Vec<FileStats>,
}

#[derive(Serialize)]
struct FileStats {
    name: &'static str,
    read_only: bool,
    dump: String,
}

pub fn run_stats(globals: &GlobalOptions) -> Result<()> {
    let mut db = globals.open_db()?;

    let pending = db.pending_tasks()?;
    let live = pending.iter().filter(|task| task.is_live()).count();
    let pending = pending.len();
    let completed = db.completed_tasks()?.len();
    let undo_entries = db.undo_history()?.len();
    let backlog_lines = db
        .store_mut(StoreRole::Backlog)
        .get_lines()?
        .iter()
        .filter(|line| !line.trim().is_empty())
        .count();

    let files = StoreRole::ALL
        .iter()
        .map(|role| FileStats {
            name: role.file_name(),
            read_only: db.store(*role).is_read_only(),
            dump: db.store(*role).dump(),
        })
        .collect::<Vec<_>>();

    let mut human = HumanOutput::new(format!("taskdb stats ({})", db.location().display()));
    human.push_summary("pending", pending.to_string());
    human.push_summary("live", live.to_string());
    human.push_summary("completed", completed.to_string());
    human.push_summary("undo entries", undo_entries.to_string());
    human.push_summary("backlog", backlog_lines.to_string());
    for file in &files {
        human.push_detail(file.dump.clone());
    }

    let report = StatsReport {
        location: db.location().display().to_string(),
        pending,
        live,
        completed,
        undo_entries,
        backlog_lines,
        files,
    };
    emit_success(globals.output, "stats", &report, Some(&human))
}

#[derive(Serialize)]
struct SynchReport {
    location: String,
}

pub fn run_synch(globals: &GlobalOptions) -> Result<()> {
    let mut db = globals.open_db()?;
    db.synch()?;
    db.commit()?;

    let report = SynchReport {
        location: db.location().display().to_string(),
    };
    let human = HumanOutput::new("Synchronized");
    emit_success(globals.output, "synch", &report, Some(&human))
}
