//! taskdb history command implementation
//!
//! Renders the undo journal, newest entry last.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::GlobalOptions;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::task::Task;
use crate::undo::UndoEntry;

#[derive(Serialize)]
struct HistoryEntry {
    time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    at: Option<DateTime<Utc>>,
    action: &'static str,
    uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    old: Option<Task>,
    new: Task,
}

impl From<UndoEntry> for HistoryEntry {
    fn from(entry: UndoEntry) -> Self {
        Self {
            time: entry.time,
            at: DateTime::from_timestamp(entry.time, 0),
            action: if entry.old.is_some() { "modify" } else { "add" },
            uuid: entry.new.uuid().to_string(),
            old: entry.old,
            new: entry.new,
        }
    }
}

#[derive(Serialize)]
struct HistoryReport {
    total: usize,
    entries: Vec<HistoryEntry>,
}

pub fn run(globals: &GlobalOptions, limit: Option<usize>) -> Result<()> {
    let mut db = globals.open_db()?;
    let journal = db.undo_history()?;
    let total = journal.len();
    let skip = limit.map_or(0, |limit| total.saturating_sub(limit));
    let entries: Vec<HistoryEntry> = journal.into_iter().skip(skip).map(Into::into).collect();

    let mut human = HumanOutput::new("Undo history");
    human.push_summary("entries", total.to_string());
    for entry in &entries {
        human.push_detail(describe(entry));
    }

    let report = HistoryReport { total, entries };
    emit_success(globals.output, "history", &report, Some(&human))
}

fn describe(entry: &HistoryEntry) -> String {
    let when = entry
        .at
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| entry.time.to_string());
    let description = entry.new.get("description").unwrap_or_default();
    let mut line = format!("{when} {:<6} {} {description}", entry.action, entry.uuid);

    if let Some(old) = &entry.old {
        let changed: Vec<&str> = entry
            .new
            .attributes()
            .filter(|(name, value)| old.get(name) != Some(*value))
            .map(|(name, _)| name)
            .chain(old.attributes().map(|(name, _)| name).filter(|name| !entry.new.has(name)))
            .collect();
        if !changed.is_empty() {
            line.push_str(&format!(" ({})", changed.join(", ")));
        }
    }
    line
}
