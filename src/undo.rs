//! Undo journal entries.
//!
//! Every add or modify appends one group of lines to `undo.data`:
//!
//! ```text
//! time 1700000000          time 1700000000
//! new [...]                old [...]
//! ---                      new [...]
//!                          ---
//! ```
//!
//! The left group records an add, the right one a modification.

use chrono::Utc;

use crate::error::{Error, Result};
use crate::task::Task;

pub const TIME_PREFIX: &str = "time ";
pub const OLD_PREFIX: &str = "old ";
pub const NEW_PREFIX: &str = "new ";
pub const SEPARATOR: &str = "---";

/// One add (`old` is `None`) or modify recorded in the journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    /// Epoch seconds at which the change was made
    pub time: i64,
    pub old: Option<Task>,
    pub new: Task,
}

impl UndoEntry {
    pub fn added(task: &Task) -> Self {
        Self {
            time: Utc::now().timestamp(),
            old: None,
            new: task.clone(),
        }
    }

    pub fn modified(original: &Task, task: &Task) -> Self {
        Self {
            time: Utc::now().timestamp(),
            old: Some(original.clone()),
            new: task.clone(),
        }
    }

    /// Journal lines for this entry, without newlines
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(4);
        lines.push(format!("{TIME_PREFIX}{}", self.time));
        if let Some(old) = &self.old {
            lines.push(format!("{OLD_PREFIX}{}", old.compose()));
        }
        lines.push(format!("{NEW_PREFIX}{}", self.new.compose()));
        lines.push(SEPARATOR.to_string());
        lines
    }
}

/// Read journal lines back into entries, oldest first
///
/// Blank lines are ignored. A trailing group without its `---` separator is
/// an interrupted write and is dropped. `source` labels parse errors.
pub fn parse_journal<S: AsRef<str>>(
    lines: &[S],
    source: &std::path::Path,
) -> Result<Vec<UndoEntry>> {
    let mut entries = Vec::new();
    let mut group: Vec<(usize, &str)> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        if line == SEPARATOR {
            entries.push(parse_group(&group, source)?);
            group.clear();
        } else {
            group.push((index + 1, line));
        }
    }

    Ok(entries)
}

fn parse_group(group: &[(usize, &str)], source: &std::path::Path) -> Result<UndoEntry> {
    let fail = |line: usize, reason: String| Error::Parse {
        path: source.to_path_buf(),
        line,
        reason,
    };

    let (first, rest) = group
        .split_first()
        .ok_or_else(|| fail(0, "empty undo group".to_string()))?;
    let time = first
        .1
        .strip_prefix(TIME_PREFIX)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| fail(first.0, "undo group must start with 'time <epoch>'".to_string()))?;

    let task_from = |(line, text): (usize, &str), prefix: &str| -> Result<Task> {
        let record = text
            .strip_prefix(prefix)
            .ok_or_else(|| fail(line, format!("expected '{}' line", prefix.trim_end())))?;
        Task::parse(record).map_err(|err| fail(line, err.to_string()))
    };

    match rest {
        [new] => Ok(UndoEntry {
            time,
            old: None,
            new: task_from(*new, NEW_PREFIX)?,
        }),
        [old, new] => Ok(UndoEntry {
            time,
            old: Some(task_from(*old, OLD_PREFIX)?),
            new: task_from(*new, NEW_PREFIX)?,
        }),
        _ => Err(fail(first.0, format!("undo group has {} lines", group.len()))),
    }
}
