//! A single data file and its in-memory views.
//!
//! A [`TaskFile`] loads lazily through three stages, each built on the one
//! before it:
//!
//! ```text
//! Empty -> Contents (raw text) -> Lines (split on '\n') -> Tasks (parsed)
//! ```
//!
//! Stages only move forward and are never reloaded, so a `TaskFile` must not
//! be reused across external changes to its file.
//!
//! Mutations are buffered until [`TaskFile::commit`]. A commit that only adds
//! appends to the file; anything that changes or drops an existing record
//! rewrites the file from the in-memory task list.
//!
//! The task list always reflects the cumulative in-memory state. The raw
//! contents and line list only reflect what was read from disk (plus lines
//! added through [`TaskFile::add_line`]); they are not updated when tasks are
//! added or modified.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::db::IdSequence;
use crate::error::{Error, Result};
use crate::lock::{self, LockPolicy, LockedFile};
use crate::task::Task;

/// Width of the file label in [`TaskFile::dump`]
const DUMP_LABEL_WIDTH: usize = 14;

/// How far a [`TaskFile`] has been loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadState {
    Empty,
    Contents,
    Lines,
    Tasks,
}

/// What a call to [`TaskFile::commit`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// Nothing was dirty; the file was not touched
    Clean,
    /// New records and lines were appended to the existing content
    Appended,
    /// The file was truncated and rewritten from the task list
    Rewritten,
}

#[derive(Debug)]
pub struct TaskFile {
    path: PathBuf,
    lock: LockPolicy,
    read_only: bool,
    dirty: bool,
    state: LoadState,

    contents: String,
    lines: Vec<String>,
    tasks: Vec<Task>,

    added_tasks: Vec<Task>,
    added_lines: Vec<String>,
    modified_tasks: Vec<Task>,
    removed_uuids: Vec<String>,
    lines_cleared: bool,

    id_to_uuid: HashMap<u64, String>,
    uuid_to_id: HashMap<String, u64>,
}

impl TaskFile {
    /// Target a file. Nothing is read until a view is requested.
    pub fn new(path: impl Into<PathBuf>, lock: LockPolicy) -> Self {
        let path = path.into();
        let read_only = !lock::is_writable(&path);
        Self {
            path,
            lock,
            read_only,
            dirty: false,
            state: LoadState::Empty,
            contents: String::new(),
            lines: Vec::new(),
            tasks: Vec::new(),
            added_tasks: Vec::new(),
            added_lines: Vec::new(),
            modified_tasks: Vec::new(),
            removed_uuids: Vec::new(),
            lines_cleared: false,
            id_to_uuid: HashMap::new(),
            uuid_to_id: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    // =========================================================================
    // Lazy views
    // =========================================================================

    /// Raw file contents as read from disk
    pub fn get_contents(&mut self) -> Result<&str> {
        self.ensure_contents()?;
        Ok(&self.contents)
    }

    /// File contents split into lines
    pub fn get_lines(&mut self) -> Result<&[String]> {
        self.ensure_lines()?;
        Ok(&self.lines)
    }

    /// Parsed tasks, including any added or modified in memory
    ///
    /// The first call numbers every live task from `ids`.
    pub fn get_tasks(&mut self, ids: &mut IdSequence) -> Result<&[Task]> {
        self.ensure_tasks(ids)?;
        Ok(&self.tasks)
    }

    fn ensure_contents(&mut self) -> Result<()> {
        if self.state >= LoadState::Contents {
            return Ok(());
        }

        let contents = match LockedFile::open_read(&self.path, self.lock)? {
            Some(mut file) => file.read_all()?,
            None => String::new(),
        };
        debug!(path = %self.path.display(), bytes = contents.len(), "loaded contents");

        self.contents = contents;
        self.state = LoadState::Contents;
        Ok(())
    }

    fn ensure_lines(&mut self) -> Result<()> {
        if self.state >= LoadState::Lines {
            return Ok(());
        }
        self.ensure_contents()?;

        // Lines added before the load stay after the ones read from disk.
        let added = std::mem::take(&mut self.lines);
        self.lines = split_lines(&self.contents);
        self.lines.extend(added);
        self.state = LoadState::Lines;
        Ok(())
    }

    fn ensure_tasks(&mut self, ids: &mut IdSequence) -> Result<()> {
        if self.state >= LoadState::Tasks {
            return Ok(());
        }
        self.ensure_lines()?;

        let mut loaded = Vec::with_capacity(self.lines.len());
        let mut id_to_uuid = HashMap::new();
        let mut uuid_to_id = HashMap::new();

        for (index, line) in self.lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut task = Task::parse(line).map_err(|err| Error::Parse {
                path: self.path.clone(),
                line: index + 1,
                reason: match err {
                    Error::InvalidTask(reason) => reason,
                    other => other.to_string(),
                },
            })?;

            if task.is_live() {
                task.id = ids.next_id();
                id_to_uuid.insert(task.id, task.uuid().to_string());
                uuid_to_id.insert(task.uuid().to_string(), task.id);
            }
            loaded.push(task);
        }
        debug!(path = %self.path.display(), tasks = loaded.len(), "loaded tasks");

        // Tasks added before the load stay after the ones read from disk.
        let added = std::mem::take(&mut self.tasks);
        self.tasks = loaded;
        self.tasks.extend(added);
        self.id_to_uuid.extend(id_to_uuid);
        self.uuid_to_id.extend(uuid_to_id);
        self.state = LoadState::Tasks;
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Queue a new task for the next commit
    ///
    /// Does not load the file and does not assign a numeric id; ids are only
    /// handed out when tasks are loaded, so any id the task carries is cleared.
    pub fn add_task(&mut self, mut task: Task) {
        task.id = 0;
        self.tasks.push(task.clone());
        self.added_tasks.push(task);
        self.dirty = true;
    }

    /// Replace the task with the same uuid
    ///
    /// The modification is queued (and forces a rewrite) even when no task
    /// matched. Returns whether a task was replaced.
    pub fn modify_task(&mut self, mut task: Task, ids: &mut IdSequence) -> Result<bool> {
        self.ensure_tasks(ids)?;

        let position = self
            .tasks
            .iter()
            .position(|existing| existing.uuid() == task.uuid());
        if let Some(position) = position {
            let previous_id = self.tasks[position].id;
            if task.is_live() {
                task.id = previous_id;
            } else {
                self.unmap(previous_id, task.uuid());
                task.id = 0;
            }
            self.tasks[position] = task.clone();
        }

        self.modified_tasks.push(task);
        self.dirty = true;
        Ok(position.is_some())
    }

    /// Drop the task with this uuid from the file
    pub fn remove_task(&mut self, uuid: &str, ids: &mut IdSequence) -> Result<Option<Task>> {
        self.ensure_tasks(ids)?;

        let Some(position) = self.tasks.iter().position(|task| task.uuid() == uuid) else {
            return Ok(None);
        };
        let removed = self.tasks.remove(position);
        self.unmap(removed.id, uuid);
        self.removed_uuids.push(uuid.to_string());
        self.dirty = true;
        Ok(Some(removed))
    }

    /// Queue a raw line for the next commit
    pub fn add_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.lines.push(line.clone());
        self.added_lines.push(line);
        self.dirty = true;
    }

    /// Forget every line so the next commit overwrites the file instead of
    /// growing it
    pub fn clear_lines(&mut self) -> Result<()> {
        self.ensure_lines()?;
        self.lines.clear();
        self.lines_cleared = true;
        self.dirty = true;
        Ok(())
    }

    fn unmap(&mut self, id: u64, uuid: &str) {
        if id != 0 {
            self.id_to_uuid.remove(&id);
        }
        self.uuid_to_id.remove(uuid);
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Uuid of the live task numbered `id`
    pub fn uuid_of(&mut self, id: u64, ids: &mut IdSequence) -> Result<Option<String>> {
        self.ensure_tasks(ids)?;
        Ok(self.id_to_uuid.get(&id).cloned())
    }

    /// Numeric id of the live task with this uuid
    pub fn id_of(&mut self, uuid: &str, ids: &mut IdSequence) -> Result<Option<u64>> {
        self.ensure_tasks(ids)?;
        Ok(self.uuid_to_id.get(uuid).copied())
    }

    /// Whether any task in memory (loaded or added, any status) has this uuid
    pub fn contains_uuid(&mut self, uuid: &str, ids: &mut IdSequence) -> Result<bool> {
        self.ensure_tasks(ids)?;
        Ok(self.tasks.iter().any(|task| task.uuid() == uuid))
    }

    pub fn find_by_uuid(&mut self, uuid: &str, ids: &mut IdSequence) -> Result<Option<&Task>> {
        self.ensure_tasks(ids)?;
        Ok(self.tasks.iter().find(|task| task.uuid() == uuid))
    }

    pub fn find_by_id(&mut self, id: u64, ids: &mut IdSequence) -> Result<Option<&Task>> {
        self.ensure_tasks(ids)?;
        if id == 0 {
            return Ok(None);
        }
        Ok(self.tasks.iter().find(|task| task.id == id))
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Write buffered changes to disk
    ///
    /// On failure the buffers and dirty flag are kept so the commit can be
    /// retried. A failed append is cut back to the file's previous length
    /// first, so a retry does not write the same records twice.
    pub fn commit(&mut self) -> Result<CommitKind> {
        if !self.dirty {
            return Ok(CommitKind::Clean);
        }
        if self.read_only {
            return Err(Error::ReadOnly(self.path.clone()));
        }

        let append_only = self.modified_tasks.is_empty()
            && self.removed_uuids.is_empty()
            && !self.lines_cleared
            && (!self.added_tasks.is_empty() || !self.added_lines.is_empty());

        let kind = if append_only {
            self.append_buffered()?;
            CommitKind::Appended
        } else {
            self.rewrite()?;
            CommitKind::Rewritten
        };
        debug!(
            path = %self.path.display(),
            ?kind,
            added = self.added_tasks.len(),
            modified = self.modified_tasks.len(),
            lines = self.added_lines.len(),
            "committed"
        );

        self.added_tasks.clear();
        self.added_lines.clear();
        self.modified_tasks.clear();
        self.removed_uuids.clear();
        self.lines_cleared = false;
        self.dirty = false;

        // Nothing was cached from disk, so what was just written will be
        // read back by the first load.
        if self.state == LoadState::Empty {
            self.tasks.clear();
            self.lines.clear();
        }

        Ok(kind)
    }

    fn append_buffered(&self) -> Result<()> {
        let mut file = LockedFile::open_append(&self.path, self.lock)?;
        let original_len = file.byte_len()?;

        let written = self
            .added_tasks
            .iter()
            .map(Task::compose)
            .chain(self.added_lines.iter().cloned())
            .try_for_each(|line| file.append_line(&line))
            .and_then(|()| file.sync());

        if let Err(err) = written {
            if let Err(rollback) = file.truncate_to(original_len) {
                warn!(path = %self.path.display(), error = %rollback, "append rollback failed");
            }
            return Err(err);
        }
        Ok(())
    }

    fn rewrite(&self) -> Result<()> {
        let mut file = LockedFile::open_rewrite(&self.path, self.lock)?;
        file.truncate()?;
        // Modifications were applied in place, so the task list is complete.
        for task in &self.tasks {
            file.append_line(&task.compose())?;
        }
        for line in &self.added_lines {
            file.append_line(line)?;
        }
        file.sync()
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// One-line summary of the file and its caches
    ///
    /// ```text
    /// <label> <rw> <dirty> T<tasks>+<added>~<modified> L<lines>+<added> C<bytes>
    /// ```
    pub fn dump(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let skip = name.chars().count().saturating_sub(DUMP_LABEL_WIDTH);
        let label: String = name.chars().skip(skip).collect();

        let mode = format!(
            "{}{}",
            if lock::is_readable(&self.path) { 'r' } else { '-' },
            if lock::is_writable(&self.path) { 'w' } else { '-' },
        );
        let hygiene = if self.dirty { 'O' } else { '-' };

        format!(
            "{label:>width$} {mode} {hygiene} T{:04}+{:03}~{:03} L{:04}+{:03} C{:06}",
            self.tasks.len(),
            self.added_tasks.len(),
            self.modified_tasks.len() + self.removed_uuids.len(),
            self.lines.len(),
            self.added_lines.len(),
            self.contents.len(),
            width = DUMP_LABEL_WIDTH,
        )
    }
}

/// Split on `\n` without trimming or merging; a final terminator does not
/// produce an extra empty line.
fn split_lines(contents: &str) -> Vec<String> {
    if contents.is_empty() {
        return Vec::new();
    }
    contents
        .strip_suffix('\n')
        .unwrap_or(contents)
        .split('\n')
        .map(str::to_string)
        .collect()
}
