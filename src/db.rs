//! The task database: five data files under one directory.
//!
//! | File             | Holds                                       |
//! |------------------|---------------------------------------------|
//! | `pending.data`   | live tasks (pending, waiting, recurring)    |
//! | `completed.data` | completed and deleted tasks                 |
//! | `undo.data`      | journal of every add and modify             |
//! | `backlog.data`   | every added or modified task, for syncing   |
//! | `synch.key`      | marker written by synchronization           |
//!
//! [`TaskDb`] routes tasks to the right file by status, keeps the undo
//! journal and backlog in step with every change, and hands out numeric ids.
//! Nothing is read until a lookup needs it and nothing is written until
//! [`TaskDb::commit`].

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::hooks::{GcHook, InertGc, InertSync, Stores, SyncHook};
use crate::store::TaskFile;
use crate::task::{Status, Task};
use crate::undo::{self, UndoEntry};

pub const PENDING_FILE: &str = "pending.data";
pub const COMPLETED_FILE: &str = "completed.data";
pub const UNDO_FILE: &str = "undo.data";
pub const BACKLOG_FILE: &str = "backlog.data";
pub const SYNCH_KEY_FILE: &str = "synch.key";

/// Source of per-process numeric task ids
///
/// Ids start at 1 and are never reused within a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Hand out the next id
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// The id the next call to [`IdSequence::next_id`] will return
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Which of the five data files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    Pending,
    Completed,
    Undo,
    Backlog,
    SynchKey,
}

impl StoreRole {
    /// Commit order
    pub const ALL: [StoreRole; 5] = [
        StoreRole::Pending,
        StoreRole::Completed,
        StoreRole::Undo,
        StoreRole::Backlog,
        StoreRole::SynchKey,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            StoreRole::Pending => PENDING_FILE,
            StoreRole::Completed => COMPLETED_FILE,
            StoreRole::Undo => UNDO_FILE,
            StoreRole::Backlog => BACKLOG_FILE,
            StoreRole::SynchKey => SYNCH_KEY_FILE,
        }
    }

    /// The task store a task with this status belongs in
    pub fn for_status(status: Status) -> Self {
        if status.is_live() {
            StoreRole::Pending
        } else {
            StoreRole::Completed
        }
    }
}

#[derive(Debug)]
pub struct TaskDb {
    location: PathBuf,
    gc_enabled: bool,
    debug: bool,
    ids: IdSequence,

    pending: TaskFile,
    completed: TaskFile,
    undo: TaskFile,
    backlog: TaskFile,
    synch_key: TaskFile,

    gc_hook: Box<dyn GcHook>,
    sync_hook: Box<dyn SyncHook>,
}

impl TaskDb {
    /// Target the data files under `location`, creating the directory if needed
    pub fn open(location: impl Into<PathBuf>, config: &Config) -> Result<Self> {
        let location = location.into();
        std::fs::create_dir_all(&location).map_err(|source| Error::Unavailable {
            path: location.clone(),
            source,
        })?;

        let policy = config.lock_policy();
        let file = |role: StoreRole| TaskFile::new(location.join(role.file_name()), policy);
        let db = Self {
            pending: file(StoreRole::Pending),
            completed: file(StoreRole::Completed),
            undo: file(StoreRole::Undo),
            backlog: file(StoreRole::Backlog),
            synch_key: file(StoreRole::SynchKey),
            gc_enabled: config.gc,
            debug: config.debug,
            ids: IdSequence::new(),
            gc_hook: Box::new(InertGc),
            sync_hook: Box::new(InertSync),
            location,
        };
        debug!(location = %db.location.display(), "opened task database");
        Ok(db)
    }

    /// Open the directory named by `data_location` in the config
    pub fn from_config(config: &Config) -> Result<Self> {
        let location = config.data_location.clone().ok_or_else(|| {
            Error::InvalidConfig("data_location is not set".to_string())
        })?;
        Self::open(location, config)
    }

    pub fn with_gc_hook(mut self, hook: impl GcHook + 'static) -> Self {
        self.gc_hook = Box::new(hook);
        self
    }

    pub fn with_sync_hook(mut self, hook: impl SyncHook + 'static) -> Self {
        self.sync_hook = Box::new(hook);
        self
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn store(&self, role: StoreRole) -> &TaskFile {
        match role {
            StoreRole::Pending => &self.pending,
            StoreRole::Completed => &self.completed,
            StoreRole::Undo => &self.undo,
            StoreRole::Backlog => &self.backlog,
            StoreRole::SynchKey => &self.synch_key,
        }
    }

    pub fn store_mut(&mut self, role: StoreRole) -> &mut TaskFile {
        self.store_and_ids(role).0
    }

    fn store_and_ids(&mut self, role: StoreRole) -> (&mut TaskFile, &mut IdSequence) {
        let store = match role {
            StoreRole::Pending => &mut self.pending,
            StoreRole::Completed => &mut self.completed,
            StoreRole::Undo => &mut self.undo,
            StoreRole::Backlog => &mut self.backlog,
            StoreRole::SynchKey => &mut self.synch_key,
        };
        (store, &mut self.ids)
    }

    pub fn next_id(&mut self) -> u64 {
        self.ids.next_id()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Record a new task
    ///
    /// Fails without touching anything when a task with the same uuid exists.
    pub fn add(&mut self, task: Task) -> Result<()> {
        let uuid = task.uuid().to_string();
        if uuid.is_empty() {
            return Err(Error::InvalidTask("missing uuid".to_string()));
        }
        if !self.verify_unique_uuid(&uuid)? {
            return Err(Error::DuplicateUuid(uuid));
        }

        let role = StoreRole::for_status(task.status());
        self.store_mut(role).add_task(task.clone());
        self.journal(&UndoEntry::added(&task));
        self.backlog.add_task(task);
        debug!(%uuid, store = role.file_name(), "added task");
        Ok(())
    }

    /// Replace an existing task, matched by uuid
    ///
    /// A status change that crosses between the pending and completed files
    /// moves the task. The journal records both the old and new record.
    pub fn modify(&mut self, task: Task) -> Result<()> {
        let uuid = task.uuid().to_string();
        let (origin, original) = self
            .locate(&uuid)?
            .ok_or_else(|| Error::TaskNotFound(uuid.clone()))?;

        let destination = StoreRole::for_status(task.status());
        if origin == destination {
            let (store, ids) = self.store_and_ids(destination);
            store.modify_task(task.clone(), ids)?;
        } else {
            let (store, ids) = self.store_and_ids(origin);
            store.remove_task(&uuid, ids)?;
            // Ids are only handed out on load; add_task clears this one.
            self.store_mut(destination).add_task(task.clone());
        }

        self.journal(&UndoEntry::modified(&original, &task));
        self.backlog.add_task(task);
        debug!(
            %uuid,
            from = origin.file_name(),
            to = destination.file_name(),
            "modified task"
        );
        Ok(())
    }

    fn journal(&mut self, entry: &UndoEntry) {
        for line in entry.to_lines() {
            self.undo.add_line(line);
        }
    }

    /// Which task store holds `uuid`, and its current record
    fn locate(&mut self, uuid: &str) -> Result<Option<(StoreRole, Task)>> {
        for role in [StoreRole::Pending, StoreRole::Completed] {
            let (store, ids) = self.store_and_ids(role);
            if let Some(task) = store.find_by_uuid(uuid, ids)? {
                return Ok(Some((role, task.clone())));
            }
        }
        Ok(None)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Tasks in the pending file, loading it on first use
    pub fn pending_tasks(&mut self) -> Result<&[Task]> {
        self.pending.get_tasks(&mut self.ids)
    }

    /// Tasks in the completed file, loading it on first use
    pub fn completed_tasks(&mut self) -> Result<&[Task]> {
        self.completed.get_tasks(&mut self.ids)
    }

    /// The live task numbered `id`
    pub fn get_by_id(&mut self, id: u64) -> Result<Option<Task>> {
        if let Some(task) = self.pending.find_by_id(id, &mut self.ids)? {
            return Ok(Some(task.clone()));
        }
        Ok(self.completed.find_by_id(id, &mut self.ids)?.cloned())
    }

    pub fn get_by_uuid(&mut self, uuid: &str) -> Result<Option<Task>> {
        Ok(self.locate(uuid)?.map(|(_, task)| task))
    }

    /// Live pending tasks that share `task`'s parent, excluding `task`
    pub fn siblings(&mut self, task: &Task) -> Result<Vec<Task>> {
        let Some(parent) = task.get("parent") else {
            return Ok(Vec::new());
        };

        let tasks = self.pending.get_tasks(&mut self.ids)?;
        Ok(tasks
            .iter()
            .filter(|candidate| {
                candidate.uuid() != task.uuid()
                    && candidate.is_live()
                    && candidate.get("parent") == Some(parent)
            })
            .cloned()
            .collect())
    }

    /// Whether no pending or completed task has this uuid
    pub fn verify_unique_uuid(&mut self, uuid: &str) -> Result<bool> {
        if self.pending.contains_uuid(uuid, &mut self.ids)? {
            return Ok(false);
        }
        Ok(!self.completed.contains_uuid(uuid, &mut self.ids)?)
    }

    /// The undo journal, oldest entry first
    pub fn undo_history(&mut self) -> Result<Vec<UndoEntry>> {
        let path = self.undo.path().to_path_buf();
        let lines = self.undo.get_lines()?;
        undo::parse_journal(lines, &path)
    }

    // =========================================================================
    // Commit and maintenance
    // =========================================================================

    /// Write every dirty file, in a fixed order
    ///
    /// A failing file does not stop the others from being written. The first
    /// error is returned once all have been tried.
    pub fn commit(&mut self) -> Result<()> {
        self.emit_dump();

        let mut first_error = None;
        for role in StoreRole::ALL {
            let store = self.store_mut(role);
            if let Err(err) = store.commit() {
                warn!(path = %store.path().display(), error = %err, "commit failed");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Run the garbage-collection hook, when enabled
    pub fn gc(&mut self) -> Result<usize> {
        if !self.gc_enabled {
            debug!("gc disabled");
            return Ok(0);
        }
        let stores = Stores {
            pending: &mut self.pending,
            completed: &mut self.completed,
            undo: &mut self.undo,
            backlog: &mut self.backlog,
            synch_key: &mut self.synch_key,
            ids: &mut self.ids,
        };
        let collected = self.gc_hook.collect(stores)?;
        debug!(collected, "gc finished");
        Ok(collected)
    }

    /// Run the synchronization hook
    pub fn synch(&mut self) -> Result<()> {
        let stores = Stores {
            pending: &mut self.pending,
            completed: &mut self.completed,
            undo: &mut self.undo,
            backlog: &mut self.backlog,
            synch_key: &mut self.synch_key,
            ids: &mut self.ids,
        };
        self.sync_hook.synch(stores)
    }

    /// One [`TaskFile::dump`] line per file, in commit order
    pub fn dump(&self) -> Vec<String> {
        StoreRole::ALL
            .iter()
            .map(|role| self.store(*role).dump())
            .collect()
    }

    fn emit_dump(&self) {
        if !self.debug {
            return;
        }
        for line in self.dump() {
            debug!(target: "taskdb::dump", "{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn open() -> (TempDir, TaskDb) {
        let temp = TempDir::new().unwrap();
        let db = TaskDb::open(temp.path(), &Config::default()).unwrap();
        (temp, db)
    }

    fn reopen(temp: &TempDir) -> TaskDb {
        TaskDb::open(temp.path(), &Config::default()).unwrap()
    }

    fn read(temp: &TempDir, name: &str) -> String {
        fs::read_to_string(temp.path().join(name)).unwrap_or_default()
    }

    #[test]
    fn id_sequence_starts_at_one() {
        let mut ids = IdSequence::new();
        assert_eq!(ids.peek(), 1);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn open_reads_nothing() {
        let (_temp, db) = open();
        for role in StoreRole::ALL {
            assert_eq!(db.store(role).load_state(), crate::store::LoadState::Empty);
            assert!(db.store(role).path().ends_with(role.file_name()));
        }
    }

    #[test]
    fn open_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("nested").join("data");
        let db = TaskDb::open(&location, &Config::default()).unwrap();
        assert!(location.is_dir());
        assert_eq!(db.location(), location);
    }

    #[test]
    fn from_config_requires_location() {
        let err = TaskDb::from_config(&Config::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn add_routes_by_status() {
        let (temp, mut db) = open();
        let live = Task::new("live");
        let mut done = Task::new("done");
        done.set_status(Status::Completed);
        let mut gone = Task::new("gone");
        gone.set_status(Status::Deleted);

        db.add(live.clone()).unwrap();
        db.add(done.clone()).unwrap();
        db.add(gone.clone()).unwrap();
        db.commit().unwrap();

        let pending = read(&temp, PENDING_FILE);
        let completed = read(&temp, COMPLETED_FILE);
        assert_eq!(pending, format!("{}\n", live.compose()));
        assert_eq!(completed, format!("{}\n{}\n", done.compose(), gone.compose()));
        assert_eq!(read(&temp, BACKLOG_FILE).lines().count(), 3);
        assert_eq!(read(&temp, UNDO_FILE).lines().count(), 9);
    }

    #[test]
    fn add_writes_three_line_undo_group() {
        let (temp, mut db) = open();
        let task = Task::new("journal me");
        db.add(task.clone()).unwrap();
        db.commit().unwrap();

        let undo = read(&temp, UNDO_FILE);
        let lines: Vec<&str> = undo.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("time "));
        assert_eq!(lines[1], format!("new {}", task.compose()));
        assert_eq!(lines[2], "---");
    }

    #[test]
    fn duplicate_uuid_changes_nothing() {
        let (temp, mut db) = open();
        let task = Task::new("original");
        db.add(task.clone()).unwrap();
        db.commit().unwrap();
        let before: Vec<String> = StoreRole::ALL
            .iter()
            .map(|role| read(&temp, role.file_name()))
            .collect();

        let mut db = reopen(&temp);
        let mut clash = Task::new("clash");
        clash.set("uuid", task.uuid());
        let err = db.add(clash).unwrap_err();
        assert!(matches!(err, Error::DuplicateUuid(ref uuid) if uuid == task.uuid()));

        for role in StoreRole::ALL {
            assert!(!db.store(role).is_dirty(), "{} dirty", role.file_name());
        }
        db.commit().unwrap();
        let after: Vec<String> = StoreRole::ALL
            .iter()
            .map(|role| read(&temp, role.file_name()))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn duplicate_of_uncommitted_task_rejected() {
        let (_temp, mut db) = open();
        let task = Task::new("twice");
        db.add(task.clone()).unwrap();
        assert!(matches!(db.add(task), Err(Error::DuplicateUuid(_))));
    }

    #[test]
    fn duplicate_in_completed_rejected() {
        let (temp, mut db) = open();
        let mut task = Task::new("finished");
        task.set_status(Status::Completed);
        db.add(task.clone()).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        assert!(!db.verify_unique_uuid(task.uuid()).unwrap());
        assert!(db.verify_unique_uuid("something-else").unwrap());
    }

    #[test]
    fn add_then_reload_assigns_ids() {
        let (temp, mut db) = open();
        let task = Task::new("A");
        db.add(task.clone()).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        let loaded = db.get_by_id(1).unwrap().unwrap();
        assert_eq!(loaded.uuid(), task.uuid());
        assert_eq!(db.get_by_uuid(task.uuid()).unwrap().unwrap().id, 1);
    }

    #[test]
    fn added_task_has_no_id_until_reload() {
        let (temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        assert!(db.get_by_id(1).unwrap().is_some());
        let b = Task::new("B");
        db.add(b.clone()).unwrap();
        assert_eq!(db.get_by_uuid(b.uuid()).unwrap().unwrap().id, 0);
        assert!(db.get_by_id(2).unwrap().is_none());
    }

    #[test]
    fn added_copy_does_not_reuse_loaded_id() {
        let (temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        let a = db.get_by_id(1).unwrap().unwrap();
        let mut copy = a.clone();
        copy.set("uuid", "copy-uuid");
        db.add(copy).unwrap();

        assert_eq!(db.get_by_uuid("copy-uuid").unwrap().unwrap().id, 0);
        let numbered = db
            .pending_tasks()
            .unwrap()
            .iter()
            .filter(|task| task.id == 1)
            .count();
        assert_eq!(numbered, 1);
        assert_eq!(db.get_by_id(1).unwrap().unwrap().uuid(), a.uuid());
    }

    #[test]
    fn modify_with_wrong_id_keeps_loaded_id() {
        let (temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        let mut a = db.get_by_id(1).unwrap().unwrap();
        a.id = 7;
        a.set("project", "garden");
        db.modify(a.clone()).unwrap();

        let by_id = db.get_by_id(1).unwrap().unwrap();
        assert_eq!(by_id.uuid(), a.uuid());
        assert_eq!(by_id.get("project"), Some("garden"));
        assert!(db.get_by_id(7).unwrap().is_none());
        assert_eq!(
            db.store_mut(StoreRole::Pending)
                .uuid_of(1, &mut IdSequence::new())
                .unwrap()
                .as_deref(),
            Some(a.uuid())
        );
    }

    #[test]
    fn get_by_id_zero_is_none() {
        let (_temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        assert!(db.get_by_id(0).unwrap().is_none());
    }

    #[test]
    fn modify_in_place_keeps_id_and_journals_old_and_new() {
        let (temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        let original = db.get_by_id(1).unwrap().unwrap();
        let mut changed = original.clone();
        changed.set("priority", "H");
        db.modify(changed.clone()).unwrap();

        assert_eq!(db.get_by_id(1).unwrap().unwrap().get("priority"), Some("H"));
        db.commit().unwrap();

        let history = db.undo_history().unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.old.as_ref().map(Task::compose), Some(original.compose()));
        assert_eq!(last.new.compose(), changed.compose());
        assert_eq!(read(&temp, PENDING_FILE), format!("{}\n", changed.compose()));
    }

    #[test]
    fn modify_unknown_task_changes_nothing() {
        let (_temp, mut db) = open();
        let err = db.modify(Task::new("stranger")).unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(_)));
        for role in StoreRole::ALL {
            assert!(!db.store(role).is_dirty());
        }
    }

    #[test]
    fn completing_moves_task_between_files() {
        let (temp, mut db) = open();
        let task = Task::new("A");
        db.add(task.clone()).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        let mut done = db.get_by_id(1).unwrap().unwrap();
        done.set_status(Status::Completed);
        db.modify(done.clone()).unwrap();
        assert!(db.get_by_id(1).unwrap().is_none());
        db.commit().unwrap();

        assert_eq!(read(&temp, PENDING_FILE), "");
        assert_eq!(read(&temp, COMPLETED_FILE), format!("{}\n", done.compose()));

        let mut db = reopen(&temp);
        let found = db.get_by_uuid(task.uuid()).unwrap().unwrap();
        assert_eq!(found.status(), Status::Completed);
        assert_eq!(found.id, 0);
    }

    #[test]
    fn reopening_moves_task_back_to_pending() {
        let (temp, mut db) = open();
        let mut task = Task::new("A");
        task.set_status(Status::Completed);
        db.add(task.clone()).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        let mut revived = db.get_by_uuid(task.uuid()).unwrap().unwrap();
        revived.set_status(Status::Pending);
        db.modify(revived.clone()).unwrap();
        db.commit().unwrap();

        assert_eq!(read(&temp, COMPLETED_FILE), "");
        let mut db = reopen(&temp);
        assert_eq!(db.get_by_id(1).unwrap().unwrap().uuid(), task.uuid());
    }

    #[test]
    fn backlog_records_every_change() {
        let (temp, mut db) = open();
        let task = Task::new("A");
        db.add(task.clone()).unwrap();
        let mut changed = task.clone();
        changed.set("project", "home");
        db.modify(changed.clone()).unwrap();
        db.commit().unwrap();

        let backlog = read(&temp, BACKLOG_FILE);
        assert_eq!(
            backlog,
            format!("{}\n{}\n", task.compose(), changed.compose())
        );
    }

    #[test]
    fn siblings_share_parent() {
        let (temp, mut db) = open();
        let parent = Task::new("parent");
        let make_child = |name: &str, status: Status| {
            let mut child = Task::new(name);
            child.set("parent", parent.uuid());
            child.set_status(status);
            child
        };
        let first = make_child("first", Status::Pending);
        let second = make_child("second", Status::Waiting);
        let finished = make_child("finished", Status::Completed);
        let mut unrelated = Task::new("unrelated");
        unrelated.set("parent", "someone-else");

        for task in [&parent, &first, &second, &finished, &unrelated] {
            db.add((*task).clone()).unwrap();
        }
        db.commit().unwrap();

        let mut db = reopen(&temp);
        let siblings = db.siblings(&first).unwrap();
        let names: Vec<&str> = siblings
            .iter()
            .filter_map(|task| task.get("description"))
            .collect();
        assert_eq!(names, vec!["second"]);

        assert!(db.siblings(&parent).unwrap().is_empty());
    }

    #[test]
    fn commit_is_idempotent() {
        let (temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        db.commit().unwrap();
        let snapshot: Vec<String> = StoreRole::ALL
            .iter()
            .map(|role| read(&temp, role.file_name()))
            .collect();

        db.commit().unwrap();
        let again: Vec<String> = StoreRole::ALL
            .iter()
            .map(|role| read(&temp, role.file_name()))
            .collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn commit_tries_every_file() {
        let (temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        // A directory where the pending file should be makes its commit fail.
        fs::create_dir(temp.path().join(PENDING_FILE)).unwrap();

        assert!(db.commit().is_err());
        assert!(db.store(StoreRole::Pending).is_dirty());
        assert!(!db.store(StoreRole::Undo).is_dirty());
        assert_eq!(read(&temp, UNDO_FILE).lines().count(), 3);
        assert_eq!(read(&temp, BACKLOG_FILE).lines().count(), 1);
    }

    #[test]
    fn gc_respects_flag_and_hook() {
        #[derive(Debug)]
        struct CountPending;

        impl GcHook for CountPending {
            fn collect(&mut self, stores: Stores<'_>) -> Result<usize> {
                Ok(stores.pending.get_tasks(stores.ids)?.len())
            }
        }

        let temp = TempDir::new().unwrap();
        let mut db = TaskDb::open(temp.path(), &Config::default()).unwrap();
        db.add(Task::new("A")).unwrap();
        assert_eq!(db.gc().unwrap(), 0);

        let mut db = TaskDb::open(temp.path(), &Config::default())
            .unwrap()
            .with_gc_hook(CountPending);
        db.add(Task::new("B")).unwrap();
        assert_eq!(db.gc().unwrap(), 1);

        let disabled = Config {
            gc: false,
            ..Config::default()
        };
        let mut db = TaskDb::open(temp.path(), &disabled)
            .unwrap()
            .with_gc_hook(CountPending);
        db.add(Task::new("C")).unwrap();
        assert_eq!(db.gc().unwrap(), 0);
    }

    #[test]
    fn synch_runs_hook() {
        #[derive(Debug)]
        struct WriteKey;

        impl SyncHook for WriteKey {
            fn synch(&mut self, stores: Stores<'_>) -> Result<()> {
                stores.synch_key.clear_lines()?;
                stores.synch_key.add_line("key-1");
                Ok(())
            }
        }

        let (temp, db) = open();
        let mut db = db.with_sync_hook(WriteKey);
        db.synch().unwrap();
        db.commit().unwrap();
        assert_eq!(read(&temp, SYNCH_KEY_FILE), "key-1\n");

        let (_temp, mut inert) = open();
        inert.synch().unwrap();
        assert!(!inert.store(StoreRole::SynchKey).is_dirty());
    }

    #[test]
    fn dump_has_line_per_file() {
        let (_temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        let dump = db.dump();
        assert_eq!(dump.len(), 5);
        assert!(dump[0].trim_start().starts_with("pending.data"));
        assert!(dump[0].contains(" O "));
        assert!(dump[4].trim_start().starts_with("synch.key"));
        assert!(dump[4].contains(" - "));
    }

    #[test]
    fn undo_history_includes_uncommitted_entries() {
        let (_temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        let history = db.undo_history().unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].old.is_none());
    }

    #[test]
    fn next_id_shares_the_load_sequence() {
        let (temp, mut db) = open();
        db.add(Task::new("A")).unwrap();
        db.commit().unwrap();

        let mut db = reopen(&temp);
        db.pending_tasks().unwrap();
        assert_eq!(db.next_id(), 2);
    }
}
