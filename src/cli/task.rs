//! Task commands: add, modify, list, show, siblings.

use serde::Serialize;

use crate::cli::{parse_attr, resolve_task, GlobalOptions};
use crate::db::TaskDb;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::{Status, Task};

pub struct AddOptions {
    pub description: Vec<String>,
    pub status: Option<String>,
    pub parent: Option<String>,
    pub attrs: Vec<String>,
}

pub struct ModifyOptions {
    pub target: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub attrs: Vec<String>,
    pub unset: Vec<String>,
}

/// Row shown by list-style commands
#[derive(Serialize)]
struct TaskRow {
    id: u64,
    uuid: String,
    status: Status,
    description: String,
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            uuid: task.uuid().to_string(),
            status: task.status(),
            description: task.get("description").unwrap_or_default().to_string(),
        }
    }
}

#[derive(Serialize)]
struct ListReport {
    count: usize,
    tasks: Vec<TaskRow>,
}

fn parse_status(raw: &str) -> Result<Status> {
    raw.parse::<Status>()
        .map_err(|_| Error::InvalidArgument(format!("unknown status '{raw}'")))
}

fn format_row(row: &TaskRow) -> String {
    let id = if row.id == 0 {
        "-".to_string()
    } else {
        row.id.to_string()
    };
    format!("{id:>4} {:<9} {}", row.status.as_str(), row.description)
}

fn list_output(header: &str, rows: Vec<TaskRow>) -> (ListReport, HumanOutput) {
    let mut human = HumanOutput::new(header);
    human.push_summary("tasks", rows.len().to_string());
    for row in &rows {
        human.push_detail(format_row(row));
    }
    (
        ListReport {
            count: rows.len(),
            tasks: rows,
        },
        human,
    )
}

pub fn run_add(globals: &GlobalOptions, options: AddOptions) -> Result<()> {
    let description = options.description.join(" ");
    if description.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "description cannot be empty".to_string(),
        ));
    }

    let mut task = Task::new(description);
    if let Some(status) = &options.status {
        task.set_status(parse_status(status)?);
    }
    if let Some(parent) = options.parent {
        task.set("parent", parent);
    }
    for raw in &options.attrs {
        let (name, value) = parse_attr(raw)?;
        if name == "uuid" {
            return Err(Error::InvalidArgument("uuid cannot be set".to_string()));
        }
        task.set(name, value);
    }

    let mut db = globals.open_db()?;
    db.add(task.clone())?;
    db.commit()?;

    let mut human = HumanOutput::new(format!("Added task {}", task.uuid()));
    human.push_summary("status", task.status().as_str());
    human.push_next_step("taskdb list");
    emit_success(globals.output, "add", &task, Some(&human))
}

pub fn run_modify(globals: &GlobalOptions, options: ModifyOptions) -> Result<()> {
    if options.description.is_none()
        && options.status.is_none()
        && options.attrs.is_empty()
        && options.unset.is_empty()
    {
        return Err(Error::InvalidArgument("nothing to modify".to_string()));
    }

    let mut db = globals.open_db()?;
    let mut task = resolve_task(&mut db, &options.target)?;

    if let Some(description) = options.description {
        task.set("description", description);
    }
    if let Some(status) = &options.status {
        task.set_status(parse_status(status)?);
    }
    for raw in &options.attrs {
        let (name, value) = parse_attr(raw)?;
        if name == "uuid" {
            return Err(Error::InvalidArgument("uuid cannot be changed".to_string()));
        }
        task.set(name, value);
    }
    for name in &options.unset {
        if matches!(name.as_str(), "uuid" | "status") {
            return Err(Error::InvalidArgument(format!("'{name}' cannot be removed")));
        }
        task.remove(name);
    }

    db.modify(task.clone())?;
    db.commit()?;

    let human = HumanOutput::new(format!("Modified task {}", task.uuid()));
    emit_success(globals.output, "modify", &task, Some(&human))
}

pub fn run_list(globals: &GlobalOptions, all: bool) -> Result<()> {
    let mut db = globals.open_db()?;
    db.gc()?;

    let mut rows: Vec<TaskRow> = db
        .pending_tasks()?
        .iter()
        .filter(|task| all || task.is_live())
        .map(TaskRow::from)
        .collect();
    if all {
        rows.extend(db.completed_tasks()?.iter().map(TaskRow::from));
    }
    // gc may have queued changes.
    db.commit()?;

    let (report, human) = list_output("Tasks", rows);
    emit_success(globals.output, "list", &report, Some(&human))
}

pub fn run_show(globals: &GlobalOptions, target: &str) -> Result<()> {
    let mut db = globals.open_db()?;
    let task = resolve_task(&mut db, target)?;

    let mut human = HumanOutput::new(format!("Task {}", task.uuid()));
    if task.id != 0 {
        human.push_summary("id", task.id.to_string());
    }
    for (name, value) in task.attributes() {
        human.push_summary(name, value);
    }
    emit_success(globals.output, "show", &task, Some(&human))
}

pub fn run_siblings(globals: &GlobalOptions, target: &str) -> Result<()> {
    let mut db: TaskDb = globals.open_db()?;
    let task = resolve_task(&mut db, target)?;
    let siblings = db.siblings(&task)?;

    let rows = siblings.iter().map(TaskRow::from).collect();
    let (report, human) = list_output(&format!("Siblings of {}", task.uuid()), rows);
    emit_success(globals.output, "siblings", &report, Some(&human))
}
