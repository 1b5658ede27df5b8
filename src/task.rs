//! Task records and their durable single-line form.
//!
//! A task is a set of named string attributes. On disk every task occupies
//! exactly one line:
//!
//! ```text
//! [description:"Buy milk" entry:"1700000000" status:"pending" uuid:"9f1c..."]
//! ```
//!
//! Attributes are written in name order. Values are escaped so that a record
//! never contains a raw quote, bracket or newline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Escapes applied to attribute values, in encoding order.
const ESCAPES: [(&str, &str); 5] = [
    ("&", "&amp;"),
    ("\"", "&dquot;"),
    ("[", "&open;"),
    ("]", "&close;"),
    ("\n", "&nl;"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Completed,
    Deleted,
    Waiting,
    Recurring,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
            Status::Deleted => "deleted",
            Status::Waiting => "waiting",
            Status::Recurring => "recurring",
        }
    }

    /// Live tasks are the only ones that receive a numeric id.
    pub fn is_live(&self) -> bool {
        !matches!(self, Status::Completed | Status::Deleted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Status::Pending),
            "completed" => Ok(Status::Completed),
            "deleted" => Ok(Status::Deleted),
            "waiting" => Ok(Status::Waiting),
            "recurring" => Ok(Status::Recurring),
            other => Err(Error::InvalidTask(format!("unknown status '{other}'"))),
        }
    }
}

/// A single task record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Task {
    /// Per-process numeric id; 0 when unassigned. Never written to disk.
    #[serde(default)]
    pub id: u64,
    attributes: BTreeMap<String, String>,
}

impl Task {
    /// A fresh pending task with a new uuid and the current entry time
    pub fn new(description: impl Into<String>) -> Self {
        let mut task = Task::default();
        task.set("uuid", Uuid::new_v4().to_string());
        task.set("status", Status::Pending.as_str());
        task.set("entry", Utc::now().timestamp().to_string());
        task.set("description", description);
        task
    }

    /// Parse one line of the durable form
    pub fn parse(line: &str) -> Result<Self> {
        let body = line
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| Error::InvalidTask("record must be enclosed in [ ]".to_string()))?;

        let mut attributes = BTreeMap::new();
        let mut rest = body.trim_start();
        while !rest.is_empty() {
            let colon = rest
                .find(':')
                .ok_or_else(|| Error::InvalidTask(format!("missing ':' in '{rest}'")))?;
            let name = &rest[..colon];
            if !is_valid_attribute_name(name) {
                return Err(Error::InvalidTask(format!("invalid attribute name '{name}'")));
            }

            let quoted = rest[colon + 1..].strip_prefix('"').ok_or_else(|| {
                Error::InvalidTask(format!("value of '{name}' must be quoted"))
            })?;
            let close = quoted.find('"').ok_or_else(|| {
                Error::InvalidTask(format!("unterminated value for '{name}'"))
            })?;
            if attributes
                .insert(name.to_string(), decode(&quoted[..close]))
                .is_some()
            {
                return Err(Error::InvalidTask(format!(
                    "duplicate attribute '{name}'"
                )));
            }

            rest = &quoted[close + 1..];
            if !rest.is_empty() && !rest.starts_with(' ') {
                return Err(Error::InvalidTask(format!(
                    "expected space after attribute '{name}'"
                )));
            }
            rest = rest.trim_start();
        }

        match attributes.get("uuid") {
            Some(uuid) if !uuid.is_empty() => {}
            _ => return Err(Error::InvalidTask("missing uuid".to_string())),
        }
        if let Some(status) = attributes.get("status") {
            status.parse::<Status>()?;
        }

        Ok(Task { id: 0, attributes })
    }

    /// The durable single-line form, without a trailing newline
    pub fn compose(&self) -> String {
        let fields: Vec<String> = self
            .attributes
            .iter()
            .map(|(name, value)| format!("{name}:\"{}\"", encode(value)))
            .collect();
        format!("[{}]", fields.join(" "))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn uuid(&self) -> &str {
        self.get("uuid").unwrap_or_default()
    }

    /// Status of the task; records without one are pending.
    pub fn status(&self) -> Status {
        self.get("status")
            .and_then(|status| status.parse().ok())
            .unwrap_or(Status::Pending)
    }

    pub fn set_status(&mut self, status: Status) {
        self.set("status", status.as_str());
    }

    pub fn is_live(&self) -> bool {
        self.status().is_live()
    }
}

/// Attribute names are non-empty runs of ASCII letters, digits, `_`, `-` or `.`
pub fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
}

fn encode(value: &str) -> String {
    ESCAPES
        .iter()
        .fold(value.to_string(), |acc, (raw, escaped)| acc.replace(raw, escaped))
}

fn decode(value: &str) -> String {
    ESCAPES
        .iter()
        .rev()
        .fold(value.to_string(), |acc, (raw, escaped)| acc.replace(escaped, raw))
}
