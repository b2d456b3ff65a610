use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Task, TaskId};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SCHEDULR_DATA_DIR";

/// Returns the root data directory.
///
/// The path is determined in the following order:
/// 1. `SCHEDULR_DATA_DIR` environment variable.
/// 2. `~/.local/share/schedulr` (on Linux).
/// 3. `./schedulr` (fallback).
pub fn data_dir() -> PathBuf {
    std::env::var(DATA_DIR_ENV).map(PathBuf::from).unwrap_or_else(|_| {
        let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("schedulr");
        p
    })
}

/// One record of the task file that could not be read as a task.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    /// Position in the stored array.
    pub index: usize,
    pub id: Option<Value>,
    pub error: String,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "stored task {} (entry {}) could not be read: {}", id, self.index, self.error),
            None => write!(f, "stored entry {} could not be read: {}", self.index, self.error),
        }
    }
}

/// Contents of a task file.
///
/// `kept` holds entries that are written back verbatim on save: records that
/// failed to decode and per-date instance records left by the browser app,
/// whose dates are regenerated from their series instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFile {
    pub tasks: Vec<Task>,
    pub kept: Vec<Value>,
    pub rejected: Vec<Rejected>,
}

impl From<Vec<Task>> for TaskFile {
    fn from(tasks: Vec<Task>) -> Self {
        TaskFile { tasks, ..TaskFile::default() }
    }
}

impl TaskFile {
    /// Next free numeric id, counting ids of kept entries too.
    pub fn next_id(&self) -> TaskId {
        let max = self
            .tasks
            .iter()
            .filter_map(|t| match t.id {
                TaskId::Num(n) => Some(n),
                TaskId::Text(_) => None,
            })
            .chain(self.kept.iter().filter_map(|v| v.get("id").and_then(Value::as_u64)))
            .max()
            .unwrap_or(0);
        TaskId::Num(max + 1)
    }
}

fn is_instance_record(entry: &Value) -> bool {
    entry.get("isInstance").and_then(Value::as_bool).unwrap_or(false)
}

/// Checks that `user` names a single directory under `<root>/users`.
pub fn validate_user(user: &str) -> Result<()> {
    let bad = user.trim().is_empty()
        || user == "."
        || user == ".."
        || user.contains(['/', '\\'])
        || user.contains('\0');
    if bad {
        return Err(Error::Validation(format!(
            "invalid user name '{}': it must not be empty, '.', '..' or contain path separators",
            user
        )));
    }
    Ok(())
}

/// File-backed store for one user's base tasks.
///
/// Only base tasks are ever written; occurrences are derived on read.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    user: String,
}

impl Storage {
    /// Store rooted at `root` for `user`.
    pub fn at(root: impl Into<PathBuf>, user: &str) -> Result<Self> {
        validate_user(user)?;
        Ok(Storage { root: root.into(), user: user.to_string() })
    }

    /// Store rooted at [`data_dir`].
    pub fn from_env(user: &str) -> Result<Self> {
        Self::at(data_dir(), user)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// `<root>/users/<user>/tasks.json`
    pub fn tasks_path(&self) -> PathBuf {
        self.root.join("users").join(&self.user).join("tasks.json")
    }

    /// `<root>/settings.json`
    pub fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Reads the task file.
    ///
    /// A missing or empty file gives an empty set. Entries that do not decode
    /// as a task are reported in `rejected` and kept for the next save, so one
    /// bad record neither hides the rest nor gets lost.
    pub fn load(&self) -> Result<TaskFile> {
        let path = self.tasks_path();
        if !path.exists() {
            debug!(path = %path.display(), "no task file yet");
            return Ok(TaskFile::default());
        }
        let raw = fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            return Ok(TaskFile::default());
        }
        let entries: Vec<Value> = serde_json::from_str(&raw)?;
        let mut file = TaskFile::default();
        for (index, entry) in entries.into_iter().enumerate() {
            if is_instance_record(&entry) {
                debug!(index, "keeping stored instance record");
                file.kept.push(entry);
                continue;
            }
            match serde_json::from_value::<Task>(entry.clone()) {
                Ok(task) => file.tasks.push(task),
                Err(e) => {
                    warn!(index, error = %e, "unreadable task kept as is");
                    file.rejected.push(Rejected {
                        index,
                        id: entry.get("id").cloned(),
                        error: e.to_string(),
                    });
                    file.kept.push(entry);
                }
            }
        }
        debug!(
            path = %path.display(),
            count = file.tasks.len(),
            kept = file.kept.len(),
            "loaded tasks"
        );
        Ok(file)
    }

    /// Loads all readable base tasks.
    pub fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.load()?.tasks)
    }

    /// Loads a single task by its ID.
    pub fn load_task(&self, id: &TaskId) -> Result<Option<Task>> {
        Ok(self.load_tasks()?.into_iter().find(|t| &t.id == id))
    }

    /// Writes `file` back: its tasks followed by the kept entries unchanged.
    ///
    /// Instance records whose series is gone are dropped.
    pub fn save(&self, file: &TaskFile) -> Result<()> {
        let path = self.tasks_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut entries = Vec::with_capacity(file.tasks.len() + file.kept.len());
        for task in &file.tasks {
            entries.push(serde_json::to_value(task)?);
        }
        let parents: Vec<Value> = entries
            .iter()
            .chain(file.kept.iter().filter(|v| !is_instance_record(v)))
            .filter_map(|v| v.get("id").cloned())
            .collect();
        entries.extend(
            file.kept
                .iter()
                .filter(|v| !is_instance_record(v) || v.get("parentId").is_some_and(|p| parents.contains(p)))
                .cloned(),
        );
        let s = serde_json::to_string_pretty(&entries)?;
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        f.write_all(s.as_bytes())?;
        debug!(path = %path.display(), count = file.tasks.len(), kept = file.kept.len(), "saved tasks");
        Ok(())
    }

    /// Deletes this user's task file.
    pub fn delete_database(&self) -> Result<()> {
        let path = self.tasks_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
