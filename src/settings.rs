//! User preferences.
//!
//! Stored as `settings.json` in the data directory. Every field has a
//! default and unknown keys are ignored, so partial files and exports from
//! other front ends load cleanly.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dates::WeekStart;
use crate::error::Result;
use crate::filter::SortKey;
use crate::models::Priority;
use crate::recurrence::DEFAULT_MAX_INSTANCES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Priority given to new tasks when none is specified.
    pub default_priority: Priority,
    /// Ordering of the task list.
    pub task_sort_by: SortKey,
    /// Whether completed tasks appear in lists by default.
    pub show_completed_tasks: bool,
    pub week_starts_on: WeekStart,
    /// Number of entries in the upcoming list.
    pub upcoming_limit: usize,
    /// Cap on generated dates per recurring series.
    pub max_instances: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_priority: Priority::Medium,
            task_sort_by: SortKey::Deadline,
            show_completed_tasks: true,
            week_starts_on: WeekStart::Monday,
            upcoming_limit: 10,
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }
}

impl Settings {
    /// Loads settings from `path`, falling back to defaults if it is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Settings::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes settings to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Copies the settings at `from` to `to` after checking they parse.
    pub fn import(from: &Path, to: &Path) -> Result<Self> {
        let imported = Settings::load(from)?;
        imported.save(to)?;
        Ok(imported)
    }

    /// Restores defaults at `path`.
    pub fn reset(path: &Path) -> Result<Self> {
        let defaults = Settings::default();
        defaults.save(path)?;
        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let s = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.max_instances, 50);
    }

    #[test]
    fn reads_browser_settings_export() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("schedulr-settings.json");
        let json = r#"{
            "theme": "dark",
            "defaultPriority": "high",
            "showCompletedTasks": false,
            "taskSortBy": "priority",
            "weekStartsOn": "Sunday",
            "reminderTime": 60
        }"#;
        fs::write(&path, json).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.default_priority, Priority::High);
        assert_eq!(s.task_sort_by, SortKey::Priority);
        assert_eq!(s.week_starts_on, WeekStart::Sunday);
        assert!(!s.show_completed_tasks);
        assert_eq!(s.upcoming_limit, 10);
    }

    #[test]
    fn unknown_sort_key_fails_to_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "taskSortBy": "urgency" }"#).unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.to_string().contains("unknown sort key"));
    }

    #[test]
    fn import_and_reset_round_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("export.json");
        let dst = dir.path().join("nested").join("settings.json");
        fs::write(&src, r#"{ "upcomingLimit": 3 }"#).unwrap();

        let imported = Settings::import(&src, &dst).unwrap();
        assert_eq!(imported.upcoming_limit, 3);
        assert_eq!(Settings::load(&dst).unwrap().upcoming_limit, 3);

        Settings::reset(&dst).unwrap();
        assert_eq!(Settings::load(&dst).unwrap(), Settings::default());
    }
}
