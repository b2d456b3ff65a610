use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Identifier of a base task.
///
/// Stored files may carry numeric ids (the CLI allocates them) or string ids
/// (written by other front ends), so both forms are accepted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(untagged)]
pub enum TaskId {
    Num(u64),
    Text(String),
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Num(n) => write!(f, "{}", n),
            TaskId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Validation("task id cannot be empty".into()));
        }
        Ok(s.parse::<u64>()
            .map(TaskId::Num)
            .unwrap_or_else(|_| TaskId::Text(s.to_string())))
    }
}

impl From<u64> for TaskId {
    fn from(n: u64) -> Self {
        TaskId::Num(n)
    }
}

/// Task priority.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Sort rank, higher is more important.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(Error::Validation(format!(
                "unknown priority '{}'. Supported: low, medium, high",
                other
            ))),
        }
    }
}

/// Task workflow status.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    InProgress,
    Completed,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::InProgress, Status::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
        }
    }

    /// Completed tasks go back to pending, everything else becomes completed.
    pub fn toggled(self) -> Status {
        match self {
            Status::Completed => Status::Pending,
            Status::Pending | Status::InProgress => Status::Completed,
        }
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
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "in-progress" | "in_progress" | "inprogress" => Ok(Status::InProgress),
            "completed" | "done" => Ok(Status::Completed),
            other => Err(Error::Validation(format!(
                "unknown status '{}'. Supported: pending, in-progress, completed",
                other
            ))),
        }
    }
}

/// Repeat rule of a recurring task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceKind::Daily => "daily",
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Monthly => "monthly",
            RecurrenceKind::Yearly => "yearly",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            RecurrenceKind::Daily => "day",
            RecurrenceKind::Weekly => "week",
            RecurrenceKind::Monthly => "month",
            RecurrenceKind::Yearly => "year",
        }
    }
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecurrenceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurrenceKind::Daily),
            "weekly" => Ok(RecurrenceKind::Weekly),
            "monthly" => Ok(RecurrenceKind::Monthly),
            "yearly" => Ok(RecurrenceKind::Yearly),
            other => Err(Error::Configuration(format!(
                "unknown recurrence type '{}'. Supported: daily, weekly, monthly, yearly",
                other
            ))),
        }
    }
}

impl TryFrom<String> for RecurrenceKind {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

fn default_interval() -> u32 {
    1
}

/// Accepts a missing, null or empty end date as "no end date".
fn blank_date_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Recurrence rule: repeat every `interval` periods of `kind` until `end_date`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Last date an occurrence may fall on. `None` means the series is unbounded.
    #[serde(
        default,
        deserialize_with = "blank_date_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<NaiveDate>,
}

impl Recurrence {
    pub fn new(kind: RecurrenceKind, interval: u32, end_date: Option<NaiveDate>) -> Self {
        Recurrence { kind, interval, end_date }
    }

    /// Human readable rule, e.g. "every day" or "every 2 weeks".
    pub fn describe(&self) -> String {
        let base = if self.interval <= 1 {
            format!("every {}", self.kind.unit())
        } else {
            format!("every {} {}s", self.interval, self.kind.unit())
        };
        match self.end_date {
            Some(end) => format!("{} until {}", base, end),
            None => base,
        }
    }
}

/// A persisted task as entered by the user, possibly a recurring template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Due date, or the first date of the series for a recurring task.
    pub deadline: NaiveDate,
    pub priority: Priority,
    pub status: Status,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// Occurrence dates removed from the series one at a time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_dates: Vec<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Returns the repeat rule if this task is recurring.
    ///
    /// A rule left on a non-recurring task is ignored. A recurring task
    /// without a rule is malformed.
    pub fn rule(&self) -> Result<Option<&Recurrence>> {
        if !self.is_recurring {
            return Ok(None);
        }
        match &self.recurrence {
            Some(r) => Ok(Some(r)),
            None => Err(Error::Validation(format!(
                "task {} is marked recurring but has no recurrence rule",
                self.id
            ))),
        }
    }
}

/// A concrete, date-bound materialization of a base task.
///
/// Occurrences are derived on every expansion and never persisted.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub id: TaskId,
    /// Owning base task, set only for instances of a recurring series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub is_instance: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deadline: NaiveDate,
    pub priority: Priority,
    pub status: Status,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Occurrence {
    /// Occurrence id of the instance of series `base` falling on `date`.
    pub fn instance_id(base: &TaskId, date: NaiveDate) -> TaskId {
        TaskId::Text(format!("{}_{}", base, date.format("%Y-%m-%d")))
    }

    /// A non-recurring task is its own sole occurrence.
    pub fn from_task(task: &Task) -> Self {
        Occurrence {
            id: task.id.clone(),
            parent_id: None,
            is_instance: false,
            name: task.name.clone(),
            description: task.description.clone(),
            deadline: task.deadline,
            priority: task.priority,
            status: task.status,
            is_recurring: task.is_recurring,
            recurrence: task.recurrence.clone(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }

    /// Instance of a recurring task on `date`. Always starts pending.
    pub fn instance(task: &Task, date: NaiveDate) -> Self {
        Occurrence {
            id: Self::instance_id(&task.id, date),
            parent_id: Some(task.id.clone()),
            is_instance: true,
            deadline: date,
            status: Status::Pending,
            ..Self::from_task(task)
        }
    }

    /// Id of the base task this occurrence was derived from.
    pub fn base_id(&self) -> &TaskId {
        self.parent_id.as_ref().unwrap_or(&self.id)
    }
}

/// Read access shared by base tasks and occurrences, used by the filter layer.
pub trait Schedulable {
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn deadline(&self) -> NaiveDate;
    fn priority(&self) -> Priority;
    fn status(&self) -> Status;
    fn created_at(&self) -> DateTime<Utc>;
}

impl Schedulable for Task {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn deadline(&self) -> NaiveDate {
        self.deadline
    }
    fn priority(&self) -> Priority {
        self.priority
    }
    fn status(&self) -> Status {
        self.status
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Schedulable for Occurrence {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn deadline(&self) -> NaiveDate {
        self.deadline
    }
    fn priority(&self) -> Priority {
        self.priority
    }
    fn status(&self) -> Status {
        self.status
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
