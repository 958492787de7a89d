use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::validation;

/// Lifecycle state of a task. Any state can be reached from any other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [Self::Pending, Self::InProgress, Self::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(format!(
                "unknown status '{other}' (expected pending, in_progress or completed)"
            )),
        }
    }
}

/// A todo item. `id` and `owner_id` are fixed when the task is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task. Validated by the service before a `Task` is built.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update: one optional slot per mutable field, `None` leaves the field as is.
///
/// A supplied description that is blank clears the stored description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

impl Task {
    /// Builds a pending task for `owner_id`. The caller is expected to have
    /// validated `new_task` already.
    pub fn new(id: Uuid, owner_id: Uuid, new_task: NewTask) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id,
            title: new_task.title.trim().to_string(),
            description: normalize_description(new_task.description),
            status: TaskStatus::Pending,
            due_date: new_task.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn mark_pending(&mut self) {
        self.set_status(TaskStatus::Pending);
    }

    pub fn mark_in_progress(&mut self) {
        self.set_status(TaskStatus::InProgress);
    }

    pub fn mark_completed(&mut self) {
        self.set_status(TaskStatus::Completed);
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.touch();
    }

    /// Applies the fields present in `patch`.
    ///
    /// Every supplied field is validated before anything is written, so on
    /// error the task is left exactly as it was.
    pub fn update(&mut self, patch: TaskPatch) -> Result<(), Vec<String>> {
        let errors = validation::validate_patch(&patch);
        if !errors.is_empty() {
            return Err(errors);
        }
        if patch.is_empty() {
            return Ok(());
        }

        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = normalize_description(Some(description));
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = Some(due_date);
        }
        self.touch();
        Ok(())
    }

    // updated_at must move forward even when the clock has not.
    fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::nanoseconds(1)
        };
    }
}
