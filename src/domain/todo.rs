//! Todo domain model.
//!
//! A todo's status is never stored independently of its completion time:
//! `status == Done` exactly when `finished_time` is present. Every
//! transition goes through [`TodoStatus::from_finished_time`], so the two
//! fields cannot drift apart.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::value_objects::{Timestamp, TodoId, UserId};

// =============================================================================
// Status
// =============================================================================

/// Completion status of a todo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Not yet finished.
    #[default]
    Pending,
    /// Finished; the todo carries a completion timestamp.
    Done,
}

impl TodoStatus {
    /// Derives the status from the presence of a completion timestamp.
    #[must_use]
    pub const fn from_finished_time(finished_time: Option<&Timestamp>) -> Self {
        if finished_time.is_some() {
            Self::Done
        } else {
            Self::Pending
        }
    }

    /// Returns the opposite status.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Pending => Self::Done,
            Self::Done => Self::Pending,
        }
    }

    /// Returns the storage representation (`"pending"` / `"done"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for TodoStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when a status string is not `pending` or `done`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown todo status: '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for TodoStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// =============================================================================
// Todo
// =============================================================================

/// A single task on a user's list.
///
/// Status and completion time are private; use [`Todo::toggled`],
/// [`Todo::edited`] or [`Todo::restore`] to change or rebuild them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    /// Unique identifier.
    pub todo_id: TodoId,
    /// Owning user.
    pub user_id: UserId,
    /// What needs doing.
    pub text: String,
    /// Optional due date.
    pub deadline: Option<Timestamp>,
    /// When the todo was created.
    pub created_at: Timestamp,
    status: TodoStatus,
    finished_time: Option<Timestamp>,
}

impl Todo {
    /// Creates a new pending todo.
    #[must_use]
    pub fn new(
        todo_id: TodoId,
        user_id: UserId,
        text: impl Into<String>,
        deadline: Option<Timestamp>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            todo_id,
            user_id,
            text: text.into(),
            deadline,
            created_at,
            status: TodoStatus::Pending,
            finished_time: None,
        }
    }

    /// Rebuilds a todo from stored fields.
    ///
    /// The status is re-derived from `finished_time`; a stored status column
    /// is never trusted on its own.
    #[must_use]
    pub fn restore(
        todo_id: TodoId,
        user_id: UserId,
        text: String,
        deadline: Option<Timestamp>,
        finished_time: Option<Timestamp>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            todo_id,
            user_id,
            text,
            deadline,
            created_at,
            status: TodoStatus::from_finished_time(finished_time.as_ref()),
            finished_time,
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> TodoStatus {
        self.status
    }

    /// Completion time, present exactly when the todo is done.
    #[must_use]
    pub const fn finished_time(&self) -> Option<&Timestamp> {
        self.finished_time.as_ref()
    }

    /// Returns `true` if the todo is done.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.status, TodoStatus::Done)
    }

    /// Returns a copy with the given completion time and a matching status.
    #[must_use]
    pub fn with_finished_time(self, finished_time: Option<Timestamp>) -> Self {
        Self {
            status: TodoStatus::from_finished_time(finished_time.as_ref()),
            finished_time,
            ..self
        }
    }

    /// Flips the status relative to `current_status`.
    ///
    /// `current_status` is the status the caller saw, which may be stale.
    /// Flipping to `Done` stamps `now` as the completion time; flipping to
    /// `Pending` clears it.
    #[must_use]
    pub fn toggled(self, current_status: TodoStatus, now: Timestamp) -> Self {
        match current_status.flipped() {
            TodoStatus::Done => self.with_finished_time(Some(now)),
            TodoStatus::Pending => self.with_finished_time(None),
        }
    }

    /// Replaces text, deadline and completion time in one step.
    #[must_use]
    pub fn edited(
        self,
        text: impl Into<String>,
        deadline: Option<Timestamp>,
        finished_time: Option<Timestamp>,
    ) -> Self {
        Self {
            text: text.into(),
            deadline,
            ..self
        }
        .with_finished_time(finished_time)
    }

    /// Returns `true` if the deadline has passed and the todo is not done.
    #[must_use]
    pub fn is_overdue(&self, now: &Timestamp) -> bool {
        !self.is_done() && self.deadline.as_ref().is_some_and(|deadline| deadline < now)
    }

    /// Returns `true` if `user_id` owns this todo.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.user_id == *user_id
    }
}

// =============================================================================
// Tests
// =============================================================================
