//! Todo records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Allowed todo status values, in wire form
pub const TODO_STATUSES: [&str; 3] = ["pending", "in_progress", "completed"];

/// Todo status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid todo status: '{0}'")]
pub struct InvalidStatus(pub String);

impl FromStr for TodoStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(InvalidStatus(other.to_owned())),
        }
    }
}

impl TryFrom<String> for TodoStatus {
    type Error = InvalidStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Todo record as persisted
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for a todo that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub status: TodoStatus,
}

impl NewTodo {
    /// True when no title was supplied. Whitespace counts as a title, as it
    /// does for the `required` rule.
    pub fn is_blank(&self) -> bool {
        self.title.is_empty()
    }
}

/// Partial todo update; `None` leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub status: Option<TodoStatus>,
}

impl TodoChanges {
    /// Overwrite every field of `todo` that has a change.
    pub fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(status) = self.status {
            todo.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Todo {
        Todo {
            id: Uuid::new_v4(),
            title: "Buy milk".into(),
            status: TodoStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn status_round_trips_through_wire_names() {
        for name in TODO_STATUSES {
            let status: TodoStatus = name.parse().unwrap();
            assert_eq!(status.as_str(), name);
        }
        assert!("done".parse::<TodoStatus>().is_err());
        assert!("Pending".parse::<TodoStatus>().is_err());
    }

    #[test]
    fn changes_only_touch_present_fields() {
        let mut todo = stored();
        TodoChanges {
            title: None,
            status: Some(TodoStatus::Completed),
        }
        .apply(&mut todo);

        assert_eq!(todo.title, "Buy milk");
        assert_eq!(todo.status, TodoStatus::Completed);
    }

    #[test]
    fn blank_new_todo() {
        let todo = |title: &str| NewTodo {
            title: title.into(),
            status: TodoStatus::Pending,
        };
        assert!(todo("").is_blank());
        assert!(!todo("   ").is_blank());
    }
}
