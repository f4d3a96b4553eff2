//! Completed / pending split used by the detail screen.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Todo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoKind {
    Completed,
    Pending,
}

impl FromStr for TodoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(TodoKind::Completed),
            "pending" => Ok(TodoKind::Pending),
            other => Err(format!("unknown todo kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPartition {
    pub completed: Vec<Todo>,
    pub pending: Vec<Todo>,
}

impl StatusPartition {
    pub fn of(&self, kind: TodoKind) -> &[Todo] {
        match kind {
            TodoKind::Completed => &self.completed,
            TodoKind::Pending => &self.pending,
        }
    }
}

/// Split `todos` on the `completed` flag, preserving relative order.
pub fn filter_by_status(todos: &[Todo]) -> StatusPartition {
    let (completed, pending) = todos.iter().cloned().partition(|t| t.completed);
    StatusPartition { completed, pending }
}
