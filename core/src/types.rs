//! Domain DTOs for the todo service.
//!
//! # Design
//! Field names follow the service's JSON (`todo`, `userId`) through serde
//! renames while the Rust names describe what the fields mean. The types
//! are defined independently of the mock-server crate; integration tests
//! catch schema drift between the two.

use serde::{Deserialize, Serialize};

/// A single todo record as held in the local store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: u64,
    #[serde(rename = "todo")]
    pub text: String,
    pub completed: bool,
    /// Arbitrary grouping value. Not used for access control.
    #[serde(rename = "userId")]
    pub owner_tag: u64,
    /// Set while the record has not been confirmed by the remote service.
    #[serde(rename = "addedLocally", default, skip_serializing_if = "is_false")]
    pub is_local_only: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Todo {
    /// A client-side record that the remote service has not seen yet.
    pub fn draft(id: u64, text: impl Into<String>, owner_tag: u64) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            owner_tag,
            is_local_only: true,
        }
    }

    /// Shallow-merge `patch` into `self`, keeping `self.id`.
    ///
    /// A record that was never confirmed stays local-only after an edit.
    pub fn merge_from(&mut self, patch: &Todo) {
        self.text.clone_from(&patch.text);
        self.completed = patch.completed;
        self.owner_tag = patch.owner_tag;
        self.is_local_only |= patch.is_local_only;
    }

    /// Same record with `completed` flipped.
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }
}

/// Wire payload for create and update: a `Todo` without its `id`.
///
/// The service assigns ids itself and rejects or ignores client ids, and it
/// has no notion of the local-only flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoBody {
    pub todo: String,
    pub completed: bool,
    #[serde(rename = "userId")]
    pub user_id: u64,
}

impl From<&Todo> for TodoBody {
    fn from(todo: &Todo) -> Self {
        Self {
            todo: todo.text.clone(),
            completed: todo.completed,
            user_id: todo.owner_tag,
        }
    }
}

/// One page of the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoPage {
    pub todos: Vec<Todo>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub limit: u64,
}

impl TodoPage {
    /// A page synthesized from the local store while offline.
    pub fn local(todos: Vec<Todo>) -> Self {
        let len = todos.len() as u64;
        Self {
            todos,
            total: len,
            skip: 0,
            limit: len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }
}

/// `limit`/`skip` window for the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub skip: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn first(limit: u32) -> Self {
        Self { limit, skip: 0 }
    }

    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            skip: self.skip.saturating_add(self.limit),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(Self::DEFAULT_LIMIT)
    }
}
