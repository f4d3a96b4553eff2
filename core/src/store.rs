//! Session-scoped, ordered collection of todo records.
//!
//! # Design
//! `TodoStore` is a handle: clones share the same records. It is passed
//! explicitly into the engine and read by whatever renders the list, so
//! there is no ambient global. At most one record per id is held at any
//! time; `append` and `replace_all` enforce that.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::Todo;

#[derive(Debug, Clone, Default)]
pub struct TodoStore {
    todos: Arc<RwLock<Vec<Todo>>>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_todos(todos: Vec<Todo>) -> Self {
        let store = Self::new();
        store.replace_all(todos);
        store
    }

    /// Copy of the current records, in order.
    pub fn snapshot(&self) -> Vec<Todo> {
        self.todos.read().clone()
    }

    pub fn len(&self) -> usize {
        self.todos.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.read().is_empty()
    }

    pub fn get(&self, id: u64) -> Option<Todo> {
        self.todos.read().iter().find(|t| t.id == id).cloned()
    }

    /// Add `todo` at the tail. If a record with the same id exists it is
    /// replaced in place instead; returns `false` in that case.
    pub fn append(&self, todo: Todo) -> bool {
        let mut todos = self.todos.write();
        match todos.iter_mut().find(|t| t.id == todo.id) {
            Some(existing) => {
                tracing::debug!(id = todo.id, "append replaced record with same id");
                *existing = todo;
                false
            }
            None => {
                todos.push(todo);
                true
            }
        }
    }

    /// Shallow-merge `patch` into the record with `patch.id`.
    pub fn merge_by_id(&self, patch: &Todo) -> Option<Todo> {
        let mut todos = self.todos.write();
        let existing = todos.iter_mut().find(|t| t.id == patch.id)?;
        existing.merge_from(patch);
        Some(existing.clone())
    }

    pub fn remove_by_id(&self, id: u64) -> Option<Todo> {
        let mut todos = self.todos.write();
        let index = todos.iter().position(|t| t.id == id)?;
        Some(todos.remove(index))
    }

    /// Replace every record. Later duplicates of an id are dropped.
    pub fn replace_all(&self, incoming: Vec<Todo>) {
        let mut deduped: Vec<Todo> = Vec::with_capacity(incoming.len());
        for todo in incoming {
            if deduped.iter().any(|t| t.id == todo.id) {
                tracing::debug!(id = todo.id, "dropping duplicate id from replacement set");
                continue;
            }
            deduped.push(todo);
        }
        *self.todos.write() = deduped;
    }
}
