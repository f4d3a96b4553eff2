//! Display-list accumulation for the list screen.
//!
//! # Design
//! The engine's store mirrors only the last fetched page. `Pager` owns the
//! list the screen actually renders and appends each page to it. One page
//! fetch may be outstanding at a time; `reset` bumps an epoch so a slow
//! response for a previous list cannot land in the new one.

use crate::engine::{FetchResult, Origin, SyncRequest};
use crate::types::{PageRequest, Todo};

/// Handed out by `Pager::next_page` and returned with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    epoch: u64,
    page: PageRequest,
}

impl PageTicket {
    pub fn page(&self) -> PageRequest {
        self.page
    }
}

#[derive(Debug, Clone)]
pub struct Pager {
    items: Vec<Todo>,
    next: PageRequest,
    has_more: bool,
    in_flight: Option<PageTicket>,
    epoch: u64,
}

impl Pager {
    pub fn new(limit: u32) -> Self {
        Self {
            items: Vec::new(),
            next: PageRequest::first(limit),
            has_more: true,
            in_flight: None,
            epoch: 0,
        }
    }

    pub fn items(&self) -> &[Todo] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Request for the next page, or `None` while a fetch is outstanding or
    /// after an empty page.
    pub fn next_page(&mut self) -> Option<(PageTicket, SyncRequest)> {
        if self.in_flight.is_some() || !self.has_more {
            return None;
        }
        let ticket = PageTicket {
            epoch: self.epoch,
            page: self.next,
        };
        self.in_flight = Some(ticket);
        Some((ticket, SyncRequest::list(self.next)))
    }

    /// Fold a page result into the display list. Returns `false` when the
    /// result was stale or carried no page.
    pub fn apply(&mut self, ticket: PageTicket, result: &FetchResult) -> bool {
        if self.in_flight != Some(ticket) {
            tracing::debug!(?ticket, "discarding stale page result");
            return false;
        }
        self.in_flight = None;

        let Some(page) = result.page() else {
            return false;
        };
        match result.origin {
            Origin::Remote => {
                self.items.extend(page.todos.iter().cloned());
                self.has_more = !page.is_empty();
                self.next = self.next.next();
            }
            Origin::Local => {
                // The store only mirrors the last page plus offline edits, so
                // keep what is shown and add records not on screen yet.
                let fresh: Vec<Todo> = page
                    .todos
                    .iter()
                    .filter(|t| !self.items.iter().any(|shown| shown.id == t.id))
                    .cloned()
                    .collect();
                self.items.extend(fresh);
                self.has_more = false;
            }
        }
        true
    }

    /// Start over from the first page, invalidating outstanding tickets.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.items.clear();
        self.next = PageRequest::first(self.next.limit);
        self.has_more = true;
        self.in_flight = None;
    }

    /// New todos go to the top of the list.
    pub fn prepend(&mut self, todo: Todo) {
        self.items.insert(0, todo);
    }

    pub fn replace(&mut self, todo: &Todo) -> bool {
        match self.items.iter_mut().find(|t| t.id == todo.id) {
            Some(existing) => {
                existing.merge_from(todo);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: u64) -> Option<Todo> {
        let index = self.items.iter().position(|t| t.id == id)?;
        Some(self.items.remove(index))
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(PageRequest::DEFAULT_LIMIT)
    }
}
