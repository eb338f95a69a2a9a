//! Navigation stack over context names.
//!
//! # Responsibility
//! - Track recently-left contexts for push/pop style switching.
//!
//! # Invariants
//! - Entries are unique; pushing an existing name relocates it to the tail.
//! - Length never exceeds `max_size`; the head is evicted silently.
//! - Entries are names, not owned references; a name may outlive its
//!   context, and consumers must tolerate the dangling entry.

use serde::{Deserialize, Serialize};

/// Default capacity of the navigation stack.
pub const DEFAULT_STACK_CAPACITY: usize = 10;

/// Bounded most-recently-used stack of context names, most recent at the
/// tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextStack {
    #[serde(rename = "stack", default)]
    entries: Vec<String>,
    #[serde(default = "default_capacity")]
    max_size: usize,
}

fn default_capacity() -> usize {
    DEFAULT_STACK_CAPACITY
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_CAPACITY)
    }
}

impl ContextStack {
    /// Creates an empty stack holding at most `max_size` entries
    /// (clamped to at least 1).
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    /// Pushes `name` onto the tail.
    ///
    /// An already-present name is relocated rather than duplicated; on
    /// overflow the oldest entry is dropped.
    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|entry| entry != &name);
        self.entries.push(name);
        while self.entries.len() > self.max_size {
            self.entries.remove(0);
        }
    }

    /// Removes and returns the most recent entry, or `None` when empty.
    pub fn pop(&mut self) -> Option<String> {
        self.entries.pop()
    }

    /// Most recent entry without removing it.
    pub fn peek(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest-first, most recent last.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
