//! Back/forward navigation history with browser semantics.
//!
//! History is an explicit context object: create one, wrap it with [`History::shared`], and hand
//! the same [`SharedHistory`] to every viewer that should share it.

use std::cell::RefCell;
use std::path::Path;
use std::path::PathBuf;
use std::rc::Rc;

pub const DEFAULT_CAPACITY: usize = 128;

pub type SharedHistory = Rc<RefCell<History>>;

/// Visited document paths plus a cursor.
///
/// Invariant: when non-empty, `cursor < entries.len()`.
#[derive(Clone, Debug)]
pub struct History {
    entries: Vec<PathBuf>,
    cursor: usize,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history that keeps at most `capacity` entries (at least one), dropping the oldest.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn shared(self) -> SharedHistory {
        Rc::new(RefCell::new(self))
    }

    /// Records that `path` was opened.
    ///
    /// Re-opening the current entry is a no-op. Otherwise forward entries are discarded and
    /// `path` becomes the new tail. Returns `true` if an entry was added.
    pub fn on_open(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.current() == Some(path.as_path()) {
            return false;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        tracing::debug!(path = %path.display(), "history push");
        self.entries.push(path);
        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(..overflow);
        }
        self.cursor = self.entries.len() - 1;
        true
    }

    pub fn can_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Moves one entry back. Returns the new current path, or `None` when already at the start.
    pub fn back(&mut self) -> Option<&Path> {
        if !self.can_back() {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    /// Moves one entry forward. Returns the new current path, or `None` when already at the tail.
    pub fn forward(&mut self) -> Option<&Path> {
        if !self.can_forward() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    /// The entry [`Self::back`] would move to.
    pub fn peek_back(&self) -> Option<&Path> {
        self.can_back()
            .then(|| self.entries[self.cursor - 1].as_path())
    }

    pub fn peek_forward(&self) -> Option<&Path> {
        self.can_forward()
            .then(|| self.entries[self.cursor + 1].as_path())
    }

    pub fn current(&self) -> Option<&Path> {
        self.entries.get(self.cursor).map(PathBuf::as_path)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }
}
