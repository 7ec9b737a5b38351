//! Bounded undo/redo stacks with batch grouping.

use std::collections::VecDeque;

struct Entry<S> {
    label: String,
    state: S,
}

/// Undo/redo over whole-state snapshots of type `S`.
///
/// Each entry is the state *before* a mutation. Batches nest: only the
/// outermost `begin_batch` records an entry, so a compound action undoes in
/// one step.
pub struct History<S> {
    undo: VecDeque<Entry<S>>,
    redo: Vec<Entry<S>>,
    max_depth: usize,
    batch_depth: usize,
}

impl<S> History<S> {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
        }
    }

    /// Record `state` as the point to return to. Clears redo. Returns the
    /// states dropped: evicted undo entries plus the discarded redo branch.
    pub fn push(&mut self, label: impl Into<String>, state: S) -> Vec<S> {
        let mut dropped: Vec<S> = self.redo.drain(..).map(|e| e.state).collect();
        self.undo.push_back(Entry {
            label: label.into(),
            state,
        });
        while self.undo.len() > self.max_depth {
            if let Some(evicted) = self.undo.pop_front() {
                dropped.push(evicted.state);
            }
        }
        dropped
    }

    /// Open a batch. `capture` runs only for the outermost call.
    pub fn begin_batch(&mut self, label: impl Into<String>, capture: impl FnOnce() -> S) -> Vec<S> {
        self.batch_depth += 1;
        if self.batch_depth == 1 {
            self.push(label, capture())
        } else {
            Vec::new()
        }
    }

    /// Close a batch. False if none was open.
    pub fn end_batch(&mut self) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        true
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Swap `current` for the last undo state. `None` if there is nothing to
    /// undo or a batch is still open.
    pub fn undo(&mut self, current: S) -> Option<S> {
        if self.in_batch() {
            return None;
        }
        let entry = self.undo.pop_back()?;
        self.redo.push(Entry {
            label: entry.label.clone(),
            state: current,
        });
        Some(entry.state)
    }

    pub fn redo(&mut self, current: S) -> Option<S> {
        if self.in_batch() {
            return None;
        }
        let entry = self.redo.pop()?;
        self.undo.push_back(Entry {
            label: entry.label.clone(),
            state: current,
        });
        Some(entry.state)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo.back().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo.last().map(|e| e.label.as_str())
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    /// Every stored state, undo side first.
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.undo
            .iter()
            .map(|e| &e.state)
            .chain(self.redo.iter().map(|e| &e.state))
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.batch_depth = 0;
    }
}
