/// Maximum number of snapshots kept on the undo stack; the oldest is dropped first.
pub const MAX_UNDO_DEPTH: usize = 100;

/// Two stacks of full snapshots. `record` is for new user actions and clears
/// redo; `undo`/`redo` move the current value between the stacks.
#[derive(Debug, Clone)]
pub struct History<T> {
    undo: Vec<T>,
    redo: Vec<T>,
    depth: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::with_depth(MAX_UNDO_DEPTH)
    }
}

impl<T> History<T> {
    pub fn with_depth(depth: usize) -> Self {
        Self { undo: Vec::new(), redo: Vec::new(), depth: depth.max(1) }
    }

    pub fn record(&mut self, snapshot: T) {
        self.undo.push(snapshot);
        if self.undo.len() > self.depth {
            self.undo.remove(0);
        }
        self.redo.clear();
    }

    /// Swaps `current` with the last recorded snapshot. Returns false when empty.
    pub fn undo(&mut self, current: &mut T) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        self.redo.push(std::mem::replace(current, previous));
        true
    }

    pub fn redo(&mut self, current: &mut T) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push(std::mem::replace(current, next));
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}
