/// Dirty tracking with per-chunk suppression.
///
/// A chunk is any redraw unit: a map cell, or one symbol of the level
/// code line. Logic marks chunks as it mutates; the redraw pass takes the
/// marked chunks that are not suppressed and clears only those marks.
/// Suppressed chunks keep their marks until they are enabled again.

#[derive(Clone, Debug)]
pub struct DirtyTracker {
    marked: Vec<bool>,
    suppressed: Vec<bool>,
}

impl DirtyTracker {
    pub fn new(len: usize) -> Self {
        DirtyTracker {
            marked: vec![false; len],
            suppressed: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.marked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }

    /// Out-of-range chunks are ignored.
    pub fn mark(&mut self, chunk: usize) {
        if let Some(m) = self.marked.get_mut(chunk) {
            *m = true;
        }
    }

    pub fn is_marked(&self, chunk: usize) -> bool {
        self.marked.get(chunk).copied().unwrap_or(false)
    }

    pub fn marked(&self) -> Vec<usize> {
        (0..self.len()).filter(|&i| self.marked[i]).collect()
    }

    pub fn suppress(&mut self, chunk: usize) {
        if let Some(s) = self.suppressed.get_mut(chunk) {
            *s = true;
        }
    }

    pub fn enable(&mut self, chunk: usize) {
        if let Some(s) = self.suppressed.get_mut(chunk) {
            *s = false;
        }
    }

    pub fn is_suppressed(&self, chunk: usize) -> bool {
        self.suppressed.get(chunk).copied().unwrap_or(false)
    }

    pub fn clear_all_suppression(&mut self) {
        self.suppressed.iter_mut().for_each(|s| *s = false);
    }

    /// Marked, non-suppressed chunks in ascending order. Their marks are cleared.
    pub fn take_pending(&mut self) -> Vec<usize> {
        let mut out = Vec::new();
        for i in 0..self.marked.len() {
            if self.marked[i] && !self.suppressed[i] {
                self.marked[i] = false;
                out.push(i);
            }
        }
        out
    }

    /// After a full redraw: every mark goes except those of suppressed chunks.
    pub fn clear_marks(&mut self) {
        for (m, &s) in self.marked.iter_mut().zip(&self.suppressed) {
            if !s {
                *m = false;
            }
        }
    }
}
