//! String builder - ordered accumulator of markup pieces.
//!
//! Appending at either end is O(1) amortized; nothing is concatenated until
//! [`StringBuilder::join`].

use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct StringBuilder {
    parts: VecDeque<String>,
}

impl StringBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the end.
    pub fn push(&mut self, part: impl Into<String>) {
        self.parts.push_back(part.into());
    }

    /// Prepend at the front.
    pub fn push_front(&mut self, part: impl Into<String>) {
        self.parts.push_front(part.into());
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Materialize every piece, in order, separated by `separator`.
    pub fn join(&self, separator: &str) -> String {
        let total: usize = self.parts.iter().map(String::len).sum::<usize>()
            + separator.len() * self.parts.len().saturating_sub(1);
        let mut out = String::with_capacity(total);
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.push_str(part);
        }
        out
    }
}
