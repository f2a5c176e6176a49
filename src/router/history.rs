//! Hash history - forward/back detection.
//!
//! Each hash change is compared with the second-to-last recorded hash. A
//! match is a back navigation (the last hash is popped, the counter
//! decremented); anything else is a forward navigation (pushed, counter
//! incremented). The counter is a signal so back-button widgets can follow
//! it.
//!
//! A hash equal to the last recorded one is reported as
//! [`Direction::Same`] and leaves both the stack and the counter alone. A
//! real hash change never repeats the current hash, so this only happens
//! when the host re-delivers a hash (a refresh or an explicit re-navigate);
//! the pager still resolves the path and the displayed page stays put.

use spark_signals::{signal, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// First hash ever recorded.
    Initial,
    Forward,
    Back,
    /// Same hash as the last one.
    Same,
}

pub struct HashHistory {
    hashes: Vec<String>,
    counter: Signal<i64>,
}

impl Default for HashHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HashHistory {
    pub fn new() -> Self {
        Self {
            hashes: Vec::new(),
            counter: signal(0),
        }
    }

    /// Record a hash change and classify it.
    ///
    /// Repeating the last hash is `Same`: nothing is pushed and the
    /// counter does not move.
    pub fn record(&mut self, hash: &str) -> Direction {
        let len = self.hashes.len();
        if len == 0 {
            self.hashes.push(hash.to_string());
            return Direction::Initial;
        }
        if self.hashes[len - 1] == hash {
            return Direction::Same;
        }
        if len >= 2 && self.hashes[len - 2] == hash {
            self.hashes.pop();
            self.counter.set(self.counter.get() - 1);
            return Direction::Back;
        }
        self.hashes.push(hash.to_string());
        self.counter.set(self.counter.get() + 1);
        Direction::Forward
    }

    pub fn counter(&self) -> i64 {
        self.counter.get()
    }

    /// Reactive handle on the counter.
    pub fn counter_signal(&self) -> Signal<i64> {
        self.counter.clone()
    }

    pub fn hashes(&self) -> &[String] {
        &self.hashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a_b_a() {
        let mut history = HashHistory::new();
        let mut counters = Vec::new();
        for (hash, expected) in [
            ("#/a", Direction::Initial),
            ("#/b", Direction::Forward),
            ("#/a", Direction::Back),
        ] {
            assert_eq!(history.record(hash), expected);
            counters.push(history.counter());
        }
        assert_eq!(counters, [0, 1, 0]);
        assert_eq!(history.hashes(), ["#/a"]);
    }

    #[test]
    fn test_same_hash() {
        let mut history = HashHistory::new();
        history.record("#/a");
        assert_eq!(history.record("#/a"), Direction::Same);
        assert_eq!(history.counter(), 0);

        history.record("#/b");
        assert_eq!(history.record("#/b"), Direction::Same);
        assert_eq!(history.counter(), 1);
        assert_eq!(history.hashes(), ["#/a", "#/b"]);
        assert_eq!(history.record("#/a"), Direction::Back);
    }

    #[test]
    fn test_signal_follows_counter() {
        let mut history = HashHistory::new();
        let counter = history.counter_signal();
        history.record("#/a");
        history.record("#/b");
        history.record("#/c");
        assert_eq!(counter.get(), 2);
        history.record("#/b");
        assert_eq!(counter.get(), 1);
    }
}
