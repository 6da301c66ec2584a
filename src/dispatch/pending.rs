//! Bounded FIFO for lines that arrive while processing is disabled.

use super::command::RawLine;
use std::collections::VecDeque;
use tracing::{debug, warn};

pub const DEFAULT_PENDING_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct PendingBuffer {
    lines: VecDeque<RawLine>,
    capacity: usize,
}

impl Default for PendingBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PENDING_CAPACITY)
    }
}

impl PendingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Queues a line, returning the oldest one if it had to make room
    pub fn push(&mut self, line: RawLine) -> Option<RawLine> {
        let evicted = if self.lines.len() >= self.capacity {
            self.lines.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            warn!("Pending buffer full, dropping oldest line: {}", old.text);
        }
        self.lines.push_back(line);
        debug!("Buffered line ({}/{})", self.lines.len(), self.capacity);
        evicted
    }

    /// Removes and returns everything currently buffered, oldest first
    pub fn take_all(&mut self) -> Vec<RawLine> {
        self.lines.drain(..).collect()
    }

    pub fn clear(&mut self) -> usize {
        let count = self.lines.len();
        self.lines.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_fifo_order() {
        let mut buffer = PendingBuffer::default();
        for text in ["A", "B", "C"] {
            assert!(buffer.push(RawLine::new(text)).is_none());
        }
        let texts: Vec<String> = buffer.take_all().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
        assert!(buffer.is_empty());
    }

    // Lines used to pile up without limit while processing was off; the
    // buffer now holds at most `capacity` lines and drops the oldest.
    #[test]
    fn evicts_oldest_instead_of_growing_without_limit() {
        let mut buffer = PendingBuffer::default();
        let mut evicted = Vec::new();
        for i in 0..(DEFAULT_PENDING_CAPACITY + 5) {
            if let Some(old) = buffer.push(RawLine::new(i.to_string())) {
                evicted.push(old.text);
            }
        }

        assert_eq!(buffer.len(), DEFAULT_PENDING_CAPACITY);
        assert_eq!(evicted, vec!["0", "1", "2", "3", "4"]);
        let first = buffer.take_all().into_iter().next().map(|l| l.text);
        assert_eq!(first.as_deref(), Some("5"));
    }

    #[test]
    fn clear_reports_dropped_count() {
        let mut buffer = PendingBuffer::with_capacity(3);
        buffer.push(RawLine::new("X"));
        buffer.push(RawLine::new("Y"));
        assert_eq!(buffer.clear(), 2);
        assert_eq!(buffer.clear(), 0);
    }
}
