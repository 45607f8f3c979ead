//! Bounded FIFO of recent chat messages.
//!
//! The relay appends every accepted message here and hands the full contents
//! to each client as it joins, so late arrivals see the recent conversation.

use std::collections::VecDeque;

use crate::models::ChatMessage;

/// Default number of messages retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 30;

/// Fixed-capacity message buffer; the oldest message is evicted first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    buffer: VecDeque<ChatMessage>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, evicting from the front until within capacity.
    pub fn append(&mut self, message: ChatMessage) {
        self.buffer.push_back(message);
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    /// All retained messages, oldest first.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
