use std::collections::VecDeque;

use super::request::OracleRequest;

/// In-memory FIFO of requests waiting for a scheduler tick.
///
/// Requests enter at the back and leave from the front, one at a time.
/// Nothing is persisted: whatever is still queued at shutdown is lost.
#[derive(Debug, Default)]
pub struct RequestQueue {
    pending: VecDeque<OracleRequest>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request to the back of the queue
    pub fn push(&mut self, request: OracleRequest) {
        self.pending.push_back(request);
    }

    /// Remove the oldest request
    pub fn pop(&mut self) -> Option<OracleRequest> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
