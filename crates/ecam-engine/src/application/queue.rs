//! Priority request queue.
//!
//! Requests are ordered by [`Priority`] first and by arrival second, so two
//! HIGH requests leave the queue in the order they were enqueued.  A plain
//! `BinaryHeap<Request>` would not guarantee that; the heap here is keyed by
//! `(priority, sequence)` where the sequence number grows with every push.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ecam_core::protocol::{Priority, Request};

#[derive(Debug)]
struct Entry {
    priority: Priority,
    seq: u64,
    request: Request,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // BinaryHeap is a max-heap; invert so the lowest (priority, seq) pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Stable min-priority queue of outgoing requests.
#[derive(Debug, Default)]
pub struct RequestQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: Request) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            priority: request.priority,
            seq,
            request,
        });
    }

    /// Removes the most urgent request; ties go to the oldest.
    pub fn pop(&mut self) -> Option<Request> {
        self.heap.pop().map(|entry| entry.request)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
