//! In-memory byte channel for tests and the simulator.
//!
//! Every write is recorded and also forwarded over an unbounded channel, so a
//! test (or the simulated machine) can await the next outgoing packet instead
//! of polling.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use ecam_core::protocol::LinkKind;
use tokio::sync::mpsc;

use crate::application::engine::ByteChannel;

/// A [`ByteChannel`] that records writes.
pub struct RecordingChannel {
    link: LinkKind,
    max_packet_size: usize,
    writes: Mutex<Vec<Vec<u8>>>,
    /// Scripted results for upcoming writes; empty means success.
    results: Mutex<VecDeque<bool>>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl RecordingChannel {
    /// Creates a channel and the receiver that sees every written packet.
    pub fn new(link: LinkKind, max_packet_size: usize) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = Self {
            link,
            max_packet_size,
            writes: Mutex::new(Vec::new()),
            results: Mutex::new(VecDeque::new()),
            tx,
        };
        (channel, rx)
    }

    /// Makes the next `count` writes report failure.
    pub fn fail_next(&self, count: usize) {
        let mut results = self.results.lock().unwrap_or_else(PoisonError::into_inner);
        results.extend(std::iter::repeat(false).take(count));
    }

    /// Every packet written so far.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ByteChannel for RecordingChannel {
    async fn write(&self, bytes: &[u8]) -> bool {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(bytes.to_vec());
        let _ = self.tx.send(bytes.to_vec());
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(true)
    }

    fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    fn link(&self) -> LinkKind {
        self.link
    }
}
