//! The engine task: runs an [`Exchange`] against a live byte channel.
//!
//! # Why a task? (for beginners)
//!
//! Frames arrive on the transport's callback, requests come from the UI,
//! and retry timers fire on their own schedule.  All three mutate the same
//! queue and in-flight slot.  Rather than guard that state with a lock, the
//! engine owns it inside one Tokio task and everything else talks to the task
//! through an [`EngineHandle`].  Messages are handled one at a time, so no two
//! inputs ever interleave.
//!
//! Timers are plain `tokio::time::sleep` tasks that post
//! [`EngineMessage::TimerFired`] back to the engine.  They hold a weak sender
//! so a pending timer never keeps a dropped engine alive, and every timer
//! carries a generation number so a cancelled one is ignored when it fires.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use ecam_core::protocol::{HexBytes, LinkKind, ProtocolStrategy, Request};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::application::exchange::{Action, Exchange, RetryPolicy, TimerKind};
use crate::application::listener::{notify, EcamListener};

// ── Transport seam ────────────────────────────────────────────────────────────

/// Outbound side of a machine link.
///
/// Infrastructure implementations wrap a BLE characteristic or the cloud
/// relay; tests record the writes.  Inbound fragments and write
/// acknowledgements are pushed into the engine through [`EngineHandle`].
#[async_trait]
pub trait ByteChannel: Send + Sync {
    /// Writes one packet and reports whether the link accepted it.
    async fn write(&self, bytes: &[u8]) -> bool;

    /// Largest packet the link accepts in one write.
    fn max_packet_size(&self) -> usize;

    fn link(&self) -> LinkKind;
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Error returned by [`EngineHandle`] once the engine task has stopped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine task has stopped")]
    Closed,
}

/// Inputs accepted by the engine task.
#[derive(Debug)]
pub enum EngineMessage {
    Enqueue(Request),
    Fragment(Vec<u8>),
    WriteAcknowledged,
    TimerFired { kind: TimerKind, generation: u64 },
    Disconnect,
}

/// Cloneable handle for talking to a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineMessage>,
}

impl EngineHandle {
    fn send(&self, message: EngineMessage) -> Result<(), EngineError> {
        self.tx.send(message).map_err(|_| EngineError::Closed)
    }

    /// Queues an already-built request.
    pub fn enqueue(&self, request: Request) -> Result<(), EngineError> {
        self.send(EngineMessage::Enqueue(request))
    }

    /// Hands a notification fragment from the link to the engine.
    pub fn fragment_received(&self, fragment: &[u8]) -> Result<(), EngineError> {
        self.send(EngineMessage::Fragment(fragment.to_vec()))
    }

    /// The link confirmed the last chunk was written.
    pub fn write_acknowledged(&self) -> Result<(), EngineError> {
        self.send(EngineMessage::WriteAcknowledged)
    }

    /// Clears timers, queue, in-flight request and reassembly buffer.
    pub fn disconnect(&self) -> Result<(), EngineError> {
        self.send(EngineMessage::Disconnect)
    }

    /// Returns `true` once the engine task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

/// Spawns the engine on the current Tokio runtime.
///
/// The task ends when every [`EngineHandle`] has been dropped.
pub fn spawn_engine<C>(
    strategy: ProtocolStrategy,
    policy: RetryPolicy,
    channel: C,
    listener: Arc<dyn EcamListener>,
) -> (EngineHandle, JoinHandle<()>)
where
    C: ByteChannel + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let timer_tx = tx.downgrade();
    let exchange = Exchange::new(strategy, policy, channel.max_packet_size());
    info!(
        variant = ?strategy.variant,
        link = ?channel.link(),
        striker = strategy.striker,
        "engine started"
    );

    let task = EngineTask {
        exchange,
        channel,
        listener,
        timer_tx,
    };
    let join = tokio::spawn(task.run(rx));
    (EngineHandle { tx }, join)
}

struct EngineTask<C> {
    exchange: Exchange,
    channel: C,
    listener: Arc<dyn EcamListener>,
    timer_tx: mpsc::WeakUnboundedSender<EngineMessage>,
}

impl<C: ByteChannel> EngineTask<C> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<EngineMessage>) {
        while let Some(message) = rx.recv().await {
            let mut out = Vec::new();
            match message {
                EngineMessage::Enqueue(request) => self.exchange.enqueue(request, &mut out),
                EngineMessage::Fragment(fragment) => {
                    self.exchange.fragment_received(&fragment, &mut out)
                }
                EngineMessage::WriteAcknowledged => self.exchange.write_acknowledged(&mut out),
                EngineMessage::TimerFired { kind, generation } => {
                    self.exchange.timer_fired(kind, generation, &mut out)
                }
                EngineMessage::Disconnect => self.exchange.disconnect(),
            }
            self.perform(out).await;
        }
        debug!("all engine handles dropped; engine stopped");
    }

    /// Carries out actions until none are left.  A write's result can itself
    /// produce actions (a zero-delay timeout, say), so they are appended.
    async fn perform(&mut self, actions: Vec<Action>) {
        let mut pending: VecDeque<Action> = actions.into();
        while let Some(action) = pending.pop_front() {
            match action {
                Action::Write(bytes) => {
                    trace!(bytes = %HexBytes(&bytes), "write");
                    let ok = self.channel.write(&bytes).await;
                    let mut more = Vec::new();
                    self.exchange.write_completed(ok, &mut more);
                    pending.extend(more);
                }
                Action::ArmTimer {
                    kind,
                    delay,
                    generation,
                } => {
                    let weak = self.timer_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if let Some(tx) = weak.upgrade() {
                            let _ = tx.send(EngineMessage::TimerFired { kind, generation });
                        }
                    });
                }
                Action::Emit(event) => notify(self.listener.as_ref(), &event),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
