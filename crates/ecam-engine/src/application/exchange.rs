//! Request/answer exchange: dispatcher, chunking and retry state machine.
//!
//! [`Exchange`] owns everything that must change together when a frame
//! arrives or a timer fires: the priority queue, the single in-flight slot,
//! the three retry counters, the reassembly buffer and the timer generations.
//! It performs no I/O.  Each input method appends [`Action`]s that the engine
//! task carries out (write bytes, arm a timer, notify the listener) and feeds
//! the results back in.
//!
//! # Lifecycle of a request (for beginners)
//!
//! ```text
//!  enqueue ─► queue ─► dispatch ─► write ─► (chunks acked) ─► awaiting answer
//!                         ▲                                        │
//!                         │        busy / mismatch / timeout       │
//!                         └──── re-enqueue at HIGH ◄── retry ◄─────┤
//!                                                                  │ matched
//!                                                      checksum ─► decode ─► listener
//! ```
//!
//! Only one request is in flight at a time.  While a retry is pending the
//! slot stays occupied, so nothing else is dispatched until the retry timer
//! has re-enqueued the request (or given up on it).

use std::time::Duration;

use ecam_core::protocol::{
    decode, validate_checksum, ChunkCursor, FrameReassembler, HexBytes, Priority,
    ProtocolStrategy, Request, ID_INDEX,
};
use tracing::{debug, error, trace, warn};

use crate::application::correlate::{classify, Outcome};
use crate::application::listener::EngineEvent;
use crate::application::queue::RequestQueue;

/// Timing and retry limits applied by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// How long to wait for an answer after the (last chunk of a) request.
    pub response_timeout: Duration,
    /// Delay before a busy answer is retried.
    pub busy_delay: Duration,
    /// Delay before a mismatched answer is retried.
    pub mismatch_delay: Duration,
    pub max_timeout_retries: u32,
    pub max_busy_retries: u32,
    pub max_mismatch_retries: u32,
}

impl RetryPolicy {
    pub const MAX_TIMEOUT_RETRIES: u32 = 5;
    pub const MAX_BUSY_RETRIES: u32 = 10;
    pub const MAX_MISMATCH_RETRIES: u32 = 5;
    pub const RETRY_DELAY: Duration = Duration::from_millis(100);

    /// Default limits for a protocol strategy: 1 s answer timeout on V2 over
    /// BLE, 3 s otherwise.
    pub fn for_strategy(strategy: &ProtocolStrategy) -> Self {
        let timeout_ms = if strategy.is_v2() && strategy.chunks_requests() {
            1_000
        } else {
            3_000
        };
        Self {
            response_timeout: Duration::from_millis(timeout_ms),
            busy_delay: Self::RETRY_DELAY,
            mismatch_delay: Self::RETRY_DELAY,
            max_timeout_retries: Self::MAX_TIMEOUT_RETRIES,
            max_busy_retries: Self::MAX_BUSY_RETRIES,
            max_mismatch_retries: Self::MAX_MISMATCH_RETRIES,
        }
    }
}

/// The three timers the exchange can arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// No answer arrived in time.
    Response,
    /// Retry after a busy answer.
    Busy,
    /// Retry after a mismatched answer.
    Mismatch,
}

impl TimerKind {
    const fn slot(self) -> usize {
        match self {
            TimerKind::Response => 0,
            TimerKind::Busy => 1,
            TimerKind::Mismatch => 2,
        }
    }
}

/// Side effects requested by the exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Write these bytes to the transport and report the result through
    /// [`Exchange::write_completed`].
    Write(Vec<u8>),
    /// Call [`Exchange::timer_fired`] with `kind` and `generation` once
    /// `delay` has elapsed.
    ArmTimer {
        kind: TimerKind,
        delay: Duration,
        generation: u64,
    },
    /// Notify the listener.
    Emit(EngineEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// A write is outstanding.
    Writing,
    /// A chunk was written; waiting for the link to acknowledge it.
    ///
    /// No timer runs in this phase.  A link that never acknowledges a chunk
    /// holds the slot until [`Exchange::disconnect`].
    AwaitingAck,
    /// The request is out; waiting for the answer.
    AwaitingAnswer,
    /// A busy or mismatch retry timer is pending.
    RetryPending,
}

#[derive(Debug)]
struct InFlight {
    request: Request,
    chunks: Option<ChunkCursor>,
    phase: Phase,
}

/// Armed timers by kind; a fired timer is honoured only if its generation is
/// still the armed one.
#[derive(Debug, Default)]
struct Timers {
    armed: [Option<u64>; 3],
    next_generation: u64,
}

impl Timers {
    fn arm(&mut self, kind: TimerKind) -> u64 {
        self.next_generation += 1;
        self.armed[kind.slot()] = Some(self.next_generation);
        self.next_generation
    }

    fn cancel_all(&mut self) {
        self.armed = [None; 3];
    }

    /// Disarms `kind` and returns `true` if `generation` is current.
    fn take(&mut self, kind: TimerKind, generation: u64) -> bool {
        if self.armed[kind.slot()] == Some(generation) {
            self.armed[kind.slot()] = None;
            true
        } else {
            false
        }
    }

    fn is_armed(&self, kind: TimerKind) -> bool {
        self.armed[kind.slot()].is_some()
    }
}

/// Single-flight request/answer state machine.
#[derive(Debug)]
pub struct Exchange {
    strategy: ProtocolStrategy,
    policy: RetryPolicy,
    max_packet_size: usize,
    queue: RequestQueue,
    in_flight: Option<InFlight>,
    reassembler: FrameReassembler,
    timeout_retries: u32,
    busy_retries: u32,
    mismatch_retries: u32,
    timers: Timers,
}

impl Exchange {
    pub fn new(strategy: ProtocolStrategy, policy: RetryPolicy, max_packet_size: usize) -> Self {
        Self {
            strategy,
            policy,
            max_packet_size: max_packet_size.max(1),
            queue: RequestQueue::new(),
            in_flight: None,
            reassembler: FrameReassembler::new(),
            timeout_retries: 0,
            busy_retries: 0,
            mismatch_retries: 0,
            timers: Timers::default(),
        }
    }

    pub fn strategy(&self) -> &ProtocolStrategy {
        &self.strategy
    }

    /// Requests waiting behind the in-flight one.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Whether a request currently occupies the in-flight slot.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Command byte of the in-flight request.
    pub fn in_flight_command(&self) -> Option<u8> {
        self.in_flight.as_ref().map(|f| f.request.command_byte())
    }

    pub fn busy_retries(&self) -> u32 {
        self.busy_retries
    }

    pub fn mismatch_retries(&self) -> u32 {
        self.mismatch_retries
    }

    pub fn timeout_retries(&self) -> u32 {
        self.timeout_retries
    }

    /// Whether a timer of `kind` is armed.
    pub fn timer_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    // ── Inputs ────────────────────────────────────────────────────────────────

    /// Queues a request and dispatches it if the slot is free.
    pub fn enqueue(&mut self, request: Request, out: &mut Vec<Action>) {
        trace!(
            command = format_args!("0x{:02X}", request.command_byte()),
            priority = ?request.priority,
            "request queued"
        );
        self.queue.push(request);
        self.dispatch(out);
    }

    /// Reports the outcome of the last [`Action::Write`].
    pub fn write_completed(&mut self, success: bool, out: &mut Vec<Action>) {
        let policy = self.policy;
        let Some(flight) = self.in_flight.as_mut() else {
            return;
        };
        if flight.phase != Phase::Writing {
            return;
        }

        if !success {
            warn!(
                command = format_args!("0x{:02X}", flight.request.command_byte()),
                "transport write failed; treating as timeout"
            );
            flight.phase = Phase::AwaitingAnswer;
            self.arm(TimerKind::Response, Duration::ZERO, out);
            return;
        }

        if let Some(cursor) = &flight.chunks {
            debug!(
                chunk = cursor.sent(),
                of = cursor.len(),
                "chunk written; waiting for link acknowledgement"
            );
            flight.phase = Phase::AwaitingAck;
        } else {
            flight.phase = Phase::AwaitingAnswer;
            self.arm(TimerKind::Response, policy.response_timeout, out);
        }
    }

    /// The link acknowledged the last chunk written.
    pub fn write_acknowledged(&mut self, out: &mut Vec<Action>) {
        let policy = self.policy;
        let Some(flight) = self.in_flight.as_mut() else {
            debug!("write acknowledgement with nothing in flight ignored");
            return;
        };
        let (Phase::AwaitingAck, Some(cursor)) = (flight.phase, flight.chunks.as_mut()) else {
            debug!("write acknowledgement with no chunk outstanding ignored");
            return;
        };

        if cursor.is_finished() {
            flight.phase = Phase::AwaitingAnswer;
            self.arm(TimerKind::Response, policy.response_timeout, out);
            return;
        }
        if let Some(chunk) = cursor.next_chunk() {
            out.push(Action::Write(chunk.to_vec()));
            trace!(chunk = cursor.sent(), of = cursor.len(), "writing next chunk");
            flight.phase = Phase::Writing;
        }
    }

    /// Feeds one notification fragment from the link.
    pub fn fragment_received(&mut self, fragment: &[u8], out: &mut Vec<Action>) {
        trace!(bytes = %HexBytes(fragment), "fragment received");
        if let Some(frame) = self.reassembler.feed(fragment) {
            self.frame_received(frame, out);
        }
    }

    /// A timer armed through [`Action::ArmTimer`] elapsed.
    pub fn timer_fired(&mut self, kind: TimerKind, generation: u64, out: &mut Vec<Action>) {
        if !self.timers.take(kind, generation) {
            trace!(?kind, generation, "stale timer ignored");
            return;
        }
        self.retry(kind, out);
    }

    /// Drops all session state: timers, in-flight request, queued requests,
    /// counters and the reassembly buffer.
    pub fn disconnect(&mut self) {
        debug!(
            queued = self.queue.len(),
            in_flight = self.in_flight.is_some(),
            "exchange reset on disconnect"
        );
        self.timers.cancel_all();
        self.in_flight = None;
        self.queue.clear();
        self.reassembler.reset();
        self.timeout_retries = 0;
        self.busy_retries = 0;
        self.mismatch_retries = 0;
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn arm(&mut self, kind: TimerKind, delay: Duration, out: &mut Vec<Action>) {
        let generation = self.timers.arm(kind);
        out.push(Action::ArmTimer {
            kind,
            delay,
            generation,
        });
    }

    /// Starts the next queued request if the slot is free.
    fn dispatch(&mut self, out: &mut Vec<Action>) {
        if self.in_flight.is_some() {
            return;
        }
        let Some(request) = self.queue.pop() else {
            return;
        };
        self.reassembler.reset();

        let chunked =
            self.strategy.chunks_requests() && request.payload.len() > self.max_packet_size;
        debug!(
            command = format_args!("0x{:02X}", request.command_byte()),
            len = request.payload.len(),
            chunked,
            "dispatching request"
        );
        trace!(bytes = %HexBytes(&request.payload), "request");

        let chunks = if chunked {
            let mut cursor = ChunkCursor::new(&request.payload, self.max_packet_size);
            if let Some(first) = cursor.next_chunk() {
                out.push(Action::Write(first.to_vec()));
            }
            Some(cursor)
        } else {
            out.push(Action::Write(request.payload.clone()));
            None
        };

        self.in_flight = Some(InFlight {
            request,
            chunks,
            phase: Phase::Writing,
        });
    }

    fn frame_received(&mut self, frame: Vec<u8>, out: &mut Vec<Action>) {
        let Some(flight) = self.in_flight.as_mut() else {
            debug!(frame = %HexBytes(&frame), "frame with no request in flight dropped");
            return;
        };

        let outcome = classify(&self.strategy, &flight.request.payload, &frame);
        if outcome == Outcome::Echo {
            trace!("request echo ignored");
            return;
        }

        // Any real answer proves the link is alive, and it supersedes
        // whatever retry was pending.
        self.timeout_retries = 0;
        self.timers.cancel_all();

        match outcome {
            Outcome::Echo => {}
            Outcome::Busy => {
                debug!("machine busy; retry scheduled");
                flight.phase = Phase::RetryPending;
                self.arm(TimerKind::Busy, self.policy.busy_delay, out);
            }
            Outcome::Mismatch if self.strategy.retries_mismatches() => {
                self.busy_retries = 0;
                debug!(
                    request = format_args!("0x{:02X}", flight.request.command_byte()),
                    answer = format_args!("0x{:02X}", frame.get(ID_INDEX).copied().unwrap_or_default()),
                    "answer does not match request; retry scheduled"
                );
                flight.phase = Phase::RetryPending;
                self.arm(TimerKind::Mismatch, self.policy.mismatch_delay, out);
            }
            Outcome::Mismatch | Outcome::Matched => {
                // Relay answers arrive unordered, so a mismatch there releases
                // the slot and is delivered like a match.
                self.busy_retries = 0;
                self.mismatch_retries = 0;
                self.in_flight = None;
                self.deliver(&frame, out);
                self.dispatch(out);
            }
        }
    }

    /// Validates and decodes a correlated frame.
    fn deliver(&self, frame: &[u8], out: &mut Vec<Action>) {
        let answer = frame.get(ID_INDEX).copied().unwrap_or_default();
        if !validate_checksum(&self.strategy, frame) {
            warn!(
                answer = format_args!("0x{answer:02X}"),
                frame = %HexBytes(frame),
                "checksum failed"
            );
            out.push(Action::Emit(EngineEvent::ChecksumKo { answer }));
            return;
        }
        match decode(&self.strategy, frame) {
            Ok(Some(event)) => {
                debug!(event = event.name(), "answer decoded");
                out.push(Action::Emit(EngineEvent::Decoded(event)));
            }
            Ok(None) => {}
            Err(e) => error!(
                answer = format_args!("0x{answer:02X}"),
                "could not decode answer: {e}"
            ),
        }
    }

    /// Shared body of the three retry timers: re-enqueue at HIGH, or give up
    /// once the counter for `kind` has reached its limit.
    fn retry(&mut self, kind: TimerKind, out: &mut Vec<Action>) {
        self.reassembler.reset();
        let Some(flight) = self.in_flight.take() else {
            return;
        };
        let (counter, max) = match kind {
            TimerKind::Response => (&mut self.timeout_retries, self.policy.max_timeout_retries),
            TimerKind::Busy => (&mut self.busy_retries, self.policy.max_busy_retries),
            TimerKind::Mismatch => (&mut self.mismatch_retries, self.policy.max_mismatch_retries),
        };

        let command = flight.request.command_byte();
        if *counter >= max {
            *counter = 0;
            error!(
                command = format_args!("0x{command:02X}"),
                ?kind,
                "retries exhausted"
            );
            out.push(Action::Emit(EngineEvent::RequestTimeout { command }));
        } else {
            *counter += 1;
            warn!(
                command = format_args!("0x{command:02X}"),
                ?kind,
                attempt = *counter,
                "retrying request"
            );
            let mut request = flight.request;
            request.priority = Priority::High;
            self.queue.push(request);
        }
        self.dispatch(out);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
