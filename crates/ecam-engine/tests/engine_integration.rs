//! Integration tests for the engine task driven through its public handle.
//!
//! # Purpose
//!
//! These tests run a real engine task against the in-memory
//! [`RecordingChannel`] and, where an answering machine is needed, the
//! [`SimulatedMachine`].  The Tokio clock is paused, so retry delays and
//! answer timeouts elapse instantly and deterministically.  They verify:
//!
//! - A request/answer round trip over fragmented notifications.
//! - Chunked writes paced by write acknowledgements.
//! - The answer timeout boundary and the busy retry budget.
//! - Priority ordering of queued requests.

use std::sync::Arc;
use std::time::Duration;

use ecam_core::domain::{NameKind, NameRecord};
use ecam_core::protocol::{
    build_queued_request, build_request, split_into_chunks, Command, DecodedEvent, LinkKind,
    Priority, ProtocolStrategy, Request,
};
use ecam_engine::infrastructure::simulator::SimulatedMachine;
use ecam_engine::infrastructure::transport::RecordingChannel;
use ecam_engine::{spawn_engine, ChannelListener, EngineEvent, EngineHandle, RetryPolicy};
use tokio::sync::mpsc::UnboundedReceiver;

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Rig {
    handle: EngineHandle,
    writes: UnboundedReceiver<Vec<u8>>,
    events: UnboundedReceiver<EngineEvent>,
}

fn rig(strategy: ProtocolStrategy) -> Rig {
    let link = strategy.link;
    let (channel, writes) = RecordingChannel::new(link, 20);
    let (listener, events) = ChannelListener::new();
    let (handle, _join) = spawn_engine(
        strategy,
        RetryPolicy::for_strategy(&strategy),
        channel,
        Arc::new(listener),
    );
    Rig {
        handle,
        writes,
        events,
    }
}

/// Connects the rig's writes to a simulated machine.
fn attach_machine(rig: &mut Rig, strategy: ProtocolStrategy) {
    let (tx, writes) = tokio::sync::mpsc::unbounded_channel();
    let mut engine_writes = std::mem::replace(&mut rig.writes, writes);
    let handle = rig.handle.clone();
    let mut machine = SimulatedMachine::new(strategy);
    tokio::spawn(async move {
        while let Some(packet) = engine_writes.recv().await {
            let _ = tx.send(packet.clone());
            let _ = handle.write_acknowledged();
            if let Some(answer) = machine.receive(&packet) {
                for fragment in split_into_chunks(&answer, 20) {
                    let _ = handle.fragment_received(&fragment);
                }
            }
        }
    });
}

fn command(strategy: &ProtocolStrategy, command: Command) -> Request {
    build_queued_request(strategy, &command).expect("valid command")
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

// ── Round trip ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_parameter_write_and_read_round_trip_through_simulator() {
    // Arrange
    let s = ProtocolStrategy::v2_ble();
    let mut rig = rig(s);
    attach_machine(&mut rig, s);

    // Act
    rig.handle
        .enqueue(command(
            &s,
            Command::WriteParameter {
                address: 50,
                value: 3,
            },
        ))
        .unwrap();
    rig.handle
        .enqueue(command(
            &s,
            Command::ReadParameters {
                address: 50,
                count: 1,
            },
        ))
        .unwrap();
    let first = rig.events.recv().await.expect("write answer");
    let second = rig.events.recv().await.expect("read answer");

    // Assert
    assert!(matches!(
        first,
        EngineEvent::Decoded(DecodedEvent::ParameterWritten(w)) if w.id == 50 && w.success
    ));
    assert!(matches!(
        second,
        EngineEvent::Decoded(DecodedEvent::ParametersRead(ref p)) if p[0].as_u32() == 3
    ));
}

// ── Chunking ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_long_request_is_chunked_and_paced_by_acks() {
    // Arrange: two profile names on V2 make a 50-byte request.
    let s = ProtocolStrategy::v2_ble();
    let mut rig = rig(s);
    let request = command(
        &s,
        Command::WriteNames {
            kind: NameKind::Profile,
            first: 1,
            records: vec![NameRecord::new("Anna", 1), NameRecord::new("Luca", 2)],
        },
    );

    // Act / Assert: nothing beyond the first chunk until it is acknowledged.
    rig.handle.enqueue(request.clone()).unwrap();
    settle().await;
    let mut chunks = vec![rig.writes.try_recv().expect("first chunk")];
    assert!(rig.writes.try_recv().is_err());

    for _ in 0..2 {
        rig.handle.write_acknowledged().unwrap();
        settle().await;
        chunks.push(rig.writes.try_recv().expect("next chunk"));
    }

    assert_eq!(chunks.iter().map(Vec::len).collect::<Vec<_>>(), vec![20, 20, 10]);
    assert_eq!(chunks.concat(), request.payload);
}

// ── Timeouts ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_v2_answer_timeout_fires_at_one_second() {
    // Arrange
    let s = ProtocolStrategy::v2_ble();
    let mut rig = rig(s);
    rig.handle
        .enqueue(command(
            &s,
            Command::ReadParameters {
                address: 1,
                count: 1,
            },
        ))
        .unwrap();
    settle().await;
    let original = rig.writes.try_recv().expect("initial write");

    // Act / Assert
    tokio::time::advance(Duration::from_millis(999)).await;
    settle().await;
    assert!(rig.writes.try_recv().is_err(), "no retry before 1 s");

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(rig.writes.try_recv().expect("retry"), original);
}

#[tokio::test(start_paused = true)]
async fn test_machine_busy_on_every_attempt_exhausts_busy_budget() {
    // Arrange: the simulator answers busy to anything it does not model.
    let s = ProtocolStrategy::v1();
    let mut rig = rig(s);
    attach_machine(&mut rig, s);

    // Act
    rig.handle.enqueue(command(&s, Command::TurnOn)).unwrap();
    let event = rig.events.recv().await.expect("terminal event");

    // Assert: the first attempt plus ten retries.
    let turn_on = build_request(&s, &Command::TurnOn).unwrap();
    assert_eq!(event, EngineEvent::RequestTimeout { command: turn_on[2] });
    let mut attempts = 0;
    while rig.writes.try_recv().is_ok() {
        attempts += 1;
    }
    assert_eq!(attempts, 11);
}

// ── Priority ──────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_high_priority_request_overtakes_queued_normal_ones() {
    // Arrange: occupy the slot so the rest queue up.
    let s = ProtocolStrategy::v1();
    let mut rig = rig(s);
    let read = |address| {
        command(
            &s,
            Command::ReadParameters {
                address,
                count: 1,
            },
        )
    };
    rig.handle.enqueue(read(1)).unwrap();
    rig.handle.enqueue(read(2)).unwrap();
    let mut urgent = read(3);
    urgent.priority = Priority::High;
    rig.handle.enqueue(urgent.clone()).unwrap();
    settle().await;
    rig.writes.try_recv().expect("first request");
    attach_machine(&mut rig, s);

    // Act: answer the in-flight request; the queue drains behind it.
    let machine_answer = SimulatedMachine::new(s).answer(&read(1).payload);
    rig.handle.fragment_received(&machine_answer).unwrap();
    settle().await;

    // Assert
    assert_eq!(rig.writes.recv().await.expect("next write"), urgent.payload);
    assert_eq!(rig.writes.recv().await.expect("last write"), read(2).payload);
}
