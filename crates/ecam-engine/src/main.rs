//! `ecam-sim`: drives the protocol engine against a simulated machine.
//!
//! Usage: `ecam-sim [model] [config.toml]`
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- engine.toml or defaults
//!  └─ MachineSession::start()  -- spawns the engine task
//!  └─ simulator task           -- answers every write the engine makes
//!  └─ event loop               -- logs decoded answers until the machine is ready
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ecam_core::domain::MonitorBlock;
use ecam_core::protocol::{split_into_chunks, LinkKind};
use ecam_core::DecodedEvent;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ecam_engine::infrastructure::machine_defaults::{CapabilityLookup, MachineDefaults};
use ecam_engine::infrastructure::simulator::SimulatedMachine;
use ecam_engine::infrastructure::storage::config::{default_config_path, load_config};
use ecam_engine::infrastructure::transport::RecordingChannel;
use ecam_engine::{ChannelListener, DiscoveredMachine, EngineEvent, EngineHandle, MachineSession};

const DEFAULT_MODEL: &str = "ecam-v2-ble";
const SIM_ADDRESS: &str = "SIM-0001";
const POLL_INTERVAL: Duration = Duration::from_millis(250);
const WATER_HARDNESS: u16 = 50;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let model = args.next().unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let config_path = match args.next() {
        Some(path) => Some(PathBuf::from(path)),
        None => default_config_path().ok(),
    };
    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Default::default(),
    };

    // Structured logging.  `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.engine.log_level)),
        )
        .init();

    info!(%model, "ecam-sim starting");

    let defaults = MachineDefaults::builtin();
    let caps = defaults
        .capabilities(&model)
        .with_context(|| format!("unknown model {model}"))?;

    let (channel, writes) = RecordingChannel::new(caps.link, config.engine.ble_chunk_size);
    let (listener, mut events) = ChannelListener::new();
    let (mut session, engine_task) =
        MachineSession::start(&defaults, &model, &config, channel, Arc::new(listener))?;

    // ── Simulated machine ─────────────────────────────────────────────────────
    let machine = SimulatedMachine::new(*session.strategy());
    let sim_task = tokio::spawn(run_machine(
        machine,
        writes,
        session.engine().clone(),
        caps.link,
        config.engine.ble_chunk_size,
    ));

    // ── Connect ───────────────────────────────────────────────────────────────
    session.start_scan()?;
    session.machine_found(DiscoveredMachine {
        name: caps.model.clone(),
        address: SIM_ADDRESS.to_string(),
    })?;
    session.scan_finished()?;
    session.connect(SIM_ADDRESS)?;

    session.write_parameter(WATER_HARDNESS, 3)?;
    session.read_parameters(WATER_HARDNESS, 1)?;

    let block = if session.strategy().is_v2() {
        MonitorBlock::Data2
    } else {
        MonitorBlock::Data1
    };
    let mut poll = tokio::time::interval(POLL_INTERVAL);

    // ── Event loop ────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            _ = poll.tick() => session.request_monitor(block)?,
            event = events.recv() => match event {
                Some(EngineEvent::Decoded(DecodedEvent::MonitorData(snapshot))) => {
                    info!(
                        state = ?snapshot.machine_state(),
                        progress = ?snapshot.progress(),
                        "monitor"
                    );
                    if snapshot.is_ready_to_work() {
                        info!("machine ready");
                        break;
                    }
                }
                Some(EngineEvent::Decoded(decoded)) => info!(event = decoded.name(), "{decoded:?}"),
                Some(EngineEvent::RequestTimeout { command }) => {
                    warn!(command = format_args!("0x{command:02X}"), "request timed out");
                }
                Some(other) => info!("{other:?}"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    session.disconnect()?;
    sim_task.abort();
    let _ = sim_task.await;
    drop(session);
    if let Err(e) = engine_task.await {
        error!("engine task failed: {e}");
    }
    info!("ecam-sim stopped");
    Ok(())
}

/// Answers every packet the engine writes, acknowledging BLE writes and
/// delivering answers in notification-sized fragments.
async fn run_machine(
    mut machine: SimulatedMachine,
    mut writes: mpsc::UnboundedReceiver<Vec<u8>>,
    engine: EngineHandle,
    link: LinkKind,
    fragment_size: usize,
) {
    while let Some(packet) = writes.recv().await {
        if link == LinkKind::Ble && engine.write_acknowledged().is_err() {
            break;
        }
        let Some(answer) = machine.receive(&packet) else {
            continue;
        };
        let fragments = match link {
            LinkKind::Ble => split_into_chunks(&answer, fragment_size),
            LinkKind::Wifi => vec![answer],
        };
        for fragment in fragments {
            if engine.fragment_received(&fragment).is_err() {
                return;
            }
        }
    }
}
