//! Smart-home controller entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspBoard        ThreadLauncher   MqttLink      NvsAdapter     │
//! │  (BoardPort)     (WorkerLauncher) (LinkPort)    (ConfigPort)   │
//! │  LogEventSink                                                  │
//! │  (EventSink)                                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Supervisor · DeviceStateTable · command decoder       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  LinkEngine (this thread) · one worker thread per module       │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};

use smarthome::adapters::hardware::EspBoard;
use smarthome::adapters::launcher::ThreadLauncher;
use smarthome::adapters::log_sink::LogEventSink;
use smarthome::adapters::mqtt::MqttLink;
use smarthome::adapters::nvs::NvsAdapter;
use smarthome::adapters::wifi;
use smarthome::app::ports::{BoardPort, ConfigPort, LinkPort};
use smarthome::app::service::Supervisor;
use smarthome::config::SystemConfig;
use smarthome::drivers::{hw_init, watchdog::Watchdog};
use smarthome::error::Error;
use smarthome::link::LinkEngine;
use smarthome::state::SharedState;

const WATCHDOG_TIMEOUT_MS: u32 = 5000;

/// Never raised on hardware; the network loop runs until reset.
static STOP: AtomicBool = AtomicBool::new(false);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("Smart-home controller v{}", env!("CARGO_PKG_VERSION"));

    hw_init::init_peripherals().map_err(|e| anyhow!("HAL init failed: {e}"))?;
    let watchdog = Watchdog::new(WATCHDOG_TIMEOUT_MS);

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take().ok();

    let config = match NvsAdapter::new().and_then(|nvs| nvs.load()).map_err(Error::from) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("{}; using default config", e);
            SystemConfig::default()
        }
    };
    let config = Arc::new(config);

    // ── 3. Network ────────────────────────────────────────────
    // Keeps the station alive for the program lifetime.
    let _wifi = match wifi::connect(peripherals.modem, sys_loop, nvs_partition, &config.link) {
        Ok(wifi) => Some(wifi),
        Err(e) => {
            warn!("{}; running offline", e);
            None
        }
    };

    let mut link = MqttLink::new(config.link.clone());
    if let Err(e) = link.connect() {
        warn!("{}; reports will fail until the broker is reachable", e);
    }

    // ── 4. Supervisor ─────────────────────────────────────────
    let shared = Arc::new(SharedState::new());
    let board: Arc<dyn BoardPort> = Arc::new(EspBoard::new());
    let launcher = ThreadLauncher::new(config.clone(), shared.clone(), board);
    let mut supervisor = Supervisor::new(launcher, shared.clone(), config.command_policy);
    let mut sink = LogEventSink::new();
    supervisor.boot(&mut sink);

    // ── 5. Network loop ───────────────────────────────────────
    info!("System ready. Entering network loop.");
    let mut engine = LinkEngine::new(link, shared, &config);
    engine.run(
        &mut supervisor,
        &mut sink,
        Duration::from_millis(config.link_poll_ms.into()),
        &STOP,
        || watchdog.feed(),
    );

    supervisor.shutdown(&mut sink);
    engine.link_mut().disconnect();
    Ok(())
}
