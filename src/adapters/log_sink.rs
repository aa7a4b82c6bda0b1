//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::state::{DeviceId, DeviceSet};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn device_names(set: DeviceSet) -> heapless::Vec<DeviceId, 9> {
    set.iter().collect()
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Booted(present) => {
                let names: heapless::Vec<_, 7> = present.iter().map(|m| m.name()).collect();
                info!("BOOT   | present={:?}", names);
            }
            AppEvent::ModuleStarted(id) => info!("MODULE | {} started", id),
            AppEvent::ModuleStopped(id) => info!("MODULE | {} stopped", id),
            AppEvent::ModuleStartFailed(id) => warn!("MODULE | {} failed to start", id),
            AppEvent::ModuleStopFailed(id) => warn!("MODULE | {} failed to stop", id),
            AppEvent::ModuleExited(id) => warn!("MODULE | {} exited unexpectedly", id),
            AppEvent::ExemptModuleSkipped(id) => info!("MODULE | {} is not supervised, skipped", id),
            AppEvent::DevicesChanged {
                changed,
                ignored,
                rejected,
            } => {
                info!(
                    "DEVICE | changed={:?} ignored={:?} rejected={:?}",
                    device_names(*changed),
                    device_names(*ignored),
                    device_names(*rejected),
                );
            }
            AppEvent::PublishRequested => info!("REPORT | publish requested"),
            AppEvent::ReportPublished { bytes, forced } => {
                info!("REPORT | published {} bytes{}", bytes, if *forced { " (on demand)" } else { "" });
            }
            AppEvent::ReportFailed(e) => warn!("REPORT | failed: {}", e),
            AppEvent::CommandRejected(e) => warn!("REJECT | {}", e),
        }
    }
}
