//! Process-wide shared state: the device state table and the latest readings.

pub mod devices;
pub mod modules;
pub mod telemetry;

pub use devices::{DeviceId, DeviceLevel, DeviceSet, DeviceStateTable, DEVICE_COUNT};
pub use modules::{ModuleId, ModuleRegistry, ModuleSet, ModuleState, MODULE_COUNT};
pub use telemetry::{Readings, Telemetry};

/// State shared by the supervisor, every worker and the network task.
///
/// Held behind an `Arc`; all fields synchronise internally.
#[derive(Debug, Default)]
pub struct SharedState {
    pub devices: DeviceStateTable,
    pub telemetry: Telemetry,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }
}
