//! Outbound application events.
//!
//! The [`Supervisor`](super::service::Supervisor) and the
//! [`LinkEngine`](crate::link::LinkEngine) emit these through the
//! [`EventSink`](super::ports::EventSink) port.

use crate::error::{DecodeError, LinkError};
use crate::state::{DeviceSet, ModuleId, ModuleSet};

/// Structured events emitted by the orchestration core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Boot finished; carries the modules present afterwards.
    Booted(ModuleSet),

    /// A module worker was started and has claimed its devices.
    ModuleStarted(ModuleId),

    /// A module worker was stopped and has released its devices.
    ModuleStopped(ModuleId),

    ModuleStartFailed(ModuleId),

    ModuleStopFailed(ModuleId),

    /// A worker exited without being asked to and was reaped.
    ModuleExited(ModuleId),

    /// A command asked to change a module the supervisor never touches.
    ExemptModuleSkipped(ModuleId),

    /// A DeviceControl command was applied.
    DevicesChanged {
        changed: DeviceSet,
        ignored: DeviceSet,
        rejected: DeviceSet,
    },

    /// The next network poll will publish a report.
    PublishRequested,

    /// An inbound payload could not be decoded; nothing changed.
    CommandRejected(DecodeError),

    /// A telemetry report went out. `forced` is true for on-demand reports.
    ReportPublished { bytes: usize, forced: bool },

    ReportFailed(LinkError),
}
