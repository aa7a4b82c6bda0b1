//! Module supervisor, the orchestration core.
//!
//! [`Supervisor`] owns the module registry and turns decoded commands into
//! worker start/stop calls and gated device-level writes. Worker lifecycles
//! flow through the [`WorkerLauncher`] port and every outcome is reported
//! through an [`EventSink`] passed at the call site.
//!
//! ```text
//!  payload ──▶ decode ──▶ ┌───────────────────────────┐ ──▶ EventSink
//!                         │        Supervisor         │
//!  WorkerLauncher ◀───────│ registry · device table   │
//!                         └───────────────────────────┘
//! ```
//!
//! The supervisor runs on the network worker's thread only; it is never
//! shared, so the registry needs no locking.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::error::{DecodeError, ModuleError};
use crate::state::{
    DeviceId, DeviceLevel, DeviceSet, ModuleId, ModuleRegistry, ModuleSet, SharedState, DEVICE_COUNT,
    MODULE_COUNT,
};

use super::commands::{self, Command, CommandPolicy};
use super::events::AppEvent;
use super::ports::{EventSink, WorkerLauncher};

// ───────────────────────────────────────────────────────────────
// Reports
// ───────────────────────────────────────────────────────────────

/// Result of applying a `ModuleControl` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleReport {
    pub started: ModuleSet,
    pub stopped: ModuleSet,
    /// Workers found dead during reconciliation and reaped.
    pub exited: ModuleSet,
    pub failures: heapless::Vec<ModuleError, MODULE_COUNT>,
}

impl ModuleReport {
    /// True if any module's presence changed at the command's request.
    pub fn changed(&self) -> bool {
        !self.started.is_empty() || !self.stopped.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of applying a `DeviceControl` command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceReport {
    /// Devices whose level was overwritten with a different value.
    pub changed: DeviceSet,
    /// Devices skipped because their owner is not running.
    pub ignored: DeviceSet,
    /// Devices refused by a strict command policy.
    pub rejected: DeviceSet,
}

/// What a single command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Modules(ModuleReport),
    PublishRequested,
    Devices(DeviceReport),
}

// ───────────────────────────────────────────────────────────────
// Supervisor
// ───────────────────────────────────────────────────────────────

pub struct Supervisor<L: WorkerLauncher> {
    launcher: L,
    registry: ModuleRegistry<L::Handle>,
    shared: Arc<SharedState>,
    policy: CommandPolicy,
}

impl<L: WorkerLauncher> Supervisor<L> {
    /// Construct with every module Stopped. Call [`boot`](Self::boot) next.
    pub fn new(launcher: L, shared: Arc<SharedState>, policy: CommandPolicy) -> Self {
        Self {
            launcher,
            registry: ModuleRegistry::new(),
            shared,
            policy,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: every device Disconnected, the network link pinned as
    /// resident, the display started.
    ///
    /// A display failure is reported but does not stop the boot.
    pub fn boot(&mut self, sink: &mut impl EventSink) {
        for id in DeviceId::ALL {
            self.shared.devices.set(id, DeviceLevel::DISCONNECTED);
        }
        self.registry.mark_resident(ModuleId::NetworkLink);

        let mut report = ModuleReport::default();
        self.start_module(ModuleId::Display, &mut report, sink);

        let present = self.registry.present();
        info!("Supervisor booted, {} module(s) present", present.len());
        sink.emit(&AppEvent::Booted(present));
    }

    /// Stop every running worker, for an orderly power-down.
    pub fn shutdown(&mut self, sink: &mut impl EventSink) -> ModuleReport {
        let mut report = ModuleReport::default();
        for id in self.registry.running().iter() {
            self.stop_module(id, &mut report, sink);
        }
        report
    }

    // ── Command path ──────────────────────────────────────────

    /// Decode one inbound payload with the configured policy and apply it.
    ///
    /// A decode failure changes nothing.
    pub fn handle_payload(&mut self, bytes: &[u8], sink: &mut impl EventSink) -> Result<Outcome, DecodeError> {
        match commands::decode(bytes, self.policy) {
            Ok(cmd) => Ok(self.apply(cmd, sink)),
            Err(e) => {
                warn!("Rejected command ({} bytes): {}", bytes.len(), e);
                sink.emit(&AppEvent::CommandRejected(e));
                Err(e)
            }
        }
    }

    pub fn apply(&mut self, cmd: Command, sink: &mut impl EventSink) -> Outcome {
        match cmd {
            Command::ModuleControl(desired) => Outcome::Modules(self.apply_modules(&desired, sink)),
            Command::PublishRequest => {
                self.request_publish(sink);
                Outcome::PublishRequested
            }
            Command::DeviceControl(levels) => Outcome::Devices(self.apply_devices(&levels, sink)),
        }
    }

    /// Bring the set of running modules in line with `desired`.
    ///
    /// Dead workers are reaped first so their slots compare as absent. Each
    /// module is then handled independently; one failure never blocks the
    /// others.
    pub fn apply_modules(&mut self, desired: &[bool; MODULE_COUNT], sink: &mut impl EventSink) -> ModuleReport {
        let mut report = ModuleReport::default();
        report.exited = self.reconcile(sink);

        for id in ModuleId::ALL {
            let want = desired[id.index()];
            if want == self.registry.is_present(id) {
                continue;
            }
            if id.is_supervisor_exempt() {
                debug!("{} is not commandable, skipping", id);
                sink.emit(&AppEvent::ExemptModuleSkipped(id));
                continue;
            }
            if want {
                self.start_module(id, &mut report, sink);
            } else {
                self.stop_module(id, &mut report, sink);
            }
        }
        report
    }

    /// Overwrite the level of every device whose owner is running.
    ///
    /// Disconnected devices are skipped silently. Under a strict policy,
    /// out-of-range levels and the Disconnected sentinel are refused.
    pub fn apply_devices(&mut self, levels: &[DeviceLevel; DEVICE_COUNT], sink: &mut impl EventSink) -> DeviceReport {
        let mut report = DeviceReport::default();
        let table = &self.shared.devices;

        for id in DeviceId::ALL {
            let level = levels[id.index()];
            if self.policy.reject_invalid_levels && (!level.is_valid() || level.is_disconnected()) {
                report.rejected.insert(id);
                continue;
            }
            let before = table.get(id);
            if table.command(id, level) {
                if before != level {
                    report.changed.insert(id);
                }
            } else {
                report.ignored.insert(id);
            }
        }

        if !report.rejected.is_empty() {
            warn!("DeviceControl: refused {} invalid level(s)", report.rejected.len());
        }
        debug!(
            "DeviceControl: {} changed, {} ignored",
            report.changed.len(),
            report.ignored.len()
        );
        sink.emit(&AppEvent::DevicesChanged {
            changed: report.changed,
            ignored: report.ignored,
            rejected: report.rejected,
        });
        report
    }

    /// Ask the network worker to publish at its next poll.
    pub fn request_publish(&mut self, sink: &mut impl EventSink) {
        self.shared.telemetry.request_publish();
        sink.emit(&AppEvent::PublishRequested);
    }

    /// Reap workers that exited without being stopped.
    ///
    /// Returns the modules moved to Stopped.
    pub fn reconcile(&mut self, sink: &mut impl EventSink) -> ModuleSet {
        let mut exited = ModuleSet::EMPTY;
        for id in self.registry.running().iter() {
            let alive = self.registry.handle(id).is_some_and(|h| self.launcher.is_alive(h));
            if alive {
                continue;
            }
            let Some(handle) = self.registry.take_running(id) else {
                continue;
            };
            match self.launcher.stop(id, handle) {
                Ok(()) => {
                    warn!("{} worker exited unexpectedly, reaped", id);
                    exited.insert(id);
                    sink.emit(&AppEvent::ModuleExited(id));
                }
                Err((handle, e)) => {
                    error!("Reaping {} failed: {}", id, e);
                    let _ = self.registry.set_running(id, handle);
                    sink.emit(&AppEvent::ModuleStopFailed(id));
                }
            }
        }
        exited
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn registry(&self) -> &ModuleRegistry<L::Handle> {
        &self.registry
    }

    pub fn present(&self) -> ModuleSet {
        self.registry.present()
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    pub fn policy(&self) -> CommandPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: CommandPolicy) {
        self.policy = policy;
    }

    // ── Internal ──────────────────────────────────────────────

    fn start_module(&mut self, id: ModuleId, report: &mut ModuleReport, sink: &mut impl EventSink) {
        match self.launcher.start(id) {
            Ok(handle) => {
                if let Err(handle) = self.registry.set_running(id, handle) {
                    // Slot was not Stopped; undo the start rather than leak a worker.
                    error!("{} started while already present, stopping duplicate", id);
                    if let Err((_, e)) = self.launcher.stop(id, handle) {
                        error!("{}", e);
                        let _ = report.failures.push(e);
                        sink.emit(&AppEvent::ModuleStopFailed(id));
                    }
                    return;
                }
                info!("{} started", id);
                report.started.insert(id);
                sink.emit(&AppEvent::ModuleStarted(id));
            }
            Err(e) => {
                error!("{}", e);
                let _ = report.failures.push(e);
                sink.emit(&AppEvent::ModuleStartFailed(id));
            }
        }
    }

    fn stop_module(&mut self, id: ModuleId, report: &mut ModuleReport, sink: &mut impl EventSink) {
        let Some(handle) = self.registry.take_running(id) else {
            return;
        };
        match self.launcher.stop(id, handle) {
            Ok(()) => {
                info!("{} stopped", id);
                report.stopped.insert(id);
                sink.emit(&AppEvent::ModuleStopped(id));
            }
            Err((handle, e)) => {
                error!("{}", e);
                let _ = self.registry.set_running(id, handle);
                let _ = report.failures.push(e);
                sink.emit(&AppEvent::ModuleStopFailed(id));
            }
        }
    }
}
