//! Mock adapters for integration tests.
//!
//! [`FakeLauncher`] claims and releases devices exactly like the real
//! thread launcher but runs no threads; failures and crashes are scripted.
//! [`RecordingSink`] keeps every emitted event for assertions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use smarthome::app::events::AppEvent;
use smarthome::app::ports::{EventSink, WorkerLauncher};
use smarthome::app::service::Supervisor;
use smarthome::app::commands::CommandPolicy;
use smarthome::error::ModuleError;
use smarthome::state::{ModuleId, ModuleSet, SharedState};

// ── FakeLauncher ──────────────────────────────────────────────

#[derive(Debug)]
pub struct FakeHandle {
    pub id: ModuleId,
    alive: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchCall {
    Start(ModuleId),
    Stop(ModuleId),
}

pub struct FakeLauncher {
    shared: Arc<SharedState>,
    pub calls: Vec<LaunchCall>,
    pub fail_start: ModuleSet,
    pub fail_stop: ModuleSet,
    alive: [Option<Arc<AtomicBool>>; 7],
}

#[allow(dead_code)]
impl FakeLauncher {
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self {
            shared,
            calls: Vec::new(),
            fail_start: ModuleSet::EMPTY,
            fail_stop: ModuleSet::EMPTY,
            alive: Default::default(),
        }
    }

    /// Simulate the worker thread of `id` dying on its own.
    pub fn crash(&self, id: ModuleId) {
        if let Some(flag) = &self.alive[id.index()] {
            flag.store(false, Ordering::Release);
        }
    }

    pub fn starts(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, LaunchCall::Start(_))).count()
    }

    pub fn stops(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, LaunchCall::Stop(_))).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl WorkerLauncher for FakeLauncher {
    type Handle = FakeHandle;

    fn start(&mut self, id: ModuleId) -> Result<FakeHandle, ModuleError> {
        self.calls.push(LaunchCall::Start(id));
        if self.fail_start.contains(id) {
            return Err(ModuleError::StartFailed(id));
        }
        self.shared.telemetry.reset_for(id);
        self.shared.devices.claim(id);
        let alive = Arc::new(AtomicBool::new(true));
        self.alive[id.index()] = Some(alive.clone());
        Ok(FakeHandle { id, alive })
    }

    fn stop(&mut self, id: ModuleId, handle: FakeHandle) -> Result<(), (FakeHandle, ModuleError)> {
        self.calls.push(LaunchCall::Stop(id));
        if self.fail_stop.contains(id) {
            return Err((handle, ModuleError::StopFailed(id)));
        }
        self.shared.devices.release(id);
        self.shared.telemetry.reset_for(id);
        self.alive[id.index()] = None;
        Ok(())
    }

    fn is_alive(&self, handle: &FakeHandle) -> bool {
        handle.alive.load(Ordering::Acquire)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn last(&self) -> Option<&AppEvent> {
        self.events.last()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Fixtures ──────────────────────────────────────────────────

/// A supervisor straight after boot: Display running, NetworkLink resident.
#[allow(dead_code)]
pub fn booted(policy: CommandPolicy) -> (Supervisor<FakeLauncher>, RecordingSink) {
    let shared = Arc::new(SharedState::new());
    let mut sup = Supervisor::new(FakeLauncher::new(shared.clone()), shared, policy);
    let mut sink = RecordingSink::new();
    sup.boot(&mut sink);
    (sup, sink)
}

/// Ownership invariant: a device is Disconnected exactly when its owner is
/// absent.
#[allow(dead_code)]
pub fn ownership_holds<L: WorkerLauncher>(sup: &Supervisor<L>) -> bool {
    smarthome::state::DeviceId::ALL.iter().all(|&d| {
        let disconnected = sup.shared().devices.get(d).is_disconnected();
        disconnected != sup.registry().is_present(d.owner())
    })
}
