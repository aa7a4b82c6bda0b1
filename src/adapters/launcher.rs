//! Thread-backed [`WorkerLauncher`].
//!
//! Every peripheral module gets one pinned thread running
//! [`workers::run`]. Init, device claim, teardown and device release all
//! happen on the caller's thread, so the supervisor observes a consistent
//! device table as soon as `start`/`stop` return.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::app::ports::{BoardPort, WorkerLauncher};
use crate::config::SystemConfig;
use crate::drivers::task_pin::{self, Core, TaskSpec};
use crate::error::ModuleError;
use crate::state::{ModuleId, SharedState};
use crate::workers::{self, ModuleWorker, WorkerContext};

/// How often `stop` re-checks a winding-down worker.
const STOP_POLL: Duration = Duration::from_millis(1);

/// A running worker thread.
pub struct WorkerHandle {
    thread: JoinHandle<Box<dyn ModuleWorker>>,
    stop: Arc<AtomicBool>,
    ctx: WorkerContext,
}

impl WorkerHandle {
    pub fn module(&self) -> ModuleId {
        self.ctx.id
    }
}

impl core::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("module", &self.ctx.id)
            .field("finished", &self.thread.is_finished())
            .finish()
    }
}

pub struct ThreadLauncher {
    config: Arc<SystemConfig>,
    shared: Arc<SharedState>,
    board: Arc<dyn BoardPort>,
    stop_timeout: Duration,
}

impl ThreadLauncher {
    pub fn new(config: Arc<SystemConfig>, shared: Arc<SharedState>, board: Arc<dyn BoardPort>) -> Self {
        let stop_timeout = Duration::from_millis(config.stop_timeout_ms.into());
        Self {
            config,
            shared,
            board,
            stop_timeout,
        }
    }

    fn context(&self, id: ModuleId) -> WorkerContext {
        WorkerContext::new(id, self.config.clone(), self.shared.clone(), self.board.clone())
    }
}

/// Thread placement per module.
pub fn task_spec(id: ModuleId) -> TaskSpec {
    let (name, priority, stack_kb) = match id {
        ModuleId::Fire => ("fire\0", 6, 4),
        ModuleId::Gas => ("gas\0", 6, 4),
        ModuleId::Display => ("display\0", 3, 6),
        ModuleId::ActuatorLed => ("indicator\0", 5, 4),
        ModuleId::NetworkLink => ("link\0", 5, 8),
        ModuleId::MotionLight => ("motion\0", 5, 4),
        ModuleId::TempHumidity => ("climate\0", 5, 6),
    };
    TaskSpec {
        core: Core::App,
        priority,
        stack_kb,
        name,
    }
}

impl WorkerLauncher for ThreadLauncher {
    type Handle = WorkerHandle;

    fn start(&mut self, id: ModuleId) -> Result<WorkerHandle, ModuleError> {
        let Some(mut worker) = workers::build(id) else {
            warn!("{}: no worker to launch", id);
            return Err(ModuleError::StartFailed(id));
        };
        let ctx = self.context(id);

        if let Err(e) = worker.init(&ctx) {
            error!("{}: init failed: {}", id, e);
            worker.teardown(&ctx);
            ctx.release_module();
            return Err(ModuleError::StartFailed(id));
        }
        ctx.claim_module();

        let stop = Arc::new(AtomicBool::new(false));
        let thread_ctx = ctx.clone();
        let thread_stop = stop.clone();
        match task_pin::spawn_on_core(task_spec(id), move || workers::run(worker, &thread_ctx, &thread_stop)) {
            Ok(thread) => {
                info!("{}: worker running", id);
                Ok(WorkerHandle { thread, stop, ctx })
            }
            Err(e) => {
                // The worker went down with the closure; switch outputs off blind.
                error!("{}: spawn failed: {}", id, e);
                workers::force_off(&ctx);
                ctx.release_module();
                Err(ModuleError::StartFailed(id))
            }
        }
    }

    fn stop(&mut self, id: ModuleId, handle: WorkerHandle) -> Result<(), (WorkerHandle, ModuleError)> {
        handle.stop.store(true, Ordering::Release);
        handle.thread.thread().unpark();

        let deadline = Instant::now() + self.stop_timeout;
        while !handle.thread.is_finished() {
            if Instant::now() >= deadline {
                warn!("{}: worker did not stop within {:?}", id, self.stop_timeout);
                return Err((handle, ModuleError::StopFailed(id)));
            }
            std::thread::sleep(STOP_POLL);
        }

        let WorkerHandle { thread, ctx, .. } = handle;
        match thread.join() {
            Ok(mut worker) => worker.teardown(&ctx),
            Err(_) => {
                error!("{}: worker panicked, forcing outputs off", id);
                workers::force_off(&ctx);
            }
        }
        ctx.release_module();
        info!("{}: worker stopped", id);
        Ok(())
    }

    fn is_alive(&self, handle: &WorkerHandle) -> bool {
        !handle.thread.is_finished()
    }
}
