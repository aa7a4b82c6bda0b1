//! Per-module peripheral workers.
//!
//! Each expansion board is driven by one [`ModuleWorker`] running on its own
//! thread. The launcher calls `init` on the supervisor's thread, runs
//! [`run`] on the worker thread, and calls `teardown` back on the
//! supervisor's thread once the loop has exited.
//!
//! ```text
//!  start ─▶ init ─▶ claim devices ─▶ ┌ poll ─ park(period) ┐ ─▶ teardown ─▶ release
//!                                     └──── stop flag? ◀────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::app::ports::BoardPort;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::pins;
use crate::state::{ModuleId, SharedState};

pub mod climate;
pub mod display;
pub mod fire;
pub mod gas;
pub mod indicator;
pub mod motion;

/// Lifecycle hooks for one board's worker.
pub trait ModuleWorker: Send {
    fn module(&self) -> ModuleId;

    /// Sleep between polls.
    fn period(&self, config: &SystemConfig) -> Duration {
        Duration::from_millis(config.sensing_period_ms.into())
    }

    /// Configure peripherals. Runs before the device claim.
    fn init(&mut self, ctx: &WorkerContext) -> Result<()>;

    /// One sample/actuate cycle. Errors are logged and the cycle skipped.
    fn poll(&mut self, ctx: &WorkerContext);

    /// Switch every output off. Runs after the loop has exited.
    fn teardown(&mut self, ctx: &WorkerContext);
}

/// Everything a worker can see.
#[derive(Clone)]
pub struct WorkerContext {
    pub id: ModuleId,
    pub config: Arc<SystemConfig>,
    pub shared: Arc<SharedState>,
    pub board: Arc<dyn BoardPort>,
}

impl WorkerContext {
    pub fn new(id: ModuleId, config: Arc<SystemConfig>, shared: Arc<SharedState>, board: Arc<dyn BoardPort>) -> Self {
        Self {
            id,
            config,
            shared,
            board,
        }
    }

    /// Owned devices become Closed and readings start from idle.
    pub fn claim_module(&self) {
        self.shared.telemetry.reset_for(self.id);
        self.shared.devices.claim(self.id);
    }

    /// Owned devices become Disconnected and readings return to idle.
    pub fn release_module(&self) {
        self.shared.devices.release(self.id);
        self.shared.telemetry.reset_for(self.id);
    }
}

/// Construct the worker for `id`. `None` for modules without a worker.
pub fn build(id: ModuleId) -> Option<Box<dyn ModuleWorker>> {
    match id {
        ModuleId::Fire => Some(Box::new(fire::FireWorker::new())),
        ModuleId::Gas => Some(Box::new(gas::GasWorker::new())),
        ModuleId::Display => Some(Box::new(display::DisplayWorker::new())),
        ModuleId::ActuatorLed => Some(Box::new(indicator::IndicatorWorker::new())),
        ModuleId::MotionLight => Some(Box::new(motion::MotionWorker::new())),
        ModuleId::TempHumidity => Some(Box::new(climate::ClimateWorker::new())),
        ModuleId::NetworkLink => None,
    }
}

/// Poll loop body of a worker thread.
///
/// The stop flag is checked once per iteration, before each poll; a poll is
/// never interrupted half-way. Returns the worker so its teardown can run on
/// the stopping thread.
pub fn run(mut worker: Box<dyn ModuleWorker>, ctx: &WorkerContext, stop: &AtomicBool) -> Box<dyn ModuleWorker> {
    let period = worker.period(&ctx.config);
    while !stop.load(Ordering::Acquire) {
        worker.poll(ctx);
        std::thread::park_timeout(period);
    }
    worker
}

/// Switch off every output a module can drive, without its worker.
///
/// Used when a worker thread panicked and its state is gone.
pub fn force_off(ctx: &WorkerContext) {
    let board = &ctx.board;
    let result = match ctx.id {
        ModuleId::Fire | ModuleId::Gas => board.pwm_stop(pins::BUZZER_GPIO),
        ModuleId::ActuatorLed => pins::LAMP_GPIOS
            .iter()
            .chain(core::iter::once(&pins::BUZZER_GPIO))
            .try_for_each(|&gpio| board.pwm_stop(gpio)),
        ModuleId::MotionLight => pins::LAMP_GPIOS.iter().try_for_each(|&gpio| board.pwm_stop(gpio)),
        ModuleId::TempHumidity => board
            .write_output(pins::CLIMATE_POWER_GPIO, false)
            .and_then(|()| board.pwm_stop(pins::CLIMATE_PWM_GPIO)),
        ModuleId::Display => board.display_clear(),
        ModuleId::NetworkLink => Ok(()),
    };
    if let Err(e) = result {
        warn!("{}: force-off failed: {}", ctx.id, e);
    }
}

/// Drive one PWM output to `duty_percent`, or stop it at 0.
pub(crate) fn drive_pwm(board: &dyn BoardPort, gpio: u8, duty_percent: u8, freq_hz: u32) -> crate::error::Result<()> {
    if duty_percent == 0 {
        board.pwm_stop(gpio)?;
    } else {
        board.pwm_start(gpio, duty_percent, freq_hz)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_context(id: ModuleId) -> (WorkerContext, Arc<crate::adapters::hardware::SimBoard>) {
    let board = Arc::new(crate::adapters::hardware::SimBoard::new());
    let ctx = WorkerContext::new(
        id,
        Arc::new(SystemConfig::default()),
        Arc::new(SharedState::new()),
        board.clone(),
    );
    (ctx, board)
}
