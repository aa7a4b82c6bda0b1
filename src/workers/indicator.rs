//! Indicator board: red/green/yellow lamps and the buzzer.
//!
//! Outputs follow the device table; the worker only touches hardware when a
//! level actually changes.

use log::warn;

use crate::pins;
use crate::state::{DeviceId, DeviceLevel, ModuleId};

use super::{drive_pwm, ModuleWorker, WorkerContext};

const LAMPS: [DeviceId; 3] = [DeviceId::RedIndicator, DeviceId::GreenIndicator, DeviceId::YellowIndicator];

pub struct IndicatorWorker {
    /// Last level applied per output: three lamps then the buzzer.
    applied: [Option<DeviceLevel>; 4],
}

impl Default for IndicatorWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorWorker {
    pub fn new() -> Self {
        Self { applied: [None; 4] }
    }

    fn outputs() -> impl Iterator<Item = (usize, DeviceId, u8)> {
        LAMPS
            .into_iter()
            .zip(pins::LAMP_GPIOS)
            .chain(core::iter::once((DeviceId::Buzzer, pins::BUZZER_GPIO)))
            .enumerate()
            .map(|(i, (d, gpio))| (i, d, gpio))
    }
}

impl ModuleWorker for IndicatorWorker {
    fn module(&self) -> ModuleId {
        ModuleId::ActuatorLed
    }

    fn init(&mut self, ctx: &WorkerContext) -> crate::error::Result<()> {
        for (_, _, gpio) in Self::outputs() {
            ctx.board.pwm_stop(gpio)?;
        }
        self.applied = [Some(DeviceLevel::CLOSED); 4];
        Ok(())
    }

    fn poll(&mut self, ctx: &WorkerContext) {
        let cfg = &ctx.config;
        for (i, device, gpio) in Self::outputs() {
            let level = ctx.shared.devices.get(device);
            if self.applied[i] == Some(level) {
                continue;
            }
            let (duty, freq) = if device == DeviceId::Buzzer {
                (
                    if level.is_on() { cfg.buzzer_duty_percent } else { 0 },
                    cfg.buzzer_freq_hz,
                )
            } else {
                (level.duty_percent(cfg.led_base_duty_percent), cfg.led_freq_hz)
            };
            match drive_pwm(ctx.board.as_ref(), gpio, duty, freq) {
                Ok(()) => self.applied[i] = Some(level),
                Err(e) => warn!("Indicator: {} -> {}: {}", device, level, e),
            }
        }
    }

    fn teardown(&mut self, ctx: &WorkerContext) {
        for (_, device, gpio) in Self::outputs() {
            if let Err(e) = ctx.board.pwm_stop(gpio) {
                warn!("Indicator: {} off failed: {}", device, e);
            }
        }
        self.applied = [None; 4];
    }
}
