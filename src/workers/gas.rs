//! Combustible gas sensor board.

use log::{info, warn};

use crate::pins;
use crate::state::ModuleId;

use super::{ModuleWorker, WorkerContext};

#[derive(Default)]
pub struct GasWorker {
    alarm: bool,
}

impl GasWorker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModuleWorker for GasWorker {
    fn module(&self) -> ModuleId {
        ModuleId::Gas
    }

    fn init(&mut self, ctx: &WorkerContext) -> crate::error::Result<()> {
        ctx.board.pwm_stop(pins::BUZZER_GPIO)?;
        self.alarm = false;
        Ok(())
    }

    fn poll(&mut self, ctx: &WorkerContext) {
        let value = match ctx.board.read_adc(pins::GAS_ADC_CHANNEL) {
            Ok(v) => v,
            Err(e) => {
                warn!("Gas: read failed: {}", e);
                return;
            }
        };
        ctx.shared.telemetry.set_gas(value);

        let cfg = &ctx.config;
        let alarm = value > cfg.gas_alarm_threshold;
        if alarm == self.alarm {
            return;
        }
        self.alarm = alarm;
        let result = if alarm {
            info!("Gas: {} above threshold {}", value, cfg.gas_alarm_threshold);
            ctx.shared.telemetry.request_publish();
            ctx.board
                .pwm_start(pins::BUZZER_GPIO, cfg.buzzer_duty_percent, cfg.buzzer_freq_hz)
        } else {
            info!("Gas: back below threshold ({})", value);
            ctx.board.pwm_stop(pins::BUZZER_GPIO)
        };
        if let Err(e) = result {
            warn!("Gas: buzzer: {}", e);
        }
    }

    fn teardown(&mut self, ctx: &WorkerContext) {
        if let Err(e) = ctx.board.pwm_stop(pins::BUZZER_GPIO) {
            warn!("Gas: buzzer off failed: {}", e);
        }
        self.alarm = false;
    }
}
