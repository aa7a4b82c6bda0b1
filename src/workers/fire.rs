//! Flame sensor board.
//!
//! The detector output is active-low; the amplifier output is sampled for an
//! analog intensity figure. A flame sounds the buzzer and asks the network
//! worker to report immediately.

use log::{info, warn};

use crate::pins;
use crate::state::ModuleId;

use super::{ModuleWorker, WorkerContext};

#[derive(Default)]
pub struct FireWorker {
    alarm: bool,
    amp: u16,
}

impl FireWorker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModuleWorker for FireWorker {
    fn module(&self) -> ModuleId {
        ModuleId::Fire
    }

    fn init(&mut self, ctx: &WorkerContext) -> crate::error::Result<()> {
        ctx.board.pwm_stop(pins::BUZZER_GPIO)?;
        self.alarm = false;
        Ok(())
    }

    fn poll(&mut self, ctx: &WorkerContext) {
        let flame = match ctx.board.read_input(pins::FLAME_DETECT_GPIO) {
            Ok(level) => !level,
            Err(e) => {
                warn!("Fire: detector read failed: {}", e);
                return;
            }
        };
        match ctx.board.read_adc(pins::FLAME_AMP_ADC_CHANNEL) {
            Ok(v) => self.amp = v,
            Err(e) => warn!("Fire: amplifier read failed: {}", e),
        }
        ctx.shared.telemetry.set_flame(flame, self.amp);

        if flame == self.alarm {
            return;
        }
        self.alarm = flame;
        let cfg = &ctx.config;
        let result = if flame {
            info!("Fire: flame detected (amp={})", self.amp);
            ctx.shared.telemetry.request_publish();
            ctx.board
                .pwm_start(pins::BUZZER_GPIO, cfg.buzzer_duty_percent, cfg.buzzer_freq_hz)
        } else {
            info!("Fire: flame cleared");
            ctx.board.pwm_stop(pins::BUZZER_GPIO)
        };
        if let Err(e) = result {
            warn!("Fire: buzzer: {}", e);
        }
    }

    fn teardown(&mut self, ctx: &WorkerContext) {
        if let Err(e) = ctx.board.pwm_stop(pins::BUZZER_GPIO) {
            warn!("Fire: buzzer off failed: {}", e);
        }
        self.alarm = false;
    }
}
