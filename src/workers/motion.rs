//! Motion / ambient light board with an RGB lamp.

use log::warn;

use crate::pins;
use crate::state::{DeviceId, DeviceLevel, ModuleId};

use super::{drive_pwm, ModuleWorker, WorkerContext};

const LAMPS: [DeviceId; 3] = [DeviceId::MotionGreen, DeviceId::MotionRed, DeviceId::MotionBlue];

pub struct MotionWorker {
    applied: [Option<DeviceLevel>; 3],
    motion: u16,
    lux: u16,
}

impl Default for MotionWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionWorker {
    pub fn new() -> Self {
        Self {
            applied: [None; 3],
            motion: 0,
            lux: 0,
        }
    }
}

impl ModuleWorker for MotionWorker {
    fn module(&self) -> ModuleId {
        ModuleId::MotionLight
    }

    fn init(&mut self, ctx: &WorkerContext) -> crate::error::Result<()> {
        for gpio in pins::LAMP_GPIOS {
            ctx.board.pwm_stop(gpio)?;
        }
        self.applied = [Some(DeviceLevel::CLOSED); 3];
        Ok(())
    }

    fn poll(&mut self, ctx: &WorkerContext) {
        match ctx.board.read_adc(pins::MOTION_ADC_CHANNEL) {
            Ok(v) => self.motion = v,
            Err(e) => warn!("Motion: PIR read failed: {}", e),
        }
        match ctx.board.read_adc(pins::LUX_ADC_CHANNEL) {
            Ok(v) => self.lux = v,
            Err(e) => warn!("Motion: light read failed: {}", e),
        }
        ctx.shared.telemetry.set_motion(self.motion, self.lux);

        let cfg = &ctx.config;
        for (i, (device, gpio)) in LAMPS.into_iter().zip(pins::LAMP_GPIOS).enumerate() {
            let level = ctx.shared.devices.get(device);
            if self.applied[i] == Some(level) {
                continue;
            }
            let duty = level.duty_percent(cfg.led_base_duty_percent);
            match drive_pwm(ctx.board.as_ref(), gpio, duty, cfg.led_freq_hz) {
                Ok(()) => self.applied[i] = Some(level),
                Err(e) => warn!("Motion: {} -> {}: {}", device, level, e),
            }
        }
    }

    fn teardown(&mut self, ctx: &WorkerContext) {
        for gpio in pins::LAMP_GPIOS {
            if let Err(e) = ctx.board.pwm_stop(gpio) {
                warn!("Motion: lamp {} off failed: {}", gpio, e);
            }
        }
        self.applied = [None; 3];
    }
}
