//! Status display: six text rows summarising readings and device levels.

use core::fmt::Write;
use std::time::Duration;

use heapless::String;
use log::warn;

use crate::config::SystemConfig;
use crate::state::{DeviceId, DeviceLevel, ModuleId, Readings, DEVICE_COUNT};

use super::{ModuleWorker, WorkerContext};

pub const ROWS: usize = 6;
/// Characters per row on a 128-pixel panel with the 8-pixel font.
pub const ROW_WIDTH: usize = 16;

pub type Row = String<32>;

pub const TITLE: &str = "-- Smart Home --";

/// Lay out one frame.
pub fn render(r: &Readings, levels: &[DeviceLevel; DEVICE_COUNT]) -> [Row; ROWS] {
    let lv = |d: DeviceId| levels[d.index()];
    let mut rows: [Row; ROWS] = Default::default();
    // Row capacity is twice the panel width, so these writes cannot overflow.
    let _ = rows[0].push_str(TITLE);
    let _ = write!(rows[1], "fire:{:<3} gas:{:<3}", u8::from(r.flame), r.gas);
    let _ = write!(
        rows[2],
        "led:{}{}{}{} pir:{}{}{}",
        lv(DeviceId::RedIndicator),
        lv(DeviceId::GreenIndicator),
        lv(DeviceId::YellowIndicator),
        lv(DeviceId::Buzzer),
        lv(DeviceId::MotionGreen),
        lv(DeviceId::MotionRed),
        lv(DeviceId::MotionBlue)
    );
    let _ = write!(rows[3], "pir:{:<4}lux:{:<4}", r.motion, r.lux);
    let _ = write!(rows[4], "temp:{:<3} hum:{:<3}", r.temperature, r.humidity);
    let _ = write!(
        rows[5],
        "fan:{:<4}pump:{:<3}",
        lv(DeviceId::ClimateFan).raw(),
        lv(DeviceId::ClimatePump).raw()
    );
    rows
}

#[derive(Default)]
pub struct DisplayWorker {
    shown: [Row; ROWS],
}

impl DisplayWorker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModuleWorker for DisplayWorker {
    fn module(&self) -> ModuleId {
        ModuleId::Display
    }

    fn period(&self, config: &SystemConfig) -> Duration {
        Duration::from_millis(config.display_period_ms.into())
    }

    fn init(&mut self, ctx: &WorkerContext) -> crate::error::Result<()> {
        ctx.board.display_clear()?;
        self.shown = Default::default();
        Ok(())
    }

    fn poll(&mut self, ctx: &WorkerContext) {
        let frame = render(&ctx.shared.telemetry.snapshot(), &ctx.shared.devices.snapshot());
        for (row, (new, old)) in frame.into_iter().zip(self.shown.iter_mut()).enumerate() {
            if new == *old {
                continue;
            }
            match ctx.board.display_line(row as u8, &new) {
                Ok(()) => *old = new,
                Err(e) => warn!("Display: row {} failed: {}", row, e),
            }
        }
    }

    fn teardown(&mut self, ctx: &WorkerContext) {
        if let Err(e) = ctx.board.display_clear() {
            warn!("Display: clear failed: {}", e);
        }
        self.shown = Default::default();
    }
}
