//! Board adapters, the only code that touches peripherals.
//!
//! [`EspBoard`] drives the real ADC, GPIO, LEDC and I2C blocks through
//! [`hw_init`](crate::drivers::hw_init). [`SimBoard`] is its host twin: every
//! input is injectable and every output observable, so workers and the
//! launcher can be exercised under `cargo test`.

#[cfg(not(target_os = "espidf"))]
pub use sim::SimBoard;

#[cfg(target_os = "espidf")]
pub use esp::EspBoard;

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    use crate::app::ports::BoardPort;
    use crate::drivers::sht40::{crc8, CMD_MEASURE_HIGH_PRECISION};
    use crate::error::{ActuatorError, SensorError};
    use crate::pins;

    const ADC_CHANNELS: usize = 10;
    const DISPLAY_ROWS: usize = 8;

    #[derive(Default)]
    struct Sht40Sim {
        /// Raw (temperature, humidity) ticks; `None` = not fitted.
        ticks: Option<(u16, u16)>,
        triggered: bool,
    }

    /// In-memory board.
    ///
    /// Inputs idle HIGH (pull-ups), matching the real socket.
    pub struct SimBoard {
        adc: [AtomicU16; ADC_CHANNELS],
        inputs: AtomicU64,
        outputs: AtomicU64,
        /// GPIO → (duty %, frequency) for running PWM outputs.
        pwm: Mutex<HashMap<u8, (u8, u32)>>,
        adc_fail: AtomicBool,
        adc_stall: AtomicBool,
        adc_panic: AtomicBool,
        stalled_reads: AtomicUsize,
        pwm_fail: AtomicBool,
        sht40: Mutex<Sht40Sim>,
        display: Mutex<[String; DISPLAY_ROWS]>,
        display_writes: AtomicUsize,
    }

    impl Default for SimBoard {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SimBoard {
        pub fn new() -> Self {
            Self {
                adc: core::array::from_fn(|_| AtomicU16::new(0)),
                inputs: AtomicU64::new(u64::MAX),
                outputs: AtomicU64::new(0),
                pwm: Mutex::new(HashMap::new()),
                adc_fail: AtomicBool::new(false),
                adc_stall: AtomicBool::new(false),
                adc_panic: AtomicBool::new(false),
                stalled_reads: AtomicUsize::new(0),
                pwm_fail: AtomicBool::new(false),
                sht40: Mutex::new(Sht40Sim::default()),
                display: Mutex::new(Default::default()),
                display_writes: AtomicUsize::new(0),
            }
        }

        // ── Injection ─────────────────────────────────────────

        pub fn set_adc(&self, channel: u8, value: u16) {
            self.adc[usize::from(channel)].store(value, Ordering::Relaxed);
        }

        pub fn set_input(&self, gpio: u8, high: bool) {
            let bit = 1u64 << gpio;
            if high {
                self.inputs.fetch_or(bit, Ordering::Relaxed);
            } else {
                self.inputs.fetch_and(!bit, Ordering::Relaxed);
            }
        }

        /// Make every ADC read fail.
        pub fn set_adc_failure(&self, fail: bool) {
            self.adc_fail.store(fail, Ordering::Relaxed);
        }

        /// Hold every ADC read until cleared, like a wedged bus.
        pub fn set_adc_stall(&self, stall: bool) {
            self.adc_stall.store(stall, Ordering::Release);
        }

        /// Make every ADC read panic the calling thread.
        pub fn set_adc_panic(&self, panic: bool) {
            self.adc_panic.store(panic, Ordering::Release);
        }

        /// Make every PWM start/stop fail.
        pub fn set_pwm_failure(&self, fail: bool) {
            self.pwm_fail.store(fail, Ordering::Relaxed);
        }

        /// Fit the SHT40 with fixed raw ticks, or remove it.
        pub fn set_sht40(&self, ticks: Option<(u16, u16)>) {
            self.sht40.lock().unwrap_or_else(PoisonError::into_inner).ticks = ticks;
        }

        // ── Observation ───────────────────────────────────────

        pub fn output(&self, gpio: u8) -> bool {
            self.outputs.load(Ordering::Relaxed) & (1u64 << gpio) != 0
        }

        /// Duty of a running PWM output, `None` when stopped.
        pub fn pwm_duty(&self, gpio: u8) -> Option<u8> {
            self.pwm_state(gpio).map(|(duty, _)| duty)
        }

        pub fn pwm_freq(&self, gpio: u8) -> Option<u32> {
            self.pwm_state(gpio).map(|(_, freq)| freq)
        }

        /// Number of PWM outputs currently running.
        pub fn active_pwm_count(&self) -> usize {
            self.pwm.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        pub fn display_row(&self, row: u8) -> String {
            self.display.lock().unwrap_or_else(PoisonError::into_inner)[usize::from(row)].clone()
        }

        /// ADC reads currently held by [`set_adc_stall`](Self::set_adc_stall).
        pub fn stalled_reads(&self) -> usize {
            self.stalled_reads.load(Ordering::Acquire)
        }

        /// Total `display_line` calls so far.
        pub fn display_writes(&self) -> usize {
            self.display_writes.load(Ordering::Relaxed)
        }

        fn pwm_state(&self, gpio: u8) -> Option<(u8, u32)> {
            self.pwm.lock().unwrap_or_else(PoisonError::into_inner).get(&gpio).copied()
        }
    }

    impl BoardPort for SimBoard {
        fn read_adc(&self, channel: u8) -> Result<u16, SensorError> {
            if self.adc_stall.load(Ordering::Acquire) {
                self.stalled_reads.fetch_add(1, Ordering::AcqRel);
                while self.adc_stall.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(1));
                }
                self.stalled_reads.fetch_sub(1, Ordering::AcqRel);
            }
            if self.adc_panic.load(Ordering::Acquire) {
                panic!("simulated ADC fault on channel {channel}");
            }
            if self.adc_fail.load(Ordering::Relaxed) {
                return Err(SensorError::AdcReadFailed);
            }
            self.adc
                .get(usize::from(channel))
                .map(|v| v.load(Ordering::Relaxed))
                .ok_or(SensorError::Unavailable)
        }

        fn read_input(&self, gpio: u8) -> Result<bool, SensorError> {
            if gpio >= 64 {
                return Err(SensorError::GpioReadFailed);
            }
            Ok(self.inputs.load(Ordering::Relaxed) & (1u64 << gpio) != 0)
        }

        fn write_output(&self, gpio: u8, high: bool) -> Result<(), ActuatorError> {
            if gpio >= 64 {
                return Err(ActuatorError::GpioWriteFailed);
            }
            let bit = 1u64 << gpio;
            if high {
                self.outputs.fetch_or(bit, Ordering::Relaxed);
            } else {
                self.outputs.fetch_and(!bit, Ordering::Relaxed);
            }
            Ok(())
        }

        fn pwm_start(&self, gpio: u8, duty_percent: u8, freq_hz: u32) -> Result<(), ActuatorError> {
            if self.pwm_fail.load(Ordering::Relaxed) || freq_hz == 0 {
                return Err(ActuatorError::PwmWriteFailed);
            }
            self.pwm
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(gpio, (duty_percent.min(100), freq_hz));
            Ok(())
        }

        fn pwm_stop(&self, gpio: u8) -> Result<(), ActuatorError> {
            if self.pwm_fail.load(Ordering::Relaxed) {
                return Err(ActuatorError::PwmWriteFailed);
            }
            self.pwm.lock().unwrap_or_else(PoisonError::into_inner).remove(&gpio);
            Ok(())
        }

        fn i2c_write(&self, addr: u8, bytes: &[u8]) -> Result<(), SensorError> {
            let mut sht = self.sht40.lock().unwrap_or_else(PoisonError::into_inner);
            if addr != pins::SHT40_I2C_ADDR || sht.ticks.is_none() {
                return Err(SensorError::BusNack);
            }
            sht.triggered = bytes == [CMD_MEASURE_HIGH_PRECISION];
            Ok(())
        }

        fn i2c_read(&self, addr: u8, buf: &mut [u8]) -> Result<(), SensorError> {
            let mut sht = self.sht40.lock().unwrap_or_else(PoisonError::into_inner);
            let Some((t, rh)) = sht.ticks else {
                return Err(SensorError::BusNack);
            };
            if addr != pins::SHT40_I2C_ADDR || !sht.triggered || buf.len() != 6 {
                return Err(SensorError::BusNack);
            }
            let [t_hi, t_lo] = t.to_be_bytes();
            let [rh_hi, rh_lo] = rh.to_be_bytes();
            buf.copy_from_slice(&[
                t_hi,
                t_lo,
                crc8(&[t_hi, t_lo]),
                rh_hi,
                rh_lo,
                crc8(&[rh_hi, rh_lo]),
            ]);
            sht.triggered = false;
            Ok(())
        }

        fn display_line(&self, row: u8, text: &str) -> Result<(), ActuatorError> {
            let mut rows = self.display.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = rows
                .get_mut(usize::from(row))
                .ok_or(ActuatorError::DisplayWriteFailed)?;
            text.clone_into(slot);
            self.display_writes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        fn display_clear(&self) -> Result<(), ActuatorError> {
            let mut rows = self.display.lock().unwrap_or_else(PoisonError::into_inner);
            rows.iter_mut().for_each(String::clear);
            Ok(())
        }
    }
}

// ── ESP-IDF ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::{Mutex, PoisonError};

    use log::debug;

    use crate::app::ports::BoardPort;
    use crate::drivers::hw_init;
    use crate::error::{ActuatorError, SensorError};

    const DISPLAY_ROWS: usize = 8;

    /// Real peripherals. Construct after [`hw_init::init_peripherals`].
    pub struct EspBoard {
        /// Serialises write/read pairs on the shared I2C bus.
        i2c: Mutex<()>,
        /// Last text frame, also mirrored to the debug log.
        frame: Mutex<[String; DISPLAY_ROWS]>,
    }

    impl Default for EspBoard {
        fn default() -> Self {
            Self::new()
        }
    }

    impl EspBoard {
        pub fn new() -> Self {
            Self {
                i2c: Mutex::new(()),
                frame: Mutex::new(Default::default()),
            }
        }
    }

    impl BoardPort for EspBoard {
        fn read_adc(&self, channel: u8) -> Result<u16, SensorError> {
            hw_init::adc1_read(channel.into()).ok_or(SensorError::AdcReadFailed)
        }

        fn read_input(&self, gpio: u8) -> Result<bool, SensorError> {
            hw_init::gpio_read(gpio.into()).ok_or(SensorError::GpioReadFailed)
        }

        fn write_output(&self, gpio: u8, high: bool) -> Result<(), ActuatorError> {
            hw_init::gpio_write(gpio.into(), high).map_err(|_| ActuatorError::GpioWriteFailed)
        }

        fn pwm_start(&self, gpio: u8, duty_percent: u8, freq_hz: u32) -> Result<(), ActuatorError> {
            hw_init::ledc_start(gpio, duty_percent, freq_hz).map_err(|_| ActuatorError::PwmWriteFailed)
        }

        fn pwm_stop(&self, gpio: u8) -> Result<(), ActuatorError> {
            hw_init::ledc_stop(gpio).map_err(|_| ActuatorError::PwmWriteFailed)
        }

        fn i2c_write(&self, addr: u8, bytes: &[u8]) -> Result<(), SensorError> {
            let _bus = self.i2c.lock().unwrap_or_else(PoisonError::into_inner);
            hw_init::i2c_write(addr, bytes).map_err(|_| SensorError::BusNack)
        }

        fn i2c_read(&self, addr: u8, buf: &mut [u8]) -> Result<(), SensorError> {
            let _bus = self.i2c.lock().unwrap_or_else(PoisonError::into_inner);
            hw_init::i2c_read(addr, buf).map_err(|_| SensorError::BusNack)
        }

        fn display_line(&self, row: u8, text: &str) -> Result<(), ActuatorError> {
            let mut frame = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = frame
                .get_mut(usize::from(row))
                .ok_or(ActuatorError::DisplayWriteFailed)?;
            text.clone_into(slot);
            debug!("LCD[{}] {}", row, text);
            Ok(())
        }

        fn display_clear(&self) -> Result<(), ActuatorError> {
            let mut frame = self.frame.lock().unwrap_or_else(PoisonError::into_inner);
            frame.iter_mut().for_each(String::clear);
            Ok(())
        }
    }
}
