//! Raw ESP-IDF peripheral access.
//!
//! ADC1 and the I2C master are configured once from `main()`. GPIO and LEDC
//! routing is done lazily per pin, because the expansion boards share socket
//! pins: the same GPIO is an input for one board and a PWM output for
//! another, and only the running worker knows which board is fitted.

use core::sync::atomic::{AtomicU8, Ordering};

use esp_idf_svc::sys::*;
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors from peripheral setup or access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    LedcConfigFailed(i32),
    /// The GPIO has no LEDC channel assigned.
    NoPwmChannel(u8),
    I2cInitFailed(i32),
    I2cTransferFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcConfigFailed(rc) => write!(f, "LEDC config failed (rc={})", rc),
            Self::NoPwmChannel(gpio) => write!(f, "GPIO{} has no PWM channel", gpio),
            Self::I2cInitFailed(rc) => write!(f, "I2C init failed (rc={})", rc),
            Self::I2cTransferFailed(rc) => write!(f, "I2C transfer failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

fn check(ret: esp_err_t, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if ret == ESP_OK as esp_err_t { Ok(()) } else { Err(err(ret)) }
}

pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before any worker thread exists.
    unsafe {
        init_adc()?;
        init_i2c()?;
    }
    info!("hw_init: ADC1 and I2C configured");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    check(
        unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) },
        HwInitError::AdcInitFailed,
    )?;

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    for ch in [pins::MOTION_ADC_CHANNEL, pins::FLAME_AMP_ADC_CHANNEL, pins::GAS_ADC_CHANNEL] {
        // SAFETY: handle initialised above.
        check(
            unsafe { adc_oneshot_config_channel(ADC1_HANDLE, ch.into(), &chan_cfg) },
            HwInitError::AdcInitFailed,
        )?;
    }
    Ok(())
}

/// `None` if the conversion failed.
pub fn adc1_read(channel: u32) -> Option<u16> {
    let mut raw: i32 = 0;
    // SAFETY: ADC1_HANDLE is written once in init_adc() before any worker
    // starts; the oneshot driver locks the unit internally.
    let ret = unsafe { adc_oneshot_read(ADC1_HANDLE, channel, &mut raw) };
    (ret == ESP_OK as esp_err_t).then(|| raw.max(0) as u16)
}

// ── Lazy pin routing ──────────────────────────────────────────

const MODE_UNSET: u8 = 0;
const MODE_INPUT: u8 = 1;
const MODE_OUTPUT: u8 = 2;
const MODE_PWM: u8 = 3;

static PIN_MODES: [AtomicU8; 49] = [const { AtomicU8::new(MODE_UNSET) }; 49];

fn pin_mode(pin: i32) -> Option<&'static AtomicU8> {
    usize::try_from(pin).ok().and_then(|i| PIN_MODES.get(i))
}

unsafe fn route_gpio(pin: i32, mode: gpio_mode_t, pull_up: bool) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config only touches the registers of `pin`.
    check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)
}

/// Read a pulled-up digital input, routing the pin first if needed.
pub fn gpio_read(pin: i32) -> Option<bool> {
    let mode = pin_mode(pin)?;
    if mode.load(Ordering::Acquire) != MODE_INPUT {
        // SAFETY: single pin reconfiguration; the owning worker is the only user.
        unsafe { route_gpio(pin, gpio_mode_t_GPIO_MODE_INPUT, true) }.ok()?;
        mode.store(MODE_INPUT, Ordering::Release);
    }
    // SAFETY: register read on a configured input.
    Some(unsafe { gpio_get_level(pin) } != 0)
}

pub fn gpio_write(pin: i32, high: bool) -> Result<(), HwInitError> {
    let mode = pin_mode(pin).ok_or(HwInitError::GpioConfigFailed(ESP_ERR_INVALID_ARG as i32))?;
    if mode.load(Ordering::Acquire) != MODE_OUTPUT {
        // SAFETY: as in gpio_read.
        unsafe { route_gpio(pin, gpio_mode_t_GPIO_MODE_OUTPUT, false) }?;
        mode.store(MODE_OUTPUT, Ordering::Release);
    }
    // SAFETY: register write on a configured output.
    check(unsafe { gpio_set_level(pin, u32::from(high)) }, HwInitError::GpioConfigFailed)
}

// ── LEDC PWM ──────────────────────────────────────────────────

const LEDC_DUTY_MAX: u32 = (1 << 10) - 1;

/// Fixed channel/timer per PWM-capable socket pin.
fn ledc_slot(gpio: u8) -> Option<(ledc_channel_t, ledc_timer_t)> {
    if gpio == pins::BUZZER_GPIO {
        return Some((ledc_channel_t_LEDC_CHANNEL_0, ledc_timer_t_LEDC_TIMER_0));
    }
    if let Some(i) = pins::LAMP_GPIOS.iter().position(|&g| g == gpio) {
        return Some((ledc_channel_t_LEDC_CHANNEL_1 + i as u32, ledc_timer_t_LEDC_TIMER_1));
    }
    if gpio == pins::CLIMATE_PWM_GPIO {
        return Some((ledc_channel_t_LEDC_CHANNEL_4, ledc_timer_t_LEDC_TIMER_2));
    }
    None
}

pub fn ledc_start(gpio: u8, duty_percent: u8, freq_hz: u32) -> Result<(), HwInitError> {
    let (channel, timer) = ledc_slot(gpio).ok_or(HwInitError::NoPwmChannel(gpio))?;
    let timer_cfg = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: timer,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_10_BIT,
        freq_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let duty = u32::from(duty_percent.min(100)) * LEDC_DUTY_MAX / 100;
    let chan_cfg = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel,
        timer_sel: timer,
        gpio_num: gpio.into(),
        duty,
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: each channel/timer pair belongs to exactly one socket pin and
    // only that pin's owning worker drives it.
    unsafe {
        check(ledc_timer_config(&timer_cfg), HwInitError::LedcConfigFailed)?;
        check(ledc_channel_config(&chan_cfg), HwInitError::LedcConfigFailed)?;
    }
    if let Some(mode) = pin_mode(gpio.into()) {
        mode.store(MODE_PWM, Ordering::Release);
    }
    Ok(())
}

pub fn ledc_stop(gpio: u8) -> Result<(), HwInitError> {
    let (channel, _) = ledc_slot(gpio).ok_or(HwInitError::NoPwmChannel(gpio))?;
    let routed = pin_mode(gpio.into()).is_some_and(|m| m.load(Ordering::Acquire) == MODE_PWM);
    if !routed {
        return Ok(());
    }
    // SAFETY: see ledc_start.
    check(
        unsafe { esp_idf_svc::sys::ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0) },
        HwInitError::LedcConfigFailed,
    )
}

// ── I2C master ────────────────────────────────────────────────

const I2C_PORT: i2c_port_t = 0;
const I2C_TIMEOUT_TICKS: TickType_t = 10;

unsafe fn init_i2c() -> Result<(), HwInitError> {
    let mut cfg = i2c_config_t {
        mode: i2c_mode_t_I2C_MODE_MASTER,
        sda_io_num: pins::I2C_SDA_GPIO.into(),
        scl_io_num: pins::I2C_SCL_GPIO.into(),
        sda_pullup_en: true,
        scl_pullup_en: true,
        ..Default::default()
    };
    cfg.__bindgen_anon_1.master.clk_speed = pins::I2C_BAUDRATE_HZ;
    // SAFETY: boot-time configuration of an unused port.
    unsafe {
        check(i2c_param_config(I2C_PORT, &cfg), HwInitError::I2cInitFailed)?;
        check(
            i2c_driver_install(I2C_PORT, i2c_mode_t_I2C_MODE_MASTER, 0, 0, 0),
            HwInitError::I2cInitFailed,
        )
    }
}

pub fn i2c_write(addr: u8, bytes: &[u8]) -> Result<(), HwInitError> {
    // SAFETY: `bytes` is valid for its length for the duration of the call.
    let ret = unsafe { i2c_master_write_to_device(I2C_PORT, addr, bytes.as_ptr(), bytes.len(), I2C_TIMEOUT_TICKS) };
    check(ret, HwInitError::I2cTransferFailed)
}

pub fn i2c_read(addr: u8, buf: &mut [u8]) -> Result<(), HwInitError> {
    // SAFETY: `buf` is valid and exclusively borrowed for the call.
    let ret = unsafe { i2c_master_read_from_device(I2C_PORT, addr, buf.as_mut_ptr(), buf.len(), I2C_TIMEOUT_TICKS) };
    check(ret, HwInitError::I2cTransferFailed)
}
