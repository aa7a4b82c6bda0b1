//! Socket pin and ADC channel assignments for the expansion boards.
//!
//! Every peripheral worker references this module rather than hard-coding
//! numbers. Expansion boards share a single socket, so the same GPIO can
//! appear under several boards; only one board is fitted at a time.

// ---------------------------------------------------------------------------
// Flame sensor board
// ---------------------------------------------------------------------------

/// Digital flame detector output. LOW = flame present.
pub const FLAME_DETECT_GPIO: u8 = 10;
/// Flame detector amplifier output, sampled for the analog level.
pub const FLAME_AMP_ADC_CHANNEL: u8 = 4;

// ---------------------------------------------------------------------------
// Gas sensor board
// ---------------------------------------------------------------------------

/// Combustible gas sensor analog output.
pub const GAS_ADC_CHANNEL: u8 = 5;

// ---------------------------------------------------------------------------
// Buzzer (shared by flame, gas and indicator boards)
// ---------------------------------------------------------------------------

/// PWM output.
pub const BUZZER_GPIO: u8 = 9;

// ---------------------------------------------------------------------------
// Tri-colour indicator / lamp outputs
// ---------------------------------------------------------------------------

/// PWM outputs: red, green, yellow indicator lamps, or the green, red,
/// blue channels of the motion board's lamp.
pub const LAMP_GPIOS: [u8; 3] = [10, 11, 12];

// ---------------------------------------------------------------------------
// Motion / ambient light board
// ---------------------------------------------------------------------------

pub const MOTION_ADC_CHANNEL: u8 = 3;
pub const LUX_ADC_CHANNEL: u8 = 4;

// ---------------------------------------------------------------------------
// Climate board (SHT40 + fan/pump driver)
// ---------------------------------------------------------------------------

/// Shared fan/pump PWM output.
pub const CLIMATE_PWM_GPIO: u8 = 8;
/// Fan/pump driver power enable. HIGH = powered.
pub const CLIMATE_POWER_GPIO: u8 = 12;

// ---------------------------------------------------------------------------
// I²C bus (SHT40 and OLED)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: u8 = 13;
pub const I2C_SCL_GPIO: u8 = 14;
pub const I2C_BAUDRATE_HZ: u32 = 400_000;

/// SHT40 7-bit address.
pub const SHT40_I2C_ADDR: u8 = 0x44;
