//! Port traits: the hexagonal boundary between orchestration logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Supervisor / workers (domain)
//! ```
//!
//! Driven adapters (thread launcher, board peripherals, network link, event
//! sinks, storage) implement these traits. The
//! [`Supervisor`](super::service::Supervisor) and the peripheral workers
//! consume them, so the domain core never touches hardware directly.

use crate::config::SystemConfig;
use crate::error::{ActuatorError, LinkError, ModuleError, SensorError};
use crate::link::InboundMessage;
use crate::state::ModuleId;

// ───────────────────────────────────────────────────────────────
// Worker launcher (driven adapter: supervisor → task runtime)
// ───────────────────────────────────────────────────────────────

/// Starts and stops the per-module worker tasks.
///
/// `start` returns only after the worker has claimed its devices, and `stop`
/// returns `Ok` only after the worker has released them, so registry and
/// device table agree whenever the supervisor regains control.
pub trait WorkerLauncher {
    /// Handle to a running worker, stored in the module registry.
    type Handle;

    fn start(&mut self, id: ModuleId) -> Result<Self::Handle, ModuleError>;

    /// On failure the handle is returned so the module stays registered.
    fn stop(&mut self, id: ModuleId, handle: Self::Handle) -> Result<(), (Self::Handle, ModuleError)>;

    /// False once the worker has exited on its own (crash or early return).
    fn is_alive(&self, handle: &Self::Handle) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Board port (driven adapter: workers → peripherals)
// ───────────────────────────────────────────────────────────────

/// Raw peripheral access shared by every worker thread.
///
/// ADC channels and GPIOs are the numbers in [`crate::pins`]. Expansion
/// boards share socket pins, so a GPIO may be used as input, output or PWM
/// depending on which board is fitted.
pub trait BoardPort: Send + Sync {
    fn read_adc(&self, channel: u8) -> Result<u16, SensorError>;

    fn read_input(&self, gpio: u8) -> Result<bool, SensorError>;

    fn write_output(&self, gpio: u8, high: bool) -> Result<(), ActuatorError>;

    /// Start (or retune) PWM on a GPIO. `duty_percent` is 0–100.
    fn pwm_start(&self, gpio: u8, duty_percent: u8, freq_hz: u32) -> Result<(), ActuatorError>;

    fn pwm_stop(&self, gpio: u8) -> Result<(), ActuatorError>;

    fn i2c_write(&self, addr: u8, bytes: &[u8]) -> Result<(), SensorError>;

    fn i2c_read(&self, addr: u8, buf: &mut [u8]) -> Result<(), SensorError>;

    /// Draw one text row on the status display.
    fn display_line(&self, row: u8, text: &str) -> Result<(), ActuatorError>;

    fn display_clear(&self) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: network worker ↔ broker)
// ───────────────────────────────────────────────────────────────

/// Bidirectional message link to the backend.
pub trait LinkPort {
    fn connect(&mut self) -> Result<(), LinkError>;

    /// Publish one telemetry report on the outbound topic.
    fn publish(&mut self, payload: &[u8]) -> Result<(), LinkError>;

    /// Next inbound command payload, if one has arrived. Never blocks.
    fn try_receive(&mut self) -> Option<InboundMessage>;

    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting. Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], never clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
