//! Peripheral drivers, thread placement and the task watchdog.

#[cfg(target_os = "espidf")]
pub mod hw_init;
pub mod sht40;
pub mod task_pin;
pub mod watchdog;
