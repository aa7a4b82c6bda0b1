//! Application core: orchestration logic, zero I/O.
//!
//! This module holds the command protocol and the module supervisor. All
//! interaction with worker tasks, peripherals and the network happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real hardware.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
