//! Smart-home controller firmware library.
//!
//! Exposes the supervisor, the shared device table, the command decoder and
//! the worker runtime for integration testing. All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod link;
pub mod pins;
pub mod state;
pub mod workers;

pub mod adapters;
pub mod drivers;
