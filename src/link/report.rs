//! Telemetry report encoding.
//!
//! One CSV line per report, in the column order the backend parses:
//! `flame,gas,motion,lux,temperature,humidity`.

use core::fmt::Write;

use heapless::String;

use crate::state::Readings;

/// Worst case is `1,65535,65535,65535,-32768,255` (30 bytes).
pub const REPORT_CAPACITY: usize = 48;

pub fn format_report(r: &Readings) -> String<REPORT_CAPACITY> {
    let mut out = String::new();
    // Capacity covers the widest possible line.
    let _ = write!(
        out,
        "{},{},{},{},{},{}",
        u8::from(r.flame),
        r.gas,
        r.motion,
        r.lux,
        r.temperature,
        r.humidity
    );
    out
}
