//! Task Watchdog Timer (TWDT).
//!
//! The network task subscribes itself and feeds once per poll cycle. A stalled
//! command loop leaves the board deaf to the backend, so the TWDT panics and
//! the device reboots into a clean registry.
//!
//! On host builds the watchdog only records feeds, so tests can check that a
//! loop keeps it alive.

use std::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, esp_task_wdt_reset, ESP_OK};

#[cfg(not(target_os = "espidf"))]
use std::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(target_os = "espidf"))]
use std::sync::{Mutex, PoisonError};
#[cfg(not(target_os = "espidf"))]
use std::time::Instant;

pub struct Watchdog {
    timeout: Duration,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: AtomicU32,
    #[cfg(not(target_os = "espidf"))]
    last_feed: Mutex<Instant>,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    ///
    /// Subscription failure is logged and leaves an inert watchdog.
    #[cfg(target_os = "espidf")]
    pub fn new(timeout_ms: u32) -> Self {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: plain IDF calls; `cfg` outlives the reconfigure call and a
        // null handle subscribes the current task.
        let (reconfigured, added) = unsafe { (esp_task_wdt_reconfigure(&cfg), esp_task_wdt_add(core::ptr::null_mut())) };
        if reconfigured != ESP_OK as i32 {
            log::warn!("Watchdog: reconfigure returned {} (already running?)", reconfigured);
        }
        let subscribed = added == ESP_OK as i32;
        if subscribed {
            log::info!("Watchdog: network task subscribed ({}ms, panic on trigger)", timeout_ms);
        } else {
            log::warn!("Watchdog: subscribe failed ({}), running unguarded", added);
        }
        Self {
            timeout: Duration::from_millis(timeout_ms.into()),
            subscribed,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(timeout_ms: u32) -> Self {
        log::debug!("Watchdog(sim): {}ms", timeout_ms);
        Self {
            timeout: Duration::from_millis(timeout_ms.into()),
            feeds: AtomicU32::new(0),
            last_feed: Mutex::new(Instant::now()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reset the countdown for the subscribed task.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the TWDT entry of the current, subscribed task.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.feeds.fetch_add(1, Ordering::Relaxed);
            *self.last_feed.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
        }
    }

    /// Feeds seen so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u32 {
        self.feeds.load(Ordering::Relaxed)
    }

    /// True if the real TWDT would have fired by `now`.
    #[cfg(not(target_os = "espidf"))]
    pub fn expired(&self, now: Instant) -> bool {
        let last = *self.last_feed.lock().unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(last) > self.timeout
    }
}
