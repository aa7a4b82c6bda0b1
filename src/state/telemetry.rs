//! Latest sensor readings and the publish-now request flag.
//!
//! Each sensing worker writes only the fields it measures; the network worker
//! and the display read a [`Readings`] snapshot.

use core::sync::atomic::{AtomicBool, AtomicI16, AtomicU16, AtomicU8, Ordering};

use serde::Serialize;

use super::modules::ModuleId;

/// Plain copy of the readings at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Readings {
    pub flame: bool,
    /// Flame detector amplifier ADC value.
    pub flame_amp: u16,
    pub gas: u16,
    pub motion: u16,
    pub lux: u16,
    /// Degrees Celsius.
    pub temperature: i16,
    /// Percent relative humidity.
    pub humidity: u8,
}

#[derive(Debug, Default)]
pub struct Telemetry {
    flame: AtomicBool,
    flame_amp: AtomicU16,
    gas: AtomicU16,
    motion: AtomicU16,
    lux: AtomicU16,
    temperature: AtomicI16,
    humidity: AtomicU8,
    publish_now: AtomicBool,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flame(&self, flame: bool, amp: u16) {
        self.flame.store(flame, Ordering::Relaxed);
        self.flame_amp.store(amp, Ordering::Relaxed);
    }

    pub fn set_gas(&self, value: u16) {
        self.gas.store(value, Ordering::Relaxed);
    }

    pub fn set_motion(&self, motion: u16, lux: u16) {
        self.motion.store(motion, Ordering::Relaxed);
        self.lux.store(lux, Ordering::Relaxed);
    }

    pub fn set_climate(&self, temperature: i16, humidity: u8) {
        self.temperature.store(temperature, Ordering::Relaxed);
        self.humidity.store(humidity, Ordering::Relaxed);
    }

    /// Zero the fields `module` publishes, so a stopped board reports idle.
    pub fn reset_for(&self, module: ModuleId) {
        match module {
            ModuleId::Fire => self.set_flame(false, 0),
            ModuleId::Gas => self.set_gas(0),
            ModuleId::MotionLight => self.set_motion(0, 0),
            ModuleId::TempHumidity => self.set_climate(0, 0),
            ModuleId::Display | ModuleId::ActuatorLed | ModuleId::NetworkLink => {}
        }
    }

    /// Ask the network worker to publish at its next poll.
    pub fn request_publish(&self) {
        self.publish_now.store(true, Ordering::Release);
    }

    pub fn publish_requested(&self) -> bool {
        self.publish_now.load(Ordering::Acquire)
    }

    /// Consume a pending publish request.
    pub fn take_publish_request(&self) -> bool {
        self.publish_now.swap(false, Ordering::AcqRel)
    }

    pub fn snapshot(&self) -> Readings {
        Readings {
            flame: self.flame.load(Ordering::Relaxed),
            flame_amp: self.flame_amp.load(Ordering::Relaxed),
            gas: self.gas.load(Ordering::Relaxed),
            motion: self.motion.load(Ordering::Relaxed),
            lux: self.lux.load(Ordering::Relaxed),
            temperature: self.temperature.load(Ordering::Relaxed),
            humidity: self.humidity.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_request_is_consumed_once() {
        let t = Telemetry::new();
        assert!(!t.take_publish_request());
        t.request_publish();
        t.request_publish();
        assert!(t.publish_requested());
        assert!(t.take_publish_request());
        assert!(!t.take_publish_request());
    }

    #[test]
    fn reset_only_touches_the_module_fields() {
        let t = Telemetry::new();
        t.set_gas(420);
        t.set_climate(27, 58);
        t.reset_for(ModuleId::Gas);
        let r = t.snapshot();
        assert_eq!(r.gas, 0);
        assert_eq!(r.temperature, 27);
        assert_eq!(r.humidity, 58);
    }
}
