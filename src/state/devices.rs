//! Device identities, levels and the shared device state table.
//!
//! The table is read by any task (display, diagnostics) and written by two
//! parties only: the supervisor applying `DeviceControl` commands, and the
//! owning module's worker claiming or releasing its devices. Each slot is an
//! `AtomicU8`, so readers never block and never see a torn value.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use super::modules::ModuleId;

/// Total number of controllable devices.
pub const DEVICE_COUNT: usize = 9;

/// Controllable outputs, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DeviceId {
    RedIndicator = 0,
    GreenIndicator = 1,
    YellowIndicator = 2,
    Buzzer = 3,
    MotionGreen = 4,
    MotionRed = 5,
    MotionBlue = 6,
    ClimateFan = 7,
    ClimatePump = 8,
}

impl DeviceId {
    pub const ALL: [Self; DEVICE_COUNT] = [
        Self::RedIndicator,
        Self::GreenIndicator,
        Self::YellowIndicator,
        Self::Buzzer,
        Self::MotionGreen,
        Self::MotionRed,
        Self::MotionBlue,
        Self::ClimateFan,
        Self::ClimatePump,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The module whose worker drives this device.
    pub const fn owner(self) -> ModuleId {
        match self {
            Self::RedIndicator | Self::GreenIndicator | Self::YellowIndicator | Self::Buzzer => {
                ModuleId::ActuatorLed
            }
            Self::MotionGreen | Self::MotionRed | Self::MotionBlue => ModuleId::MotionLight,
            Self::ClimateFan | Self::ClimatePump => ModuleId::TempHumidity,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── DeviceLevel ────────────────────────────────────────────────

/// Drive level of a device.
///
/// `0` is Closed, `1..=8` are increasing on-levels and `9` means the owning
/// module is not running. Values above 9 can only arrive through permissive
/// wire decoding and are stored as received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceLevel(u8);

impl DeviceLevel {
    pub const CLOSED: Self = Self(0);
    pub const MIN_ON: Self = Self(1);
    pub const MAX_ON: Self = Self(8);
    pub const DISCONNECTED: Self = Self(9);

    /// Validated constructor: `None` for anything outside 0–9.
    pub const fn new(raw: u8) -> Option<Self> {
        if raw <= Self::DISCONNECTED.0 {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Unchecked constructor for permissive decoding.
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn is_closed(self) -> bool {
        self.0 == 0
    }

    pub const fn is_on(self) -> bool {
        self.0 >= Self::MIN_ON.0 && self.0 <= Self::MAX_ON.0
    }

    pub const fn is_disconnected(self) -> bool {
        self.0 == Self::DISCONNECTED.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 <= Self::DISCONNECTED.0
    }

    /// PWM duty for this level: `base` at level 1 rising linearly to 100 % at
    /// level 8. Anything that is not an on-level yields 0.
    pub fn duty_percent(self, base: u8) -> u8 {
        if !self.is_on() {
            return 0;
        }
        let base = u32::from(base.min(100));
        let step = u32::from(self.0 - Self::MIN_ON.0);
        let span = u32::from(Self::MAX_ON.0 - Self::MIN_ON.0);
        (base + (100 - base) * step / span) as u8
    }
}

impl fmt::Display for DeviceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── DeviceSet ──────────────────────────────────────────────────

/// Compact set of devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceSet(u16);

impl DeviceSet {
    pub const EMPTY: Self = Self(0);

    pub fn insert(&mut self, id: DeviceId) {
        self.0 |= 1 << id.index();
    }

    pub const fn contains(self, id: DeviceId) -> bool {
        self.0 & (1 << id as u16) != 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = DeviceId> {
        DeviceId::ALL.into_iter().filter(move |id| self.contains(*id))
    }
}

impl FromIterator<DeviceId> for DeviceSet {
    fn from_iter<I: IntoIterator<Item = DeviceId>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for id in iter {
            set.insert(id);
        }
        set
    }
}

// ── DeviceStateTable ───────────────────────────────────────────

/// Current level of every device.
#[derive(Debug)]
pub struct DeviceStateTable {
    levels: [AtomicU8; DEVICE_COUNT],
}

impl Default for DeviceStateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStateTable {
    /// Every device starts Disconnected: no owning worker runs at power-on.
    pub fn new() -> Self {
        Self {
            levels: core::array::from_fn(|_| AtomicU8::new(DeviceLevel::DISCONNECTED.raw())),
        }
    }

    pub fn get(&self, id: DeviceId) -> DeviceLevel {
        DeviceLevel(self.levels[id.index()].load(Ordering::Acquire))
    }

    /// Unconditional write. Callers other than the owning worker should use
    /// [`command`](Self::command).
    pub fn set(&self, id: DeviceId, level: DeviceLevel) {
        self.levels[id.index()].store(level.raw(), Ordering::Release);
    }

    /// Gated write: succeeds only when the device is not Disconnected.
    ///
    /// The check and the store are one atomic step, so a release by the owning
    /// worker can never be overwritten by a stale command.
    pub fn command(&self, id: DeviceId, level: DeviceLevel) -> bool {
        self.levels[id.index()]
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != DeviceLevel::DISCONNECTED.raw()).then_some(level.raw())
            })
            .is_ok()
    }

    /// Worker init: every device the module owns becomes Closed.
    pub fn claim(&self, module: ModuleId) {
        for &id in module.owned_devices() {
            self.set(id, DeviceLevel::CLOSED);
        }
    }

    /// Worker teardown: every device the module owns becomes Disconnected.
    pub fn release(&self, module: ModuleId) {
        for &id in module.owned_devices() {
            self.set(id, DeviceLevel::DISCONNECTED);
        }
    }

    /// Copy of every level at one instant per slot.
    pub fn snapshot(&self) -> [DeviceLevel; DEVICE_COUNT] {
        core::array::from_fn(|i| DeviceLevel(self.levels[i].load(Ordering::Acquire)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_boots_disconnected() {
        let table = DeviceStateTable::new();
        assert!(table.snapshot().iter().all(|l| l.is_disconnected()));
    }

    #[test]
    fn command_is_refused_while_disconnected() {
        let table = DeviceStateTable::new();
        assert!(!table.command(DeviceId::Buzzer, DeviceLevel::from_raw(5)));
        assert_eq!(table.get(DeviceId::Buzzer), DeviceLevel::DISCONNECTED);
    }

    #[test]
    fn claim_then_command_then_release() {
        let table = DeviceStateTable::new();
        table.claim(ModuleId::TempHumidity);
        assert_eq!(table.get(DeviceId::ClimateFan), DeviceLevel::CLOSED);
        assert_eq!(table.get(DeviceId::ClimatePump), DeviceLevel::CLOSED);
        assert_eq!(table.get(DeviceId::RedIndicator), DeviceLevel::DISCONNECTED);

        assert!(table.command(DeviceId::ClimateFan, DeviceLevel::from_raw(3)));
        assert_eq!(table.get(DeviceId::ClimateFan).raw(), 3);

        table.release(ModuleId::TempHumidity);
        assert_eq!(table.get(DeviceId::ClimateFan), DeviceLevel::DISCONNECTED);
    }

    #[test]
    fn command_may_write_the_sentinel_itself() {
        let table = DeviceStateTable::new();
        table.claim(ModuleId::ActuatorLed);
        assert!(table.command(DeviceId::RedIndicator, DeviceLevel::DISCONNECTED));
        assert!(table.get(DeviceId::RedIndicator).is_disconnected());
    }

    #[test]
    fn level_classification() {
        assert!(DeviceLevel::CLOSED.is_closed());
        assert!(!DeviceLevel::CLOSED.is_on());
        assert!((1..=8).all(|r| DeviceLevel::from_raw(r).is_on()));
        assert!(!DeviceLevel::DISCONNECTED.is_on());
        assert_eq!(DeviceLevel::new(10), None);
        assert!(!DeviceLevel::from_raw(200).is_valid());
    }

    #[test]
    fn duty_scales_from_base_to_full() {
        assert_eq!(DeviceLevel::MIN_ON.duty_percent(50), 50);
        assert_eq!(DeviceLevel::MAX_ON.duty_percent(50), 100);
        assert_eq!(DeviceLevel::from_raw(4).duty_percent(30), 60);
        assert_eq!(DeviceLevel::CLOSED.duty_percent(50), 0);
        assert_eq!(DeviceLevel::DISCONNECTED.duty_percent(50), 0);
    }

    #[test]
    fn device_set_basics() {
        let mut set = DeviceSet::EMPTY;
        set.insert(DeviceId::ClimatePump);
        set.insert(DeviceId::RedIndicator);
        assert_eq!(set.len(), 2);
        assert!(set.contains(DeviceId::ClimatePump));
        assert!(!set.contains(DeviceId::Buzzer));
        assert_eq!(set.iter().next(), Some(DeviceId::RedIndicator));
    }
}
