//! Module identities and the registry of which module workers are present.
//!
//! The registry is owned exclusively by the supervisor; nothing else mutates
//! it, so it needs no synchronisation of its own.

use core::fmt;

use super::devices::DeviceId;

/// Total number of expansion-board modules.
pub const MODULE_COUNT: usize = 7;

/// Expansion-board modules, in wire order.
///
/// The ordinal is the position of the module's digit in a `ModuleControl`
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ModuleId {
    Fire = 0,
    Gas = 1,
    Display = 2,
    ActuatorLed = 3,
    NetworkLink = 4,
    MotionLight = 5,
    TempHumidity = 6,
}

impl ModuleId {
    pub const ALL: [Self; MODULE_COUNT] = [
        Self::Fire,
        Self::Gas,
        Self::Display,
        Self::ActuatorLed,
        Self::NetworkLink,
        Self::MotionLight,
        Self::TempHumidity,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        if index < MODULE_COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Devices whose level this module drives. Empty for pure sensors.
    pub const fn owned_devices(self) -> &'static [DeviceId] {
        match self {
            Self::ActuatorLed => &[
                DeviceId::RedIndicator,
                DeviceId::GreenIndicator,
                DeviceId::YellowIndicator,
                DeviceId::Buzzer,
            ],
            Self::MotionLight => &[DeviceId::MotionGreen, DeviceId::MotionRed, DeviceId::MotionBlue],
            Self::TempHumidity => &[DeviceId::ClimateFan, DeviceId::ClimatePump],
            Self::Fire | Self::Gas | Self::Display | Self::NetworkLink => &[],
        }
    }

    /// The network link carries the command channel itself and can never be
    /// started or stopped by a command.
    pub const fn is_supervisor_exempt(self) -> bool {
        matches!(self, Self::NetworkLink)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Gas => "Gas",
            Self::Display => "Display",
            Self::ActuatorLed => "ActuatorLED",
            Self::NetworkLink => "NetworkLink",
            Self::MotionLight => "MotionLight",
            Self::TempHumidity => "TempHumidity",
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── ModuleSet ──────────────────────────────────────────────────

/// Compact set of modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModuleSet(u16);

impl ModuleSet {
    pub const EMPTY: Self = Self(0);

    pub fn insert(&mut self, id: ModuleId) {
        self.0 |= 1 << id.index();
    }

    pub const fn contains(self, id: ModuleId) -> bool {
        self.0 & (1 << id as u16) != 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = ModuleId> {
        ModuleId::ALL.into_iter().filter(move |id| self.contains(*id))
    }
}

impl FromIterator<ModuleId> for ModuleSet {
    fn from_iter<I: IntoIterator<Item = ModuleId>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for id in iter {
            set.insert(id);
        }
        set
    }
}

// ── Registry ───────────────────────────────────────────────────

/// Presence state of one module slot.
#[derive(Debug)]
pub enum ModuleState<H> {
    Stopped,
    /// A worker is running and `H` is the handle used to stop it.
    Running(H),
    /// Present for the lifetime of the firmware and never commandable.
    Resident,
}

impl<H> ModuleState<H> {
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

/// Per-module presence record.
#[derive(Debug)]
pub struct ModuleRegistry<H> {
    slots: [ModuleState<H>; MODULE_COUNT],
}

impl<H> Default for ModuleRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ModuleRegistry<H> {
    /// All modules start out Stopped.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| ModuleState::Stopped),
        }
    }

    pub fn state(&self, id: ModuleId) -> &ModuleState<H> {
        &self.slots[id.index()]
    }

    pub fn is_present(&self, id: ModuleId) -> bool {
        self.slots[id.index()].is_present()
    }

    pub fn is_resident(&self, id: ModuleId) -> bool {
        matches!(self.slots[id.index()], ModuleState::Resident)
    }

    pub fn handle(&self, id: ModuleId) -> Option<&H> {
        match &self.slots[id.index()] {
            ModuleState::Running(h) => Some(h),
            _ => None,
        }
    }

    /// Record a freshly started worker.
    ///
    /// Only a Stopped slot accepts a handle; otherwise the handle is given back.
    pub fn set_running(&mut self, id: ModuleId, handle: H) -> Result<(), H> {
        let slot = &mut self.slots[id.index()];
        if matches!(slot, ModuleState::Stopped) {
            *slot = ModuleState::Running(handle);
            Ok(())
        } else {
            Err(handle)
        }
    }

    /// Remove a running worker's handle, leaving the slot Stopped.
    ///
    /// Resident and Stopped slots are untouched.
    pub fn take_running(&mut self, id: ModuleId) -> Option<H> {
        let slot = &mut self.slots[id.index()];
        match core::mem::replace(slot, ModuleState::Stopped) {
            ModuleState::Running(h) => Some(h),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Pin a module as permanently present.
    pub fn mark_resident(&mut self, id: ModuleId) {
        self.slots[id.index()] = ModuleState::Resident;
    }

    /// Set of modules that are present (running or resident).
    pub fn present(&self) -> ModuleSet {
        ModuleId::ALL.into_iter().filter(|id| self.is_present(*id)).collect()
    }

    /// Modules with a live worker handle.
    pub fn running(&self) -> ModuleSet {
        ModuleId::ALL
            .into_iter()
            .filter(|id| self.handle(*id).is_some())
            .collect()
    }
}
