//! Inbound command protocol.
//!
//! Wire format, one message per MQTT payload:
//! ```text
//! ┌──────────┬──────────────────────────────┐
//! │ code (1B)│ value digits (0..N B)        │
//! │ '0'..'2' │ ASCII, one per module/device │
//! └──────────┴──────────────────────────────┘
//! ```
//!
//! | code | command        | values                                  |
//! |------|----------------|-----------------------------------------|
//! | `0`  | ModuleControl  | 7 digits, `0` = stop, anything else run |
//! | `1`  | PublishRequest | ignored                                 |
//! | `2`  | DeviceControl  | 9 digits, device level 0–9              |
//!
//! Values are positional by [`ModuleId`] / [`DeviceId`] ordinal. Missing
//! positions decode as `0` and surplus positions are ignored, unless the
//! policy demands full width. Values are never read past
//! [`COMMAND_CAPACITY`] bytes.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::state::{DeviceId, DeviceLevel, ModuleId, DEVICE_COUNT, MODULE_COUNT};

/// Fixed command buffer size: one code byte plus one digit per device.
pub const COMMAND_CAPACITY: usize = DEVICE_COUNT + 1;

/// Leading byte of every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    ModuleControl = b'0',
    PublishRequest = b'1',
    DeviceControl = b'2',
}

impl CommandCode {
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'0' => Some(Self::ModuleControl),
            b'1' => Some(Self::PublishRequest),
            b'2' => Some(Self::DeviceControl),
            _ => None,
        }
    }

    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Number of value digits a full-width message of this kind carries.
    pub const fn value_width(self) -> usize {
        match self {
            Self::ModuleControl => MODULE_COUNT,
            Self::PublishRequest => 0,
            Self::DeviceControl => DEVICE_COUNT,
        }
    }
}

/// How strictly payloads are checked.
///
/// The default accepts everything the deployed backend has ever sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPolicy {
    /// Reject ModuleControl / DeviceControl messages that are not full width.
    pub require_full_width: bool,
    /// Reject non-digit value bytes, and refuse to write the Disconnected
    /// sentinel through DeviceControl.
    pub reject_invalid_levels: bool,
}

impl CommandPolicy {
    pub const PERMISSIVE: Self = Self {
        require_full_width: false,
        reject_invalid_levels: false,
    };

    pub const STRICT: Self = Self {
        require_full_width: true,
        reject_invalid_levels: true,
    };
}

/// A decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Desired run state of every module, by ordinal.
    ModuleControl([bool; MODULE_COUNT]),
    /// Publish a telemetry report now.
    PublishRequest,
    /// Desired level of every device, by ordinal.
    DeviceControl([DeviceLevel; DEVICE_COUNT]),
}

impl Command {
    pub const fn code(&self) -> CommandCode {
        match self {
            Self::ModuleControl(_) => CommandCode::ModuleControl,
            Self::PublishRequest => CommandCode::PublishRequest,
            Self::DeviceControl(_) => CommandCode::DeviceControl,
        }
    }

    /// Build a ModuleControl command that runs exactly `running`.
    pub fn modules(running: &[ModuleId]) -> Self {
        let mut desired = [false; MODULE_COUNT];
        for id in running {
            desired[id.index()] = true;
        }
        Self::ModuleControl(desired)
    }

    /// Build a DeviceControl command from `(device, level)` pairs; every
    /// other device is set to Closed.
    pub fn devices(levels: &[(DeviceId, DeviceLevel)]) -> Self {
        let mut desired = [DeviceLevel::CLOSED; DEVICE_COUNT];
        for (id, level) in levels {
            desired[id.index()] = *level;
        }
        Self::DeviceControl(desired)
    }

    /// Render as a full-width wire payload.
    pub fn encode(&self) -> heapless::Vec<u8, COMMAND_CAPACITY> {
        let mut out = heapless::Vec::new();
        // Capacity covers the widest command, so these pushes cannot fail.
        let _ = out.push(self.code().as_byte());
        match self {
            Self::ModuleControl(desired) => {
                for &run in desired {
                    let _ = out.push(if run { b'1' } else { b'0' });
                }
            }
            Self::PublishRequest => {}
            Self::DeviceControl(levels) => {
                for level in levels {
                    let _ = out.push(b'0'.wrapping_add(level.raw()));
                }
            }
        }
        out
    }
}

/// Decode one inbound payload.
pub fn decode(bytes: &[u8], policy: CommandPolicy) -> Result<Command, DecodeError> {
    let (&first, values) = bytes.split_first().ok_or(DecodeError::Empty)?;
    let code = CommandCode::from_byte(first).ok_or(DecodeError::UnknownCommandCode(first))?;

    if code == CommandCode::PublishRequest {
        return Ok(Command::PublishRequest);
    }

    // Width is judged on the whole payload; only the first `width` values are read.
    let width = code.value_width();
    if policy.require_full_width && values.len() != width {
        return Err(DecodeError::WrongWidth {
            expected: width,
            found: values.len(),
        });
    }
    if policy.reject_invalid_levels {
        if let Some((i, &b)) = values.iter().take(width).enumerate().find(|(_, b)| !b.is_ascii_digit()) {
            return Err(DecodeError::InvalidDigit {
                position: i + 1,
                byte: b,
            });
        }
    }

    let digit = |i: usize| values.get(i).copied().unwrap_or(b'0');
    Ok(match code {
        CommandCode::ModuleControl => Command::ModuleControl(core::array::from_fn(|i| digit(i) != b'0')),
        CommandCode::DeviceControl => {
            Command::DeviceControl(core::array::from_fn(|i| DeviceLevel::from_raw(digit(i).wrapping_sub(b'0'))))
        }
        CommandCode::PublishRequest => Command::PublishRequest,
    })
}
