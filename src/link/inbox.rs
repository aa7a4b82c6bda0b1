//! Inbound command queue between the MQTT client callback and the network
//! worker.
//!
//! ```text
//! ┌──────────────┐ InboundMessage ┌────────────────┐
//! │ MQTT callback│──────────────▶│  LinkEngine    │
//! │ (client task)│   try_send     │  (net worker)  │
//! └──────────────┘                └────────────────┘
//! ```
//!
//! The callback must never block, so a full queue drops the message with a
//! warning instead of waiting.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::warn;

/// Largest payload accepted from the broker.
pub const MAX_PAYLOAD: usize = 64;

/// Messages buffered between two network polls.
pub const INBOX_DEPTH: usize = 4;

/// One inbound command payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    payload: Vec<u8, MAX_PAYLOAD>,
}

impl InboundMessage {
    /// `None` if `bytes` does not fit in [`MAX_PAYLOAD`].
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes).ok().map(|payload| Self { payload })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }
}

pub struct Inbox {
    channel: Channel<CriticalSectionRawMutex, InboundMessage, INBOX_DEPTH>,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Inbox {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Queue a payload. Returns false if it was dropped.
    pub fn offer(&self, bytes: &[u8]) -> bool {
        let Some(msg) = InboundMessage::from_slice(bytes) else {
            warn!("Inbox: {}-byte payload exceeds {} bytes, dropped", bytes.len(), MAX_PAYLOAD);
            return false;
        };
        if self.channel.try_send(msg).is_err() {
            warn!("Inbox: queue full, dropping command");
            return false;
        }
        true
    }

    pub fn try_take(&self) -> Option<InboundMessage> {
        self.channel.try_receive().ok()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}
