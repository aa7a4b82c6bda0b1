//! In-memory [`LinkPort`] for host runs and tests.
//!
//! Inbound payloads go through the same [`Inbox`] the MQTT callback feeds,
//! and every published report is kept for inspection.

use std::sync::Arc;

use log::info;

use crate::app::ports::LinkPort;
use crate::error::LinkError;
use crate::link::{InboundMessage, Inbox};

#[derive(Default)]
pub struct LoopbackLink {
    inbox: Arc<Inbox>,
    published: Vec<Vec<u8>>,
    connected: bool,
    fail_publish: bool,
}

impl LoopbackLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared inbox, for feeding commands from another thread.
    pub fn inbox(&self) -> Arc<Inbox> {
        self.inbox.clone()
    }

    /// Queue an inbound payload as if it arrived from the broker.
    pub fn inject(&self, payload: &[u8]) -> bool {
        self.inbox.offer(payload)
    }

    pub fn published(&self) -> &[Vec<u8>] {
        &self.published
    }

    pub fn take_published(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.published)
    }

    /// Make every publish fail until cleared.
    pub fn set_fail_publish(&mut self, fail: bool) {
        self.fail_publish = fail;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl LinkPort for LoopbackLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        self.connected = true;
        info!("Loopback link connected");
        Ok(())
    }

    fn publish(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        if !self.connected {
            return Err(LinkError::Disconnected);
        }
        if self.fail_publish {
            return Err(LinkError::PublishFailed);
        }
        self.published.push(payload.to_vec());
        Ok(())
    }

    fn try_receive(&mut self) -> Option<InboundMessage> {
        self.inbox.try_take()
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}
