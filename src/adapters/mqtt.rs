//! MQTT [`LinkPort`] over the ESP-IDF client.
//!
//! The client callback runs on the esp-mqtt task. It only pushes received
//! payloads into the [`Inbox`] and flips the connection flag; all command
//! handling happens on the network worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use log::{error, info, warn};

use crate::app::ports::LinkPort;
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::link::{InboundMessage, Inbox};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MqttLink {
    config: LinkConfig,
    client: Option<EspMqttClient<'static>>,
    inbox: Arc<Inbox>,
    connected: Arc<AtomicBool>,
}

impl MqttLink {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            client: None,
            inbox: Arc::new(Inbox::new()),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn wait_connected(&self) -> Result<(), LinkError> {
        let deadline = Instant::now() + CONNECT_TIMEOUT;
        while !self.is_connected() {
            if Instant::now() >= deadline {
                return Err(LinkError::BrokerConnectFailed);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        Ok(())
    }
}

impl LinkPort for MqttLink {
    fn connect(&mut self) -> Result<(), LinkError> {
        let url = self.config.broker_url();
        let conf = MqttClientConfiguration {
            client_id: Some(&self.config.client_id),
            username: (!self.config.username.is_empty()).then_some(self.config.username.as_str()),
            password: (!self.config.password.is_empty()).then_some(self.config.password.as_str()),
            keep_alive_interval: Some(Duration::from_secs(self.config.keep_alive_secs.into())),
            ..Default::default()
        };

        let inbox = self.inbox.clone();
        let connected = self.connected.clone();
        let client = EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => connected.store(true, Ordering::Release),
            EventPayload::Disconnected => connected.store(false, Ordering::Release),
            EventPayload::Received { data, .. } => {
                inbox.offer(data);
            }
            EventPayload::Error(e) => warn!("MQTT: {:?}", e),
            _ => {}
        })
        .map_err(|e| {
            error!("MQTT client init failed: {:?}", e);
            LinkError::BrokerConnectFailed
        })?;
        self.client = Some(client);

        self.wait_connected()?;
        let client = self.client.as_mut().ok_or(LinkError::Disconnected)?;
        client
            .subscribe(&self.config.subscribe_topic, QoS::AtMostOnce)
            .map_err(|e| {
                error!("MQTT subscribe failed: {:?}", e);
                LinkError::SubscribeFailed
            })?;
        info!("MQTT: connected to {}, listening on '{}'", url, self.config.subscribe_topic);
        Ok(())
    }

    fn publish(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::Disconnected);
        }
        let client = self.client.as_mut().ok_or(LinkError::Disconnected)?;
        client
            .publish(&self.config.publish_topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| LinkError::PublishFailed)
    }

    fn try_receive(&mut self) -> Option<InboundMessage> {
        self.inbox.try_take()
    }

    fn disconnect(&mut self) {
        self.client = None;
        self.connected.store(false, Ordering::Release);
        info!("MQTT: disconnected");
    }
}
