//! System configuration parameters
//!
//! All tunable parameters for the smart-home controller. Values are persisted
//! to NVS as a postcard blob and fall back to these defaults on first boot.

use serde::{Deserialize, Serialize};

use crate::app::commands::CommandPolicy;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Periodic telemetry report interval (milliseconds)
    pub report_interval_ms: u32,
    /// Sensing worker poll period (milliseconds)
    pub sensing_period_ms: u32,
    /// Display refresh period (milliseconds)
    pub display_period_ms: u32,
    /// Network worker poll period (milliseconds)
    pub link_poll_ms: u32,
    /// Upper bound on waiting for a worker to exit (milliseconds)
    pub stop_timeout_ms: u32,

    // --- Thresholds ---
    /// Gas ADC reading above which the alarm sounds
    pub gas_alarm_threshold: u16,

    // --- Actuators ---
    pub buzzer_freq_hz: u32,
    /// Buzzer duty cycle (0-100%)
    pub buzzer_duty_percent: u8,
    pub led_freq_hz: u32,
    /// Duty cycle at level 1; level 8 is always 100%
    pub led_base_duty_percent: u8,
    pub climate_pwm_freq_hz: u32,

    // --- Command handling ---
    pub command_policy: CommandPolicy,

    // --- Network ---
    pub link: LinkConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Timing
            report_interval_ms: 1000, // 1 Hz
            sensing_period_ms: 100,   // 10 Hz
            display_period_ms: 10,
            link_poll_ms: 10,
            stop_timeout_ms: 500,

            // Thresholds
            gas_alarm_threshold: 300,

            // Actuators
            buzzer_freq_hz: 2700,
            buzzer_duty_percent: 10,
            led_freq_hz: 2700,
            led_base_duty_percent: 50,
            climate_pwm_freq_hz: 2700,

            command_policy: CommandPolicy::default(),
            link: LinkConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Check every field for a physically meaningful value.
    ///
    /// Invalid configs are rejected outright rather than clamped.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.report_interval_ms == 0 {
            return Err("report_interval_ms must be > 0");
        }
        if self.sensing_period_ms == 0 || self.display_period_ms == 0 || self.link_poll_ms == 0 {
            return Err("worker periods must be > 0");
        }
        if self.stop_timeout_ms == 0 {
            return Err("stop_timeout_ms must be > 0");
        }
        if self.buzzer_duty_percent == 0 || self.buzzer_duty_percent > 100 {
            return Err("buzzer_duty_percent must be 1..=100");
        }
        if self.led_base_duty_percent == 0 || self.led_base_duty_percent > 100 {
            return Err("led_base_duty_percent must be 1..=100");
        }
        if self.buzzer_freq_hz == 0 || self.led_freq_hz == 0 || self.climate_pwm_freq_hz == 0 {
            return Err("PWM frequencies must be > 0");
        }
        self.link.validate()
    }
}

/// MQTT broker and Wi-Fi station settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: String,
    pub password: String,
    /// Topic the controller listens on for commands
    pub subscribe_topic: String,
    /// Topic telemetry reports are published to
    pub publish_topic: String,
    pub keep_alive_secs: u16,
    pub wifi_ssid: String,
    pub wifi_password: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            broker_host: "192.168.17.107".into(),
            broker_port: 1883,
            client_id: "hi3861_device".into(),
            username: "hi3861_device".into(),
            password: String::new(),
            subscribe_topic: "hi3861/subscribe".into(),
            publish_topic: "hi3861/publish".into(),
            keep_alive_secs: 20,
            wifi_ssid: String::new(),
            wifi_password: String::new(),
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.broker_host.is_empty() {
            return Err("broker_host must not be empty");
        }
        if self.broker_port == 0 {
            return Err("broker_port must be > 0");
        }
        if self.client_id.is_empty() {
            return Err("client_id must not be empty");
        }
        if self.subscribe_topic.is_empty() || self.publish_topic.is_empty() {
            return Err("MQTT topics must not be empty");
        }
        if self.subscribe_topic == self.publish_topic {
            return Err("subscribe and publish topics must differ");
        }
        // The Wi-Fi driver rejects SSIDs over 32 bytes and passphrases over 64.
        if self.wifi_ssid.len() > 32 || self.wifi_password.len() > 64 {
            return Err("WiFi credentials too long");
        }
        Ok(())
    }

    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.broker_host, self.broker_port)
    }
}
