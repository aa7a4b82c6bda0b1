//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements     | Connects to                   |
//! |-------------|----------------|-------------------------------|
//! | `hardware`  | BoardPort      | ESP32 ADC, GPIO, LEDC, I2C    |
//! | `launcher`  | WorkerLauncher | Core-pinned worker threads    |
//! | `log_sink`  | EventSink      | Serial log output             |
//! | `loopback`  | LinkPort       | In-memory inbox (host)        |
//! | `mqtt`      | LinkPort       | ESP-IDF MQTT client           |
//! | `nvs`       | ConfigPort     | NVS / in-memory store         |
//! | `wifi`      | -              | ESP-IDF WiFi STA              |

pub mod hardware;
pub mod launcher;
pub mod log_sink;
pub mod loopback;
#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod nvs;
pub mod wifi;
