//! WiFi station bring-up.
//!
//! Credential checks run everywhere; the driver calls only on ESP-IDF.
//! Connection is attempted a fixed number of times at boot; the MQTT client
//! handles broker reconnects on its own once the netif is up.

use crate::error::LinkError;

#[cfg(target_os = "espidf")]
pub use esp::connect;

const MAX_SSID_LEN: usize = 32;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 64;

/// SSID must be 1–32 printable ASCII bytes. An empty password means an
/// open network; otherwise WPA2 needs 8–64 bytes.
pub fn validate_credentials(ssid: &str, password: &str) -> Result<(), LinkError> {
    let printable = ssid.bytes().all(|b| (0x20..=0x7E).contains(&b));
    if ssid.is_empty() || ssid.len() > MAX_SSID_LEN || !printable {
        return Err(LinkError::WifiConnectFailed);
    }
    if !password.is_empty() && !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password.len()) {
        return Err(LinkError::WifiConnectFailed);
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
mod esp {
    use std::time::Duration;

    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{info, warn};

    use super::validate_credentials;
    use crate::config::LinkConfig;
    use crate::error::LinkError;

    const CONNECT_ATTEMPTS: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    /// Bring the station up and wait for an IP. The returned driver must be
    /// kept alive for the connection to stay up.
    pub fn connect(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        link: &LinkConfig,
    ) -> Result<Box<EspWifi<'static>>, LinkError> {
        validate_credentials(&link.wifi_ssid, &link.wifi_password)?;
        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi: {:?}", e);
            LinkError::WifiConnectFailed
        };

        let mut esp_wifi = Box::new(EspWifi::new(modem, sys_loop.clone(), nvs).map_err(fail)?);
        let mut wifi = BlockingWifi::wrap(esp_wifi.as_mut(), sys_loop).map_err(fail)?;

        let auth_method = if link.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: link.wifi_ssid.as_str().try_into().map_err(|_| LinkError::WifiConnectFailed)?,
            password: link
                .wifi_password
                .as_str()
                .try_into()
                .map_err(|_| LinkError::WifiConnectFailed)?,
            auth_method,
            ..Default::default()
        }))
        .map_err(fail)?;
        wifi.start().map_err(fail)?;
        info!("WiFi: connecting to '{}'", link.wifi_ssid);

        for attempt in 1..=CONNECT_ATTEMPTS {
            match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                Ok(()) => {
                    info!("WiFi: connected on attempt {}", attempt);
                    drop(wifi);
                    return Ok(esp_wifi);
                }
                Err(e) => {
                    warn!("WiFi: attempt {}/{} failed: {:?}", attempt, CONNECT_ATTEMPTS, e);
                    let _ = wifi.disconnect();
                    std::thread::sleep(RETRY_DELAY);
                }
            }
        }
        Err(LinkError::WifiConnectFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_ssid() {
        assert_eq!(validate_credentials("", "password123"), Err(LinkError::WifiConnectFailed));
    }

    #[test]
    fn rejects_short_password() {
        assert_eq!(validate_credentials("MyNet", "short"), Err(LinkError::WifiConnectFailed));
    }

    #[test]
    fn accepts_open_network() {
        assert!(validate_credentials("OpenCafe", "").is_ok());
    }

    #[test]
    fn accepts_valid_wpa2() {
        assert!(validate_credentials("HomeWiFi", "mysecret8").is_ok());
    }

    #[test]
    fn rejects_non_printable_ssid() {
        assert!(validate_credentials("bad\u{7}net", "mysecret8").is_err());
    }
}
