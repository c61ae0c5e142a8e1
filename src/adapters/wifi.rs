//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`]: the reconnect task calls `connect()`; link
//! state comes back asynchronously through the driver's event loop and is
//! forwarded to the [`Node`](crate::node::Node).  The soft-AP side runs on
//! the configured channel so the actuator peer can find the node before
//! the station link is up.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi` in APSTA mode.
//! - **all other targets**: simulation stub for host-side tests.

use log::info;
#[cfg(not(target_os = "espidf"))]
use log::warn;

use crate::app::ports::LinkPort;
use crate::error::LinkError;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), LinkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(LinkError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), LinkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(LinkError::InvalidPassword);
    }
    Ok(())
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, LinkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds.ssid.push_str(ssid).map_err(|()| LinkError::InvalidSsid)?;
        creds
            .password
            .push_str(password)
            .map_err(|()| LinkError::InvalidPassword)?;
        Ok(creds)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    credentials: WifiCredentials,
    ap_channel: u8,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    /// Simulation: counts connect() calls.
    #[cfg(not(target_os = "espidf"))]
    sim_connects: u32,
}

impl WifiAdapter {
    /// Configure the driver (station + soft-AP on `ap_channel`) and start it.
    #[cfg(target_os = "espidf")]
    pub fn new(
        mut wifi: esp_idf_svc::wifi::EspWifi<'static>,
        credentials: WifiCredentials,
        ap_channel: u8,
    ) -> Result<Self, LinkError> {
        use esp_idf_svc::wifi::{AccessPointConfiguration, ClientConfiguration, Configuration};

        let client = ClientConfiguration {
            ssid: credentials
                .ssid()
                .try_into()
                .map_err(|()| LinkError::InvalidSsid)?,
            password: credentials
                .password()
                .try_into()
                .map_err(|()| LinkError::InvalidPassword)?,
            ..Default::default()
        };
        let ap = AccessPointConfiguration {
            channel: ap_channel,
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Mixed(client, ap))
            .map_err(|e| LinkError::ConnectFailed(e.code()))?;
        wifi.start().map_err(|e| LinkError::ConnectFailed(e.code()))?;
        info!("WiFi: started (APSTA, AP channel {})", ap_channel);

        Ok(Self {
            credentials,
            ap_channel,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(credentials: WifiCredentials, ap_channel: u8) -> Result<Self, LinkError> {
        info!("WiFi(sim): started (AP channel {})", ap_channel);
        Ok(Self {
            credentials,
            ap_channel,
            sim_connects: 0,
        })
    }

    pub fn ap_channel(&self) -> u8 {
        self.ap_channel
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), LinkError> {
        self.wifi
            .connect()
            .map_err(|e| LinkError::ConnectFailed(e.code()))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), LinkError> {
        self.sim_connects = self.sim_connects.wrapping_add(1);
        // Every 10th request fails to exercise the reconnect path.
        if self.sim_connects % 10 == 3 {
            warn!("WiFi(sim): simulated connect failure (attempt {})", self.sim_connects);
            return Err(LinkError::ConnectFailed(-1));
        }
        info!("WiFi(sim): connect requested (attempt {})", self.sim_connects);
        Ok(())
    }
}

impl LinkPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), LinkError> {
        info!("WiFi: connecting to '{}'", self.credentials.ssid());
        self.platform_connect()
    }
}

// ───────────────────────────────────────────────────────────────
// Link events
// ───────────────────────────────────────────────────────────────

/// Forward station connect / disconnect events to the node.  The returned
/// subscription must be kept alive.
#[cfg(target_os = "espidf")]
pub fn subscribe_link_events(
    sysloop: &esp_idf_svc::eventloop::EspSystemEventLoop,
    node: &'static crate::node::Node,
    sink: &'static dyn crate::app::ports::EventSink,
) -> Result<esp_idf_svc::eventloop::EspSubscription<'static, esp_idf_svc::eventloop::System>, LinkError>
{
    use esp_idf_svc::wifi::WifiEvent;

    sysloop
        .subscribe::<WifiEvent, _>(move |event| match event {
            WifiEvent::StaConnected(_) => {
                node.on_link_up(sink);
            }
            WifiEvent::StaDisconnected(_) => {
                node.on_link_down(sink);
            }
            _ => {}
        })
        .map_err(|e| LinkError::ConnectFailed(e.code()))
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
