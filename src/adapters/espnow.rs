//! ESP-NOW peer transport.
//!
//! Implements [`PeerTransport`] for the lock actuator link.  Both boards
//! must transmit on the same Wi-Fi channel; when the station link moves
//! the radio to another channel, `esp_now_send` fails with
//! `ESP_ERR_ESPNOW_ARG` and the peer entry is re-registered on the
//! current channel.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: raw `esp_now_*` sys calls.
//! - **all other targets**: simulation stub that logs and records frames.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use log::info;

use crate::app::ports::{PeerAddress, PeerTransport};
use crate::error::PeerSendError;

pub struct EspNowTransport {
    peer_added: AtomicBool,
    /// Channel used when the radio cannot be queried (simulation).
    fallback_channel: AtomicU8,
    #[cfg(not(target_os = "espidf"))]
    sim_sent: std::sync::Mutex<Vec<(PeerAddress, Vec<u8>)>>,
}

impl EspNowTransport {
    /// Initialise ESP-NOW and register `peer` on the radio's channel.
    #[cfg(target_os = "espidf")]
    pub fn new(peer: &PeerAddress, channel: u8) -> Result<Self, PeerSendError> {
        // SAFETY: Wi-Fi has been started by the WiFi adapter before this
        // is called; esp_now_init has no other preconditions.
        let rc = unsafe { esp_idf_svc::sys::esp_now_init() };
        if rc != esp_idf_svc::sys::ESP_OK as i32 {
            return Err(PeerSendError::Other(rc));
        }
        let transport = Self {
            peer_added: AtomicBool::new(false),
            fallback_channel: AtomicU8::new(channel),
        };
        transport.reconfigure_peer(peer, transport.current_channel());
        Ok(transport)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(peer: &PeerAddress, channel: u8) -> Result<Self, PeerSendError> {
        let transport = Self {
            peer_added: AtomicBool::new(false),
            fallback_channel: AtomicU8::new(channel),
            sim_sent: std::sync::Mutex::new(Vec::new()),
        };
        transport.reconfigure_peer(peer, channel);
        Ok(transport)
    }

    /// Simulation: every frame sent so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_sent(&self) -> Vec<(PeerAddress, Vec<u8>)> {
        self.sim_sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_send(&self, peer: &PeerAddress, payload: &[u8]) -> Result<(), PeerSendError> {
        use esp_idf_svc::sys::{ESP_ERR_ESPNOW_ARG, ESP_OK, esp_now_send};

        // SAFETY: both pointers are valid for the duration of the call;
        // esp_now_send copies the payload before returning.
        let rc = unsafe { esp_now_send(peer.0.as_ptr(), payload.as_ptr(), payload.len()) };
        match rc {
            rc if rc == ESP_OK as i32 => Ok(()),
            rc if rc == ESP_ERR_ESPNOW_ARG as i32 => Err(PeerSendError::ChannelMismatch),
            rc => Err(PeerSendError::Other(rc)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_send(&self, peer: &PeerAddress, payload: &[u8]) -> Result<(), PeerSendError> {
        if let Ok(mut sent) = self.sim_sent.lock() {
            sent.push((*peer, payload.to_vec()));
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_register(&self, peer: &PeerAddress, channel: u8, modify: bool) -> i32 {
        use esp_idf_svc::sys::{esp_now_add_peer, esp_now_mod_peer, esp_now_peer_info_t, wifi_interface_t_WIFI_IF_STA};

        let info = esp_now_peer_info_t {
            peer_addr: peer.0,
            channel,
            ifidx: wifi_interface_t_WIFI_IF_STA,
            encrypt: false,
            ..Default::default()
        };
        // SAFETY: `info` is fully initialised and only read by the call.
        unsafe {
            if modify {
                esp_now_mod_peer(&info)
            } else {
                esp_now_add_peer(&info)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_register(&self, _peer: &PeerAddress, channel: u8, _modify: bool) -> i32 {
        self.fallback_channel.store(channel, Ordering::Relaxed);
        0
    }
}

impl PeerTransport for EspNowTransport {
    fn send(&self, peer: &PeerAddress, payload: &[u8]) -> Result<(), PeerSendError> {
        self.platform_send(peer, payload)
    }

    fn reconfigure_peer(&self, peer: &PeerAddress, channel: u8) {
        let modify = self.peer_added.swap(true, Ordering::AcqRel);
        let rc = self.platform_register(peer, channel, modify);
        if rc == 0 {
            info!("ESP-NOW: peer {} on channel {}", peer, channel);
        } else {
            log::warn!("ESP-NOW: peer registration failed (rc={})", rc);
        }
    }

    #[cfg(target_os = "espidf")]
    fn current_channel(&self) -> u8 {
        let mut primary: u8 = 0;
        let mut secondary: esp_idf_svc::sys::wifi_second_chan_t = 0;
        // SAFETY: both out-pointers are valid locals.
        let rc = unsafe { esp_idf_svc::sys::esp_wifi_get_channel(&mut primary, &mut secondary) };
        if rc == esp_idf_svc::sys::ESP_OK as i32 && primary != 0 {
            primary
        } else {
            self.fallback_channel.load(Ordering::Relaxed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn current_channel(&self) -> u8 {
        self.fallback_channel.load(Ordering::Relaxed)
    }
}

// ───────────────────────────────────────────────────────────────
// Receive path
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static RX_TARGET: std::sync::OnceLock<(
    &'static crate::actuator::ActuatorLink,
    &'static EspNowTransport,
)> = std::sync::OnceLock::new();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn espnow_recv_cb(
    info: *const esp_idf_svc::sys::esp_now_recv_info_t,
    data: *const u8,
    len: core::ffi::c_int,
) {
    let Some((link, transport)) = RX_TARGET.get() else {
        return;
    };
    if info.is_null() || data.is_null() || len < 0 {
        return;
    }
    // SAFETY: ESP-NOW guarantees `info`, its `src_addr` and `data` are
    // valid for the duration of the callback; lengths were checked above.
    let (from, payload) = unsafe {
        let mut mac = [0u8; 6];
        core::ptr::copy_nonoverlapping((*info).src_addr, mac.as_mut_ptr(), 6);
        (PeerAddress(mac), core::slice::from_raw_parts(data, len as usize))
    };
    link.on_peer_frame(*transport, &from, payload);
}

/// Route received frames (actuator heartbeats) to `link`.  Runs in the
/// Wi-Fi task, not in interrupt context.
#[cfg(target_os = "espidf")]
pub fn register_receiver(
    link: &'static crate::actuator::ActuatorLink,
    transport: &'static EspNowTransport,
) -> Result<(), PeerSendError> {
    if RX_TARGET.set((link, transport)).is_err() {
        return Ok(());
    }
    // SAFETY: the callback only reads through the 'static references
    // stored above.
    let rc = unsafe { esp_idf_svc::sys::esp_now_register_recv_cb(Some(espnow_recv_cb)) };
    if rc == esp_idf_svc::sys::ESP_OK as i32 {
        Ok(())
    } else {
        Err(PeerSendError::Other(rc))
    }
}
