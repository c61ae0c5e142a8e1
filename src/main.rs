//! AccessNode Firmware — Main Entry Point
//!
//! Brings up the radios and peripherals, leaks the [`Node`] to `'static`
//! and spawns one core-pinned thread per blocking task.
//!
//! ```text
//! ┌─────────────────────────── Core 0 (PRO) ───────────────────────────┐
//! │  actuator (23)        http (19)             wifi (19)              │
//! │  ESP-NOW release      POST + dispatch       reconnect policy       │
//! └────────────────────────────────────────────────────────────────────┘
//! ┌─────────────────────────── Core 1 (APP) ───────────────────────────┐
//! │  node-core (10): LocalExecutor                keypad (10)          │
//! │    scheduler · formatter · display · LEDs     UART RX → intake     │
//! └────────────────────────────────────────────────────────────────────┘
//!        ▲ release button ISR claims the actuator token directly
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use futures_lite::future::block_on;
use log::{error, info, warn};

use accessnode::adapters::espnow::{self, EspNowTransport};
use accessnode::adapters::http::HttpAdapter;
use accessnode::adapters::log_sink::LogEventSink;
use accessnode::adapters::time::SystemClock;
use accessnode::adapters::uart::{self, UartDisplay};
use accessnode::adapters::wifi::{self, WifiAdapter, WifiCredentials};
use accessnode::app::ports::PeerAddress;
use accessnode::config::NodeConfig;
use accessnode::drivers::hw_init;
use accessnode::drivers::status_led::LockIndicator;
use accessnode::drivers::task_pin::{
    ACTUATOR_TASK, CORE_TASK, HTTP_TASK, KEYPAD_TASK, WIFI_TASK, spawn_task,
};
use accessnode::error::Error;
use accessnode::node::Node;
use accessnode::pins;

/// Defaults plus station credentials baked in at build time.
fn load_config() -> NodeConfig {
    NodeConfig {
        wifi_ssid: option_env!("ACCESSNODE_WIFI_SSID").unwrap_or_default().into(),
        wifi_password: option_env!("ACCESSNODE_WIFI_PASSWORD")
            .unwrap_or_default()
            .into(),
        ..NodeConfig::default()
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AccessNode v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Node core ──────────────────────────────────────────
    let config = load_config();
    let node: &'static Node = Box::leak(Box::new(Node::new(config)?));
    let sink: &'static LogEventSink = Box::leak(Box::new(LogEventSink::new()));
    let clock: &'static SystemClock = Box::leak(Box::new(SystemClock::new()));
    let config = node.config();

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // Release button first: a press during bring-up is still served once
    // the actuator task starts.
    if let Err(e) = hw_init::init_release_button(node.arbiter()) {
        error!("hw_init: {} — manual release disabled", e);
    }

    let indicator = LockIndicator::new(
        PinDriver::output(peripherals.pins.gpio38)?,
        PinDriver::output(peripherals.pins.gpio39)?,
    );
    info!(
        "hw_init: indicator on GPIO{}/GPIO{}",
        pins::LOCKED_LED_GPIO,
        pins::UNLOCKED_LED_GPIO
    );

    let uart: &'static UartDriver<'static> = Box::leak(Box::new(UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::DISPLAY_UART_BAUD)),
    )?));
    info!(
        "hw_init: display UART{} TX GPIO{} RX GPIO{} @ {} baud",
        pins::DISPLAY_UART_PORT,
        pins::DISPLAY_UART_TX_GPIO,
        pins::DISPLAY_UART_RX_GPIO,
        pins::DISPLAY_UART_BAUD
    );

    // ── 4. Radios ─────────────────────────────────────────────
    let credentials =
        WifiCredentials::new(&config.wifi_ssid, &config.wifi_password).map_err(Error::from)?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let mut link = WifiAdapter::new(esp_wifi, credentials, config.wifi_channel)
        .map_err(Error::from)?;
    // The subscription must outlive main(); the tasks keep running after it returns.
    Box::leak(Box::new(
        wifi::subscribe_link_events(&sysloop, node, sink).map_err(Error::from)?,
    ));

    let peer = PeerAddress(config.peer_mac);
    let transport: &'static EspNowTransport = Box::leak(Box::new(
        EspNowTransport::new(&peer, config.wifi_channel).map_err(Error::from)?,
    ));
    if let Err(e) = espnow::register_receiver(node.actuator(), transport) {
        warn!("ESP-NOW: receive callback not registered ({}), heartbeats unanswered", e);
    }

    // ── 5. Tasks ──────────────────────────────────────────────
    spawn_task(ACTUATOR_TASK, move || block_on(node.run_actuator(transport, sink)))?;

    spawn_task(HTTP_TASK, move || {
        let mut http = HttpAdapter::new();
        block_on(node.run_transmitter(&mut http, sink));
    })?;

    spawn_task(WIFI_TASK, move || block_on(node.run_reconnect(&mut link)))?;

    spawn_task(KEYPAD_TASK, move || {
        let intake = node.intake();
        uart::run_keypad_rx(uart, |frame| {
            block_on(intake.on_code_received(frame));
        });
    })?;

    spawn_task(CORE_TASK, move || {
        let mut display = UartDisplay::new(uart);
        let mut indicator = indicator;
        let executor: edge_executor::LocalExecutor<'_, 8> = edge_executor::LocalExecutor::new();

        executor.spawn(node.run_scheduler()).detach();
        executor.spawn(node.run_formatter(clock, sink)).detach();
        executor
            .spawn(node.run_display(&mut display, clock, sink))
            .detach();
        executor.spawn(node.run_indicator(&mut indicator)).detach();

        block_on(executor.run(core::future::pending::<()>()));
    })?;

    node.start(sink);
    info!("System ready.");
    Ok(())
}
