//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements       | Connects to                  |
//! |------------|------------------|------------------------------|
//! | `espnow`   | PeerTransport    | ESP-NOW (lock actuator)      |
//! | `http`     | HttpClient       | ESP-IDF HTTP client          |
//! | `log_sink` | EventSink        | Serial log output            |
//! | `time`     | ClockPort        | ESP32 system clock           |
//! | `uart`     | DisplayTransport | Display controller UART      |
//! | `wifi`     | LinkPort         | ESP-IDF WiFi STA + soft-AP   |

pub mod espnow;
pub mod http;
pub mod log_sink;
pub mod time;
pub mod uart;
pub mod wifi;
