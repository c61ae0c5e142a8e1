//! Backend HTTP client adapter.
//!
//! Implements [`HttpClient`]: one blocking POST per call, streaming the
//! response body into `on_data` chunk by chunk.  A fresh connection is
//! opened for every request so that each carries its own timeout.
//!
//! Any exchange that gets as far as a status line counts as delivered,
//! whatever the status: the body goes to dispatch, which decides between
//! display and `restart`.  Only transport failures consume a retry.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::http::client::EspHttpConnection`.
//! - **all other targets**: simulated backend answering from canned
//!   responses, so the whole pipeline can run on a host.

use log::{debug, warn};

use crate::app::ports::{HttpClient, HttpRequest};
use crate::error::HttpError;

const CHUNK: usize = 256;

/// Map a response status to the transmit outcome.  `0` (or anything
/// outside the HTTP range) means no status line was read.
fn completed_exchange(status: u16) -> Result<(), HttpError> {
    if !(100..=599).contains(&status) {
        return Err(HttpError::Io(i32::from(status)));
    }
    if !(200..300).contains(&status) {
        warn!("HTTP: backend answered {} — passing body to dispatch", status);
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct HttpAdapter {
    #[cfg(not(target_os = "espidf"))]
    sim_posts: u32,
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(target_os = "espidf")]
    fn platform_post(
        &mut self,
        request: &HttpRequest<'_>,
        on_data: &mut dyn FnMut(&[u8]),
    ) -> Result<(), HttpError> {
        use esp_idf_svc::http::Method;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        let config = Configuration {
            timeout: Some(core::time::Duration::from_millis(request.timeout.as_millis())),
            ..Default::default()
        };
        let mut conn = EspHttpConnection::new(&config).map_err(|_| HttpError::Connect)?;

        let length = request.body.len().to_string();
        let mut headers: heapless::Vec<(&str, &str), 8> = heapless::Vec::new();
        for &h in request.headers.iter().take(7) {
            let _ = headers.push(h);
        }
        let _ = headers.push(("Content-Length", length.as_str()));

        conn.initiate_request(Method::Post, request.url, &headers)
            .map_err(|e| HttpError::Io(e.code()))?;
        let mut written = 0;
        while written < request.body.len() {
            written += conn
                .write(&request.body.as_bytes()[written..])
                .map_err(|e| HttpError::Io(e.code()))?;
        }
        conn.initiate_response().map_err(|_| HttpError::Timeout)?;

        completed_exchange(conn.status())?;

        let mut buf = [0u8; CHUNK];
        loop {
            let n = conn.read(&mut buf).map_err(|e| HttpError::Io(e.code()))?;
            if n == 0 {
                break;
            }
            on_data(&buf[..n]);
        }
        Ok(())
    }

    /// Simulated backend: TIME answers with the host clock, RESERVATION
    /// with "no reservation", ACCESS_CODE with "invalid".
    #[cfg(not(target_os = "espidf"))]
    fn platform_post(
        &mut self,
        request: &HttpRequest<'_>,
        on_data: &mut dyn FnMut(&[u8]),
    ) -> Result<(), HttpError> {
        self.sim_posts = self.sim_posts.wrapping_add(1);
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|_| HttpError::Io(-1))?
            .as_secs();

        let (status, body) = if request.url.ends_with("time/") {
            (200, format!(r#"{{"id":0,"responseCode":1,"serverTime":{now}}}"#))
        } else if request.url.ends_with("reserve/") {
            (200, r#"{"id":1,"responseCode":7}"#.to_owned())
        } else if request.url.ends_with("value/") {
            (200, r#"{"id":2,"responseCode":2}"#.to_owned())
        } else {
            (404, String::new())
        };
        completed_exchange(status)?;

        for chunk in body.as_bytes().chunks(CHUNK) {
            on_data(chunk);
        }
        Ok(())
    }
}

impl HttpClient for HttpAdapter {
    fn post(
        &mut self,
        request: &HttpRequest<'_>,
        on_data: &mut dyn FnMut(&[u8]),
    ) -> Result<(), HttpError> {
        debug!("HTTP: POST {} ({} bytes)", request.url, request.body.len());
        self.platform_post(request, on_data)
    }
}
