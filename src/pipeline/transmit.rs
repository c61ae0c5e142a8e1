//! Request pipeline stages: submission, formatting, and bounded-retry
//! transmission to the backend.

use embassy_time::{Duration, Timer};
use log::{debug, error, info, warn};

use super::QUEUE_DEPTH;
use super::admission::GuardedQueue;
use super::formatter::{FormatContext, build_request};
use super::request::{PendingRequest, PipelineStats, RequestKind, StatsSnapshot, TerminalOutcome};
use crate::app::events::NodeEvent;
use crate::app::ports::{EventSink, HttpClient, HttpRequest};
use crate::config::NodeConfig;
use crate::dispatch::ResponseDispatch;
use crate::error::AdmissionError;
use crate::scheduler::RequestScheduler;

const JSON_HEADERS: &[(&str, &str)] = &[("Content-Type", "application/json")];

/// Attempt ceiling and spacing shared by every transmit loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            delay: config.retry_delay(),
        }
    }
}

pub struct RequestPipeline {
    intake: GuardedQueue<RequestKind, QUEUE_DEPTH>,
    outbound: GuardedQueue<PendingRequest, QUEUE_DEPTH>,
    base_url: String,
    http_timeout: Duration,
    retry: RetryPolicy,
    stats: PipelineStats,
}

impl RequestPipeline {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            intake: GuardedQueue::new(
                "Requests",
                config.admission_capacity,
                config.admission_wait(),
            ),
            outbound: GuardedQueue::new(
                "Outbound",
                config.admission_capacity,
                config.admission_wait(),
            ),
            base_url: config.backend_url.clone(),
            http_timeout: config.http_timeout(),
            retry: RetryPolicy::from_config(config),
            stats: PipelineStats::default(),
        }
    }

    /// Queue `kind` for formatting.  Refusals are logged and dropped; the
    /// caller's timer will bring the request back on its next cycle.
    pub async fn submit(&self, kind: RequestKind) -> Result<(), AdmissionError> {
        match self.intake.push(kind).await {
            Ok(()) => {
                self.stats.record_submit(true);
                debug!("Requests: {} submitted", kind);
                Ok(())
            }
            Err(rejected) => {
                self.stats.record_submit(false);
                warn!("Requests: {} dropped — {}", kind, rejected.reason);
                Err(rejected.reason)
            }
        }
    }

    /// Formatter stage: one submitted kind in, one queued request (or a
    /// fast restart) out.
    pub async fn format_next(
        &self,
        ctx: &FormatContext<'_>,
        scheduler: &RequestScheduler,
        sink: &dyn EventSink,
    ) {
        let kind = self.intake.pop().await;
        match build_request(kind, &self.base_url, ctx) {
            Ok(request) => {
                if let Err(rejected) = self.outbound.push(request).await {
                    warn!("Requests: {} not queued for transmit — {}", kind, rejected.reason);
                    self.dispose(rejected.item, TerminalOutcome::Rejected, sink);
                }
            }
            Err(e) => {
                warn!("Requests: {} format failed — {}", kind, e);
                scheduler.restart(kind, scheduler.fast_timeout());
                self.finish(kind, TerminalOutcome::FormatFailed, sink);
            }
        }
    }

    /// Transmit stage: POST the next request with bounded retries and hand
    /// the response body to `dispatch`.
    pub async fn transmit_next(
        &self,
        http: &mut impl HttpClient,
        dispatch: &ResponseDispatch<'_>,
        scheduler: &RequestScheduler,
        sink: &dyn EventSink,
    ) {
        let request = self.outbound.pop().await;
        let kind = request.kind();
        let mut response = Vec::new();

        match self.deliver(http, &request, &mut response).await {
            Some(attempts) => {
                info!("Requests: {} delivered (attempts={})", kind, attempts);
                self.dispose(request, TerminalOutcome::Delivered { attempts }, sink);
                if response.is_empty() {
                    debug!("Requests: {} response had no body", kind);
                } else {
                    dispatch.handle(&response).await;
                }
            }
            None => {
                error!(
                    "Requests: {} failed after {} attempts",
                    kind, self.retry.max_attempts
                );
                scheduler.restart(kind, scheduler.fast_timeout());
                self.dispose(request, TerminalOutcome::Exhausted, sink);
            }
        }
    }

    pub async fn run_formatter(
        &self,
        ctx: &FormatContext<'_>,
        scheduler: &RequestScheduler,
        sink: &dyn EventSink,
    ) {
        info!("Requests: formatter running");
        loop {
            self.format_next(ctx, scheduler, sink).await;
        }
    }

    pub async fn run_transmitter(
        &self,
        http: &mut impl HttpClient,
        dispatch: &ResponseDispatch<'_>,
        scheduler: &RequestScheduler,
        sink: &dyn EventSink,
    ) {
        info!("Requests: transmitter running (max attempts {})", self.retry.max_attempts);
        loop {
            self.transmit_next(http, dispatch, scheduler, sink).await;
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn intake(&self) -> &GuardedQueue<RequestKind, QUEUE_DEPTH> {
        &self.intake
    }

    pub fn outbound(&self) -> &GuardedQueue<PendingRequest, QUEUE_DEPTH> {
        &self.outbound
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Returns the attempt number that succeeded, or `None` once the
    /// budget is spent.  `response` holds the body of the successful call.
    async fn deliver(
        &self,
        http: &mut impl HttpClient,
        request: &PendingRequest,
        response: &mut Vec<u8>,
    ) -> Option<u8> {
        let call = HttpRequest {
            url: request.url(),
            body: request.body(),
            headers: JSON_HEADERS,
            timeout: self.http_timeout,
        };

        for attempt in 1..=self.retry.max_attempts {
            response.clear();
            match http.post(&call, &mut |chunk: &[u8]| response.extend_from_slice(chunk)) {
                Ok(()) => return Some(attempt),
                Err(e) => debug!(
                    "Requests: {} attempt {} failed — {}",
                    request.kind(),
                    attempt,
                    e
                ),
            }
            if attempt < self.retry.max_attempts {
                Timer::after(self.retry.delay).await;
            }
        }
        None
    }

    /// The single exit point of a formatted request.
    fn dispose(&self, request: PendingRequest, outcome: TerminalOutcome, sink: &dyn EventSink) {
        let kind = request.kind();
        drop(request);
        self.finish(kind, outcome, sink);
    }

    fn finish(&self, kind: RequestKind, outcome: TerminalOutcome, sink: &dyn EventSink) {
        self.stats.record(outcome);
        sink.emit(&NodeEvent::RequestFinished { kind, outcome });
    }
}
