//! The assembled access node.
//!
//! [`Node`] owns every core component and exposes one `run_*` body per
//! firmware task.  Adapters are passed in by the caller, so the same
//! wiring runs on the board and against host mocks.
//!
//! ```text
//!  WiFi events ─▶ on_link_up/down ─▶ ConnectivityMonitor ─▶ reconnect
//!                                           │
//!  scheduler ──submit──▶ RequestPipeline ──▶ transmit ──▶ ResponseDispatch
//!      ▲                     ▲   │ failures: restart        │
//!      └─────────────────────┼───┘                          ▼
//!  keypad ──▶ CodeIntake ────┘                        DisplayPipeline
//!                                                           │ granted
//!  release button ISR ──claim──▶ ActuatorArbiter ◀──claim───┘
//!                                     │
//!                                     ▼
//!                               ActuatorLink ──▶ lock indicator
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_hal::digital::OutputPin;
use log::info;

use crate::access_code::{AccessCodeSlot, CodeIntake};
use crate::actuator::ActuatorLink;
use crate::app::events::NodeEvent;
use crate::app::ports::{ClockPort, DisplayTransport, EventSink, HttpClient, LinkPort, PeerTransport};
use crate::arbiter::ActuatorArbiter;
use crate::config::NodeConfig;
use crate::connectivity::{ConnectivityMonitor, ConnectivityState, ReconnectPolicy};
use crate::dispatch::ResponseDispatch;
use crate::display::DisplayPipeline;
use crate::drivers::status_led::LockIndicator;
use crate::error::Result;
use crate::pipeline::{FormatContext, RequestPipeline};
use crate::scheduler::{RequestScheduler, SchedulePeriods};

pub struct Node {
    config: NodeConfig,
    connectivity: ConnectivityMonitor,
    arbiter: ActuatorArbiter,
    scheduler: RequestScheduler,
    pipeline: RequestPipeline,
    display: DisplayPipeline,
    access_code: AccessCodeSlot,
    actuator: ActuatorLink,
    unlocked: Signal<CriticalSectionRawMutex, ()>,
}

impl Node {
    /// Validate `config` and build every component.  Nothing runs until
    /// [`start`](Self::start) and the `run_*` bodies are called.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            connectivity: ConnectivityMonitor::new(config.max_attempts),
            arbiter: ActuatorArbiter::new(),
            scheduler: RequestScheduler::new(SchedulePeriods::from_config(&config)),
            pipeline: RequestPipeline::new(&config),
            display: DisplayPipeline::new(&config)?,
            access_code: AccessCodeSlot::new(config.admission_wait()),
            actuator: ActuatorLink::new(&config),
            unlocked: Signal::new(),
            config,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn arbiter(&self) -> &ActuatorArbiter {
        &self.arbiter
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    pub fn display(&self) -> &DisplayPipeline {
        &self.display
    }

    pub fn access_code(&self) -> &AccessCodeSlot {
        &self.access_code
    }

    pub fn actuator(&self) -> &ActuatorLink {
        &self.actuator
    }

    pub fn unlocked(&self) -> &Signal<CriticalSectionRawMutex, ()> {
        &self.unlocked
    }

    pub fn intake(&self) -> CodeIntake<'_> {
        CodeIntake {
            slot: &self.access_code,
            connectivity: &self.connectivity,
            arbiter: &self.arbiter,
            pipeline: &self.pipeline,
            expected_len: self.config.access_code_len,
        }
    }

    pub fn dispatch(&self) -> ResponseDispatch<'_> {
        ResponseDispatch {
            scheduler: &self.scheduler,
            display: &self.display,
        }
    }

    pub fn format_context<'a>(&'a self, clock: &'a dyn ClockPort) -> FormatContext<'a> {
        FormatContext {
            clock,
            access_code: &self.access_code,
        }
    }

    // ── Link events ───────────────────────────────────────────

    pub fn on_link_up(&self, sink: &dyn EventSink) -> ConnectivityState {
        let state = self.connectivity.on_link_up();
        sink.emit(&NodeEvent::LinkChanged {
            linked: state.linked,
            consecutive_failures: state.consecutive_failures,
        });
        state
    }

    pub fn on_link_down(&self, sink: &dyn EventSink) -> ConnectivityState {
        let state = self.connectivity.on_link_down();
        sink.emit(&NodeEvent::LinkChanged {
            linked: state.linked,
            consecutive_failures: state.consecutive_failures,
        });
        state
    }

    /// Arm the request timers.
    pub fn start(&self, sink: &dyn EventSink) {
        self.scheduler.start();
        info!(
            "Node: started (backend {}, peer {})",
            self.config.backend_url,
            self.actuator.peer()
        );
        sink.emit(&NodeEvent::Started);
    }

    // ── Task bodies ───────────────────────────────────────────

    pub async fn run_scheduler(&self) {
        self.scheduler.run(&self.connectivity, &self.pipeline).await;
    }

    pub async fn run_formatter(&self, clock: &dyn ClockPort, sink: &dyn EventSink) {
        let ctx = self.format_context(clock);
        self.pipeline.run_formatter(&ctx, &self.scheduler, sink).await;
    }

    pub async fn run_transmitter(&self, http: &mut impl HttpClient, sink: &dyn EventSink) {
        let dispatch = self.dispatch();
        self.pipeline
            .run_transmitter(http, &dispatch, &self.scheduler, sink)
            .await;
    }

    pub async fn run_display(
        &self,
        out: &mut impl DisplayTransport,
        clock: &dyn ClockPort,
        sink: &dyn EventSink,
    ) {
        self.display.run(out, clock, &self.arbiter, sink).await;
    }

    pub async fn run_actuator(&self, transport: &impl PeerTransport, sink: &dyn EventSink) {
        self.actuator
            .run(transport, &self.arbiter, sink, &self.unlocked)
            .await;
    }

    pub async fn run_indicator<L: OutputPin, U: OutputPin>(&self, indicator: &mut LockIndicator<L, U>) {
        indicator.run(&self.unlocked, self.config.unlock_hold()).await;
    }

    pub async fn run_reconnect(&self, link: &mut impl LinkPort) {
        self.connectivity
            .run_reconnect(link, ReconnectPolicy::from_config(&self.config))
            .await;
    }
}
