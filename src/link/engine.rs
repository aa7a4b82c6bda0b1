//! Network worker loop.
//!
//! Each poll does two things, in this order:
//!
//! 1. publish a telemetry report if the report interval has elapsed or a
//!    publish-now request is pending (the request is consumed either way);
//! 2. drain queued inbound payloads into the supervisor.
//!
//! The supervisor is driven from this thread only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, LinkPort, WorkerLauncher};
use crate::app::service::Supervisor;
use crate::config::SystemConfig;
use crate::state::SharedState;

use super::inbox::INBOX_DEPTH;
use super::report::format_report;

/// What one poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub published: bool,
    pub commands: usize,
}

pub struct LinkEngine<P: LinkPort> {
    link: P,
    shared: Arc<SharedState>,
    report_interval: Duration,
    last_report: Option<Instant>,
}

impl<P: LinkPort> LinkEngine<P> {
    pub fn new(link: P, shared: Arc<SharedState>, config: &SystemConfig) -> Self {
        Self {
            link,
            shared,
            report_interval: Duration::from_millis(config.report_interval_ms.into()),
            last_report: None,
        }
    }

    /// One network cycle at time `now`. The first poll always reports.
    pub fn poll<L: WorkerLauncher>(
        &mut self,
        now: Instant,
        supervisor: &mut Supervisor<L>,
        sink: &mut impl EventSink,
    ) -> PollSummary {
        let mut summary = PollSummary::default();

        let forced = self.shared.telemetry.take_publish_request();
        let due = self
            .last_report
            .is_none_or(|last| now.saturating_duration_since(last) >= self.report_interval);
        if forced || due {
            self.publish_report(forced, sink);
            self.last_report = Some(now);
            summary.published = true;
        }

        // Bounded so a flood of commands cannot starve reporting.
        for _ in 0..INBOX_DEPTH {
            let Some(msg) = self.link.try_receive() else {
                break;
            };
            let _ = supervisor.handle_payload(msg.as_bytes(), sink);
            summary.commands += 1;
        }

        summary
    }

    /// Poll every `period` until `stop` is raised, calling `on_cycle` after
    /// each poll (watchdog feed).
    pub fn run<L: WorkerLauncher>(
        &mut self,
        supervisor: &mut Supervisor<L>,
        sink: &mut impl EventSink,
        period: Duration,
        stop: &AtomicBool,
        mut on_cycle: impl FnMut(),
    ) {
        info!("Link engine running (poll {:?}, report {:?})", period, self.report_interval);
        while !stop.load(Ordering::Acquire) {
            self.poll(Instant::now(), supervisor, sink);
            on_cycle();
            std::thread::sleep(period);
        }
        info!("Link engine stopped");
    }

    pub fn link(&self) -> &P {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut P {
        &mut self.link
    }

    fn publish_report(&mut self, forced: bool, sink: &mut impl EventSink) {
        let readings = self.shared.telemetry.snapshot();
        let payload = format_report(&readings);
        match self.link.publish(payload.as_bytes()) {
            Ok(()) => {
                debug!("Published: {}", payload);
                sink.emit(&AppEvent::ReportPublished {
                    bytes: payload.len(),
                    forced,
                });
            }
            Err(e) => {
                warn!("Report publish failed: {}", e);
                sink.emit(&AppEvent::ReportFailed(e));
            }
        }
    }
}
