//! Network worker: inbound command queue, telemetry report encoding and the
//! poll loop that ties them to the supervisor.

pub mod engine;
pub mod inbox;
pub mod report;

pub use engine::{LinkEngine, PollSummary};
pub use inbox::{InboundMessage, Inbox};
pub use report::format_report;
