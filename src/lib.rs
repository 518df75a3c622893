mod cancel;
mod channel;
mod chart;
mod controller;
mod error;
mod event;
mod monitor;
mod registry;
mod report;
mod stats;

pub use crate::cancel::CancelToken;
pub use crate::channel::{EventPublisher, EventSlot, Wait};
pub use crate::chart::ChartWriter;
pub use crate::controller::{ColorTrigger, LatencyController};
pub use crate::error::{LatencyError, ReportError};
pub use crate::event::{ColorChangeEvent, ParseColorError, Rgb, VideoTag, format_clock_ms};
pub use crate::monitor::LatencyMonitor;
pub use crate::registry::{LatencyRegistry, LatencySample, ViolationDetail};
pub use crate::report::{log_violations, read_csv, write_csv};
pub use crate::stats::LatencyStats;
