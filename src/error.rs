use crate::registry::ViolationDetail;
use std::time::Duration;
use thiserror::Error;

/// Fatal conditions surfaced by [`LatencyController::check_latency`].
///
/// Every variant unwinds the run and leaves the registry in the partial
/// state it had accumulated; partial results stay inspectable.
///
/// [`LatencyController::check_latency`]: crate::LatencyController::check_latency
#[derive(Debug, Error)]
pub enum LatencyError {
    /// Measurement started without both source tags tracked.
    #[error("bad setup in latency controller '{name}': local and remote triggers must both be tracked")]
    Setup { name: String },

    /// No event observed on the LOCAL stream within the per-event timeout.
    #[error("change of color not detected in LOCAL stream after {0:?}")]
    LocalStreamTimeout(Duration),

    /// No event observed on the REMOTE stream within the per-event timeout.
    #[error("change of color not detected in REMOTE stream after {0:?}")]
    RemoteStreamTimeout(Duration),

    /// A sample exceeded the threshold while fail-fast was enabled.
    #[error("{0}")]
    ThresholdViolation(ViolationDetail),
}

/// Failures in the read-only reporting sinks (chart, CSV).
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chart encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("malformed csv line {line}: {reason}")]
    MalformedCsv { line: usize, reason: String },
}
