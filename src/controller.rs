use crate::cancel::CancelToken;
use crate::channel::{EventPublisher, EventSlot, Wait};
use crate::chart::ChartWriter;
use crate::error::{LatencyError, ReportError};
use crate::event::{VideoTag, format_clock_ms};
use crate::monitor::LatencyMonitor;
use crate::registry::{LatencyRegistry, LatencySample, ViolationDetail};
use crate::report;
use spdlog::{debug, warn};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Sleep granularity of the watchdog thread, so it can notice an
/// early-finished run without oversleeping the full duration.
const WATCHDOG_SLICE: Duration = Duration::from_millis(20);

/// Active producer driving one source tag: detects color changes by
/// whatever means it likes and publishes them. Runs on its own thread until
/// the cancel token fires.
pub trait ColorTrigger: Send {
    fn run(&mut self, publisher: EventPublisher, cancel: CancelToken);
}

impl<F> ColorTrigger for F
where
    F: FnMut(EventPublisher, CancelToken) + Send,
{
    fn run(&mut self, publisher: EventPublisher, cancel: CancelToken) {
        self(publisher, cancel)
    }
}

/// Pairs LOCAL and REMOTE color-change events into latency samples and
/// evaluates them against a threshold.
///
/// Two producer threads publish into per-tag [`EventSlot`]s; the thread
/// calling [`check_latency`] consumes them in strict alternation. A watchdog
/// bounds the total run time through cooperative cancellation.
///
/// [`check_latency`]: LatencyController::check_latency
pub struct LatencyController {
    name: Option<String>,
    latency_threshold: Duration,
    event_timeout: Duration,
    fail_fast: bool,
    local: Arc<EventSlot>,
    remote: Arc<EventSlot>,
    local_tracked: bool,
    remote_tracked: bool,
    trigger_cancel: CancelToken,
    monitor: Option<Box<dyn LatencyMonitor>>,
    registry: LatencyRegistry,
}

impl LatencyController {
    pub fn new() -> Self {
        Self {
            name: None,
            // Defaults: 3s threshold, 30s per-event timeout, warn on violation
            latency_threshold: Duration::from_millis(3000),
            event_timeout: Duration::from_secs(30),
            fail_fast: false,
            local: Arc::new(EventSlot::new(VideoTag::Local)),
            remote: Arc::new(EventSlot::new(VideoTag::Remote)),
            local_tracked: false,
            remote_tracked: false,
            trigger_cancel: CancelToken::new(),
            monitor: None,
            registry: LatencyRegistry::new(),
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        let mut controller = Self::new();
        controller.name = Some(name.into());
        controller
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn latency_threshold(&self) -> Duration {
        self.latency_threshold
    }

    /// Only safe before [`check_latency`] starts; single-writer assumption,
    /// not enforced.
    ///
    /// [`check_latency`]: LatencyController::check_latency
    pub fn set_latency_threshold(&mut self, threshold: Duration) {
        self.latency_threshold = threshold;
    }

    pub fn event_timeout(&self) -> Duration {
        self.event_timeout
    }

    pub fn set_event_timeout(&mut self, timeout: Duration) {
        self.event_timeout = timeout;
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn set_fail_fast(&mut self, fail_fast: bool) {
        self.fail_fast = fail_fast;
    }

    pub fn set_monitor(&mut self, monitor: Box<dyn LatencyMonitor>) {
        self.monitor = Some(monitor);
    }

    /// Registers the trigger for one source tag and starts its producer
    /// thread. The thread is detached; it is asked to stop through the
    /// shared cancel token when measurement ends, but never awaited.
    pub fn track(&mut self, tag: VideoTag, mut trigger: impl ColorTrigger + 'static) {
        let slot = match tag {
            VideoTag::Local => {
                self.local_tracked = true;
                self.local.clone()
            }
            VideoTag::Remote => {
                self.remote_tracked = true;
                self.remote.clone()
            }
        };
        let publisher = EventPublisher::new(slot);
        let cancel = self.trigger_cancel.clone();
        thread::spawn(move || trigger.run(publisher, cancel));
    }

    pub fn track_local(&mut self, trigger: impl ColorTrigger + 'static) {
        self.track(VideoTag::Local, trigger);
    }

    pub fn track_remote(&mut self, trigger: impl ColorTrigger + 'static) {
        self.track(VideoTag::Remote, trigger);
    }

    /// Runs the measurement loop on the calling thread for at most `total`.
    ///
    /// Returns `Ok(())` when the watchdog cancels the run; fails with
    /// [`LatencyError::LocalStreamTimeout`] / [`RemoteStreamTimeout`] when a
    /// stream goes quiet, and with [`ThresholdViolation`] when fail-fast is
    /// enabled and a sample exceeds the threshold. The registry keeps
    /// whatever it accumulated on every exit path.
    ///
    /// [`RemoteStreamTimeout`]: LatencyError::RemoteStreamTimeout
    /// [`ThresholdViolation`]: LatencyError::ThresholdViolation
    pub fn check_latency(&mut self, total: Duration) -> Result<(), LatencyError> {
        if !self.local_tracked || !self.remote_tracked {
            return Err(LatencyError::Setup {
                name: self.name().to_owned(),
            });
        }

        let run_cancel = CancelToken::new();
        let watchdog_stop = CancelToken::new();
        spawn_watchdog(total, run_cancel.clone(), watchdog_stop.clone());

        let result = self.matching_loop(&run_cancel);

        watchdog_stop.cancel();
        self.trigger_cancel.cancel();
        result
    }

    fn matching_loop(&mut self, run_cancel: &CancelToken) -> Result<(), LatencyError> {
        let mut first_pair = true;

        loop {
            let (local_color, local_ts) =
                match self.local.wait_next(self.event_timeout, run_cancel) {
                    Wait::Available {
                        color,
                        timestamp_ms,
                    } => (color, timestamp_ms),
                    Wait::TimedOut => {
                        return Err(LatencyError::LocalStreamTimeout(self.event_timeout));
                    }
                    Wait::Cancelled => return Ok(()),
                };

            let (remote_color, remote_ts) =
                match self.remote.wait_next(self.event_timeout, run_cancel) {
                    Wait::Available {
                        color,
                        timestamp_ms,
                    } => (color, timestamp_ms),
                    Wait::TimedOut => {
                        return Err(LatencyError::RemoteStreamTimeout(self.event_timeout));
                    }
                    Wait::Cancelled => return Ok(()),
                };

            if first_pair {
                // The first color state has no predecessor to compare with.
                first_pair = false;
                debug!("{}baseline pair observed, no sample", self.msg_prefix());
                continue;
            }

            if local_color != remote_color {
                continue;
            }

            let latency_ms = remote_ts - local_ts;
            if let Some(monitor) = &self.monitor {
                monitor.set_current_latency(latency_ms);
            }

            let threshold_ms = self.latency_threshold.as_millis() as i64;
            let violation = (latency_ms > threshold_ms).then(|| ViolationDetail {
                latency_ms,
                threshold: self.latency_threshold,
                local_time: format_clock_ms(local_ts),
                remote_time: format_clock_ms(remote_ts),
            });

            match violation {
                Some(detail) if self.fail_fast => {
                    self.registry.insert(
                        remote_ts,
                        LatencySample::new(local_color, latency_ms, Some(detail.clone())),
                    );
                    return Err(LatencyError::ThresholdViolation(detail));
                }
                Some(detail) => {
                    warn!("{}{}", self.msg_prefix(), detail);
                    self.registry.insert(
                        remote_ts,
                        LatencySample::new(local_color, latency_ms, Some(detail)),
                    );
                }
                None => {
                    self.registry
                        .insert(remote_ts, LatencySample::new(local_color, latency_ms, None));
                }
            }
        }
    }

    pub fn registry(&self) -> &LatencyRegistry {
        &self.registry
    }

    pub fn samples(&self) -> impl Iterator<Item = &LatencySample> {
        self.registry.samples()
    }

    pub fn violation_count(&self) -> usize {
        self.registry.violation_count()
    }

    /// Renders the latency chart for the accumulated samples.
    pub fn draw_chart(
        &self,
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
    ) -> Result<(), ReportError> {
        ChartWriter::new(self.name()).draw(&self.registry, path, width, height)
    }

    /// Writes one `timestamp,latency_ms` line per sample in insertion order.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        report::write_csv(&self.registry, path)
    }

    /// Logs one line per violating sample plus a count/threshold summary.
    pub fn log_violations(&self) {
        report::log_violations(&self.registry, self.name(), self.latency_threshold);
    }

    fn msg_prefix(&self) -> String {
        match &self.name {
            Some(name) => format!("[{}] ", name),
            None => String::new(),
        }
    }
}

impl Default for LatencyController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LatencyController {
    fn drop(&mut self) {
        self.trigger_cancel.cancel();
    }
}

fn spawn_watchdog(total: Duration, run_cancel: CancelToken, stop: CancelToken) {
    thread::spawn(move || {
        let deadline = Instant::now() + total;
        loop {
            if stop.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                run_cancel.cancel();
                return;
            }
            thread::sleep(WATCHDOG_SLICE.min(deadline - now));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let controller = LatencyController::new();
        assert_eq!(controller.latency_threshold(), Duration::from_millis(3000));
        assert_eq!(controller.event_timeout(), Duration::from_secs(30));
        assert!(!controller.fail_fast());
        assert_eq!(controller.name(), "");
    }

    #[test]
    fn test_setup_error_without_triggers() {
        let mut controller = LatencyController::with_name("e2e");
        let err = controller.check_latency(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, LatencyError::Setup { ref name } if name == "e2e"));
    }

    #[test]
    fn test_setup_error_with_only_local() {
        let mut controller = LatencyController::new();
        controller.track_local(|_publisher: EventPublisher, _cancel: CancelToken| {});
        let err = controller.check_latency(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, LatencyError::Setup { .. }));
    }
}
