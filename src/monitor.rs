/// Optional live-metrics sink. The controller reports the latency of every
/// matched equal-color pair; nothing flows back into the measurement loop.
pub trait LatencyMonitor: Send {
    fn set_current_latency(&self, latency_ms: i64);
}
