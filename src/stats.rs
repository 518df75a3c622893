use hdrhistogram::Histogram;

// Range: 1ms to one hour, 3 significant figures.
const MAX_TRACKABLE_MS: u64 = 3_600_000;

/// Percentile summary over recorded latency samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyStats {
    /// Total number of samples.
    pub count: u64,
    /// Minimum latency in milliseconds.
    pub min: u64,
    /// Maximum latency in milliseconds.
    pub max: u64,
    /// Mean latency in milliseconds.
    pub mean: f64,
    /// 50th percentile (median) latency in milliseconds.
    pub p50: u64,
    /// 90th percentile latency in milliseconds.
    pub p90: u64,
    /// 99th percentile latency in milliseconds.
    pub p99: u64,
}

impl LatencyStats {
    pub fn format_stats(&self) -> String {
        if self.count == 0 {
            return "No samples recorded yet".into();
        }
        format!(
            "\tcount={},\tmin={}ms,\tmax={}ms,\tmean={:.1}ms,\tp50={}ms,\tp90={}ms,\tp99={}ms",
            self.count, self.min, self.max, self.mean, self.p50, self.p90, self.p99,
        )
    }
}

/// Builds a percentile summary from millisecond latencies. Values are
/// clamped into the histogram bounds, so negative or zero latencies count
/// against the 1ms floor.
pub(crate) fn summarize(latencies_ms: impl Iterator<Item = i64>) -> LatencyStats {
    let mut histogram = Histogram::<u64>::new_with_bounds(1, MAX_TRACKABLE_MS, 3).unwrap();
    for latency_ms in latencies_ms {
        let clamped = (latency_ms.max(0) as u64).clamp(1, MAX_TRACKABLE_MS);
        histogram.record(clamped).unwrap();
    }

    let count = histogram.len();
    if count == 0 {
        return LatencyStats::default();
    }

    LatencyStats {
        count,
        min: histogram.min(),
        max: histogram.max(),
        mean: histogram.mean(),
        p50: histogram.value_at_quantile(0.5),
        p90: histogram.value_at_quantile(0.9),
        p99: histogram.value_at_quantile(0.99),
    }
}
