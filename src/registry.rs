use crate::event::Rgb;
use crate::stats::{LatencyStats, summarize};
use fxhash::FxHashMap;
use std::fmt;
use std::time::Duration;

/// Record of one latency sample exceeding the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationDetail {
    /// Observed latency, as computed (may be negative).
    pub latency_ms: i64,
    /// Threshold in force when the sample was taken.
    pub threshold: Duration,
    /// Local event time, formatted `mm:ss.SSS`.
    pub local_time: String,
    /// Remote event time, formatted `mm:ss.SSS`.
    pub remote_time: String,
}

impl fmt::Display for ViolationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "latency of {}ms exceeds the threshold of {}ms (local change at {}, remote change at {})",
            self.latency_ms,
            self.threshold.as_millis(),
            self.local_time,
            self.remote_time,
        )
    }
}

/// One measured delay between a matched LOCAL/REMOTE color-change pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySample {
    color: Rgb,
    latency_ms: i64,
    violation: Option<ViolationDetail>,
}

impl LatencySample {
    pub(crate) fn new(color: Rgb, latency_ms: i64, violation: Option<ViolationDetail>) -> Self {
        Self {
            color,
            latency_ms,
            violation,
        }
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn latency_ms(&self) -> i64 {
        self.latency_ms
    }

    pub fn violates_threshold(&self) -> bool {
        self.violation.is_some()
    }

    pub fn violation(&self) -> Option<&ViolationDetail> {
        self.violation.as_ref()
    }
}

/// Insertion-ordered store of latency samples keyed by the remote event's
/// timestamp. Only the controller writes; sinks read.
#[derive(Default)]
pub struct LatencyRegistry {
    entries: Vec<(i64, LatencySample)>,
    by_remote_ts: FxHashMap<i64, usize>,
}

impl LatencyRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a sample keyed by remote timestamp. Remote timestamps are
    /// assumed unique; on a duplicate key the sample is replaced in place,
    /// keeping the original position in iteration order.
    pub(crate) fn insert(&mut self, remote_ts: i64, sample: LatencySample) {
        if let Some(&at) = self.by_remote_ts.get(&remote_ts) {
            self.entries[at] = (remote_ts, sample);
        } else {
            self.by_remote_ts.insert(remote_ts, self.entries.len());
            self.entries.push((remote_ts, sample));
        }
    }

    /// Recorded samples in insertion order. The iterator is restartable:
    /// each call walks the registry from the beginning.
    pub fn samples(&self) -> impl Iterator<Item = &LatencySample> {
        self.entries.iter().map(|(_, sample)| sample)
    }

    /// `(remote_timestamp, sample)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (i64, &LatencySample)> {
        self.entries.iter().map(|(ts, sample)| (*ts, sample))
    }

    pub fn get(&self, remote_ts: i64) -> Option<&LatencySample> {
        self.by_remote_ts
            .get(&remote_ts)
            .map(|&at| &self.entries[at].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn violation_count(&self) -> usize {
        self.samples().filter(|s| s.violates_threshold()).count()
    }

    pub fn summary(&self) -> LatencyStats {
        summarize(self.samples().map(LatencySample::latency_ms))
    }
}
