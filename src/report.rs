use crate::error::ReportError;
use crate::registry::LatencyRegistry;
use spdlog::debug;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Writes one `timestamp,latency_ms` line per sample, in insertion order.
pub fn write_csv(registry: &LatencyRegistry, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let mut out = String::new();
    for (remote_ts, sample) in registry.entries() {
        out.push_str(&format!("{},{}\n", remote_ts, sample.latency_ms()));
    }
    fs::write(path, out)?;
    Ok(())
}

/// Parses a file produced by [`write_csv`] back into
/// `(remote_timestamp, latency_ms)` pairs, preserving line order.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<(i64, i64)>, ReportError> {
    let content = fs::read_to_string(path)?;
    let mut pairs = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (ts, latency) = line.split_once(',').ok_or_else(|| ReportError::MalformedCsv {
            line: idx + 1,
            reason: "missing ',' separator".into(),
        })?;
        let field = |value: &str, what: &str| {
            value
                .trim()
                .parse::<i64>()
                .map_err(|e| ReportError::MalformedCsv {
                    line: idx + 1,
                    reason: format!("{what}: {e}"),
                })
        };
        pairs.push((field(ts, "timestamp")?, field(latency, "latency")?));
    }
    Ok(pairs)
}

/// Emits one human-readable line per violating sample plus a summary.
pub fn log_violations(registry: &LatencyRegistry, name: &str, threshold: Duration) {
    debug!("---------------------------------------------");
    debug!("LATENCY VIOLATIONS {}", name);
    debug!("---------------------------------------------");
    for sample in registry.samples() {
        if let Some(detail) = sample.violation() {
            debug!("{}", detail);
        }
    }
    debug!(
        "{} latency violations detected (threshold: {}ms)",
        registry.violation_count(),
        threshold.as_millis()
    );
    debug!("---------------------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Rgb;
    use crate::registry::LatencySample;

    fn registry() -> LatencyRegistry {
        let mut registry = LatencyRegistry::new();
        registry.insert(260, LatencySample::new(Rgb::new(0, 0, 255), 60, None));
        registry.insert(450, LatencySample::new(Rgb::new(0, 255, 0), 150, None));
        registry.insert(500, LatencySample::new(Rgb::new(9, 9, 9), -5, None));
        registry
    }

    #[test]
    fn test_csv_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latency.csv");

        let registry = registry();
        write_csv(&registry, &path).unwrap();

        let pairs = read_csv(&path).unwrap();
        assert_eq!(pairs, vec![(260, 60), (450, 150), (500, -5)]);
    }

    #[test]
    fn test_empty_registry_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        write_csv(&LatencyRegistry::new(), &path).unwrap();
        assert_eq!(read_csv(&path).unwrap(), vec![]);
    }

    #[test]
    fn test_malformed_line_is_reported_with_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "100,5\nnot-a-line\n").unwrap();

        let err = read_csv(&path).unwrap_err();
        assert!(matches!(err, ReportError::MalformedCsv { line: 2, .. }));
    }
}
