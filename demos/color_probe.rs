use chroma_latency::{CancelToken, EventPublisher, LatencyController, Rgb};
use clap::Parser;
use spdlog::prelude::*;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Simulates two color probes watching the same rendered signal and measures
/// the latency between them, then writes the reporting sinks.
#[derive(Parser)]
struct Args {
    /// Total measurement duration in seconds
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,

    /// Latency threshold in milliseconds
    #[arg(long, default_value_t = 120)]
    threshold_ms: u64,

    /// Ceiling of the simulated remote delay jitter, in milliseconds
    #[arg(long, default_value_t = 160)]
    max_jitter_ms: u64,

    /// Terminate on the first threshold violation
    #[arg(long)]
    fail_fast: bool,

    /// Write the samples as CSV to this path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Render the latency chart to this path
    #[arg(long)]
    chart: Option<PathBuf>,
}

const PALETTE: [Rgb; 4] = [
    Rgb::new(255, 0, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(0, 0, 255),
    Rgb::new(255, 255, 0),
];

const CADENCE: Duration = Duration::from_millis(200);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    info!("[ColorProbe] starting simulated color-probe measurement...");

    let mut controller = LatencyController::with_name("color-probe");
    controller.set_latency_threshold(Duration::from_millis(args.threshold_ms));
    controller.set_event_timeout(Duration::from_secs(5));
    controller.set_fail_fast(args.fail_fast);

    let epoch = Instant::now();

    controller.track_local(move |publisher: EventPublisher, cancel: CancelToken| {
        let mut step = 0usize;
        while !cancel.is_cancelled() {
            let ts = epoch.elapsed().as_millis() as i64;
            publisher.publish(PALETTE[step % PALETTE.len()], ts);
            step += 1;
            thread::sleep(CADENCE);
        }
    });

    let max_jitter = args.max_jitter_ms.max(1);
    controller.track_remote(move |publisher: EventPublisher, cancel: CancelToken| {
        let mut step = 0usize;
        thread::sleep(CADENCE / 2);
        while !cancel.is_cancelled() {
            // deterministic pseudo-jitter standing in for pipeline delay
            let jitter = (step.wrapping_mul(2_654_435_761) >> 7) as u64 % max_jitter;
            let ts = epoch.elapsed().as_millis() as i64 + jitter as i64;
            publisher.publish(PALETTE[step % PALETTE.len()], ts);
            step += 1;
            thread::sleep(CADENCE);
        }
    });

    match controller.check_latency(Duration::from_secs(args.duration_secs)) {
        Ok(()) => info!("[ColorProbe] measurement window elapsed"),
        Err(err) => error!("[ColorProbe] measurement failed: {}", err),
    }

    info!(
        "[ColorProbe] {} samples, {} violations",
        controller.registry().len(),
        controller.violation_count()
    );
    info!("[ColorProbe]{}", controller.registry().summary().format_stats());
    controller.log_violations();

    if let Some(path) = &args.csv {
        controller.write_csv(path)?;
        info!("[ColorProbe] csv written to {}", path.display());
    }
    if let Some(path) = &args.chart {
        controller.draw_chart(path, 1024, 600)?;
    }

    Ok(())
}
