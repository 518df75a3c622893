use crate::error::ReportError;
use crate::registry::LatencyRegistry;
use image::{Rgb as Pixel, RgbImage};
use spdlog::info;
use std::path::Path;

const MARGIN: u32 = 40;

const BACKGROUND: Pixel<u8> = Pixel([255, 255, 255]);
const AXIS: Pixel<u8> = Pixel([80, 80, 80]);
const ZERO_LINE: Pixel<u8> = Pixel([200, 200, 200]);
const SERIES: Pixel<u8> = Pixel([120, 150, 200]);
const POINT_OK: Pixel<u8> = Pixel([30, 80, 200]);
const POINT_VIOLATION: Pixel<u8> = Pixel([210, 40, 40]);

/// Renders the registry as a latency-over-time chart image: one data point
/// per sample, x = remote timestamp, y = latency, violations in red.
pub struct ChartWriter {
    name: String,
}

impl ChartWriter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn draw(
        &self,
        registry: &LatencyRegistry,
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
    ) -> Result<(), ReportError> {
        let path = path.as_ref();
        let mut canvas = RgbImage::from_pixel(width.max(2 * MARGIN), height.max(2 * MARGIN), BACKGROUND);
        let (width, height) = canvas.dimensions();

        let points: Vec<(i64, i64, bool)> = registry
            .entries()
            .map(|(ts, sample)| (ts, sample.latency_ms(), sample.violates_threshold()))
            .collect();

        draw_frame(&mut canvas, width, height);

        if !points.is_empty() {
            let (x_min, x_max) = expand_range(
                points.iter().map(|p| p.0).min().unwrap_or(0),
                points.iter().map(|p| p.0).max().unwrap_or(0),
            );
            // The y-range always spans zero so negative latencies stay visible.
            let (y_min, y_max) = expand_range(
                points.iter().map(|p| p.1).min().unwrap_or(0).min(0),
                points.iter().map(|p| p.1).max().unwrap_or(0).max(0),
            );

            let to_px = |ts: i64, latency: i64| -> (u32, u32) {
                let x_span = (x_max - x_min) as f64;
                let y_span = (y_max - y_min) as f64;
                let x = MARGIN as f64
                    + (ts - x_min) as f64 / x_span * (width - 2 * MARGIN) as f64;
                let y = (height - MARGIN) as f64
                    - (latency - y_min) as f64 / y_span * (height - 2 * MARGIN) as f64;
                (x as u32, y as u32)
            };

            if y_min < 0 {
                let (_, zero_y) = to_px(x_min, 0);
                draw_line(&mut canvas, (MARGIN, zero_y), (width - MARGIN, zero_y), ZERO_LINE);
            }

            for pair in points.windows(2) {
                let from = to_px(pair[0].0, pair[0].1);
                let to = to_px(pair[1].0, pair[1].1);
                draw_line(&mut canvas, from, to, SERIES);
            }

            for &(ts, latency, violates) in &points {
                let color = if violates { POINT_VIOLATION } else { POINT_OK };
                draw_point(&mut canvas, to_px(ts, latency), color);
            }
        }

        canvas.save(path)?;
        info!(
            "[{}] latency chart with {} samples written to {}",
            self.name,
            points.len(),
            path.display()
        );
        Ok(())
    }
}

fn expand_range(min: i64, max: i64) -> (i64, i64) {
    if min == max { (min - 1, max + 1) } else { (min, max) }
}

fn draw_frame(canvas: &mut RgbImage, width: u32, height: u32) {
    draw_line(canvas, (MARGIN, MARGIN), (MARGIN, height - MARGIN), AXIS);
    draw_line(
        canvas,
        (MARGIN, height - MARGIN),
        (width - MARGIN, height - MARGIN),
        AXIS,
    );
}

fn draw_point(canvas: &mut RgbImage, (x, y): (u32, u32), color: Pixel<u8>) {
    for dx in -1i64..=1 {
        for dy in -1i64..=1 {
            let px = x as i64 + dx;
            let py = y as i64 + dy;
            if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height() {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

fn draw_line(canvas: &mut RgbImage, from: (u32, u32), to: (u32, u32), color: Pixel<u8>) {
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (x1, y1) = (to.0 as f64, to.1 as f64);
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil() as u32;
    for i in 0..=steps {
        let t = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
        let x = (x0 + (x1 - x0) * t) as u32;
        let y = (y0 + (y1 - y0) * t) as u32;
        if x < canvas.width() && y < canvas.height() {
            canvas.put_pixel(x, y, color);
        }
    }
}
