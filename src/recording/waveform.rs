//! Time-domain waveform rendering.
//!
//! The renderer runs only while the session is recording. Each due frame it
//! reads whatever the analysis tap currently holds, maps every byte to a
//! vertical offset proportional to its deviation from the midpoint, and
//! rebuilds a connected polyline spanning the canvas width. The frame clock
//! is an owned handle; dropping it is the only way frames stop, so no stale
//! frame can fire after `stop()` returns.

use crate::recording::capture::{AnalysisTap, TAP_MIDPOINT};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Logical canvas width in drawing units.
pub const CANVAS_WIDTH: f64 = 800.0;

/// Logical canvas height in drawing units.
pub const CANVAS_HEIGHT: f64 = 200.0;

/// Target interval between waveform frames (~30 fps).
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Errors surfaced when starting the render loop.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No drawing surface exists; rendering must not start
    #[error("render surface unavailable")]
    SurfaceUnavailable,
}

/// Frame-scheduling token. Exists only while the renderer is active.
struct RenderLoopHandle {
    next_frame: Instant,
}

/// Per-frame waveform renderer over a live analysis tap.
pub struct WaveformRenderer {
    width: f64,
    height: f64,
    tap: Option<AnalysisTap>,
    frame: Option<RenderLoopHandle>,
    trace: Vec<(f64, f64)>,
}

impl WaveformRenderer {
    /// Creates a renderer for the default 800×200 canvas.
    pub fn new() -> Self {
        Self::with_surface(CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    /// Creates a renderer for a canvas of the given logical size.
    pub fn with_surface(width: f64, height: f64) -> Self {
        WaveformRenderer {
            width,
            height,
            tap: None,
            frame: None,
            trace: Vec::new(),
        }
    }

    /// Arms the frame clock on the given tap. Restartable.
    ///
    /// # Errors
    /// - [`RenderError::SurfaceUnavailable`] if the canvas has no area;
    ///   recording itself is unaffected by this failure
    pub fn start(&mut self, tap: AnalysisTap) -> Result<(), RenderError> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(RenderError::SurfaceUnavailable);
        }
        self.tap = Some(tap);
        self.trace.clear();
        self.frame = Some(RenderLoopHandle {
            next_frame: Instant::now(),
        });
        tracing::debug!("Waveform render loop started");
        Ok(())
    }

    /// Cancels the frame clock and clears the trace. Idempotent.
    ///
    /// After this returns, `tick` produces no further frames until the
    /// renderer is started again.
    pub fn stop(&mut self) {
        if self.frame.take().is_some() {
            tracing::debug!("Waveform render loop stopped");
        }
        self.tap = None;
        self.trace.clear();
    }

    /// Whether the render loop is currently armed.
    pub fn is_active(&self) -> bool {
        self.frame.is_some()
    }

    /// Advances the render loop: when a frame is due, rebuilds the trace
    /// from the tap and re-arms the clock.
    ///
    /// Returns true when a frame was drawn. Never blocks waiting for
    /// samples; an empty tap draws nothing but keeps the loop alive.
    pub fn tick(&mut self, now: Instant) -> bool {
        let (Some(frame), Some(tap)) = (self.frame.as_mut(), self.tap.as_ref()) else {
            return false;
        };
        if now < frame.next_frame {
            return false;
        }
        frame.next_frame = now + FRAME_INTERVAL;

        self.trace = trace_from_snapshot(&tap.snapshot(), self.width, self.height);
        true
    }

    /// The polyline last produced by `tick`, in canvas coordinates.
    pub fn trace(&self) -> &[(f64, f64)] {
        &self.trace
    }
}

impl Default for WaveformRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a byte time-domain snapshot onto a connected polyline.
///
/// Each value is scaled relative to the midpoint so silence sits on the
/// horizontal center line; the path is anchored back to the midline at the
/// right edge. An empty snapshot yields an empty path.
fn trace_from_snapshot(snapshot: &[u8], width: f64, height: f64) -> Vec<(f64, f64)> {
    if snapshot.is_empty() {
        return Vec::new();
    }

    let midline = height / 2.0;
    let slice_width = width / snapshot.len() as f64;

    let mut points: Vec<(f64, f64)> = snapshot
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let v = f64::from(value) / f64::from(TAP_MIDPOINT);
            (i as f64 * slice_width, v * midline)
        })
        .collect();
    points.push((width, midline));
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tap_with(samples: &[i16]) -> AnalysisTap {
        let tap = AnalysisTap::new();
        tap.push(samples);
        tap
    }

    #[test]
    fn silence_traces_the_center_line() {
        let trace = trace_from_snapshot(&[128, 128, 128, 128], 800.0, 200.0);
        assert_eq!(trace.len(), 5);
        for &(_, y) in &trace {
            assert!((y - 100.0).abs() < 1e-9);
        }
        assert_eq!(*trace.last().unwrap(), (800.0, 100.0));
    }

    #[test]
    fn offsets_are_proportional_to_deviation_from_midpoint() {
        let trace = trace_from_snapshot(&[0, 128, 255], 800.0, 200.0);
        assert!((trace[0].1 - 0.0).abs() < 1e-9);
        assert!((trace[1].1 - 100.0).abs() < 1e-9);
        assert!(trace[2].1 > 195.0);
    }

    #[test]
    fn empty_snapshot_draws_nothing() {
        assert!(trace_from_snapshot(&[], 800.0, 200.0).is_empty());
    }

    #[test]
    fn points_span_the_visible_width() {
        let trace = trace_from_snapshot(&[128; 100], 800.0, 200.0);
        assert!((trace[0].0 - 0.0).abs() < 1e-9);
        assert_eq!(trace.last().unwrap().0, 800.0);
    }

    #[test]
    fn stop_twice_is_safe() {
        let mut renderer = WaveformRenderer::new();
        renderer.stop();
        renderer.stop();
        assert!(!renderer.is_active());

        renderer.start(tap_with(&[0, 0, 0])).unwrap();
        renderer.stop();
        renderer.stop();
        assert!(!renderer.is_active());
    }

    #[test]
    fn no_frame_fires_after_stop() {
        let mut renderer = WaveformRenderer::new();
        renderer.start(tap_with(&[1000, -1000])).unwrap();
        assert!(renderer.tick(Instant::now()));
        assert!(!renderer.trace().is_empty());

        renderer.stop();
        assert!(!renderer.tick(Instant::now() + Duration::from_secs(1)));
        assert!(renderer.trace().is_empty());
    }

    #[test]
    fn frames_are_paced_by_the_clock() {
        let mut renderer = WaveformRenderer::new();
        renderer.start(tap_with(&[500])).unwrap();

        let now = Instant::now();
        assert!(renderer.tick(now));
        // The next frame is not due until the interval elapses.
        assert!(!renderer.tick(now + Duration::from_millis(1)));
        assert!(renderer.tick(now + FRAME_INTERVAL + Duration::from_millis(1)));
    }

    #[test]
    fn renderer_is_restartable() {
        let mut renderer = WaveformRenderer::new();
        renderer.start(tap_with(&[1000])).unwrap();
        assert!(renderer.tick(Instant::now()));
        renderer.stop();

        renderer.start(tap_with(&[2000])).unwrap();
        assert!(renderer.is_active());
        assert!(renderer.tick(Instant::now()));
    }

    #[test]
    fn zero_sized_surface_refuses_to_start() {
        let mut renderer = WaveformRenderer::with_surface(0.0, 0.0);
        let err = renderer.start(tap_with(&[0])).unwrap_err();
        assert!(matches!(err, RenderError::SurfaceUnavailable));
        assert!(!renderer.is_active());
    }

    #[test]
    fn empty_tap_keeps_the_loop_alive() {
        let mut renderer = WaveformRenderer::new();
        renderer.start(AnalysisTap::new()).unwrap();
        assert!(renderer.tick(Instant::now()));
        assert!(renderer.trace().is_empty());
        assert!(renderer.is_active());
    }
}
