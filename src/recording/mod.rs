//! Audio recording feature for babble.
//!
//! Provides microphone capture, the session controller, real-time waveform
//! rendering, and the terminal interface for the recording workflow.

pub(crate) mod alsa;
pub mod capture;
pub mod controller;
pub mod ui;
pub mod waveform;

pub use capture::{AudioCaptureService, CaptureError};
pub use controller::{Intent, RecorderController};
pub use ui::{RecorderCommand, RecorderTui};
