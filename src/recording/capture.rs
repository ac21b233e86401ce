//! Microphone acquisition and audio capture.
//!
//! This module owns the live input stream. A successful access request yields
//! a [`CaptureHandle`] carrying two views over the same stream: an analysis
//! tap (a bounded ring of the most recent samples, read by the waveform
//! renderer) and a recording sink (an append-only buffer gated by an active
//! flag, finalized into a [`Clip`] when capture stops). Audio is captured from
//! the configured input device at its native sample rate and downmixed to
//! mono by averaging channels.

use crate::recording::alsa::with_muted_stderr;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavWriter;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Number of recent samples the analysis tap retains for visualization.
pub const TAP_WINDOW: usize = 1024;

/// Midpoint of the tap's byte range, representing zero amplitude.
pub const TAP_MIDPOINT: u8 = 128;

/// Errors surfaced while acquiring or starting capture.
///
/// The three kinds have distinct recovery paths: permission and device
/// failures leave the session in Idle for the user to retry, while a capture
/// start failure drives an already-running session back to Idle.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Access to the microphone was denied or blocked
    #[error("microphone access denied: {0}")]
    Permission(String),
    /// No input device is available or the hardware failed
    #[error("audio device unavailable: {0}")]
    Device(String),
    /// The device became unavailable between access grant and capture start
    #[error("capture failed to start: {0}")]
    CaptureStart(String),
}

/// Read-only view of the most recent time-domain samples.
///
/// Snapshots are unsigned 8-bit values centered at [`TAP_MIDPOINT`], the
/// renderer's input format. Cloning shares the underlying ring.
#[derive(Clone)]
pub struct AnalysisTap {
    ring: Arc<Mutex<VecDeque<i16>>>,
}

impl AnalysisTap {
    pub(crate) fn new() -> Self {
        AnalysisTap {
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(TAP_WINDOW))),
        }
    }

    /// Appends mono samples, discarding the oldest beyond [`TAP_WINDOW`].
    pub(crate) fn push(&self, samples: &[i16]) {
        let mut ring = self.ring.lock().unwrap();
        for &sample in samples {
            if ring.len() == TAP_WINDOW {
                ring.pop_front();
            }
            ring.push_back(sample);
        }
    }

    /// Returns the current window as bytes centered at [`TAP_MIDPOINT`].
    ///
    /// Yields fewer than [`TAP_WINDOW`] values (possibly none) when little
    /// audio has arrived yet; never blocks waiting for samples.
    pub fn snapshot(&self) -> Vec<u8> {
        let ring = self.ring.lock().unwrap();
        ring.iter()
            .map(|&sample| (((sample >> 8) as i32) + i32::from(TAP_MIDPOINT)) as u8)
            .collect()
    }
}

/// Append-only sample buffer written by the stream callback while active.
#[derive(Clone)]
struct RecordingSink {
    samples: Arc<Mutex<Vec<i16>>>,
    active: Arc<AtomicBool>,
}

impl RecordingSink {
    fn new() -> Self {
        RecordingSink {
            samples: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// The live microphone connection and in-progress recorded buffer.
///
/// Exists from a successful [`AudioCaptureService::request_access`] until
/// [`AudioCaptureService::release`]. The analysis tap is live for the whole
/// lifetime of the handle; the recording sink only fills between capture
/// start and stop.
pub struct CaptureHandle {
    stream: Option<cpal::Stream>,
    tap: AnalysisTap,
    sink: RecordingSink,
    failed: Arc<AtomicBool>,
    sample_rate: u32,
    capturing: bool,
}

impl CaptureHandle {
    /// Returns a shared view of the analysis tap.
    pub fn tap(&self) -> AnalysisTap {
        self.tap.clone()
    }

    /// Duration of the audio buffered in the current recording segment.
    pub fn recorded_duration(&self) -> Duration {
        let samples = self.sink.samples.lock().unwrap().len();
        Duration::from_secs_f64(samples as f64 / f64::from(self.sample_rate))
    }
}

/// Finalized, immutable recorded audio artifact.
#[derive(Debug, Clone)]
pub struct Clip {
    /// WAV-encoded bytes (16-bit PCM mono)
    pub wav: Vec<u8>,
    /// Length of the recorded audio
    pub duration: Duration,
    /// Sample rate the clip was captured at
    pub sample_rate: u32,
}

/// Acquires the microphone and orchestrates capture start/stop.
///
/// Holds only configuration; all per-connection state lives in the
/// [`CaptureHandle`] it hands out.
pub struct AudioCaptureService {
    device_name: String,
    requested_sample_rate: u32,
}

impl AudioCaptureService {
    /// Creates a capture service for the given device and sample rate.
    ///
    /// `device_name` accepts "default", a device name, or a numeric index as
    /// printed by `babble list-devices`. The actual rate may differ from the
    /// requested one based on device capabilities.
    pub fn new(requested_sample_rate: u32, device_name: String) -> Self {
        AudioCaptureService {
            device_name,
            requested_sample_rate,
        }
    }

    /// Requests microphone access and opens the live input stream.
    ///
    /// On success the returned handle's analysis tap is immediately live;
    /// the recording sink stays inactive until [`Self::start_capture`]. On
    /// failure no handle exists and the session must not change stage.
    ///
    /// # Errors
    /// - [`CaptureError::Permission`] if access was denied or blocked
    /// - [`CaptureError::Device`] if no device is available or configuration fails
    pub async fn request_access(&self) -> Result<CaptureHandle, CaptureError> {
        // Acquire the device with ALSA warnings muted
        let device = with_muted_stderr(|| {
            let host = cpal::default_host();
            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| CaptureError::Device("no audio input device available".into()))
            } else {
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_label = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Input device: {}", device_label);

        let device_config = device
            .default_input_config()
            .map_err(|e| classify_access_error(&e.to_string()))?;
        let sample_rate = device_config.sample_rate().0;
        let channels = device_config.channels() as usize;

        if sample_rate != self.requested_sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Capturing at device rate.",
                self.requested_sample_rate,
                sample_rate
            );
        }
        tracing::debug!("Device configuration: {}Hz, {} channels", sample_rate, channels);

        let tap = AnalysisTap::new();
        let sink = RecordingSink::new();
        let failed = Arc::new(AtomicBool::new(false));

        let callback_tap = tap.clone();
        let callback_sink = sink.clone();
        let callback_failed = Arc::clone(&failed);

        let stream = device
            .build_input_stream(
                &device_config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    ingest(data, channels, &callback_tap, &callback_sink);
                },
                move |err| {
                    tracing::error!("Audio stream error: {}", err);
                    callback_failed.store(true, Ordering::Relaxed);
                },
                None,
            )
            .map_err(|e| classify_access_error(&e.to_string()))?;

        stream
            .play()
            .map_err(|e| classify_access_error(&e.to_string()))?;
        tracing::debug!("Audio stream started; analysis tap live");

        Ok(CaptureHandle {
            stream: Some(stream),
            tap,
            sink,
            failed,
            sample_rate,
            capturing: false,
        })
    }

    /// Begins writing samples into the recording sink.
    ///
    /// Clears the sink first: every Recording entry captures a fresh segment.
    /// Callable once per handle per Recording entry; a double start is a
    /// programming error (fatal in debug builds, no-op in release).
    ///
    /// # Errors
    /// - [`CaptureError::CaptureStart`] if the stream was released or died
    ///   after the access grant
    pub fn start_capture(&self, handle: &mut CaptureHandle) -> Result<(), CaptureError> {
        debug_assert!(
            !handle.capturing,
            "start_capture called twice for one Recording entry"
        );
        if handle.capturing {
            return Ok(());
        }

        let stream = handle.stream.as_ref().ok_or_else(|| {
            CaptureError::CaptureStart("input stream was already released".into())
        })?;
        if handle.failed.load(Ordering::Relaxed) {
            return Err(CaptureError::CaptureStart(
                "input stream reported a hardware error".into(),
            ));
        }
        stream
            .play()
            .map_err(|e| CaptureError::CaptureStart(e.to_string()))?;

        handle.sink.samples.lock().unwrap().clear();
        handle.sink.active.store(true, Ordering::Relaxed);
        handle.capturing = true;
        tracing::debug!("Capture started");
        Ok(())
    }

    /// Halts sink writes and finalizes the buffered samples into a clip.
    ///
    /// The analysis tap stays live after stopping, so the waveform source
    /// outlives the recording segment until the handle is released.
    ///
    /// # Errors
    /// - If WAV encoding of the buffered samples fails
    pub fn stop_capture(&self, handle: &mut CaptureHandle) -> anyhow::Result<Clip> {
        handle.sink.active.store(false, Ordering::Relaxed);
        handle.capturing = false;

        let samples = std::mem::take(&mut *handle.sink.samples.lock().unwrap());
        if samples.is_empty() {
            tracing::warn!("Capture stopped with no samples buffered");
        }

        let clip = encode_clip(&samples, handle.sample_rate)?;
        tracing::info!(
            "Capture stopped: {:.2}s ({} samples at {}Hz)",
            clip.duration.as_secs_f64(),
            samples.len(),
            handle.sample_rate
        );
        Ok(clip)
    }

    /// Stops the hardware stream and frees it. Idempotent.
    pub fn release(&self, handle: &mut CaptureHandle) {
        handle.sink.active.store(false, Ordering::Relaxed);
        handle.capturing = false;
        if handle.stream.take().is_some() {
            tracing::debug!("Input stream released");
        }
    }
}

/// Stream-callback body: downmixes to mono, feeds the tap, and appends to
/// the sink while it is active.
fn ingest(data: &[i16], channels: usize, tap: &AnalysisTap, sink: &RecordingSink) {
    let mono: Vec<i16> = if channels <= 1 {
        data.to_vec()
    } else {
        data.chunks_exact(channels)
            .map(|frame| {
                (frame.iter().map(|&s| i32::from(s)).sum::<i32>() / channels as i32) as i16
            })
            .collect()
    };

    tap.push(&mono);
    if sink.active.load(Ordering::Relaxed) {
        sink.samples.lock().unwrap().extend_from_slice(&mono);
    }
}

/// Encodes mono samples as an in-memory 16-bit PCM WAV clip.
fn encode_clip(samples: &[i16], sample_rate: u32) -> anyhow::Result<Clip> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(Clip {
        wav: cursor.into_inner(),
        duration: Duration::from_secs_f64(samples.len() as f64 / f64::from(sample_rate)),
        sample_rate,
    })
}

/// Classifies a device/stream error as permission-related or hardware-related.
fn classify_access_error(message: &str) -> CaptureError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("not authorized") {
        CaptureError::Permission(message.to_string())
    } else {
        CaptureError::Device(message.to_string())
    }
}

/// Finds an audio input device by name or numeric index.
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device, CaptureError> {
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| CaptureError::Device(format!("failed to enumerate devices: {e}")))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        if index < devices.len() {
            return Ok(devices.into_iter().nth(index).unwrap());
        }
        return Err(CaptureError::Device(format!(
            "device index {} is out of range (0-{})",
            index,
            devices.len().saturating_sub(1)
        )));
    }

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(CaptureError::Device(format!(
        "audio input device '{device_spec}' not found. Use 'babble list-devices' to see available devices."
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_snapshot_is_centered_at_the_midpoint() {
        let tap = AnalysisTap::new();
        tap.push(&[0, i16::MAX, i16::MIN]);
        let snapshot = tap.snapshot();
        assert_eq!(snapshot, vec![128, 255, 0]);
    }

    #[test]
    fn tap_keeps_only_the_most_recent_window() {
        let tap = AnalysisTap::new();
        let samples: Vec<i16> = (0..(TAP_WINDOW as i16 + 10)).collect();
        tap.push(&samples);
        let snapshot = tap.snapshot();
        assert_eq!(snapshot.len(), TAP_WINDOW);
        // The oldest ten samples fell out of the ring.
        let ring = tap.ring.lock().unwrap();
        assert_eq!(*ring.front().unwrap(), 10);
    }

    #[test]
    fn empty_tap_yields_an_empty_snapshot() {
        let tap = AnalysisTap::new();
        assert!(tap.snapshot().is_empty());
    }

    #[test]
    fn sink_ignores_samples_while_inactive() {
        let tap = AnalysisTap::new();
        let sink = RecordingSink::new();

        ingest(&[100, 200, 300], 1, &tap, &sink);
        assert!(sink.samples.lock().unwrap().is_empty());
        // The tap saw the audio even though the sink did not.
        assert_eq!(tap.ring.lock().unwrap().len(), 3);

        sink.active.store(true, Ordering::Relaxed);
        ingest(&[400, 500], 1, &tap, &sink);
        assert_eq!(*sink.samples.lock().unwrap(), vec![400, 500]);
    }

    #[test]
    fn stereo_input_downmixes_by_averaging() {
        let tap = AnalysisTap::new();
        let sink = RecordingSink::new();
        sink.active.store(true, Ordering::Relaxed);

        ingest(&[100, 300, -200, 200], 2, &tap, &sink);
        assert_eq!(*sink.samples.lock().unwrap(), vec![200, 0]);
    }

    #[test]
    fn clip_duration_matches_the_sample_count() {
        let samples = vec![0i16; 16000];
        let clip = encode_clip(&samples, 16000).unwrap();
        assert_eq!(clip.duration, Duration::from_secs(1));
        assert_eq!(clip.sample_rate, 16000);

        let reader = hound::WavReader::new(Cursor::new(clip.wav)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.len(), 16000);
    }

    #[test]
    fn empty_capture_finalizes_to_a_zero_length_clip() {
        let clip = encode_clip(&[], 48000).unwrap();
        assert_eq!(clip.duration, Duration::ZERO);
        assert!(hound::WavReader::new(Cursor::new(clip.wav)).is_ok());
    }

    #[test]
    fn permission_failures_are_distinguishable_from_device_failures() {
        assert!(matches!(
            classify_access_error("Operation not permitted: permission denied by backend"),
            CaptureError::Permission(_)
        ));
        assert!(matches!(
            classify_access_error("no such device"),
            CaptureError::Device(_)
        ));
    }

    #[test]
    fn release_is_idempotent_without_a_stream() {
        let service = AudioCaptureService::new(16000, "default".to_string());
        let mut handle = CaptureHandle {
            stream: None,
            tap: AnalysisTap::new(),
            sink: RecordingSink::new(),
            failed: Arc::new(AtomicBool::new(false)),
            sample_rate: 16000,
            capturing: false,
        };
        service.release(&mut handle);
        service.release(&mut handle);
        assert!(handle.stream.is_none());
    }

    #[test]
    fn start_capture_on_a_released_handle_reports_capture_start() {
        let service = AudioCaptureService::new(16000, "default".to_string());
        let mut handle = CaptureHandle {
            stream: None,
            tap: AnalysisTap::new(),
            sink: RecordingSink::new(),
            failed: Arc::new(AtomicBool::new(false)),
            sample_rate: 16000,
            capturing: false,
        };
        let err = service.start_capture(&mut handle).unwrap_err();
        assert!(matches!(err, CaptureError::CaptureStart(_)));
    }
}
