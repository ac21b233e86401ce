//! Session orchestration.
//!
//! The controller is the single owner of the session: it translates user
//! intents into session events, runs them through the reducer, and executes
//! the returned effects against the capture service and the waveform
//! renderer. It also owns the one-second countdown ticker, which is armed
//! only while the session is in Countdown — leaving the stage disarms the
//! ticker before any further event can be processed, so a stale tick can
//! never reach the reducer.

use crate::recording::capture::{AudioCaptureService, CaptureError, CaptureHandle, Clip};
use crate::recording::waveform::WaveformRenderer;
use crate::session::{apply, Effect, Session, SessionEvent, Stage};
use std::time::{Duration, Instant};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// A user intention forwarded by the presentation layer.
///
/// Intents invalid for the current stage are ignored without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Begin a session: request microphone access, then count down
    Start,
    /// Stop the active recording and finalize a clip
    Stop,
    /// Start another segment from the finished screen
    Resume,
}

/// One-second deadline clock owned by the Countdown stage.
struct CountdownTicker {
    next_tick: Instant,
}

impl CountdownTicker {
    fn new(now: Instant) -> Self {
        CountdownTicker {
            next_tick: now + TICK_INTERVAL,
        }
    }

    /// True once per elapsed second; re-arms itself when due.
    fn due(&mut self, now: Instant) -> bool {
        if now < self.next_tick {
            return false;
        }
        self.next_tick += TICK_INTERVAL;
        true
    }
}

/// Composes the state machine, capture service, and waveform renderer.
pub struct RecorderController {
    session: Session,
    capture: AudioCaptureService,
    renderer: WaveformRenderer,
    handle: Option<CaptureHandle>,
    countdown: Option<CountdownTicker>,
    clips: Vec<Clip>,
}

impl RecorderController {
    pub fn new(capture: AudioCaptureService) -> Self {
        RecorderController {
            session: Session::new(),
            capture,
            renderer: WaveformRenderer::new(),
            handle: None,
            countdown: None,
            clips: Vec::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn renderer(&self) -> &WaveformRenderer {
        &self.renderer
    }

    /// Clips finalized so far, in session order.
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Duration of the segment currently being captured.
    pub fn capture_duration(&self) -> Duration {
        self.handle
            .as_ref()
            .map(CaptureHandle::recorded_duration)
            .unwrap_or_default()
    }

    /// Handles a user intent, performing the microphone-access request for
    /// Start inline.
    ///
    /// The access request is the only suspending operation; awaiting it here
    /// in the single-owner loop means a repeated Start cannot queue a second
    /// outstanding request. Intents invalid for the current stage are
    /// dropped.
    ///
    /// # Errors
    /// - [`CaptureError::Permission`] / [`CaptureError::Device`] when access
    ///   is refused; the session stays in Idle and the user may retry
    pub async fn handle_intent(&mut self, intent: Intent) -> Result<(), CaptureError> {
        match intent {
            Intent::Start => {
                if self.session.stage != Stage::Idle {
                    tracing::debug!("Ignoring start intent in {:?}", self.session.stage);
                    return Ok(());
                }
                let handle = self.capture.request_access().await?;
                self.handle = Some(handle);
                self.dispatch(SessionEvent::AccessGranted);
            }
            Intent::Stop => self.dispatch(SessionEvent::StopRequested),
            Intent::Resume => self.dispatch(SessionEvent::ResumeRequested),
        }
        Ok(())
    }

    /// Advances the countdown ticker and the waveform frame clock.
    ///
    /// Called once per event-loop iteration. Returns true when the waveform
    /// trace was redrawn this iteration.
    pub fn tick(&mut self, now: Instant) -> bool {
        let countdown_due = self.countdown.as_mut().is_some_and(|ticker| ticker.due(now));
        if countdown_due {
            self.dispatch(SessionEvent::CountdownTick);
            if self.session.stage == Stage::Countdown && self.session.countdown_remaining == 0 {
                self.dispatch(SessionEvent::CountdownFinished);
            }
        }
        self.renderer.tick(now)
    }

    /// Tears down the session: cancels rendering and releases the
    /// microphone, returning all finalized clips.
    ///
    /// An in-progress segment is discarded: quitting aborts, stopping
    /// finalizes.
    pub fn shutdown(&mut self) -> Vec<Clip> {
        if self.session.is_capturing {
            tracing::info!("Quit while recording: discarding the in-progress segment");
        }
        self.renderer.stop();
        self.countdown = None;
        if let Some(handle) = self.handle.as_mut() {
            self.capture.release(handle);
        }
        self.handle = None;
        std::mem::take(&mut self.clips)
    }

    /// Runs one event through the reducer and executes its effects.
    fn dispatch(&mut self, event: SessionEvent) {
        let (next, effects) = apply(&self.session, event);
        if next != self.session {
            tracing::debug!("Session {:?} -> {:?} on {:?}", self.session.stage, next.stage, event);
        }
        self.session = next;
        self.sync_countdown_ticker();
        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Keeps the ticker's lifetime locked to the Countdown stage.
    fn sync_countdown_ticker(&mut self) {
        match self.session.stage {
            Stage::Countdown => {
                if self.countdown.is_none() {
                    self.countdown = Some(CountdownTicker::new(Instant::now()));
                }
            }
            _ => self.countdown = None,
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::BeginCapture => {
                let started = match self.handle.as_mut() {
                    Some(handle) => self.capture.start_capture(handle),
                    None => Err(CaptureError::CaptureStart(
                        "no capture handle for this session".into(),
                    )),
                };
                if let Err(e) = started {
                    tracing::error!("Failed to start capture: {}", e);
                    self.dispatch(SessionEvent::CaptureLost);
                }
            }
            Effect::BeginRender => {
                if let Some(handle) = self.handle.as_ref() {
                    if let Err(e) = self.renderer.start(handle.tap()) {
                        // Losing the waveform does not end the recording.
                        tracing::warn!("Waveform disabled: {}", e);
                    }
                }
            }
            Effect::EndRender => self.renderer.stop(),
            Effect::FinalizeCapture => {
                if let Some(handle) = self.handle.as_mut() {
                    match self.capture.stop_capture(handle) {
                        Ok(clip) => self.clips.push(clip),
                        Err(e) => tracing::error!("Failed to finalize clip: {}", e),
                    }
                }
            }
            Effect::ReleaseCapture => {
                if let Some(handle) = self.handle.as_mut() {
                    self.capture.release(handle);
                }
                self.handle = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::COUNTDOWN_SECS;

    fn controller() -> RecorderController {
        RecorderController::new(AudioCaptureService::new(16000, "default".to_string()))
    }

    #[tokio::test]
    async fn stop_and_resume_are_ignored_while_idle() {
        let mut controller = controller();
        controller.handle_intent(Intent::Stop).await.unwrap();
        controller.handle_intent(Intent::Resume).await.unwrap();

        assert_eq!(controller.session().stage, Stage::Idle);
        assert_eq!(controller.session().countdown_remaining, COUNTDOWN_SECS);
        assert!(controller.clips().is_empty());
    }

    #[tokio::test]
    async fn failed_access_leaves_the_session_idle_with_no_handle() {
        let mut controller = RecorderController::new(AudioCaptureService::new(
            16000,
            "no-such-device-babble-test".to_string(),
        ));
        let err = controller.handle_intent(Intent::Start).await.unwrap_err();
        assert!(matches!(err, CaptureError::Device(_)));

        assert_eq!(controller.session().stage, Stage::Idle);
        assert!(!controller.session().is_capturing);
        assert!(controller.handle.is_none());
    }

    #[test]
    fn ticker_fires_once_per_second() {
        let start = Instant::now();
        let mut ticker = CountdownTicker::new(start);

        assert!(!ticker.due(start));
        assert!(!ticker.due(start + Duration::from_millis(999)));
        assert!(ticker.due(start + Duration::from_secs(1)));
        assert!(!ticker.due(start + Duration::from_millis(1500)));
        assert!(ticker.due(start + Duration::from_secs(2)));
    }

    #[test]
    fn tick_without_countdown_only_drives_the_renderer() {
        let mut controller = controller();
        assert!(!controller.tick(Instant::now()));
        assert_eq!(controller.session().stage, Stage::Idle);
    }

    #[tokio::test]
    async fn start_is_coalesced_while_counting_down() {
        let mut controller = controller();
        controller.dispatch(SessionEvent::AccessGranted);
        assert_eq!(controller.session().stage, Stage::Countdown);

        // A repeated start must not restart the countdown or issue a second
        // access request.
        controller.handle_intent(Intent::Start).await.unwrap();
        assert_eq!(controller.session().stage, Stage::Countdown);
        assert_eq!(controller.session().countdown_remaining, COUNTDOWN_SECS);
    }

    #[test]
    fn countdown_without_a_live_handle_recovers_to_idle() {
        let mut controller = controller();
        controller.dispatch(SessionEvent::AccessGranted);
        assert!(controller.countdown.is_some());

        let start = Instant::now();
        for (elapsed, expected) in [(1u64, 2u8), (2, 1)] {
            controller.tick(start + Duration::from_secs(elapsed));
            assert_eq!(controller.session().stage, Stage::Countdown);
            assert_eq!(controller.session().countdown_remaining, expected);
        }

        // The last tick exhausts the countdown; capture cannot start without
        // a handle, so the session falls back to Idle, the ticker disarms,
        // and no render loop is left running.
        controller.tick(start + Duration::from_secs(3));
        assert_eq!(controller.session().stage, Stage::Idle);
        assert!(!controller.session().is_capturing);
        assert!(controller.countdown.is_none());
        assert!(!controller.renderer().is_active());
    }

    #[test]
    fn shutdown_returns_collected_clips_and_releases() {
        let mut controller = controller();
        let clips = controller.shutdown();
        assert!(clips.is_empty());
        assert!(!controller.renderer().is_active());
    }
}
