//! Recording session state machine.
//!
//! The session lifecycle (Idle → Countdown → Recording → Finished) is a pure
//! reducer: `apply()` takes the current session and an event and returns the
//! next session together with the side effects the controller must execute.
//! The reducer never performs side effects itself, and any event that is not
//! legal for the current stage leaves the session untouched — stale ticker or
//! frame callbacks are rejected here rather than applied.

/// Seconds counted down before capture begins.
pub const COUNTDOWN_SECS: u8 = 3;

/// One value of the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Waiting for the user to start; no microphone acquired yet
    #[default]
    Idle,
    /// Microphone granted, counting down to capture
    Countdown,
    /// Capturing audio with live waveform rendering
    Recording,
    /// A clip has been finalized; the user may resume or finish
    Finished,
}

/// The single active recording session.
///
/// Invariant: `is_capturing` is true exactly when `stage` is
/// [`Stage::Recording`]. `countdown_remaining` is meaningful only in
/// [`Stage::Countdown`] and is reset to [`COUNTDOWN_SECS`] on every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub stage: Stage,
    pub countdown_remaining: u8,
    pub is_capturing: bool,
}

impl Session {
    /// Creates a fresh session in the Idle stage.
    pub fn new() -> Self {
        Session {
            stage: Stage::Idle,
            countdown_remaining: COUNTDOWN_SECS,
            is_capturing: false,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can drive a session transition.
///
/// User intents and clock deadlines are translated into these by the
/// controller; the reducer decides whether they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Microphone access was granted (start intent succeeded)
    AccessGranted,
    /// One second of the countdown elapsed
    CountdownTick,
    /// The countdown reached zero
    CountdownFinished,
    /// The user asked to stop the recording
    StopRequested,
    /// The user asked to resume from the finished screen
    ResumeRequested,
    /// Capture could not be started or the stream died
    CaptureLost,
}

/// Side effects to execute after a transition.
///
/// The controller runs these in order; the reducer only names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Begin writing samples into the recording sink
    BeginCapture,
    /// Start the waveform render loop on the live tap
    BeginRender,
    /// Cancel the waveform render loop
    EndRender,
    /// Finalize the recording sink into an immutable clip
    FinalizeCapture,
    /// Release the microphone stream entirely
    ReleaseCapture,
}

/// Applies `event` to `session`, returning the next session and effects.
///
/// Illegal (stage, event) combinations are no-ops: the unchanged session is
/// returned with no effects and `stage` is never mutated.
pub fn apply(session: &Session, event: SessionEvent) -> (Session, Vec<Effect>) {
    use Effect::*;
    use SessionEvent::*;
    use Stage::*;

    match (session.stage, event) {
        (Idle, AccessGranted) => (
            Session {
                stage: Countdown,
                countdown_remaining: COUNTDOWN_SECS,
                is_capturing: false,
            },
            vec![],
        ),
        (Countdown, CountdownTick) if session.countdown_remaining > 0 => (
            Session {
                countdown_remaining: session.countdown_remaining - 1,
                ..*session
            },
            vec![],
        ),
        (Countdown, CountdownFinished) if session.countdown_remaining == 0 => (
            Session {
                stage: Recording,
                countdown_remaining: 0,
                is_capturing: true,
            },
            vec![BeginCapture, BeginRender],
        ),
        (Recording, StopRequested) => (
            Session {
                stage: Finished,
                countdown_remaining: 0,
                is_capturing: false,
            },
            vec![EndRender, FinalizeCapture],
        ),
        (Recording, CaptureLost) => (
            Session {
                stage: Idle,
                countdown_remaining: COUNTDOWN_SECS,
                is_capturing: false,
            },
            vec![EndRender, ReleaseCapture],
        ),
        (Finished, ResumeRequested) => (
            Session {
                stage: Countdown,
                countdown_remaining: COUNTDOWN_SECS,
                is_capturing: false,
            },
            vec![],
        ),

        // Everything else is a stale or invalid event: no transition.
        _ => (*session, vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(session: &Session) {
        assert_eq!(
            session.is_capturing,
            session.stage == Stage::Recording,
            "is_capturing must hold exactly while Recording: {session:?}"
        );
    }

    /// Drives the session to Recording via the only legal path.
    fn recording_session() -> Session {
        let mut session = Session::new();
        for event in [
            SessionEvent::AccessGranted,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownFinished,
        ] {
            session = apply(&session, event).0;
        }
        assert_eq!(session.stage, Stage::Recording);
        session
    }

    #[test]
    fn capturing_iff_recording_across_all_valid_intents() {
        let mut session = Session::new();
        let walk = [
            SessionEvent::AccessGranted,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownFinished,
            SessionEvent::StopRequested,
            SessionEvent::ResumeRequested,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownFinished,
            SessionEvent::CaptureLost,
        ];
        assert_invariant(&session);
        for event in walk {
            session = apply(&session, event).0;
            assert_invariant(&session);
        }
        assert_eq!(session.stage, Stage::Idle);
    }

    #[test]
    fn start_then_three_ticks_counts_down_into_recording() {
        let session = Session::new();
        let (session, effects) = apply(&session, SessionEvent::AccessGranted);
        assert_eq!(session.stage, Stage::Countdown);
        assert_eq!(session.countdown_remaining, 3);
        assert!(effects.is_empty());

        let mut session = session;
        for expected in [2, 1, 0] {
            let previous = session.countdown_remaining;
            session = apply(&session, SessionEvent::CountdownTick).0;
            assert_eq!(session.stage, Stage::Countdown);
            assert_eq!(session.countdown_remaining, expected);
            assert_eq!(previous - session.countdown_remaining, 1);
        }

        let (session, effects) = apply(&session, SessionEvent::CountdownFinished);
        assert_eq!(session.stage, Stage::Recording);
        assert!(session.is_capturing);
        assert_eq!(effects, vec![Effect::BeginCapture, Effect::BeginRender]);
    }

    #[test]
    fn tick_at_zero_never_goes_negative() {
        let mut session = Session::new();
        session = apply(&session, SessionEvent::AccessGranted).0;
        for _ in 0..10 {
            session = apply(&session, SessionEvent::CountdownTick).0;
            assert_eq!(session.stage, Stage::Countdown);
        }
        assert_eq!(session.countdown_remaining, 0);
    }

    #[test]
    fn countdown_finished_is_rejected_while_ticks_remain() {
        let session = apply(&Session::new(), SessionEvent::AccessGranted).0;
        assert_eq!(session.countdown_remaining, 3);
        let (next, effects) = apply(&session, SessionEvent::CountdownFinished);
        assert_eq!(next, session);
        assert!(effects.is_empty());
    }

    #[test]
    fn stop_while_recording_finishes_and_cancels_rendering() {
        let session = recording_session();
        let (next, effects) = apply(&session, SessionEvent::StopRequested);
        assert_eq!(next.stage, Stage::Finished);
        assert!(!next.is_capturing);
        // Rendering is torn down before the capture is finalized.
        assert_eq!(effects, vec![Effect::EndRender, Effect::FinalizeCapture]);
    }

    #[test]
    fn resume_from_finished_restarts_the_countdown() {
        let session = recording_session();
        let session = apply(&session, SessionEvent::StopRequested).0;
        assert_eq!(session.stage, Stage::Finished);

        let (next, effects) = apply(&session, SessionEvent::ResumeRequested);
        assert_eq!(next.stage, Stage::Countdown);
        assert_eq!(next.countdown_remaining, COUNTDOWN_SECS);
        assert!(effects.is_empty());
    }

    #[test]
    fn capture_lost_recovers_to_idle_and_releases() {
        let session = recording_session();
        let (next, effects) = apply(&session, SessionEvent::CaptureLost);
        assert_eq!(next.stage, Stage::Idle);
        assert!(!next.is_capturing);
        assert_eq!(effects, vec![Effect::EndRender, Effect::ReleaseCapture]);
    }

    #[test]
    fn invalid_intents_leave_the_session_unchanged() {
        let idle = Session::new();
        for event in [
            SessionEvent::StopRequested,
            SessionEvent::ResumeRequested,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownFinished,
            SessionEvent::CaptureLost,
        ] {
            let (next, effects) = apply(&idle, event);
            assert_eq!(next, idle, "{event:?} must not move an idle session");
            assert!(effects.is_empty());
        }

        let recording = recording_session();
        for event in [
            SessionEvent::AccessGranted,
            SessionEvent::ResumeRequested,
            SessionEvent::CountdownTick,
            SessionEvent::CountdownFinished,
        ] {
            let (next, effects) = apply(&recording, event);
            assert_eq!(next, recording, "{event:?} must not move a recording session");
            assert!(effects.is_empty());
        }
    }
}
