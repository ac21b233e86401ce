//! The recording session command.
//!
//! Runs the single-owner event loop that drives the whole session: key
//! presses become intents, the countdown ticker and waveform frame clock are
//! advanced once per iteration, and the screen is redrawn for the current
//! stage. Supports an external stop trigger via SIGUSR1.

use crate::config;
use crate::recording::{
    AudioCaptureService, CaptureError, Intent, RecorderCommand, RecorderController, RecorderTui,
};
use crate::session::Stage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Records voice clips with a countdown and real-time waveform.
///
/// The session loop exits on quit, or on "done" from the finished screen.
/// Finalized clips are summarized in the log on exit; where their bytes go
/// next is up to the caller of this process.
pub async fn handle_record() -> Result<(), anyhow::Error> {
    tracing::info!("=== babble recorder started ===");

    // The TUI has not started yet, so a plain stderr report is enough here.
    let config_data = match config::BabbleConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Failed to load configuration: {err}");
            return Err(anyhow::anyhow!(
                "configuration error: {err}. Check your ~/.config/babble/babble.toml file and try again."
            ));
        }
    };

    tracing::info!(
        "Configuration loaded: device={}, sample_rate={}Hz",
        config_data.audio.device,
        config_data.audio.sample_rate
    );

    let capture = AudioCaptureService::new(
        config_data.audio.sample_rate,
        config_data.audio.device.clone(),
    );
    let mut controller = RecorderController::new(capture);
    let mut tui = RecorderTui::new()?;

    // External stop trigger, e.g. `pkill -USR1 babble` from a script.
    let external_stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&external_stop))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;

    tracing::debug!("Entering session loop. Enter drives the stage action, 'r' resumes, 'q' quits.");
    let mut frame_count = 0u64;

    loop {
        if external_stop.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: issuing stop intent");
            let _ = controller.handle_intent(Intent::Stop).await;
        }

        match tui.poll_command(controller.session().stage) {
            Ok(RecorderCommand::Continue) => {}
            Ok(RecorderCommand::Start) => {
                tui.clear_notice();
                if let Err(e) = controller.handle_intent(Intent::Start).await {
                    tracing::error!("Microphone access failed: {}", e);
                    let notice = match e {
                        CaptureError::Permission(_) => {
                            format!("{e}. Press Enter to try again.")
                        }
                        _ => format!("{e}. Check 'babble list-devices' and press Enter to retry."),
                    };
                    tui.set_notice(notice);
                }
            }
            Ok(RecorderCommand::Stop) => {
                let _ = controller.handle_intent(Intent::Stop).await;
            }
            Ok(RecorderCommand::Resume) => {
                let _ = controller.handle_intent(Intent::Resume).await;
            }
            Ok(RecorderCommand::Done) => {
                if controller.session().stage == Stage::Finished {
                    break;
                }
            }
            Ok(RecorderCommand::Quit) => {
                tracing::debug!("Quit requested");
                break;
            }
            Err(e) => {
                tracing::error!("Input handling error: {}", e);
                return Err(anyhow::anyhow!("Input handling error: {e}"));
            }
        }

        controller.tick(Instant::now());

        if controller.session().is_capturing {
            frame_count += 1;
            if frame_count % 300 == 0 {
                tracing::debug!(
                    "Recording: {:.1}s buffered",
                    controller.capture_duration().as_secs_f64()
                );
            }
        }

        tui.draw(
            controller.session(),
            controller.renderer().trace(),
            controller.capture_duration(),
        )?;
    }

    let clips = controller.shutdown();
    if clips.is_empty() {
        tracing::info!("Session ended with no finalized clips");
    } else {
        let total: f64 = clips.iter().map(|c| c.duration.as_secs_f64()).sum();
        tracing::info!(
            "Session produced {} clip(s), {:.2}s of audio in total",
            clips.len(),
            total
        );
    }

    tui.cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;

    tracing::info!("=== babble recorder exited ===");
    Ok(())
}
