//! Terminal user interface for the recording session.
//!
//! Renders the stage-dependent screens (start affordance, countdown digit,
//! live waveform with stop hint, done/resume choices) and maps key presses to
//! recorder commands. No session logic lives here; every key is forwarded as
//! an intent and the controller decides whether it applies.

use crate::recording::waveform::{CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::session::{Session, Stage};
use anyhow::anyhow;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::canvas::{Canvas, Line as CanvasLine},
    widgets::Paragraph,
};
use std::io::{stdout, Stdout};
use std::time::Duration;

/// Stroke color of the waveform trace.
const WAVE_COLOR: Color = Color::Rgb(255, 160, 122);

/// Accent color for the start affordance and resume hint.
const ACCENT_COLOR: Color = Color::Rgb(255, 200, 160);

/// How long to wait for a key press before yielding back to the loop.
const INPUT_POLL: Duration = Duration::from_millis(33);

/// User input command produced by one poll of the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderCommand {
    /// No relevant key pressed
    Continue,
    /// Begin a session (Enter while idle)
    Start,
    /// Stop the active recording (Enter while recording)
    Stop,
    /// Record another segment (r)
    Resume,
    /// Accept the session and exit (Enter while finished)
    Done,
    /// Abort and exit (Escape, 'q', or Ctrl+C)
    Quit,
}

/// Terminal UI for the recording session.
pub struct RecorderTui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    notice: Option<String>,
}

impl RecorderTui {
    /// Creates a new TUI instance and enters alternate screen mode.
    ///
    /// # Errors
    /// - If the terminal cannot be initialized
    /// - If raw mode cannot be enabled
    pub fn new() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(RecorderTui {
            terminal,
            notice: None,
        })
    }

    /// Shows a transient message on the idle screen (e.g. a denied
    /// microphone request the user may retry).
    pub fn set_notice(&mut self, message: String) {
        self.notice = Some(message);
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Polls for input and maps it to a command.
    ///
    /// Enter is the stage-primary action (start, stop, or done); `r` always
    /// requests a resume and is ignored by the controller outside Finished.
    ///
    /// # Errors
    /// - If event polling fails
    pub fn poll_command(&mut self, stage: Stage) -> anyhow::Result<RecorderCommand> {
        if !event::poll(INPUT_POLL)? {
            return Ok(RecorderCommand::Continue);
        }
        if let Event::Key(key) = event::read()? {
            return Ok(match key.code {
                KeyCode::Enter => match stage {
                    Stage::Idle => RecorderCommand::Start,
                    Stage::Recording => RecorderCommand::Stop,
                    Stage::Finished => RecorderCommand::Done,
                    Stage::Countdown => RecorderCommand::Continue,
                },
                KeyCode::Char('r') => RecorderCommand::Resume,
                KeyCode::Char('q') | KeyCode::Esc => RecorderCommand::Quit,
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    RecorderCommand::Quit
                }
                _ => RecorderCommand::Continue,
            });
        }
        Ok(RecorderCommand::Continue)
    }

    /// Renders the screen for the current session stage.
    ///
    /// `trace` is the renderer's current polyline (empty outside Recording)
    /// and `recorded` the duration of the in-progress segment.
    ///
    /// # Errors
    /// - If terminal rendering fails
    pub fn draw(
        &mut self,
        session: &Session,
        trace: &[(f64, f64)],
        recorded: Duration,
    ) -> anyhow::Result<()> {
        let notice = self.notice.clone();
        self.terminal
            .draw(|frame| match session.stage {
                Stage::Idle => draw_idle(frame, notice.as_deref()),
                Stage::Countdown => draw_countdown(frame, session.countdown_remaining),
                Stage::Recording => draw_recording(frame, trace, recorded),
                Stage::Finished => draw_finished(frame),
            })
            .map_err(|e| anyhow!("Render failed: {e}"))?;
        Ok(())
    }

    /// Cleans up terminal state and exits alternate screen mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    pub fn cleanup(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for RecorderTui {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn draw_idle(frame: &mut Frame, notice: Option<&str>) {
    let area = frame.area();

    let title = Paragraph::new("babble")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(title, row(area, area.height / 4));

    let button = Paragraph::new("( babble )")
        .style(Style::default().fg(ACCENT_COLOR).bold())
        .alignment(Alignment::Center);
    frame.render_widget(button, row(area, area.height / 2));

    let hint = Paragraph::new("Enter to start · q to quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(hint, row(area, area.height / 2 + 2));

    if let Some(message) = notice {
        let warning = Paragraph::new(message.to_string())
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .wrap(ratatui::widgets::Wrap { trim: true });
        frame.render_widget(warning, row(area, area.height.saturating_sub(3)));
    }
}

fn draw_countdown(frame: &mut Frame, remaining: u8) {
    let area = frame.area();
    let digit = Paragraph::new(remaining.to_string())
        .style(Style::default().fg(Color::White).bold())
        .alignment(Alignment::Center);
    frame.render_widget(digit, row(area, area.height / 2));
}

fn draw_recording(frame: &mut Frame, trace: &[(f64, f64)], recorded: Duration) {
    let area = frame.area();
    let footer_height = 1;

    let content = Rect {
        x: area.x,
        y: area.y,
        width: area.width,
        height: area.height.saturating_sub(footer_height),
    };

    // Waveform occupies the lower half of the content area; the stop
    // affordance sits above it.
    let wave_height = content.height / 2;
    let hint_area = Rect {
        x: content.x,
        y: content.y,
        width: content.width,
        height: content.height - wave_height,
    };
    let wave_area = Rect {
        x: content.x,
        y: content.y + hint_area.height,
        width: content.width,
        height: wave_height,
    };

    let hint = Paragraph::new("( stop )")
        .style(Style::default().fg(Color::White).bold())
        .alignment(Alignment::Center);
    frame.render_widget(hint, row(hint_area, hint_area.height / 2));

    let canvas = Canvas::default()
        .x_bounds([0.0, CANVAS_WIDTH])
        .y_bounds([0.0, CANVAS_HEIGHT])
        .paint(|ctx| {
            for pair in trace.windows(2) {
                ctx.draw(&CanvasLine {
                    x1: pair[0].0,
                    y1: pair[0].1,
                    x2: pair[1].0,
                    y2: pair[1].1,
                    color: WAVE_COLOR,
                });
            }
        });
    frame.render_widget(canvas, wave_area);

    let secs = recorded.as_secs();
    let footer_line = ratatui::text::Line::from(vec![
        Span::styled("● ", Style::default().fg(Color::Red)),
        Span::raw(format!("{}:{:02}", secs / 60, secs % 60)),
        Span::raw("  Enter to stop"),
    ]);
    let footer = Paragraph::new(footer_line).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(
        footer,
        Rect {
            x: area.x,
            y: area.y + area.height.saturating_sub(footer_height),
            width: area.width,
            height: footer_height,
        },
    );
}

fn draw_finished(frame: &mut Frame) {
    let area = frame.area();

    let done = Paragraph::new("( done )")
        .style(Style::default().fg(Color::White).bold())
        .alignment(Alignment::Center);
    frame.render_widget(done, row(area, area.height / 2));

    let hint = ratatui::text::Line::from(vec![
        Span::raw("Enter to finish · "),
        Span::styled("r", Style::default().fg(ACCENT_COLOR).bold()),
        Span::raw(" to resume"),
    ]);
    let hints = Paragraph::new(hint)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(hints, row(area, area.height / 2 + 2));
}

/// A one-line region at the given vertical offset, clamped to the area.
fn row(area: Rect, y: u16) -> Rect {
    Rect {
        x: area.x,
        y: area.y + y.min(area.height.saturating_sub(1)),
        width: area.width,
        height: 1,
    }
}
