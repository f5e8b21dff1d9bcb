//! TUI player for one event log.

use crate::input::{InputEvent, InputHandler};
use crate::layout::{Layout, LayoutConfig};
use crate::presentation::{FrameSelection, PlayerView};
use crate::view::{CallTreeView, LocalsView, SourceView, StatusView, StdoutView, Theme, View};
use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        execute,
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    },
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracescope_log::EventLog;
use tracescope_replay::{ReplayConfig, ReplayEngine, ReplayStats};
use tracescope_runtime::{PlaybackConfig, PlaybackScheduler, TickOutcome};

const HELP: &[&str] = &[
    "space / p   play or pause",
    "h / left    step back",
    "l / right   step forward",
    "g / Home    first step",
    "G / End     last step",
    "+ / -       faster / slower",
    "r           back to step 0",
    "j / k       next / previous frame",
    "f           pin or unpin the frame",
    "?           toggle this help",
    "q / Esc     quit",
];

/// TUI application state
pub struct TuiApp {
    scheduler: PlaybackScheduler,
    engine: ReplayEngine,
    selection: FrameSelection,
    input: InputHandler,
    layout: Layout,
    theme: Theme,
    tick_rate: Duration,
    shown_step: Option<usize>,
    show_help: bool,
    should_quit: bool,
}

impl TuiApp {
    /// Create a player for a log, paused at step 0
    #[must_use]
    pub fn new(
        log: EventLog,
        playback: PlaybackConfig,
        replay: ReplayConfig,
        config: &TuiConfig,
    ) -> Self {
        let engine = ReplayEngine::new(log.clone()).with_config(replay);
        Self {
            scheduler: PlaybackScheduler::new(log, playback),
            engine,
            selection: FrameSelection::new(),
            input: InputHandler::new(),
            layout: Layout::with_config(config.layout),
            theme: Theme::from_scheme(config.color_scheme),
            tick_rate: config.tick_rate(),
            shown_step: None,
            show_help: false,
            should_quit: false,
        }
    }

    /// Start playing as soon as the player opens
    #[must_use]
    pub fn autoplay(mut self) -> Self {
        self.scheduler.play();
        self
    }

    /// Scheduler driving the cursor
    #[must_use]
    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    /// Frame selection
    #[must_use]
    pub fn selection(&self) -> &FrameSelection {
        &self.selection
    }

    /// Reconstruction counters for the current log
    #[must_use]
    pub fn replay_stats(&self) -> ReplayStats {
        self.engine.stats()
    }

    /// Whether the user asked to quit
    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Replace the log being played
    pub fn load(&mut self, log: EventLog) {
        self.engine.load(log.clone());
        self.scheduler.load(log);
        self.selection.clear();
        self.shown_step = None;
    }

    /// Run the TUI
    ///
    /// # Errors
    ///
    /// Returns error if terminal setup or execution fails
    pub fn run(&mut self) -> Result<(), TuiError> {
        enable_raw_mode().map_err(|e| TuiError::Terminal(e.to_string()))?;
        execute!(std::io::stdout(), EnterAlternateScreen)
            .map_err(|e| TuiError::Terminal(e.to_string()))?;

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal =
            ratatui::Terminal::new(backend).map_err(|e| TuiError::Terminal(e.to_string()))?;

        let result = self.run_inner(&mut terminal);

        disable_raw_mode().map_err(|e| TuiError::Terminal(e.to_string()))?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .map_err(|e| TuiError::Terminal(e.to_string()))?;
        terminal
            .show_cursor()
            .map_err(|e| TuiError::Terminal(e.to_string()))?;

        result
    }

    fn run_inner(
        &mut self,
        terminal: &mut ratatui::Terminal<CrosstermBackend<std::io::Stdout>>,
    ) -> Result<(), TuiError> {
        tracing::info!(
            run = %self.scheduler.log().run_id(),
            events = self.scheduler.log().len(),
            "player opened"
        );

        loop {
            self.update(Instant::now());
            let player = self.player_view();
            terminal
                .draw(|f| self.draw(f, &player))
                .map_err(|e| TuiError::Render(e.to_string()))?;

            let timeout = if self.scheduler.is_playing() {
                self.tick_rate
            } else {
                self.tick_rate.max(Duration::from_millis(250))
            };
            if let Some(event) = self
                .input
                .next_event(timeout)
                .map_err(|e| TuiError::Io(e.to_string()))?
            {
                self.handle_event(event);
            }

            if self.should_quit {
                tracing::info!(step = self.scheduler.step_index(), "player closed");
                return Ok(());
            }
        }
    }

    /// Advance playback to `now`
    pub fn update(&mut self, now: Instant) -> TickOutcome {
        let outcome = self.scheduler.tick(now);
        if let TickOutcome::Finished { step_index } = outcome {
            tracing::debug!(step = step_index, "playback reached the end");
        }
        outcome
    }

    /// Build the view model for the current cursor
    ///
    /// The frame selection follows the last event whenever the step changed
    /// since the previous call.
    pub fn player_view(&mut self) -> PlayerView {
        let cursor = self.scheduler.cursor();
        let step = i64::try_from(cursor.step_index).unwrap_or(i64::MAX);
        let diff = self.engine.step_diff(step);
        let state = self.engine.state_at(step);

        if self.shown_step != Some(cursor.step_index) {
            self.selection.follow(state);
            self.shown_step = Some(cursor.step_index);
        }
        PlayerView::build(self.scheduler.log(), state, &cursor, &diff, &self.selection)
    }

    /// Apply one user action
    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::TogglePlay => {
                self.scheduler.toggle();
            }
            InputEvent::StepBack => self.scheduler.step_back(),
            InputEvent::StepForward => self.scheduler.step_forward(),
            InputEvent::SeekStart => self.scheduler.seek(0),
            InputEvent::SeekEnd => self.scheduler.seek_end(),
            InputEvent::SpeedUp => self.scheduler.speed_up(),
            InputEvent::SpeedDown => self.scheduler.speed_down(),
            InputEvent::Reset => self.scheduler.reset(),
            InputEvent::NextFrame | InputEvent::PrevFrame => {
                let step = i64::try_from(self.scheduler.step_index()).unwrap_or(i64::MAX);
                let state = self.engine.state_at(step);
                if event == InputEvent::NextFrame {
                    self.selection.select_next(state);
                } else {
                    self.selection.select_prev(state);
                }
            }
            InputEvent::TogglePin => {
                if self.selection.is_pinned() {
                    self.selection.unpin();
                } else {
                    self.selection.pin();
                }
            }
            InputEvent::Help => self.show_help = !self.show_help,
            InputEvent::Quit => self.should_quit = true,
            InputEvent::Unknown => {}
        }
    }

    fn draw(&self, f: &mut Frame, player: &PlayerView) {
        let areas = self.layout.calculate(f.area());
        SourceView.render(f, areas.source, player, &self.theme);
        CallTreeView.render(f, areas.tree, player, &self.theme);
        LocalsView.render(f, areas.locals, player, &self.theme);
        StdoutView.render(f, areas.stdout, player, &self.theme);
        StatusView.render(f, areas.status, player, &self.theme);

        if self.show_help {
            Self::render_help(f, f.area());
        }
    }

    fn render_help(f: &mut Frame, area: Rect) {
        let width = 44.min(area.width);
        let height = (HELP.len() as u16 + 2).min(area.height);
        let popup = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + (area.height - height) / 2,
            width,
            height,
        };
        let lines: Vec<Line> = HELP.iter().map(|l| Line::raw(*l)).collect();
        let help = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Keys "));
        f.render_widget(Clear, popup);
        f.render_widget(help, popup);
    }
}

/// TUI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Redraw interval while playing, in milliseconds
    pub tick_rate_ms: u64,
    /// Color scheme
    pub color_scheme: ColorScheme,
    /// Panel sizes
    pub layout: LayoutConfig,
}

impl TuiConfig {
    /// Set the tick rate
    #[must_use]
    pub fn with_tick_rate_ms(mut self, ms: u64) -> Self {
        self.tick_rate_ms = ms;
        self
    }

    /// Set the color scheme
    #[must_use]
    pub fn with_color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = scheme;
        self
    }

    /// Tick rate as a duration, at least 1ms
    #[must_use]
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 16,
            color_scheme: ColorScheme::Default,
            layout: LayoutConfig::default(),
        }
    }
}

/// Color scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorScheme {
    /// Default colors
    #[default]
    Default,
    /// High contrast
    HighContrast,
    /// Dark mode
    Dark,
    /// Light mode
    Light,
}

/// TUI errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum TuiError {
    /// Terminal error
    #[error("terminal error: {0}")]
    Terminal(String),
    /// IO error
    #[error("io error: {0}")]
    Io(String),
    /// Render error
    #[error("render error: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracescope_core::{FrameId, TraceDelta, TraceInstant};
    use tracescope_log::{Event, EventKind};

    fn log() -> EventLog {
        EventLog::new(vec![
            Event::new(1, EventKind::Call, 1u64).with_function("<module>"),
            Event::new(2, EventKind::Call, 2u64)
                .with_function("f")
                .with_parent(1u64, 1)
                .with_args([("n", json!(2))])
                .with_timing(TraceInstant::from_nanos(1), TraceDelta::from_millis(10)),
            Event::new(3, EventKind::Return, 2u64)
                .with_function("f")
                .with_parent(1u64, 1)
                .with_return(json!(4)),
            Event::new(4, EventKind::Line, 1u64)
                .with_function("<module>")
                .with_line(2)
                .with_stdout("4\n"),
        ])
    }

    fn app() -> TuiApp {
        TuiApp::new(
            log(),
            PlaybackConfig::default(),
            ReplayConfig::default(),
            &TuiConfig::default(),
        )
    }

    #[test]
    fn test_tui_config_default() {
        let config = TuiConfig::default();
        assert_eq!(config.tick_rate_ms, 16);
        assert_eq!(config.color_scheme, ColorScheme::Default);
        assert_eq!(config.with_tick_rate_ms(0).tick_rate(), Duration::from_millis(1));
    }

    #[test]
    fn test_color_scheme_serde() {
        let config: TuiConfig =
            serde_json::from_str(r#"{"color_scheme": "high-contrast"}"#).unwrap();
        assert_eq!(config.color_scheme, ColorScheme::HighContrast);
        assert_eq!(config.tick_rate_ms, 16);
    }

    #[test]
    fn test_stepping_keys_move_cursor() {
        let mut app = app();
        app.handle_event(InputEvent::StepForward);
        app.handle_event(InputEvent::StepForward);
        assert_eq!(app.scheduler().step_index(), 2);
        app.handle_event(InputEvent::StepBack);
        assert_eq!(app.scheduler().step_index(), 1);
        app.handle_event(InputEvent::SeekEnd);
        assert_eq!(app.scheduler().step_index(), 3);
        app.handle_event(InputEvent::SeekStart);
        assert_eq!(app.scheduler().step_index(), 0);
    }

    #[test]
    fn test_redraws_at_one_step_reuse_state() {
        let mut app = app();
        app.handle_event(InputEvent::SeekEnd);
        for _ in 0..5 {
            let view = app.player_view();
            assert_eq!(view.stdout, "4\n");
        }

        let stats = app.replay_stats();
        assert_eq!(stats.rewinds, 0);
        assert_eq!(stats.events_folded, 4);
    }

    #[test]
    fn test_view_follows_cursor() {
        let mut app = app();
        app.handle_event(InputEvent::StepForward);
        let view = app.player_view();
        assert_eq!(view.locals.frame_id, Some(FrameId::from_raw(2)));
        assert_eq!(view.locals.rows[0].value, "2");

        app.handle_event(InputEvent::SeekEnd);
        let view = app.player_view();
        assert_eq!(view.locals.frame_id, Some(FrameId::from_raw(1)));
        assert_eq!(view.stdout, "4\n");
        assert_eq!(view.tree.len(), 2);
    }

    #[test]
    fn test_frame_keys_override_until_move() {
        let mut app = app();
        app.handle_event(InputEvent::SeekEnd);
        app.player_view();

        app.handle_event(InputEvent::NextFrame);
        let view = app.player_view();
        assert_eq!(view.locals.frame_id, Some(FrameId::from_raw(2)));

        app.handle_event(InputEvent::StepBack);
        app.handle_event(InputEvent::StepBack);
        let view = app.player_view();
        assert_eq!(view.locals.frame_id, Some(FrameId::from_raw(2)));
        app.handle_event(InputEvent::SeekEnd);
        let view = app.player_view();
        assert_eq!(view.locals.frame_id, Some(FrameId::from_raw(1)));
    }

    #[test]
    fn test_pin_key() {
        let mut app = app();
        app.handle_event(InputEvent::StepForward);
        app.player_view();
        app.handle_event(InputEvent::TogglePin);
        assert!(app.selection().is_pinned());

        app.handle_event(InputEvent::SeekEnd);
        let view = app.player_view();
        assert_eq!(view.locals.frame_id, Some(FrameId::from_raw(2)));

        app.handle_event(InputEvent::TogglePin);
        assert!(!app.selection().is_pinned());
    }

    #[test]
    fn test_play_and_update() {
        let mut app = app().autoplay();
        assert!(app.scheduler().is_playing());

        let start = Instant::now();
        assert!(!app.update(start).moved());
        assert!(app.update(start + Duration::from_millis(400)).moved());
        assert_eq!(app.scheduler().step_index(), 1);

        app.handle_event(InputEvent::TogglePlay);
        assert!(!app.scheduler().is_playing());
    }

    #[test]
    fn test_speed_keys() {
        let mut app = app();
        app.handle_event(InputEvent::SpeedUp);
        assert_eq!(app.scheduler().speed(), 1.25);
        app.handle_event(InputEvent::SpeedDown);
        app.handle_event(InputEvent::SpeedDown);
        assert_eq!(app.scheduler().speed(), 0.75);
    }

    #[test]
    fn test_help_and_quit() {
        let mut app = app();
        app.handle_event(InputEvent::Help);
        assert!(app.show_help);
        app.handle_event(InputEvent::Unknown);
        assert!(!app.should_quit());
        app.handle_event(InputEvent::Quit);
        assert!(app.should_quit());
    }

    #[test]
    fn test_load_resets_selection() {
        let mut app = app();
        app.handle_event(InputEvent::SeekEnd);
        app.player_view();
        app.load(EventLog::new(vec![
            Event::new(1, EventKind::Call, 7u64).with_function("g"),
        ]));
        assert_eq!(app.scheduler().step_index(), 0);
        let view = app.player_view();
        assert_eq!(view.locals.frame_id, Some(FrameId::from_raw(7)));
    }

    #[test]
    fn test_draw_full_screen() {
        use ratatui::backend::TestBackend;

        let mut app = app();
        app.handle_event(InputEvent::SeekEnd);
        app.handle_event(InputEvent::Help);
        let player = app.player_view();
        let mut terminal = ratatui::Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| app.draw(f, &player)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Call Tree"));
        assert!(text.contains("Keys"));
    }

    #[test]
    fn test_tui_error_messages() {
        let err = TuiError::Terminal("test".to_string());
        assert!(err.to_string().contains("terminal"));
    }
}
