//! Player panels.

use crate::presentation::PlayerView;
use crate::ui::ColorScheme;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, Wrap},
    Frame,
};
use ratatui::layout::Constraint;

/// Colors used by the panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Background of the current line and the selected frame
    pub highlight: Color,
    /// Function names and variable names
    pub accent: Color,
    /// Line numbers, ids and placeholders
    pub muted: Color,
    /// Locals changed by the last step
    pub changed: Color,
    /// Exceptions
    pub error: Color,
}

impl Theme {
    /// Palette for a color scheme
    #[must_use]
    pub fn from_scheme(scheme: ColorScheme) -> Self {
        match scheme {
            ColorScheme::Default | ColorScheme::Dark => Self {
                highlight: Color::Rgb(20, 83, 45),
                accent: Color::Green,
                muted: Color::DarkGray,
                changed: Color::Yellow,
                error: Color::Red,
            },
            ColorScheme::Light => Self {
                highlight: Color::Rgb(209, 250, 229),
                accent: Color::Rgb(4, 120, 87),
                muted: Color::Gray,
                changed: Color::Rgb(180, 83, 9),
                error: Color::Red,
            },
            ColorScheme::HighContrast => Self {
                highlight: Color::White,
                accent: Color::Cyan,
                muted: Color::White,
                changed: Color::Yellow,
                error: Color::LightRed,
            },
        }
    }

    fn highlight_style(&self) -> Style {
        let style = Style::default().bg(self.highlight).add_modifier(Modifier::BOLD);
        if self.highlight == Color::White {
            style.fg(Color::Black)
        } else {
            style
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_scheme(ColorScheme::Default)
    }
}

/// A panel of the player
pub trait View {
    /// Render the panel from the current view model
    fn render(&self, f: &mut Frame, area: Rect, player: &PlayerView, theme: &Theme);

    /// Number of rows the panel would show
    fn item_count(&self, player: &PlayerView) -> usize;
}

/// First visible row so that `focus` sits near the middle of `height` rows
#[must_use]
pub fn scroll_offset(focus: Option<usize>, len: usize, height: usize) -> usize {
    match focus {
        Some(focus) if len > height => focus
            .saturating_sub(height / 2)
            .min(len - height),
        _ => 0,
    }
}

fn panel(title: impl Into<String>) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title.into()))
        .borders(Borders::ALL)
}

fn inner_height(area: Rect) -> usize {
    usize::from(area.height.saturating_sub(2))
}

/// Numbered source with the current line highlighted
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceView;

impl View for SourceView {
    fn render(&self, f: &mut Frame, area: Rect, player: &PlayerView, theme: &Theme) {
        let offset = scroll_offset(
            player.highlighted_index(),
            player.source.len(),
            inner_height(area),
        );
        let lines: Vec<Line> = player
            .source
            .iter()
            .skip(offset)
            .map(|line| {
                let number = Span::styled(
                    format!("{:>4} ", line.number),
                    Style::default().fg(theme.muted),
                );
                let line_out = Line::from(vec![number, Span::raw(line.text.clone())]);
                if line.highlighted {
                    line_out.style(theme.highlight_style())
                } else {
                    line_out
                }
            })
            .collect();

        let paragraph = Paragraph::new(lines).block(panel(&player.filename));
        f.render_widget(paragraph, area);
    }

    fn item_count(&self, player: &PlayerView) -> usize {
        player.source.len()
    }
}

/// Indented call tree
#[derive(Debug, Clone, Copy, Default)]
pub struct CallTreeView;

impl View for CallTreeView {
    fn render(&self, f: &mut Frame, area: Rect, player: &PlayerView, theme: &Theme) {
        let focus = player.tree.iter().position(|row| row.selected);
        let offset = scroll_offset(focus, player.tree.len(), inner_height(area));
        let lines: Vec<Line> = player
            .tree
            .iter()
            .skip(offset)
            .map(|row| {
                let mut spans = vec![
                    Span::raw("  ".repeat(row.level)),
                    Span::styled(row.function_name.clone(), Style::default().fg(theme.accent)),
                    Span::styled(format!(" {}", row.frame_id), Style::default().fg(theme.muted)),
                ];
                if row.closed {
                    let tail = match &row.return_value {
                        Some(value) => format!(" (returned: {value})"),
                        None => " (returned)".to_string(),
                    };
                    spans.push(Span::styled(tail, Style::default().fg(theme.muted)));
                }
                let line = Line::from(spans);
                if row.selected {
                    line.style(theme.highlight_style())
                } else {
                    line
                }
            })
            .collect();

        let paragraph = Paragraph::new(lines).block(panel("Call Tree"));
        f.render_widget(paragraph, area);
    }

    fn item_count(&self, player: &PlayerView) -> usize {
        player.tree.len()
    }
}

/// Frame tabs plus the selected frame's locals
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalsView;

impl LocalsView {
    fn tabs_line(player: &PlayerView, theme: &Theme) -> Line<'static> {
        let mut spans = Vec::new();
        for tab in &player.tabs {
            let mut label = format!("{} {}", tab.function_name, tab.frame_id);
            if tab.closed {
                label.push_str(" ✔");
            }
            let style = if tab.selected {
                theme.highlight_style()
            } else {
                Style::default().fg(theme.muted)
            };
            spans.push(Span::styled(format!("[{label}]"), style));
            spans.push(Span::raw(" "));
        }
        Line::from(spans)
    }
}

impl View for LocalsView {
    fn render(&self, f: &mut Frame, area: Rect, player: &PlayerView, theme: &Theme) {
        let block = panel("Locals");
        let inner = block.inner(area);
        f.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let tabs_area = Rect { height: 1, ..inner };
        let table_area = Rect {
            y: inner.y + 1,
            height: inner.height - 1,
            ..inner
        };
        f.render_widget(
            Paragraph::new(Self::tabs_line(player, theme)).wrap(Wrap { trim: true }),
            tabs_area,
        );

        if player.locals.frame_id.is_none() {
            let hint = Paragraph::new("Select a frame").style(Style::default().fg(theme.muted));
            f.render_widget(hint, table_area);
            return;
        }
        if player.locals.is_empty() {
            let empty = Paragraph::new("(empty)").style(Style::default().fg(theme.muted));
            f.render_widget(empty, table_area);
            return;
        }

        let rows: Vec<Row> = player
            .locals
            .rows
            .iter()
            .map(|local| {
                let value_style = if local.changed {
                    Style::default().fg(theme.changed).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let marker = if local.changed { "*" } else { " " };
                Row::new(vec![
                    Span::styled(local.name.clone(), Style::default().fg(theme.accent)),
                    Span::styled(format!("{marker}{}", local.value), value_style),
                ])
            })
            .collect();

        let table = Table::new(rows, [Constraint::Percentage(30), Constraint::Percentage(70)])
            .header(Row::new(vec!["Name", "Value"]).style(Style::default().fg(theme.muted)));
        f.render_widget(table, table_area);
    }

    fn item_count(&self, player: &PlayerView) -> usize {
        player.locals.rows.len()
    }
}

/// Program output so far
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutView;

impl View for StdoutView {
    fn render(&self, f: &mut Frame, area: Rect, player: &PlayerView, theme: &Theme) {
        let block = panel("Stdout");
        if player.stdout.is_empty() {
            let empty = Paragraph::new("(no output)")
                .style(Style::default().fg(theme.muted))
                .block(block);
            f.render_widget(empty, area);
            return;
        }

        let lines: Vec<&str> = player.stdout.lines().collect();
        let height = inner_height(area);
        let offset = lines.len().saturating_sub(height);
        let text: Vec<Line> = lines[offset..].iter().map(|l| Line::raw(*l)).collect();
        f.render_widget(Paragraph::new(text).block(block), area);
    }

    fn item_count(&self, player: &PlayerView) -> usize {
        player.stdout.lines().count()
    }
}

/// Status bar with the step summary and key hints
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusView;

impl View for StatusView {
    fn render(&self, f: &mut Frame, area: Rect, player: &PlayerView, theme: &Theme) {
        let style = if player.status.exception.is_some() {
            Style::default().fg(theme.error)
        } else {
            Style::default()
        };
        let text = format!(" {} | ? help", player.status.summary());
        let paragraph = Paragraph::new(Line::styled(text, style))
            .block(Block::default().borders(Borders::TOP))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn item_count(&self, _player: &PlayerView) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::FrameSelection;
    use ratatui::{backend::TestBackend, Terminal};
    use serde_json::json;
    use tracescope_log::{Event, EventKind, EventLog, TracePayload};
    use tracescope_replay::ReplayEngine;
    use tracescope_runtime::PlaybackCursor;

    fn player_at(step: usize) -> PlayerView {
        let log = EventLog::from_payload(TracePayload {
            filename: "main.py".to_string(),
            source_code: "x = 1\nprint(x)\n".to_string(),
            events: vec![
                Event::new(1, EventKind::Call, 1u64).with_function("<module>"),
                Event::new(2, EventKind::Line, 1u64)
                    .with_function("<module>")
                    .with_line(1)
                    .with_assignments([("x", json!(1))]),
                Event::new(3, EventKind::Line, 1u64)
                    .with_function("<module>")
                    .with_line(2)
                    .with_stdout("1\n"),
            ],
        });
        let mut engine = ReplayEngine::new(log.clone());
        let diff = engine.step_diff(step as i64);
        let state = engine.state_at(step as i64).clone();
        let mut selection = FrameSelection::new();
        selection.follow(&state);
        let cursor = PlaybackCursor {
            step_index: step,
            ..PlaybackCursor::default()
        };
        PlayerView::build(&log, &state, &cursor, &diff, &selection)
    }

    fn draw(view: &dyn View, player: &PlayerView, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal
            .draw(|f| view.render(f, f.area(), player, &Theme::default()))
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(usize::from(width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(scroll_offset(None, 100, 10), 0);
        assert_eq!(scroll_offset(Some(3), 5, 10), 0);
        assert_eq!(scroll_offset(Some(50), 100, 10), 45);
        assert_eq!(scroll_offset(Some(99), 100, 10), 90);
        assert_eq!(scroll_offset(Some(2), 100, 10), 0);
    }

    #[test]
    fn test_source_view_renders_lines() {
        let player = player_at(1);
        let screen = draw(&SourceView, &player, 30, 5);
        assert!(screen.contains("main.py"));
        assert!(screen.contains("1 x = 1"));
        assert!(screen.contains("2 print(x)"));
        assert_eq!(SourceView.item_count(&player), 3);
    }

    #[test]
    fn test_tree_view_renders_frames() {
        let player = player_at(2);
        let screen = draw(&CallTreeView, &player, 30, 4);
        assert!(screen.contains("<module> #1"));
    }

    #[test]
    fn test_locals_view_marks_changes() {
        let player = player_at(1);
        let screen = draw(&LocalsView, &player, 40, 6);
        assert!(screen.contains("[<module> #1]"));
        assert!(screen.contains("*1"));
        assert_eq!(LocalsView.item_count(&player), 1);
    }

    #[test]
    fn test_stdout_view() {
        assert!(draw(&StdoutView, &player_at(1), 20, 3).contains("(no output)"));
        assert!(draw(&StdoutView, &player_at(2), 20, 3).contains('1'));
    }

    #[test]
    fn test_status_view() {
        let screen = draw(&StatusView, &player_at(2), 80, 2);
        assert!(screen.contains("step 2/2"));
    }

    #[test]
    fn test_themes_differ() {
        assert_ne!(
            Theme::from_scheme(ColorScheme::Light),
            Theme::from_scheme(ColorScheme::HighContrast)
        );
    }
}
