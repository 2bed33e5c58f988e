// Help bar widget: context-sensitive keyboard shortcuts.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use luckydraw_core::draw::DrawStatus;

use crate::tui::ViewState;

/// Render the help bar into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();
    for (key, desc) in shortcuts(state) {
        spans.push(Span::styled(
            format!(" {} ", key),
            Style::default().fg(Color::Black).bg(Color::Gray),
        ));
        spans.push(Span::styled(
            format!(" {} ", desc),
            Style::default().fg(Color::Gray),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Shortcuts that currently do something.
pub fn shortcuts(state: &ViewState) -> Vec<(&'static str, &'static str)> {
    let mut keys = Vec::new();
    if !state.draw.disabled {
        match state.draw.status {
            DrawStatus::Idle => keys.push(("Space", "Start")),
            DrawStatus::Spinning => keys.push(("Space", "Stop")),
            DrawStatus::Loading | DrawStatus::Settling => {}
        }
    }
    keys.push(("r", "Reload winners"));
    keys.push(("j/k", "Scroll"));
    keys.push(("o", "Log out"));
    keys.push(("q", "Quit"));
    keys
}
