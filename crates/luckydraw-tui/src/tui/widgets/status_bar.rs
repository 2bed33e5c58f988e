// Status bar widget: session indicator, draw state, pool summary.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use luckydraw_core::draw::DrawStatus;

use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [session indicator] [draw status] [pool size] [prizes left]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = Vec::new();

    let (dot, dot_color) = session_indicator(state.session.is_logged);
    spans.push(Span::styled(format!(" {} ", dot), Style::default().fg(dot_color)));

    let (label, color) = status_label(state.draw.status, state.draw.disabled);
    spans.push(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ));

    if state.draw.pool_size > 0 {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(
            format!("{} entrants", state.draw.pool_size),
            Style::default().fg(Color::White),
        ));
    }

    if let Some(remaining) = state.draw.remaining_prizes {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(
            format!("{} prizes left", remaining),
            Style::default().fg(Color::White),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

pub fn session_indicator(is_logged: bool) -> (&'static str, Color) {
    if is_logged {
        ("●", Color::Green)
    } else {
        ("●", Color::Red)
    }
}

pub fn status_label(status: DrawStatus, disabled: bool) -> (&'static str, Color) {
    if disabled {
        return ("NO PRIZES LEFT", Color::Red);
    }
    match status {
        DrawStatus::Idle => ("READY", Color::Green),
        DrawStatus::Loading => ("LOADING", Color::Yellow),
        DrawStatus::Spinning => ("SPINNING", Color::Cyan),
        DrawStatus::Settling => ("SAVING", Color::Yellow),
    }
}
