// Spinner panel: the rolling number, the start/stop label, and the result
// of the last draw.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use luckydraw_core::draw::{DrawStatus, OutcomeSource};

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Draw ");

    let number_style = match state.draw.status {
        DrawStatus::Spinning => Style::default().fg(Color::Cyan),
        _ => Style::default().fg(Color::White),
    }
    .add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::raw(""),
        Line::from(Span::styled(
            format_number(state.draw.displayed, state.display_digits),
            number_style,
        )),
        Line::raw(""),
        button_line(state),
    ];

    if let Some(winner) = &state.winner {
        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::styled(
                winner.outcome.prize.clone(),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" goes to "),
            Span::styled(
                winner.outcome.winner_name.clone(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
        if let OutcomeSource::Fallback { reason } = &winner.source {
            lines.push(Line::from(Span::styled(
                format!("[unconfirmed] {}", reason),
                Style::default().fg(Color::Red),
            )));
        }
    }

    if let Some(message) = &state.draw_error {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);
    frame.render_widget(paragraph, area);
}

/// Zero-padded to `digits`; dashes before the first draw.
pub fn format_number(number: Option<u64>, digits: usize) -> String {
    match number {
        Some(n) => format!("{:0width$}", n, width = digits),
        None => "-".repeat(digits.max(1)),
    }
}

/// Text on the draw button for the current state.
pub fn button_label(status: DrawStatus, disabled: bool) -> &'static str {
    if disabled {
        return "Disabled";
    }
    match status {
        DrawStatus::Idle => "Start",
        DrawStatus::Spinning => "Stop",
        DrawStatus::Loading => "Loading...",
        DrawStatus::Settling => "Saving...",
    }
}

fn button_line(state: &ViewState) -> Line<'static> {
    let label = button_label(state.draw.status, state.draw.disabled);
    let style = if state.draw.disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        match state.draw.status {
            DrawStatus::Idle => Style::default().fg(Color::Black).bg(Color::Green),
            DrawStatus::Spinning => Style::default().fg(Color::Black).bg(Color::Red),
            DrawStatus::Loading | DrawStatus::Settling => Style::default().fg(Color::Yellow),
        }
    };
    Line::from(Span::styled(
        format!("[ {} ]", label),
        style.add_modifier(Modifier::BOLD),
    ))
}
