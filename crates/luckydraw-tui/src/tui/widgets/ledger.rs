// Winner ledger panel: prizes already assigned on the server.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::{LedgerView, ViewState};

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Winners ");

    let lines: Vec<Line> = match &state.ledger {
        LedgerView::NotLoaded => Vec::new(),
        LedgerView::Loading => vec![Line::from(Span::styled(
            "Loading winners...",
            Style::default().fg(Color::Yellow),
        ))],
        LedgerView::Error(message) => vec![Line::from(Span::styled(
            format!("{} (press r to retry)", message),
            Style::default().fg(Color::Red),
        ))],
        LedgerView::Loaded(records) if records.is_empty() => vec![Line::from(Span::styled(
            "No winners yet",
            Style::default().fg(Color::DarkGray),
        ))],
        LedgerView::Loaded(records) => records
            .iter()
            .map(|record| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<16} ", record.prize_name),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("{:>10} ", record.winner_number),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(record.winner_name.clone()),
                ])
            })
            .collect(),
    };

    // Keep the scroll offset within the list.
    let max_scroll = lines.len().saturating_sub(1);
    let scroll = state.ledger_scroll.min(max_scroll) as u16;

    let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}
