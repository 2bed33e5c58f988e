// Sign-in screen shown while no operator is logged in.

use ratatui::layout::{Alignment, Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::tui::{LoginField, ViewState};

const FORM_WIDTH: u16 = 48;
const FORM_HEIGHT: u16 = 11;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let [form_area] = Layout::vertical([Constraint::Length(FORM_HEIGHT.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [form_area] = Layout::horizontal([Constraint::Length(FORM_WIDTH.min(area.width))])
        .flex(Flex::Center)
        .areas(form_area);

    let form = &state.login;
    let mut lines = vec![
        Line::from(Span::styled(
            state.event_name.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::raw(""),
        field_line("Email", &form.email, form.focus == LoginField::Email),
        field_line(
            "Password",
            &"*".repeat(form.password.chars().count()),
            form.focus == LoginField::Password,
        ),
        Line::raw(""),
    ];

    if form.pending {
        lines.push(Line::from(Span::styled(
            "Signing in...",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::raw(""));
    }

    lines.push(Line::raw(""));
    lines.push(Line::from(Span::styled(
        "Tab switch field  Enter sign in  Esc quit",
        Style::default().fg(Color::DarkGray),
    )));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Sign In "),
        );
    frame.render_widget(paragraph, form_area);
}

fn field_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let value_style = if focused {
        Style::default().fg(Color::Black).bg(Color::White)
    } else {
        Style::default().fg(Color::White)
    };
    let cursor = if focused { "_" } else { " " };
    Line::from(vec![
        Span::styled(format!("{:>9}: ", label), Style::default().fg(Color::Gray)),
        Span::styled(format!("{:<24}", format!("{}{}", value, cursor)), value_style),
    ])
}
