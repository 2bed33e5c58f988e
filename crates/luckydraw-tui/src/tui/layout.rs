// Screen layout for the logged-in dashboard.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Event Banner (3 rows)                             |
// +-------------------------+------------------------+
// | Spinner (60%)            | Winners (40%)          |
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: session state and pool summary.
    pub status_bar: Rect,
    /// Event name and subtitle.
    pub banner: Rect,
    /// Left of the middle section: the number display and winner banner.
    pub spinner: Rect,
    /// Right of the middle section: winners recorded on the server.
    pub ledger: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    // Vertical: status(1) | banner(3) | middle(fill) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(3), // banner
            Constraint::Min(8),    // spinner + ledger
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(vertical[2]);

    AppLayout {
        status_bar: vertical[0],
        banner: vertical[1],
        spinner: horizontal[0],
        ledger: horizontal[1],
        help_bar: vertical[3],
    }
}
