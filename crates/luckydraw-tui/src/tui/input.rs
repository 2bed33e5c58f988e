// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app
// orchestrator, or into local ViewState edits (login form, scrolling).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use luckydraw_core::protocol::UserCommand;

use super::ViewState;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// orchestrator, `None` when it was handled locally.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Some terminals emit Press and Release for each keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    if !view_state.session.is_logged {
        return handle_login(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Char(' ') | KeyCode::Enter => {
            if view_state.draw.disabled {
                None
            } else {
                Some(UserCommand::ToggleDraw)
            }
        }
        KeyCode::Char('r') | KeyCode::Char('R') => Some(UserCommand::RetryLedger),
        KeyCode::Char('o') | KeyCode::Char('O') => Some(UserCommand::Logout),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
            view_state.confirm_quit = true;
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            view_state.ledger_scroll = view_state.ledger_scroll.saturating_sub(1);
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_state.ledger_scroll =
                (view_state.ledger_scroll + 1).min(view_state.max_ledger_scroll());
            None
        }
        _ => None,
    }
}

/// - `y` or `q` confirms quit
/// - `n` or `Esc` cancels
/// - All other keys are blocked
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

/// Keys on the sign-in screen. Printable characters go to the focused field.
fn handle_login(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let form = &mut view_state.login;
    match key_event.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            form.toggle_focus();
            None
        }
        KeyCode::Enter => {
            if form.pending || form.email.trim().is_empty() || form.password.is_empty() {
                return None;
            }
            Some(UserCommand::SignIn {
                email: form.email.trim().to_string(),
                password: form.password.clone(),
            })
        }
        KeyCode::Esc => Some(UserCommand::Quit),
        KeyCode::Backspace => {
            form.focused_mut().pop();
            None
        }
        KeyCode::Char(c) => {
            form.focused_mut().push(c);
            None
        }
        _ => None,
    }
}
