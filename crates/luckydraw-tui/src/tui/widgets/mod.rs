// TUI widget modules for each screen zone.

pub mod banner;
pub mod help_bar;
pub mod ledger;
pub mod login;
pub mod quit_confirm;
pub mod spinner;
pub mod status_bar;
