// Lucky draw console entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Open database and restore any saved session
// 4. Build the HTTP transport, session manager, and API client
// 5. Create mpsc channels
// 6. Spawn app logic task
// 7. Run the TUI until the operator quits
// 8. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use luckydraw_core::api::LuckyDrawApi;
use luckydraw_core::app;
use luckydraw_core::config;
use luckydraw_core::db::Database;
use luckydraw_core::session::{HttpTransport, SessionManager, SessionStore};
use luckydraw_tui::tui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Lucky draw console starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: event={:?}, server={}",
        config.event.name,
        config.server.api_root()
    );

    // 3. Open database; a stored access token keeps the operator signed in
    let db = Arc::new(Database::open(&config.db_path).context("failed to open database")?);
    info!("Database opened at {}", config.db_path);

    let store = Arc::new(SessionStore::load(db.clone()).context("failed to restore session")?);
    info!("Session restored: logged_in={}", store.state().is_logged);

    // 4. API stack
    let transport =
        Arc::new(HttpTransport::from_config(&config.server).context("failed to build HTTP client")?);
    let session = Arc::new(SessionManager::new(transport, store.clone()));
    let api = Arc::new(LuckyDrawApi::new(session));

    // 5. Channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (task_tx, task_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let view_state = tui::ViewState::new(&config);
    let app_state = app::AppState::new(&config, store, api, Some(db), task_tx);

    // 6. Spawn app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, task_rx, ui_tx, app_state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Blocks until the operator quits
    if let Err(e) = tui::run(ui_rx, cmd_tx, view_state).await {
        error!("TUI error: {}", e);
    }

    // 8. Wait for the app task to drain (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Lucky draw console shut down cleanly");
    Ok(())
}

/// Log to a file; the terminal belongs to the TUI.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("luckydraw.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("luckydraw_core=info,luckydraw_tui=info,luckydraw=info,warn")
        }))
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
