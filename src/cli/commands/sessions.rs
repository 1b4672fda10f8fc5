//! Sessions command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::session::SqliteSessionStore;
use anyhow::Result;

/// Run the sessions command.
pub fn run_sessions(settings: Settings) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let db_path = settings.session_db_path(&cwd);

    if !db_path.exists() {
        Output::info(&format!("No session database at {}", db_path.display()));
        Output::info("Use 'copilot run' to start a session.");
        return Ok(());
    }

    let store = SqliteSessionStore::open(&db_path)?;
    let app = &settings.session.app_name;
    let user = &settings.session.user_id;
    let sessions = store.list_sessions(app, user)?;

    if sessions.is_empty() {
        Output::info(&format!("No sessions for {} / {}", app, user));
        return Ok(());
    }

    Output::header(&format!("Sessions ({})", sessions.len()));
    for session in &sessions {
        Output::session_info(
            &session.id,
            &session.created_at.format("%Y-%m-%d %H:%M").to_string(),
            session.event_count,
            &session.state_keys,
        );
    }

    Ok(())
}
