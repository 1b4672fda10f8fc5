//! Export command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::session::{Session, SqliteSessionStore};
use anyhow::{anyhow, Result};

/// Run the export command.
pub fn run_export(
    key: &str,
    session_id: Option<String>,
    output: Option<String>,
    settings: Settings,
) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let db_path = settings.session_db_path(&cwd);
    if !db_path.exists() {
        return Err(anyhow!("No session database at {}", db_path.display()));
    }

    let store = SqliteSessionStore::open(&db_path)?;
    let session = find_session(&store, &settings, session_id.as_deref())?;

    let Some(text) = session.state_text(key) else {
        let mut keys: Vec<&String> = session.state.keys().collect();
        keys.sort();
        let keys: Vec<&str> = keys.into_iter().map(String::as_str).collect();
        return Err(anyhow!(
            "Session {} has no '{}' (available: {})",
            session.id,
            key,
            keys.join(", ")
        ));
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &text)?;
            Output::success(&format!(
                "Exported {} from session {} to {}",
                key, session.id, path
            ));
        }
        None => println!("{}", text),
    }

    Ok(())
}

fn find_session(
    store: &SqliteSessionStore,
    settings: &Settings,
    session_id: Option<&str>,
) -> Result<Session> {
    let app = &settings.session.app_name;
    let user = &settings.session.user_id;

    let session = match session_id {
        Some(id) => store.get_session(app, user, id)?,
        None => store.latest_session(app, user)?,
    };

    session.ok_or_else(|| match session_id {
        Some(id) => anyhow!("Session not found: {}", id),
        None => anyhow!("No sessions for {} / {}", app, user),
    })
}
