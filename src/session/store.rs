//! SQLite-backed session service.
//!
//! Sessions and events are only ever inserted or merged into; nothing is
//! deleted.

use super::{dump::extract_event_text, ContentPart, Event, EventContent, Session, SessionSummary, State};
use crate::error::{CopilotError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT NOT NULL,
    app_name TEXT NOT NULL,
    user_id TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (app_name, user_id, id)
);

CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at);

CREATE TABLE IF NOT EXISTS events (
    id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    app_name TEXT NOT NULL,
    user_id TEXT NOT NULL,
    invocation_id TEXT NOT NULL,
    author TEXT NOT NULL,
    content TEXT,
    timestamp REAL NOT NULL,
    PRIMARY KEY (id, app_name, user_id, session_id)
);

CREATE INDEX IF NOT EXISTS idx_events_session ON events(session_id, timestamp);
"#;

/// Session store on a single SQLite connection.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

fn now_text() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Lenient read for listings: an unparseable row shows no keys.
fn parse_state(text: &str) -> State {
    serde_json::from_str(text).unwrap_or_default()
}

/// Strict read for anything that returns or rewrites state.
fn parse_state_strict(id: &str, text: &str) -> Result<State> {
    if text.trim().is_empty() {
        return Ok(State::new());
    }
    serde_json::from_str(text)
        .map_err(|e| CopilotError::Session(format!("corrupt state for session {}: {}", id, e)))
}

impl SqliteSessionStore {
    /// Open (or create) a session database file.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened session store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CopilotError::Session(format!("Failed to acquire lock: {}", e)))
    }

    /// Create a new session seeded with `state`.
    #[instrument(skip(self, state))]
    pub fn create_session(&self, app_name: &str, user_id: &str, state: State) -> Result<Session> {
        let conn = self.lock()?;
        let id = Uuid::new_v4().to_string();
        let now = now_text();

        conn.execute(
            "INSERT INTO sessions (id, app_name, user_id, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, app_name, user_id, serde_json::to_string(&state)?, now],
        )?;

        info!("Created session {}", id);

        Ok(Session {
            id,
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            state,
            events: Vec::new(),
            created_at: parse_time(&now),
            updated_at: parse_time(&now),
        })
    }

    /// Most recently created session for (app, user), with its events.
    pub fn latest_session(&self, app_name: &str, user_id: &str) -> Result<Option<Session>> {
        let id: Option<String> = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT id FROM sessions WHERE app_name = ?1 AND user_id = ?2
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![app_name, user_id],
                |row| row.get(0),
            )
            .optional()?
        };

        match id {
            Some(id) => self.get_session(app_name, user_id, &id),
            None => Ok(None),
        }
    }

    /// Load a session with all of its events in timestamp order.
    #[instrument(skip(self))]
    pub fn get_session(&self, app_name: &str, user_id: &str, id: &str) -> Result<Option<Session>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT state, created_at, updated_at FROM sessions
                 WHERE app_name = ?1 AND user_id = ?2 AND id = ?3",
                params![app_name, user_id, id],
                |row| {
                    let state: String = row.get(0)?;
                    let created_at: String = row.get(1)?;
                    let updated_at: String = row.get(2)?;
                    Ok((state, created_at, updated_at))
                },
            )
            .optional()?;

        let Some((state, created_at, updated_at)) = row else {
            return Ok(None);
        };
        let state = parse_state_strict(id, &state)?;

        let mut stmt = conn.prepare(
            "SELECT id, invocation_id, author, content, timestamp FROM events
             WHERE session_id = ?1 ORDER BY timestamp ASC, rowid ASC",
        )?;
        let events = stmt
            .query_map(params![id], |row| {
                let content: Option<String> = row.get(3)?;
                Ok(Event {
                    id: row.get(0)?,
                    session_id: id.to_string(),
                    invocation_id: row.get(1)?,
                    author: row.get(2)?,
                    content: decode_content(content.as_deref()),
                    timestamp: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Loaded session {} with {} events", id, events.len());

        Ok(Some(Session {
            id: id.to_string(),
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            state,
            events,
            created_at: parse_time(&created_at),
            updated_at: parse_time(&updated_at),
        }))
    }

    /// List sessions for (app, user), most recently created first.
    pub fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<SessionSummary>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT s.id, s.state, s.created_at, s.updated_at,
                    (SELECT COUNT(*) FROM events e WHERE e.session_id = s.id)
             FROM sessions s
             WHERE s.app_name = ?1 AND s.user_id = ?2
             ORDER BY s.created_at DESC, s.rowid DESC",
        )?;

        let rows = stmt.query_map(params![app_name, user_id], |row| {
            let state: String = row.get(1)?;
            let created_at: String = row.get(2)?;
            let updated_at: String = row.get(3)?;
            let event_count: i64 = row.get(4)?;
            Ok(SessionSummary {
                id: row.get(0)?,
                app_name: app_name.to_string(),
                user_id: user_id.to_string(),
                state_keys: parse_state(&state).keys().cloned().collect(),
                event_count: event_count as usize,
                created_at: parse_time(&created_at),
                updated_at: parse_time(&updated_at),
            })
        })?;

        let sessions = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// Append an immutable event to its session.
    pub fn append_event(&self, event: &Event) -> Result<()> {
        let conn = self.lock()?;

        let owner: Option<(String, String)> = conn
            .query_row(
                "SELECT app_name, user_id FROM sessions WHERE id = ?1 LIMIT 1",
                params![event.session_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (app_name, user_id) =
            owner.ok_or_else(|| CopilotError::SessionNotFound(event.session_id.clone()))?;

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO events (id, session_id, app_name, user_id, invocation_id, author, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                event.id,
                event.session_id,
                app_name,
                user_id,
                event.invocation_id,
                event.author,
                serde_json::to_string(&event.content)?,
                event.timestamp,
            ],
        )?;
        tx.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            params![now_text(), event.session_id],
        )?;
        tx.commit()?;

        debug!("Appended event {} by {}", event.id, event.author);
        Ok(())
    }

    /// Merge `delta` into the session state. Existing keys are overwritten,
    /// absent ones kept.
    #[instrument(skip(self, delta))]
    pub fn update_state(&self, app_name: &str, user_id: &str, id: &str, delta: &State) -> Result<State> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let current: Option<String> = tx
            .query_row(
                "SELECT state FROM sessions WHERE app_name = ?1 AND user_id = ?2 AND id = ?3",
                params![app_name, user_id, id],
                |row| row.get(0),
            )
            .optional()?;
        let current = current.ok_or_else(|| CopilotError::SessionNotFound(id.to_string()))?;
        let mut state = parse_state_strict(id, &current)?;

        for (key, value) in delta {
            state.insert(key.clone(), value.clone());
        }

        tx.execute(
            "UPDATE sessions SET state = ?1, updated_at = ?2
             WHERE app_name = ?3 AND user_id = ?4 AND id = ?5",
            params![serde_json::to_string(&state)?, now_text(), app_name, user_id, id],
        )?;
        tx.commit()?;

        debug!("Updated state keys: {:?}", delta.keys().collect::<Vec<_>>());
        Ok(state)
    }
}

/// Decode stored event content, keeping only the text when the payload does
/// not match the expected shape.
fn decode_content(raw: Option<&str>) -> EventContent {
    raw.and_then(|r| serde_json::from_str::<EventContent>(r).ok())
        .unwrap_or_else(|| {
            let text = extract_event_text(raw);
            EventContent {
                role: None,
                parts: if text.is_empty() {
                    Vec::new()
                } else {
                    vec![ContentPart { text: Some(text) }]
                },
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed(user_name: &str) -> State {
        let mut state = State::new();
        state.insert("user_name".to_string(), json!(user_name));
        state
    }

    #[test]
    fn test_create_and_get_session() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let session = store.create_session("app", "u1", seed("Ada")).unwrap();

        let loaded = store.get_session("app", "u1", &session.id).unwrap().unwrap();
        assert_eq!(loaded.state_text("user_name").as_deref(), Some("Ada"));
        assert!(loaded.events.is_empty());

        assert!(store.get_session("app", "other", &session.id).unwrap().is_none());
    }

    #[test]
    fn test_latest_session_is_most_recent() {
        let store = SqliteSessionStore::in_memory().unwrap();
        assert!(store.latest_session("app", "u1").unwrap().is_none());

        let _old = store.create_session("app", "u1", seed("old")).unwrap();
        let new = store.create_session("app", "u1", seed("new")).unwrap();
        let _other_user = store.create_session("app", "u2", seed("other")).unwrap();

        let latest = store.latest_session("app", "u1").unwrap().unwrap();
        assert_eq!(latest.id, new.id);

        let listed = store.list_sessions("app", "u1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, new.id);
    }

    #[test]
    fn test_events_and_state_accumulate() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let session = store.create_session("app", "u1", seed("Ada")).unwrap();

        let first = Event::text(&session.id, "inv", "user", "user", "Generate the course");
        let mut second = Event::text(&session.id, "inv", "Planner", "model", "  the plan  ");
        second.timestamp = first.timestamp + 1.0;
        store.append_event(&second).unwrap();
        store.append_event(&first).unwrap();

        let mut delta = State::new();
        delta.insert("course_plan".to_string(), json!("the plan"));
        let merged = store.update_state("app", "u1", &session.id, &delta).unwrap();
        assert!(merged.contains_key("user_name"));

        let loaded = store.get_session("app", "u1", &session.id).unwrap().unwrap();
        assert_eq!(loaded.events.len(), 2);
        assert_eq!(loaded.events[0].author, "user");
        assert_eq!(loaded.events[1].plain_text(), "the plan");
        assert_eq!(loaded.state_text("course_plan").as_deref(), Some("the plan"));
        assert_eq!(loaded.state_text("user_name").as_deref(), Some("Ada"));

        let listed = store.list_sessions("app", "u1").unwrap();
        assert_eq!(listed[0].event_count, 2);
        assert!(listed[0].state_keys.contains(&"course_plan".to_string()));
    }

    #[test]
    fn test_corrupt_state_is_not_overwritten() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let session = store.create_session("app", "u1", seed("Ada")).unwrap();
        let corrupt = r#"{"course_plan": "week 1", "bad": }"#;
        store
            .lock()
            .unwrap()
            .execute(
                "UPDATE sessions SET state = ?1 WHERE id = ?2",
                params![corrupt, session.id],
            )
            .unwrap();

        let mut delta = State::new();
        delta.insert("quiz".to_string(), json!("q"));
        let err = store.update_state("app", "u1", &session.id, &delta).unwrap_err();
        assert!(matches!(err, CopilotError::Session(_)));
        assert!(err.to_string().contains("corrupt state"));

        assert!(matches!(
            store.get_session("app", "u1", &session.id),
            Err(CopilotError::Session(_))
        ));

        let stored: String = store
            .lock()
            .unwrap()
            .query_row(
                "SELECT state FROM sessions WHERE id = ?1",
                params![session.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, corrupt);

        // Listings stay readable.
        let listed = store.list_sessions("app", "u1").unwrap();
        assert!(listed[0].state_keys.is_empty());
    }

    #[test]
    fn test_append_to_unknown_session_fails() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let event = Event::text("nope", "inv", "user", "user", "hi");
        assert!(matches!(
            store.append_event(&event),
            Err(CopilotError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_decode_content_fallback() {
        let content = decode_content(Some(r#"{"parts":[{"text":"a"}],"role":"model"}"#));
        assert_eq!(content.role.as_deref(), Some("model"));

        let odd = decode_content(Some(r#"{"parts":[{"text":"a"},{"text":3}]}"#));
        assert_eq!(odd.parts.len(), 1);
        assert_eq!(odd.parts[0].text.as_deref(), Some("a"));

        assert!(decode_content(Some("garbage")).parts.is_empty());
        assert!(decode_content(None).parts.is_empty());
    }
}
