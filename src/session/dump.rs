//! Flattens a stored session into one bounded text block.
//!
//! The reader opens its own connection per call so it can be used against a
//! database that another process (or the session store) is writing. It never
//! creates the file.

use crate::error::{CopilotError, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// Default character budget for a dump.
pub const DEFAULT_MAX_CHARS: usize = 400_000;

const STATE_HEADER: &str = "=== SESSION STATE (JSON) ===";
const EVENTS_HEADER: &str = "=== EVENTS (TEXT) ===";

/// What to include in a dump.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    pub include_state: bool,
    pub include_events: bool,
    pub max_chars: usize,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            include_state: true,
            include_events: true,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// Which events ended up in the dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpScope {
    /// Events of one session.
    Session,
    /// No session id was given: every event in the store, across sessions.
    Store,
}

/// Result of a dump.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDump {
    pub dump: String,
    pub truncated: bool,
    /// Length of `dump` in characters.
    pub chars: usize,
    pub scope: DumpScope,
}

/// Resolve the SQLite file backing the session store.
///
/// A `sqlite:///<path>` URL wins. Otherwise the first existing
/// `<dir>/<filename>` among `search_dirs` is used, falling back to
/// `<cwd>/<filename>`.
pub fn resolve_database_path(
    url: Option<&str>,
    filename: &str,
    search_dirs: &[PathBuf],
    cwd: &Path,
) -> PathBuf {
    if let Some(path) = url.and_then(|u| u.strip_prefix("sqlite:///")) {
        return cwd.join(path);
    }

    search_dirs
        .iter()
        .map(|dir| dir.join(filename))
        .find(|p| p.exists())
        .unwrap_or_else(|| cwd.join(filename))
}

/// Plain text of a serialized event payload.
///
/// Text parts are trimmed, blank ones dropped, and the rest joined with a
/// single space. Anything that fails to parse yields an empty string.
pub fn extract_event_text(content: Option<&str>) -> String {
    let raw = match content {
        Some(c) if !c.is_empty() => c,
        _ => return String::new(),
    };

    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) else {
        return String::new();
    };

    let Some(Value::Array(parts)) = obj.get("parts") else {
        return String::new();
    };

    parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads sessions straight from the database file.
pub struct SessionDumpReader {
    path: PathBuf,
}

impl SessionDumpReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        if !self.path.exists() {
            return Err(CopilotError::Session(format!(
                "Session database not found at {}",
                self.path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    /// Dump state and events for a session.
    ///
    /// State lookup goes (id, app) -> id -> most recently created session.
    /// Without a session id, events from the whole store are returned.
    #[instrument(skip(self, options), fields(path = %self.path.display()))]
    pub fn dump(
        &self,
        session_id: Option<&str>,
        app_name: Option<&str>,
        options: &DumpOptions,
    ) -> Result<SessionDump> {
        // Dropped on every return path, closing the handle.
        let conn = self.open()?;
        let session_id = session_id.filter(|s| !s.is_empty());
        let app_name = app_name.filter(|s| !s.is_empty());

        let mut sections = Vec::new();

        if options.include_state {
            let state = Self::read_state(&conn, session_id, app_name)?;
            sections.push(format!("{}\n{}", STATE_HEADER, state));
        }

        let scope = if session_id.is_some() {
            DumpScope::Session
        } else {
            DumpScope::Store
        };

        if options.include_events {
            if scope == DumpScope::Store {
                warn!("No session id given, dumping events from every session in the store");
            }
            let lines = Self::read_event_lines(&conn, session_id)?;
            debug!("Read {} events", lines.len());
            sections.push(format!("{}\n{}", EVENTS_HEADER, lines.join("\n")));
        }

        let combined = sections.join("\n\n");
        let combined = combined.trim();
        let (dump, truncated) = truncate_chars(combined, options.max_chars);
        let chars = dump.chars().count();

        Ok(SessionDump {
            dump,
            truncated,
            chars,
            scope,
        })
    }

    fn read_state(
        conn: &Connection,
        session_id: Option<&str>,
        app_name: Option<&str>,
    ) -> Result<String> {
        let row: Option<Option<String>> = match (session_id, app_name) {
            (Some(id), Some(app)) => conn
                .query_row(
                    "SELECT state FROM sessions WHERE id = ?1 AND app_name = ?2 LIMIT 1",
                    params![id, app],
                    |row| row.get(0),
                )
                .optional()?,
            (Some(id), None) => conn
                .query_row(
                    "SELECT state FROM sessions WHERE id = ?1 LIMIT 1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?,
            (None, _) => conn
                .query_row(
                    "SELECT state FROM sessions ORDER BY created_at DESC, rowid DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?,
        };

        Ok(row
            .flatten()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "{}".to_string()))
    }

    fn read_event_lines(conn: &Connection, session_id: Option<&str>) -> Result<Vec<String>> {
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, Option<String>)> {
            let author: Option<String> = row.get(0)?;
            Ok((author.unwrap_or_default(), row.get(1)?))
        };

        let rows: Vec<(String, Option<String>)> = match session_id {
            Some(id) => {
                let mut stmt = conn.prepare(
                    "SELECT author, content FROM events WHERE session_id = ?1 ORDER BY timestamp ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![id], map_row)?;
                let collected = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                collected
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT author, content FROM events ORDER BY timestamp ASC, rowid ASC")?;
                let rows = stmt.query_map([], map_row)?;
                let collected = rows.collect::<rusqlite::Result<Vec<_>>>()?;
                collected
            }
        };

        Ok(rows
            .into_iter()
            .map(|(author, content)| {
                format!("[{}] {}", author, extract_event_text(content.as_deref()))
            })
            .collect())
    }
}

/// Keep at most `max_chars` characters. Returns whether anything was cut.
fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Event, SqliteSessionStore};
    use serde_json::json;

    fn raw_event(conn: &Connection, session_id: &str, author: &str, content: &str, ts: f64) {
        conn.execute(
            "INSERT INTO events (id, session_id, app_name, user_id, invocation_id, author, content, timestamp)
             VALUES (?1, ?2, 'app', 'u1', 'inv', ?3, ?4, ?5)",
            params![uuid::Uuid::new_v4().to_string(), session_id, author, content, ts],
        )
        .unwrap();
    }

    fn fixture() -> (tempfile::TempDir, PathBuf, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my_agent_data.db");
        let store = SqliteSessionStore::open(&path).unwrap();
        let mut state = serde_json::Map::new();
        state.insert("user_name".to_string(), json!("Ada"));
        let session = store.create_session("app", "u1", state).unwrap();
        (dir, path, session.id)
    }

    #[test]
    fn test_empty_events_section() {
        let (_dir, path, id) = fixture();
        let reader = SessionDumpReader::new(&path);

        let dump = reader.dump(Some(&id), Some("app"), &DumpOptions::default()).unwrap();

        assert!(!dump.truncated);
        assert_eq!(dump.scope, DumpScope::Session);
        assert!(dump.dump.starts_with("=== SESSION STATE (JSON) ===\n{"));
        assert!(dump.dump.contains("\"user_name\":\"Ada\""));
        assert!(dump.dump.ends_with("=== EVENTS (TEXT) ==="));
        assert_eq!(dump.chars, dump.dump.chars().count());
    }

    #[test]
    fn test_event_lines_in_timestamp_order() {
        let (_dir, path, id) = fixture();
        {
            let conn = Connection::open(&path).unwrap();
            raw_event(&conn, &id, "Y", r#"{"parts":[{"text":"second"}]}"#, 20.0);
            raw_event(&conn, &id, "X", r#"{"parts":[{"text":"a"},{"text":"b"}]}"#, 10.0);
            raw_event(&conn, &id, "Z", "not json", 30.0);
            raw_event(&conn, &id, "W", r#"{"parts":[{"inline":1},{"text":"  padded  "}]}"#, 40.0);
        }

        let reader = SessionDumpReader::new(&path);
        let dump = reader.dump(Some(&id), None, &DumpOptions::default()).unwrap();

        let events = dump.dump.split("=== EVENTS (TEXT) ===\n").nth(1).unwrap();
        let lines: Vec<&str> = events.lines().collect();
        assert_eq!(lines, vec!["[X] a b", "[Y] second", "[Z] ", "[W] padded"]);
    }

    #[test]
    fn test_truncation() {
        let (_dir, path, id) = fixture();
        let reader = SessionDumpReader::new(&path);

        let full = reader.dump(Some(&id), None, &DumpOptions::default()).unwrap();
        let options = DumpOptions {
            max_chars: 10,
            ..Default::default()
        };
        let cut = reader.dump(Some(&id), None, &options).unwrap();

        assert!(full.chars > 10);
        assert!(cut.truncated);
        assert_eq!(cut.chars, 10);
        assert_eq!(cut.dump, full.dump.chars().take(10).collect::<String>());
    }

    #[test]
    fn test_exact_budget_is_not_truncated() {
        let (_dir, path, id) = fixture();
        let reader = SessionDumpReader::new(&path);

        let full = reader.dump(Some(&id), None, &DumpOptions::default()).unwrap();
        let options = DumpOptions {
            max_chars: full.chars,
            ..Default::default()
        };
        let same = reader.dump(Some(&id), None, &options).unwrap();

        assert!(!same.truncated);
        assert_eq!(same.dump, full.dump);
    }

    #[test]
    fn test_unknown_session_renders_empty_state() {
        let (_dir, path, _id) = fixture();
        let reader = SessionDumpReader::new(&path);

        let dump = reader
            .dump(Some("missing"), Some("app"), &DumpOptions::default())
            .unwrap();

        assert_eq!(dump.dump, "=== SESSION STATE (JSON) ===\n{}\n\n=== EVENTS (TEXT) ===");
    }

    #[test]
    fn test_without_session_falls_back_to_latest_and_whole_store() {
        let (_dir, path, first) = fixture();
        let store = SqliteSessionStore::open(&path).unwrap();
        let mut state = serde_json::Map::new();
        state.insert("marker".to_string(), json!("newest"));
        let second = store.create_session("app", "u1", state).unwrap();
        store
            .append_event(&Event::text(&first, "i1", "A", "model", "from first"))
            .unwrap();
        store
            .append_event(&Event::text(&second.id, "i2", "B", "model", "from second"))
            .unwrap();

        let reader = SessionDumpReader::new(&path);
        let dump = reader.dump(None, None, &DumpOptions::default()).unwrap();

        assert_eq!(dump.scope, DumpScope::Store);
        assert!(dump.dump.contains("newest"));
        assert!(dump.dump.contains("[A] from first"));
        assert!(dump.dump.contains("[B] from second"));
    }

    #[test]
    fn test_section_toggles() {
        let (_dir, path, id) = fixture();
        let reader = SessionDumpReader::new(&path);

        let options = DumpOptions {
            include_state: false,
            ..Default::default()
        };
        let dump = reader.dump(Some(&id), None, &options).unwrap();
        assert_eq!(dump.dump, "=== EVENTS (TEXT) ===");
    }

    #[test]
    fn test_missing_database_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let reader = SessionDumpReader::new(dir.path().join("absent.db"));
        assert!(matches!(
            reader.dump(None, None, &DumpOptions::default()),
            Err(CopilotError::Session(_))
        ));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[test]
    fn test_extract_event_text() {
        assert_eq!(
            extract_event_text(Some(r#"{"parts":[{"text":"a"},{"text":"b"}]}"#)),
            "a b"
        );
        assert_eq!(extract_event_text(Some("not json")), "");
        assert_eq!(extract_event_text(Some(r#"["parts"]"#)), "");
        assert_eq!(extract_event_text(Some(r#"{"parts":"text"}"#)), "");
        assert_eq!(extract_event_text(Some(r#"{"parts":[{"text":5}]}"#)), "");
        assert_eq!(extract_event_text(None), "");
    }

    #[test]
    fn test_resolve_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().join("work");
        let data = dir.path().join("data");
        std::fs::create_dir_all(&cwd).unwrap();
        std::fs::create_dir_all(&data).unwrap();

        assert_eq!(
            resolve_database_path(Some("sqlite:////var/db/x.db"), "f.db", &[], &cwd),
            PathBuf::from("/var/db/x.db")
        );
        assert_eq!(
            resolve_database_path(Some("sqlite:///./x.db"), "f.db", &[], &cwd),
            cwd.join("./x.db")
        );

        let search = vec![cwd.clone(), data.clone()];
        assert_eq!(
            resolve_database_path(None, "f.db", &search, &cwd),
            cwd.join("f.db")
        );

        std::fs::write(data.join("f.db"), b"").unwrap();
        assert_eq!(
            resolve_database_path(Some("postgres://x"), "f.db", &search, &cwd),
            data.join("f.db")
        );
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let (cut, truncated) = truncate_chars("→→→", 2);
        assert_eq!(cut, "→→");
        assert!(truncated);
        assert_eq!(truncate_chars("ab", 5), ("ab".to_string(), false));
    }
}
