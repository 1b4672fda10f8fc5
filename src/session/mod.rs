//! Persistent sessions: state plus an append-only event log in SQLite.
//!
//! [`SqliteSessionStore`] writes sessions during pipeline runs and
//! [`SessionDumpReader`] flattens them back into text.

mod dump;
mod store;

pub use dump::{
    extract_event_text, resolve_database_path, DumpOptions, DumpScope, SessionDump,
    SessionDumpReader, DEFAULT_MAX_CHARS,
};
pub use store::SqliteSessionStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key-value state attached to a session.
pub type State = Map<String, Value>;

/// A persistent (app, user) conversation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub state: State,
    pub events: Vec<Event>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// State value rendered as text (strings verbatim, other values as JSON).
    pub fn state_text(&self, key: &str) -> Option<String> {
        self.state.get(key).map(value_text)
    }
}

/// Session listing row without events.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub app_name: String,
    pub user_id: String,
    pub state_keys: Vec<String>,
    pub event_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable record of an agent exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub session_id: String,
    pub invocation_id: String,
    /// Agent (or `user`) that produced the content.
    pub author: String,
    pub content: EventContent,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
}

impl Event {
    /// Create a single-text-part event stamped with the current time.
    pub fn text(session_id: &str, invocation_id: &str, author: &str, role: &str, text: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            invocation_id: invocation_id.to_string(),
            author: author.to_string(),
            content: EventContent {
                role: Some(role.to_string()),
                parts: vec![ContentPart {
                    text: Some(text.to_string()),
                }],
            },
            timestamp: now.timestamp_micros() as f64 / 1_000_000.0,
        }
    }

    /// Plain text of all text parts.
    pub fn plain_text(&self) -> String {
        self.content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Serialized payload of an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Render a JSON value the way prompts expect it.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
