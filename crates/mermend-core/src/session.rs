use std::collections::HashMap;

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// History entries kept per feature.
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub id: Uuid,
    pub feature: String,
    pub title: String,
    pub content: String,
    /// Local time, `YYYY-MM-DD HH:MM`.
    pub timestamp: String,
}

impl SessionEntry {
    fn new(feature: &str, title: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            feature: feature.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Per-user, in-memory history and favorites.
///
/// Owned by the caller and passed to whatever needs it; nothing in this
/// crate keeps session state of its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    history: HashMap<String, Vec<SessionEntry>>,
    favorites: Vec<SessionEntry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result, newest first, dropping the oldest past the limit.
    pub fn add_to_history(&mut self, feature: &str, title: &str, content: &str) -> &SessionEntry {
        let entries = self.history.entry(feature.to_string()).or_default();
        entries.insert(0, SessionEntry::new(feature, title, content));
        entries.truncate(HISTORY_LIMIT);
        &entries[0]
    }

    pub fn history(&self, feature: &str) -> &[SessionEntry] {
        self.history.get(feature).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn save_favorite(&mut self, feature: &str, title: &str, content: &str) -> &SessionEntry {
        self.favorites.push(SessionEntry::new(feature, title, content));
        &self.favorites[self.favorites.len() - 1]
    }

    /// Copy a history entry into favorites. Index 0 is the newest entry.
    pub fn favorite_from_history(&mut self, feature: &str, index: usize) -> Option<&SessionEntry> {
        let entry = self.history(feature).get(index)?.clone();
        Some(self.save_favorite(&entry.feature, &entry.title, &entry.content))
    }

    pub fn favorites(&self) -> &[SessionEntry] {
        &self.favorites
    }
}
