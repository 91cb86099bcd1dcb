//! Session principal and its persistence.
//!
//! The session lives in a key-value store under a single key, stored as the
//! JSON object `{"id", "email", "role"}`. A value that fails to decode is
//! discarded and treated as "logged out"; the reason goes back to the caller
//! rather than to the terminal.

use crate::role::Role;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }

    /// Decode a persisted record. Missing or unknown fields, an unknown role,
    /// or an empty id/email all reject the record.
    pub fn decode(raw: &str) -> Result<Self> {
        let user: User = serde_json::from_str(raw)?;
        if user.id.trim().is_empty() {
            return Err(anyhow!("session record has an empty id"));
        }
        if user.email.trim().is_empty() {
            return Err(anyhow!("session record has an empty email"));
        }
        Ok(user)
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Greeting name: the local part of the email
    pub fn display_name(&self) -> &str {
        match self.email.split_once('@') {
            Some((local, _)) if !local.is_empty() => local,
            _ => &self.email,
        }
    }
}

/// Whether someone is logged in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    LoggedOut,
    LoggedIn(User),
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        match self {
            Session::LoggedOut => None,
            Session::LoggedIn(user) => Some(user),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, Session::LoggedIn(_))
    }
}

/// String key-value storage, modelled on browser local storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory store
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by one JSON object file. The file is created on first write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file exists but is not a JSON object of strings
    fn read_entries(&self) -> Result<Option<BTreeMap<String, String>>> {
        if !self.path.exists() {
            return Ok(Some(BTreeMap::new()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Some(BTreeMap::new()));
        }
        Ok(serde_json::from_str(&content).ok())
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.read_entries()? {
            Some(entries) => Ok(entries.get(key).cloned()),
            None => Err(anyhow!(
                "storage file {} is damaged",
                self.path.display()
            )),
        }
    }

    // A damaged file holds nothing recoverable; writes start from empty
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_entries()?.unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match self.read_entries()? {
            Some(mut entries) => {
                if entries.remove(key).is_some() {
                    self.write_all(&entries)?;
                }
                Ok(())
            }
            None => self.write_all(&BTreeMap::new()),
        }
    }
}

/// Result of reading the persisted session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLoad {
    Absent,
    Restored(User),
    /// The record (or the storage holding it) was unusable and has been cleared
    Discarded(String),
}

impl SessionLoad {
    pub fn into_user(self) -> Option<User> {
        match self {
            SessionLoad::Restored(user) => Some(user),
            SessionLoad::Absent | SessionLoad::Discarded(_) => None,
        }
    }
}

/// Default key the session record is stored under
pub const DEFAULT_SESSION_KEY: &str = "marine-portal.user";

/// Owns the persisted session record
pub struct SessionStore<S: KeyValueStore> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the persisted user. Anything unusable is cleared and reported as
    /// `Discarded`; nothing is printed.
    pub fn load(&mut self) -> SessionLoad {
        let reason = match self.store.get(&self.key) {
            Ok(None) => return SessionLoad::Absent,
            Ok(Some(raw)) => match User::decode(&raw) {
                Ok(user) => return SessionLoad::Restored(user),
                Err(e) => format!("invalid session record: {}", e),
            },
            Err(e) => format!("unreadable session storage: {}", e),
        };

        match self.store.remove(&self.key) {
            Ok(()) => SessionLoad::Discarded(reason),
            Err(e) => SessionLoad::Discarded(format!("{} (clearing failed: {})", reason, e)),
        }
    }

    /// Persist `user`, replacing any previous record
    pub fn save(&mut self, user: &User) -> Result<()> {
        let raw = user.encode()?;
        self.store.set(&self.key, &raw)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_sessions() -> SessionStore<MemoryStore> {
        SessionStore::new(MemoryStore::new(), DEFAULT_SESSION_KEY)
    }

    #[test]
    fn test_save_then_load_round_trip() {
        for role in Role::ALL {
            let mut sessions = memory_sessions();
            let user = User::new("user-1700000000000", "diver@reef.org", role);
            sessions.save(&user).unwrap();
            assert_eq!(sessions.load(), SessionLoad::Restored(user));
        }
    }

    #[test]
    fn test_load_absent_is_none() {
        let mut sessions = memory_sessions();
        assert_eq!(sessions.load(), SessionLoad::Absent);
    }

    #[test]
    fn test_load_garbage_clears_key() {
        let inputs = [
            "not json at all",
            "{\"id\":\"user-1\",\"email\":\"x@y.com\"}",
            "{\"id\":\"user-1\",\"email\":\"x@y.com\",\"role\":\"captain\"}",
            "{\"id\":\"user-1\",\"email\":\"x@y.com\",\"role\":\"admin\",\"token\":\"t\"}",
            "{\"id\":\"\",\"email\":\"x@y.com\",\"role\":\"admin\"}",
            "{\"id\":\"user-1\",\"email\":\"  \",\"role\":\"admin\"}",
            "[1,2,3]",
        ];
        for raw in inputs {
            let mut store = MemoryStore::new();
            store.set(DEFAULT_SESSION_KEY, raw).unwrap();
            let mut sessions = SessionStore::new(store, DEFAULT_SESSION_KEY);
            let outcome = sessions.load();
            assert!(
                matches!(&outcome, SessionLoad::Discarded(reason) if reason.starts_with("invalid session record")),
                "input: {}, got {:?}",
                raw,
                outcome
            );
            assert_eq!(sessions.store().get(DEFAULT_SESSION_KEY).unwrap(), None);
        }
    }

    #[test]
    fn test_clear_removes_record() {
        let mut sessions = memory_sessions();
        sessions
            .save(&User::new("user-1", "a@b.com", Role::Admin))
            .unwrap();
        sessions.clear().unwrap();
        assert_eq!(sessions.load(), SessionLoad::Absent);
        // Clearing twice is harmless
        sessions.clear().unwrap();
    }

    #[test]
    fn test_persisted_shape() {
        let user = User::new("user-1", "x@y.com", Role::Admin);
        let value: serde_json::Value = serde_json::from_str(&user.encode().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": "user-1", "email": "x@y.com", "role": "admin"})
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(User::new("u", "marina@cmfri.in", Role::Researcher).display_name(), "marina");
        assert_eq!(User::new("u", "nodomain", Role::Researcher).display_name(), "nodomain");
        assert_eq!(User::new("u", "@odd", Role::Researcher).display_name(), "@odd");
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        let user = User::new("user-42", "x@y.com", Role::Conservationist);

        let mut sessions = SessionStore::new(FileStore::new(&path), DEFAULT_SESSION_KEY);
        sessions.save(&user).unwrap();

        let mut reopened = SessionStore::new(FileStore::new(&path), DEFAULT_SESSION_KEY);
        assert_eq!(reopened.load().into_user(), Some(user));
        reopened.clear().unwrap();

        let mut again = SessionStore::new(FileStore::new(&path), DEFAULT_SESSION_KEY);
        assert_eq!(again.load(), SessionLoad::Absent);
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        let mut store = FileStore::new(&path);
        store.set("theme", "dark").unwrap();
        store.set(DEFAULT_SESSION_KEY, "garbage").unwrap();

        let mut sessions = SessionStore::new(store, DEFAULT_SESSION_KEY);
        assert!(matches!(sessions.load(), SessionLoad::Discarded(_)));
        assert_eq!(sessions.store().get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_file_store_damaged_file_is_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{{{").unwrap();
        let mut sessions = SessionStore::new(FileStore::new(&path), DEFAULT_SESSION_KEY);
        assert!(matches!(
            sessions.load(),
            SessionLoad::Discarded(reason) if reason.contains("damaged")
        ));

        // The bad contents are gone, so the next start is a plain logged-out one
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<serde_json::Value>(&content).unwrap(), serde_json::json!({}));
        let mut reopened = SessionStore::new(FileStore::new(&path), DEFAULT_SESSION_KEY);
        assert_eq!(reopened.load(), SessionLoad::Absent);

        reopened
            .save(&User::new("user-1", "a@b.com", Role::Admin))
            .unwrap();
        assert!(matches!(reopened.load(), SessionLoad::Restored(_)));
    }

    #[test]
    fn test_file_store_save_over_damaged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[\"not\", \"a map\"]").unwrap();
        let mut store = FileStore::new(&path);
        assert!(store.get(DEFAULT_SESSION_KEY).is_err());
        store.set(DEFAULT_SESSION_KEY, "v").unwrap();
        assert_eq!(store.get(DEFAULT_SESSION_KEY).unwrap().as_deref(), Some("v"));
    }
}
