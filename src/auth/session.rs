//! Plaintext session persistence.
//!
//! Saves the cookies and identifying attributes of a live portal handle
//! so a later run can reconstruct it without logging in again. Cookies
//! are short-lived tokens, not long-term secrets, so the file is plain
//! JSON; keep it out of shared storage and version control regardless.
//!
//! The record is always replaced wholesale, never edited in place.
//! There is no locking: concurrent writers race last-one-wins, which is
//! accepted for a single-user local tool.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{PortalHandle, SessionAttrs};
use crate::auth::LoadOutcome;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub cookies: BTreeMap<String, String>,
    #[serde(default)]
    pub attrs: SessionAttrs,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Persist the handle's cookies and attributes. Returns false when
    /// there is nothing worth persisting (no cookies for the portal
    /// origin) or the write fails; a live handle stays usable either way.
    pub fn save(&self, handle: &PortalHandle) -> bool {
        let Some(cookies) = handle.cookie_pairs() else {
            debug!("Handle has no cookies to persist");
            return false;
        };

        let record = SessionRecord {
            cookies,
            attrs: handle.attrs.clone(),
            saved_at: Utc::now(),
        };

        let result = serde_json::to_string_pretty(&record)
            .map_err(anyhow::Error::from)
            .and_then(|contents| std::fs::write(&self.path, contents).map_err(Into::into));

        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), "Saved session");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to save session");
                false
            }
        }
    }

    /// Reconstruct a handle from the stored record. Missing file is
    /// `Absent`; an unparsable file is `Corrupt`; a record with no
    /// cookies is `Absent` (it cannot carry authentication). The
    /// returned handle is unverified - callers must still probe it.
    pub fn load(&self) -> LoadOutcome<PortalHandle> {
        if !self.path.exists() {
            return LoadOutcome::Absent;
        }

        let record: SessionRecord = match std::fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|contents| serde_json::from_str(&contents).map_err(Into::into))
        {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Session file unusable");
                return LoadOutcome::Corrupt;
            }
        };

        if record.cookies.is_empty() {
            debug!(path = %self.path.display(), "Session record holds no cookies");
            return LoadOutcome::Absent;
        }

        let handle = match PortalHandle::new(record.attrs) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Could not build client handle for saved session");
                return LoadOutcome::Absent;
            }
        };
        handle.inject_cookies(&record.cookies);
        LoadOutcome::Loaded(handle)
    }

    /// Remove the record; a missing file is not an error.
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed saved session"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove saved session"),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SessionStore {
        SessionStore::new(dir.path().join("session.json"))
    }

    fn live_handle() -> PortalHandle {
        let handle = PortalHandle::for_subdomain("demo-school").unwrap();
        let mut cookies = BTreeMap::new();
        cookies.insert("PHPSESSID".to_string(), "abc123".to_string());
        handle.inject_cookies(&cookies);
        handle
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&live_handle()));

        let restored = store.load().into_option().expect("session should load");
        assert_eq!(restored.attrs.subdomain.as_deref(), Some("demo-school"));
        assert_eq!(
            restored.cookie_pairs().unwrap().get("PHPSESSID").unwrap(),
            "abc123"
        );
    }

    #[test]
    fn test_save_without_cookies_returns_false() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let bare = PortalHandle::for_subdomain("demo-school").unwrap();
        assert!(!store.save(&bare));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_load_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().is_absent());
    }

    #[test]
    fn test_load_garbage_file_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "{truncated").unwrap();
        assert!(store.load().is_corrupt());
    }

    #[test]
    fn test_load_empty_cookies_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(
            store.path(),
            r#"{"cookies": {}, "attrs": {"subdomain": "demo"}}"#,
        )
        .unwrap();
        assert!(store.load().is_absent());
    }

    #[test]
    fn test_load_tolerates_missing_and_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        // no attrs, no saved_at, plus a key from some future format
        std::fs::write(
            store.path(),
            r#"{"cookies": {"PHPSESSID": "zzz"}, "schema": 2}"#,
        )
        .unwrap();

        let restored = store.load().into_option().expect("tolerant load");
        // no origin in attrs, so cookies cannot be scoped; still a handle
        assert!(restored.base_url().is_none());
    }

    #[test]
    fn test_save_replaces_previous_record() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&live_handle()));

        let newer = PortalHandle::for_subdomain("other-school").unwrap();
        let mut cookies = BTreeMap::new();
        cookies.insert("PHPSESSID".to_string(), "fresh".to_string());
        newer.inject_cookies(&cookies);
        assert!(store.save(&newer));

        let restored = store.load().into_option().unwrap();
        assert_eq!(restored.attrs.subdomain.as_deref(), Some("other-school"));
        assert_eq!(
            restored.cookie_pairs().unwrap().get("PHPSESSID").unwrap(),
            "fresh"
        );
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&live_handle()));
        store.clear();
        store.clear();
        assert!(store.load().is_absent());
    }
}
