//! Encrypted-at-rest credential storage.
//!
//! One credential bundle at a time, sealed through the user-scoped
//! [`Sealer`] and written as a small JSON wrapper holding the base64
//! sealed blob. A missing file is a valid state ("no stored
//! credentials"); a file that fails any stage of decoding degrades to
//! [`LoadOutcome::Corrupt`] rather than an error, so a damaged store
//! means "prompt again", never a crash.

use std::path::PathBuf;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::seal::Sealer;
use crate::auth::LoadOutcome;
use crate::config;

/// The minimal triple needed to authenticate with the portal.
///
/// Transient by design: built from the environment or the sealed store,
/// consumed by a login attempt, then dropped. Never written to disk in
/// plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub user: String,
    pub pass: String,
    pub subdomain: String,
}

impl CredentialBundle {
    /// All three fields present and non-empty.
    pub fn is_complete(&self) -> bool {
        !self.user.is_empty() && !self.pass.is_empty() && !self.subdomain.is_empty()
    }

    /// Assemble a bundle from the `EDUPAGE_*` environment variables.
    /// Returns `None` unless all three are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let bundle = Self {
            user: std::env::var(config::ENV_USER).unwrap_or_default(),
            pass: std::env::var(config::ENV_PASS).unwrap_or_default(),
            subdomain: std::env::var(config::ENV_SUBDOMAIN).unwrap_or_default(),
        };
        bundle.is_complete().then_some(bundle)
    }
}

/// On-disk wrapper: `{"blob": "<base64 sealed bytes>"}`.
/// No version field; unknown keys are ignored on load.
#[derive(Serialize, Deserialize)]
struct SealedRecord {
    blob: String,
}

pub struct SealedStore {
    path: PathBuf,
    sealer: Box<dyn Sealer>,
}

impl SealedStore {
    pub fn new(path: PathBuf, sealer: Box<dyn Sealer>) -> Self {
        Self { path, sealer }
    }

    /// Seal and persist a bundle, replacing any previous record.
    /// Returns false (never panics or propagates) if anything goes
    /// wrong; the credentials simply remain unsaved.
    pub fn save(&self, bundle: &CredentialBundle) -> bool {
        let result = (|| -> anyhow::Result<()> {
            let raw = serde_json::to_vec(bundle)?;
            let sealed = self.sealer.seal(&raw)?;
            let record = SealedRecord {
                blob: base64::engine::general_purpose::STANDARD.encode(sealed),
            };
            std::fs::write(&self.path, serde_json::to_string(&record)?)?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), "Saved sealed credentials");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to save sealed credentials");
                false
            }
        }
    }

    /// Read back the stored bundle. Missing file is `Absent`; a file
    /// that fails parsing, base64 decoding, unsealing (wrong OS account,
    /// tampering), or inner deserialization is `Corrupt`.
    pub fn load(&self) -> LoadOutcome<CredentialBundle> {
        if !self.path.exists() {
            return LoadOutcome::Absent;
        }

        let result = (|| -> anyhow::Result<CredentialBundle> {
            let contents = std::fs::read_to_string(&self.path)?;
            let record: SealedRecord = serde_json::from_str(&contents)?;
            let sealed = base64::engine::general_purpose::STANDARD.decode(record.blob)?;
            let raw = self.sealer.unseal(&sealed)?;
            Ok(serde_json::from_slice(&raw)?)
        })();

        match result {
            Ok(bundle) if bundle.is_complete() => LoadOutcome::Loaded(bundle),
            Ok(_) => {
                warn!(path = %self.path.display(), "Stored credential bundle is incomplete");
                LoadOutcome::Corrupt
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Stored credentials unusable");
                LoadOutcome::Corrupt
            }
        }
    }

    /// Remove the record. Removing a file that does not exist is not an
    /// error, so this is safe to call repeatedly.
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed sealed credentials"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove sealed credentials"),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::seal::ChaChaSealer;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SealedStore {
        SealedStore::new(
            dir.path().join("creds.json"),
            Box::new(ChaChaSealer::new(&[1u8; 32])),
        )
    }

    fn bundle() -> CredentialBundle {
        CredentialBundle {
            user: "student@example.com".to_string(),
            pass: "hunter2".to_string(),
            subdomain: "demo-school".to_string(),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&bundle()));
        match store.load() {
            LoadOutcome::Loaded(loaded) => assert_eq!(loaded, bundle()),
            other => panic!("expected Loaded, got {:?}", other),
        }
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
        std::fs::write(store.path(), "not json at all").unwrap();
        assert!(store.load().is_corrupt());

        std::fs::write(store.path(), r#"{"blob": "!!not-base64!!"}"#).unwrap();
        assert!(store.load().is_corrupt());
    }

    #[test]
    fn test_load_tampered_blob_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&bundle()));

        let contents = std::fs::read_to_string(store.path()).unwrap();
        let mut record: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let mut sealed = base64::engine::general_purpose::STANDARD
            .decode(record["blob"].as_str().unwrap())
            .unwrap();
        let mid = sealed.len() / 2;
        sealed[mid] ^= 0x01;
        record["blob"] =
            base64::engine::general_purpose::STANDARD.encode(sealed).into();
        std::fs::write(store.path(), record.to_string()).unwrap();

        assert!(store.load().is_corrupt());
    }

    #[test]
    fn test_load_under_different_key_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&bundle()));

        let other = SealedStore::new(
            dir.path().join("creds.json"),
            Box::new(ChaChaSealer::new(&[2u8; 32])),
        );
        assert!(other.load().is_corrupt());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&bundle()));
        store.clear();
        assert!(!store.path().exists());
        store.clear();
        assert!(store.load().is_absent());
    }

    #[test]
    fn test_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.save(&bundle()));
        let second = CredentialBundle {
            user: "other".to_string(),
            pass: "pw".to_string(),
            subdomain: "elsewhere".to_string(),
        };
        assert!(store.save(&second));
        assert_eq!(store.load().into_option().unwrap(), second);
    }

    #[test]
    fn test_bundle_completeness() {
        assert!(bundle().is_complete());
        let mut b = bundle();
        b.pass.clear();
        assert!(!b.is_complete());
    }
}
