//! Authentication state: encrypted credential storage, session
//! persistence, and the tiered resolution that turns either into a
//! usable portal handle.
//!
//! This module provides:
//! - `Sealer`: the user-scoped seal/unseal capability (keychain-backed)
//! - `SealedStore`: encrypted-at-rest storage of one credential bundle
//! - `SessionStore`: plaintext persistence of session cookies + attrs
//! - `SessionResolver`: saved session -> env creds -> sealed creds fallback

pub mod credentials;
pub mod resolver;
pub mod seal;
pub mod session;

pub use credentials::{CredentialBundle, SealedStore};
pub use resolver::SessionResolver;
pub use seal::{default_sealer, ChaChaSealer, KeyringSealer, Sealer};
pub use session::{SessionRecord, SessionStore};

/// Outcome of loading an on-disk record.
///
/// Corrupted local state must degrade to "no stored state", never crash a
/// caller; this type keeps the distinction between a file that was never
/// written and one that is present but unusable, for callers and tests
/// that care.
#[derive(Debug)]
pub enum LoadOutcome<T> {
    Loaded(T),
    Absent,
    Corrupt,
}

impl<T> LoadOutcome<T> {
    /// Collapse to presence: both `Absent` and `Corrupt` mean "nothing usable".
    pub fn into_option(self) -> Option<T> {
        match self {
            LoadOutcome::Loaded(value) => Some(value),
            LoadOutcome::Absent | LoadOutcome::Corrupt => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, LoadOutcome::Absent)
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, LoadOutcome::Corrupt)
    }
}
