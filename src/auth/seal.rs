//! User-scoped sealing primitive.
//!
//! Credentials at rest are encrypted with a ChaCha20-Poly1305 key that
//! never touches the credential file itself: the key lives in the OS
//! keychain, scoped to the current OS account, so file access alone is
//! not enough to unseal the blob. The application never manages long-term
//! key material of its own.
//!
//! `Sealer` is kept abstract so alternate backends (hardware keystore,
//! a fixed key in tests) can replace the keychain without touching the
//! store logic built on top.

use anyhow::{anyhow, Context, Result};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use keyring::Entry;
use rand::rngs::OsRng;
use rand::RngCore;

/// Keychain service under which the sealing key is stored
const SERVICE_NAME: &str = "edugrades";

/// Keychain entry name for the sealing key
const KEY_ENTRY: &str = "sealing-key";

/// ChaCha20-Poly1305 nonce length in bytes
const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 key length in bytes
const KEY_LEN: usize = 32;

/// Fallible encrypt/decrypt pair bound to the current user account.
/// Sealer objects are shared across threads (the HTTP handlers hold
/// stores by reference), so implementors must be Send + Sync.
pub trait Sealer: Send + Sync {
    fn seal(&self, plain: &[u8]) -> Result<Vec<u8>>;
    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>>;
}

/// AEAD sealer over a caller-supplied 256-bit key.
///
/// Sealed bytes are `nonce || ciphertext`; the Poly1305 tag means any
/// bit flip in the stored blob fails authentication on unseal.
pub struct ChaChaSealer {
    cipher: ChaCha20Poly1305,
}

impl ChaChaSealer {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }
}

impl Sealer for ChaChaSealer {
    fn seal(&self, plain: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plain)
            .map_err(|_| anyhow!("Failed to seal credential bytes"))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(anyhow!("Sealed blob too short"));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| anyhow!("Failed to unseal blob (wrong account or corrupted)"))
    }
}

/// Keychain-backed sealer: fetches the sealing key from the OS keychain,
/// generating and storing a fresh one on first use.
pub struct KeyringSealer {
    inner: ChaChaSealer,
}

impl KeyringSealer {
    pub fn new() -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, KEY_ENTRY)
            .context("Failed to create keyring entry")?;

        let key = match entry.get_password() {
            Ok(encoded) => decode_key(&encoded)?,
            Err(keyring::Error::NoEntry) => {
                let mut key = [0u8; KEY_LEN];
                OsRng.fill_bytes(&mut key);
                entry
                    .set_password(&encode_key(&key))
                    .context("Failed to store sealing key in keychain")?;
                key
            }
            Err(e) => return Err(e).context("Failed to read sealing key from keychain"),
        };

        Ok(Self {
            inner: ChaChaSealer::new(&key),
        })
    }
}

impl Sealer for KeyringSealer {
    fn seal(&self, plain: &[u8]) -> Result<Vec<u8>> {
        self.inner.seal(plain)
    }

    fn unseal(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        self.inner.unseal(sealed)
    }
}

/// Stand-in used when the OS keychain cannot be reached: every
/// operation fails, so the sealed store degrades to "nothing stored"
/// instead of taking the process down.
struct UnavailableSealer {
    reason: String,
}

impl Sealer for UnavailableSealer {
    fn seal(&self, _plain: &[u8]) -> Result<Vec<u8>> {
        Err(anyhow!("Keychain unavailable: {}", self.reason))
    }

    fn unseal(&self, _sealed: &[u8]) -> Result<Vec<u8>> {
        Err(anyhow!("Keychain unavailable: {}", self.reason))
    }
}

/// The keychain-backed sealer, falling back to a sealer that always
/// fails when the keychain is unreachable.
pub fn default_sealer() -> Box<dyn Sealer> {
    match KeyringSealer::new() {
        Ok(sealer) => Box::new(sealer),
        Err(e) => {
            tracing::warn!(error = %e, "OS keychain unavailable; credential storage disabled");
            Box::new(UnavailableSealer {
                reason: e.to_string(),
            })
        }
    }
}

fn encode_key(key: &[u8; KEY_LEN]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(key)
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_LEN]> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("Sealing key in keychain is not valid base64")?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Sealing key in keychain has wrong length"))
}
