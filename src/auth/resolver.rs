//! Tiered session resolution.
//!
//! Produces a verified portal handle by trying, in order: the saved
//! session (confirmed with a cheap probe), environment-supplied
//! credentials, then sealed stored credentials. Newly established
//! sessions are persisted for the next run.
//!
//! Storage failures along the way degrade silently to the next tier;
//! only two conditions surface to the caller: no complete credential
//! bundle anywhere, or the portal rejecting a login attempt.

use tracing::{debug, warn};

use crate::api::{PortalClient, PortalHandle, ProbeError, ResolveError};
use crate::auth::credentials::{CredentialBundle, SealedStore};
use crate::auth::session::SessionStore;

pub struct SessionResolver<'a, C: PortalClient> {
    client: &'a C,
    sessions: &'a SessionStore,
    creds: &'a SealedStore,
    env_bundle: Option<CredentialBundle>,
}

impl<'a, C: PortalClient> SessionResolver<'a, C> {
    /// Resolver with credentials gathered from the `EDUPAGE_*`
    /// environment variables.
    pub fn new(client: &'a C, sessions: &'a SessionStore, creds: &'a SealedStore) -> Self {
        Self {
            client,
            sessions,
            creds,
            env_bundle: CredentialBundle::from_env(),
        }
    }

    /// Replace the environment-sourced bundle. Used by tests and by the
    /// login flow, which already holds freshly prompted credentials.
    pub fn with_env_bundle(mut self, bundle: Option<CredentialBundle>) -> Self {
        self.env_bundle = bundle;
        self
    }

    /// Resolve a usable, verified handle.
    ///
    /// The fast path returns a restored session without touching
    /// credentials at all. A probe failure of any kind falls through to
    /// a fresh login rather than surfacing; transient probe errors are
    /// indistinguishable from expiry as far as the outcome goes.
    pub async fn resolve(&self) -> Result<PortalHandle, ResolveError> {
        if let Some(handle) = self.sessions.load().into_option() {
            match self.client.probe(&handle).await {
                Ok(()) => {
                    debug!("Restored session verified");
                    return Ok(handle);
                }
                Err(ProbeError::AuthExpired) => {
                    debug!("Saved session expired, falling back to login");
                }
                Err(ProbeError::Other(e)) => {
                    debug!(error = %e, "Probe failed, attempting fresh login");
                }
            }
        }

        let bundle = self
            .gather_bundle()
            .ok_or(ResolveError::IncompleteCredentials)?;

        let handle = self.client.login(&bundle).await?;
        debug!(subdomain = %bundle.subdomain, "Logged in with credential bundle");

        // A freshly logged-in handle is usable even if persistence fails.
        if !self.sessions.save(&handle) {
            warn!("Could not persist new session; it will not survive this run");
        }
        Ok(handle)
    }

    /// Environment first, sealed store second. Both sources must yield
    /// a complete bundle to count.
    fn gather_bundle(&self) -> Option<CredentialBundle> {
        if let Some(bundle) = &self.env_bundle {
            if bundle.is_complete() {
                debug!("Using credential bundle from environment");
                return Some(bundle.clone());
            }
        }
        let stored = self.creds.load().into_option()?;
        debug!("Using sealed credential bundle from disk");
        Some(stored)
    }
}
