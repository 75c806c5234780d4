//! Store path and environment configuration.
//!
//! Both on-disk records (the sealed credential file and the plaintext
//! session file) live at paths carried by `Config` rather than hardwired
//! constants, so the CLI can override them and tests can point them at a
//! temp directory. Defaults match the conventional dotfiles in the
//! working directory.

use std::path::PathBuf;

/// Default sealed credential file, relative to the working directory
const DEFAULT_CREDS_FILE: &str = ".edupage_creds.json";

/// Default session file, relative to the working directory
const DEFAULT_SESSION_FILE: &str = ".edupage_session.json";

/// Environment variables supplying a credential bundle. Absence of any
/// one means the environment source is incomplete, not an error.
pub const ENV_USER: &str = "EDUPAGE_USER";
pub const ENV_PASS: &str = "EDUPAGE_PASS";
pub const ENV_SUBDOMAIN: &str = "EDUPAGE_SUBDOMAIN";

#[derive(Debug, Clone)]
pub struct Config {
    pub creds_path: PathBuf,
    pub session_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            creds_path: PathBuf::from(DEFAULT_CREDS_FILE),
            session_path: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl Config {
    pub fn new(creds_path: Option<PathBuf>, session_path: Option<PathBuf>) -> Self {
        let defaults = Self::default();
        Self {
            creds_path: creds_path.unwrap_or(defaults.creds_path),
            session_path: session_path.unwrap_or(defaults.session_path),
        }
    }
}
