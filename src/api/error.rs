use thiserror::Error;

/// Failures from a credential login attempt. The one error class that
/// propagates distinguishably out of session resolution, because the
/// caller needs to know whether to re-prompt (bad password, captcha) or
/// retry later (network).
#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Wrong username or password")]
    BadCredentials,

    #[error("Subdomain {0:?} does not form a valid portal address")]
    InvalidSubdomain(String),

    #[error("Edupage requested a captcha; complete it in the web UI and retry")]
    CaptchaRequired,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Failures from the lightweight session probe. Never surfaced past the
/// resolver: both variants just select the fallback path.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Session is no longer authenticated")]
    AuthExpired,

    #[error("Probe failed: {0}")]
    Other(String),
}

/// Terminal failures of session resolution. Storage-layer problems never
/// appear here; they degrade to the credential fallback internally.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No saved session and no complete credential bundle available")]
    IncompleteCredentials,

    #[error("{0}")]
    Login(#[from] LoginError),
}

/// Errors from authenticated data fetches.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized - session may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data.
    /// The cut lands on a char boundary so multi-byte bodies never panic.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => ApiError::Unauthorized,
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
