//! Portal client boundary.
//!
//! `PortalClient` is the abstract collaborator the session subsystem
//! drives: login with a credential bundle, probe a restored session, and
//! fetch grades. `EdupageClient` is the concrete reqwest implementation;
//! the wire details are deliberately thin, since the portal protocol is
//! not modeled here beyond what login/probe/fetch need.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{header, Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::CredentialBundle;
use crate::models::Grade;

use super::{ApiError, LoginError, ProbeError};

/// HTTP request timeout in seconds.
/// 30s allows for slow portal responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Domain suffix appended to the school subdomain
const PORTAL_DOMAIN: &str = "edupage.org";

/// Identifying attributes restored onto a fresh handle when a saved
/// session is loaded. An explicit, enumerated set: fields absent from an
/// older session file fall back to defaults, unknown keys in the file
/// are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionAttrs {
    pub subdomain: Option<String>,
    pub base_url: Option<String>,
    pub logged_in: bool,
}

impl SessionAttrs {
    pub fn for_subdomain(subdomain: &str) -> Self {
        Self {
            subdomain: Some(subdomain.to_string()),
            base_url: Some(format!("https://{}.{}", subdomain, PORTAL_DOMAIN)),
            logged_in: false,
        }
    }
}

/// A portal client handle: an HTTP client with its cookie jar plus the
/// identifying attributes of the account context it belongs to.
/// Clone is cheap - reqwest::Client uses Arc internally.
#[derive(Clone, Debug)]
pub struct PortalHandle {
    http: Client,
    jar: Arc<Jar>,
    pub attrs: SessionAttrs,
}

impl PortalHandle {
    /// Create a fresh, unauthenticated handle with an empty cookie jar.
    pub fn new(attrs: SessionAttrs) -> Result<Self, reqwest::Error> {
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_provider(jar.clone())
            .build()?;
        Ok(Self { http, jar, attrs })
    }

    pub fn for_subdomain(subdomain: &str) -> Result<Self, reqwest::Error> {
        Self::new(SessionAttrs::for_subdomain(subdomain))
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Origin URL of the portal this handle talks to, derived from the
    /// stored base URL or the subdomain. None when neither is known.
    pub fn base_url(&self) -> Option<Url> {
        let raw = self.attrs.base_url.clone().or_else(|| {
            self.attrs
                .subdomain
                .as_ref()
                .map(|s| format!("https://{}.{}", s, PORTAL_DOMAIN))
        })?;
        Url::parse(&raw).ok()
    }

    fn endpoint(&self, path: &str) -> Option<String> {
        self.base_url()
            .map(|base| format!("{}{}", base.as_str().trim_end_matches('/'), path))
    }

    /// Extract the cookies this handle would send to the portal origin,
    /// as name/value pairs. None when no origin is known or the jar
    /// holds nothing for it.
    pub fn cookie_pairs(&self) -> Option<BTreeMap<String, String>> {
        let url = self.base_url()?;
        let header = self.jar.cookies(&url)?;
        let raw = header.to_str().ok()?;

        let mut pairs = BTreeMap::new();
        for part in raw.split("; ") {
            if let Some((name, value)) = part.split_once('=') {
                pairs.insert(name.to_string(), value.to_string());
            }
        }
        (!pairs.is_empty()).then_some(pairs)
    }

    /// Inject previously saved cookies into the jar, scoped to the
    /// portal origin. A no-op when no origin is known; the handle is
    /// still usable but will fail its probe.
    pub fn inject_cookies(&self, cookies: &BTreeMap<String, String>) {
        if let Some(url) = self.base_url() {
            for (name, value) in cookies {
                self.jar
                    .add_cookie_str(&format!("{}={}; Path=/", name, value), &url);
            }
        }
    }
}

/// Abstract portal operations the session subsystem depends on.
#[async_trait]
pub trait PortalClient {
    /// Authenticate with a credential bundle, returning a live handle.
    async fn login(&self, bundle: &CredentialBundle) -> Result<PortalHandle, LoginError>;

    /// Cheap authenticated call verifying a restored session still works.
    async fn probe(&self, handle: &PortalHandle) -> Result<(), ProbeError>;

    /// Fetch all grades visible to the authenticated account.
    async fn fetch_grades(&self, handle: &PortalHandle) -> Result<Vec<Grade>, ApiError>;
}

/// Concrete Edupage implementation over reqwest.
#[derive(Default, Clone)]
pub struct EdupageClient;

impl EdupageClient {
    pub fn new() -> Self {
        Self
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

#[derive(Debug, Deserialize)]
struct GradesResponse {
    #[serde(default)]
    grades: Vec<Grade>,
}

#[async_trait]
impl PortalClient for EdupageClient {
    async fn login(&self, bundle: &CredentialBundle) -> Result<PortalHandle, LoginError> {
        let mut handle = PortalHandle::for_subdomain(&bundle.subdomain)?;
        let url = match handle.endpoint("/login/edubarLogin.php") {
            Some(url) => url,
            None => return Err(LoginError::InvalidSubdomain(bundle.subdomain.clone())),
        };

        let response = handle
            .http()
            .post(&url)
            .form(&[("username", &bundle.user), ("password", &bundle.pass)])
            .send()
            .await?;

        if matches!(response.status().as_u16(), 401 | 403) {
            return Err(LoginError::BadCredentials);
        }

        // Edupage answers a rejected login with a redirect back to the
        // login form carrying bad=1, and a challenge page when it wants
        // a captcha. Anything else with session cookies set is success.
        let final_url = response.url().clone();
        let body = response.text().await?;
        if body.contains("captcha") {
            return Err(LoginError::CaptchaRequired);
        }
        if final_url.query().is_some_and(|q| q.contains("bad=1")) || body.contains("badlogin") {
            return Err(LoginError::BadCredentials);
        }
        if handle.cookie_pairs().is_none() {
            debug!(url = %final_url, "Login response set no cookies");
            return Err(LoginError::BadCredentials);
        }

        handle.attrs.logged_in = true;
        Ok(handle)
    }

    async fn probe(&self, handle: &PortalHandle) -> Result<(), ProbeError> {
        // A handle with no known origin can never authenticate.
        let url = match handle.endpoint("/user/?") {
            Some(url) => url,
            None => return Err(ProbeError::AuthExpired),
        };

        let response = handle
            .http()
            .get(&url)
            .send()
            .await
            .map_err(|e| ProbeError::Other(e.to_string()))?;

        if response.status().as_u16() == 401 {
            return Err(ProbeError::AuthExpired);
        }
        // Unauthenticated requests get bounced to the login page.
        if response.url().path().contains("login") {
            return Err(ProbeError::AuthExpired);
        }
        if !response.status().is_success() {
            return Err(ProbeError::Other(format!(
                "Unexpected status {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn fetch_grades(&self, handle: &PortalHandle) -> Result<Vec<Grade>, ApiError> {
        let url = handle
            .endpoint("/znamky/?what=studentviewer&format=json")
            .ok_or(ApiError::Unauthorized)?;

        let response = handle
            .http()
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let payload: GradesResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

        debug!(count = payload.grades.len(), "Fetched grades");
        Ok(payload.grades)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_round_trip_through_jar() {
        let handle = PortalHandle::for_subdomain("demo-school").unwrap();
        assert!(handle.cookie_pairs().is_none());

        let mut cookies = BTreeMap::new();
        cookies.insert("PHPSESSID".to_string(), "abc123".to_string());
        cookies.insert("edid".to_string(), "xyz".to_string());
        handle.inject_cookies(&cookies);

        assert_eq!(handle.cookie_pairs().unwrap(), cookies);
    }

    #[test]
    fn test_base_url_from_subdomain() {
        let handle = PortalHandle::for_subdomain("demo-school").unwrap();
        assert_eq!(
            handle.base_url().unwrap().as_str(),
            "https://demo-school.edupage.org/"
        );
    }

    #[test]
    fn test_handle_without_origin_has_no_cookies() {
        let handle = PortalHandle::new(SessionAttrs::default()).unwrap();
        assert!(handle.base_url().is_none());

        let mut cookies = BTreeMap::new();
        cookies.insert("PHPSESSID".to_string(), "abc".to_string());
        // silently skipped without an origin
        handle.inject_cookies(&cookies);
        assert!(handle.cookie_pairs().is_none());
    }

    #[tokio::test]
    async fn test_login_reports_unusable_subdomain() {
        let bundle = CredentialBundle {
            user: "student".to_string(),
            pass: "pw".to_string(),
            // spaces cannot form a valid host, so no request is sent
            subdomain: "bad subdomain".to_string(),
        };
        let err = EdupageClient::new().login(&bundle).await.unwrap_err();
        assert!(matches!(err, LoginError::InvalidSubdomain(_)));
    }

    #[test]
    fn test_session_attrs_tolerates_unknown_keys() {
        let attrs: SessionAttrs = serde_json::from_str(
            r#"{"subdomain": "demo", "logged_in": true, "legacy_field": 42}"#,
        )
        .unwrap();
        assert_eq!(attrs.subdomain.as_deref(), Some("demo"));
        assert!(attrs.logged_in);
        assert!(attrs.base_url.is_none());
    }
}
