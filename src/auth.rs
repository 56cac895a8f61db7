use reqwest::blocking::Client as HttpClient;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::time::Duration;

use crate::config::DEFAULT_TIMEOUT;
use crate::error::{Error, Result};
use crate::store::CredentialStore;
use crate::token;

/// JSON body sent to the token endpoint. Never persisted.
#[derive(Clone, PartialEq)]
pub struct LoginData(Value);

impl LoginData {
    /// `{"username": ..., "password": ...}`
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self(json!({
            "username": username.into(),
            "password": password.into(),
        }))
    }

    /// Forwards an arbitrary payload verbatim.
    pub fn from_json(data: Value) -> Self {
        Self(data)
    }

    /// Uses `data` when given, otherwise builds a payload from a username and
    /// password pair. Returns `None` when neither source is complete.
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
        data: Option<Value>,
    ) -> Option<Self> {
        match (data, username, password) {
            (Some(data), _, _) => Some(Self::from_json(data)),
            (None, Some(u), Some(p)) => Some(Self::new(u, p)),
            _ => None,
        }
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

impl std::fmt::Debug for LoginData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Payload holds a password.
        f.write_str("LoginData(..)")
    }
}

/// Result of a successful authentication: the bearer token in use and the
/// login data needed to obtain the next one.
#[derive(Clone)]
pub struct AuthSession {
    access_token: String,
    login: Option<LoginData>,
}

impl AuthSession {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn login(&self) -> Option<&LoginData> {
        self.login.as_ref()
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"***")
            .field("login", &self.login)
            .finish()
    }
}

/// Default headers for the token request.
pub fn default_token_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers
}

/// Loads, validates and, when needed, refreshes the persisted token.
#[derive(Debug, Clone)]
pub struct Authenticator {
    http: HttpClient,
    base_url: String,
    headers: HeaderMap,
    timeout: Duration,
    store: CredentialStore,
}

impl Authenticator {
    pub fn new(http: HttpClient, base_url: impl Into<String>, store: CredentialStore) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            headers: default_token_headers(),
            timeout: DEFAULT_TIMEOUT,
            store,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns a session for the stored token if it is still valid; otherwise
    /// exchanges `login` for a new token and persists it first.
    ///
    /// With a valid stored token no request is made and nothing is written, and
    /// `login` may be `None`. The token file is only overwritten after a
    /// successful exchange.
    pub fn authenticate(&self, login: Option<&LoginData>) -> Result<AuthSession> {
        let cached = self.store.load()?;

        let record = match cached {
            Some(record) if token::is_valid(Some(&record))? => {
                tracing::debug!("Using cached token from {}", self.store.path().display());
                record
            }
            _ => {
                let login = login.ok_or_else(|| {
                    Error::InvalidArguments(
                        "a new token is required but no username/password or login data was given"
                            .to_string(),
                    )
                })?;
                let record = token::refresh(
                    &self.http,
                    &self.base_url,
                    login,
                    &self.headers,
                    self.timeout,
                )?;
                self.store.save(&record)?;
                tracing::debug!("Saved token to {}", self.store.path().display());
                record
            }
        };

        Ok(AuthSession {
            access_token: record.access_token,
            login: login.cloned(),
        })
    }

    /// Re-authenticates with the session's login data and updates its token.
    pub fn reauthenticate(&self, session: &mut AuthSession) -> Result<()> {
        let fresh = self.authenticate(session.login.as_ref())?;
        session.access_token = fresh.access_token;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_from_parts() {
        let login = LoginData::from_parts(Some("user".into()), Some("pw".into()), None).unwrap();
        assert_eq!(
            login.as_json(),
            &json!({"username": "user", "password": "pw"})
        );

        let data = json!({"username": "other", "password": "x", "scope": "all"});
        let login =
            LoginData::from_parts(Some("user".into()), Some("pw".into()), Some(data.clone()))
                .unwrap();
        assert_eq!(login.as_json(), &data);

        assert!(LoginData::from_parts(Some("user".into()), None, None).is_none());
        assert!(LoginData::from_parts(None, None, None).is_none());
    }

    #[test]
    fn debug_hides_secrets() {
        let session = AuthSession {
            access_token: "secret-token".to_string(),
            login: Some(LoginData::new("user", "secret-pw")),
        };
        let out = format!("{session:?}");
        assert!(!out.contains("secret-token"));
        assert!(!out.contains("secret-pw"));
    }

    #[test]
    fn default_headers() {
        let headers = default_token_headers();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "*/*");
    }

    #[test]
    fn valid_cached_token_needs_no_login() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join(".pluvia"));
        store
            .save(&crate::store::CredentialRecord::new(
                "cached",
                "2999-01-01T00:00:00Z",
            ))
            .unwrap();

        // Unroutable base URL: any request would fail.
        let auth = Authenticator::new(HttpClient::new(), "http://127.0.0.1:9", store);
        let session = auth.authenticate(None).unwrap();
        assert_eq!(session.access_token(), "cached");
        assert!(session.login().is_none());
    }

    #[test]
    fn expired_token_without_login_is_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join(".pluvia"));
        store
            .save(&crate::store::CredentialRecord::new(
                "old",
                "2000-01-01T00:00:00Z",
            ))
            .unwrap();

        let auth = Authenticator::new(HttpClient::new(), "http://127.0.0.1:9", store);
        let err = auth.authenticate(None).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
    }
}
