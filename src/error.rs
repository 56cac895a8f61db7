use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the Pluvia client.
#[derive(Error, Debug)]
pub enum Error {
    /// The local token file exists but is not a JSON credential record.
    #[error("malformed token file {}: {source}", path.display())]
    MalformedStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Reading or writing a local file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The token endpoint rejected the credential exchange.
    #[error("Pluvia authentication failed (HTTP {status}): {message}")]
    Authentication { status: u16, message: String },

    /// A data request returned a non-success status.
    #[error("API request failed: HTTP {status} for url ({url}): {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
    },

    /// A name is not present in a reference list.
    #[error("no entry named {name:?} in reference list {endpoint}")]
    NotFound { name: String, endpoint: String },

    /// Authentication needs a refresh but no login data is available.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The stored `expires` field is not a `%Y-%m-%dT%H:%M:%SZ` timestamp.
    #[error("invalid token expiry {value:?}: {source}")]
    InvalidExpiry {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// A success response whose body is not the expected JSON.
    #[error("failed to parse API JSON (url={url}): {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Connection, TLS or timeout failure in the HTTP client.
    #[error("could not connect: {0}")]
    Transport(#[from] reqwest::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0:#}")]
    Config(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Authentication { status, .. } | Error::Http { status, .. } => Some(*status),
            Error::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct PluviaErrorResponse {
    #[serde(default)]
    pub(crate) title: Option<String>,
    // Some endpoints respond with {"message":...,"detail":...}
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) detail: Option<String>,
    #[serde(default)]
    pub(crate) errors: Option<serde_json::Value>,
}

/// Turns an error body into a one-line message, keeping the raw text when it is
/// not a recognised JSON error payload.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if let Ok(e) = serde_json::from_str::<PluviaErrorResponse>(body) {
        let title = e.title.as_deref().or(e.message.as_deref()).unwrap_or("");
        let detail = e.detail.as_deref().unwrap_or("");
        let mut out = match (title.is_empty(), detail.is_empty()) {
            (false, false) => format!("{title}: {detail}"),
            (false, true) => title.to_string(),
            (true, false) => detail.to_string(),
            (true, true) => String::new(),
        };
        if let Some(errors) = e.errors.filter(|v| !v.is_null()) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&errors.to_string());
        }
        if !out.is_empty() {
            return out;
        }
    }

    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.to_string()
    }
}
