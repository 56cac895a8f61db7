use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Token record as returned by `POST /v2/token` and persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    /// Expiry instant formatted as `%Y-%m-%dT%H:%M:%SZ` (UTC).
    ///
    /// A record without it is never considered valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    /// Any other fields sent by the server, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CredentialRecord {
    pub fn new(access_token: impl Into<String>, expires: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires: Some(expires.into()),
            extra: Map::new(),
        }
    }
}

/// Single-record token file. No locking: one writer process is assumed.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored record; `Ok(None)` when no file exists.
    pub fn load(&self) -> Result<Option<CredentialRecord>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| Error::MalformedStore {
                path: self.path.clone(),
                source,
            })
    }

    /// Overwrites the file with `record`, pretty-printed with 4-space indentation.
    ///
    /// The record is written next to the target and renamed over it, so readers
    /// never observe a half-written file.
    pub fn save(&self, record: &CredentialRecord) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err(dir))?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        record
            .serialize(&mut ser)
            .map_err(|e| io_err(&self.path)(std::io::Error::other(e)))?;

        // Removed on drop if anything below fails.
        let mut out = NamedTempFile::new_in(dir).map_err(io_err(dir))?;
        out.write_all(&buf).map_err(io_err(out.path()))?;
        out.flush().map_err(io_err(out.path()))?;
        out.persist(&self.path)
            .map_err(|e| io_err(&self.path)(e.error))?;
        Ok(())
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> Error + use<> {
    let path = path.to_path_buf();
    move |source| Error::Io { path, source }
}
