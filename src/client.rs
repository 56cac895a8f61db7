use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::auth::{AuthSession, Authenticator, LoginData};
use crate::config::{ClientConfig, ConfigOverrides, load_config};
use crate::error::{Error, Result, error_message};
use crate::settings::FormatDefaults;
use crate::store::CredentialStore;
use crate::util::{bearer_headers, guess_filename_from_url, urljoin};

/// Size of the reads used when streaming a file to disk.
pub const CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    progress: bool,

    auth: Authenticator,
    http: HttpClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.pluviarc`.
    ///
    /// This is equivalent to `Client::new(ConfigOverrides::default())`.
    pub fn from_env() -> Result<Self> {
        Self::new(ConfigOverrides::default())
    }

    /// Creates a client using (in order of precedence):
    /// - explicit overrides
    /// - environment variables `PLUVIA_URL`, `PLUVIA_USERNAME`, `PLUVIA_PASSWORD`,
    ///   `PLUVIA_VERIFY`, `PLUVIA_TOKEN_FILE`
    /// - config file from `PLUVIA_RC` or `.pluviarc`
    pub fn new(overrides: ConfigOverrides) -> Result<Self> {
        let cfg = load_config(overrides)?;
        Self::from_config(cfg)
    }

    /// Creates a client from fully resolved settings. Makes no request.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("pluvia-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("pluvia-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(config.timeout);

        if !config.verify {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build()?;
        let auth = Authenticator::new(
            http.clone(),
            config.url.clone(),
            CredentialStore::new(config.token_file.clone()),
        )
        .with_timeout(config.timeout);

        Ok(Self {
            config,
            progress: true,
            auth,
            http,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self.auth = self.auth.with_timeout(timeout);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Replaces the headers sent with token requests.
    pub fn with_token_headers(mut self, headers: HeaderMap) -> Self {
        self.auth = self.auth.with_headers(headers);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn format_defaults(&self) -> &FormatDefaults {
        &self.config.format
    }

    /// Obtains a session, reusing the stored token while it is valid.
    ///
    /// `login` defaults to the configured username and password. It is only
    /// required when a new token has to be requested.
    pub fn authenticate(&self, login: Option<LoginData>) -> Result<AuthSession> {
        let login = login.or_else(|| {
            LoginData::from_parts(
                self.config.username.clone(),
                self.config.password.clone(),
                None,
            )
        });
        self.auth.authenticate(login.as_ref())
    }

    /// GETs `endpoint` and returns its JSON body.
    ///
    /// An empty endpoint yields `Ok(None)` without any request.
    pub fn get_json(&self, session: &mut AuthSession, endpoint: &str) -> Result<Option<Value>> {
        self.get_json_as(session, endpoint)
    }

    /// Like [`Client::get_json`], deserializing into `T`.
    pub fn get_json_as<T: DeserializeOwned>(
        &self,
        session: &mut AuthSession,
        endpoint: &str,
    ) -> Result<Option<T>> {
        if endpoint.trim().is_empty() {
            return Ok(None);
        }

        let (url, resp) = self.authorized_get(session, endpoint)?;
        let text = resp.text()?;
        serde_json::from_str::<T>(&text)
            .map(Some)
            .map_err(|source| Error::Decode { url, source })
    }

    /// GETs `endpoint` and streams the body to `save_to`.
    ///
    /// When `save_to` is an existing directory the file name is taken from the
    /// URL. With `save_to = None` only the status is checked and the body is
    /// never read. Returns the written path.
    pub fn get_file(
        &self,
        session: &mut AuthSession,
        endpoint: &str,
        save_to: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        if endpoint.trim().is_empty() {
            return Ok(None);
        }

        let (url, resp) = self.authorized_get(session, endpoint)?;
        let Some(save_to) = save_to else {
            tracing::debug!("Discarding body of {}", url);
            return Ok(None);
        };

        let target = download_target(&url, save_to);
        self.stream_to(resp, &target)?;
        tracing::info!("Saved {} to {}", url, target.display());
        Ok(Some(target))
    }

    fn authorized_get(
        &self,
        session: &mut AuthSession,
        endpoint: &str,
    ) -> Result<(String, Response)> {
        self.auth.reauthenticate(session)?;

        let url = urljoin(&self.config.url, endpoint);
        tracing::debug!("GET {}", url);

        let resp = self
            .http
            .get(&url)
            .headers(bearer_headers(session.access_token())?)
            .timeout(self.config.timeout)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                url,
                message: error_message(status, &text),
            });
        }
        Ok((url, resp))
    }

    fn stream_to(&self, mut resp: Response, target: &Path) -> Result<()> {
        let pb = match resp.content_length() {
            Some(len) if self.progress => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                ) {
                    pb.set_style(style.progress_chars("=>-"));
                }
                Some(pb)
            }
            _ => None,
        };

        write_streamed(&mut resp, target, pb.as_ref())?;

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        Ok(())
    }
}

/// Copies `reader` into a temp file next to `target` in `CHUNK_SIZE` reads, then
/// renames it over `target`. On failure the temp file is removed and `target` is
/// left as it was.
fn write_streamed(reader: &mut impl Read, target: &Path, pb: Option<&ProgressBar>) -> Result<()> {
    let io_err = |source| Error::Io {
        path: target.to_path_buf(),
        source,
    };

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut out = NamedTempFile::new_in(dir).map_err(io_err)?;
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(e)),
        };
        out.write_all(&buf[..n]).map_err(io_err)?;
        if let Some(pb) = pb {
            pb.inc(n as u64);
        }
    }
    out.flush().map_err(io_err)?;
    out.persist(target).map_err(|e| io_err(e.error))?;
    Ok(())
}

fn download_target(url: &str, save_to: &Path) -> PathBuf {
    if save_to.is_dir() {
        let name = guess_filename_from_url(url).unwrap_or_else(|| "download".to_string());
        save_to.join(name)
    } else {
        save_to.to_path_buf()
    }
}
