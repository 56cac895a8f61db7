use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::settings::FormatDefaults;

pub const DEFAULT_URL: &str = "https://api.pluvia.app";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_FILE_NAME: &str = ".pluvia";
const RC_FILE_NAME: &str = ".pluviarc";

/// Resolved client settings.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base API URL, typically `https://api.pluvia.app`.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Whether to verify TLS certificates. `false` is honored.
    pub verify: bool,
    /// Where the current token is persisted.
    pub token_file: PathBuf,
    pub timeout: Duration,
    pub format: FormatDefaults,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("verify", &self.verify)
            .field("token_file", &self.token_file)
            .field("timeout", &self.timeout)
            .field("format", &self.format)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: None,
            password: None,
            verify: true,
            token_file: default_token_file(),
            timeout: DEFAULT_TIMEOUT,
            format: FormatDefaults::default(),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    verify: Option<bool>,
    token_file: Option<PathBuf>,
}

/// Explicit overrides, each falling back to the environment, then the rc file,
/// then the defaults.
#[derive(Default, Clone)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub verify: Option<bool>,
    pub token_file: Option<PathBuf>,
}

pub(crate) fn load_config(overrides: ConfigOverrides) -> Result<ClientConfig> {
    let env = ConfigOverrides {
        url: env_var("PLUVIA_URL"),
        username: env_var("PLUVIA_USERNAME"),
        password: env_var("PLUVIA_PASSWORD"),
        verify: env_var("PLUVIA_VERIFY").map(|v| parse_bool(&v)),
        token_file: env_var("PLUVIA_TOKEN_FILE").map(PathBuf::from),
    };
    let explicit = merge(overrides, env);

    let rc = match rc_candidates().iter().find(|p| p.exists()) {
        Some(rc_path) => read_rc(rc_path).with_context(|| {
            format!("failed to read configuration file {}", rc_path.display())
        })?,
        None => RcConfig::default(),
    };

    Ok(resolve(explicit, rc))
}

fn merge(primary: ConfigOverrides, fallback: ConfigOverrides) -> ConfigOverrides {
    ConfigOverrides {
        url: primary.url.or(fallback.url),
        username: primary.username.or(fallback.username),
        password: primary.password.or(fallback.password),
        verify: primary.verify.or(fallback.verify),
        token_file: primary.token_file.or(fallback.token_file),
    }
}

fn resolve(explicit: ConfigOverrides, rc: RcConfig) -> ClientConfig {
    let defaults = ClientConfig::default();
    ClientConfig {
        url: explicit.url.or(rc.url).unwrap_or(defaults.url),
        username: explicit.username.or(rc.username),
        password: explicit.password.or(rc.password),
        verify: explicit.verify.or(rc.verify).unwrap_or(defaults.verify),
        token_file: explicit
            .token_file
            .or(rc.token_file)
            .unwrap_or(defaults.token_file),
        ..defaults
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(v: &str) -> bool {
    !matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // Support formatting where `key:` is on one line and the value is on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            // Continuation value line, unless it starts another known key
            if !is_key_line(line) {
                apply(&mut cfg, pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            if v.is_empty() {
                pending_key = Some(k);
            } else {
                apply(&mut cfg, k, v);
            }
        }
    }

    cfg
}

const RC_KEYS: &[&str] = &["url", "username", "password", "verify", "token_file"];

fn is_key_line(line: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(k, _)| RC_KEYS.contains(&k.trim()))
}

fn apply(cfg: &mut RcConfig, key: &str, value: &str) {
    match key {
        "url" => cfg.url = Some(value.to_string()),
        "username" => cfg.username = Some(value.to_string()),
        "password" => cfg.password = Some(value.to_string()),
        "verify" => cfg.verify = Some(parse_bool(value)),
        "token_file" => cfg.token_file = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) PLUVIA_RC (explicit)
    // 2) ./.pluviarc
    // 3) ~/.pluviarc
    if let Some(p) = env_var("PLUVIA_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(RC_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(RC_FILE_NAME));
    }
    v
}

fn default_token_file() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(TOKEN_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(TOKEN_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rc_lines() {
        let cfg = parse_rc(
            "# pluvia\nurl: https://staging.pluvia.app\nusername: 'analyst'\npassword: \"p:w\"\nverify: 0\ntoken_file: /tmp/tok\n",
        );
        assert_eq!(
            cfg,
            RcConfig {
                url: Some("https://staging.pluvia.app".to_string()),
                username: Some("analyst".to_string()),
                password: Some("p:w".to_string()),
                verify: Some(false),
                token_file: Some(PathBuf::from("/tmp/tok")),
            }
        );
    }

    #[test]
    fn value_on_next_line() {
        let cfg = parse_rc("password:\n  secret\nurl:\n  http://localhost:8080\n");
        assert_eq!(cfg.password.as_deref(), Some("secret"));
        assert_eq!(cfg.url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn empty_value_followed_by_another_key() {
        let cfg = parse_rc("url:\nusername: bob\npassword:\n  a:b\n");
        assert_eq!(cfg.url, None);
        assert_eq!(cfg.username.as_deref(), Some("bob"));
        assert_eq!(cfg.password.as_deref(), Some("a:b"));
    }

    #[test]
    fn explicit_values_win_and_false_is_kept() {
        let explicit = ConfigOverrides {
            url: Some("http://127.0.0.1:1234".to_string()),
            verify: Some(false),
            ..Default::default()
        };
        let rc = RcConfig {
            url: Some("https://other".to_string()),
            username: Some("rc-user".to_string()),
            verify: Some(true),
            ..Default::default()
        };

        let cfg = resolve(explicit, rc);
        assert_eq!(cfg.url, "http://127.0.0.1:1234");
        assert_eq!(cfg.username.as_deref(), Some("rc-user"));
        assert!(!cfg.verify);
        assert_eq!(cfg.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn defaults() {
        let cfg = resolve(ConfigOverrides::default(), RcConfig::default());
        assert_eq!(cfg.url, DEFAULT_URL);
        assert!(cfg.verify);
        assert!(cfg.token_file.ends_with(".pluvia"));
        assert!(cfg.username.is_none());
    }

    #[test]
    fn reads_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".pluviarc");
        std::fs::write(&path, "username: a\npassword: b\n").unwrap();
        let cfg = read_rc(&path).unwrap();
        assert_eq!(cfg.username.as_deref(), Some("a"));
        assert!(read_rc(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn debug_masks_password() {
        let cfg = ClientConfig {
            password: Some("hunter2".to_string()),
            ..ClientConfig::default()
        };
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }

    #[test]
    fn bools() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(!parse_bool("False"));
        assert!(!parse_bool("0"));
    }
}
