use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::error::{Error, Result};

pub(crate) fn guess_filename_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().and_then(|s| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    })
}

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// `Authorization: Bearer <token>` plus a JSON content type.
pub(crate) fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
        Error::InvalidArguments("access token contains characters not allowed in a header".into())
    })?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths() {
        assert_eq!(
            urljoin("https://api.pluvia.app/", "/v2/token"),
            "https://api.pluvia.app/v2/token"
        );
        assert_eq!(
            urljoin("https://api.pluvia.app", "v2/token"),
            "https://api.pluvia.app/v2/token"
        );
        assert_eq!(
            urljoin("https://api.pluvia.app", "https://files.pluvia.app/a.zip"),
            "https://files.pluvia.app/a.zip"
        );
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(
            guess_filename_from_url("https://x/v2/previsoes/10/arquivo.zip?inline=1").as_deref(),
            Some("arquivo.zip")
        );
        assert_eq!(guess_filename_from_url("https://x/v2/"), None);
    }

    #[test]
    fn bearer() {
        let headers = bearer_headers("abc").unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert!(bearer_headers("bad\ntoken").is_err());
    }
}
