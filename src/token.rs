use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::HeaderMap;
use std::time::Duration;

use crate::auth::LoginData;
use crate::error::{Error, Result, error_message};
use crate::store::CredentialRecord;

/// Format of the `expires` field written by the token endpoint.
pub const EXPIRES_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub(crate) const TOKEN_PATH: &str = "/v2/token";

/// Parses an `expires` value as a UTC instant.
pub fn parse_expiry(value: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, EXPIRES_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| Error::InvalidExpiry {
            value: value.to_string(),
            source,
        })
}

/// Whether `record` can still be used at `now`.
///
/// Absent records and records without `expires` are invalid; the token stays valid
/// only while its expiry is strictly later than `now`. An unparseable expiry is an
/// error.
pub fn is_valid_at(record: Option<&CredentialRecord>, now: DateTime<Utc>) -> Result<bool> {
    let Some(expires) = record.and_then(|r| r.expires.as_deref()) else {
        return Ok(false);
    };
    Ok(parse_expiry(expires)? > now)
}

/// [`is_valid_at`] against the current UTC clock.
pub fn is_valid(record: Option<&CredentialRecord>) -> Result<bool> {
    is_valid_at(record, Utc::now())
}

/// Exchanges `login` for a new credential record at `POST {base}/v2/token`.
///
/// The response body is trusted as-is once the status is a success.
pub(crate) fn refresh(
    http: &HttpClient,
    base_url: &str,
    login: &LoginData,
    headers: &HeaderMap,
    timeout: Duration,
) -> Result<CredentialRecord> {
    let url = crate::util::urljoin(base_url, TOKEN_PATH);
    tracing::info!("Requesting a new Pluvia access token");
    tracing::debug!("POST {}", url);

    let resp = http
        .post(&url)
        .headers(headers.clone())
        .timeout(timeout)
        .json(login.as_json())
        .send()?;

    let status = resp.status();
    if !status.is_success() {
        tracing::warn!("Token request rejected with HTTP {}", status.as_u16());
        let text = resp.text().unwrap_or_default();
        return Err(Error::Authentication {
            status: status.as_u16(),
            message: error_message(status, &text),
        });
    }

    let text = resp.text()?;
    let record: CredentialRecord =
        serde_json::from_str(&text).map_err(|source| Error::Decode { url, source })?;

    tracing::info!(
        "Token refreshed, expires: {}",
        record.expires.as_deref().unwrap_or("(unknown)")
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(expires: &str) -> CredentialRecord {
        CredentialRecord::new("token", expires)
    }

    #[test]
    fn parses_expiry_as_utc() {
        let dt = parse_expiry("2025-01-12T10:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 12, 10, 30, 0).unwrap());
    }

    #[test]
    fn rejects_other_formats() {
        let err = parse_expiry("2025-01-12 10:30:00").unwrap_err();
        assert!(matches!(err, Error::InvalidExpiry { .. }));
    }

    #[test]
    fn absent_record_is_invalid() {
        assert!(!is_valid(None).unwrap());
    }

    #[test]
    fn missing_expiry_is_invalid() {
        let mut r = record("2099-01-01T00:00:00Z");
        r.expires = None;
        assert!(!is_valid(Some(&r)).unwrap());
    }

    #[test]
    fn future_past_and_equal_instants() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let fmt = |dt: DateTime<Utc>| dt.format(EXPIRES_FORMAT).to_string();

        for secs in [1, 60, 86_400, 10 * 365 * 86_400] {
            let future = record(&fmt(now + Duration::seconds(secs)));
            assert!(is_valid_at(Some(&future), now).unwrap());

            let past = record(&fmt(now - Duration::seconds(secs)));
            assert!(!is_valid_at(Some(&past), now).unwrap());
        }

        let equal = record(&fmt(now));
        assert!(!is_valid_at(Some(&equal), now).unwrap());
    }

    #[test]
    fn unparseable_expiry_propagates() {
        let r = record("tomorrow");
        assert!(is_valid(Some(&r)).is_err());
    }
}
