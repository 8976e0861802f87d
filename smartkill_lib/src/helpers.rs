//! Helpers for credential resolution, timestamps, and service URL parsing.

use chrono::{DateTime, Local, NaiveDate, Utc};
use url::Url;

use crate::client::Credentials;
use crate::secret::SecretBackend;

/// Resolve credentials from a secret backend (1Password, Bitwarden, KeePassXC).
///
/// The password always comes from a backend; plain-text passwords on the command
/// line or in env vars are not supported. The username is taken from `username`
/// when given, otherwise from the same backend entry.
/// Configure one backend via its env vars (see [crate::secret]):
/// - 1Password: `SMARTKILL_OP_ENTRY_PATH` (op://Vault/Item) or `SMARTKILL_OP_VAULT` + `SMARTKILL_OP_ITEM`.
/// - Bitwarden: `SMARTKILL_BW_ITEM_ID`; optional `SMARTKILL_BW_SESSION`.
/// - KeePassXC: `SMARTKILL_KPXC_DB`, `SMARTKILL_KPXC_ENTRY`.
pub fn get_credentials(username: Option<&str>) -> Result<(Credentials, SecretBackend), String> {
    for backend in SecretBackend::all().into_iter().filter(|b| b.is_configured()) {
        let Some(password) = backend.password() else {
            continue;
        };
        let username = match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(u) => u.to_string(),
            None => backend.username().ok_or_else(|| {
                format!(
                    "Username not found in {}. Pass --username or set SMARTKILL_USERNAME.",
                    backend.name()
                )
            })?,
        };
        let credentials = Credentials::new(username, password).map_err(|e| e.to_string())?;
        return Ok((credentials, backend));
    }
    Err(
        "Password not found. Configure a secret backend: SMARTKILL_OP_ENTRY_PATH (1Password), \
         SMARTKILL_BW_ITEM_ID (Bitwarden), or SMARTKILL_KPXC_DB+SMARTKILL_KPXC_ENTRY (KeePassXC). \
         Plain-text passwords are not supported."
            .to_string(),
    )
}

/// Identifiers extracted from a service URL such as
/// `https://www.victorsmartkill.com/traps/42/history/`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ParsedResourceUrl {
    /// Collection name (`traps`, `users`, ...).
    pub resource: Option<String>,
    pub id: Option<u64>,
    /// Trailing sub-resource (`history`).
    pub action: Option<String>,
}

/// Parse an absolute service URL or a relative resource path.
pub fn parse_resource_url(url: &str) -> Result<ParsedResourceUrl, String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => url.to_string(),
        Err(e) => return Err(e.to_string()),
    };
    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    // Skip an optional API prefix ("api/traps/42/").
    let start = match segments.first() {
        Some(&"api") => 1,
        _ => 0,
    };
    let resource = segments.get(start).map(|s| (*s).to_string());
    let id = segments.get(start + 1).and_then(|s| s.parse::<u64>().ok());
    let action = if id.is_some() {
        segments.get(start + 2).map(|s| (*s).to_string())
    } else {
        None
    };

    Ok(ParsedResourceUrl {
        resource,
        id,
        action,
    })
}

/// Id of the resource a service URL points at, if it has one.
pub fn resource_id_from_url(url: &str) -> Option<u64> {
    parse_resource_url(url).ok().and_then(|p| p.id)
}

/// Format an ISO 8601 timestamp for display. If `use_utc` is true, shows UTC; otherwise converts to local timezone.
pub fn format_timestamp_display(dt: &DateTime<Utc>, use_utc: bool) -> String {
    if use_utc {
        dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    } else {
        dt.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string()
    }
}

/// Parse an ISO 8601 time string. Timestamps without an offset are read as UTC,
/// bare dates as midnight UTC.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc());
    }
    let bare = s.trim_end_matches('Z').trim_end_matches('z');
    let parsed = DateTime::parse_from_rfc3339(&format!("{}Z", bare))
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map_err(|e| format!("{}: {}", s, e))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_time_variants() {
        let expected = Utc.with_ymd_and_hms(2020, 5, 1, 10, 20, 30).unwrap();
        assert_eq!(parse_time("2020-05-01T10:20:30Z").unwrap(), expected);
        assert_eq!(parse_time("2020-05-01T10:20:30").unwrap(), expected);
        assert_eq!(parse_time("2020-05-01T12:20:30+02:00").unwrap(), expected);
        assert_eq!(
            parse_time("2020-05-01").unwrap(),
            Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap()
        );
        let fractional = parse_time("2020-05-01T10:20:30.250000Z").unwrap();
        assert_eq!(fractional.nanosecond(), 250_000_000);
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn test_parse_resource_url_trap_history() {
        let p = parse_resource_url("https://www.victorsmartkill.com/traps/42/history/").unwrap();
        assert_eq!(p.resource.as_deref(), Some("traps"));
        assert_eq!(p.id, Some(42));
        assert_eq!(p.action.as_deref(), Some("history"));
    }

    #[test]
    fn test_parse_resource_url_relative_and_prefixed() {
        let p = parse_resource_url("users/7/").unwrap();
        assert_eq!(p.resource.as_deref(), Some("users"));
        assert_eq!(p.id, Some(7));
        let p = parse_resource_url("https://example.com/api/operators/3/").unwrap();
        assert_eq!(p.resource.as_deref(), Some("operators"));
        assert_eq!(p.id, Some(3));
        let p = parse_resource_url("traps/").unwrap();
        assert_eq!(p.id, None);
        assert_eq!(p.action, None);
    }

    #[test]
    fn test_resource_id_from_url() {
        assert_eq!(
            resource_id_from_url("https://www.victorsmartkill.com/traps/123/"),
            Some(123)
        );
        assert_eq!(resource_id_from_url("https://www.victorsmartkill.com/"), None);
    }

    #[test]
    fn test_format_timestamp_display_utc() {
        let dt = Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp_display(&dt, true), "2021-01-02 03:04:05 UTC");
    }
}
