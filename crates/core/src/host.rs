//! Hostnames: the tenant key of a site.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length of a DNS name in presentation format.
const MAX_HOSTNAME_LEN: usize = 253;

/// A normalized hostname.
///
/// Hostnames compare case-insensitively, so the normalized form is always
/// lowercase and carries no trailing root dot.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hostname(String);

impl Hostname {
    /// Validate and normalize a hostname supplied with an upload.
    pub fn parse(candidate: &str) -> crate::Result<Self> {
        let trimmed = candidate.trim();
        let name = trimmed.strip_suffix('.').unwrap_or(trimmed);

        if name.is_empty() {
            return Err(crate::Error::InvalidHostname(
                "hostname must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_HOSTNAME_LEN {
            return Err(crate::Error::InvalidHostname(format!(
                "hostname must be at most {MAX_HOSTNAME_LEN} characters, got {}",
                name.len()
            )));
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')))
        {
            return Err(crate::Error::InvalidHostname(format!(
                "invalid character {c:?} in hostname {name:?}"
            )));
        }

        Ok(Self(name.to_ascii_lowercase()))
    }

    /// Normalize the value of a request's `Host` header.
    ///
    /// Strips a trailing `:<port>` (bracketed IPv6 literals keep their
    /// brackets) and a trailing root dot. No character validation happens
    /// here: an unusual host simply matches no site.
    pub fn from_host_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let host = if value.starts_with('[') {
            match value.find(']') {
                Some(end) => &value[..=end],
                None => value,
            }
        } else {
            match value.rsplit_once(':') {
                Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => host,
                _ => value,
            }
        };
        let host = host.strip_suffix('.').unwrap_or(host);

        if host.is_empty() {
            return None;
        }
        Some(Self(host.to_ascii_lowercase()))
    }

    /// Get the hostname string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hostname({})", self.0)
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
