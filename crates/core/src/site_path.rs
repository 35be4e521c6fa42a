//! Logical site paths.
//!
//! A logical path is the lookup key for a stored file. It always begins with
//! `/`. Archive entries named `index.html` are keyed by their containing
//! directory with a trailing slash, so a directory request and its index file
//! resolve to the same key.

use crate::INDEX_FILE;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized logical path within a site.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SitePath(String);

impl SitePath {
    /// The site root, which is also the key of the top-level `index.html`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Normalize a raw archive entry name into a logical path.
    ///
    /// Empty and `.` components are dropped. `..` is rejected, as is a name
    /// with no components left after normalization.
    pub fn from_entry_name(raw: &str) -> crate::Result<Self> {
        let mut components = Vec::new();
        for component in raw.split('/') {
            match component {
                "" | "." => continue,
                ".." => {
                    return Err(crate::Error::InvalidPath(format!(
                        "parent directory component in archive entry: {raw}"
                    )));
                }
                other => components.push(other),
            }
        }

        let Some((base, dirs)) = components.split_last() else {
            return Err(crate::Error::InvalidPath(format!(
                "archive entry has no file name: {raw:?}"
            )));
        };

        if *base == INDEX_FILE {
            if dirs.is_empty() {
                return Ok(Self::root());
            }
            return Ok(Self(format!("/{}/", dirs.join("/"))));
        }

        Ok(Self(format!("/{}", components.join("/"))))
    }

    /// Wrap a request path as received from the transport.
    ///
    /// Request paths are looked up verbatim; only a missing leading slash is
    /// added.
    pub fn from_request(path: &str) -> Self {
        if path.starts_with('/') {
            Self(path.to_string())
        } else {
            Self(format!("/{path}"))
        }
    }

    /// The directory form of this path (`/a` becomes `/a/`).
    ///
    /// Returns `None` when the path already ends in a slash.
    pub fn directory_form(&self) -> Option<Self> {
        if self.0.ends_with('/') {
            None
        } else {
            Some(Self(format!("{}/", self.0)))
        }
    }

    /// Get the path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SitePath({})", self.0)
    }
}

impl fmt::Display for SitePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SitePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
