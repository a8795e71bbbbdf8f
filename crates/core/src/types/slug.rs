//! URL-safe product slugs and form list parsing.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when building a slug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugError {
    #[error("slug is empty after normalization")]
    Empty,
}

/// A lowercase, hyphen-separated, URL-safe identifier (`body-wave-frontal-22`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Normalize arbitrary text into a slug.
    ///
    /// Runs of characters outside `[a-z0-9]` collapse into a single hyphen and
    /// leading/trailing hyphens are dropped.
    ///
    /// # Errors
    ///
    /// Returns `SlugError::Empty` if nothing alphanumeric remains.
    pub fn from_title(input: &str) -> Result<Self, SlugError> {
        let mut slug = String::with_capacity(input.len());
        let mut pending_hyphen = false;

        for ch in input.trim().chars().flat_map(char::to_lowercase) {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(ch);
            } else {
                pending_hyphen = true;
            }
        }

        if slug.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(slug))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split a comma-separated form value into trimmed, non-empty entries.
///
/// `"Black, 1B ,, Blonde"` becomes `["Black", "1B", "Blonde"]`.
#[must_use]
pub fn parse_csv_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
