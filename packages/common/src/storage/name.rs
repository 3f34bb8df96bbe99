use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distr::Alphanumeric;

use super::error::StorageError;

const MAX_NAME_LEN: usize = 255;
const MAX_EXTENSION_LEN: usize = 10;
const TOKEN_LEN: usize = 12;

/// A validated flat object key inside a bucket.
///
/// Keys are limited to ASCII letters, digits, `-`, `_` and `.`, must not start
/// with a dot, and never contain a path separator, so a key can be joined onto
/// a directory or bucket path without escaping it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectName(String);

impl ObjectName {
    /// Parse and validate an existing object key.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if s.is_empty() {
            return Err(StorageError::InvalidName("name is empty".into()));
        }
        if s.len() > MAX_NAME_LEN {
            return Err(StorageError::InvalidName(format!(
                "name exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if s.starts_with('.') {
            return Err(StorageError::InvalidName(
                "name must not start with '.'".into(),
            ));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(StorageError::InvalidName(format!(
                "character {c:?} is not allowed"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Generate a fresh, collision-resistant key for an upload.
    ///
    /// The key is `{random token}-{unix millis}` followed by the original file's
    /// extension, e.g. `k3h9x0p2m1qz-1718000000000.png`.
    pub fn generate(original_file_name: &str) -> Self {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        match extension_of(original_file_name) {
            Some(ext) => Self(format!("{token}-{millis}.{ext}")),
            None => Self(format!("{token}-{millis}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension part of the key, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// Normalized extension of an uploaded file name.
///
/// Only ASCII alphanumeric extensions up to 10 characters are carried over;
/// anything else yields no extension rather than an unsafe key.
fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.trim().rsplit_once('.')?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({})", self.0)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
