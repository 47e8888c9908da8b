use crate::StorageError;
use std::fmt;
use std::str::FromStr;

/// Slash-separated storage key, e.g. `alice/maven-local.yaml`.
///
/// Segments are never empty and never `.` or `..`, so a key can always be
/// mapped below a storage root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn from_parts<I, S>(parts: I) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for part in parts {
            let part = part.as_ref();
            if part.contains('/') {
                return Err(StorageError::InvalidKey {
                    key: part.to_string(),
                    reason: "segment contains '/'",
                });
            }
            validate_segment(part)?;
            if !joined.is_empty() {
                joined.push('/');
            }
            joined.push_str(part);
        }

        if joined.is_empty() {
            return Err(StorageError::InvalidKey {
                key: joined,
                reason: "key is empty",
            });
        }

        Ok(Key(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Last segment of the key.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// True if `self` equals `prefix` or lies below it.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0) && self.0.as_bytes().get(prefix.0.len()) == Some(&b'/'))
    }
}

fn validate_segment(segment: &str) -> Result<(), StorageError> {
    let reason = if segment.is_empty() {
        "empty segment"
    } else if segment == "." || segment == ".." {
        "relative segment"
    } else if segment.contains(['\\', '\0']) {
        "segment contains a forbidden character"
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidKey {
        key: segment.to_string(),
        reason,
    })
}

impl FromStr for Key {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_parts(s.split('/'))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
