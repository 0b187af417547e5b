/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Validated cache keys.

use crate::error::CacheError;
use crate::error::CacheErrorKind;

/// A key that every supported cache backend can store.
///
/// Keys are at most [Self::MAX_LENGTH] bytes and free from whitespace and
/// control characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Maximum key length in bytes.
    pub const MAX_LENGTH: usize = 250;

    /// Return a new instance or fail if the key is not storable.
    pub fn new(key: &str) -> Result<Self, CacheError> {
        if key.is_empty() {
            return Err(CacheErrorKind::MalformedKey.error_with_msg("Key is empty."));
        }
        if key.len() > Self::MAX_LENGTH {
            return Err(CacheErrorKind::MalformedKey.error_with_msg(format!(
                "Key is {} bytes long. Max is {}.",
                key.len(),
                Self::MAX_LENGTH
            )));
        }
        if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CacheErrorKind::MalformedKey.error_with_msg(format!(
                "Key '{}' contains whitespace or control characters.",
                key.escape_debug()
            )));
        }
        Ok(Self(key.to_owned()))
    }

    /// Return a new key with `suffix` appended.
    pub fn with_suffix(&self, suffix: &str) -> Result<Self, CacheError> {
        Self::new(&(self.0.to_owned() + suffix))
    }

    /// Key as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        let key = CacheKey::new("nightly-report").unwrap();
        assert_eq!(key.as_str(), "nightly-report");
        assert_eq!(
            key.with_suffix("-metadata").unwrap().as_str(),
            "nightly-report-metadata"
        );
    }

    #[test]
    fn rejects_unstorable_keys() {
        for bad in ["", "has space", "tab\there", "nl\n"] {
            let e = CacheKey::new(bad).unwrap_err();
            assert_eq!(e.kind(), &CacheErrorKind::MalformedKey, "{bad:?}");
        }
        let long = "k".repeat(CacheKey::MAX_LENGTH);
        assert!(CacheKey::new(&long).is_ok());
        assert!(CacheKey::new(&long).unwrap().with_suffix("x").is_err());
    }
}
