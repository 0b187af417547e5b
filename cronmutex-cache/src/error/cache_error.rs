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

//! Cache errors.

use std::error::Error;
use std::fmt;

/// Cause of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheErrorKind {
    /// Unable to connect to the cache server.
    Unreachable,
    /// The key can't be stored by the cache. E.g. too long or contains
    /// whitespace.
    MalformedKey,
    /// Time-to-live value is out of range.
    InvalidTimeToLive,
    /// The operation is not supported by this cache backend.
    Unsupported,
    /// The cache backend reported a failure. See message for details.
    Backend,
}

impl CacheErrorKind {
    /// Create a new instance with an error message.
    pub fn error_with_msg<S: AsRef<str>>(self, msg: S) -> CacheError {
        CacheError {
            kind: self,
            msg: Some(msg.as_ref().to_string()),
        }
    }

    /// Create a new instance without an error message.
    pub fn error(self) -> CacheError {
        CacheError {
            kind: self,
            msg: None,
        }
    }
}

impl fmt::Display for CacheErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/** Cache error.

Create a new instance via [CacheErrorKind].
*/
#[derive(Debug)]
pub struct CacheError {
    kind: CacheErrorKind,
    msg: Option<String>,
}

impl CacheError {
    /// Return the type of error.
    pub fn kind(&self) -> &CacheErrorKind {
        &self.kind
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{} {}", self.kind, msg)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl AsRef<CacheError> for CacheError {
    fn as_ref(&self) -> &CacheError {
        self
    }
}

impl Error for CacheError {}
