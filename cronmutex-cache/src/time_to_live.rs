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

//! Expiry of cache entries.

use crate::error::CacheError;
use crate::error::CacheErrorKind;

/** Time-to-live of a cache entry in seconds.

Follows the memcached convention:

* `0` means that the entry never expires.
* Values up to and including [Self::MAX_RELATIVE_SECONDS] (30 days) are relative
  to the time of the write.
* Larger values are interpreted as an absolute expiry time in seconds since the
  UNIX epoch.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeToLive(u32);

impl TimeToLive {
    /// Largest value that is interpreted as relative to the time of the write.
    pub const MAX_RELATIVE_SECONDS: u32 = 2_592_000;

    /// Entry never expires.
    pub const NEVER: Self = Self(0);

    /// Return a new instance.
    pub const fn new(seconds: u32) -> Self {
        Self(seconds)
    }

    /// Return a new instance or fail if the value does not fit the wire
    /// representation.
    pub fn from_seconds(seconds: u64) -> Result<Self, CacheError> {
        u32::try_from(seconds).map(Self).map_err(|_| {
            CacheErrorKind::InvalidTimeToLive
                .error_with_msg(format!("{seconds} seconds is out of range."))
        })
    }

    /// Raw value in seconds as sent to the cache.
    pub fn as_seconds(&self) -> u32 {
        self.0
    }

    /// Return `true` if the value is an absolute UNIX timestamp.
    pub fn is_absolute(&self) -> bool {
        self.0 > Self::MAX_RELATIVE_SECONDS
    }

    /// Return the expiry time in epoch microseconds for an entry written at
    /// `now_micros` or `None` if the entry never expires.
    pub fn expires_at_micros(&self, now_micros: u64) -> Option<u64> {
        match self.0 {
            0 => None,
            seconds if self.is_absolute() => Some(u64::from(seconds) * 1_000_000),
            seconds => Some(now_micros.saturating_add(u64::from(seconds) * 1_000_000)),
        }
    }
}

impl std::fmt::Display for TimeToLive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_absolute() {
            write!(f, "until epoch {}", self.0)
        } else {
            write!(f, "{} s", self.0)
        }
    }
}
