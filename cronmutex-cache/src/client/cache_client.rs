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

//! Connected cache client.

use crate::CacheKey;
use crate::TimeToLive;
use crate::error::CacheError;
use crate::error::CacheErrorKind;

/** Connected client of a shared key-value cache.

All operations are single round trips without retries. An `Err` means that the
cache could not answer, while `Ok(false)` is the normal outcome of a
conditional operation whose condition did not hold.
*/
#[async_trait::async_trait]
pub trait CacheClient: Send + Sync {
    /// Store `value` under `key` unless the key already exists (create-if-absent).
    ///
    /// Returns `false` if the key was already present.
    async fn add(&self, key: &CacheKey, value: &str, ttl: TimeToLive) -> Result<bool, CacheError>;

    /// Return the value stored under `key` or `None` if absent.
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` regardless of any previous value.
    async fn set(&self, key: &CacheKey, value: &str, ttl: TimeToLive) -> Result<(), CacheError>;

    /// Overwrite the value stored under `key`.
    ///
    /// Returns `false` if the key was absent.
    async fn replace(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: TimeToLive,
    ) -> Result<bool, CacheError>;

    /// Remove `key`.
    ///
    /// Returns `false` if the key was absent.
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;

    /// Return `true` if [Self::delete_if_equals] is atomic for this backend.
    fn supports_compare_and_delete(&self) -> bool {
        false
    }

    /// Remove `key` only if it currently holds `expected`.
    ///
    /// Returns `false` if the key was absent or held another value.
    async fn delete_if_equals(&self, key: &CacheKey, expected: &str) -> Result<bool, CacheError> {
        let _ = (key, expected);
        Err(CacheErrorKind::Unsupported.error_with_msg("Compare-and-delete is not available."))
    }
}
