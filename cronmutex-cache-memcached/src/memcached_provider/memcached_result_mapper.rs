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

//! Memcached result mapping.

use cronmutex_cache::error::CacheError;
use cronmutex_cache::error::CacheErrorKind;
use memcache::CommandError;
use memcache::MemcacheError;

/// Memcached result mapping.
pub struct MemcachedResultMapper {}

impl MemcachedResultMapper {
    /// Map the outcome of a conditional write.
    ///
    /// `expected_miss` is the command error the server uses when the condition
    /// did not hold (e.g. "key exists" for `add`). It maps to `Ok(false)`.
    pub fn into_conditional(
        operation: &str,
        result: Result<(), MemcacheError>,
        expected_miss: fn(&CommandError) -> bool,
    ) -> Result<bool, CacheError> {
        match result {
            Ok(()) => Ok(true),
            Err(MemcacheError::CommandError(ref e)) if expected_miss(e) => {
                if log::log_enabled!(log::Level::Trace) {
                    log::trace!("{operation}: condition not met: {e}");
                }
                Ok(false)
            }
            Err(e) => Err(Self::into_backend_error(operation, e)),
        }
    }

    /// Map any other failure reported by the client.
    pub fn into_backend_error(operation: &str, e: MemcacheError) -> CacheError {
        CacheErrorKind::Backend.error_with_msg(format!("Memcached {operation} failed: {e}"))
    }

    /// "Key exists" reported by `add`.
    pub fn is_key_exists(e: &CommandError) -> bool {
        matches!(e, CommandError::KeyExists)
    }

    /// "Key not found" reported by `replace`.
    pub fn is_key_not_found(e: &CommandError) -> bool {
        matches!(e, CommandError::KeyNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_on_existing_key_is_a_miss() {
        let res = MemcachedResultMapper::into_conditional(
            "add",
            Err(MemcacheError::CommandError(CommandError::KeyExists)),
            MemcachedResultMapper::is_key_exists,
        );
        assert!(!res.unwrap());
        let res = MemcachedResultMapper::into_conditional(
            "add",
            Ok(()),
            MemcachedResultMapper::is_key_exists,
        );
        assert!(res.unwrap());
    }

    #[test]
    fn unrelated_command_errors_are_backend_failures() {
        let res = MemcachedResultMapper::into_conditional(
            "replace",
            Err(MemcacheError::CommandError(CommandError::KeyExists)),
            MemcachedResultMapper::is_key_not_found,
        );
        assert_eq!(res.unwrap_err().kind(), &CacheErrorKind::Backend);
    }
}
