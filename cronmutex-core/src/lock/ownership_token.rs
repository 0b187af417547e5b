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

//! Unique lock ownership tokens.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use uuid::Uuid;

/// Tokens generated by this process so far.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/** Value written to a lock record by the process that tries to acquire it.

Tokens are unique across hosts (host name and random UUID) and across
repeated acquisition attempts in the same process (sequence number).
*/
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnershipToken(String);

impl OwnershipToken {
    /// Generate a new token in the form `{hostname}-{pid}-{uuid}-{sequence}`.
    pub fn generate() -> Self {
        let hostname = hostname::get()
            .map(|hostname| hostname.to_string_lossy().to_string())
            .unwrap_or_else(|e| {
                log::debug!("Unable to get host name: {e}");
                String::from("unknown")
            });
        let pid = std::process::id();
        let uuid = Uuid::new_v4().simple();
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{hostname}-{pid}-{uuid}-{sequence}"))
    }

    /// Token as stored in the cache.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnershipToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_unique_within_process() {
        let tokens = (0..1000)
            .map(|_| OwnershipToken::generate())
            .collect::<HashSet<_>>();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn token_carries_process_id() {
        let token = OwnershipToken::generate();
        assert!(
            token
                .as_str()
                .contains(&format!("-{}-", std::process::id()))
        );
    }
}
