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

//! Parsing of configuration for lock and metadata expiry.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use cronmutex_cache::TimeToLive;
use serde::Deserialize;
use serde::Serialize;

use super::AppConfigDefaults;

/// How a lock is released once the decision has been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ReleaseMode {
    /// Delete the lock without checking who owns it.
    ///
    /// A holder that was delayed past the lock TTL may remove a lock that by
    /// then belongs to someone else. Keep the lock TTL short.
    #[serde(rename = "unconditional")]
    Unconditional,
    /// Only delete the lock if it still holds our ownership token.
    #[serde(rename = "owner")]
    OwnerChecked,
}

/// Configuration for lock and metadata expiry.
#[derive(Debug, Deserialize, Serialize)]
pub struct LockConfig {
    /// See [Self::ttl()].
    ttl: u32,
    /// See [Self::metadata_ttl()].
    metadatattl: u32,
    /// See [Self::release_mode()].
    release: ReleaseMode,
}

impl AppConfigDefaults for LockConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "ttl", "10")?
            .set_default(prefix.to_string() + "." + "metadatattl", "2592000")?
            .set_default(prefix.to_string() + "." + "release", "unconditional")
    }
}

impl LockConfig {
    /// Return a new instance.
    pub fn new(ttl: u32, metadata_ttl: u32, release: ReleaseMode) -> Self {
        Self {
            ttl,
            metadatattl: metadata_ttl,
            release,
        }
    }

    /// Reject values that would leave a crashed holder's lock in place forever.
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl == 0 {
            return Err(ConfigError::Message(
                "lock.ttl must be at least 1 second.".to_string(),
            ));
        }
        if TimeToLive::new(self.ttl).is_absolute() {
            log::warn!(
                "lock.ttl {} is above {} and will be interpreted as an absolute UNIX timestamp.",
                self.ttl,
                TimeToLive::MAX_RELATIVE_SECONDS
            );
        }
        Ok(())
    }

    /// Lifetime of the lock record. Defaults to 10 seconds.
    ///
    /// This only needs to cover the decision, not the execution of the task.
    pub fn ttl(&self) -> TimeToLive {
        TimeToLive::new(self.ttl)
    }

    /// Lifetime of the "last run" metadata. Defaults to 30 days.
    pub fn metadata_ttl(&self) -> TimeToLive {
        TimeToLive::new(self.metadatattl)
    }

    /// How the lock is released. Defaults to [ReleaseMode::Unconditional].
    pub fn release_mode(&self) -> ReleaseMode {
        self.release
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::new(10, TimeToLive::MAX_RELATIVE_SECONDS, ReleaseMode::Unconditional)
    }
}
