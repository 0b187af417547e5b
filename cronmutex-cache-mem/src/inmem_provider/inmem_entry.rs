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

//! A single stored value.

use cronmutex_cache::TimeToLive;

/// A single stored value.
pub struct InMemEntry {
    value: String,
    expires_at_micros: Option<u64>,
    generation: u64,
}

impl InMemEntry {
    /// Return a new instance written at `now_micros`.
    pub fn new(value: &str, ttl: TimeToLive, now_micros: u64, generation: u64) -> Self {
        Self {
            value: value.to_owned(),
            expires_at_micros: ttl.expires_at_micros(now_micros),
            generation,
        }
    }

    /// Stored value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Unique sequence number of the write that created this entry.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Return `true` unless the entry has expired at `now_micros`.
    pub fn is_live(&self, now_micros: u64) -> bool {
        self.expires_at_micros
            .is_none_or(|expires_at_micros| now_micros < expires_at_micros)
    }
}
