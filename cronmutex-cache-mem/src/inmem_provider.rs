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

//! Ephemeral in-memory implementation of [CacheClient].

mod inmem_entry;

use self::inmem_entry::InMemEntry;
use cronmutex_cache::CacheKey;
use cronmutex_cache::TimeToLive;
use cronmutex_cache::client::CacheClient;
use cronmutex_cache::client::CacheConnector;
use cronmutex_cache::client::ServerEndpoint;
use cronmutex_cache::error::CacheError;
use crossbeam_skiplist::SkipMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

/** Ephemeral in-memory implementation of [CacheClient].

Expired entries are treated as absent and are replaced or dropped lazily when
the key is accessed.
*/
pub struct InMemoryCacheProvider {
    entries: SkipMap<String, InMemEntry>,
    /// Source of unique write generations.
    generation: AtomicU64,
    /// Offset added to the system clock. See [Self::advance_clock].
    clock_offset_micros: AtomicU64,
}

impl InMemoryCacheProvider {
    /// Return a new instance.
    pub fn new() -> Arc<Self> {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Using in-mem cache provider.");
        }
        Arc::new(Self {
            entries: SkipMap::default(),
            generation: AtomicU64::default(),
            clock_offset_micros: AtomicU64::default(),
        })
    }

    /// Get a [CacheConnector] that always hands out this instance.
    pub fn as_cache_connector(self: &Arc<Self>) -> InMemoryCacheConnector {
        InMemoryCacheConnector {
            inmem_provider: Arc::clone(self),
        }
    }

    /// Move the clock used for expiry forward by `duration`.
    pub fn advance_clock(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.clock_offset_micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Current time of this cache in epoch microseconds.
    fn now_micros(&self) -> u64 {
        cronmutex_cache::time::get_timestamp_micros()
            .saturating_add(self.clock_offset_micros.load(Ordering::Relaxed))
    }

    fn next_entry(&self, value: &str, ttl: TimeToLive, now_micros: u64) -> InMemEntry {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        InMemEntry::new(value, ttl, now_micros, generation)
    }
}

#[async_trait::async_trait]
impl CacheClient for InMemoryCacheProvider {
    async fn add(&self, key: &CacheKey, value: &str, ttl: TimeToLive) -> Result<bool, CacheError> {
        let now_micros = self.now_micros();
        let entry = self.next_entry(value, ttl, now_micros);
        let generation = entry.generation();
        // Only replaces an existing entry if it has expired.
        let stored = self
            .entries
            .compare_insert(key.as_str().to_owned(), entry, |existing| {
                !existing.is_live(now_micros)
            });
        Ok(stored.value().generation() == generation)
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let now_micros = self.now_micros();
        Ok(self.entries.get(key.as_str()).and_then(|entry| {
            if entry.value().is_live(now_micros) {
                Some(entry.value().value().to_owned())
            } else {
                entry.remove();
                None
            }
        }))
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: TimeToLive) -> Result<(), CacheError> {
        let entry = self.next_entry(value, ttl, self.now_micros());
        self.entries.insert(key.as_str().to_owned(), entry);
        Ok(())
    }

    async fn replace(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: TimeToLive,
    ) -> Result<bool, CacheError> {
        let now_micros = self.now_micros();
        let exists = self
            .entries
            .get(key.as_str())
            .is_some_and(|entry| entry.value().is_live(now_micros));
        if exists {
            let entry = self.next_entry(value, ttl, now_micros);
            self.entries.insert(key.as_str().to_owned(), entry);
        }
        Ok(exists)
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let now_micros = self.now_micros();
        Ok(self.entries.get(key.as_str()).is_some_and(|entry| {
            let live = entry.value().is_live(now_micros);
            entry.remove() && live
        }))
    }

    fn supports_compare_and_delete(&self) -> bool {
        true
    }

    async fn delete_if_equals(&self, key: &CacheKey, expected: &str) -> Result<bool, CacheError> {
        let now_micros = self.now_micros();
        Ok(self.entries.get(key.as_str()).is_some_and(|entry| {
            // Removing through the entry handle never touches a newer write.
            entry.value().is_live(now_micros)
                && entry.value().value() == expected
                && entry.remove()
        }))
    }
}

/// [CacheConnector] that hands out a shared [InMemoryCacheProvider].
pub struct InMemoryCacheConnector {
    inmem_provider: Arc<InMemoryCacheProvider>,
}

#[async_trait::async_trait]
impl CacheConnector for InMemoryCacheConnector {
    async fn connect(&self, endpoint: &ServerEndpoint) -> Result<Arc<dyn CacheClient>, CacheError> {
        log::debug!("In-mem cache ignores endpoint '{endpoint}'.");
        Ok(Arc::clone(&self.inmem_provider) as Arc<dyn CacheClient>)
    }
}
