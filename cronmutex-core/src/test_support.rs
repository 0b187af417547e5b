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

//! Cache test doubles.

use cronmutex_cache::CacheKey;
use cronmutex_cache::TimeToLive;
use cronmutex_cache::client::CacheClient;
use cronmutex_cache::client::CacheConnector;
use cronmutex_cache::client::ServerEndpoint;
use cronmutex_cache::error::CacheError;
use cronmutex_cache::error::CacheErrorKind;
use cronmutex_cache_mem::InMemoryCacheProvider;
use std::sync::Arc;
use std::sync::Mutex;

/// Initialize logging.
pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Shorthand for a valid key.
pub fn key(name: &str) -> CacheKey {
    CacheKey::new(name).unwrap()
}

/// Wraps the in-memory cache, records every operation as `"{op} {key}"` and
/// can be told to misbehave.
pub struct RecordingCacheClient {
    inner: Arc<InMemoryCacheProvider>,
    ops: Mutex<Vec<String>>,
    failing_get: Option<String>,
    compare_and_delete: bool,
    lose_add_race: bool,
}

impl RecordingCacheClient {
    /// Return a new instance on top of `inner`.
    pub fn new(inner: &Arc<InMemoryCacheProvider>) -> Self {
        Self {
            inner: Arc::clone(inner),
            ops: Mutex::default(),
            failing_get: None,
            compare_and_delete: true,
            lose_add_race: false,
        }
    }

    /// Fail `get` of this key with a backend error.
    pub fn failing_get(mut self, key: &str) -> Self {
        self.failing_get = Some(key.to_owned());
        self
    }

    /// Behave like a backend without compare-and-delete.
    pub fn without_compare_and_delete(mut self) -> Self {
        self.compare_and_delete = false;
        self
    }

    /// Report success for every `add`, but let a concurrent writer overwrite
    /// the value right after.
    pub fn losing_add_race(mut self) -> Self {
        self.lose_add_race = true;
        self
    }

    /// Recorded operations.
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    /// Return `true` if any recorded operation touched `key`.
    pub fn touched(&self, key: &str) -> bool {
        self.ops()
            .iter()
            .any(|op| op.split_once(' ').is_some_and(|(_, k)| k == key))
    }

    fn record(&self, op: &str, key: &CacheKey) {
        self.ops.lock().unwrap().push(format!("{op} {key}"));
    }

    /// Connector for a server that is down. Connect attempts are recorded as
    /// `"connect {endpoint}"` and `self` is never handed out.
    pub fn into_unreachable_connector(self) -> (Arc<Self>, Arc<dyn CacheConnector>) {
        let client = Arc::new(self);
        let connector = Arc::new(UnreachableConnector {
            client: Some(Arc::clone(&client)),
        });
        (client, connector)
    }

    /// Connector handing out `self`.
    pub fn into_connector(self) -> (Arc<Self>, Arc<dyn CacheConnector>) {
        let client = Arc::new(self);
        let connector = Arc::new(FixedConnector {
            client: Arc::clone(&client) as Arc<dyn CacheClient>,
        });
        (client, connector)
    }
}

#[async_trait::async_trait]
impl CacheClient for RecordingCacheClient {
    async fn add(&self, key: &CacheKey, value: &str, ttl: TimeToLive) -> Result<bool, CacheError> {
        self.record("add", key);
        if self.lose_add_race {
            self.inner.set(key, value, ttl).await?;
            self.inner.set(key, "interloper", ttl).await?;
            return Ok(true);
        }
        self.inner.add(key, value, ttl).await
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        self.record("get", key);
        if self.failing_get.as_deref() == Some(key.as_str()) {
            return Err(CacheErrorKind::Backend.error_with_msg("Connection reset."));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: TimeToLive) -> Result<(), CacheError> {
        self.record("set", key);
        self.inner.set(key, value, ttl).await
    }

    async fn replace(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: TimeToLive,
    ) -> Result<bool, CacheError> {
        self.record("replace", key);
        self.inner.replace(key, value, ttl).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        self.record("delete", key);
        self.inner.delete(key).await
    }

    fn supports_compare_and_delete(&self) -> bool {
        self.compare_and_delete
    }

    async fn delete_if_equals(&self, key: &CacheKey, expected: &str) -> Result<bool, CacheError> {
        self.record("delete_if_equals", key);
        if !self.compare_and_delete {
            return Err(CacheErrorKind::Unsupported.error());
        }
        self.inner.delete_if_equals(key, expected).await
    }
}

/// Hands out the same client on every connect.
struct FixedConnector {
    client: Arc<dyn CacheClient>,
}

#[async_trait::async_trait]
impl CacheConnector for FixedConnector {
    async fn connect(
        &self,
        _endpoint: &ServerEndpoint,
    ) -> Result<Arc<dyn CacheClient>, CacheError> {
        Ok(Arc::clone(&self.client))
    }
}

/// Connector for a server that is down.
#[derive(Default)]
pub struct UnreachableConnector {
    client: Option<Arc<RecordingCacheClient>>,
}

#[async_trait::async_trait]
impl CacheConnector for UnreachableConnector {
    async fn connect(&self, endpoint: &ServerEndpoint) -> Result<Arc<dyn CacheClient>, CacheError> {
        if let Some(client) = &self.client {
            client.ops.lock().unwrap().push(format!("connect {endpoint}"));
        }
        Err(CacheErrorKind::Unreachable.error_with_msg(format!("'{endpoint}': Connection refused")))
    }
}
