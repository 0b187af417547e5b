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

//! Memcached implementation of [CacheClient].

mod memcached_result_mapper;

use self::memcached_result_mapper::MemcachedResultMapper;
use cronmutex_cache::CacheKey;
use cronmutex_cache::TimeToLive;
use cronmutex_cache::client::CacheClient;
use cronmutex_cache::client::CacheConnector;
use cronmutex_cache::client::ServerEndpoint;
use cronmutex_cache::error::CacheError;
use cronmutex_cache::error::CacheErrorKind;
use memcache::MemcacheError;
use std::sync::Arc;
use std::time::Duration;

/// Memcached [CacheClient] implementation.
pub struct MemcachedProvider {
    /// Blocking memcached client.
    client: Arc<memcache::Client>,
    /// Server this instance is connected to.
    endpoint: ServerEndpoint,
}

impl MemcachedProvider {
    /// Connect to the memcached server at `endpoint`.
    ///
    /// The connection is verified with a `version` request. If that does not
    /// succeed within `timeout` the server is considered unreachable.
    pub async fn connect(
        endpoint: &ServerEndpoint,
        timeout: Duration,
    ) -> Result<Arc<Self>, CacheError> {
        let url = Self::connection_url(endpoint, timeout);
        log::debug!("Connecting to '{url}'.");
        let connect_future = tokio::task::spawn_blocking(move || {
            let client = memcache::Client::connect(url.as_str())?;
            let versions = client.version()?;
            Ok::<_, MemcacheError>((client, versions))
        });
        let (client, versions) = tokio::time::timeout(timeout, connect_future)
            .await
            .map_err(|_| {
                CacheErrorKind::Unreachable
                    .error_with_msg(format!("No answer from '{endpoint}' within {timeout:?}."))
            })?
            .map_err(|e| {
                CacheErrorKind::Unreachable
                    .error_with_msg(format!("Connection attempt to '{endpoint}' aborted: {e}"))
            })?
            .map_err(|e| {
                CacheErrorKind::Unreachable.error_with_msg(format!("'{endpoint}': {e}"))
            })?;
        if log::log_enabled!(log::Level::Debug) {
            for (server, version) in &versions {
                log::debug!("Connected to '{server}' running memcached {version}.");
            }
        }
        Ok(Arc::new(Self {
            client: Arc::new(client),
            endpoint: endpoint.to_owned(),
        }))
    }

    /// Client URL for `endpoint`.
    ///
    /// `connect_timeout` makes a refused or unroutable server fail the
    /// connection attempt instead of being retried by the connection pool.
    fn connection_url(endpoint: &ServerEndpoint, timeout: Duration) -> String {
        let seconds = timeout.as_secs().max(1);
        format!(
            "memcache://{endpoint}?connect_timeout={seconds}&timeout={seconds}&tcp_nodelay=true"
        )
    }

    /// Server this instance is connected to.
    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Run a blocking client call without stalling the async runtime.
    async fn with_client<T, F>(
        &self,
        operation: &str,
        f: F,
    ) -> Result<Result<T, MemcacheError>, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&memcache::Client) -> Result<T, MemcacheError> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || f(&client))
            .await
            .map_err(|e| {
                CacheErrorKind::Backend.error_with_msg(format!("Memcached {operation} aborted: {e}"))
            })
    }
}

#[async_trait::async_trait]
impl CacheClient for MemcachedProvider {
    async fn add(&self, key: &CacheKey, value: &str, ttl: TimeToLive) -> Result<bool, CacheError> {
        let (key, value) = (key.to_string(), value.to_owned());
        let res = self
            .with_client("add", move |client| {
                client.add(&key, value.as_str(), ttl.as_seconds())
            })
            .await?;
        MemcachedResultMapper::into_conditional("add", res, MemcachedResultMapper::is_key_exists)
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<String>, CacheError> {
        let key = key.to_string();
        self.with_client("get", move |client| client.get::<String>(&key))
            .await?
            .map_err(|e| MemcachedResultMapper::into_backend_error("get", e))
    }

    async fn set(&self, key: &CacheKey, value: &str, ttl: TimeToLive) -> Result<(), CacheError> {
        let (key, value) = (key.to_string(), value.to_owned());
        self.with_client("set", move |client| {
            client.set(&key, value.as_str(), ttl.as_seconds())
        })
        .await?
        .map_err(|e| MemcachedResultMapper::into_backend_error("set", e))
    }

    async fn replace(
        &self,
        key: &CacheKey,
        value: &str,
        ttl: TimeToLive,
    ) -> Result<bool, CacheError> {
        let (key, value) = (key.to_string(), value.to_owned());
        let res = self
            .with_client("replace", move |client| {
                client.replace(&key, value.as_str(), ttl.as_seconds())
            })
            .await?;
        MemcachedResultMapper::into_conditional(
            "replace",
            res,
            MemcachedResultMapper::is_key_not_found,
        )
    }

    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let key = key.to_string();
        self.with_client("delete", move |client| client.delete(&key))
            .await?
            .map_err(|e| MemcachedResultMapper::into_backend_error("delete", e))
    }
}

/// [CacheConnector] that opens a new [MemcachedProvider] per connect.
pub struct MemcachedCacheConnector {
    timeout: Duration,
}

impl MemcachedCacheConnector {
    /// Return a new instance.
    ///
    /// `timeout` bounds both connection establishment and each request.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl CacheConnector for MemcachedCacheConnector {
    async fn connect(&self, endpoint: &ServerEndpoint) -> Result<Arc<dyn CacheClient>, CacheError> {
        MemcachedProvider::connect(endpoint, self.timeout)
            .await
            .map(|provider| provider as Arc<dyn CacheClient>)
    }
}
