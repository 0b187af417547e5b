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

//! Named locks and their metadata sidecar on top of a shared cache.

use super::OwnershipToken;
use cronmutex_cache::CacheKey;
use cronmutex_cache::TimeToLive;
use cronmutex_cache::client::CacheClient;
use cronmutex_cache::error::CacheError;
use std::sync::Arc;

/** Non-blocking, TTL-bounded named locks on top of a shared cache.

Acquisition never waits: contention is reported immediately. A lock record
holds the [OwnershipToken] of its holder and is removed either by a release or
by the cache when its TTL elapses.

Each lock `name` has an independent metadata record `{name}-metadata` with its
own TTL. The existence of one says nothing about the other.
*/
pub struct LockStore {
    client: Arc<dyn CacheClient>,
}

impl LockStore {
    /// Appended to the lock name to form the metadata key.
    pub const METADATA_SUFFIX: &'static str = "-metadata";

    /// Return a new instance.
    pub fn new(client: &Arc<dyn CacheClient>) -> Self {
        Self {
            client: Arc::clone(client),
        }
    }

    /// Key of the metadata record that belongs to the lock `name`.
    pub fn metadata_key(name: &CacheKey) -> Result<CacheKey, CacheError> {
        name.with_suffix(Self::METADATA_SUFFIX)
    }

    /** Try to acquire the lock `name` for `ttl`.

    Writes a fresh [OwnershipToken] with create-if-absent and then reads it
    back. The lock is only held if the read back value is our token, since
    create-if-absent might report success to more than one concurrent writer on
    some backends.

    Returns `None` if the lock is held by someone else or if the cache failed.
    */
    pub async fn acquire(&self, name: &CacheKey, ttl: TimeToLive) -> Option<OwnershipToken> {
        let token = OwnershipToken::generate();
        log::debug!("acquire '{name}' for {ttl} with token '{token}'.");
        match self.client.add(name, token.as_str(), ttl).await {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("acquire '{name}': Already held by someone else.");
                return None;
            }
            Err(e) => {
                log::warn!("acquire '{name}': Create failed: {e}");
                return None;
            }
        }
        if !self.verify(name, &token).await {
            log::debug!("acquire '{name}': Read back check failed.");
            return None;
        }
        log::debug!("acquire '{name}': Success.");
        Some(token)
    }

    /// Return `true` if the lock record `name` holds `token`.
    pub async fn verify(&self, name: &CacheKey, token: &OwnershipToken) -> bool {
        match self.client.get(name).await {
            Ok(Some(value)) if value == token.as_str() => true,
            Ok(Some(value)) => {
                log::debug!("verify '{name}': Held by '{value}' instead of '{token}'.");
                false
            }
            Ok(None) => {
                log::debug!("verify '{name}': Lock record is gone.");
                false
            }
            Err(e) => {
                log::warn!("verify '{name}': Read failed: {e}");
                false
            }
        }
    }

    /** Release the lock `name` without checking ownership.

    Only call this after a successful [Self::acquire]. A holder that was
    delayed past the TTL will remove a lock that has since been acquired by
    someone else. See [Self::release_owned].
    */
    pub async fn release(&self, name: &CacheKey) -> bool {
        match self.client.delete(name).await {
            Ok(true) => {
                log::debug!("release '{name}': Success.");
                true
            }
            Ok(false) => {
                log::debug!("release '{name}': Lock record was already gone.");
                false
            }
            Err(e) => {
                log::debug!("release '{name}': Delete failed: {e}");
                false
            }
        }
    }

    /** Release the lock `name` only if it still holds `token`.

    Uses an atomic compare-and-delete when the cache supports it. Otherwise the
    lock is read and then deleted on a match, which narrows, but does not
    close, the window for removing someone else's lock.
    */
    pub async fn release_owned(&self, name: &CacheKey, token: &OwnershipToken) -> bool {
        let res = if self.client.supports_compare_and_delete() {
            self.client.delete_if_equals(name, token.as_str()).await
        } else {
            log::debug!("release '{name}': No compare-and-delete. Using read then delete.");
            if self.verify(name, token).await {
                self.client.delete(name).await
            } else {
                Ok(false)
            }
        };
        match res {
            Ok(true) => {
                log::debug!("release '{name}': Success.");
                true
            }
            Ok(false) => {
                log::debug!("release '{name}': Not held by '{token}'. Left in place.");
                false
            }
            Err(e) => {
                log::debug!("release '{name}': Delete failed: {e}");
                false
            }
        }
    }

    /// Return the metadata of lock `name` or `None` if there is none.
    pub async fn get_metadata(&self, name: &CacheKey) -> Result<Option<String>, CacheError> {
        let metadata_key = Self::metadata_key(name)?;
        let res = self.client.get(&metadata_key).await;
        match &res {
            Ok(Some(payload)) => log::debug!("get_metadata '{name}': '{payload}'."),
            Ok(None) => log::debug!("get_metadata '{name}': Absent."),
            Err(e) => log::warn!("get_metadata '{name}': Read failed: {e}"),
        }
        res
    }

    /** Store `payload` as metadata of the lock `name`.

    Updates an existing record and falls back to creating it. Returns `false`
    if neither worked.
    */
    pub async fn set_metadata(&self, name: &CacheKey, payload: &str, ttl: TimeToLive) -> bool {
        let metadata_key = match Self::metadata_key(name) {
            Ok(metadata_key) => metadata_key,
            Err(e) => {
                log::warn!("set_metadata '{name}': {e}");
                return false;
            }
        };
        log::debug!("set_metadata '{name}': '{payload}' for {ttl}.");
        match self.client.replace(&metadata_key, payload, ttl).await {
            Ok(true) => {
                log::debug!("set_metadata '{name}': Replaced.");
                return true;
            }
            Ok(false) => {}
            Err(e) => log::debug!("set_metadata '{name}': Replace failed: {e}"),
        }
        match self.client.set(&metadata_key, payload, ttl).await {
            Ok(()) => {
                log::debug!("set_metadata '{name}': Created.");
                true
            }
            Err(e) => {
                log::warn!("set_metadata '{name}': Write failed: {e}");
                false
            }
        }
    }
}
