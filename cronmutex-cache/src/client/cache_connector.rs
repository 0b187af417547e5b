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

//! Establish connections to a cache.

use super::CacheClient;
use super::ServerEndpoint;
use crate::error::CacheError;
use std::sync::Arc;

/// Establish connections to a cache server.
///
/// A client only exists once connected, so there is no "not connected" state
/// to check for in [CacheClient] operations.
#[async_trait::async_trait]
pub trait CacheConnector: Send + Sync {
    /// Connect to the cache server at `endpoint`.
    ///
    /// Fails with [crate::error::CacheErrorKind::Unreachable] if the server
    /// can't be reached. Connection attempts are never retried.
    async fn connect(&self, endpoint: &ServerEndpoint) -> Result<Arc<dyn CacheClient>, CacheError>;
}
