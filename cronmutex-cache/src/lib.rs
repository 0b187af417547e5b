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

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod client {
    //! Connected cache clients.

    mod cache_client;
    mod cache_connector;
    mod server_endpoint;

    pub use self::cache_client::CacheClient;
    pub use self::cache_connector::CacheConnector;
    pub use self::server_endpoint::ServerEndpoint;
}
pub mod error {
    //! Cache errors.

    mod cache_error;

    pub use self::cache_error::CacheError;
    pub use self::cache_error::CacheErrorKind;
}
mod cache_key;
pub mod time;
mod time_to_live;

pub use self::cache_key::CacheKey;
pub use self::time_to_live::TimeToLive;
