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

//! Parsing of configuration for named cache servers.

use config::ConfigBuilder;
use config::ConfigError;
use config::builder::BuilderState;
use cronmutex_cache::client::ServerEndpoint;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

use super::AppConfigDefaults;

/// Address of a single cache server.
#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host name or IP address.
    host: String,
    /// TCP port.
    port: u16,
}

/// Cache servers by name.
///
/// A server named `default` pointing at `127.0.0.1:11211` is always present
/// unless overridden. Names are case-insensitive, since configuration keys are
/// lowercased when loaded.
#[derive(Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ServersConfig {
    servers: BTreeMap<String, ServerConfig>,
}

impl AppConfigDefaults for ServersConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError> {
        config_builder
            .set_default(prefix.to_string() + "." + "default.host", "127.0.0.1")?
            .set_default(prefix.to_string() + "." + "default.port", "11211")
    }
}

impl ServersConfig {
    /// Resolve a server name into an endpoint, ignoring case.
    pub fn resolve(&self, server_name: &str) -> Option<ServerEndpoint> {
        self.servers
            .get(&server_name.to_lowercase())
            .map(|server| ServerEndpoint::new(&server.host, server.port))
    }

    /// Names of all configured servers.
    pub fn names(&self) -> Vec<&str> {
        self.servers.keys().map(String::as_str).collect()
    }
}
