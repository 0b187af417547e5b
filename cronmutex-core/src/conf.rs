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

//! Parsing of application configuration.

mod backend_config;
mod lock_config;
mod servers_config;

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use config::builder::BuilderState;
use config::builder::DefaultState;
use serde::Deserialize;
use serde::Serialize;

pub use self::backend_config::BackendConfig;
pub use self::backend_config::BackendImplementation;
pub use self::lock_config::LockConfig;
pub use self::lock_config::ReleaseMode;
pub use self::servers_config::ServerConfig;
pub use self::servers_config::ServersConfig;

/// Package name reported by Cargo at build time.
const CARGO_PKG_NAME: &str = env!("CARGO_PKG_NAME");
/// Package version reported by Cargo at build time.
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static trait for tracking implementations.
trait AppConfigDefaults {
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> Result<ConfigBuilder<T>, ConfigError>;
}

/**
Application configration root.

The application name defaults to the Rust package name, but can be overridden
with the environment variable `APP_NAME`.

Configuration will be loaded from

1. the file `{application name}.json` in the current working directory.
2. environment variable overrides in the form
   `{APPLICATION_NAME}_SECTION__KEY`, e.g. `CRONMUTEX_LOCK__TTL` or
   `CRONMUTEX_SERVERS__CACHE_EU__HOST`. Nested keys are separated by a double
   underscore, so names may contain single underscores.
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct AppConfig {
    /// Configuration of the cache backend.
    pub backend: BackendConfig,
    /// Configuration of lock and metadata expiry.
    pub lock: LockConfig,
    /// Named cache servers.
    pub servers: ServersConfig,

    /// Lower case application name. Ignored when loading configuration.
    #[serde(skip_deserializing)]
    app_name: String,
}

impl AppConfig {
    /// The application name defaults to the Rust package name, but can be
    /// overridden with the environment variable `APP_NAME`.
    fn read_app_name_lowercase(cargo_pkg_name: &str) -> String {
        std::env::var("APP_NAME")
            .map_err(|e| {
                log::trace!(
                    "Environment variable APP_NAME: {e:?} -> Default app name '{cargo_pkg_name}' will be used."
                );
            })
            .ok()
            .map(|value| value.to_lowercase())
            .unwrap_or(cargo_pkg_name.to_owned())
    }

    /// Lower case application name.
    pub fn app_name_lowercase(&self) -> &str {
        &self.app_name
    }

    /// SemVer application version derived fromt the Rust package version.
    pub fn app_version(&self) -> &'static str {
        CARGO_PKG_VERSION
    }

    /** Creates a new instance pre-populated with defaults, an optional
    configurations file and environment variable overrides.

    Use `env!("CARGO_PKG_NAME")` as `cargo_pkg_name`.
    */
    pub fn new(cargo_pkg_name: &str) -> Result<Self, ConfigError> {
        let app_name = Self::read_app_name_lowercase(cargo_pkg_name);
        let config_filename = app_name.to_owned() + ".json";
        let config_env_prefix = &app_name.to_uppercase();
        let conf_file = std::env::current_dir()
            .map_err(|e| ConfigError::Message(format!("Unable to get working directory: {e}")))?
            .join(config_filename);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Will load '{}' configuration if present.",
                conf_file.display()
            );
        }
        let conf_file = conf_file.to_str().ok_or_else(|| {
            ConfigError::Message(format!(
                "Configuration path '{}' is not valid UTF-8.",
                conf_file.display()
            ))
        })?;
        let config_builder = Self::defaults()?
            .add_source(File::with_name(conf_file).required(false))
            .add_source(Self::environment(config_env_prefix));
        Self::build(config_builder, app_name)
    }

    /// Environment variable overrides with `prefix`.
    fn environment(prefix: &str) -> Environment {
        Environment::with_prefix(prefix)
            .prefix_separator("_")
            .separator("__")
    }

    /// Configuration builder with defaults for all sections.
    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let mut config_builder = Config::builder();
        config_builder = BackendConfig::set_defaults(config_builder, "backend")?;
        config_builder = LockConfig::set_defaults(config_builder, "lock")?;
        config_builder = ServersConfig::set_defaults(config_builder, "servers")?;
        Ok(config_builder)
    }

    fn build(
        config_builder: ConfigBuilder<DefaultState>,
        app_name: String,
    ) -> Result<Self, ConfigError> {
        let mut app_config: AppConfig = config_builder.build()?.try_deserialize()?;
        app_config.app_name = app_name;
        app_config.lock.validate()?;
        log::debug!("Running with configuration: {app_config:?}");
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "Running with configuration: {}",
                serde_json::to_string(&app_config).unwrap_or_default()
            );
        }
        Ok(app_config)
    }

    /// Parse configuration from a JSON document on top of the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config_builder =
            Self::defaults()?.add_source(File::from_str(json, config::FileFormat::Json));
        Self::build(config_builder, CARGO_PKG_NAME.to_owned())
    }
}
