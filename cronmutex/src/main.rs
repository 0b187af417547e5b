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

use clap::Parser;
use cronmutex_core::AppConfig;
use cronmutex_core::CronGate;
use cronmutex_core::GateDecision;
use cronmutex_core::ServerEndpoint;
use std::process::ExitCode;

/// Longest meaningful minimum delay. The time of the last run is only
/// remembered for this long.
const MAX_MIN_DELAY_SECONDS: u64 = 2_592_000;

/// Exit with status 0 if this host should run the task now, 1 otherwise.
#[derive(Debug, Parser)]
#[command(version, about, after_help = "Example: cronmutex default nightly-report 30 && /bin/task")]
struct Cli {
    /// Write diagnostics to stderr.
    #[arg(short, long)]
    verbose: bool,
    /// Name of the configured cache server.
    server_name: String,
    /// Unique name of the mutex.
    mutex_name: String,
    /// Minimum time in seconds since the last run of the task. Max 2592000 (30 days).
    #[arg(value_parser = clap::value_parser!(u64).range(0..=MAX_MIN_DELAY_SECONDS))]
    min_delay_seconds: u64,
}

/// Application main entrypoint.
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors and --help both mean "don't run".
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logger(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    let app_config = match AppConfig::new(env!("CARGO_PKG_NAME")) {
        Ok(app_config) => app_config,
        Err(e) => {
            log::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let Some(endpoint) = app_config.servers.resolve(&cli.server_name) else {
        log::error!(
            "Invalid server name '{}'. Configured servers: {}",
            cli.server_name,
            app_config.servers.names().join(", ")
        );
        return ExitCode::FAILURE;
    };
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let decision = runtime.block_on(run_async(
        &app_config,
        &endpoint,
        &cli.mutex_name,
        cli.min_delay_seconds,
    ));
    // Don't wait for an abandoned connection attempt.
    runtime.shutdown_background();
    if decision.should_run() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Initialize the logging system and apply filters.
///
/// Logs are written to stderr, since stdout belongs to whatever cron does
/// with it.
fn init_logger(verbose: bool) -> Result<(), log::SetLoggerError> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::builder()
        // Set default log level
        .filter_level(level)
        // Connection failures are already reported by the gate
        .filter(Some("r2d2"), log::LevelFilter::Off)
        .write_style(env_logger::fmt::WriteStyle::Auto)
        .target(env_logger::fmt::Target::Stderr)
        .is_test(false)
        .parse_env(
            env_logger::Env::new()
                .filter("LOG_LEVEL")
                .write_style("LOG_STYLE"),
        )
        .try_init()
}

/// Async code entry point.
async fn run_async(
    app_config: &AppConfig,
    endpoint: &ServerEndpoint,
    mutex_name: &str,
    min_delay_seconds: u64,
) -> GateDecision {
    log::debug!(
        "{} {} deciding on '{mutex_name}' with min delay {min_delay_seconds} s.",
        app_config.app_name_lowercase(),
        app_config.app_version()
    );
    CronGate::new(app_config)
        .decide(endpoint, mutex_name, min_delay_seconds)
        .await
}
