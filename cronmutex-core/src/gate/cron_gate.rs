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

//! Run-or-skip policy for scheduled tasks.

use super::GateDecision;
use super::SkipReason;
use crate::conf::AppConfig;
use crate::conf::BackendImplementation;
use crate::conf::LockConfig;
use crate::conf::ReleaseMode;
use crate::lock::LockStore;
use crate::lock::OwnershipToken;
use cronmutex_cache::CacheKey;
use cronmutex_cache::TimeToLive;
use cronmutex_cache::client::CacheConnector;
use cronmutex_cache::client::ServerEndpoint;
use cronmutex_cache_mem::InMemoryCacheProvider;
use cronmutex_cache_memcached::MemcachedCacheConnector;
use std::sync::Arc;

/// Return `true` if at least `min_delay_seconds` have passed between
/// `last_run_seconds` and `now_seconds`.
pub fn min_delay_elapsed(now_seconds: u64, last_run_seconds: u64, min_delay_seconds: u64) -> bool {
    i128::from(now_seconds) - i128::from(last_run_seconds) >= i128::from(min_delay_seconds)
}

/// Seconds from `last_run_seconds` to `now_seconds`, saturated to fit.
fn elapsed_seconds(now_seconds: u64, last_run_seconds: u64) -> i64 {
    let elapsed = i128::from(now_seconds) - i128::from(last_run_seconds);
    i64::try_from(elapsed).unwrap_or(if elapsed < 0 { i64::MIN } else { i64::MAX })
}

/** Decides whether this host should run a scheduled task now.

Many hosts may fire the same scheduled task at roughly the same time. The lock
serializes their decisions and is only held for the few moments the decision
takes. The time of the last run is kept in the lock's metadata record, which
outlives the lock, and a host only runs the task if at least the minimum delay
has passed since then.

```text
connect ──fail──▶ skip
   │ ok
acquire ──fail──▶ skip
   │ ok
last run ──too recent / unreadable──▶ release ─▶ skip
   │ absent or old enough
record run time ─▶ release ─▶ run
```

Every failure results in a skip. The only failures that don't are writing the
run time and releasing the lock. The lock TTL takes care of the latter.
*/
pub struct CronGate {
    connector: Arc<dyn CacheConnector>,
    lock_ttl: TimeToLive,
    metadata_ttl: TimeToLive,
    release_mode: ReleaseMode,
}

impl CronGate {
    /// Return a new instance using the configured cache backend.
    pub fn new(app_config: &AppConfig) -> Self {
        let connector: Arc<dyn CacheConnector> = match app_config.backend.implementation() {
            BackendImplementation::Memcached => {
                Arc::new(MemcachedCacheConnector::new(app_config.backend.timeout()))
            }
            BackendImplementation::Mem => {
                log::warn!("The in-mem cache is not shared with other hosts.");
                Arc::new(InMemoryCacheProvider::new().as_cache_connector())
            }
        };
        Self::with_connector(connector, &app_config.lock)
    }

    /// Return a new instance using the provided cache connector.
    pub fn with_connector(connector: Arc<dyn CacheConnector>, lock_config: &LockConfig) -> Self {
        Self {
            connector,
            lock_ttl: lock_config.ttl(),
            metadata_ttl: lock_config.metadata_ttl(),
            release_mode: lock_config.release_mode(),
        }
    }

    /// Decide whether the task guarded by the mutex `name` should run now.
    ///
    /// The task only runs if no other host is deciding at the same time and
    /// at least `min_delay_seconds` have passed since the last recorded run.
    pub async fn decide(
        &self,
        endpoint: &ServerEndpoint,
        name: &str,
        min_delay_seconds: u64,
    ) -> GateDecision {
        let start_ts_micros = cronmutex_cache::time::get_timestamp_micros();
        let decision = self.decide_once(endpoint, name, min_delay_seconds).await;
        log::debug!(
            "Decision for '{name}': {decision}. Took {} µs.",
            cronmutex_cache::time::get_timestamp_micros().saturating_sub(start_ts_micros)
        );
        decision
    }

    async fn decide_once(
        &self,
        endpoint: &ServerEndpoint,
        name: &str,
        min_delay_seconds: u64,
    ) -> GateDecision {
        let lock_name = match CacheKey::new(name)
            .and_then(|lock_name| LockStore::metadata_key(&lock_name).map(|_| lock_name))
        {
            Ok(lock_name) => lock_name,
            Err(e) => {
                log::error!("Invalid mutex name: {e}");
                return GateDecision::Skip(SkipReason::InvalidName);
            }
        };
        log::debug!("Connecting to '{endpoint}'.");
        let client = match self.connector.connect(endpoint).await {
            Ok(client) => client,
            Err(e) => {
                log::error!("Couldn't connect to cache: {e}");
                return GateDecision::Skip(SkipReason::Unreachable);
            }
        };
        log::debug!("Connected to '{endpoint}'.");
        let lock_store = LockStore::new(&client);
        let Some(token) = lock_store.acquire(&lock_name, self.lock_ttl).await else {
            return GateDecision::Skip(SkipReason::Contended);
        };
        let now_seconds = cronmutex_cache::time::get_timestamp_seconds();
        let decision = self
            .check_min_delay(&lock_store, &lock_name, now_seconds, min_delay_seconds)
            .await;
        if decision.should_run() {
            self.record_run_time(&lock_store, &lock_name, now_seconds).await;
        }
        self.release(&lock_store, &lock_name, &token).await;
        decision
    }

    /// Check the time of the last run while holding the lock.
    async fn check_min_delay(
        &self,
        lock_store: &LockStore,
        lock_name: &CacheKey,
        now_seconds: u64,
        min_delay_seconds: u64,
    ) -> GateDecision {
        let payload = match lock_store.get_metadata(lock_name).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                log::debug!("No previous run of '{lock_name}' recorded.");
                return GateDecision::Run;
            }
            Err(_) => return GateDecision::Skip(SkipReason::MetadataUnavailable),
        };
        let Ok(last_run_seconds) = payload.trim().parse::<u64>() else {
            log::warn!(
                "Ignoring unparsable time of last run of '{lock_name}': '{payload}'. It will be overwritten."
            );
            return GateDecision::Run;
        };
        if min_delay_elapsed(now_seconds, last_run_seconds, min_delay_seconds) {
            GateDecision::Run
        } else {
            GateDecision::Skip(SkipReason::TooSoon {
                elapsed_seconds: elapsed_seconds(now_seconds, last_run_seconds),
            })
        }
    }

    /// Best effort. The task runs even if this fails.
    async fn record_run_time(
        &self,
        lock_store: &LockStore,
        lock_name: &CacheKey,
        now_seconds: u64,
    ) {
        if !lock_store
            .set_metadata(lock_name, &now_seconds.to_string(), self.metadata_ttl)
            .await
        {
            log::warn!("Failed to record time of run of '{lock_name}'.");
        }
    }

    /// Best effort. The lock expires on its own.
    async fn release(
        &self,
        lock_store: &LockStore,
        lock_name: &CacheKey,
        token: &OwnershipToken,
    ) {
        match self.release_mode {
            ReleaseMode::Unconditional => lock_store.release(lock_name).await,
            ReleaseMode::OwnerChecked => lock_store.release_owned(lock_name, token).await,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use cronmutex_cache::client::CacheClient;
    use cronmutex_cache::time::get_timestamp_seconds;

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::new("127.0.0.1", 11211)
    }

    fn gate(connector: Arc<dyn CacheConnector>) -> CronGate {
        CronGate::with_connector(connector, &LockConfig::default())
    }

    #[test]
    fn min_delay_boundary_proceeds() {
        assert!(min_delay_elapsed(1_030, 1_000, 30));
        assert!(min_delay_elapsed(1_031, 1_000, 30));
        assert!(!min_delay_elapsed(1_029, 1_000, 30));
        assert!(min_delay_elapsed(1_000, 1_000, 0));
        // Last run recorded by a host with a clock that is ahead.
        assert!(!min_delay_elapsed(1_000, 1_005, 1));
        assert!(!min_delay_elapsed(0, u64::MAX, 0));
    }

    #[test]
    fn elapsed_seconds_saturates() {
        assert_eq!(elapsed_seconds(1_010, 1_000), 10);
        assert_eq!(elapsed_seconds(1_000, 1_010), -10);
        assert_eq!(elapsed_seconds(u64::MAX, 0), i64::MAX);
        assert_eq!(elapsed_seconds(0, u64::MAX), i64::MIN);
    }

    #[tokio::test]
    async fn unreachable_server_skips() {
        init_logger();
        let gate = gate(Arc::new(UnreachableConnector::default()));
        let decision = gate.decide(&endpoint(), "nightly", 30).await;
        assert_eq!(decision, GateDecision::Skip(SkipReason::Unreachable));
    }

    #[tokio::test]
    async fn unreachable_server_is_not_touched_after_connect() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let (client, connector) = RecordingCacheClient::new(&inmem).into_unreachable_connector();
        let decision = gate(connector).decide(&endpoint(), "nightly", 30).await;
        assert_eq!(decision, GateDecision::Skip(SkipReason::Unreachable));
        assert_eq!(client.ops(), vec!["connect 127.0.0.1:11211"]);
        assert_eq!(inmem.get(&key("nightly")).await.unwrap(), None);
        assert_eq!(inmem.get(&key("nightly-metadata")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn first_run_proceeds_with_longest_min_delay() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let gate = gate(Arc::new(inmem.as_cache_connector()));
        let longest = u64::from(TimeToLive::MAX_RELATIVE_SECONDS);
        assert_eq!(gate.decide(&endpoint(), "monthly", longest).await, GateDecision::Run);
        assert!(!gate.decide(&endpoint(), "monthly", longest).await.should_run());
        assert!(inmem.get(&key("monthly-metadata")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn first_run_proceeds_and_is_recorded() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let (client, connector) = RecordingCacheClient::new(&inmem).into_connector();
        let before = get_timestamp_seconds();
        let decision = gate(connector).decide(&endpoint(), "nightly", 30).await;
        assert_eq!(decision, GateDecision::Run);
        let recorded = inmem
            .get(&key("nightly-metadata"))
            .await
            .unwrap()
            .unwrap()
            .parse::<u64>()
            .unwrap();
        assert!(recorded >= before && recorded <= get_timestamp_seconds());
        assert_eq!(inmem.get(&key("nightly")).await.unwrap(), None);
        assert_eq!(
            client.ops(),
            vec![
                "add nightly",
                "get nightly",
                "get nightly-metadata",
                "replace nightly-metadata",
                "set nightly-metadata",
                "delete nightly",
            ]
        );
    }

    #[tokio::test]
    async fn recent_run_skips_and_releases() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let last_run = (get_timestamp_seconds() - 10).to_string();
        inmem
            .set(&key("nightly-metadata"), &last_run, TimeToLive::NEVER)
            .await
            .unwrap();
        let (client, connector) = RecordingCacheClient::new(&inmem).into_connector();
        let decision = gate(connector).decide(&endpoint(), "nightly", 30).await;
        match decision {
            GateDecision::Skip(SkipReason::TooSoon { elapsed_seconds }) => {
                assert!((10..=11).contains(&elapsed_seconds), "{elapsed_seconds}");
            }
            other => panic!("Unexpected decision {other:?}"),
        }
        assert_eq!(inmem.get(&key("nightly")).await.unwrap(), None);
        assert!(client.ops().contains(&"delete nightly".to_string()));
        assert_eq!(
            inmem.get(&key("nightly-metadata")).await.unwrap(),
            Some(last_run)
        );
    }

    #[tokio::test]
    async fn old_enough_run_proceeds() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let last_run = get_timestamp_seconds() - 30;
        inmem
            .set(&key("nightly-metadata"), &last_run.to_string(), TimeToLive::NEVER)
            .await
            .unwrap();
        let (_client, connector) = RecordingCacheClient::new(&inmem).into_connector();
        let decision = gate(connector).decide(&endpoint(), "nightly", 30).await;
        assert_eq!(decision, GateDecision::Run);
        let recorded = inmem
            .get(&key("nightly-metadata"))
            .await
            .unwrap()
            .unwrap()
            .parse::<u64>()
            .unwrap();
        assert!(recorded > last_run);
    }

    #[tokio::test]
    async fn held_lock_skips_without_touching_metadata() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        inmem
            .add(&key("nightly"), "other-host-token", TimeToLive::new(10))
            .await
            .unwrap();
        let (client, connector) = RecordingCacheClient::new(&inmem).into_connector();
        let decision = gate(connector).decide(&endpoint(), "nightly", 30).await;
        assert_eq!(decision, GateDecision::Skip(SkipReason::Contended));
        assert!(!client.touched("nightly-metadata"));
        assert_eq!(client.ops(), vec!["add nightly"]);
        assert_eq!(
            inmem.get(&key("nightly")).await.unwrap().as_deref(),
            Some("other-host-token")
        );
    }

    #[tokio::test]
    async fn second_invocation_within_delay_skips() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let gate = gate(Arc::new(inmem.as_cache_connector()));
        assert!(gate.decide(&endpoint(), "nightly", 30).await.should_run());
        assert!(!gate.decide(&endpoint(), "nightly", 30).await.should_run());
        assert!(gate.decide(&endpoint(), "nightly", 0).await.should_run());
    }

    #[tokio::test]
    async fn unreadable_metadata_skips_and_releases() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let (client, connector) = RecordingCacheClient::new(&inmem)
            .failing_get("nightly-metadata")
            .into_connector();
        let decision = gate(connector).decide(&endpoint(), "nightly", 30).await;
        assert_eq!(decision, GateDecision::Skip(SkipReason::MetadataUnavailable));
        assert_eq!(inmem.get(&key("nightly")).await.unwrap(), None);
        assert!(!client.ops().contains(&"set nightly-metadata".to_string()));
    }

    #[tokio::test]
    async fn unparsable_metadata_is_overwritten() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        inmem
            .set(&key("nightly-metadata"), "garbage", TimeToLive::NEVER)
            .await
            .unwrap();
        let gate = gate(Arc::new(inmem.as_cache_connector()));
        assert_eq!(gate.decide(&endpoint(), "nightly", 30).await, GateDecision::Run);
        let payload = inmem.get(&key("nightly-metadata")).await.unwrap().unwrap();
        assert!(payload.parse::<u64>().is_ok());
    }

    #[tokio::test]
    async fn future_metadata_skips() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let ahead = (get_timestamp_seconds() + 120).to_string();
        inmem
            .set(&key("nightly-metadata"), &ahead, TimeToLive::NEVER)
            .await
            .unwrap();
        let gate = gate(Arc::new(inmem.as_cache_connector()));
        let decision = gate.decide(&endpoint(), "nightly", 30).await;
        assert!(matches!(
            decision,
            GateDecision::Skip(SkipReason::TooSoon { elapsed_seconds }) if elapsed_seconds < 0
        ));
    }

    #[tokio::test]
    async fn invalid_name_skips_before_connecting() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let (client, connector) = RecordingCacheClient::new(&inmem).into_connector();
        let gate = gate(connector);
        assert_eq!(
            gate.decide(&endpoint(), "has space", 30).await,
            GateDecision::Skip(SkipReason::InvalidName)
        );
        let too_long = "n".repeat(CacheKey::MAX_LENGTH);
        assert_eq!(
            gate.decide(&endpoint(), &too_long, 30).await,
            GateDecision::Skip(SkipReason::InvalidName)
        );
        assert!(client.ops().is_empty());
    }

    #[tokio::test]
    async fn owner_checked_release_removes_own_lock() {
        init_logger();
        let inmem = InMemoryCacheProvider::new();
        let (client, connector) = RecordingCacheClient::new(&inmem).into_connector();
        let gate = CronGate::with_connector(
            connector,
            &LockConfig::new(10, TimeToLive::MAX_RELATIVE_SECONDS, ReleaseMode::OwnerChecked),
        );
        assert!(gate.decide(&endpoint(), "nightly", 30).await.should_run());
        assert_eq!(inmem.get(&key("nightly")).await.unwrap(), None);
        assert!(client.ops().contains(&"delete_if_equals nightly".to_string()));
    }
}
