//! Time-bounded memoization of upstream results.
//!
//! Every [`TtlCache`] holds one data category with its own time-to-live.
//! A key is in one of three states, see [`Freshness`]: a successful load
//! moves it to `Fresh`, elapsed time moves it to `Stale`, and a failed load
//! leaves it exactly as it was. Entries are written only once the loader
//! has produced a complete, normalized payload, so an abandoned or failed
//! load never leaves a partial entry behind.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use prometheus_client::encoding::EncodeLabelValue;
use shared::{Contributor, ContributorMini, Result, Team};
use strum::{AsRefStr, Display};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::prometheus::{CacheOutcome, PrometheusClient};

pub const LEADERBOARD_KEY: &str = "leaderboard";
pub const CONTRIBUTORS_KEY: &str = "contributors";
pub const CONTRIBUTORS_MINI_KEY: &str = "contributors_mini";

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CacheCategory {
    Leaderboard,
    Team,
    Contributors,
    ContributorsMini,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    Absent,
    Fresh,
    Stale,
}

/// What happens when several callers miss the same key at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Every caller runs its own loader; the last write wins.
    #[default]
    Concurrent,
    /// Callers queue on a per-key lock and re-check freshness after acquiring it.
    Exclusive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheSettings {
    pub leaderboard_ttl: Duration,
    pub team_ttl: Duration,
    pub contributors_ttl: Duration,
    pub load_policy: LoadPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            leaderboard_ttl: 30 * MINUTE,
            team_ttl: 30 * MINUTE,
            // Contributor data rarely changes and the endpoint is rate-limited
            contributors_ttl: 12 * HOUR,
            load_policy: LoadPolicy::default(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Leaderboard => self.leaderboard_ttl,
            CacheCategory::Team => self.team_ttl,
            CacheCategory::Contributors | CacheCategory::ContributorsMini => self.contributors_ttl,
        }
    }
}

struct CacheEntry<V> {
    cached_at: Instant,
    payload: V,
}

pub struct TtlCache<V> {
    category: CacheCategory,
    ttl: Duration,
    load_policy: LoadPolicy,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    key_locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
    prometheus: Arc<PrometheusClient>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(
        category: CacheCategory,
        ttl: Duration,
        load_policy: LoadPolicy,
        prometheus: Arc<PrometheusClient>,
    ) -> Self {
        Self {
            category,
            ttl,
            load_policy,
            entries: Default::default(),
            key_locks: Default::default(),
            prometheus,
        }
    }

    pub fn category(&self) -> CacheCategory {
        self.category
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the stored payload while it is younger than the ttl, otherwise
    /// runs `loader` and stores its result. Loader errors are returned as is
    /// and leave the existing entry untouched.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, loader: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(payload) = self.get_fresh(key).await {
            return Ok(payload);
        }

        let _guard = match self.load_policy {
            LoadPolicy::Concurrent => None,
            LoadPolicy::Exclusive => {
                let guard = self.key_lock(key).lock_owned().await;
                // Someone else may have loaded it while we waited
                if let Some(payload) = self.fresh(key).await {
                    debug!(category = %self.category, key, "Cache hit after waiting for load");
                    self.prometheus
                        .record_lookup(self.category, CacheOutcome::Hit);
                    return Ok(payload);
                }
                Some(guard)
            }
        };

        self.prometheus
            .record_lookup(self.category, CacheOutcome::Miss);
        let payload = match loader().await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(category = %self.category, key, "Failed to load cache entry: {e}");
                self.prometheus
                    .record_lookup(self.category, CacheOutcome::LoadFailed);
                return Err(e);
            }
        };

        self.entries.write().await.insert(
            key.to_owned(),
            CacheEntry {
                cached_at: Instant::now(),
                payload: payload.clone(),
            },
        );
        Ok(payload)
    }

    /// Stored payload if it is still fresh. Counts as a hit, a `None` is not
    /// counted since the caller decides whether to load.
    pub async fn get_fresh(&self, key: &str) -> Option<V> {
        let payload = self.fresh(key).await?;
        debug!(category = %self.category, key, "Cache hit");
        self.prometheus
            .record_lookup(self.category, CacheOutcome::Hit);
        Some(payload)
    }

    pub async fn freshness(&self, key: &str) -> Freshness {
        match self.entries.read().await.get(key) {
            None => Freshness::Absent,
            Some(entry) if self.is_fresh(entry) => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        }
    }

    /// Stored payload regardless of its age.
    pub async fn peek(&self, key: &str) -> Option<V> {
        self.entries
            .read()
            .await
            .get(key)
            .map(|entry| entry.payload.clone())
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
        self.prune_key_locks(|lock_key| lock_key == key);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
        self.prune_key_locks(|_| true);
    }

    async fn fresh(&self, key: &str) -> Option<V> {
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.payload.clone())
    }

    fn is_fresh(&self, entry: &CacheEntry<V>) -> bool {
        entry.cached_at.elapsed() < self.ttl
    }

    /// Drops matching locks nobody is holding or waiting on.
    fn prune_key_locks(&self, matches: impl Fn(&str) -> bool) {
        self.key_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|key, lock| !matches(key.as_str()) || Arc::strong_count(lock) > 1);
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.key_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.to_owned())
            .or_default()
            .clone()
    }
}

/// Process-wide store, one independent cache per data category.
pub struct CacheStore {
    pub leaderboard: TtlCache<Arc<Vec<Team>>>,
    /// Keyed by team slug.
    pub teams: TtlCache<Arc<Team>>,
    pub contributors: TtlCache<Arc<Vec<Contributor>>>,
    pub contributors_mini: TtlCache<Arc<Vec<ContributorMini>>>,
}

impl CacheStore {
    pub fn new(settings: CacheSettings, prometheus: Arc<PrometheusClient>) -> Self {
        Self {
            leaderboard: Self::cache(CacheCategory::Leaderboard, &settings, &prometheus),
            teams: Self::cache(CacheCategory::Team, &settings, &prometheus),
            contributors: Self::cache(CacheCategory::Contributors, &settings, &prometheus),
            contributors_mini: Self::cache(CacheCategory::ContributorsMini, &settings, &prometheus),
        }
    }

    fn cache<V: Clone>(
        category: CacheCategory,
        settings: &CacheSettings,
        prometheus: &Arc<PrometheusClient>,
    ) -> TtlCache<V> {
        TtlCache::new(
            category,
            settings.ttl(category),
            settings.load_policy,
            prometheus.clone(),
        )
    }

    pub async fn invalidate_all(&self) {
        self.leaderboard.clear().await;
        self.teams.clear().await;
        self.contributors.clear().await;
        self.contributors_mini.clear().await;
    }
}
