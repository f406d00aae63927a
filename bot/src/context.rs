use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use shared::{normalize, Contributor, ContributorMini, Result, StatusPolicy, Team};
use tracing::{info, instrument};

use crate::api::prometheus::{Endpoint, PrometheusClient};
use crate::api::UpstreamClient;
use crate::cache::{
    CacheSettings, CacheStore, CONTRIBUTORS_KEY, CONTRIBUTORS_MINI_KEY, LEADERBOARD_KEY,
};
use crate::query::{self, LeaderboardPage, DEFAULT_PAGE_SIZE};
use crate::search::{self, SearchMode, DEFAULT_SEARCH_LIMIT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuerySettings {
    pub page_size: usize,
    pub search_mode: SearchMode,
    pub search_limit: usize,
    pub status_policy: StatusPolicy,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_mode: SearchMode::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            status_policy: StatusPolicy::default(),
        }
    }
}

/// Entry points for the chat command layer. Cheap to clone, all clones share
/// one cache.
#[derive(Clone)]
pub struct Context {
    pub upstream: Arc<UpstreamClient>,
    pub cache: Arc<CacheStore>,
    pub prometheus: Arc<PrometheusClient>,
    pub settings: QuerySettings,
}

impl Context {
    pub fn new(
        upstream: UpstreamClient,
        cache_settings: CacheSettings,
        settings: QuerySettings,
        prometheus: Arc<PrometheusClient>,
    ) -> Self {
        Self {
            upstream: upstream.into(),
            cache: CacheStore::new(cache_settings, prometheus.clone()).into(),
            prometheus,
            settings,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_leaderboard_page(&self, page_number: i64) -> Result<LeaderboardPage> {
        let teams = self.leaderboard().await?;
        query::leaderboard_page(&teams, page_number, self.settings.page_size)
    }

    /// Fails with `NotFound` when the slug is not on the leaderboard. A team
    /// that is still fresh is served without consulting the leaderboard.
    #[instrument(skip(self))]
    pub async fn get_team(&self, slug: &str) -> Result<Arc<Team>> {
        if let Some(team) = self.cache.teams.get_fresh(slug.trim()).await {
            return Ok(team);
        }

        let teams = self.leaderboard().await?;
        let slug = query::find_team(&teams, slug)?.slug.as_str();

        self.cache
            .teams
            .get_or_fetch(slug, move || async move {
                let raw = self
                    .timed(Endpoint::Team, self.upstream.team(slug))
                    .await?;
                let team = normalize::normalize_team(raw, self.settings.status_policy)?;
                info!("Loaded team {} with {} PRs", team.slug, team.prs.len());
                Ok(Arc::new(team))
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn search_teams(&self, query: &str) -> Result<Vec<Team>> {
        let teams = self.leaderboard().await?;
        let ranked: Vec<Team> = query::rank_teams(&teams)
            .into_iter()
            .map(|entry| entry.team)
            .collect();
        Ok(search::search_teams(
            &ranked,
            query,
            self.settings.search_mode,
            self.settings.search_limit,
        ))
    }

    #[instrument(skip(self))]
    pub async fn get_contributor(&self, handle: &str) -> Result<Contributor> {
        let contributors = self.contributors().await?;
        query::find_contributor(&contributors, handle).cloned()
    }

    #[instrument(skip(self))]
    pub async fn get_random_contributor(&self) -> Result<Contributor> {
        let contributors = self.contributors().await?;
        query::random_contributor(&contributors, &mut rand::thread_rng()).cloned()
    }

    #[instrument(skip(self))]
    pub async fn get_contributor_handles(&self, prefix: &str) -> Result<Vec<ContributorMini>> {
        let minis = self
            .cache
            .contributors_mini
            .get_or_fetch(CONTRIBUTORS_MINI_KEY, move || async move {
                let raw = self
                    .timed(Endpoint::ContributorsMini, self.upstream.contributors_mini())
                    .await?;
                let minis = normalize::normalize_contributor_mini_list(raw)?;
                info!("Loaded {} contributor handles", minis.len());
                Ok(Arc::new(minis))
            })
            .await?;

        Ok(query::matching_handles(&minis, prefix, self.settings.search_limit)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Loads the leaderboard and contributors unless they are still fresh.
    #[instrument(skip(self))]
    pub async fn warm_up(&self) -> Result<()> {
        let (leaderboard, contributors) =
            futures::future::join(self.leaderboard(), self.contributors()).await;
        leaderboard?;
        contributors?;
        Ok(())
    }

    async fn leaderboard(&self) -> Result<Arc<Vec<Team>>> {
        self.cache
            .leaderboard
            .get_or_fetch(LEADERBOARD_KEY, move || async move {
                let raw = self
                    .timed(Endpoint::Leaderboard, self.upstream.leaderboard())
                    .await?;
                let teams = normalize::normalize_leaderboard(raw)?;
                info!("Loaded leaderboard with {} teams", teams.len());
                Ok(Arc::new(teams))
            })
            .await
    }

    async fn contributors(&self) -> Result<Arc<Vec<Contributor>>> {
        self.cache
            .contributors
            .get_or_fetch(CONTRIBUTORS_KEY, move || async move {
                let raw = self
                    .timed(Endpoint::Contributors, self.upstream.contributors())
                    .await?;
                let contributors = normalize::normalize_contributor_list(raw)?;
                info!("Loaded {} contributors", contributors.len());
                Ok(Arc::new(contributors))
            })
            .await
    }

    async fn timed<T>(
        &self,
        endpoint: Endpoint,
        request: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let started = Instant::now();
        let result = request.await;
        self.prometheus
            .record_request(endpoint, result.is_ok(), started.elapsed());
        result
    }
}
