use std::time::Duration;

use anyhow::Context as _;
use reqwest::Url;
use serde::Deserialize;
use shared::StatusPolicy;

use crate::api::Endpoints;
use crate::cache::{CacheSettings, LoadPolicy};
use crate::context::QuerySettings;
use crate::query::DEFAULT_PAGE_SIZE;
use crate::search::{SearchMode, DEFAULT_SEARCH_LIMIT};

#[derive(Debug, Deserialize)]
pub struct Env {
    #[serde(default = "default_leaderboard_url")]
    pub leaderboard_url: String,
    #[serde(default = "default_team_url")]
    pub team_url: String,
    #[serde(default = "default_contributors_url")]
    pub contributors_url: String,
    #[serde(default = "default_contributors_mini_url")]
    pub contributors_mini_url: String,

    #[serde(default = "default_ttl_in_minutes")]
    pub leaderboard_ttl_in_minutes: u64,
    #[serde(default = "default_ttl_in_minutes")]
    pub team_ttl_in_minutes: u64,
    #[serde(default = "default_contributors_ttl_in_hours")]
    pub contributors_ttl_in_hours: u64,
    #[serde(default)]
    pub exclusive_loads: bool,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_search_mode")]
    pub search_mode: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_pr_status_policy")]
    pub pr_status_policy: String,

    pub warmup_interval_in_minutes: Option<u64>,
    pub discord_webhook_url: Option<String>,
}

fn default_leaderboard_url() -> String {
    "https://www.hacksquad.dev/api/leaderboard".to_string()
}

fn default_team_url() -> String {
    "https://www.hacksquad.dev/api/team".to_string()
}

fn default_contributors_url() -> String {
    "https://contributors.novu.co/contributors".to_string()
}

fn default_contributors_mini_url() -> String {
    "https://contributors.novu.co/contributors-mini".to_string()
}

fn default_ttl_in_minutes() -> u64 {
    30
}

fn default_contributors_ttl_in_hours() -> u64 {
    12
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_search_mode() -> String {
    SearchMode::default().to_string()
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_pr_status_policy() -> String {
    StatusPolicy::default().to_string()
}

impl Env {
    pub fn from_env() -> anyhow::Result<Self> {
        envy::from_env::<Env>().context("Failed to load environment variables")
    }

    pub fn endpoints(&self) -> anyhow::Result<Endpoints> {
        let parse = |name: &str, url: &str| {
            Url::parse(url).with_context(|| format!("Invalid {name}: {url}"))
        };

        Ok(Endpoints {
            leaderboard: parse("LEADERBOARD_URL", &self.leaderboard_url)?,
            team: parse("TEAM_URL", &self.team_url)?,
            contributors: parse("CONTRIBUTORS_URL", &self.contributors_url)?,
            contributors_mini: parse("CONTRIBUTORS_MINI_URL", &self.contributors_mini_url)?,
        })
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            leaderboard_ttl: Duration::from_secs(self.leaderboard_ttl_in_minutes * 60),
            team_ttl: Duration::from_secs(self.team_ttl_in_minutes * 60),
            contributors_ttl: Duration::from_secs(self.contributors_ttl_in_hours * 60 * 60),
            load_policy: if self.exclusive_loads {
                LoadPolicy::Exclusive
            } else {
                LoadPolicy::Concurrent
            },
        }
    }

    pub fn query_settings(&self) -> anyhow::Result<QuerySettings> {
        Ok(QuerySettings {
            page_size: self.page_size.max(1),
            search_mode: self
                .search_mode
                .parse()
                .with_context(|| format!("Invalid SEARCH_MODE: {}", self.search_mode))?,
            search_limit: self.search_limit,
            status_policy: self
                .pr_status_policy
                .parse()
                .with_context(|| format!("Invalid PR_STATUS_POLICY: {}", self.pr_status_policy))?,
        })
    }

    pub fn warmup_interval(&self) -> Option<Duration> {
        self.warmup_interval_in_minutes
            .filter(|minutes| *minutes > 0)
            .map(|minutes| Duration::from_secs(minutes * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_env(vars: &[(&str, &str)]) -> anyhow::Result<Env> {
        Ok(envy::from_iter(
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )?)
    }

    #[test]
    fn defaults_match_hacksquad() {
        let env = load_env(&[]).unwrap();

        let endpoints = env.endpoints().unwrap();
        assert_eq!(endpoints.team.as_str(), "https://www.hacksquad.dev/api/team");
        assert_eq!(env.cache_settings(), CacheSettings::default());
        assert_eq!(env.query_settings().unwrap(), QuerySettings::default());
        assert_eq!(env.warmup_interval(), None);
        assert_eq!(env.discord_webhook_url, None);
    }

    #[test]
    fn overrides_are_applied() {
        let env = load_env(&[
            ("LEADERBOARD_TTL_IN_MINUTES", "5"),
            ("CONTRIBUTORS_TTL_IN_HOURS", "1"),
            ("EXCLUSIVE_LOADS", "true"),
            ("SEARCH_MODE", "substring"),
            ("PR_STATUS_POLICY", "unknown"),
            ("PAGE_SIZE", "0"),
            ("WARMUP_INTERVAL_IN_MINUTES", "15"),
        ])
        .unwrap();

        let cache = env.cache_settings();
        assert_eq!(cache.leaderboard_ttl, Duration::from_secs(300));
        assert_eq!(cache.contributors_ttl, Duration::from_secs(3600));
        assert_eq!(cache.load_policy, LoadPolicy::Exclusive);

        let query = env.query_settings().unwrap();
        assert_eq!(query.search_mode, SearchMode::Substring);
        assert_eq!(query.status_policy, StatusPolicy::Unknown);
        assert_eq!(query.page_size, 1);

        assert_eq!(env.warmup_interval(), Some(Duration::from_secs(900)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let env = load_env(&[("SEARCH_MODE", "regex")]).unwrap();
        assert!(env.query_settings().is_err());

        let env = load_env(&[("TEAM_URL", "not a url")]).unwrap();
        assert!(env.endpoints().is_err());

        assert!(load_env(&[("PAGE_SIZE", "ten")]).is_err());
    }
}
