use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::cache::CacheCategory;

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum CacheOutcome {
    Hit,
    Miss,
    LoadFailed,
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum Endpoint {
    Leaderboard,
    Team,
    Contributors,
    ContributorsMini,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CacheLookup {
    pub category: CacheCategory,
    pub outcome: CacheOutcome,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct UpstreamRequest {
    pub endpoint: Endpoint,
    pub success: u32,
}

pub struct PrometheusClient {
    registry: Registry,
    cache_lookups: Family<CacheLookup, Counter>,
    upstream_request_duration: Family<UpstreamRequest, Histogram>,
}

impl Default for PrometheusClient {
    fn default() -> Self {
        let mut registry = Registry::default();
        let cache_lookups = Family::default();
        let upstream_request_duration: Family<UpstreamRequest, Histogram> =
            Family::new_with_constructor(|| {
                Histogram::new(
                    [0.05, 0.1, 0.25, 0.5, 1., 2.5, 5., 10., f64::INFINITY].into_iter(),
                )
            });

        registry.register(
            "cache_lookups",
            "Cache lookups by category and outcome",
            cache_lookups.clone(),
        );
        registry.register(
            "upstream_request_duration_seconds",
            "Time spent on upstream API requests",
            upstream_request_duration.clone(),
        );

        Self {
            registry,
            cache_lookups,
            upstream_request_duration,
        }
    }
}

impl PrometheusClient {
    pub fn record_lookup(&self, category: CacheCategory, outcome: CacheOutcome) {
        self.cache_lookups
            .get_or_create(&CacheLookup { category, outcome })
            .inc();
    }

    pub fn record_request(&self, endpoint: Endpoint, success: bool, elapsed: Duration) {
        self.upstream_request_duration
            .get_or_create(&UpstreamRequest {
                endpoint,
                success: success as u32,
            })
            .observe(elapsed.as_secs_f64());
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}
