use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{instrument, warn};

use crate::{Error, Result};

#[derive(Clone, Debug)]
pub struct Endpoints {
    pub leaderboard: Url,
    /// The slug is sent as the `id` query parameter.
    pub team: Url,
    pub contributors: Url,
    pub contributors_mini: Url,
}

#[derive(Clone, Debug)]
pub struct UpstreamClient {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl UpstreamClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self::with_client(reqwest::Client::new(), endpoints)
    }

    pub fn with_client(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Single GET decoded as JSON. Anything but 200 is an [`Error::Upstream`].
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: Url) -> Result<Value> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            // Dropping the response hands the connection back to the pool
            warn!("Upstream responded with {status}");
            return Err(Error::Upstream {
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_decode() {
                Error::MalformedData(format!("response body is not JSON: {e}"))
            } else {
                Error::Transport(e)
            }
        })
    }

    pub async fn leaderboard(&self) -> Result<Value> {
        self.fetch(self.endpoints.leaderboard.clone()).await
    }

    pub async fn team(&self, slug: &str) -> Result<Value> {
        self.fetch(self.team_url(slug)).await
    }

    pub async fn contributors(&self) -> Result<Value> {
        self.fetch(self.endpoints.contributors.clone()).await
    }

    pub async fn contributors_mini(&self) -> Result<Value> {
        self.fetch(self.endpoints.contributors_mini.clone()).await
    }

    fn team_url(&self, slug: &str) -> Url {
        let mut url = self.endpoints.team.clone();
        url.query_pairs_mut().append_pair("id", slug.trim());
        url
    }
}
