use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::GithubHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pull {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl Pull {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub github: GithubHandle,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: String,
    pub location: Option<String>,
    pub github_followers: Option<u64>,
    pub discord: Option<String>,
    pub linkedin: Option<String>,
    pub twitter: Option<String>,
    pub activities_count: Option<u64>,
    pub activities_score: Option<f64>,
    pub orbit_level: Option<u64>,
    pub orbit_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub total_pulls: usize,
    pub pulls_last_3_months: usize,
    pub pulls: Vec<Pull>,
}

impl Contributor {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.github)
    }

    /// Most recently created pulls first.
    pub fn last_pulls(&self, amount: usize) -> Vec<&Pull> {
        let mut pulls: Vec<&Pull> = self.pulls.iter().collect();
        pulls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pulls.truncate(amount);
        pulls
    }
}

/// Entry of the reduced listing, enough for autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorMini {
    pub github: GithubHandle,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}
