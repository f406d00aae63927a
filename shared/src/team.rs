use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub type TeamSlug = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub handle: String,
    pub image: Option<String>,
    pub email: Option<String>,
    pub moderator: bool,
    pub disqualified: bool,
    /// Id of the team the user joined. Lookup only.
    pub team_id: Option<String>,
    pub github_user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PrStatus {
    Accepted,
    Deleted,
    Unknown,
}

/// How pull requests without a recognised status get classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StatusPolicy {
    #[default]
    AssumeAccepted,
    Unknown,
}

impl StatusPolicy {
    pub fn classify(&self, status: Option<&str>) -> PrStatus {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("accepted") => PrStatus::Accepted,
            Some("deleted") => PrStatus::Deleted,
            _ => match self {
                StatusPolicy::AssumeAccepted => PrStatus::Accepted,
                StatusPolicy::Unknown => PrStatus::Unknown,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: PrStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub slug: TeamSlug,
    /// Total of accepted pull requests.
    pub score: u64,
    pub owner_id: Option<String>,
    pub owner: Option<User>,
    pub members: Vec<User>,
    pub prs: Vec<PullRequest>,
    pub github_team_id: Option<String>,
    pub allow_auto_assign: bool,
    pub disqualified: bool,
}

impl Team {
    /// A leaderboard row: detail fields stay empty.
    pub fn summary(id: String, name: String, slug: TeamSlug, score: u64) -> Self {
        Self {
            id,
            name,
            slug,
            score,
            owner_id: None,
            owner: None,
            members: vec![],
            prs: vec![],
            github_team_id: None,
            allow_auto_assign: false,
            disqualified: false,
        }
    }

    pub fn pr_stats(&self) -> PrStats {
        self.prs
            .iter()
            .fold(PrStats::default(), |mut stats, pr| {
                match pr.status {
                    PrStatus::Accepted => stats.accepted += 1,
                    PrStatus::Deleted => stats.deleted += 1,
                    PrStatus::Unknown => stats.unknown += 1,
                }
                stats
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrStats {
    pub accepted: u32,
    pub deleted: u32,
    pub unknown: u32,
}

impl PrStats {
    pub fn total(&self) -> u32 {
        self.accepted + self.deleted + self.unknown
    }

    // Unknown statuses are left out of the ratio
    pub fn acceptance_ratio(&self) -> Option<f64> {
        let known = self.accepted + self.deleted;
        if known == 0 {
            return None;
        }
        Some(self.accepted as f64 / known as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(status: PrStatus) -> PullRequest {
        PullRequest {
            id: "pr".to_string(),
            title: "title".to_string(),
            url: "https://github.com/a/b/pull/1".to_string(),
            created_at: chrono::Utc::now(),
            status,
        }
    }

    #[test]
    fn classify_known_statuses_regardless_of_case() {
        for policy in [StatusPolicy::AssumeAccepted, StatusPolicy::Unknown] {
            assert_eq!(policy.classify(Some("ACCEPTED")), PrStatus::Accepted);
            assert_eq!(policy.classify(Some("deleted")), PrStatus::Deleted);
        }
    }

    #[test]
    fn classify_missing_status_follows_policy() {
        assert_eq!(
            StatusPolicy::AssumeAccepted.classify(None),
            PrStatus::Accepted
        );
        assert_eq!(StatusPolicy::Unknown.classify(None), PrStatus::Unknown);
        assert_eq!(
            StatusPolicy::Unknown.classify(Some("spam")),
            PrStatus::Unknown
        );
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "assume-accepted".parse::<StatusPolicy>().unwrap(),
            StatusPolicy::AssumeAccepted
        );
        assert_eq!(
            "unknown".parse::<StatusPolicy>().unwrap(),
            StatusPolicy::Unknown
        );
        assert!("maybe".parse::<StatusPolicy>().is_err());
    }

    #[test]
    fn ratio_ignores_unknown_statuses() {
        let mut team = Team::summary("1".into(), "A".into(), "a".into(), 2);
        team.prs = vec![
            pr(PrStatus::Accepted),
            pr(PrStatus::Accepted),
            pr(PrStatus::Accepted),
            pr(PrStatus::Deleted),
            pr(PrStatus::Unknown),
        ];

        let stats = team.pr_stats();
        assert_eq!(stats.total(), 5);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.acceptance_ratio(), Some(0.75));
    }

    #[test]
    fn ratio_is_absent_without_known_statuses() {
        let mut team = Team::summary("1".into(), "A".into(), "a".into(), 0);
        assert_eq!(team.pr_stats().acceptance_ratio(), None);

        team.prs = vec![pr(PrStatus::Unknown)];
        assert_eq!(team.pr_stats().acceptance_ratio(), None);
    }
}
