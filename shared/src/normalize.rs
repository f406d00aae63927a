//! Conversion of raw upstream payloads into the canonical records.
//!
//! Every function here is pure: the payload is decoded into a private
//! serde shape that mirrors one upstream endpoint and then mapped onto
//! [`Team`], [`User`], [`PullRequest`] or [`Contributor`]. A missing
//! required field or a field of the wrong type yields
//! [`Error::MalformedData`].

use chrono::{DateTime, Months, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Contributor, ContributorMini, Error, Pull, PullRequest, Result, StatusPolicy, Team, User,
};

/// Leaderboard rows only carry id, name, score and slug.
pub fn normalize_leaderboard(raw: Value) -> Result<Vec<Team>> {
    let payload: LeaderboardPayload = decode("leaderboard", raw)?;
    Ok(payload
        .teams
        .into_iter()
        .map(|team| Team::summary(team.id, team.name, team.slug, team.score))
        .collect())
}

pub fn normalize_team(raw: Value, policy: StatusPolicy) -> Result<Team> {
    let payload: TeamPayload = decode("team", raw)?;
    let team = payload.team;

    let members: Vec<User> = team.users.into_iter().map(Into::into).collect();
    let owner = team
        .owner_id
        .as_ref()
        .and_then(|owner_id| members.iter().find(|user| &user.id == owner_id))
        .cloned();

    let prs = team
        .prs
        .into_iter()
        .map(|pr| PullRequest {
            status: policy.classify(pr.status.as_deref()),
            id: pr.id,
            title: pr.title,
            url: pr.url,
            created_at: pr.created_at,
        })
        .collect();

    Ok(Team {
        id: team.id,
        name: team.name,
        slug: team.slug,
        score: team.score,
        owner_id: team.owner_id,
        owner,
        members,
        prs,
        github_team_id: team.github_team_id,
        allow_auto_assign: team.allow_auto_assign.unwrap_or_default(),
        disqualified: team.disqualified.unwrap_or_default(),
    })
}

pub fn normalize_contributor(raw: Value) -> Result<Contributor> {
    normalize_contributor_at(raw, Utc::now())
}

/// `as_of` anchors the "last 3 months" window.
pub fn normalize_contributor_at(raw: Value, as_of: DateTime<Utc>) -> Result<Contributor> {
    let contributor: RawContributor = decode("contributor", raw)?;
    contributor.into_contributor(as_of)
}

pub fn normalize_contributor_list(raw: Value) -> Result<Vec<Contributor>> {
    normalize_contributor_list_at(raw, Utc::now())
}

pub fn normalize_contributor_list_at(raw: Value, as_of: DateTime<Utc>) -> Result<Vec<Contributor>> {
    let payload: ListPayload<RawContributor> = decode("contributors", raw)?;
    payload
        .list
        .into_iter()
        .map(|contributor| contributor.into_contributor(as_of))
        .collect()
}

pub fn normalize_contributor_mini_list(raw: Value) -> Result<Vec<ContributorMini>> {
    let payload: ListPayload<RawContributorMini> = decode("contributors-mini", raw)?;
    Ok(payload
        .list
        .into_iter()
        .map(|c| ContributorMini {
            github: c.github,
            name: c.name,
            avatar_url: c.avatar_url,
        })
        .collect())
}

fn decode<T: DeserializeOwned>(what: &str, raw: Value) -> Result<T> {
    serde_json::from_value(raw).map_err(|e| Error::MalformedData(format!("{what}: {e}")))
}

#[derive(Deserialize)]
struct LeaderboardPayload {
    teams: Vec<RawTeamSummary>,
}

#[derive(Deserialize)]
struct RawTeamSummary {
    #[serde(deserialize_with = "id::deserialize")]
    id: String,
    name: String,
    score: u64,
    slug: String,
}

#[derive(Deserialize)]
struct TeamPayload {
    team: RawTeam,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTeam {
    #[serde(deserialize_with = "id::deserialize")]
    id: String,
    name: String,
    score: u64,
    slug: String,
    #[serde(default, deserialize_with = "id::option")]
    owner_id: Option<String>,
    #[serde(default, deserialize_with = "id::option")]
    github_team_id: Option<String>,
    #[serde(default)]
    allow_auto_assign: Option<bool>,
    #[serde(default)]
    disqualified: Option<bool>,
    users: Vec<RawUser>,
    prs: Vec<RawPullRequest>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    #[serde(deserialize_with = "id::deserialize")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    moderator: Option<bool>,
    handle: String,
    #[serde(default, deserialize_with = "id::option")]
    team_id: Option<String>,
    #[serde(default)]
    disqualified: Option<bool>,
    #[serde(default, deserialize_with = "id::option")]
    github_user_id: Option<String>,
}

impl From<RawUser> for User {
    fn from(user: RawUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
            handle: user.handle,
            image: user.image,
            email: user.email,
            moderator: user.moderator.unwrap_or_default(),
            disqualified: user.disqualified.unwrap_or_default(),
            team_id: user.team_id,
            github_user_id: user.github_user_id,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPullRequest {
    #[serde(deserialize_with = "id::deserialize")]
    id: String,
    #[serde(deserialize_with = "iso8601::deserialize")]
    created_at: DateTime<Utc>,
    title: String,
    url: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct ListPayload<T> {
    list: Vec<T>,
}

#[derive(Deserialize)]
struct RawContributor {
    github: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    avatar_url: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    github_followers: Option<u64>,
    #[serde(default)]
    discord: Option<String>,
    #[serde(default)]
    linkedin: Option<String>,
    #[serde(default)]
    twitter: Option<String>,
    #[serde(default)]
    activities_count: Option<u64>,
    #[serde(default)]
    activities_score: Option<f64>,
    #[serde(default)]
    orbit_level: Option<u64>,
    #[serde(default)]
    orbit_url: Option<String>,
    #[serde(default, deserialize_with = "iso8601::option")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pulls: Vec<RawPull>,
}

impl RawContributor {
    fn into_contributor(self, as_of: DateTime<Utc>) -> Result<Contributor> {
        let pulls = self
            .pulls
            .into_iter()
            .map(Pull::try_from)
            .collect::<Result<Vec<_>>>()?;
        let pulls_last_3_months = match as_of.checked_sub_months(Months::new(3)) {
            Some(cutoff) => pulls.iter().filter(|p| p.created_at >= cutoff).count(),
            None => pulls.len(),
        };

        Ok(Contributor {
            github: self.github,
            name: self.name,
            bio: self.bio,
            avatar_url: self.avatar_url,
            location: self.location,
            github_followers: self.github_followers,
            discord: self.discord,
            linkedin: self.linkedin,
            twitter: self.twitter,
            activities_count: self.activities_count,
            activities_score: self.activities_score,
            orbit_level: self.orbit_level,
            orbit_url: self.orbit_url,
            created_at: self.created_at,
            total_pulls: pulls.len(),
            pulls_last_3_months,
            pulls,
        })
    }
}

#[derive(Deserialize)]
struct RawPull {
    number: u64,
    title: String,
    /// GitHub pull objects carry both: `html_url` is the page, `url` the API resource.
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    state: String,
    #[serde(deserialize_with = "iso8601::deserialize")]
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "iso8601::option")]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "iso8601::option")]
    closed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "iso8601::option")]
    merged_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawPull> for Pull {
    type Error = Error;

    fn try_from(pull: RawPull) -> Result<Self> {
        let url = pull.html_url.or(pull.url).ok_or_else(|| {
            Error::MalformedData(format!("pull #{} has no url", pull.number))
        })?;

        Ok(Self {
            number: pull.number,
            title: pull.title,
            url,
            state: pull.state,
            created_at: pull.created_at,
            updated_at: pull.updated_at,
            closed_at: pull.closed_at,
            merged_at: pull.merged_at,
        })
    }
}

#[derive(Deserialize)]
struct RawContributorMini {
    github: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

// Upstream ids show up both as strings and as numbers.
mod id {
    use serde::{de::Error, Deserialize, Deserializer};
    use serde_json::Value;

    fn stringify<E: Error>(value: Value) -> Result<Option<String>, E> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(E::custom(format!("expected a string or numeric id, got {other}"))),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        stringify::<D::Error>(Value::deserialize(deserializer)?)?
            .ok_or_else(|| D::Error::custom("id must not be null"))
    }

    pub fn option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        stringify::<D::Error>(Value::deserialize(deserializer)?)
    }
}

mod iso8601 {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Ok(date.with_timezone(&Utc));
        }
        // Dates without an offset are taken as UTC
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|date| date.and_utc())
            .map_err(|e| format!("invalid ISO-8601 date `{raw}`: {e}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub fn option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => parse(&raw).map(Some).map_err(D::Error::custom),
        }
    }
}
