use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use shared::{Contributor, ContributorMini, EntityKind, Error, Result, Team};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedTeam {
    /// 1-based position on the leaderboard.
    pub rank: usize,
    pub team: Team,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeaderboardPage {
    pub entries: Vec<RankedTeam>,
    pub page: usize,
    pub total_pages: usize,
    pub total_teams: usize,
}

/// Score descending. Equal scores keep their upstream order.
pub fn rank_teams(teams: &[Team]) -> Vec<RankedTeam> {
    teams
        .iter()
        .sorted_by(|a, b| b.score.cmp(&a.score))
        .enumerate()
        .map(|(index, team)| RankedTeam {
            rank: index + 1,
            team: team.clone(),
        })
        .collect()
}

/// Pages past the end are clamped to the last one.
pub fn leaderboard_page(
    teams: &[Team],
    page_number: i64,
    page_size: usize,
) -> Result<LeaderboardPage> {
    if page_number <= 0 {
        return Err(Error::InvalidPage(page_number));
    }
    let page_size = page_size.max(1);

    let total_teams = teams.len();
    let extra_page = if total_teams % page_size == 0 { 0 } else { 1 };
    let total_pages = (total_teams / page_size + extra_page).max(1);
    let page = usize::try_from(page_number)
        .unwrap_or(usize::MAX)
        .min(total_pages);

    let entries = rank_teams(teams)
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Ok(LeaderboardPage {
        entries,
        page,
        total_pages,
        total_teams,
    })
}

pub fn find_team<'a>(teams: &'a [Team], slug: &str) -> Result<&'a Team> {
    let slug = slug.trim();
    teams
        .iter()
        .find(|team| team.slug == slug)
        .ok_or_else(|| Error::not_found(EntityKind::Team, slug))
}

pub fn find_contributor<'a>(contributors: &'a [Contributor], handle: &str) -> Result<&'a Contributor> {
    let handle = handle.trim().trim_start_matches('@');
    contributors
        .iter()
        .find(|contributor| contributor.github.eq_ignore_ascii_case(handle))
        .ok_or_else(|| Error::not_found(EntityKind::Contributor, handle))
}

pub fn random_contributor<'a, R: Rng + ?Sized>(
    contributors: &'a [Contributor],
    rng: &mut R,
) -> Result<&'a Contributor> {
    contributors
        .choose(rng)
        .ok_or_else(|| Error::not_found(EntityKind::Contributor, "<random>"))
}

/// Case-insensitive handle prefix match, for autocomplete.
pub fn matching_handles<'a>(
    contributors: &'a [ContributorMini],
    prefix: &str,
    limit: usize,
) -> Vec<&'a ContributorMini> {
    let prefix = prefix.trim().to_lowercase();
    contributors
        .iter()
        .filter(|contributor| contributor.github.to_lowercase().starts_with(&prefix))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn team(id: &str, score: u64) -> Team {
        Team::summary(id.to_string(), id.to_uppercase(), id.to_string(), score)
    }

    fn contributor(github: &str) -> Contributor {
        Contributor {
            github: github.to_string(),
            name: None,
            bio: None,
            avatar_url: format!("https://github.com/{github}.png"),
            location: None,
            github_followers: None,
            discord: None,
            linkedin: None,
            twitter: None,
            activities_count: None,
            activities_score: None,
            orbit_level: None,
            orbit_url: None,
            created_at: None,
            total_pulls: 0,
            pulls_last_3_months: 0,
            pulls: vec![],
        }
    }

    fn slugs(page: &LeaderboardPage) -> Vec<&str> {
        page.entries.iter().map(|e| e.team.slug.as_str()).collect()
    }

    #[test]
    fn ties_keep_upstream_order() {
        let teams = vec![team("a", 5), team("b", 5), team("c", 9)];

        let page = leaderboard_page(&teams, 1, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(slugs(&page), vec!["c", "a", "b"]);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_teams, 3);
        let ranks: Vec<usize> = page.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn ranking_is_sorted_by_score() {
        let teams: Vec<Team> = (0..25)
            .map(|i| team(&format!("t{i}"), (i * 7 % 11) as u64))
            .collect();

        let ranked = rank_teams(&teams);
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].team.score >= pair[1].team.score));
    }

    #[test]
    fn pages_split_by_page_size() {
        let teams: Vec<Team> = (0..23).map(|i| team(&format!("t{i}"), 100 - i)).collect();

        let second = leaderboard_page(&teams, 2, 10).unwrap();
        assert_eq!(second.total_pages, 3);
        assert_eq!(second.entries.len(), 10);
        assert_eq!(second.entries[0].rank, 11);

        let last = leaderboard_page(&teams, 3, 10).unwrap();
        assert_eq!(last.entries.len(), 3);
    }

    #[test]
    fn page_beyond_last_is_clamped() {
        let teams: Vec<Team> = (0..23).map(|i| team(&format!("t{i}"), 100 - i)).collect();

        let last = leaderboard_page(&teams, 3, 10).unwrap();
        assert_eq!(leaderboard_page(&teams, 4, 10).unwrap(), last);
        assert_eq!(leaderboard_page(&teams, i64::MAX, 10).unwrap(), last);
    }

    #[test]
    fn non_positive_page_is_invalid() {
        let teams = vec![team("a", 1)];

        assert!(matches!(
            leaderboard_page(&teams, 0, 10),
            Err(Error::InvalidPage(0))
        ));
        assert!(matches!(
            leaderboard_page(&teams, -3, 10),
            Err(Error::InvalidPage(-3))
        ));
    }

    #[test]
    fn empty_leaderboard_has_one_empty_page() {
        let page = leaderboard_page(&[], 5, 10).unwrap();

        assert!(page.entries.is_empty());
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn find_team_by_slug() {
        let teams = vec![team("alpha", 1), team("beta", 2)];

        assert_eq!(find_team(&teams, " beta").unwrap().score, 2);
        assert!(matches!(
            find_team(&teams, "gamma"),
            Err(Error::NotFound {
                kind: EntityKind::Team,
                ..
            })
        ));
    }

    #[test]
    fn find_contributor_ignores_case() {
        let contributors = vec![contributor("OctoCat"), contributor("hubot")];

        assert_eq!(
            find_contributor(&contributors, "octocat").unwrap().github,
            "OctoCat"
        );
        assert_eq!(
            find_contributor(&contributors, "@HUBOT").unwrap().github,
            "hubot"
        );
        assert!(find_contributor(&contributors, "nobody").is_err());
    }

    #[test]
    fn random_contributor_covers_the_whole_set() {
        let contributors: Vec<Contributor> =
            (0..5).map(|i| contributor(&format!("c{i}"))).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(random_contributor(&contributors, &mut rng).unwrap().github.clone());
        }
        assert_eq!(seen.len(), contributors.len());
    }

    #[test]
    fn random_contributor_of_empty_set_is_not_found() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert!(matches!(
            random_contributor(&[], &mut rng),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn handles_match_by_prefix() {
        let minis: Vec<ContributorMini> = ["octocat", "Octavia", "hubot"]
            .into_iter()
            .map(|github| ContributorMini {
                github: github.to_string(),
                name: None,
                avatar_url: None,
            })
            .collect();

        let found: Vec<&str> = matching_handles(&minis, "oct", 10)
            .into_iter()
            .map(|c| c.github.as_str())
            .collect();
        assert_eq!(found, vec!["octocat", "Octavia"]);
        assert_eq!(matching_handles(&minis, "", 2).len(), 2);
    }
}
