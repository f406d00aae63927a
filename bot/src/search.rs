//! Team name search, either fuzzy (nucleo-matcher) or plain substring.

use nucleo_matcher::{
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32Str,
};
use shared::Team;
use strum::{Display, EnumString};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SearchMode {
    /// Ranked by similarity, capped at the search limit.
    #[default]
    Fuzzy,
    /// Case-sensitive containment, in leaderboard order.
    Substring,
}

/// `teams` is expected in leaderboard order, which breaks score ties.
pub fn search_teams(teams: &[Team], query: &str, mode: SearchMode, limit: usize) -> Vec<Team> {
    let query = query.trim();
    if query.is_empty() {
        return teams.iter().take(limit).cloned().collect();
    }

    match mode {
        SearchMode::Substring => teams
            .iter()
            .filter(|team| team.name.contains(query) || team.slug.contains(query))
            .cloned()
            .collect(),
        SearchMode::Fuzzy => fuzzy(teams, query, limit),
    }
}

fn fuzzy(teams: &[Team], query: &str, limit: usize) -> Vec<Team> {
    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::new(
        query,
        CaseMatching::Ignore,
        Normalization::Smart,
        AtomKind::Fuzzy,
    );

    let mut buf = Vec::new();
    let mut score = |haystack: &str| {
        pattern.score(Utf32Str::new(haystack, &mut buf), &mut matcher)
    };

    let mut scored: Vec<(u32, &Team)> = teams
        .iter()
        .filter_map(|team| {
            let best = score(&team.name).max(score(&team.slug))?;
            Some((best, team))
        })
        .collect();
    // Stable, so equal scores stay in leaderboard order
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, team)| team.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str, slug: &str) -> Team {
        Team::summary(slug.to_string(), name.to_string(), slug.to_string(), 0)
    }

    fn teams() -> Vec<Team> {
        vec![
            team("Rustaceans", "rustaceans"),
            team("Rust Belt", "rust-belt"),
            team("Pythonistas", "pythonistas"),
            team("The Crabs", "crabs"),
        ]
    }

    fn names(teams: &[Team]) -> Vec<&str> {
        teams.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn substring_is_case_sensitive() {
        let found = search_teams(&teams(), "Rust", SearchMode::Substring, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&found), vec!["Rustaceans", "Rust Belt"]);

        let found = search_teams(&teams(), "rusT", SearchMode::Substring, DEFAULT_SEARCH_LIMIT);
        assert!(found.is_empty());
    }

    #[test]
    fn substring_matches_slug() {
        let found = search_teams(&teams(), "rust-b", SearchMode::Substring, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&found), vec!["Rust Belt"]);
    }

    #[test]
    fn fuzzy_ignores_case_and_drops_non_matches() {
        let found = search_teams(&teams(), "crab", SearchMode::Fuzzy, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&found), vec!["The Crabs"]);
    }

    #[test]
    fn fuzzy_tolerates_gaps() {
        let found = search_teams(&teams(), "pyts", SearchMode::Fuzzy, DEFAULT_SEARCH_LIMIT);
        assert_eq!(names(&found), vec!["Pythonistas"]);
    }

    #[test]
    fn fuzzy_results_are_capped() {
        let many: Vec<Team> = (0..30)
            .map(|i| team(&format!("Team {i}"), &format!("team-{i}")))
            .collect();

        let found = search_teams(&many, "team", SearchMode::Fuzzy, DEFAULT_SEARCH_LIMIT);
        assert_eq!(found.len(), DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn empty_query_returns_leading_teams() {
        let found = search_teams(&teams(), "  ", SearchMode::Fuzzy, 2);
        assert_eq!(names(&found), vec!["Rustaceans", "Rust Belt"]);
    }

    #[test]
    fn mode_parses_from_config() {
        assert_eq!("fuzzy".parse::<SearchMode>().unwrap(), SearchMode::Fuzzy);
        assert_eq!(
            "substring".parse::<SearchMode>().unwrap(),
            SearchMode::Substring
        );
    }
}
