//! Data models for the catalog views.
//!
//! These are the shapes the coordinators expose to a display layer. They are
//! decoupled from the wire format of the catalog API.

use serde::{Deserialize, Serialize};

/// Placeholder shown for missing statistics
const NOT_AVAILABLE: &str = "N/A";

/// Lifecycle of a coordinator's visible data
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    /// Nothing requested (empty query, or before the first detail fetch)
    #[default]
    Idle,
    /// The current request is outstanding
    Loading,
    /// The current request succeeded
    Loaded,
    /// The current request failed
    Errored,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::Idle => write!(f, "idle"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::Loaded => write!(f, "loaded"),
            LoadState::Errored => write!(f, "errored"),
        }
    }
}

/// One entry of a search result page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimeSummary {
    pub mal_id: u32,
    pub title: String,
    pub poster_url: Option<String>,
    pub score: Option<f64>,
    pub year: Option<u32>,
    pub anime_type: Option<String>,
}

impl AnimeSummary {
    /// "year • type" line, only present when the year is known
    pub fn subtitle(&self) -> Option<String> {
        self.year.map(|year| {
            format!("{} • {}", year, self.anime_type.as_deref().unwrap_or("TV"))
        })
    }
}

/// A page of search results together with its pagination metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub items: Vec<AnimeSummary>,
    /// Total number of pages for the query, never below 1
    pub page_count: u32,
    pub has_next_page: bool,
    /// Total number of matches, when the service reports it
    pub total_items: Option<u32>,
}

/// Expanded record for a single title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimeDetail {
    pub mal_id: u32,
    /// Page of the title on the catalog's own site
    pub url: Option<String>,
    pub title: String,
    pub poster_url: Option<String>,
    pub synopsis: Option<String>,
    pub score: Option<f64>,
    pub scored_by: Option<u32>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub members: Option<u32>,
}

impl AnimeDetail {
    pub fn synopsis_text(&self) -> &str {
        match self.synopsis.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => "No synopsis available.",
        }
    }

    pub fn score_label(&self) -> String {
        self.score
            .map_or_else(|| NOT_AVAILABLE.to_string(), |score| score.to_string())
    }

    pub fn rank_label(&self) -> String {
        format!("#{}", optional_number(self.rank))
    }

    pub fn popularity_label(&self) -> String {
        format!("#{}", optional_number(self.popularity))
    }

    pub fn members_label(&self) -> String {
        self.members
            .map_or_else(|| NOT_AVAILABLE.to_string(), group_thousands)
    }

    pub fn scored_by_label(&self) -> Option<String> {
        self.scored_by.map(group_thousands)
    }
}

/// External streaming site for a title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamingLink {
    pub name: String,
    pub url: String,
}

fn optional_number(value: Option<u32>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

/// Format a count with comma thousands separators (1234567 -> "1,234,567")
pub fn group_thousands(value: u32) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail() -> AnimeDetail {
        AnimeDetail {
            mal_id: 1,
            url: Some("https://myanimelist.net/anime/1/Cowboy_Bebop".to_string()),
            title: "Cowboy Bebop".to_string(),
            poster_url: None,
            synopsis: None,
            score: Some(8.75),
            scored_by: Some(1_002_345),
            rank: Some(46),
            popularity: None,
            members: Some(1_900_000),
        }
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_detail_labels() {
        let detail = detail();
        assert_eq!(detail.synopsis_text(), "No synopsis available.");
        assert_eq!(detail.score_label(), "8.75");
        assert_eq!(detail.rank_label(), "#46");
        assert_eq!(detail.popularity_label(), "#N/A");
        assert_eq!(detail.members_label(), "1,900,000");
        assert_eq!(detail.scored_by_label().as_deref(), Some("1,002,345"));
    }

    #[test]
    fn test_summary_subtitle_defaults_type() {
        let mut summary = AnimeSummary {
            mal_id: 20,
            title: "Naruto".to_string(),
            poster_url: None,
            score: Some(8.0),
            year: Some(2002),
            anime_type: None,
        };
        assert_eq!(summary.subtitle().as_deref(), Some("2002 • TV"));

        summary.anime_type = Some("Movie".to_string());
        assert_eq!(summary.subtitle().as_deref(), Some("2002 • Movie"));

        summary.year = None;
        assert_eq!(summary.subtitle(), None);
    }

    #[test]
    fn test_load_state_display() {
        assert_eq!(LoadState::default(), LoadState::Idle);
        assert_eq!(LoadState::Errored.to_string(), "errored");
    }
}
