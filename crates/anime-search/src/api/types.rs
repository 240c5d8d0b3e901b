//! Jikan API v4 response types.
//!
//! These types represent the JSON responses from the Jikan API. Every field the
//! views do not strictly need is optional, so a sparse record still decodes.

use serde::{Deserialize, Serialize};
use shared::{AnimeDetail, AnimeSummary, SearchPage, StreamingLink};

/// Paginated list wrapper (`GET /anime`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Simple data wrapper (without pagination)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Pagination metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub last_visible_page: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub items: Option<PaginationItems>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationItems {
    pub count: u32,
    pub total: u32,
    pub per_page: u32,
}

/// Anime record as returned by both the search and the detail endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeEntry {
    pub mal_id: u32,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Option<AnimeImages>,
    pub title: String,
    #[serde(rename = "type", default)]
    pub anime_type: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub scored_by: Option<u32>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub members: Option<u32>,
    #[serde(default)]
    pub year: Option<u32>,
}

/// Anime images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeImages {
    pub jpg: ImageSet,
    #[serde(default)]
    pub webp: Option<ImageSet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageSet {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub small_image_url: Option<String>,
    #[serde(default)]
    pub large_image_url: Option<String>,
}

/// Streaming service entry (`GET /anime/{id}/streaming`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingEntry {
    pub name: String,
    pub url: String,
}

impl AnimeEntry {
    fn poster_url(&self) -> Option<String> {
        let images = self.images.as_ref()?;
        images
            .jpg
            .image_url
            .clone()
            .or_else(|| images.jpg.large_image_url.clone())
    }
}

impl From<AnimeEntry> for AnimeSummary {
    fn from(entry: AnimeEntry) -> Self {
        let poster_url = entry.poster_url();
        Self {
            mal_id: entry.mal_id,
            title: entry.title,
            poster_url,
            score: entry.score,
            year: entry.year,
            anime_type: entry.anime_type,
        }
    }
}

impl From<AnimeEntry> for AnimeDetail {
    fn from(entry: AnimeEntry) -> Self {
        let poster_url = entry.poster_url();
        Self {
            mal_id: entry.mal_id,
            url: entry.url,
            title: entry.title,
            poster_url,
            synopsis: entry.synopsis,
            score: entry.score,
            scored_by: entry.scored_by,
            rank: entry.rank,
            popularity: entry.popularity,
            members: entry.members,
        }
    }
}

impl From<StreamingEntry> for StreamingLink {
    fn from(entry: StreamingEntry) -> Self {
        Self {
            name: entry.name,
            url: entry.url,
        }
    }
}

impl From<PaginatedResponse<AnimeEntry>> for SearchPage {
    fn from(response: PaginatedResponse<AnimeEntry>) -> Self {
        let pagination = response.pagination.unwrap_or_default();
        Self {
            items: response.data.into_iter().map(AnimeSummary::from).collect(),
            // A missing or zero page count still means one page of results
            page_count: pagination.last_visible_page.max(1),
            has_next_page: pagination.has_next_page,
            total_items: pagination.items.map(|items| items.total),
        }
    }
}
