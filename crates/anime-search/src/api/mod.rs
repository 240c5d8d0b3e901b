//! Jikan API v4 client implementation.
//!
//! This module provides the read-only catalog queries used by the search and
//! detail coordinators, behind the [`CatalogApi`] trait so the coordinators can
//! run against a scripted catalog in tests.

pub mod client;
pub mod error;
pub mod types;

pub use client::JikanClient;
pub use error::TransportError;
pub use types::*;

use shared::{AnimeDetail, SearchPage, StreamingLink};

/// Read-only catalog queries.
///
/// `trait_variant::make` generates the `Send`-bound [`CatalogApi`] used by the
/// coordinators, whose requests run on spawned tasks.
#[trait_variant::make(CatalogApi: Send)]
pub trait LocalCatalogApi {
    /// Search titles by free text, one page at a time (1-based).
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, TransportError>;

    /// Fetch the expanded record of one title.
    async fn fetch_detail(&self, mal_id: u32) -> Result<AnimeDetail, TransportError>;

    /// Fetch the streaming services of one title. No links is an empty list.
    async fn fetch_streaming_links(&self, mal_id: u32) -> Result<Vec<StreamingLink>, TransportError>;
}
