//! Jikan API client.
//!
//! A thin request/response layer: one GET per call, no retry, no caching and
//! no client-side rate limiting. Coordinators decide what to do with failures.

use super::error::TransportError;
use super::types::{AnimeEntry, DataResponse, PaginatedResponse, StreamingEntry};
use super::CatalogApi;
use anyhow::{Context, Result};
use reqwest::Client;
use shared::config::CatalogConfig;
use shared::{AnimeDetail, SearchPage, StreamingLink};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Jikan API v4 client
#[derive(Debug, Clone)]
pub struct JikanClient {
    /// HTTP client
    client: Client,
    /// Base URL for Jikan API, always ending with a slash
    base_url: Url,
}

impl JikanClient {
    /// Create a new Jikan client
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL: {}", base_url))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Create a client from the `[catalog]` configuration table
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.request_timeout(),
            &config.user_agent,
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a single GET request and decode its JSON body
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let url = self.base_url.join(endpoint)?;
        let url_text = url.to_string();

        debug!(url = %url_text, "Making API request");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| TransportError::Network {
                url: url_text.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            warn!(url = %url_text, status = %status, error = %body, "Request failed");
            return Err(TransportError::Status {
                url: url_text,
                status,
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Network {
                url: url_text.clone(),
                source,
            })?;

        match serde_json::from_str::<T>(&body) {
            Ok(data) => {
                debug!(url = %url_text, "Request successful");
                Ok(data)
            }
            Err(source) => {
                warn!(url = %url_text, error = %source, "Failed to parse response");
                Err(TransportError::Decode {
                    url: url_text,
                    source,
                })
            }
        }
    }
}

impl CatalogApi for JikanClient {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, TransportError> {
        debug!(query = query, page = page, "Searching anime");
        let response: PaginatedResponse<AnimeEntry> = self
            .get("anime", &[("q", query.to_string()), ("page", page.to_string())])
            .await?;
        Ok(SearchPage::from(response))
    }

    async fn fetch_detail(&self, mal_id: u32) -> Result<AnimeDetail, TransportError> {
        debug!(mal_id = mal_id, "Fetching anime details");
        let response: DataResponse<AnimeEntry> =
            self.get(&format!("anime/{}", mal_id), &[]).await?;
        Ok(AnimeDetail::from(response.data))
    }

    async fn fetch_streaming_links(&self, mal_id: u32) -> Result<Vec<StreamingLink>, TransportError> {
        debug!(mal_id = mal_id, "Fetching streaming links");
        let response: DataResponse<Vec<StreamingEntry>> =
            self.get(&format!("anime/{}/streaming", mal_id), &[]).await?;
        Ok(response.data.into_iter().map(StreamingLink::from).collect())
    }
}
