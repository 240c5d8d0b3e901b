//! Scripted in-memory catalog for coordinator tests.

use crate::api::{CatalogApi, TransportError};
use reqwest::StatusCode;
use shared::{AnimeDetail, AnimeSummary, SearchPage, StreamingLink};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Search(String, u32),
    Detail(u32),
    StreamingLinks(u32),
}

/// One scripted reply: wait `delay`, then succeed with the value or fail
#[derive(Debug, Clone)]
struct Reply<T> {
    delay: Duration,
    outcome: Option<T>,
}

type Script<K, T> = Mutex<HashMap<K, VecDeque<Reply<T>>>>;

/// Catalog whose replies are queued per request key.
///
/// Replies are consumed in order; the last one repeats. Unscripted requests
/// fail immediately.
#[derive(Debug, Default)]
pub(crate) struct ScriptedCatalog {
    searches: Script<(String, u32), SearchPage>,
    details: Script<u32, AnimeDetail>,
    links: Script<u32, Vec<StreamingLink>>,
    calls: Mutex<Vec<Call>>,
}

fn push<K: Eq + Hash, T>(script: &Script<K, T>, key: K, reply: Reply<T>) {
    script
        .lock()
        .unwrap()
        .entry(key)
        .or_default()
        .push_back(reply);
}

fn next<K: Eq + Hash, T: Clone>(script: &Script<K, T>, key: &K) -> Reply<T> {
    let mut script = script.lock().unwrap();
    match script.get_mut(key) {
        Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
        Some(queue) => queue.front().cloned().unwrap(),
        None => Reply {
            delay: Duration::ZERO,
            outcome: None,
        },
    }
}

fn failure(endpoint: String) -> TransportError {
    TransportError::Status {
        url: format!("scripted://{}", endpoint),
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: "scripted failure".to_string(),
    }
}

impl ScriptedCatalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn search_ok(&self, query: &str, page: u32, delay: Duration, result: SearchPage) {
        push(
            &self.searches,
            (query.to_string(), page),
            Reply {
                delay,
                outcome: Some(result),
            },
        );
    }

    pub(crate) fn search_err(&self, query: &str, page: u32, delay: Duration) {
        push(
            &self.searches,
            (query.to_string(), page),
            Reply {
                delay,
                outcome: None,
            },
        );
    }

    pub(crate) fn detail_ok(&self, mal_id: u32, delay: Duration, detail: AnimeDetail) {
        push(
            &self.details,
            mal_id,
            Reply {
                delay,
                outcome: Some(detail),
            },
        );
    }

    pub(crate) fn detail_err(&self, mal_id: u32, delay: Duration) {
        push(
            &self.details,
            mal_id,
            Reply {
                delay,
                outcome: None,
            },
        );
    }

    pub(crate) fn links_ok(&self, mal_id: u32, delay: Duration, links: Vec<StreamingLink>) {
        push(
            &self.links,
            mal_id,
            Reply {
                delay,
                outcome: Some(links),
            },
        );
    }

    pub(crate) fn links_err(&self, mal_id: u32, delay: Duration) {
        push(
            &self.links,
            mal_id,
            Reply {
                delay,
                outcome: None,
            },
        );
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl CatalogApi for ScriptedCatalog {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage, TransportError> {
        self.record(Call::Search(query.to_string(), page));
        let reply = next(&self.searches, &(query.to_string(), page));
        tokio::time::sleep(reply.delay).await;
        reply
            .outcome
            .ok_or_else(|| failure(format!("anime?q={}&page={}", query, page)))
    }

    async fn fetch_detail(&self, mal_id: u32) -> Result<AnimeDetail, TransportError> {
        self.record(Call::Detail(mal_id));
        let reply = next(&self.details, &mal_id);
        tokio::time::sleep(reply.delay).await;
        reply
            .outcome
            .ok_or_else(|| failure(format!("anime/{}", mal_id)))
    }

    async fn fetch_streaming_links(&self, mal_id: u32) -> Result<Vec<StreamingLink>, TransportError> {
        self.record(Call::StreamingLinks(mal_id));
        let reply = next(&self.links, &mal_id);
        tokio::time::sleep(reply.delay).await;
        reply
            .outcome
            .ok_or_else(|| failure(format!("anime/{}/streaming", mal_id)))
    }
}

/// A page of `count` summaries titled "`prefix` 1", "`prefix` 2", ...
pub(crate) fn search_page(prefix: &str, count: u32, page_count: u32) -> SearchPage {
    SearchPage {
        items: (1..=count)
            .map(|n| AnimeSummary {
                mal_id: n,
                title: format!("{} {}", prefix, n),
                poster_url: Some(format!("https://cdn.myanimelist.net/images/anime/{}.jpg", n)),
                score: Some(7.5),
                year: Some(2002),
                anime_type: Some("TV".to_string()),
            })
            .collect(),
        page_count,
        has_next_page: page_count > 1,
        total_items: Some(count * page_count),
    }
}

pub(crate) fn anime_detail(mal_id: u32, title: &str) -> AnimeDetail {
    AnimeDetail {
        mal_id,
        url: Some(format!("https://myanimelist.net/anime/{}", mal_id)),
        title: title.to_string(),
        poster_url: None,
        synopsis: Some(format!("Synopsis of {}", title)),
        score: Some(8.75),
        scored_by: Some(1_000_000),
        rank: Some(46),
        popularity: Some(43),
        members: Some(1_900_000),
    }
}

pub(crate) fn streaming_link(name: &str) -> StreamingLink {
    StreamingLink {
        name: name.to_string(),
        url: format!("https://{}.example/watch", name.to_lowercase()),
    }
}
