//! Address encoding of the views and the navigation history contract.
//!
//! The search view lives at `/?q={text}&page={n}` and the detail view at
//! `/anime/{id}`. The live search coordinator writes its committed state through
//! a [`Navigator`]; whoever owns the history feeds back/forward moves into the
//! coordinator with `LiveSearch::navigate`.

use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use url::Url;

/// Base used to resolve relative addresses
const ADDRESS_BASE: &str = "http://localhost/";

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid address {address:?}: {source}")]
    Malformed {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid anime id {0:?}")]
    InvalidId(String),

    #[error("no view at {0:?}")]
    UnknownPath(String),
}

/// Committed search state as carried by the address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoute {
    pub query: String,
    pub page: u32,
}

impl SearchRoute {
    pub fn new(query: &str, page: u32) -> Self {
        Self {
            query: query.trim().to_string(),
            page: page.max(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }
}

impl Default for SearchRoute {
    fn default() -> Self {
        Self::new("", 1)
    }
}

/// A view of the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Search(SearchRoute),
    Detail { mal_id: u32 },
}

impl Route {
    /// Decode an address such as `/?q=naruto&page=2` or `/anime/20`.
    ///
    /// A missing, zero or non-numeric page decodes to 1.
    pub fn parse(address: &str) -> Result<Self, RouteError> {
        let base = Url::parse(ADDRESS_BASE).map_err(|source| RouteError::Malformed {
            address: ADDRESS_BASE.to_string(),
            source,
        })?;
        let url = base.join(address).map_err(|source| RouteError::Malformed {
            address: address.to_string(),
            source,
        })?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [] => {
                let mut query = String::new();
                let mut page = 1;
                for (key, value) in url.query_pairs() {
                    match key.as_ref() {
                        "q" => query = value.into_owned(),
                        "page" => page = value.trim().parse().unwrap_or(1),
                        _ => {}
                    }
                }
                Ok(Route::Search(SearchRoute::new(&query, page)))
            }
            ["anime", id] => id
                .parse()
                .map(|mal_id| Route::Detail { mal_id })
                .map_err(|_| RouteError::InvalidId((*id).to_string())),
            _ => Err(RouteError::UnknownPath(url.path().to_string())),
        }
    }

    /// Encode the view as an address
    pub fn to_address(&self) -> String {
        match self {
            Route::Search(search) if search.is_empty() => "/".to_string(),
            Route::Search(search) => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("q", &search.query)
                    .append_pair("page", &search.page.to_string())
                    .finish();
                format!("/?{}", query)
            }
            Route::Detail { mal_id } => format!("/anime/{}", mal_id),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_address())
    }
}

/// Receiver of committed view state
pub trait Navigator: Send + Sync + 'static {
    /// Replace the current history entry, without adding a new one
    fn replace(&self, route: &Route);
}

/// Navigator that discards every update, for runs without an address bar
#[derive(Debug, Default)]
pub struct DetachedNavigator;

impl Navigator for DetachedNavigator {
    fn replace(&self, _route: &Route) {}
}

#[derive(Debug)]
struct HistoryInner {
    entries: Vec<Route>,
    cursor: usize,
}

/// In-memory browser-style history: a list of entries and a cursor
#[derive(Debug)]
pub struct MemoryHistory {
    inner: Mutex<HistoryInner>,
}

impl MemoryHistory {
    pub fn new(initial: Route) -> Self {
        Self {
            inner: Mutex::new(HistoryInner {
                entries: vec![initial],
                cursor: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current entry
    pub fn current(&self) -> Route {
        let inner = self.lock();
        inner.entries[inner.cursor].clone()
    }

    /// Add a new entry after the current one, dropping any forward entries
    pub fn push(&self, route: Route) {
        let mut inner = self.lock();
        let keep = inner.cursor + 1;
        inner.entries.truncate(keep);
        inner.entries.push(route);
        inner.cursor = keep;
    }

    /// Move one entry back, returning the new current entry
    pub fn back(&self) -> Option<Route> {
        let mut inner = self.lock();
        if inner.cursor == 0 {
            return None;
        }
        inner.cursor -= 1;
        Some(inner.entries[inner.cursor].clone())
    }

    /// Move one entry forward, returning the new current entry
    pub fn forward(&self) -> Option<Route> {
        let mut inner = self.lock();
        if inner.cursor + 1 >= inner.entries.len() {
            return None;
        }
        inner.cursor += 1;
        Some(inner.entries[inner.cursor].clone())
    }

    /// Entry `back` would move to, without moving
    pub fn peek_back(&self) -> Option<Route> {
        let inner = self.lock();
        let cursor = inner.cursor.checked_sub(1)?;
        Some(inner.entries[cursor].clone())
    }

    /// Entry `forward` would move to, without moving
    pub fn peek_forward(&self) -> Option<Route> {
        let inner = self.lock();
        inner.entries.get(inner.cursor + 1).cloned()
    }
}

impl Navigator for MemoryHistory {
    fn replace(&self, route: &Route) {
        let mut inner = self.lock();
        let cursor = inner.cursor;
        inner.entries[cursor] = route.clone();
    }
}
