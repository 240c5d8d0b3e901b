//! Live search over the Jikan anime catalog.
//!
//! This library provides the catalog client and the two coordinators that keep
//! a search view and a detail view consistent with the latest user input.

pub mod api;
pub mod browse;
pub mod detail;
pub mod route;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{CatalogApi, JikanClient, TransportError};
pub use browse::{Browser, Snapshot, View, ViewUpdates};
pub use detail::{DetailLoader, DetailState};
pub use route::{MemoryHistory, Navigator, Route, SearchRoute};
pub use search::{LiveSearch, SearchState};

/// Returned by coordinator handles once the coordinator task has stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("coordinator has shut down")]
pub struct CoordinatorClosed;
