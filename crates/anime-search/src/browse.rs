//! Interactive browsing session.
//!
//! A [`Browser`] shows exactly one view at a time over a [`MemoryHistory`].
//! The search view owns a [`LiveSearch`] for as long as it is shown. Leaving
//! it shuts that coordinator down before the history moves, so a pending
//! commit can never rewrite the entry of the view that replaced it.

use crate::api::CatalogApi;
use crate::detail::{DetailLoader, DetailState};
use crate::route::{MemoryHistory, Navigator, Route};
use crate::search::{LiveSearch, SearchState};
use crate::CoordinatorClosed;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// The mounted view and the coordinator behind it
#[derive(Debug)]
pub enum View {
    Search(LiveSearch),
    Detail(DetailLoader),
}

/// Latest state of the mounted view
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Search(SearchState),
    Detail(DetailState),
}

/// Change notifications of one mounted view
#[derive(Debug)]
pub enum ViewUpdates {
    Search(watch::Receiver<SearchState>),
    Detail(watch::Receiver<DetailState>),
    Unmounted,
}

impl ViewUpdates {
    /// Next snapshot of the view, or `None` once it has been unmounted.
    ///
    /// The first call after [`Browser::subscribe`] yields the current snapshot.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        match self {
            ViewUpdates::Search(rx) => {
                rx.changed().await.ok()?;
                Some(Snapshot::Search(rx.borrow_and_update().clone()))
            }
            ViewUpdates::Detail(rx) => {
                rx.changed().await.ok()?;
                Some(Snapshot::Detail(rx.borrow_and_update().clone()))
            }
            ViewUpdates::Unmounted => None,
        }
    }
}

#[derive(Debug)]
pub struct Browser<C> {
    client: Arc<C>,
    history: Arc<MemoryHistory>,
    debounce: Duration,
    /// `None` only while one view is swapped for another
    view: Option<View>,
}

impl<C> Browser<C>
where
    C: CatalogApi + Sync + 'static,
{
    /// Open the view of the start address
    pub fn start(client: Arc<C>, start: Route, debounce: Duration) -> Result<Self, CoordinatorClosed> {
        let mut browser = Self {
            client,
            history: Arc::new(MemoryHistory::new(start.clone())),
            debounce,
            view: None,
        };
        browser.view = Some(browser.mount(start)?);
        Ok(browser)
    }

    /// Address of the current history entry
    pub fn address(&self) -> Route {
        self.history.current()
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    /// Search coordinator, while the search view is shown
    pub fn search(&self) -> Option<&LiveSearch> {
        match &self.view {
            Some(View::Search(search)) => Some(search),
            _ => None,
        }
    }

    pub fn subscribe(&self) -> ViewUpdates {
        match &self.view {
            Some(View::Search(search)) => {
                let mut rx = search.subscribe();
                rx.mark_changed();
                ViewUpdates::Search(rx)
            }
            Some(View::Detail(loader)) => {
                let mut rx = loader.subscribe();
                rx.mark_changed();
                ViewUpdates::Detail(rx)
            }
            None => ViewUpdates::Unmounted,
        }
    }

    /// Retry whatever the mounted view failed to load
    pub fn retry(&self) -> Result<(), CoordinatorClosed> {
        match &self.view {
            Some(View::Search(search)) => search.retry(),
            Some(View::Detail(loader)) => loader.retry(),
            None => Ok(()),
        }
    }

    /// Push a detail entry and show it in place of the current view
    pub async fn open(&mut self, mal_id: u32) -> Result<(), CoordinatorClosed> {
        let route = Route::Detail { mal_id };
        self.unmount().await;
        self.history.push(route.clone());
        self.view = Some(self.mount(route)?);
        Ok(())
    }

    /// Show the previous entry; `false` when there is none
    pub async fn back(&mut self) -> Result<bool, CoordinatorClosed> {
        let Some(target) = self.history.peek_back() else {
            return Ok(false);
        };
        self.show(target, MemoryHistory::back).await?;
        Ok(true)
    }

    /// Show the next entry; `false` when there is none
    pub async fn forward(&mut self) -> Result<bool, CoordinatorClosed> {
        let Some(target) = self.history.peek_forward() else {
            return Ok(false);
        };
        self.show(target, MemoryHistory::forward).await?;
        Ok(true)
    }

    /// Stop the mounted view
    pub async fn close(mut self) {
        self.unmount().await;
    }

    async fn show(
        &mut self,
        target: Route,
        step: fn(&MemoryHistory) -> Option<Route>,
    ) -> Result<(), CoordinatorClosed> {
        if let (Some(View::Search(search)), Route::Search(route)) = (&self.view, &target) {
            step(&self.history);
            return search.navigate(route.clone());
        }

        self.unmount().await;
        step(&self.history);
        self.view = Some(self.mount(target)?);
        Ok(())
    }

    fn mount(&self, route: Route) -> Result<View, CoordinatorClosed> {
        debug!(route = %route, "Mounting view");
        match route {
            Route::Search(initial) => Ok(View::Search(LiveSearch::spawn(
                Arc::clone(&self.client),
                Arc::clone(&self.history) as Arc<dyn Navigator>,
                initial,
                self.debounce,
            ))),
            Route::Detail { mal_id } => {
                let loader = DetailLoader::spawn(Arc::clone(&self.client));
                loader.load(mal_id)?;
                Ok(View::Detail(loader))
            }
        }
    }

    async fn unmount(&mut self) {
        match self.view.take() {
            Some(View::Search(search)) => search.shutdown().await,
            Some(View::Detail(loader)) => loader.shutdown().await,
            None => {}
        }
    }
}
