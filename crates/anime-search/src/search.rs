//! Live search coordination.
//!
//! [`LiveSearch`] owns the in-progress query text, commits it after a quiet
//! period, dispatches searches for the committed (query, page) pair and decides
//! which responses may still touch visible state.
//!
//! All coordinator state lives in one task. Keystrokes and page changes arrive
//! as commands, network responses arrive as generation-tagged completions, and
//! every state change is published as a whole [`SearchState`] snapshot.

use crate::api::{CatalogApi, TransportError};
use crate::route::{Navigator, Route, SearchRoute};
use crate::CoordinatorClosed;
use shared::{AnimeSummary, LoadState, SearchPage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// Message shown when a search fails
pub const SEARCH_ERROR_MESSAGE: &str = "Something went wrong.";

/// Default quiet period before typed text is committed
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Everything a display layer needs to render the search view
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    /// Raw text as typed, updated on every keystroke
    pub query_text: String,
    /// Trimmed text committed after the debounce window
    pub effective_query: String,
    /// Current 1-based page
    pub page: u32,
    pub page_count: u32,
    pub has_next_page: bool,
    pub total_items: Option<u32>,
    /// Results of the last successful search
    pub results: Vec<AnimeSummary>,
    pub load_state: LoadState,
    pub error: Option<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query_text: String::new(),
            effective_query: String::new(),
            page: 1,
            page_count: 1,
            has_next_page: false,
            total_items: None,
            results: Vec::new(),
            load_state: LoadState::Idle,
            error: None,
        }
    }
}

#[derive(Debug)]
enum Command {
    SetQueryText(String),
    SetPage(u32),
    Retry,
    Navigate(SearchRoute),
    Shutdown,
}

/// Response of one dispatched search
#[derive(Debug)]
struct Completion {
    generation: u64,
    query: String,
    page: u32,
    outcome: Result<SearchPage, TransportError>,
}

/// Handle to a running live search coordinator.
///
/// Dropping the handle tears the coordinator down just like [`LiveSearch::shutdown`].
#[derive(Debug)]
pub struct LiveSearch {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SearchState>,
    task: JoinHandle<()>,
}

impl LiveSearch {
    /// Start a coordinator with the state decoded from the address.
    ///
    /// A non-empty initial query is committed without waiting for the debounce
    /// window and dispatched right away.
    pub fn spawn<C>(
        client: Arc<C>,
        navigator: Arc<dyn Navigator>,
        initial: SearchRoute,
        debounce: Duration,
    ) -> Self
    where
        C: CatalogApi + Sync + 'static,
    {
        let state = if initial.query.is_empty() {
            SearchState::default()
        } else {
            SearchState {
                query_text: initial.query.clone(),
                effective_query: initial.query,
                page: initial.page.max(1),
                load_state: LoadState::Loading,
                ..SearchState::default()
            }
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(state.clone());

        let actor = SearchActor {
            client,
            navigator,
            debounce,
            state,
            publisher: state_tx,
            generation: 0,
            completions: completion_tx,
        };
        let task = tokio::spawn(actor.run(command_rx, completion_rx));

        Self {
            commands: command_tx,
            state: state_rx,
            task,
        }
    }

    fn send(&self, command: Command) -> Result<(), CoordinatorClosed> {
        self.commands.send(command).map_err(|_| CoordinatorClosed)
    }

    /// Record the latest keystroke-level input and restart the debounce window
    pub fn set_query_text(&self, text: impl Into<String>) -> Result<(), CoordinatorClosed> {
        self.send(Command::SetQueryText(text.into()))
    }

    /// Move to another page of the committed query.
    ///
    /// Pages outside `1..=page_count` are rejected without a request.
    pub fn set_page(&self, page: u32) -> Result<(), CoordinatorClosed> {
        self.send(Command::SetPage(page))
    }

    /// Dispatch the last attempted search again
    pub fn retry(&self) -> Result<(), CoordinatorClosed> {
        self.send(Command::Retry)
    }

    /// Apply a query and page coming from the history (back/forward).
    ///
    /// Commits immediately and cancels any pending debounce.
    pub fn navigate(&self, route: SearchRoute) -> Result<(), CoordinatorClosed> {
        self.send(Command::Navigate(route))
    }

    /// Current snapshot
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }

    /// Tear the coordinator down and wait for its task to finish.
    ///
    /// A pending debounce is discarded and responses still in flight are
    /// ignored.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Search coordinator task ended abnormally");
        }
    }
}

struct SearchActor<C> {
    client: Arc<C>,
    navigator: Arc<dyn Navigator>,
    debounce: Duration,
    state: SearchState,
    publisher: watch::Sender<SearchState>,
    /// Generation of the latest dispatch; older completions are stale
    generation: u64,
    completions: mpsc::UnboundedSender<Completion>,
}

impl<C> SearchActor<C>
where
    C: CatalogApi + Sync + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        if !self.state.effective_query.is_empty() {
            self.refresh();
        }

        let debounce_timer = sleep(self.debounce);
        tokio::pin!(debounce_timer);
        let mut commit_pending = false;

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::SetQueryText(text)) => {
                        self.state.query_text = text;
                        self.publish();
                        debounce_timer.as_mut().reset(Instant::now() + self.debounce);
                        commit_pending = true;
                    }
                    Some(Command::SetPage(page)) => self.set_page(page),
                    Some(Command::Retry) => self.retry(),
                    Some(Command::Navigate(route)) => {
                        commit_pending = false;
                        self.navigate(route);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                () = &mut debounce_timer, if commit_pending => {
                    commit_pending = false;
                    self.commit_query();
                }
                Some(completion) = completions.recv() => self.apply(completion),
            }
        }

        debug!(
            query = %self.state.effective_query,
            page = self.state.page,
            "Search coordinator stopped"
        );
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    /// Debounce fired: the typed text becomes the effective query
    fn commit_query(&mut self) {
        let committed = self.state.query_text.trim().to_string();
        if committed == self.state.effective_query {
            debug!(query = %committed, "Committed query unchanged");
            return;
        }

        debug!(query = %committed, "Committing query");
        self.state.effective_query = committed;
        self.state.page = 1;
        self.forget_pagination();
        self.refresh();
    }

    /// Page bounds belong to the previous query until the new one has loaded
    fn forget_pagination(&mut self) {
        self.state.page_count = 1;
        self.state.has_next_page = false;
        self.state.total_items = None;
    }

    fn set_page(&mut self, page: u32) {
        if self.state.effective_query.is_empty() {
            warn!(page = page, "Ignoring page change without a query");
            return;
        }
        if page < 1 || page > self.state.page_count {
            warn!(
                page = page,
                page_count = self.state.page_count,
                "Ignoring out of range page"
            );
            return;
        }
        if page == self.state.page {
            return;
        }

        self.state.page = page;
        self.refresh();
    }

    fn retry(&mut self) {
        if self.state.effective_query.is_empty() {
            debug!("Nothing to retry without a query");
            return;
        }
        info!(
            query = %self.state.effective_query,
            page = self.state.page,
            "Retrying search"
        );
        self.refresh();
    }

    fn navigate(&mut self, route: SearchRoute) {
        self.state.query_text = route.query.clone();
        if route.query == self.state.effective_query && route.page == self.state.page {
            self.publish();
            return;
        }

        if route.query != self.state.effective_query {
            self.forget_pagination();
        }
        self.state.effective_query = route.query;
        self.state.page = route.page;
        self.refresh();
    }

    /// Bring visible state in line with the effective (query, page) pair.
    ///
    /// Always starts a new generation, so whatever is still in flight becomes
    /// stale.
    fn refresh(&mut self) {
        self.generation += 1;

        if self.state.effective_query.is_empty() {
            self.state.results.clear();
            self.state.page = 1;
            self.forget_pagination();
            self.state.load_state = LoadState::Idle;
            self.state.error = None;
            self.publish();
            return;
        }

        let query = self.state.effective_query.clone();
        let page = self.state.page;

        self.navigator
            .replace(&Route::Search(SearchRoute::new(&query, page)));

        self.state.load_state = LoadState::Loading;
        self.state.error = None;
        self.publish();

        self.dispatch(query, page);
    }

    fn dispatch(&self, query: String, page: u32) {
        let generation = self.generation;
        let client = Arc::clone(&self.client);
        let completions = self.completions.clone();

        info!(query = %query, page = page, generation = generation, "Dispatching search");

        tokio::spawn(async move {
            let outcome = client.search(&query, page).await;
            // The coordinator may already be gone; its completion is moot then
            let _ = completions.send(Completion {
                generation,
                query,
                page,
                outcome,
            });
        });
    }

    fn apply(&mut self, completion: Completion) {
        if completion.generation != self.generation {
            debug!(
                query = %completion.query,
                page = completion.page,
                generation = completion.generation,
                current = self.generation,
                "Discarding stale search response"
            );
            return;
        }

        match completion.outcome {
            Ok(result) => {
                info!(
                    query = %completion.query,
                    page = completion.page,
                    results = result.items.len(),
                    page_count = result.page_count,
                    "Search complete"
                );
                self.state.results = result.items;
                self.state.page_count = result.page_count.max(1);
                self.state.has_next_page = result.has_next_page;
                self.state.total_items = result.total_items;
                self.state.load_state = LoadState::Loaded;
                self.state.error = None;
            }
            Err(e) => {
                error!(
                    query = %completion.query,
                    page = completion.page,
                    error = %e,
                    "Search failed"
                );
                self.state.load_state = LoadState::Errored;
                self.state.error = Some(SEARCH_ERROR_MESSAGE.to_string());
            }
        }
        self.publish();
    }
}
