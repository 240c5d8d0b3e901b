//! Detail view loading.
//!
//! [`DetailLoader`] fetches one title's detail and its streaming links side by
//! side. The two requests settle independently: a failed detail fails the load,
//! a failed links request only leaves the links empty. Like the search
//! coordinator it runs as a single task and tags each load with a generation,
//! so a response for an identifier that is no longer targeted is dropped.

use crate::api::{CatalogApi, TransportError};
use crate::CoordinatorClosed;
use shared::{AnimeDetail, LoadState, StreamingLink};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Message shown when the detail cannot be loaded
pub const DETAIL_ERROR_MESSAGE: &str = "Failed to load anime details. Please try again.";

/// Everything a display layer needs to render the detail view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    /// Identifier currently targeted
    pub mal_id: Option<u32>,
    pub detail: Option<AnimeDetail>,
    pub streaming_links: Vec<StreamingLink>,
    pub load_state: LoadState,
    pub error: Option<String>,
}

#[derive(Debug)]
enum Command {
    Load(u32),
    Retry,
    Shutdown,
}

#[derive(Debug)]
struct Completion {
    generation: u64,
    mal_id: u32,
    detail: Result<AnimeDetail, TransportError>,
    links: Result<Vec<StreamingLink>, TransportError>,
}

/// Handle to a running detail loader
#[derive(Debug)]
pub struct DetailLoader {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<DetailState>,
    task: JoinHandle<()>,
}

impl DetailLoader {
    pub fn spawn<C>(client: Arc<C>) -> Self
    where
        C: CatalogApi + Sync + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(DetailState::default());

        let actor = DetailActor {
            client,
            state: DetailState::default(),
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

    /// Target a title. Loading the title already targeted is a no-op.
    pub fn load(&self, mal_id: u32) -> Result<(), CoordinatorClosed> {
        self.commands
            .send(Command::Load(mal_id))
            .map_err(|_| CoordinatorClosed)
    }

    /// Load the same title again; only honoured after a failed load
    pub fn retry(&self) -> Result<(), CoordinatorClosed> {
        self.commands
            .send(Command::Retry)
            .map_err(|_| CoordinatorClosed)
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.clone()
    }

    /// Tear the loader down; responses still in flight are ignored
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Detail loader task ended abnormally");
        }
    }
}

struct DetailActor<C> {
    client: Arc<C>,
    state: DetailState,
    publisher: watch::Sender<DetailState>,
    generation: u64,
    completions: mpsc::UnboundedSender<Completion>,
}

impl<C> DetailActor<C>
where
    C: CatalogApi + Sync + 'static,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Load(mal_id)) => self.load(mal_id),
                    Some(Command::Retry) => self.retry(),
                    Some(Command::Shutdown) | None => break,
                },
                Some(completion) = completions.recv() => self.apply(completion),
            }
        }

        debug!(mal_id = ?self.state.mal_id, "Detail loader stopped");
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn load(&mut self, mal_id: u32) {
        if self.state.mal_id == Some(mal_id) && self.state.load_state != LoadState::Idle {
            debug!(mal_id = mal_id, "Title already targeted");
            return;
        }

        self.state = DetailState {
            mal_id: Some(mal_id),
            ..DetailState::default()
        };
        self.dispatch(mal_id);
    }

    fn retry(&mut self) {
        let Some(mal_id) = self.state.mal_id else {
            return;
        };
        if self.state.load_state != LoadState::Errored {
            debug!(mal_id = mal_id, state = %self.state.load_state, "Retry ignored");
            return;
        }

        info!(mal_id = mal_id, "Retrying detail load");
        self.dispatch(mal_id);
    }

    fn dispatch(&mut self, mal_id: u32) {
        self.generation += 1;
        self.state.load_state = LoadState::Loading;
        self.state.error = None;
        self.publish();

        let generation = self.generation;
        let client = Arc::clone(&self.client);
        let completions = self.completions.clone();

        info!(mal_id = mal_id, generation = generation, "Loading anime details");

        tokio::spawn(async move {
            let (detail, links) = tokio::join!(
                client.fetch_detail(mal_id),
                client.fetch_streaming_links(mal_id)
            );
            let _ = completions.send(Completion {
                generation,
                mal_id,
                detail,
                links,
            });
        });
    }

    fn apply(&mut self, completion: Completion) {
        if completion.generation != self.generation {
            debug!(
                mal_id = completion.mal_id,
                generation = completion.generation,
                current = self.generation,
                "Discarding stale detail response"
            );
            return;
        }

        match completion.detail {
            Ok(detail) => {
                let streaming_links = completion.links.unwrap_or_else(|e| {
                    warn!(
                        mal_id = completion.mal_id,
                        error = %e,
                        "Streaming links unavailable"
                    );
                    Vec::new()
                });

                info!(
                    mal_id = completion.mal_id,
                    title = %detail.title,
                    streaming_links = streaming_links.len(),
                    "Anime details loaded"
                );
                self.state.detail = Some(detail);
                self.state.streaming_links = streaming_links;
                self.state.load_state = LoadState::Loaded;
                self.state.error = None;
            }
            Err(e) => {
                error!(mal_id = completion.mal_id, error = %e, "Failed to load anime details");
                self.state.detail = None;
                self.state.streaming_links.clear();
                self.state.load_state = LoadState::Errored;
                self.state.error = Some(DETAIL_ERROR_MESSAGE.to_string());
            }
        }
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{anime_detail, streaming_link, Call, ScriptedCatalog};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    fn start(catalog: ScriptedCatalog) -> (Arc<ScriptedCatalog>, DetailLoader) {
        let catalog = Arc::new(catalog);
        let loader = DetailLoader::spawn(Arc::clone(&catalog));
        (catalog, loader)
    }

    async fn wait_until(
        loader: &DetailLoader,
        predicate: impl FnMut(&DetailState) -> bool,
    ) -> DetailState {
        let mut rx = loader.subscribe();
        let state = tokio::time::timeout(Duration::from_secs(60), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for detail state")
            .expect("loader stopped");
        state.clone()
    }

    fn settled(state: &DetailState) -> bool {
        matches!(state.load_state, LoadState::Loaded | LoadState::Errored)
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_idle() {
        let (catalog, loader) = start(ScriptedCatalog::new());
        sleep(Duration::from_millis(100)).await;

        let state = loader.state();
        assert_eq!(state.load_state, LoadState::Idle);
        assert_eq!(state.mal_id, None);
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_and_links_loaded() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_ok(1, Duration::from_millis(50), anime_detail(1, "Cowboy Bebop"));
        catalog.links_ok(
            1,
            Duration::from_millis(80),
            vec![streaming_link("Crunchyroll"), streaming_link("Netflix")],
        );
        let (_catalog, loader) = start(catalog);

        loader.load(1).unwrap();
        let state = wait_until(&loader, settled).await;

        assert_eq!(state.load_state, LoadState::Loaded);
        assert_eq!(state.mal_id, Some(1));
        assert_eq!(state.detail.unwrap().title, "Cowboy Bebop");
        let names: Vec<&str> = state.streaming_links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Crunchyroll", "Netflix"]);
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_run_concurrently() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_ok(1, Duration::from_millis(100), anime_detail(1, "Cowboy Bebop"));
        catalog.links_ok(1, Duration::from_millis(100), vec![streaming_link("Netflix")]);
        let (catalog, loader) = start(catalog);

        let started = Instant::now();
        loader.load(1).unwrap();
        wait_until(&loader, settled).await;

        assert!(started.elapsed() < Duration::from_millis(200));
        let mut calls = catalog.calls();
        calls.sort_by_key(|call| format!("{:?}", call));
        assert_eq!(calls, vec![Call::Detail(1), Call::StreamingLinks(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_links_failure_is_tolerated() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_ok(1, Duration::from_millis(50), anime_detail(1, "Cowboy Bebop"));
        catalog.links_err(1, Duration::from_millis(10));
        let (_catalog, loader) = start(catalog);

        loader.load(1).unwrap();
        let state = wait_until(&loader, settled).await;

        assert_eq!(state.load_state, LoadState::Loaded);
        assert!(state.detail.is_some());
        assert!(state.streaming_links.is_empty());
        assert_eq!(state.error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detail_failure_shows_no_partial_detail() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_err(7, Duration::from_millis(10));
        catalog.links_ok(7, Duration::from_millis(50), vec![streaming_link("Netflix")]);
        let (_catalog, loader) = start(catalog);

        loader.load(7).unwrap();
        let state = wait_until(&loader, settled).await;

        assert_eq!(state.load_state, LoadState::Errored);
        assert_eq!(state.error.as_deref(), Some(DETAIL_ERROR_MESSAGE));
        assert!(state.detail.is_none());
        assert!(state.streaming_links.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_for_previous_id_is_discarded() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_ok(1, Duration::from_millis(1000), anime_detail(1, "Cowboy Bebop"));
        catalog.links_ok(1, Duration::from_millis(1000), vec![streaming_link("Netflix")]);
        catalog.detail_ok(5, Duration::from_millis(10), anime_detail(5, "Cowboy Bebop: The Movie"));
        catalog.links_ok(5, Duration::from_millis(10), Vec::new());
        let (_catalog, loader) = start(catalog);

        loader.load(1).unwrap();
        sleep(Duration::from_millis(100)).await;
        loader.load(5).unwrap();

        let state = wait_until(&loader, settled).await;
        assert_eq!(state.mal_id, Some(5));

        sleep(Duration::from_secs(2)).await;
        let state = loader.state();
        assert_eq!(state.mal_id, Some(5));
        assert_eq!(state.detail.unwrap().title, "Cowboy Bebop: The Movie");
        assert!(state.streaming_links.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_id_clears_previous_detail() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_ok(1, Duration::from_millis(10), anime_detail(1, "Cowboy Bebop"));
        catalog.links_ok(1, Duration::from_millis(10), vec![streaming_link("Netflix")]);
        catalog.detail_ok(5, Duration::from_millis(500), anime_detail(5, "Cowboy Bebop: The Movie"));
        catalog.links_ok(5, Duration::from_millis(500), Vec::new());
        let (_catalog, loader) = start(catalog);

        loader.load(1).unwrap();
        wait_until(&loader, settled).await;
        loader.load(5).unwrap();

        let state = wait_until(&loader, |s| s.mal_id == Some(5)).await;
        assert_eq!(state.load_state, LoadState::Loading);
        assert!(state.detail.is_none());
        assert!(state.streaming_links.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_only_from_errored() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_err(1, Duration::from_millis(10));
        catalog.detail_ok(1, Duration::from_millis(10), anime_detail(1, "Cowboy Bebop"));
        catalog.links_ok(1, Duration::from_millis(10), Vec::new());
        let (catalog, loader) = start(catalog);

        loader.load(1).unwrap();
        wait_until(&loader, |s| s.load_state == LoadState::Errored).await;

        loader.retry().unwrap();
        let state = wait_until(&loader, |s| s.load_state == LoadState::Loaded).await;
        assert_eq!(state.detail.unwrap().title, "Cowboy Bebop");
        assert_eq!(state.error, None);

        // Loaded: retry is ignored
        loader.retry().unwrap();
        sleep(Duration::from_secs(1)).await;
        let detail_calls = catalog
            .calls()
            .into_iter()
            .filter(|call| *call == Call::Detail(1))
            .count();
        assert_eq!(detail_calls, 2);
        assert_eq!(loader.state().load_state, LoadState::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_before_first_load_is_ignored() {
        let (catalog, loader) = start(ScriptedCatalog::new());

        loader.retry().unwrap();
        sleep(Duration::from_millis(100)).await;

        assert_eq!(loader.state().load_state, LoadState::Idle);
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_same_id_again_is_noop() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_ok(1, Duration::from_millis(10), anime_detail(1, "Cowboy Bebop"));
        catalog.links_ok(1, Duration::from_millis(10), Vec::new());
        let (catalog, loader) = start(catalog);

        loader.load(1).unwrap();
        wait_until(&loader, settled).await;
        loader.load(1).unwrap();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(catalog.calls().len(), 2);
        assert_eq!(loader.state().load_state, LoadState::Loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_state_change_after_shutdown() {
        let catalog = ScriptedCatalog::new();
        catalog.detail_ok(1, Duration::from_millis(500), anime_detail(1, "Cowboy Bebop"));
        catalog.links_ok(1, Duration::from_millis(500), Vec::new());
        let (_catalog, loader) = start(catalog);

        loader.load(1).unwrap();
        let rx = loader.subscribe();
        sleep(Duration::from_millis(100)).await;
        assert_eq!(rx.borrow().load_state, LoadState::Loading);

        loader.shutdown().await;
        sleep(Duration::from_secs(1)).await;

        assert_eq!(rx.borrow().load_state, LoadState::Loading);
        assert!(rx.borrow().detail.is_none());
    }
}
