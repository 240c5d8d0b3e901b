//! Anime search CLI application.
//!
//! A terminal front end over the live search and detail coordinators.

use anime_search::route::DetachedNavigator;
use anime_search::{
    Browser, CoordinatorClosed, DetailLoader, DetailState, JikanClient, LiveSearch, Route,
    SearchRoute, SearchState, Snapshot,
};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use shared::{Config, LoadState, LogConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search the catalog and print one page of results
    Search {
        /// Search text
        query: String,

        /// Page to show (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Show the details and streaming links of one title
    Detail {
        /// MyAnimeList ID
        mal_id: u32,
    },

    /// Browse interactively; every input line replaces the search text
    Browse {
        /// Address to start from, e.g. "/?q=naruto&page=2" or "/anime/20"
        #[arg(long, default_value = "/")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mut log_config = LogConfig::from_settings("anime-search", &config.log_dir(), &config.logging);
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    shared::logging::init(log_config)?;

    info!(config_file = %args.config.display(), "Loaded configuration");

    let client = Arc::new(
        JikanClient::from_config(&config.catalog).context("Failed to create Jikan client")?,
    );

    match args.command {
        Commands::Search { query, page } => run_search(client, &config, &query, page).await,
        Commands::Detail { mal_id } => run_detail(client, mal_id).await,
        Commands::Browse { url } => run_browse(client, &config, &url).await,
    }
}

fn settled(load_state: LoadState) -> bool {
    matches!(load_state, LoadState::Loaded | LoadState::Errored)
}

async fn run_search(client: Arc<JikanClient>, config: &Config, query: &str, page: u32) -> Result<()> {
    let route = SearchRoute::new(query, page);
    if route.is_empty() {
        bail!("Search text must not be empty");
    }

    let search = LiveSearch::spawn(client, Arc::new(DetachedNavigator), route, config.debounce());
    let state = search
        .subscribe()
        .wait_for(|s| settled(s.load_state))
        .await
        .map_err(|_| anyhow!("Search coordinator stopped unexpectedly"))?
        .clone();
    search.shutdown().await;

    render_search(&state);
    match state.error {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

async fn run_detail(client: Arc<JikanClient>, mal_id: u32) -> Result<()> {
    let loader = DetailLoader::spawn(client);
    loader.load(mal_id)?;

    let state = loader
        .subscribe()
        .wait_for(|s| settled(s.load_state))
        .await
        .map_err(|_| anyhow!("Detail loader stopped unexpectedly"))?
        .clone();
    loader.shutdown().await;

    render_detail(&state);
    match state.error {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

async fn run_browse(client: Arc<JikanClient>, config: &Config, url: &str) -> Result<()> {
    let start = Route::parse(url).with_context(|| format!("Invalid start address: {}", url))?;
    let mut browser = Browser::start(client, start, config.debounce())?;
    let mut updates = browser.subscribe();

    println!("Type to search. Commands: :page N, :next, :prev, :retry, :open ID, :back, :forward, :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_rendered: Option<SearchState> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Retry => browser.retry()?,
                    Input::Open(mal_id) => {
                        browser.open(mal_id).await?;
                        updates = browser.subscribe();
                        last_rendered = None;
                    }
                    Input::Back => {
                        if browser.back().await? {
                            updates = browser.subscribe();
                            last_rendered = None;
                        } else {
                            println!("(no further history)");
                        }
                    }
                    Input::Forward => {
                        if browser.forward().await? {
                            updates = browser.subscribe();
                            last_rendered = None;
                        } else {
                            println!("(no further history)");
                        }
                    }
                    Input::Invalid(message) => println!("{}", message),
                    input => match browser.search() {
                        Some(search) => search_input(search, input)?,
                        None => println!("Not on the search view (:back to return)"),
                    },
                }
            }
            Some(snapshot) = updates.changed() => match snapshot {
                Snapshot::Search(state) => {
                    if !last_rendered.as_ref().is_some_and(|last| same_view(last, &state)) {
                        println!("{}", browser.address());
                        render_search(&state);
                        last_rendered = Some(state);
                    }
                }
                Snapshot::Detail(state) => {
                    println!("{}", browser.address());
                    render_detail(&state);
                }
            },
        }
    }

    browser.close().await;
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Input {
    Text(String),
    Page(u32),
    Next,
    Prev,
    Retry,
    Open(u32),
    Back,
    Forward,
    Quit,
    Invalid(String),
}

/// Forward text and page input to the search coordinator
fn search_input(search: &LiveSearch, input: Input) -> Result<(), CoordinatorClosed> {
    match input {
        Input::Text(text) => search.set_query_text(text),
        Input::Page(page) => search.set_page(page),
        Input::Next => search.set_page(search.state().page.saturating_add(1)),
        Input::Prev => search.set_page(search.state().page.saturating_sub(1)),
        _ => Ok(()),
    }
}

fn parse_input(line: &str) -> Input {
    let Some(command) = line.trim().strip_prefix(':') else {
        return Input::Text(line.to_string());
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let argument = parts.next();

    match (name, argument) {
        ("q" | "quit", _) => Input::Quit,
        ("next", _) => Input::Next,
        ("prev", _) => Input::Prev,
        ("retry", _) => Input::Retry,
        ("back", _) => Input::Back,
        ("forward", _) => Input::Forward,
        ("page", Some(n)) => n
            .parse()
            .map(Input::Page)
            .unwrap_or_else(|_| Input::Invalid(format!("Not a page number: {}", n))),
        ("open", Some(id)) => id
            .parse()
            .map(Input::Open)
            .unwrap_or_else(|_| Input::Invalid(format!("Not an anime id: {}", id))),
        _ => Input::Invalid(format!("Unknown command: :{}", command)),
    }
}

/// Whether two snapshots render identically (raw typing alone does not)
fn same_view(a: &SearchState, b: &SearchState) -> bool {
    a.effective_query == b.effective_query
        && a.page == b.page
        && a.page_count == b.page_count
        && a.load_state == b.load_state
        && a.results == b.results
        && a.error == b.error
}

fn render_search(state: &SearchState) {
    match state.load_state {
        LoadState::Idle => {
            println!("Search for your favorite anime...");
            return;
        }
        LoadState::Loading => {
            println!("Searching for \"{}\"...", state.effective_query);
            return;
        }
        LoadState::Errored => {
            println!("{} (:retry to try again)", state.error.as_deref().unwrap_or_default());
        }
        LoadState::Loaded => {}
    }

    if state.results.is_empty() {
        println!("No results found for \"{}\"", state.effective_query);
        println!("Try searching with different keywords");
        return;
    }

    for anime in &state.results {
        let score = anime
            .score
            .map(|score| format!("  ★ {}", score))
            .unwrap_or_default();
        let subtitle = anime
            .subtitle()
            .map(|line| format!("  {}", line))
            .unwrap_or_default();
        println!("  [{}] {}{}{}", anime.mal_id, anime.title, score, subtitle);
    }

    if state.page_count > 1 {
        match state.total_items {
            Some(total) => println!("Page {} of {} ({} titles)", state.page, state.page_count, total),
            None => println!("Page {} of {}", state.page, state.page_count),
        }
    }
}

fn render_detail(state: &DetailState) {
    match state.load_state {
        LoadState::Idle => return,
        LoadState::Loading => {
            println!("Loading anime details...");
            return;
        }
        LoadState::Errored => {
            println!("{} (:retry to try again)", state.error.as_deref().unwrap_or_default());
            return;
        }
        LoadState::Loaded => {}
    }

    let Some(anime) = &state.detail else {
        return;
    };

    println!("{}", anime.title);
    if let Some(url) = &anime.url {
        println!("  {}", url);
    }
    if let Some(poster) = &anime.poster_url {
        println!("  Poster: {}", poster);
    }

    let users = anime
        .scored_by_label()
        .map(|count| format!(" ({} users)", count))
        .unwrap_or_default();
    println!(
        "  Score {}{} | Ranked {} | Popularity {} | Members {}",
        anime.score_label(),
        users,
        anime.rank_label(),
        anime.popularity_label(),
        anime.members_label()
    );
    println!();
    println!("{}", anime.synopsis_text());

    if !state.streaming_links.is_empty() {
        println!();
        println!("Streaming:");
        for link in &state.streaming_links {
            println!("  {}: {}", link.name, link.url);
        }
    }
}
