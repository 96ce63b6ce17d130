use crate::output::{Output, OutputFormat};
use clap::{ArgAction, Args};
use cinewatch_config::Config;
use cinewatch_core::{track_movie_click, ContinueWatching, HistoryStorage, TrackingOptions, TrailerOutcome};
use cinewatch_models::{youtube_embed_url, ClickSource, Movie, MovieId};
use cinewatch_sources::TmdbClient;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use comfy_table::{Cell, Table};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// TMDB movie id
    #[arg(long, required_unless_present = "movie_json")]
    pub id: Option<MovieId>,

    /// Movie title
    #[arg(long, required_unless_present = "movie_json")]
    pub title: Option<String>,

    /// Poster path (e.g. /abc.jpg)
    #[arg(long)]
    pub poster: Option<String>,

    /// Backdrop path
    #[arg(long)]
    pub backdrop: Option<String>,

    /// Average vote
    #[arg(long)]
    pub rating: Option<f64>,

    /// Release date (YYYY-MM-DD)
    #[arg(long)]
    pub release_date: Option<String>,

    /// Synopsis
    #[arg(long)]
    pub overview: Option<String>,

    /// Runtime in minutes
    #[arg(long)]
    pub runtime: Option<u32>,

    /// Read the movie from a TMDB movie JSON file; other flags override its fields
    #[arg(long, value_name = "FILE", conflicts_with_all = ["id", "title"])]
    pub movie_json: Option<PathBuf>,

    /// Percentage already watched
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub progress: u32,

    /// Where the click came from: trending, popular, search, genre, recommendations or watchlist
    #[arg(long, default_value = "unknown")]
    pub source: ClickSource,

    /// Look up the movie's trailer on TMDB and cache it
    #[arg(long, action = ArgAction::SetTrue)]
    pub fetch_trailer: bool,
}

fn build_movie(args: &RecordArgs) -> Result<Movie> {
    let mut movie = match &args.movie_json {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str::<Movie>(&content)
                .wrap_err_with(|| format!("{} is not a movie record", path.display()))?
        }
        None => {
            let id = args.id.ok_or_else(|| eyre!("--id is required without --movie-json"))?;
            let title = args
                .title
                .clone()
                .ok_or_else(|| eyre!("--title is required without --movie-json"))?;
            Movie::new(id, title)
        }
    };

    if let Some(poster) = &args.poster {
        movie.poster_path = Some(poster.clone());
    }
    if let Some(backdrop) = &args.backdrop {
        movie.backdrop_path = Some(backdrop.clone());
    }
    if let Some(rating) = args.rating {
        movie.vote_average = rating;
    }
    if let Some(release_date) = &args.release_date {
        movie.release_date = release_date.clone();
    }
    if let Some(overview) = &args.overview {
        movie.overview = overview.clone();
    }
    if args.runtime.is_some() {
        movie.runtime = args.runtime;
    }
    Ok(movie)
}

pub async fn run_record<S: HistoryStorage>(
    store: &mut ContinueWatching<S>,
    config: &Config,
    args: RecordArgs,
    output: &Output,
) -> Result<()> {
    let movie = build_movie(&args)?;
    let label = format!("\"{}\" ({})", movie.title, movie.id);

    if !args.fetch_trailer {
        store.record(movie, args.progress, args.source);
        output.success(format!("Recorded {}", label));
        return Ok(());
    }

    let client = match TmdbClient::from_config(&config.tmdb) {
        Ok(client) => client,
        Err(e) => {
            store.record(movie, args.progress, args.source);
            output.success(format!("Recorded {}", label));
            output.warn(format!("Skipped trailer lookup: {}", e));
            return Ok(());
        }
    };

    let options = TrackingOptions {
        progress: args.progress,
        require_current: config.history.require_trailer_match,
    };
    let outcome = track_movie_click(store, &client, movie, args.source, options).await;
    output.success(format!("Recorded {}", label));

    match outcome {
        TrailerOutcome::Attached(trailer) => output.info(format!("Cached trailer: {}", trailer.embed_url)),
        TrailerOutcome::NotFound => output.info("No YouTube trailer found"),
        TrailerOutcome::Stale => output.warn("Trailer skipped: movie is no longer the most recent entry"),
        TrailerOutcome::LookupFailed(e) => output.warn(format!("Trailer lookup failed: {}", e)),
    }
    Ok(())
}

pub fn run_trailer<S: HistoryStorage>(
    store: &mut ContinueWatching<S>,
    movie_id: MovieId,
    key: String,
    embed_url: Option<String>,
    only_if_current: bool,
    output: &Output,
) -> Result<()> {
    let embed_url = embed_url.unwrap_or_else(|| youtube_embed_url(&key));

    if only_if_current {
        if store.set_trailer_if_current(movie_id, key, embed_url) {
            output.success(format!("Cached trailer for movie {}", movie_id));
        } else {
            output.warn(format!("Movie {} is not the most recent entry, trailer not cached", movie_id));
        }
        return Ok(());
    }

    store.set_trailer_for_most_recent(movie_id, key, embed_url);
    output.success(format!("Cached trailer for movie {}", movie_id));
    if store.trailer_for_most_recent().is_none() {
        output.warn(format!("Movie {} is not the most recent entry", movie_id));
    }
    Ok(())
}

pub fn run_remove<S: HistoryStorage>(store: &mut ContinueWatching<S>, id: MovieId, output: &Output) -> Result<()> {
    if store.remove(id) {
        output.success(format!("Removed movie {}", id));
    } else {
        output.info(format!("Movie {} is not in the history", id));
    }
    Ok(())
}

pub fn run_progress<S: HistoryStorage>(
    store: &mut ContinueWatching<S>,
    id: MovieId,
    value: u32,
    output: &Output,
) -> Result<()> {
    if store.update_progress(id, value) {
        output.success(format!("Movie {} progress set to {}%", id, value));
    } else {
        output.info(format!("Movie {} is not in the history", id));
    }
    Ok(())
}

pub fn run_clear<S: HistoryStorage>(store: &mut ContinueWatching<S>, output: &Output) -> Result<()> {
    let count = store.len();
    store.clear();
    output.success(format!("Cleared {} entr{}", count, if count == 1 { "y" } else { "ies" }));
    Ok(())
}

pub fn run_list<S: HistoryStorage>(store: &ContinueWatching<S>, output: &Output) -> Result<()> {
    if output.format() != OutputFormat::Human {
        let state = serde_json::to_value(store.snapshot())?;
        output.json(&json!({
            "continueWatching": state["continueWatching"],
            "lastWatchedTrailer": state["lastWatchedTrailer"],
            "trailerMatchesMostRecent": store.trailer_for_most_recent().is_some(),
        }));
        return Ok(());
    }

    if output.is_quiet() {
        return Ok(());
    }

    if store.is_empty() {
        output.info("Nothing to continue watching");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table.set_header(
        ["#", "ID", "Title", "Year", "Progress", "Source", "Last watched"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(comfy_table::Attribute::Bold)),
    );
    for (i, entry) in store.entries().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(entry.id()),
            Cell::new(&entry.movie.title),
            Cell::new(entry.movie.release_year().map(|y| y.to_string()).unwrap_or_default()),
            Cell::new(format!("{}%", entry.progress)),
            Cell::new(entry.click_source),
            Cell::new(entry.last_watched.format("%Y-%m-%d %H:%M UTC")),
        ]);
    }
    println!("{}", table);

    match (store.trailer_for_most_recent(), store.trailer()) {
        (Some(trailer), _) => output.info(format!("Trailer: {}", trailer.embed_url)),
        (None, Some(trailer)) => output.warn(format!(
            "Cached trailer belongs to movie {}, which is not the most recent entry",
            trailer.movie_id
        )),
        (None, None) => {}
    }
    Ok(())
}
