use clap::{ArgAction, Parser, Subcommand};
use cinewatch_config::{Config, PathManager};
use cinewatch_core::{ContinueWatching, JsonFileStorage};
use color_eyre::eyre::{eyre, WrapErr};
use commands::history::RecordArgs;
use commands::{config, history};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "cinewatch")]
#[command(about = "CineWatch - Pick up the movies you were just looking at")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long = "config", global = true, value_name = "FILE")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a movie at the front of the continue-watching row
    #[command(long_about = "Record a movie the user engaged with. Re-recording a movie moves it to the front instead of duplicating it, and only the three most recent movies are kept. With --fetch-trailer the movie's YouTube trailer is looked up on TMDB and cached.")]
    Record(RecordArgs),

    /// Cache a trailer for the most recent movie
    Trailer {
        /// Movie the trailer belongs to
        #[arg(long)]
        movie_id: u64,

        /// YouTube video key
        #[arg(long)]
        key: String,

        /// Embed URL (derived from the key when omitted)
        #[arg(long)]
        embed_url: Option<String>,

        /// Skip the update unless the movie is still the most recent entry
        #[arg(long, action = ArgAction::SetTrue)]
        only_if_current: bool,
    },

    /// Remove a movie from the history
    Remove {
        /// TMDB movie id
        id: u64,
    },

    /// Update playback progress of a movie
    Progress {
        /// TMDB movie id
        id: u64,

        /// Percentage watched (0-100)
        #[arg(value_parser = clap::value_parser!(u32).range(0..=100))]
        value: u32,
    },

    /// Show the continue-watching row and cached trailer
    List,

    /// Forget all history and the cached trailer
    Clear,

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration (masks the API key)
    Show {
        /// Show the API key unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Write a config file with default values
    Init {
        /// Overwrite an existing config file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let path_manager = PathManager::default();
    let config_file = cli.config_path.clone().unwrap_or_else(|| path_manager.config_file());
    let config = Config::load_or_default(&config_file)
        .map_err(|e| eyre!("Failed to load config from {}: {}", config_file.display(), e))?;

    logging::init_logging(cli.verbose, cli.quiet, &config.logging)
        .map_err(|e| eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    if let Commands::Config { cmd } = cli.command {
        let cmd = cmd.unwrap_or(ConfigCommands::Show { full: false });
        return config::run_config(cmd, &config, &config_file, &output);
    }

    config.validate().map_err(|e| eyre!("Invalid configuration: {}", e))?;

    path_manager
        .ensure_directories()
        .map_err(|e| eyre!("Failed to create data directories: {}", e))?;

    // The store lives for exactly one command and is flushed on the way out
    let storage = JsonFileStorage::from_paths(&path_manager, &config.history);
    let history_path = storage.path().to_path_buf();
    let mut store = ContinueWatching::open(storage)
        .wrap_err_with(|| format!("Failed to open history at {}", history_path.display()))?;
    tracing::debug!("Opened {} history entries from {}", store.len(), history_path.display());

    let result = match cli.command {
        Commands::Record(args) => history::run_record(&mut store, &config, args, &output).await,
        Commands::Trailer { movie_id, key, embed_url, only_if_current } => {
            history::run_trailer(&mut store, movie_id, key, embed_url, only_if_current, &output)
        }
        Commands::Remove { id } => history::run_remove(&mut store, id, &output),
        Commands::Progress { id, value } => history::run_progress(&mut store, id, value, &output),
        Commands::List => history::run_list(&store, &output),
        Commands::Clear => history::run_clear(&mut store, &output),
        Commands::Config { .. } => unreachable!("handled before opening the store"),
    };

    store
        .close()
        .wrap_err_with(|| format!("Failed to save history to {}", history_path.display()))?;
    result
}
