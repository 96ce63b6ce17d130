pub mod config;
pub mod paths;

pub use config::{Config, HistoryConfig, LoggingConfig, TmdbConfig, TMDB_API_KEY_ENV};
pub use paths::{PathManager, container_base_path};
