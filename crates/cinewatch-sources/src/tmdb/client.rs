use async_trait::async_trait;
use cinewatch_config::TmdbConfig;
use cinewatch_models::{select_trailer, MovieId, Video};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use crate::error::SourceError;
use crate::tmdb::api;
use crate::traits::TrailerSource;

#[derive(Clone)]
pub struct TmdbClient {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client: Arc::new(client),
            api_key,
            base_url,
        }
    }

    /// Build a client from the `[tmdb]` config section
    pub fn from_config(config: &TmdbConfig) -> Result<Self, SourceError> {
        let api_key = config.resolved_api_key().ok_or(SourceError::MissingApiKey)?;
        Ok(Self::new(
            api_key,
            config.base_url.clone(),
            Duration::from_secs(config.timeout_seconds),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TrailerSource for TmdbClient {
    fn source_name(&self) -> &str {
        "tmdb"
    }

    async fn find_trailer(&self, movie_id: MovieId) -> Result<Option<Video>, SourceError> {
        let videos = api::get_videos(&self.client, &self.base_url, &self.api_key, movie_id).await?;
        let trailer = select_trailer(&videos.results).cloned();
        if trailer.is_none() {
            debug!("No YouTube trailer among {} videos for movie {}", videos.results.len(), movie_id);
        }
        Ok(trailer)
    }
}
