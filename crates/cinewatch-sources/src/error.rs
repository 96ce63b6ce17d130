use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No TMDB API key configured (set tmdb.api_key or TMDB_API_KEY)")]
    MissingApiKey,
}
