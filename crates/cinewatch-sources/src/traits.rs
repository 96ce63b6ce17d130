use async_trait::async_trait;
use cinewatch_models::{MovieId, Video};
use crate::error::SourceError;

/// Lookup of the playable trailer for a movie.
///
/// Implementations return `Ok(None)` when the movie simply has no
/// suitable trailer; errors are reserved for transport and API failures.
#[async_trait]
pub trait TrailerSource: Send + Sync {
    fn source_name(&self) -> &str;

    async fn find_trailer(&self, movie_id: MovieId) -> Result<Option<Video>, SourceError>;
}
