use cinewatch_models::{MovieId, VideosResponse};
use reqwest::Client;
use tracing::debug;
use crate::error::SourceError;

pub fn videos_url(base_url: &str, movie_id: MovieId) -> String {
    format!("{}/movie/{}/videos", base_url.trim_end_matches('/'), movie_id)
}

pub async fn get_videos(
    client: &Client,
    base_url: &str,
    api_key: &str,
    movie_id: MovieId,
) -> Result<VideosResponse, SourceError> {
    let url = videos_url(base_url, movie_id);
    debug!("Fetching videos for movie {}", movie_id);

    let response = client
        .get(&url)
        .query(&[("api_key", api_key)])
        .header("Accept", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Status { status, body });
    }

    let videos: VideosResponse = response.json().await?;
    debug!("Movie {} has {} videos", movie_id, videos.results.len());
    Ok(videos)
}
