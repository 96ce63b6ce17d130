use serde::{Deserialize, Serialize};
use crate::movie::MovieId;

const TRAILER_TYPE: &str = "Trailer";
const TRAILER_SITE: &str = "YouTube";

/// The single cached trailer shown next to the most recent entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrailerRef {
    pub key: String,
    #[serde(rename = "embedUrl")]
    pub embed_url: String,
    #[serde(rename = "movieId")]
    pub movie_id: MovieId,
    /// Capture time in epoch milliseconds
    pub timestamp: i64,
}

/// Entry of TMDB's `/movie/{id}/videos` response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type", default)]
    pub video_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideosResponse {
    #[serde(default)]
    pub results: Vec<Video>,
}

/// First video that is a YouTube-hosted trailer
pub fn select_trailer(videos: &[Video]) -> Option<&Video> {
    videos
        .iter()
        .find(|v| v.video_type == TRAILER_TYPE && v.site == TRAILER_SITE)
}

/// Autoplaying, muted embed URL for a YouTube video key
pub fn youtube_embed_url(key: &str) -> String {
    format!("https://www.youtube.com/embed/{}?autoplay=1&mute=1", key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(key: &str, site: &str, video_type: &str) -> Video {
        Video {
            id: format!("id-{}", key),
            key: key.to_string(),
            name: format!("{} {}", site, video_type),
            site: site.to_string(),
            video_type: video_type.to_string(),
        }
    }

    #[test]
    fn test_select_trailer_skips_teasers_and_other_hosts() {
        let videos = vec![
            video("teaser1", "YouTube", "Teaser"),
            video("vimeo1", "Vimeo", "Trailer"),
            video("yt1", "YouTube", "Trailer"),
            video("yt2", "YouTube", "Trailer"),
        ];
        assert_eq!(select_trailer(&videos).map(|v| v.key.as_str()), Some("yt1"));
    }

    #[test]
    fn test_select_trailer_none() {
        assert!(select_trailer(&[]).is_none());
        assert!(select_trailer(&[video("clip", "YouTube", "Clip")]).is_none());
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            youtube_embed_url("d9MyW72ELq0"),
            "https://www.youtube.com/embed/d9MyW72ELq0?autoplay=1&mute=1"
        );
    }

    #[test]
    fn test_videos_response_decodes() {
        let json = r#"{"id": 603, "results": [
            {"iso_639_1": "en", "name": "Official Trailer", "key": "vKQi3bBA1y8",
             "site": "YouTube", "size": 1080, "type": "Trailer", "official": true,
             "id": "5c9294240e0a267cd516835f"}
        ]}"#;
        let response: VideosResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(select_trailer(&response.results).unwrap().key, "vKQi3bBA1y8");
    }

    #[test]
    fn test_trailer_ref_wire_names() {
        let trailer = TrailerRef {
            key: "abc".to_string(),
            embed_url: youtube_embed_url("abc"),
            movie_id: 9,
            timestamp: 5,
        };
        let value = serde_json::to_value(&trailer).unwrap();
        assert_eq!(value["movieId"], 9);
        assert_eq!(value["embedUrl"], "https://www.youtube.com/embed/abc?autoplay=1&mute=1");
    }
}
