use cinewatch_models::{youtube_embed_url, ClickSource, Movie, TrailerRef};
use cinewatch_sources::TrailerSource;
use tracing::{debug, error, info};
use crate::storage::HistoryStorage;
use crate::store::ContinueWatching;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrackingOptions {
    /// Progress recorded with the click
    pub progress: u32,
    /// Only attach the trailer if the movie is still the most recent entry
    /// once the lookup resolves
    pub require_current: bool,
}

/// What happened to the trailer part of a tracked click
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailerOutcome {
    Attached(TrailerRef),
    NotFound,
    /// Found, but the movie was no longer the most recent entry
    Stale,
    LookupFailed(String),
}

/// Record a clicked movie, then look up and cache its trailer.
///
/// The entry is recorded before the lookup starts and stays recorded no
/// matter how the lookup ends. Lookup errors are logged, not returned.
pub async fn track_movie_click<S, T>(
    store: &mut ContinueWatching<S>,
    trailers: &T,
    movie: Movie,
    source: ClickSource,
    options: TrackingOptions,
) -> TrailerOutcome
where
    S: HistoryStorage,
    T: TrailerSource + ?Sized,
{
    let movie_id = movie.id;
    store.record(movie, options.progress, source);

    let video = match trailers.find_trailer(movie_id).await {
        Ok(Some(video)) => video,
        Ok(None) => {
            debug!("{} has no trailer for movie {}", trailers.source_name(), movie_id);
            return TrailerOutcome::NotFound;
        }
        Err(e) => {
            error!("Error fetching trailer for movie {}: {}", movie_id, e);
            return TrailerOutcome::LookupFailed(e.to_string());
        }
    };

    let embed_url = youtube_embed_url(&video.key);
    if options.require_current {
        if !store.set_trailer_if_current(movie_id, video.key, embed_url) {
            return TrailerOutcome::Stale;
        }
    } else {
        store.set_trailer_for_most_recent(movie_id, video.key, embed_url);
    }

    match store.trailer() {
        Some(trailer) => {
            info!("Cached trailer {} for movie {}", trailer.key, movie_id);
            TrailerOutcome::Attached(trailer.clone())
        }
        None => TrailerOutcome::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use cinewatch_models::{MovieId, Video};
    use cinewatch_sources::SourceError;

    enum Canned {
        Trailer(&'static str),
        Nothing,
        Fail,
    }

    struct CannedSource(Canned);

    #[async_trait]
    impl TrailerSource for CannedSource {
        fn source_name(&self) -> &str {
            "canned"
        }

        async fn find_trailer(&self, _movie_id: MovieId) -> Result<Option<Video>, SourceError> {
            match self.0 {
                Canned::Trailer(key) => Ok(Some(Video {
                    id: "v".to_string(),
                    key: key.to_string(),
                    name: "Official Trailer".to_string(),
                    site: "YouTube".to_string(),
                    video_type: "Trailer".to_string(),
                })),
                Canned::Nothing => Ok(None),
                Canned::Fail => Err(SourceError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            }
        }
    }

    fn open() -> ContinueWatching<MemoryStorage> {
        ContinueWatching::open(MemoryStorage::new()).unwrap()
    }

    #[tokio::test]
    async fn test_click_records_and_attaches_trailer() {
        let mut store = open();
        let source = CannedSource(Canned::Trailer("zSWdZVtXT7E"));

        let outcome = track_movie_click(
            &mut store,
            &source,
            Movie::new(157336, "Interstellar"),
            ClickSource::Trending,
            TrackingOptions::default(),
        )
        .await;

        assert_eq!(store.most_recent().unwrap().id(), 157336);
        let TrailerOutcome::Attached(trailer) = outcome else {
            panic!("expected trailer, got {:?}", outcome);
        };
        assert_eq!(trailer.movie_id, 157336);
        assert_eq!(trailer.embed_url, "https://www.youtube.com/embed/zSWdZVtXT7E?autoplay=1&mute=1");
        assert_eq!(store.trailer_for_most_recent(), Some(&trailer));
    }

    #[tokio::test]
    async fn test_lookup_failure_keeps_entry() {
        let mut store = open();
        let outcome = track_movie_click(
            &mut store,
            &CannedSource(Canned::Fail),
            Movie::new(1, "A"),
            ClickSource::Search,
            TrackingOptions::default(),
        )
        .await;

        assert!(matches!(outcome, TrailerOutcome::LookupFailed(_)));
        assert_eq!(store.len(), 1);
        assert!(store.trailer().is_none());
    }

    #[tokio::test]
    async fn test_no_trailer_leaves_previous_slot() {
        let mut store = open();
        store.record(Movie::new(1, "A"), 0, ClickSource::Trending);
        store.set_trailer_for_most_recent(1, "old".into(), "old-url".into());

        let outcome = track_movie_click(
            &mut store,
            &CannedSource(Canned::Nothing),
            Movie::new(2, "B"),
            ClickSource::Genre,
            TrackingOptions { progress: 5, require_current: false },
        )
        .await;

        assert_eq!(outcome, TrailerOutcome::NotFound);
        assert_eq!(store.most_recent().unwrap().progress, 5);
        assert_eq!(store.trailer().unwrap().key, "old");
        assert!(store.trailer_for_most_recent().is_none());
    }

    #[tokio::test]
    async fn test_trait_object_source() {
        let mut store = open();
        let source: Box<dyn TrailerSource> = Box::new(CannedSource(Canned::Trailer("k")));
        let outcome = track_movie_click(
            &mut store,
            source.as_ref(),
            Movie::new(3, "C"),
            ClickSource::Popular,
            TrackingOptions { progress: 0, require_current: true },
        )
        .await;
        assert!(matches!(outcome, TrailerOutcome::Attached(_)));
    }
}
