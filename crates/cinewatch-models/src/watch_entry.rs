use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::click_source::ClickSource;
use crate::movie::{Movie, MovieId};

/// Keys written by the entry itself; a movie's extra fields never shadow them
const ENTRY_KEYS: [&str; 4] = ["progress", "lastWatched", "timestamp", "clickSource"];

/// One movie in the "continue watching" row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchEntry {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(default)]
    pub progress: u32, // 0-100 percentage, not validated
    #[serde(rename = "lastWatched")]
    pub last_watched: DateTime<Utc>,
    /// Capture time in epoch milliseconds
    pub timestamp: i64,
    #[serde(rename = "clickSource", default)]
    pub click_source: ClickSource,
}

impl WatchEntry {
    pub fn new(mut movie: Movie, progress: u32, click_source: ClickSource, now: DateTime<Utc>) -> Self {
        for key in ENTRY_KEYS {
            movie.extra.remove(key);
        }
        Self {
            movie,
            progress,
            last_watched: now,
            timestamp: now.timestamp_millis(),
            click_source,
        }
    }

    pub fn id(&self) -> MovieId {
        self.movie.id
    }

    /// Replace progress and refresh both watch timestamps
    pub fn touch(&mut self, progress: u32, now: DateTime<Utc>) {
        self.progress = progress;
        self.last_watched = now;
        self.timestamp = now.timestamp_millis();
    }
}
