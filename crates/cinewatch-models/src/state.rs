use serde::{Deserialize, Serialize};
use crate::movie::MovieId;
use crate::trailer::TrailerRef;
use crate::watch_entry::WatchEntry;

/// Everything the history store persists, most recent entry first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HistoryState {
    #[serde(rename = "continueWatching", default)]
    pub continue_watching: Vec<WatchEntry>,
    #[serde(rename = "lastWatchedTrailer", default)]
    pub last_watched_trailer: Option<TrailerRef>,
}

impl HistoryState {
    pub fn position(&self, id: MovieId) -> Option<usize> {
        self.continue_watching.iter().position(|e| e.id() == id)
    }

    pub fn front(&self) -> Option<&WatchEntry> {
        self.continue_watching.first()
    }
}
