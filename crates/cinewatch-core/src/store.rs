use cinewatch_models::{ClickSource, HistoryState, Movie, MovieId, TrailerRef, WatchEntry};
use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use tracing::{debug, info, warn};
use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::storage::HistoryStorage;

/// Most entries the "continue watching" row ever holds
pub const MAX_CONTINUE_WATCHING: usize = 3;

/// Bounded, most-recent-first history of engaged movies plus one cached trailer.
///
/// The store is owned by whoever composes the application and handed out by
/// `&mut`. Each mutation changes the in-memory state through a
/// [`PersistGuard`], which writes the state back to storage when it goes out
/// of scope. Write failures are logged and leave the store dirty; the next
/// mutation, [`flush`](Self::flush), [`close`](Self::close) or drop retries.
pub struct ContinueWatching<S: HistoryStorage> {
    state: HistoryState,
    storage: S,
    clock: Box<dyn Clock>,
    dirty: bool,
    failed_writes: u64,
}

impl<S: HistoryStorage> ContinueWatching<S> {
    /// Load from storage, or start empty when nothing is stored
    pub fn open(storage: S) -> Result<Self, StoreError> {
        Self::open_with_clock(storage, Box::new(SystemClock))
    }

    pub fn open_with_clock(mut storage: S, clock: Box<dyn Clock>) -> Result<Self, StoreError> {
        let state = match storage.load()? {
            Some(state) => normalize(state),
            None => HistoryState::default(),
        };
        debug!("Opened history with {} entries", state.continue_watching.len());

        Ok(Self {
            state,
            storage,
            clock,
            dirty: false,
            failed_writes: 0,
        })
    }

    /// Push a movie to the front of the history.
    ///
    /// An existing entry for the same id is replaced rather than duplicated,
    /// and anything past [`MAX_CONTINUE_WATCHING`] is dropped. Fields are
    /// carried through without validation.
    pub fn record(&mut self, movie: Movie, progress: u32, source: ClickSource) {
        let entry = WatchEntry::new(movie, progress, source, self.clock.now());
        let id = entry.id();

        let mut state = self.persist();
        state.continue_watching.retain(|e| e.id() != id);
        state.continue_watching.insert(0, entry);
        if state.continue_watching.len() > MAX_CONTINUE_WATCHING {
            for evicted in state.continue_watching.drain(MAX_CONTINUE_WATCHING..) {
                debug!("Evicted movie {} from continue watching", evicted.id());
            }
        }
        debug!("Recorded movie {} from {}", id, source);
    }

    /// Overwrite the trailer slot.
    ///
    /// The slot is replaced even when `movie_id` is no longer the most recent
    /// entry; last writer wins. Use [`set_trailer_if_current`](Self::set_trailer_if_current)
    /// to only attach trailers that still match the front of the list.
    pub fn set_trailer_for_most_recent(&mut self, movie_id: MovieId, key: String, embed_url: String) {
        if let Some(front) = self.state.front() {
            if front.id() != movie_id {
                debug!(
                    "Caching trailer for movie {} while movie {} is most recent",
                    movie_id,
                    front.id()
                );
            }
        }
        let timestamp = self.clock.now().timestamp_millis();

        let mut state = self.persist();
        state.last_watched_trailer = Some(TrailerRef {
            key,
            embed_url,
            movie_id,
            timestamp,
        });
    }

    /// Set the trailer only if `movie_id` is still the most recent entry.
    /// Returns whether the slot was written.
    pub fn set_trailer_if_current(&mut self, movie_id: MovieId, key: String, embed_url: String) -> bool {
        if self.most_recent().map(|e| e.id()) != Some(movie_id) {
            debug!("Dropping trailer for movie {}: no longer most recent", movie_id);
            return false;
        }
        self.set_trailer_for_most_recent(movie_id, key, embed_url);
        true
    }

    /// Remove a movie from the history. Returns whether anything was removed.
    pub fn remove(&mut self, movie_id: MovieId) -> bool {
        let Some(pos) = self.state.position(movie_id) else {
            return false;
        };
        self.persist().continue_watching.remove(pos);
        debug!("Removed movie {} from continue watching", movie_id);
        true
    }

    /// Set progress on an existing entry and refresh its watch time.
    /// Returns whether the movie was present.
    pub fn update_progress(&mut self, movie_id: MovieId, progress: u32) -> bool {
        let Some(pos) = self.state.position(movie_id) else {
            return false;
        };
        let now = self.clock.now();
        self.persist().continue_watching[pos].touch(progress, now);
        debug!("Movie {} progress set to {}", movie_id, progress);
        true
    }

    /// Drop all entries and the cached trailer
    pub fn clear(&mut self) {
        let mut state = self.persist();
        state.continue_watching.clear();
        state.last_watched_trailer = None;
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.state.continue_watching
    }

    pub fn most_recent(&self) -> Option<&WatchEntry> {
        self.state.front()
    }

    pub fn get(&self, movie_id: MovieId) -> Option<&WatchEntry> {
        self.state.continue_watching.iter().find(|e| e.id() == movie_id)
    }

    pub fn len(&self) -> usize {
        self.state.continue_watching.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.continue_watching.is_empty()
    }

    /// Cached trailer, whichever movie it belongs to
    pub fn trailer(&self) -> Option<&TrailerRef> {
        self.state.last_watched_trailer.as_ref()
    }

    /// Cached trailer, only if it belongs to the current most recent entry
    pub fn trailer_for_most_recent(&self) -> Option<&TrailerRef> {
        let front = self.most_recent()?;
        self.trailer().filter(|t| t.movie_id == front.id())
    }

    /// The state exactly as it is persisted
    pub fn snapshot(&self) -> &HistoryState {
        &self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of background writes that failed since opening
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    /// Write the current state now, surfacing any storage error
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.storage.save(&self.state)?;
        self.dirty = false;
        Ok(())
    }

    /// Flush and release the store
    pub fn close(mut self) -> Result<(), StoreError> {
        self.flush()?;
        info!("Closed history with {} entries", self.len());
        Ok(())
    }

    fn persist(&mut self) -> PersistGuard<'_, S> {
        PersistGuard { store: self }
    }

    fn flush_quietly(&mut self) {
        match self.storage.save(&self.state) {
            Ok(()) => self.dirty = false,
            Err(e) => {
                self.failed_writes += 1;
                warn!("Failed to persist history (will retry on next change): {}", e);
            }
        }
    }
}

impl<S: HistoryStorage> Drop for ContinueWatching<S> {
    fn drop(&mut self) {
        if self.dirty {
            self.flush_quietly();
        }
    }
}

/// Scoped mutable access to the store state.
///
/// Any mutable borrow marks the store dirty, and dropping the guard writes
/// a dirty state to storage on every exit path.
pub struct PersistGuard<'a, S: HistoryStorage> {
    store: &'a mut ContinueWatching<S>,
}

impl<S: HistoryStorage> Deref for PersistGuard<'_, S> {
    type Target = HistoryState;

    fn deref(&self) -> &HistoryState {
        &self.store.state
    }
}

impl<S: HistoryStorage> DerefMut for PersistGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut HistoryState {
        self.store.dirty = true;
        &mut self.store.state
    }
}

impl<S: HistoryStorage> Drop for PersistGuard<'_, S> {
    fn drop(&mut self) {
        if self.store.dirty {
            self.store.flush_quietly();
        }
    }
}

/// Re-establish the size and uniqueness invariants on loaded data
fn normalize(mut state: HistoryState) -> HistoryState {
    let before = state.continue_watching.len();
    let mut seen = HashSet::new();
    state.continue_watching.retain(|e| seen.insert(e.id()));
    state.continue_watching.truncate(MAX_CONTINUE_WATCHING);
    if state.continue_watching.len() != before {
        warn!(
            "Stored history had {} entries, kept {} after removing duplicates and overflow",
            before,
            state.continue_watching.len()
        );
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonFileStorage, MemoryStorage};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    /// Clock that advances one second per reading
    #[derive(Clone)]
    struct StepClock {
        secs: Arc<AtomicI64>,
    }

    impl StepClock {
        fn starting_at(secs: i64) -> Self {
            Self {
                secs: Arc::new(AtomicI64::new(secs)),
            }
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.secs.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(secs, 0).unwrap()
        }
    }

    fn open_memory() -> (ContinueWatching<MemoryStorage>, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = ContinueWatching::open_with_clock(
            storage.clone(),
            Box::new(StepClock::starting_at(1_700_000_000)),
        )
        .unwrap();
        (store, storage)
    }

    fn movie(id: MovieId) -> Movie {
        Movie::new(id, format!("Movie {}", id))
    }

    fn ids<S: HistoryStorage>(store: &ContinueWatching<S>) -> Vec<MovieId> {
        store.entries().iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_length_never_exceeds_cap() {
        let (mut store, _) = open_memory();
        for id in 0..20 {
            store.record(movie(id % 7), 0, ClickSource::Trending);
            assert!(store.len() <= MAX_CONTINUE_WATCHING);
        }
    }

    #[test]
    fn test_rerecord_moves_to_front_without_duplicate() {
        let (mut store, _) = open_memory();
        store.record(movie(1), 0, ClickSource::Trending);
        store.record(movie(2), 0, ClickSource::Trending);
        store.record(movie(1), 0, ClickSource::Search);
        assert_eq!(ids(&store), vec![1, 2]);
        assert_eq!(store.most_recent().unwrap().click_source, ClickSource::Search);
    }

    #[test]
    fn test_oldest_is_evicted() {
        let (mut store, _) = open_memory();
        for id in [1, 2, 3, 4] {
            store.record(movie(id), 0, ClickSource::Popular);
        }
        assert_eq!(ids(&store), vec![4, 3, 2]);
        assert!(store.get(1).is_none());
    }

    #[test]
    fn test_record_stamps_clock_time() {
        let (mut store, _) = open_memory();
        store.record(movie(5), 25, ClickSource::Genre);
        let entry = store.most_recent().unwrap();
        assert_eq!(entry.progress, 25);
        assert_eq!(entry.timestamp, 1_700_000_000_000);
        assert_eq!(entry.last_watched, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn test_record_does_not_touch_trailer() {
        let (mut store, _) = open_memory();
        store.record(movie(1), 0, ClickSource::Trending);
        store.set_trailer_for_most_recent(1, "k1".into(), "u1".into());
        store.record(movie(2), 0, ClickSource::Trending);
        assert_eq!(store.trailer().unwrap().movie_id, 1);
    }

    #[test]
    fn test_trailer_overwrites_regardless_of_front() {
        let (mut store, _) = open_memory();
        store.record(movie(10), 0, ClickSource::Trending);
        store.record(movie(20), 0, ClickSource::Trending);

        // Movie 10's lookup resolves after 20 became the front entry
        store.set_trailer_for_most_recent(10, "late".into(), "late-url".into());
        let trailer = store.trailer().unwrap();
        assert_eq!(trailer.movie_id, 10);
        assert_eq!(trailer.key, "late");
        assert!(store.trailer_for_most_recent().is_none());

        store.set_trailer_for_most_recent(20, "fresh".into(), "fresh-url".into());
        assert_eq!(store.trailer_for_most_recent().unwrap().key, "fresh");
    }

    #[test]
    fn test_guarded_trailer_only_for_front() {
        let (mut store, _) = open_memory();
        assert!(!store.set_trailer_if_current(1, "k".into(), "u".into()));

        store.record(movie(1), 0, ClickSource::Trending);
        store.record(movie(2), 0, ClickSource::Trending);
        assert!(!store.set_trailer_if_current(1, "k".into(), "u".into()));
        assert!(store.trailer().is_none());

        assert!(store.set_trailer_if_current(2, "k2".into(), "u2".into()));
        assert_eq!(store.trailer().unwrap().movie_id, 2);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let (mut store, storage) = open_memory();
        store.record(movie(1), 0, ClickSource::Trending);
        store.record(movie(2), 0, ClickSource::Trending);
        let saves = storage.save_count();

        assert!(!store.remove(99));
        assert_eq!(ids(&store), vec![2, 1]);
        assert_eq!(storage.save_count(), saves);

        assert!(store.remove(1));
        assert_eq!(ids(&store), vec![2]);
    }

    #[test]
    fn test_update_progress_only_touches_target() {
        let (mut store, _) = open_memory();
        store.record(movie(1), 0, ClickSource::Trending);
        store.record(movie(2), 0, ClickSource::Trending);
        let untouched = store.get(2).unwrap().clone();
        let before = store.get(1).unwrap().clone();

        assert!(store.update_progress(1, 42));
        let after = store.get(1).unwrap();
        assert_eq!(after.progress, 42);
        assert!(after.last_watched > before.last_watched);
        assert!(after.timestamp > before.timestamp);
        assert_eq!(store.get(2).unwrap(), &untouched);
        assert_eq!(ids(&store), vec![2, 1]);
    }

    #[test]
    fn test_update_progress_absent_leaves_list() {
        let (mut store, _) = open_memory();
        store.record(movie(1), 0, ClickSource::Trending);
        let before = store.snapshot().clone();
        assert!(!store.update_progress(7, 42));
        assert_eq!(store.snapshot(), &before);
    }

    #[test]
    fn test_every_mutation_persists() {
        let (mut store, storage) = open_memory();
        store.record(movie(1), 0, ClickSource::Trending);
        assert_eq!(storage.save_count(), 1);
        store.set_trailer_for_most_recent(1, "k".into(), "u".into());
        assert_eq!(storage.save_count(), 2);
        store.update_progress(1, 10);
        assert_eq!(storage.save_count(), 3);
        store.remove(1);
        assert_eq!(storage.save_count(), 4);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_reload_reproduces_state() {
        let (mut store, storage) = open_memory();
        let mut detailed = movie(3);
        detailed.runtime = Some(112);
        detailed.poster_path = Some("/p.jpg".to_string());
        detailed.extra.insert("genre_ids".to_string(), serde_json::json!([18]));
        store.record(movie(1), 0, ClickSource::Trending);
        store.record(movie(2), 5, ClickSource::Unknown);
        store.record(detailed, 60, ClickSource::Watchlist);
        store.set_trailer_for_most_recent(3, "key".into(), "url".into());
        let expected = store.snapshot().clone();
        drop(store);

        let reopened = ContinueWatching::open(storage).unwrap();
        assert_eq!(reopened.snapshot(), &expected);
        assert_eq!(ids(&reopened), vec![3, 2, 1]);
    }

    #[test]
    fn test_rerecorded_entry_json_reloads_identically() {
        let (mut store, storage) = open_memory();
        store.record(movie(1), 40, ClickSource::Search);
        let listed = serde_json::to_value(store.most_recent().unwrap()).unwrap();
        let fed_back: Movie = serde_json::from_value(listed).unwrap();

        store.record(fed_back, 0, ClickSource::Trending);
        let entry = store.most_recent().unwrap();
        assert_eq!(entry.progress, 0);
        assert!(entry.movie.extra.is_empty());
        let expected = store.snapshot().clone();
        drop(store);

        let reopened = ContinueWatching::open(storage).unwrap();
        assert_eq!(reopened.snapshot(), &expected);
    }

    #[test]
    fn test_history_with_null_fields_loads() {
        let storage = MemoryStorage::with_value(serde_json::json!({
            "state": {
                "continueWatching": [{
                    "id": 9, "title": "Untitled", "release_date": null, "overview": null,
                    "vote_average": null, "progress": 0,
                    "lastWatched": "2024-01-01T00:00:00.000Z", "timestamp": 1704067200000_i64,
                    "clickSource": "popular"
                }],
                "lastWatchedTrailer": null
            },
            "version": 1
        }));
        let store = ContinueWatching::open(storage).unwrap();
        let entry = store.most_recent().unwrap();
        assert_eq!(entry.id(), 9);
        assert_eq!(entry.movie.release_date, "");
        assert_eq!(entry.movie.vote_average, 0.0);
    }

    #[test]
    fn test_failed_write_keeps_mutation_and_retries() {
        let (mut store, storage) = open_memory();
        storage.set_fail_writes(true);

        store.record(movie(1), 0, ClickSource::Trending);
        assert_eq!(ids(&store), vec![1]);
        assert!(store.is_dirty());
        assert_eq!(store.failed_writes(), 1);
        assert!(storage.value().is_none());
        assert!(store.flush().is_err());

        storage.set_fail_writes(false);
        store.flush().unwrap();
        assert!(!store.is_dirty());
        let saved = ContinueWatching::open(storage.clone()).unwrap();
        assert_eq!(ids(&saved), vec![1]);
    }

    #[test]
    fn test_drop_flushes_dirty_state() {
        let (mut store, storage) = open_memory();
        storage.set_fail_writes(true);
        store.record(movie(8), 0, ClickSource::Search);
        storage.set_fail_writes(false);
        drop(store);

        let reopened = ContinueWatching::open(storage).unwrap();
        assert_eq!(ids(&reopened), vec![8]);
    }

    #[test]
    fn test_clear() {
        let (mut store, storage) = open_memory();
        store.record(movie(1), 0, ClickSource::Trending);
        store.set_trailer_for_most_recent(1, "k".into(), "u".into());
        store.clear();
        assert!(store.is_empty());
        assert!(store.trailer().is_none());
        store.close().unwrap();
        assert_eq!(
            storage.value().unwrap()["state"],
            serde_json::json!({"continueWatching": [], "lastWatchedTrailer": null})
        );
    }

    #[test]
    fn test_open_normalizes_oversized_history() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let entries: Vec<WatchEntry> = [1, 2, 1, 3, 4]
            .into_iter()
            .enumerate()
            .map(|(i, id)| WatchEntry::new(movie(id), 0, ClickSource::Trending, now - Duration::seconds(i as i64)))
            .collect();
        let state = HistoryState {
            continue_watching: entries,
            last_watched_trailer: None,
        };
        let storage = MemoryStorage::with_value(crate::migration::encode(&state).unwrap());

        let store = ContinueWatching::open(storage).unwrap();
        assert_eq!(ids(&store), vec![1, 2, 3]);
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("continue-watching-storage.json");

        let mut store = ContinueWatching::open(JsonFileStorage::new(&path)).unwrap();
        store.record(movie(1), 0, ClickSource::Popular);
        store.record(movie(2), 0, ClickSource::Popular);
        store.close().unwrap();

        let store = ContinueWatching::open(JsonFileStorage::new(&path)).unwrap();
        assert_eq!(ids(&store), vec![2, 1]);
    }

    #[test]
    fn test_unknown_source_survives_reload() {
        let storage = MemoryStorage::with_value(serde_json::json!({
            "state": {
                "continueWatching": [{
                    "id": 1, "title": "A", "progress": 0,
                    "lastWatched": "2024-01-01T00:00:00.000Z", "timestamp": 1704067200000_i64,
                    "clickSource": "category"
                }],
                "lastWatchedTrailer": null
            },
            "version": 1
        }));
        let store = ContinueWatching::open(storage).unwrap();
        assert_eq!(store.most_recent().unwrap().click_source, ClickSource::Unknown);
    }
}
