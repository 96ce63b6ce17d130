pub mod clock;
pub mod error;
pub mod migration;
pub mod storage;
pub mod store;
pub mod tracking;

pub use clock::{Clock, SystemClock};
pub use error::StoreError;
pub use migration::CURRENT_VERSION;
pub use storage::{HistoryStorage, JsonFileStorage, MemoryStorage};
pub use store::{ContinueWatching, PersistGuard, MAX_CONTINUE_WATCHING};
pub use tracking::{track_movie_click, TrackingOptions, TrailerOutcome};
