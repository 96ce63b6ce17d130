pub mod click_source;
pub mod movie;
pub mod state;
pub mod trailer;
pub mod watch_entry;

pub use click_source::ClickSource;
pub use movie::{Movie, MovieId};
pub use state::HistoryState;
pub use trailer::{select_trailer, youtube_embed_url, TrailerRef, Video, VideosResponse};
pub use watch_entry::WatchEntry;
