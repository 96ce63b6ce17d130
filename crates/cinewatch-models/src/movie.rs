use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// TMDB movie identifier
pub type MovieId = u64;

/// A movie record as handed over by the metadata layer.
///
/// Only `id` and `title` are required. Everything else defaults when the
/// upstream record leaves it out, and fields this struct does not model
/// (`genre_ids`, `popularity`, ...) are kept in `extra` so they survive a
/// trip through the history file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>, // Minutes, only present on detail responses
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Metadata records send `null` for blank scalars; treat it like a missing key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Movie {
    /// Create a movie with just the required fields
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            poster_path: None,
            backdrop_path: None,
            vote_average: 0.0,
            release_date: String::new(),
            overview: String::new(),
            runtime: None,
            extra: Map::new(),
        }
    }

    /// Release year parsed from `release_date` (YYYY-MM-DD)
    pub fn release_year(&self) -> Option<u32> {
        self.release_date.get(..4).and_then(|y| y.parse().ok())
    }
}
