use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where in the UI a movie was clicked from.
///
/// Tags outside the known set (including the "category" tag some carousels
/// send) collapse into `Unknown` instead of failing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ClickSource {
    Trending,
    Popular,
    Search,
    Genre,
    Recommendations,
    Watchlist,
    #[default]
    Unknown,
}

impl ClickSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickSource::Trending => "trending",
            ClickSource::Popular => "popular",
            ClickSource::Search => "search",
            ClickSource::Genre => "genre",
            ClickSource::Recommendations => "recommendations",
            ClickSource::Watchlist => "watchlist",
            ClickSource::Unknown => "unknown",
        }
    }

    /// Map a raw tag onto the closed set, falling back to `Unknown`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "trending" => ClickSource::Trending,
            "popular" => ClickSource::Popular,
            "search" => ClickSource::Search,
            "genre" => ClickSource::Genre,
            "recommendations" => ClickSource::Recommendations,
            "watchlist" => ClickSource::Watchlist,
            _ => ClickSource::Unknown,
        }
    }
}

impl From<String> for ClickSource {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl FromStr for ClickSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl fmt::Display for ClickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
