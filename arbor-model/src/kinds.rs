use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Where an entity's content lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocationType {
    #[default]
    FileSystem,
    Remote,
    Virtual,
    Offline,
}

/// Bonus-content classification for videos that accompany a main title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtraType {
    Clip,
    Trailer,
    BehindTheScenes,
    DeletedScene,
    Interview,
    Scene,
    Sample,
}

impl Display for ExtraType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtraType::Clip => write!(f, "Clip"),
            ExtraType::Trailer => write!(f, "Trailer"),
            ExtraType::BehindTheScenes => write!(f, "Behind the Scenes"),
            ExtraType::DeletedScene => write!(f, "Deleted Scene"),
            ExtraType::Interview => write!(f, "Interview"),
            ExtraType::Scene => write!(f, "Scene"),
            ExtraType::Sample => write!(f, "Sample"),
        }
    }
}

/// Content-type hint attached to a library and inherited by its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CollectionType {
    Movies,
    TvShows,
    Music,
    MusicVideos,
    HomeVideos,
    Photos,
    BoxSets,
    Books,
    Mixed,
}

impl CollectionType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Movies => "movies",
            CollectionType::TvShows => "tvshows",
            CollectionType::Music => "music",
            CollectionType::MusicVideos => "musicvideos",
            CollectionType::HomeVideos => "homevideos",
            CollectionType::Photos => "photos",
            CollectionType::BoxSets => "boxsets",
            CollectionType::Books => "books",
            CollectionType::Mixed => "mixed",
        }
    }

    /// Libraries whose loose video files are treated as movies.
    pub fn holds_movies(collection: Option<CollectionType>) -> bool {
        matches!(
            collection,
            None | Some(CollectionType::Movies)
                | Some(CollectionType::HomeVideos)
                | Some(CollectionType::MusicVideos)
                | Some(CollectionType::Mixed)
        )
    }
}

impl Display for CollectionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movies" => Ok(CollectionType::Movies),
            "tvshows" | "tv" | "series" => Ok(CollectionType::TvShows),
            "music" => Ok(CollectionType::Music),
            "musicvideos" => Ok(CollectionType::MusicVideos),
            "homevideos" => Ok(CollectionType::HomeVideos),
            "photos" => Ok(CollectionType::Photos),
            "boxsets" => Ok(CollectionType::BoxSets),
            "books" => Ok(CollectionType::Books),
            "mixed" => Ok(CollectionType::Mixed),
            other => Err(ModelError::InvalidValue(format!(
                "unknown collection type '{other}'"
            ))),
        }
    }
}
