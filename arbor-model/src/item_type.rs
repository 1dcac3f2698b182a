use std::fmt::{Display, Formatter};

/// Concrete variant of a library entity.
///
/// The qualified name is part of every derived item id, so renaming a
/// variant's qualified name re-keys every entity of that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemType {
    /// Physical root aggregating every library location
    AggregateFolder,
    /// Per-user root holding the configured collection folders
    UserRootFolder,
    /// A configured library ("virtual folder")
    CollectionFolder,
    Folder,
    Video,
    Movie,
    Trailer,
    Series,
    Season,
    Episode,
    Audio,
    Photo,
    Person,
    Genre,
    MusicGenre,
    GameGenre,
    Studio,
    Year,
    MusicArtist,
    UserView,
}

impl ItemType {
    pub const ALL: [ItemType; 20] = [
        ItemType::AggregateFolder,
        ItemType::UserRootFolder,
        ItemType::CollectionFolder,
        ItemType::Folder,
        ItemType::Video,
        ItemType::Movie,
        ItemType::Trailer,
        ItemType::Series,
        ItemType::Season,
        ItemType::Episode,
        ItemType::Audio,
        ItemType::Photo,
        ItemType::Person,
        ItemType::Genre,
        ItemType::MusicGenre,
        ItemType::GameGenre,
        ItemType::Studio,
        ItemType::Year,
        ItemType::MusicArtist,
        ItemType::UserView,
    ];

    /// Fully-qualified type name mixed into derived ids.
    pub const fn qualified_name(&self) -> &'static str {
        match self {
            ItemType::AggregateFolder => "arbor.entities.AggregateFolder",
            ItemType::UserRootFolder => "arbor.entities.UserRootFolder",
            ItemType::CollectionFolder => "arbor.entities.CollectionFolder",
            ItemType::Folder => "arbor.entities.Folder",
            ItemType::Video => "arbor.entities.Video",
            ItemType::Movie => "arbor.entities.movies.Movie",
            ItemType::Trailer => "arbor.entities.Trailer",
            ItemType::Series => "arbor.entities.tv.Series",
            ItemType::Season => "arbor.entities.tv.Season",
            ItemType::Episode => "arbor.entities.tv.Episode",
            ItemType::Audio => "arbor.entities.audio.Audio",
            ItemType::Photo => "arbor.entities.Photo",
            ItemType::Person => "arbor.entities.Person",
            ItemType::Genre => "arbor.entities.Genre",
            ItemType::MusicGenre => "arbor.entities.audio.MusicGenre",
            ItemType::GameGenre => "arbor.entities.GameGenre",
            ItemType::Studio => "arbor.entities.Studio",
            ItemType::Year => "arbor.entities.Year",
            ItemType::MusicArtist => "arbor.entities.audio.MusicArtist",
            ItemType::UserView => "arbor.entities.UserView",
        }
    }

    /// Variants whose children are reconciled against the file system.
    pub fn is_folder(&self) -> bool {
        matches!(
            self,
            ItemType::AggregateFolder
                | ItemType::UserRootFolder
                | ItemType::CollectionFolder
                | ItemType::Folder
                | ItemType::Series
                | ItemType::Season
        )
    }

    /// Variants keyed by a human name rather than a media path.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            ItemType::Person
                | ItemType::Genre
                | ItemType::MusicGenre
                | ItemType::GameGenre
                | ItemType::Studio
                | ItemType::Year
                | ItemType::MusicArtist
        )
    }

    pub fn is_video(&self) -> bool {
        matches!(
            self,
            ItemType::Video
                | ItemType::Movie
                | ItemType::Trailer
                | ItemType::Episode
        )
    }
}

impl Display for ItemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = self.qualified_name();
        let short = name.rsplit('.').next().unwrap_or(name);
        f.write_str(short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn qualified_names_are_unique() {
        let names: HashSet<_> =
            ItemType::ALL.iter().map(|t| t.qualified_name()).collect();
        assert_eq!(names.len(), ItemType::ALL.len());
    }

    #[test]
    fn display_uses_short_name() {
        assert_eq!(ItemType::Episode.to_string(), "Episode");
        assert_eq!(ItemType::MusicArtist.to_string(), "MusicArtist");
    }
}
