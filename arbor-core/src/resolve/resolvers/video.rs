use std::collections::BTreeMap;
use std::path::Path;

use arbor_model::{BaseItem, CollectionType, ExtraType, ItemType};

use crate::error::Result;
use crate::fs::FsEntry;
use crate::naming::{
    ExtrasParser, clean_name, file_name, file_stem, parent_name,
    parse_stack_part,
};
use crate::resolve::context::ResolutionContext;
use crate::resolve::resolver::{
    BatchContext, ItemResolver, MultiItemResolution, MultiItemResolver,
    ResolverPriority,
};

/// Entity for a single video file: an extra when it sits in an extras
/// folder, a trailer when its name says so, a movie in movie-like
/// libraries and a plain video otherwise.
pub fn video_item(
    path: &Path,
    collection_type: Option<CollectionType>,
) -> BaseItem {
    let stem = file_stem(path).unwrap_or_default();

    if ExtrasParser::is_in_extras_folder(path) {
        let extra = ExtrasParser::classify(path);
        let item_type = if extra == ExtraType::Trailer {
            ItemType::Trailer
        } else {
            ItemType::Video
        };
        let mut item = BaseItem::new(item_type);
        item.name = clean_name(stem).name;
        item.extra_type = Some(extra);
        return item;
    }

    if ExtrasParser::is_trailer_file(path) {
        let mut item = BaseItem::new(ItemType::Trailer);
        item.name = clean_name(stem).name;
        item.extra_type = Some(ExtraType::Trailer);
        return item;
    }

    let item_type = if CollectionType::holds_movies(collection_type) {
        ItemType::Movie
    } else {
        ItemType::Video
    };
    let cleaned = clean_name(stem);
    let mut item = BaseItem::new(item_type);
    item.name = cleaned.name;
    item.production_year = cleaned.year;
    item
}

/// Any video file nobody else claimed.
#[derive(Debug, Default, Clone, Copy)]
pub struct VideoResolver;

impl ItemResolver for VideoResolver {
    fn name(&self) -> &str {
        "video"
    }

    fn priority(&self) -> ResolverPriority {
        ResolverPriority::FOURTH
    }

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>> {
        if ctx.is_directory() || !ctx.config.is_video_file(ctx.path()) {
            return Ok(None);
        }
        Ok(Some(video_item(ctx.path(), ctx.collection_type)))
    }
}

/// Resolves the video files of one movie-library folder together so that
/// stacked parts (`cd1`, `part2`, ...) become one movie. Directories and
/// non-video files are handed back as extra files.
#[derive(Debug, Default, Clone, Copy)]
pub struct MovieBatchResolver;

impl MovieBatchResolver {
    fn stacked_movie(parts: &[(u32, &FsEntry)], title: &str) -> BaseItem {
        let cleaned = clean_name(title);
        let mut item = BaseItem::new(ItemType::Movie);
        item.name = cleaned.name;
        item.production_year = cleaned.year;
        item.path = parts.first().map(|(_, entry)| entry.path.clone());
        item.additional_parts = parts
            .iter()
            .skip(1)
            .map(|(_, entry)| entry.path.clone())
            .collect();
        item
    }
}

impl MultiItemResolver for MovieBatchResolver {
    fn name(&self) -> &str {
        "movie-batch"
    }

    fn resolve_multiple(
        &self,
        batch: &BatchContext<'_>,
    ) -> Result<Option<MultiItemResolution>> {
        if !CollectionType::holds_movies(batch.collection_type) {
            return Ok(None);
        }
        if let Some(parent) = batch.parent
            && matches!(
                parent.item_type,
                ItemType::Series
                    | ItemType::Season
                    | ItemType::AggregateFolder
                    | ItemType::UserRootFolder
            )
        {
            return Ok(None);
        }

        let mut resolution = MultiItemResolution::default();
        let mut standalone: Vec<&FsEntry> = Vec::new();
        // Keyed by lower-cased title so output order is deterministic.
        let mut stacks: BTreeMap<String, (String, Vec<(u32, &FsEntry)>)> =
            BTreeMap::new();

        for entry in batch.files {
            if entry.is_dir || !batch.config.is_video_file(&entry.path) {
                resolution.extra_files.push(entry.clone());
                continue;
            }
            let in_extras = parent_name(&entry.path)
                .is_some_and(ExtrasParser::is_extras_folder);
            let stack = file_stem(&entry.path).and_then(parse_stack_part);
            match stack {
                Some(part)
                    if !in_extras
                        && !ExtrasParser::is_trailer_file(&entry.path) =>
                {
                    stacks
                        .entry(part.base)
                        .or_insert_with(|| (part.title, Vec::new()))
                        .1
                        .push((part.part, entry));
                }
                _ => standalone.push(entry),
            }
        }

        for (_, (title, mut parts)) in stacks {
            if parts.len() == 1 {
                standalone.extend(parts.iter().map(|(_, entry)| *entry));
                continue;
            }
            parts.sort_by(|a, b| {
                a.0.cmp(&b.0).then_with(|| {
                    file_name(&a.1.path).cmp(&file_name(&b.1.path))
                })
            });
            resolution.items.push(Self::stacked_movie(&parts, &title));
        }

        for entry in standalone {
            let mut item = video_item(&entry.path, batch.collection_type);
            item.path = Some(entry.path.clone());
            resolution.items.push(item);
        }

        if resolution.items.is_empty() {
            return Ok(None);
        }
        Ok(Some(resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LibraryConfig;
    use std::path::PathBuf;

    fn batch<'a>(
        files: &'a [FsEntry],
        config: &'a LibraryConfig,
        collection_type: Option<CollectionType>,
    ) -> BatchContext<'a> {
        BatchContext {
            files,
            parent: None,
            collection_type,
            config,
        }
    }

    #[test]
    fn stacked_parts_become_one_movie() {
        let config = LibraryConfig::with_data_path("/data");
        let files = vec![
            FsEntry::file("/movies/Kill Bill/Kill Bill cd2.mkv", 1),
            FsEntry::file("/movies/Kill Bill/Kill Bill cd1.mkv", 1),
            FsEntry::file("/movies/Kill Bill/Kill Bill-trailer.mkv", 1),
            FsEntry::file("/movies/Kill Bill/poster.jpg", 1),
            FsEntry::directory("/movies/Kill Bill/extras"),
        ];

        let movies = batch(&files, &config, Some(CollectionType::Movies));
        let resolution = MovieBatchResolver
            .resolve_multiple(&movies)
            .unwrap()
            .expect("claimed");

        assert_eq!(resolution.items.len(), 2);
        let movie = &resolution.items[0];
        assert_eq!(movie.item_type, ItemType::Movie);
        assert_eq!(movie.name, "Kill Bill");
        assert_eq!(
            movie.path,
            Some(PathBuf::from("/movies/Kill Bill/Kill Bill cd1.mkv"))
        );
        assert_eq!(
            movie.additional_parts,
            vec![PathBuf::from("/movies/Kill Bill/Kill Bill cd2.mkv")]
        );

        let trailer = &resolution.items[1];
        assert_eq!(trailer.item_type, ItemType::Trailer);
        assert_eq!(trailer.extra_type, Some(ExtraType::Trailer));
        assert_eq!(resolution.extra_files.len(), 2);
    }

    #[test]
    fn declines_outside_movie_libraries() {
        let config = LibraryConfig::with_data_path("/data");
        let files = vec![FsEntry::file("/tv/Lost/S01E01.mkv", 1)];
        let shows = batch(&files, &config, Some(CollectionType::TvShows));
        let result = MovieBatchResolver.resolve_multiple(&shows).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn extras_folder_videos_keep_their_classification() {
        let item = video_item(
            Path::new("/movies/Heat/behind the scenes/shootout.mkv"),
            Some(CollectionType::Movies),
        );
        assert_eq!(item.item_type, ItemType::Video);
        assert_eq!(item.extra_type, Some(ExtraType::BehindTheScenes));

        let trailer = video_item(
            Path::new("/movies/Heat/trailers/teaser.mkv"),
            Some(CollectionType::Movies),
        );
        assert_eq!(trailer.item_type, ItemType::Trailer);
    }
}
