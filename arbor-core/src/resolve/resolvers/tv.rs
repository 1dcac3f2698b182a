use arbor_model::{BaseItem, CollectionType, ItemType};

use crate::error::Result;
use crate::naming::{
    EpisodePathParser, ExtrasParser, apply_episode_info, clean_name, file_stem,
    parse_season_folder,
};
use crate::resolve::context::ResolutionContext;
use crate::resolve::resolver::{ItemResolver, ResolverPriority};

fn in_tv_library(ctx: &ResolutionContext) -> bool {
    ctx.collection_type == Some(CollectionType::TvShows)
}

/// Season folders directly below a series.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeasonResolver;

impl ItemResolver for SeasonResolver {
    fn name(&self) -> &str {
        "season"
    }

    fn priority(&self) -> ResolverPriority {
        ResolverPriority::FIRST
    }

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>> {
        if !ctx.is_directory() || !ctx.parent_is(ItemType::Series) {
            return Ok(None);
        }
        let Some(number) = parse_season_folder(ctx.name()) else {
            return Ok(None);
        };

        let mut item = BaseItem::new(ItemType::Season);
        item.index_number = Some(number);
        item.name = if number == 0 {
            ctx.config.season_zero_display_name.clone()
        } else {
            ctx.name().to_string()
        };
        Ok(Some(item))
    }
}

/// Show folders inside a TV library.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeriesResolver;

impl SeriesResolver {
    fn looks_like_series(ctx: &ResolutionContext) -> bool {
        if ctx.parent_is_library_root {
            return true;
        }
        let has_season_folder = ctx
            .child_directories()
            .any(|dir| parse_season_folder(dir.name()).is_some());
        let has_episode_file = ctx.child_files().any(|file| {
            ctx.config.is_video_file(&file.path)
                && EpisodePathParser::parse(&file.path).is_some()
        });
        has_season_folder || has_episode_file
    }
}

impl ItemResolver for SeriesResolver {
    fn name(&self) -> &str {
        "series"
    }

    fn priority(&self) -> ResolverPriority {
        ResolverPriority::SECOND
    }

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>> {
        if !ctx.is_directory() || !in_tv_library(ctx) || ctx.is_library_root {
            return Ok(None);
        }
        if matches!(
            ctx.parent_type(),
            Some(
                ItemType::Series
                    | ItemType::Season
                    | ItemType::UserRootFolder
                    | ItemType::CollectionFolder
            )
        ) {
            return Ok(None);
        }
        let name = ctx.name();
        if parse_season_folder(name).is_some()
            || ExtrasParser::is_extras_folder(name)
            || !Self::looks_like_series(ctx)
        {
            return Ok(None);
        }

        let cleaned = clean_name(name);
        let mut item = BaseItem::new(ItemType::Series);
        item.name = cleaned.name;
        item.production_year = cleaned.year;
        Ok(Some(item))
    }
}

/// Video files inside a series or season folder.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpisodeResolver;

impl ItemResolver for EpisodeResolver {
    fn name(&self) -> &str {
        "episode"
    }

    fn priority(&self) -> ResolverPriority {
        ResolverPriority::SECOND
    }

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>> {
        if ctx.is_directory() || !ctx.config.is_video_file(ctx.path()) {
            return Ok(None);
        }
        let Some(parent) = ctx.parent.as_ref() else {
            return Ok(None);
        };
        if !matches!(parent.item_type, ItemType::Season | ItemType::Series) {
            return Ok(None);
        }
        let path = ctx.path();
        if ExtrasParser::is_in_extras_folder(path)
            || ExtrasParser::is_trailer_file(path)
        {
            return Ok(None);
        }

        let mut item = BaseItem::new(ItemType::Episode);
        item.name = file_stem(path).unwrap_or_default().trim().to_string();
        if let Some(info) = EpisodePathParser::parse(path) {
            let season_fallback = (parent.item_type == ItemType::Season)
                .then_some(parent.index_number)
                .flatten();
            apply_episode_info(&mut item, &info, season_fallback);
        }
        Ok(Some(item))
    }
}
