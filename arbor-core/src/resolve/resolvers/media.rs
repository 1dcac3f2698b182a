use arbor_model::{BaseItem, CollectionType, ItemType};

use crate::error::Result;
use crate::naming::file_stem;
use crate::resolve::context::ResolutionContext;
use crate::resolve::resolver::{ItemResolver, ResolverPriority};

fn named_after_file(item_type: ItemType, ctx: &ResolutionContext) -> BaseItem {
    let mut item = BaseItem::new(item_type);
    item.name = file_stem(ctx.path()).unwrap_or_default().trim().to_string();
    item
}

/// Audio tracks in music or mixed libraries.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioResolver;

impl ItemResolver for AudioResolver {
    fn name(&self) -> &str {
        "audio"
    }

    fn priority(&self) -> ResolverPriority {
        ResolverPriority::THIRD
    }

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>> {
        if ctx.is_directory() || !ctx.config.is_audio_file(ctx.path()) {
            return Ok(None);
        }
        match ctx.collection_type {
            None | Some(CollectionType::Music | CollectionType::Mixed) => {
                Ok(Some(named_after_file(ItemType::Audio, ctx)))
            }
            Some(_) => Ok(None),
        }
    }
}

/// Images in photo and home-video libraries; elsewhere images are artwork.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhotoResolver;

impl ItemResolver for PhotoResolver {
    fn name(&self) -> &str {
        "photo"
    }

    fn priority(&self) -> ResolverPriority {
        ResolverPriority::THIRD
    }

    fn resolve(&self, ctx: &ResolutionContext) -> Result<Option<BaseItem>> {
        if ctx.is_directory() || !ctx.config.is_image_file(ctx.path()) {
            return Ok(None);
        }
        match ctx.collection_type {
            Some(CollectionType::Photos | CollectionType::HomeVideos) => {
                Ok(Some(named_after_file(ItemType::Photo, ctx)))
            }
            _ => Ok(None),
        }
    }
}
