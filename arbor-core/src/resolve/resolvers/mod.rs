//! Built-in resolvers, registered by [`builtin_resolvers`] and
//! [`builtin_multi_resolvers`].

mod folder;
mod media;
mod tv;
mod video;

use std::sync::Arc;

pub use folder::{
    COLLECTION_MARKER_EXTENSION, FolderResolver, RootFolderResolver,
};
pub use media::{AudioResolver, PhotoResolver};
pub use tv::{EpisodeResolver, SeasonResolver, SeriesResolver};
pub use video::{MovieBatchResolver, VideoResolver, video_item};

use super::resolver::{ItemResolver, MultiItemResolver};

pub fn builtin_resolvers() -> Vec<Arc<dyn ItemResolver>> {
    vec![
        Arc::new(RootFolderResolver),
        Arc::new(SeasonResolver),
        Arc::new(SeriesResolver),
        Arc::new(EpisodeResolver),
        Arc::new(AudioResolver),
        Arc::new(PhotoResolver),
        Arc::new(VideoResolver),
        Arc::new(FolderResolver),
    ]
}

pub fn builtin_multi_resolvers() -> Vec<Arc<dyn MultiItemResolver>> {
    vec![Arc::new(MovieBatchResolver)]
}
