//! Filename-to-metadata parsing. Everything here is pure: no state, no I/O,
//! and the same input always yields the same output.

pub mod episode;
pub mod extras;
pub mod video;

use std::ffi::OsStr;
use std::path::Path;

pub use episode::{
    EpisodeInfo, EpisodePathParser, apply_episode_info, parse_season_folder,
};
pub use extras::ExtrasParser;
pub use video::{CleanName, StackPart, clean_name, parse_stack_part};

/// Video container extensions recognised by default.
pub const DEFAULT_VIDEO_FILE_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "flv", "wmv", "m4v", "mpg", "mpeg",
    "ts", "m2ts", "iso", "ogv", "3gp",
];

pub const DEFAULT_AUDIO_FILE_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "aac", "m4a", "ogg", "opus", "wav", "wma", "ape", "alac",
];

pub const DEFAULT_IMAGE_FILE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff"];

/// Archive containers; skipped unless archive media support is enabled.
pub const ARCHIVE_FILE_EXTENSIONS: &[&str] =
    &["zip", "rar", "7z", "tar", "gz", "bz2", "xz", "r00", "001"];

/// File name without its extension, if it is valid UTF-8.
pub fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(OsStr::to_str)
}

/// Final path component, if it is valid UTF-8.
pub fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(OsStr::to_str)
}

/// Name of the directory containing `path`.
pub fn parent_name(path: &Path) -> Option<&str> {
    path.parent().and_then(file_name)
}
