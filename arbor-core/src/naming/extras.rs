use std::path::Path;

use arbor_model::ExtraType;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{file_stem, parent_name};

/// Folder that holds trailers only; anything below it is a trailer.
pub const TRAILER_FOLDER_NAME: &str = "trailers";

/// Folders whose video content is bonus material rather than the main
/// feature.
pub const EXTRAS_FOLDER_NAMES: &[&str] = &[
    "extras",
    "trailers",
    "behind the scenes",
    "behindthescenes",
    "deleted scenes",
    "deletedscenes",
    "interviews",
    "scenes",
    "samples",
    "shorts",
    "featurettes",
    "clips",
    "other",
];

/// Keyword vocabulary, matched in order against the normalized folder and
/// file name. `deletedscene` and `behindthescenes` precede `scene` because
/// they contain it.
const KEYWORDS: &[(&str, ExtraType)] = &[
    ("deletedscene", ExtraType::DeletedScene),
    ("behindthescenes", ExtraType::BehindTheScenes),
    ("interview", ExtraType::Interview),
    ("scene", ExtraType::Scene),
    ("sample", ExtraType::Sample),
];

static TRAILER_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\s._-]trailer\d*$")
        .expect("trailer suffix regex should compile")
});

/// Extras parsing utilities for detecting and categorizing bonus content.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtrasParser;

impl ExtrasParser {
    /// Whether `folder_name` is one of the well-known extras folders.
    pub fn is_extras_folder(folder_name: &str) -> bool {
        let lowered = folder_name.trim().to_lowercase();
        EXTRAS_FOLDER_NAMES.contains(&lowered.as_str())
    }

    pub fn is_trailer_folder(folder_name: &str) -> bool {
        folder_name.trim().eq_ignore_ascii_case(TRAILER_FOLDER_NAME)
    }

    /// Whether the file sits directly inside an extras folder.
    pub fn is_in_extras_folder(path: &Path) -> bool {
        parent_name(path).is_some_and(Self::is_extras_folder)
    }

    /// `Movie-trailer.mkv`, `Movie.trailer2.mp4` and similar.
    pub fn is_trailer_file(path: &Path) -> bool {
        file_stem(path).is_some_and(|stem| TRAILER_SUFFIX.is_match(stem))
    }

    /// Classify a bonus file. The dedicated trailer folder always wins;
    /// otherwise the first vocabulary keyword found in the folder name plus
    /// file name decides, defaulting to [`ExtraType::Clip`].
    pub fn classify(path: &Path) -> ExtraType {
        let folder = parent_name(path).unwrap_or_default();
        if Self::is_trailer_folder(folder) {
            return ExtraType::Trailer;
        }

        let haystack = normalize(&format!(
            "{folder} {}",
            file_stem(path).unwrap_or_default()
        ));
        KEYWORDS
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword))
            .map(|(_, extra)| *extra)
            .unwrap_or(ExtraType::Clip)
    }
}

/// Lowercase and drop the separators people put between words.
fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}
