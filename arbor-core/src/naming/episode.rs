use std::path::Path;

use arbor_model::BaseItem;
use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

use super::{file_stem, parent_name};

/// Season/episode hints extracted from an episode file name.
///
/// Two regimes exist: numbered episodes carry `episode` (and optionally
/// `season` and `end_episode`), dated episodes carry `air_date` only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpisodeInfo {
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Last episode of a multi-episode file
    pub end_episode: Option<u32>,
    pub air_date: Option<NaiveDate>,
}

impl EpisodeInfo {
    pub fn is_by_date(&self) -> bool {
        self.air_date.is_some()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("episode regex should compile")
}

// Date patterns are checked first; a valid calendar date wins over any
// numbered interpretation of the same digits.
static DATE_YMD: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?:^|\D)(\d{4})[\-\. _](\d{1,2})[\-\. _](\d{1,2})(?:\D|$)")
});
static DATE_DMY: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?:^|\D)(\d{1,2})[\-\. _](\d{1,2})[\-\. _](\d{4})(?:\D|$)")
});
static DATE_COMPACT: Lazy<Regex> =
    Lazy::new(|| compile(r"(?:^|\D)(\d{4})(\d{2})(\d{2})(?:\D|$)"));

// The range end must not run into a resolution tag such as `-1080p`.
static MULTI_EPISODE_DASH: Lazy<Regex> = Lazy::new(|| {
    compile(r"[Ss](\d{1,4})[Ee](\d{1,4})-[Ee]?(\d{1,4})(?:[^\dpPiI]|$)")
});
static MULTI_EPISODE_CONCAT: Lazy<Regex> =
    Lazy::new(|| compile(r"[Ss](\d{1,4})[Ee](\d{1,4})[Ee](\d{1,4})"));
static MULTI_EPISODE_X: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?:^|\D)(\d{1,2})[xX](\d{1,3})-[xX]?(\d{1,3})(?:\D|$)")
});
static SXXEYY: Lazy<Regex> =
    Lazy::new(|| compile(r"[Ss](\d{1,4})\s*[Ee](\d{1,4})"));
static NXNN: Lazy<Regex> =
    Lazy::new(|| compile(r"(?:^|\D)(\d{1,2})[xX](\d{1,3})(?:\D|$)"));
static SEASON_EPISODE_WORDS: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)season\s*(\d+)\s*episode\s*(\d+)"));

static FOLDER_EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        compile(r"(?i)(?:^|[^a-z])(?:e|ep|episode)\s*(\d{1,4})"),
        compile(r"^\s*(\d{1,4})\s*[-_.]"),
        compile(r"^(\d{1,3})\s"),
        compile(r"^(\d{1,3})$"),
    ]
});

static SEASON_FOLDER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Season 01, Season1
        compile(r"(?i)^season[\s_.]*(\d+)$"),
        // S01, S1
        compile(r"(?i)^s(\d{1,2})$"),
        // Series 1 (British convention)
        compile(r"(?i)^series[\s_.]*(\d+)$"),
    ]
});

fn number(captures: &Captures<'_>, group: usize) -> Option<u32> {
    captures.get(group)?.as_str().parse().ok()
}

/// Season number encoded by a season folder name; `specials` maps to 0.
pub fn parse_season_folder(folder_name: &str) -> Option<u32> {
    let trimmed = folder_name.trim();
    if trimmed.eq_ignore_ascii_case("specials")
        || trimmed.eq_ignore_ascii_case("special")
    {
        return Some(0);
    }
    SEASON_FOLDER_PATTERNS
        .iter()
        .find_map(|pattern| number(&pattern.captures(trimmed)?, 1))
}

/// Episode naming parser for season/episode and air-date patterns.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpisodePathParser;

impl EpisodePathParser {
    /// Extract episode information from a file path, falling back to the
    /// containing season folder when the name only carries an episode
    /// number.
    pub fn parse(path: &Path) -> Option<EpisodeInfo> {
        let filename = file_stem(path)?;

        if let Some(date) = Self::parse_air_date(filename) {
            trace!("parsed dated episode {date} from {filename}");
            return Some(EpisodeInfo {
                air_date: Some(date),
                ..EpisodeInfo::default()
            });
        }

        if let Some(info) = Self::parse_numbered(filename) {
            trace!(
                "parsed episode S{:?}E{:?}-{:?} from {filename}",
                info.season, info.episode, info.end_episode
            );
            return Some(info);
        }

        Self::parse_from_folder_structure(path, filename)
    }

    fn parse_air_date(filename: &str) -> Option<NaiveDate> {
        let candidates = [
            (&*DATE_YMD, [1, 2, 3]),
            (&*DATE_DMY, [3, 2, 1]),
            (&*DATE_COMPACT, [1, 2, 3]),
        ];
        candidates.into_iter().find_map(|(pattern, [y, m, d])| {
            let captures = pattern.captures(filename)?;
            let year = number(&captures, y)? as i32;
            NaiveDate::from_ymd_opt(
                year,
                number(&captures, m)?,
                number(&captures, d)?,
            )
        })
    }

    fn parse_numbered(filename: &str) -> Option<EpisodeInfo> {
        let ranges =
            [&*MULTI_EPISODE_DASH, &*MULTI_EPISODE_CONCAT, &*MULTI_EPISODE_X];
        for pattern in ranges {
            if let Some(captures) = pattern.captures(filename) {
                let start = number(&captures, 2)?;
                let end = number(&captures, 3).filter(|end| *end >= start);
                return Some(EpisodeInfo {
                    season: number(&captures, 1),
                    episode: Some(start),
                    end_episode: end,
                    air_date: None,
                });
            }
        }

        for pattern in [&*SXXEYY, &*NXNN, &*SEASON_EPISODE_WORDS] {
            if let Some(captures) = pattern.captures(filename) {
                return Some(EpisodeInfo {
                    season: number(&captures, 1),
                    episode: number(&captures, 2),
                    end_episode: None,
                    air_date: None,
                });
            }
        }
        None
    }

    fn parse_from_folder_structure(
        path: &Path,
        filename: &str,
    ) -> Option<EpisodeInfo> {
        let season = parse_season_folder(parent_name(path)?)?;
        FOLDER_EPISODE_PATTERNS.iter().find_map(|pattern| {
            let episode = number(&pattern.captures(filename)?, 1)?;
            Some(EpisodeInfo {
                season: Some(season),
                episode: Some(episode),
                end_episode: None,
                air_date: None,
            })
        })
    }
}

/// Copy parsed episode hints onto an episode entity.
///
/// Dated episodes drop any numbered fields and get a UTC-midnight premiere
/// date plus production year. In both regimes the season comes from the
/// name, then `season_fallback` (the containing season folder); with
/// neither it stays unset.
pub fn apply_episode_info(
    item: &mut BaseItem,
    info: &EpisodeInfo,
    season_fallback: Option<u32>,
) {
    if let Some(date) = info.air_date {
        item.clear_index_numbers();
        item.premiere_date = date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight));
        item.production_year = Some(date.year());
    } else {
        item.index_number = info.episode;
        item.index_number_end = info.end_episode;
    }
    item.parent_index_number = info.season.or(season_fallback);
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_model::ItemType;

    fn parse(path: &str) -> EpisodeInfo {
        EpisodePathParser::parse(Path::new(path)).expect("should parse")
    }

    #[test]
    fn dated_episode_clears_numbers_and_sets_premiere() {
        let info = parse("/tv/Daily Show/2020-05-01 Guest.mkv");
        let mut item =
            BaseItem::with_path(ItemType::Episode, "/tv/x/2020-05-01.mkv");
        item.index_number = Some(7);
        item.index_number_end = Some(8);
        item.parent_index_number = Some(3);

        apply_episode_info(&mut item, &info, None);

        assert_eq!(item.index_number, None);
        assert_eq!(item.index_number_end, None);
        assert_eq!(item.parent_index_number, None);
        assert_eq!(item.production_year, Some(2020));
        let premiere = item.premiere_date.expect("premiere date");
        assert_eq!(premiere.to_rfc3339(), "2020-05-01T00:00:00+00:00");
    }

    #[test]
    fn dated_episode_keeps_season_folder_index() {
        let info = parse("/tv/Daily/Season 2020/Daily 2020-05-01.mkv");
        let mut item = BaseItem::new(ItemType::Episode);
        item.index_number = Some(4);

        apply_episode_info(&mut item, &info, Some(2020));

        assert_eq!(item.index_number, None);
        assert_eq!(item.parent_index_number, Some(2020));
        assert!(item.premiere_date.is_some());
    }

    #[test]
    fn multi_episode_range_sets_all_indices() {
        let info = parse("/tv/Show/Season 2/Show S02E03-E04.mkv");
        let mut item = BaseItem::new(ItemType::Episode);
        apply_episode_info(&mut item, &info, None);

        assert_eq!(item.index_number, Some(3));
        assert_eq!(item.index_number_end, Some(4));
        assert_eq!(item.parent_index_number, Some(2));
    }

    #[test]
    fn resolution_tag_is_not_an_episode_range() {
        let info = parse("Show.S01E02-1080p.mkv");
        assert_eq!(info.season, Some(1));
        assert_eq!(info.episode, Some(2));
        assert_eq!(info.end_episode, None);

        assert_eq!(parse("Show.S01E02-03.720p.mkv").end_episode, Some(3));
    }

    #[test]
    fn season_falls_back_to_folder_only() {
        let info = parse("/tv/Show/Season 5/05 - Pilot.mkv");
        assert_eq!(info.season, Some(5));
        assert_eq!(info.episode, Some(5));

        let bare = EpisodeInfo {
            episode: Some(9),
            ..EpisodeInfo::default()
        };
        let mut item = BaseItem::new(ItemType::Episode);
        apply_episode_info(&mut item, &bare, Some(3));
        assert_eq!(item.parent_index_number, Some(3));

        apply_episode_info(&mut item, &bare, None);
        assert_eq!(item.parent_index_number, None);
    }

    #[test]
    fn recognises_common_numbered_forms() {
        assert_eq!(parse("Show.s01e02.720p.mkv").episode, Some(2));
        assert_eq!(parse("Show 3x07.mkv").season, Some(3));
        assert_eq!(parse("Show S01E01E02.mkv").end_episode, Some(2));
        assert!(EpisodePathParser::parse(Path::new("Show 1920x1080.mkv"))
            .is_none());
    }

    #[test]
    fn invalid_calendar_dates_are_not_dated_episodes() {
        let info = EpisodePathParser::parse(Path::new("Show 2020-13-45.mkv"));
        assert!(info.is_none_or(|info| !info.is_by_date()));
    }

    #[test]
    fn season_folders() {
        assert_eq!(parse_season_folder("Season 01"), Some(1));
        assert_eq!(parse_season_folder("S2"), Some(2));
        assert_eq!(parse_season_folder("Specials"), Some(0));
        assert_eq!(parse_season_folder("Series 4"), Some(4));
        assert_eq!(parse_season_folder("Extras"), None);
    }

    #[test]
    fn parsing_is_idempotent() {
        let path = Path::new("/tv/Show/Season 1/Show S01E05.mkv");
        let first = EpisodePathParser::parse(path);
        let second = EpisodePathParser::parse(path);
        assert_eq!(first, second);
        assert_eq!(path, Path::new("/tv/Show/Season 1/Show S01E05.mkv"));
    }
}
