use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_PARENS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s*[\(\[](\d{4})[\)\]]")
        .expect("video year paren regex should compile")
});
static YEAR_DOT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)[\._\s]+((?:19|20)\d{2})(?:[\._\s]|$)")
        .expect("video year dot regex should compile")
});
static COLLAPSE_WHITESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("whitespace regex should compile")
});
static STACK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(.*?)[\s_.\-]+(?:cd|dvd|part|pt|disc|disk)[\s_.\-]*(\d{1,2})(.*)$",
    )
    .expect("stack regex should compile")
});

/// Display name and year recovered from a video file or folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanName {
    pub name: String,
    pub year: Option<i32>,
}

/// Collapse dots/underscores into spaces when the name has no spaces of
/// its own (`The.Matrix` style release names).
fn tidy(raw: &str) -> String {
    let spaced = if raw.contains(' ') {
        raw.to_string()
    } else {
        raw.replace(['.', '_'], " ")
    };
    COLLAPSE_WHITESPACE
        .replace_all(spaced.trim(), " ")
        .trim_end_matches(['-', ' '])
        .to_string()
}

/// `Heat (1995)` → `Heat` / 1995, `The.Matrix.1999.1080p` → `The Matrix` /
/// 1999. Names without a recognisable year are only tidied.
pub fn clean_name(raw: &str) -> CleanName {
    let raw = raw.trim();
    for pattern in [&*YEAR_PARENS_PATTERN, &*YEAR_DOT_PATTERN] {
        if let Some(captures) = pattern.captures(raw)
            && let Ok(year) = captures[2].parse::<i32>()
        {
            let name = tidy(&captures[1]);
            if !name.is_empty() {
                return CleanName {
                    name,
                    year: Some(year),
                };
            }
        }
    }
    CleanName {
        name: tidy(raw),
        year: None,
    }
}

/// One part of a multi-file ("stacked") video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackPart {
    /// Name with the part marker removed, as written.
    pub title: String,
    /// Lower-cased `title`; parts of the same video share it.
    pub base: String,
    pub part: u32,
}

/// Detect `Movie cd1`, `Movie - part2`, `Movie.disc1.extended` style names.
pub fn parse_stack_part(stem: &str) -> Option<StackPart> {
    let captures = STACK_PATTERN.captures(stem)?;
    let part = captures[2].parse().ok()?;
    let title = format!("{}{}", captures[1].trim_end(), &captures[3])
        .trim()
        .to_string();
    if title.is_empty() {
        return None;
    }
    Some(StackPart {
        base: title.to_lowercase(),
        title,
        part,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_in_parentheses() {
        let cleaned = clean_name("Heat (1995)");
        assert_eq!(cleaned.name, "Heat");
        assert_eq!(cleaned.year, Some(1995));
    }

    #[test]
    fn dotted_release_names() {
        let cleaned = clean_name("The.Matrix.1999.1080p.BluRay");
        assert_eq!(cleaned.name, "The Matrix");
        assert_eq!(cleaned.year, Some(1999));
    }

    #[test]
    fn names_without_years_are_tidied_only() {
        let cleaned = clean_name("Home_Movies");
        assert_eq!(cleaned.name, "Home Movies");
        assert_eq!(cleaned.year, None);
    }

    #[test]
    fn stack_parts_share_a_base() {
        let first = parse_stack_part("Kill Bill cd1").expect("part one");
        let second = parse_stack_part("Kill Bill - CD2").expect("part two");
        assert_eq!(first.part, 1);
        assert_eq!(second.part, 2);
        assert_eq!(first.base, second.base);
        assert_eq!(first.title, "Kill Bill");
        assert!(parse_stack_part("Heat (1995)").is_none());
    }
}
