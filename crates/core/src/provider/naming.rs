//! Default output naming shared by providers.

use std::io;
use std::path::{Path, PathBuf};

use crate::matcher;

use super::Show;

const EXTENSION: &str = "mp4";

/// Replace characters that are unsafe in file names on common filesystems.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_matches(|c: char| c == '.' || c == ' ').to_string()
}

fn series_part(show: &Show) -> String {
    let series = sanitize_file_name(&show.show);
    if series.is_empty() {
        "Unknown".to_string()
    } else {
        series
    }
}

// Titles that only repeat the numbering ("S01E02") carry no information.
fn title_part(show: &Show) -> Option<String> {
    if matcher::strip_episode_tokens(&matcher::fold(&show.title)).is_empty() {
        return None;
    }
    let title = sanitize_file_name(&show.title);
    (!title.is_empty()).then_some(title)
}

/// `Series - s01e02 - Title.mp4`, falling back to the air date or the
/// provider id when the show has no numbering.
pub fn episode_file_name(show: &Show) -> String {
    let series = series_part(show);
    let title = title_part(show);

    let middle = match show.episode_number() {
        Some(number) => Some(match number.season {
            Some(season) => format!("s{:02}e{:02}", season, number.episode),
            None => format!("e{:02}", number.episode),
        }),
        None => show.aired_at.map(|d| d.format("%Y-%m-%d").to_string()),
    };

    let parts: Vec<String> = match (middle, title) {
        (Some(middle), Some(title)) => vec![series, middle, title],
        (Some(middle), None) => vec![series, middle],
        (None, Some(title)) => vec![series, title],
        (None, None) => vec![series, sanitize_file_name(&show.id)],
    };
    format!("{}.{}", parts.join(" - "), EXTENSION)
}

/// Pattern for [`wildcard_match`] matching every file of the same show,
/// whatever the episode. Episode-specific tokens (numbering, air date, title)
/// are wildcarded, so the result is identical for all episodes of a series.
pub fn series_file_name_matcher(show: &Show) -> String {
    format!("{} - *.{}", series_part(show), EXTENSION)
}

/// Case-insensitive match supporting `*` (any run) and `?` (one character).
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().flat_map(char::to_lowercase).collect();
    let name: Vec<char> = name.chars().flat_map(char::to_lowercase).collect();

    let (mut p, mut n) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, n));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if let Some((star_p, star_n)) = star {
            p = star_p + 1;
            n = star_n + 1;
            star = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Files in `dir` whose name matches `pattern`. A missing directory has no
/// matches.
pub fn find_matching_files(dir: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if wildcard_match(pattern, &entry.file_name().to_string_lossy()) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}
