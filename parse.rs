//! Folder and file name heuristics.
//!
//! Everything here is pure: a name that does not fit a pattern yields `None`
//! (or `false`), never an error, so callers can skip it silently.

use crate::models::{ChapterIdentity, ChapterKind, ComicIdentity};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

lazy_static! {
    static ref COMIC_FOLDER: Regex = Regex::new(r"^(.+?)\s*\(([^)]+)\)\s*$").unwrap();
    // ASCII digits only; `\d` would also take other scripts' digits.
    static ref VOLUME_NUMBER: Regex = Regex::new(r"(?i)Vol\.\s*([0-9]+)").unwrap();
    static ref EXTRA_NUMBER: Regex = Regex::new(r"(?i)Extra\s*([0-9]+)").unwrap();
    static ref CHAPTER_NUMBER: Regex = Regex::new(r"(?i)Ch\.\s*([0-9]+)").unwrap();
    static ref CHAPTER_TOKEN: Regex = Regex::new(r"(?i)Ch\.").unwrap();
    static ref EXTRA_TOKEN: Regex = Regex::new(r"(?i)Extra").unwrap();
}

/// `Foo Bar (Some Author)` -> name `Foo Bar`, author `Some Author`.
pub fn parse_comic_identity(folder_name: &str) -> Option<ComicIdentity> {
    let caps = COMIC_FOLDER.captures(folder_name)?;
    let name = caps.get(1)?.as_str().trim();
    let author = caps.get(2)?.as_str().trim();
    if name.is_empty() || author.is_empty() {
        return None;
    }
    Some(ComicIdentity {
        name: name.to_string(),
        author: author.to_string(),
    })
}

pub fn parse_volume_number(folder_name: &str) -> Option<u32> {
    first_number(&VOLUME_NUMBER, folder_name)
}

/// `Extra N` wins over `Ch. N` when a name carries both.
pub fn parse_chapter_identity(file_name: &str) -> Option<ChapterIdentity> {
    if let Some(number) = first_number(&EXTRA_NUMBER, file_name) {
        return Some(ChapterIdentity {
            number,
            kind: ChapterKind::Extra,
        });
    }
    first_number(&CHAPTER_NUMBER, file_name).map(|number| ChapterIdentity {
        number,
        kind: ChapterKind::Chapter,
    })
}

/// Whether a file name looks like a whole-volume archive rather than a
/// chapter or extra: it carries a `Vol.<digits>` token and no `Ch.`/`Extra`.
pub fn is_volume_archive_name(file_name: &str) -> bool {
    VOLUME_NUMBER.is_match(file_name)
        && !CHAPTER_TOKEN.is_match(file_name)
        && !EXTRA_TOKEN.is_match(file_name)
}

pub fn is_cover_image_candidate(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Names containing `icon` or `cover` are preferred as comic artwork.
pub fn is_preferred_cover_name(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.contains("icon") || lower.contains("cover")
}

fn first_number(pattern: &Regex, haystack: &str) -> Option<u32> {
    pattern
        .captures(haystack)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}
