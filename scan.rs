//! Filesystem side of an import. Nothing here touches the catalog: a comic
//! folder is read once into a [`ComicScan`] and handed to the reconciler.
//!
//! Entries are visited in directory-listing order, which is what decides the
//! fallback cover and which whole-volume archive wins. No sorting happens.

use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::models::{ComicIdentity, ComicScan, ScannedChapter, ScannedVolume};
use crate::parse;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Immediate children of `dir`, symlinks followed. A child that cannot be
/// read (vanished, broken link, permission denied) fails the whole listing.
fn list_entries(dir: &Path) -> Result<Vec<DirEntry>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .map(|entry| entry.map_err(|err| Error::scan(dir, err)))
        .collect()
}

fn entry_name(entry: &DirEntry) -> Option<&str> {
    entry.file_name().to_str()
}

/// Sub-folders of an import root that follow the `<name> (<author>)` convention.
///
/// A child that cannot be read is skipped when its name is not a comic folder
/// name anyway (a dangling shortcut, say). One that carries a comic name fails
/// the listing.
pub fn list_comic_folders(root: &Path) -> Result<Vec<(PathBuf, ComicIdentity)>> {
    let mut folders = Vec::new();
    let walker = WalkDir::new(root).min_depth(1).max_depth(1).follow_links(true);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() > 0 && !names_comic(err.path()) => {
                log::debug!("Skipping unreadable entry in {}: {}", root.display(), err);
                continue;
            }
            Err(err) => return Err(Error::scan(root, err)),
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(identity) = entry_name(&entry).and_then(parse::parse_comic_identity) else {
            log::debug!("Skipping {}: not a comic folder", entry.path().display());
            continue;
        };
        folders.push((entry.into_path(), identity));
    }
    Ok(folders)
}

fn names_comic(path: Option<&Path>) -> bool {
    path.and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .and_then(parse::parse_comic_identity)
        .is_some()
}

/// Reads one comic folder: cover artwork plus every `Vol. N` sub-folder.
pub fn scan_comic(dir: &Path, config: &ScanConfig) -> Result<ComicScan> {
    let entries = list_entries(dir)?;

    let mut cover_image: Option<PathBuf> = None;
    for entry in entries.iter().filter(|e| e.file_type().is_file()) {
        let Some(name) = entry_name(entry) else {
            continue;
        };
        if !parse::is_cover_image_candidate(name) {
            continue;
        }
        if parse::is_preferred_cover_name(name) {
            cover_image = Some(entry.path().to_path_buf());
            break;
        }
        if cover_image.is_none() {
            cover_image = Some(entry.path().to_path_buf());
        }
    }

    let mut volumes = Vec::new();
    for entry in entries.iter().filter(|e| e.file_type().is_dir()) {
        let Some(number) = entry_name(entry).and_then(parse::parse_volume_number) else {
            continue;
        };
        volumes.push(scan_volume(entry.path(), number, config)?);
    }

    Ok(ComicScan {
        cover_image,
        volumes,
    })
}

fn scan_volume(dir: &Path, number: u32, config: &ScanConfig) -> Result<ScannedVolume> {
    let archives: Vec<(String, PathBuf)> = list_entries(dir)?
        .into_iter()
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = entry_name(&e)?.to_string();
            config.is_archive(&name).then(|| (name, e.into_path()))
        })
        .collect();

    let volume_file = archives
        .iter()
        .find(|(name, _)| parse::is_volume_archive_name(name))
        .map(|(_, path)| path.clone());

    let chapters = archives
        .into_iter()
        .filter(|(_, path)| volume_file.as_ref() != Some(path))
        .filter_map(|(name, path)| {
            parse::parse_chapter_identity(&name).map(|id| ScannedChapter {
                number: id.number,
                kind: id.kind,
                file: path,
            })
        })
        .collect();

    Ok(ScannedVolume {
        number,
        directory: dir.to_path_buf(),
        file: volume_file,
        chapters,
    })
}
