use crate::db;
use crate::error::Result;
use crate::models::{ComicIdentity, ComicScan, UpsertOutcome};
use rusqlite::Connection;
use std::path::Path;

/// Merges one scanned comic folder into the catalog.
///
/// The comic row is matched by directory first and by name + author second, so a
/// renamed folder keeps its id and favorite flag. A different folder that happens
/// to carry the same name and author is merged into the same row as well.
///
/// Volumes are matched by number. Every matched volume loses all of its chapters
/// before the scanned ones are written back, and volumes that are no longer on
/// disk are deleted.
///
/// Callers own the transaction.
pub fn reconcile_comic(
    conn: &Connection,
    identity: &ComicIdentity,
    directory: &Path,
    scan: &ComicScan,
    library_id: Option<i64>,
) -> Result<UpsertOutcome> {
    let directory = directory.to_string_lossy();
    let cover = scan.cover_image.as_ref().map(|p| p.to_string_lossy());
    let cover = cover.as_deref();

    let existing = match db::find_comic_by_directory(conn, &directory)? {
        Some(id) => Some(id),
        None => db::find_comic_by_identity(conn, identity)?,
    };

    let (comic_id, outcome) = match existing {
        Some(id) => {
            db::update_comic(conn, id, identity, cover, &directory, library_id)?;
            (id, UpsertOutcome::Updated)
        }
        None => {
            let id = db::insert_comic(conn, identity, cover, &directory, library_id)?;
            (id, UpsertOutcome::Imported)
        }
    };

    for volume in &scan.volumes {
        let volume_dir = volume.directory.to_string_lossy();
        let volume_file = volume.file.as_ref().map(|p| p.to_string_lossy());

        let volume_id = match db::find_volume(conn, comic_id, volume.number)? {
            Some(id) => {
                db::update_volume(conn, id, &volume_dir, volume_file.as_deref())?;
                db::delete_chapters(conn, id)?;
                id
            }
            None => db::insert_volume(conn, comic_id, volume.number, &volume_dir, volume_file.as_deref())?,
        };

        for chapter in &volume.chapters {
            db::insert_or_replace_chapter(
                conn,
                volume_id,
                chapter.number,
                chapter.kind,
                &chapter.file.to_string_lossy(),
            )?;
        }
    }

    let keep: Vec<u32> = scan.volumes.iter().map(|v| v.number).collect();
    let pruned = db::delete_volumes_except(conn, comic_id, &keep)?;
    if pruned > 0 {
        log::info!("Removed {} stale volume(s) from {}", pruned, directory);
    }

    Ok(outcome)
}
