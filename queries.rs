//! Read side of the catalog plus the small user-driven mutations
//! (favourites, libraries, settings) that never go through an import.

use crate::error::{Error, Result};
use crate::models::{
    timestamp, Chapter, Comic, ComicQuery, ComicWithVolumes, ComicsPage, HiddenFilter, ImportDirectory,
    Library, LibraryUpdate, LibraryWithCount, NewLibrary, Volume, VolumeWithChapters,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

pub const HIDDEN_CONTENT_ENABLED: &str = "hidden_content_enabled";

const COMIC_COLUMNS: &str = "c.id, c.name, c.author, c.image_path, c.directory, c.library_id, c.favorite, \
     COALESCE(l.is_hidden, 0), c.created_at";
const COMIC_FROM: &str = "FROM comic c LEFT JOIN library l ON l.id = c.library_id";

fn comic_from_row(row: &Row<'_>) -> rusqlite::Result<Comic> {
    Ok(Comic {
        id: row.get(0)?,
        name: row.get(1)?,
        author: row.get(2)?,
        image_path: row.get(3)?,
        directory: row.get(4)?,
        library_id: row.get(5)?,
        favorite: row.get(6)?,
        is_hidden: row.get(7)?,
        created_at: timestamp(row.get(8)?),
    })
}

fn volume_from_row(row: &Row<'_>) -> rusqlite::Result<Volume> {
    Ok(Volume {
        id: row.get(0)?,
        comic_id: row.get(1)?,
        number: row.get(2)?,
        directory: row.get(3)?,
        file: row.get(4)?,
    })
}

fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: row.get(0)?,
        volume_id: row.get(1)?,
        number: row.get(2)?,
        kind: row.get(3)?,
        file: row.get(4)?,
    })
}

fn library_from_row(row: &Row<'_>) -> rusqlite::Result<LibraryWithCount> {
    Ok(LibraryWithCount {
        library: Library {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            media_type: row.get(3)?,
            image_path: row.get(4)?,
            is_hidden: row.get(5)?,
            created_at: timestamp(row.get(6)?),
        },
        comic_count: row.get(7)?,
    })
}

fn hidden_clause(filter: HiddenFilter, column: &str) -> Option<String> {
    match filter {
        HiddenFilter::Hide => Some(format!("{column} = 0")),
        HiddenFilter::Only => Some(format!("{column} = 1")),
        HiddenFilter::Include => None,
    }
}

fn where_clause(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

fn like_term(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Forces [`HiddenFilter::Hide`] unless hidden content is switched on.
pub fn effective_hidden_filter(conn: &Connection, requested: HiddenFilter) -> Result<HiddenFilter> {
    if hidden_content_enabled(conn)? {
        Ok(requested)
    } else {
        Ok(HiddenFilter::Hide)
    }
}

pub fn list_comics(conn: &Connection, query: &ComicQuery) -> Result<ComicsPage> {
    let mut conditions = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(library_id) = query.library_id {
        conditions.push("c.library_id = ?".to_string());
        params.push(Value::Integer(library_id));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(c.name LIKE ? ESCAPE '\\' OR c.author LIKE ? ESCAPE '\\')".to_string());
        let term = like_term(search);
        params.push(Value::Text(term.clone()));
        params.push(Value::Text(term));
    }
    if query.favorites_only {
        conditions.push("c.favorite = 1".to_string());
    }
    if let Some(clause) = hidden_clause(query.hidden, "COALESCE(l.is_hidden, 0)") {
        conditions.push(clause);
    }
    let where_sql = where_clause(&conditions);

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {COMIC_FROM} {where_sql}"),
        params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let page = query.page.max(1);
    let page_size = query.page_size.max(1);
    let offset = i64::from(page - 1) * i64::from(page_size);
    params.push(Value::Integer(i64::from(page_size)));
    params.push(Value::Integer(offset));

    let mut stmt = conn.prepare(&format!(
        "SELECT {COMIC_COLUMNS} {COMIC_FROM} {where_sql} ORDER BY c.name ASC, c.id ASC LIMIT ? OFFSET ?"
    ))?;
    let comics = stmt
        .query_map(params_from_iter(params.iter()), comic_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(ComicsPage {
        comics,
        total,
        page,
        page_size,
    })
}

pub fn get_comic_row(conn: &Connection, id: i64) -> Result<Option<Comic>> {
    let comic = conn
        .query_row(
            &format!("SELECT {COMIC_COLUMNS} {COMIC_FROM} WHERE c.id = ?1"),
            params![id],
            comic_from_row,
        )
        .optional()?;
    Ok(comic)
}

fn chapters_for_volume(conn: &Connection, volume_id: i64) -> Result<Vec<Chapter>> {
    let mut stmt = conn.prepare(
        "SELECT id, volume_id, number, type, file FROM chapter WHERE volume_id = ?1 ORDER BY type ASC, number ASC",
    )?;
    let chapters = stmt
        .query_map(params![volume_id], chapter_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(chapters)
}

pub fn get_comic(conn: &Connection, id: i64) -> Result<Option<ComicWithVolumes>> {
    let Some(comic) = get_comic_row(conn, id)? else {
        return Ok(None);
    };
    let mut stmt = conn.prepare(
        "SELECT id, comic_id, number, directory, file FROM volume WHERE comic_id = ?1 ORDER BY number ASC",
    )?;
    let volumes = stmt
        .query_map(params![id], volume_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let volumes = volumes
        .into_iter()
        .map(|volume| {
            let chapters = chapters_for_volume(conn, volume.id)?;
            Ok(VolumeWithChapters { volume, chapters })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(ComicWithVolumes { comic, volumes }))
}

pub fn get_volume(conn: &Connection, id: i64) -> Result<Option<VolumeWithChapters>> {
    let volume = conn
        .query_row(
            "SELECT id, comic_id, number, directory, file FROM volume WHERE id = ?1",
            params![id],
            volume_from_row,
        )
        .optional()?;
    let Some(volume) = volume else {
        return Ok(None);
    };
    let chapters = chapters_for_volume(conn, volume.id)?;
    Ok(Some(VolumeWithChapters { volume, chapters }))
}

pub fn random_comic(conn: &Connection, library_id: i64, hidden: HiddenFilter) -> Result<Option<Comic>> {
    let mut conditions = vec!["c.library_id = ?1".to_string()];
    if let Some(clause) = hidden_clause(hidden, "COALESCE(l.is_hidden, 0)") {
        conditions.push(clause);
    }
    let comic = conn
        .query_row(
            &format!(
                "SELECT {COMIC_COLUMNS} {COMIC_FROM} {} ORDER BY RANDOM() LIMIT 1",
                where_clause(&conditions)
            ),
            params![library_id],
            comic_from_row,
        )
        .optional()?;
    Ok(comic)
}

/// Flips the favourite flag; `None` when the comic does not exist.
pub fn toggle_favorite(conn: &Connection, id: i64) -> Result<Option<bool>> {
    let current: Option<bool> = conn
        .query_row("SELECT favorite FROM comic WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    let Some(current) = current else {
        return Ok(None);
    };
    let next = !current;
    conn.execute("UPDATE comic SET favorite = ?1 WHERE id = ?2", params![next, id])?;
    Ok(Some(next))
}

const LIBRARY_SELECT: &str = "SELECT l.id, l.name, l.description, l.media_type, l.image_path, l.is_hidden, l.created_at, \
     (SELECT COUNT(*) FROM comic c WHERE c.library_id = l.id) FROM library l";

pub fn create_library(conn: &Connection, library: &NewLibrary) -> Result<LibraryWithCount> {
    let name = library.name.trim();
    if name.is_empty() {
        return Err(Error::Invalid("library name must not be empty".into()));
    }
    conn.execute(
        "INSERT INTO library (name, description, media_type, image_path, is_hidden) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            library.description,
            library.media_type.as_deref().unwrap_or("comics"),
            library.image_path,
            library.is_hidden,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_library(conn, id)?.ok_or_else(|| Error::NotFound(format!("library {id}")))
}

pub fn get_library(conn: &Connection, id: i64) -> Result<Option<LibraryWithCount>> {
    let library = conn
        .query_row(&format!("{LIBRARY_SELECT} WHERE l.id = ?1"), params![id], library_from_row)
        .optional()?;
    Ok(library)
}

pub fn library_exists(conn: &Connection, id: i64) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM library WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub fn list_libraries(
    conn: &Connection,
    search: Option<&str>,
    hidden: HiddenFilter,
) -> Result<Vec<LibraryWithCount>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("l.name LIKE ? ESCAPE '\\'".to_string());
        params.push(Value::Text(like_term(search)));
    }
    if let Some(clause) = hidden_clause(hidden, "l.is_hidden") {
        conditions.push(clause);
    }
    let mut stmt = conn.prepare(&format!(
        "{LIBRARY_SELECT} {} ORDER BY l.name ASC, l.id ASC",
        where_clause(&conditions)
    ))?;
    let libraries = stmt
        .query_map(params_from_iter(params.iter()), library_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(libraries)
}

pub fn update_library(conn: &Connection, id: i64, update: &LibraryUpdate) -> Result<LibraryWithCount> {
    let Some(existing) = get_library(conn, id)? else {
        return Err(Error::NotFound(format!("library {id}")));
    };
    let existing = existing.library;
    let name = update
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&existing.name);
    let description = update.description.clone().unwrap_or(existing.description);
    let image_path = update.image_path.clone().unwrap_or(existing.image_path);
    let is_hidden = update.is_hidden.unwrap_or(existing.is_hidden);
    conn.execute(
        "UPDATE library SET name = ?1, description = ?2, image_path = ?3, is_hidden = ?4 WHERE id = ?5",
        params![name, description, image_path, is_hidden, id],
    )?;
    get_library(conn, id)?.ok_or_else(|| Error::NotFound(format!("library {id}")))
}

/// Removes the library row. Its comics stay in the catalog with no library.
pub fn delete_library(conn: &Connection, id: i64) -> Result<bool> {
    let removed = conn.execute("DELETE FROM library WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

pub fn list_import_directories(conn: &Connection) -> Result<Vec<ImportDirectory>> {
    let mut stmt = conn.prepare(
        "SELECT id, path, library_id, last_imported_at FROM import_directory ORDER BY path ASC",
    )?;
    let dirs = stmt
        .query_map([], |row| {
            Ok(ImportDirectory {
                id: row.get(0)?,
                path: row.get(1)?,
                library_id: row.get(2)?,
                last_imported_at: timestamp(row.get(3)?),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(dirs)
}

pub fn get_import_directory(conn: &Connection, id: i64) -> Result<Option<ImportDirectory>> {
    let dir = conn
        .query_row(
            "SELECT id, path, library_id, last_imported_at FROM import_directory WHERE id = ?1",
            params![id],
            |row| {
                Ok(ImportDirectory {
                    id: row.get(0)?,
                    path: row.get(1)?,
                    library_id: row.get(2)?,
                    last_imported_at: timestamp(row.get(3)?),
                })
            },
        )
        .optional()?;
    Ok(dir)
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn get_bool_setting(conn: &Connection, key: &str) -> Result<bool> {
    Ok(get_setting(conn, key)?.as_deref() == Some("1"))
}

pub fn set_bool_setting(conn: &Connection, key: &str, value: bool) -> Result<()> {
    set_setting(conn, key, if value { "1" } else { "0" })
}

pub fn hidden_content_enabled(conn: &Connection) -> Result<bool> {
    get_bool_setting(conn, HIDDEN_CONTENT_ENABLED)
}

pub fn set_hidden_content_enabled(conn: &Connection, enabled: bool) -> Result<()> {
    set_bool_setting(conn, HIDDEN_CONTENT_ENABLED, enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, open_in_memory};
    use crate::models::{ChapterKind, ComicIdentity};

    fn library(conn: &Connection, name: &str, hidden: bool) -> i64 {
        create_library(
            conn,
            &NewLibrary {
                name: name.into(),
                is_hidden: hidden,
                ..Default::default()
            },
        )
        .unwrap()
        .library
        .id
    }

    fn comic(conn: &Connection, name: &str, author: &str, library_id: Option<i64>) -> i64 {
        let identity = ComicIdentity {
            name: name.into(),
            author: author.into(),
        };
        db::insert_comic(conn, &identity, None, &format!("/c/{name} ({author})"), library_id).unwrap()
    }

    #[test]
    fn comics_are_paged_and_counted() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        let lib = library(&conn, "Main", false);
        for name in ["E", "D", "C", "B", "A"] {
            comic(&conn, name, "X", Some(lib));
        }
        let page = list_comics(
            &conn,
            &ComicQuery {
                page: 2,
                page_size: 2,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(page.total, 5);
        let names: Vec<_> = page.comics.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["C", "D"]);
    }

    #[test]
    fn search_matches_name_or_author_substring() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        comic(&conn, "Blue Giant", "Ishizuka", None);
        comic(&conn, "Vagabond", "Inoue", None);
        comic(&conn, "100%_Real", "Nobody", None);

        let by_author = list_comics(
            &conn,
            &ComicQuery {
                search: Some("inoue".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_author.total, 1);
        assert_eq!(by_author.comics[0].name, "Vagabond");

        let literal = list_comics(
            &conn,
            &ComicQuery {
                search: Some("%_".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(literal.total, 1);
        assert_eq!(literal.comics[0].name, "100%_Real");
    }

    #[test]
    fn hidden_filter_follows_library_visibility() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        let open = library(&conn, "Open", false);
        let secret = library(&conn, "Secret", true);
        comic(&conn, "Visible", "A", Some(open));
        comic(&conn, "Hidden", "B", Some(secret));
        comic(&conn, "Orphan", "C", None);

        let query = |hidden| ComicQuery {
            hidden,
            ..Default::default()
        };
        assert_eq!(list_comics(&conn, &query(HiddenFilter::Hide)).unwrap().total, 2);
        assert_eq!(list_comics(&conn, &query(HiddenFilter::Include)).unwrap().total, 3);
        let only = list_comics(&conn, &query(HiddenFilter::Only)).unwrap();
        assert_eq!(only.total, 1);
        assert!(only.comics[0].is_hidden);
    }

    #[test]
    fn hidden_content_setting_gates_filter() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        assert!(!hidden_content_enabled(&conn).unwrap());
        assert_eq!(effective_hidden_filter(&conn, HiddenFilter::Only).unwrap(), HiddenFilter::Hide);
        set_hidden_content_enabled(&conn, true).unwrap();
        assert_eq!(effective_hidden_filter(&conn, HiddenFilter::Only).unwrap(), HiddenFilter::Only);
        assert_eq!(get_setting(&conn, HIDDEN_CONTENT_ENABLED).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn favorites_toggle_and_filter() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        let id = comic(&conn, "Foo", "Bar", None);
        comic(&conn, "Other", "Bar", None);
        assert_eq!(toggle_favorite(&conn, id).unwrap(), Some(true));
        let favorites = list_comics(
            &conn,
            &ComicQuery {
                favorites_only: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(favorites.total, 1);
        assert_eq!(toggle_favorite(&conn, id).unwrap(), Some(false));
        assert_eq!(toggle_favorite(&conn, 4242).unwrap(), None);
    }

    #[test]
    fn comic_detail_orders_volumes_and_chapters() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        let id = comic(&conn, "Foo", "Bar", None);
        let v2 = db::insert_volume(&conn, id, 2, "/v2", None).unwrap();
        let v1 = db::insert_volume(&conn, id, 1, "/v1", Some("/v1/Foo Vol. 1.cbz")).unwrap();
        db::insert_or_replace_chapter(&conn, v1, 1, ChapterKind::Extra, "/v1/e1.cbz").unwrap();
        db::insert_or_replace_chapter(&conn, v1, 2, ChapterKind::Chapter, "/v1/c2.cbz").unwrap();
        db::insert_or_replace_chapter(&conn, v1, 1, ChapterKind::Chapter, "/v1/c1.cbz").unwrap();
        db::insert_or_replace_chapter(&conn, v2, 3, ChapterKind::Chapter, "/v2/c3.cbz").unwrap();

        let detail = get_comic(&conn, id).unwrap().unwrap();
        let numbers: Vec<_> = detail.volumes.iter().map(|v| v.volume.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        let order: Vec<_> = detail.volumes[0]
            .chapters
            .iter()
            .map(|c| (c.kind, c.number))
            .collect();
        assert_eq!(
            order,
            vec![(ChapterKind::Chapter, 1), (ChapterKind::Chapter, 2), (ChapterKind::Extra, 1)]
        );

        let volume = get_volume(&conn, v2).unwrap().unwrap();
        assert_eq!(volume.chapters.len(), 1);
        assert!(get_volume(&conn, 9999).unwrap().is_none());
        assert!(get_comic(&conn, 9999).unwrap().is_none());
    }

    #[test]
    fn deleting_library_orphans_its_comics() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        let lib = library(&conn, "Main", false);
        let id = comic(&conn, "Foo", "Bar", Some(lib));
        assert_eq!(get_library(&conn, lib).unwrap().unwrap().comic_count, 1);

        assert!(delete_library(&conn, lib).unwrap());
        let orphan = get_comic_row(&conn, id).unwrap().unwrap();
        assert_eq!(orphan.library_id, None);
        assert!(!delete_library(&conn, lib).unwrap());
    }

    #[test]
    fn library_update_and_listing() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        let a = library(&conn, "Alpha", false);
        library(&conn, "Beta", true);

        let updated = update_library(
            &conn,
            a,
            &LibraryUpdate {
                description: Some(Some("desc".into())),
                is_hidden: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.library.name, "Alpha");
        assert_eq!(updated.library.description.as_deref(), Some("desc"));
        assert_eq!(updated.library.media_type, "comics");
        assert!(updated.library.is_hidden);

        assert_eq!(list_libraries(&conn, None, HiddenFilter::Hide).unwrap().len(), 0);
        assert_eq!(list_libraries(&conn, Some("bet"), HiddenFilter::Include).unwrap().len(), 1);
        assert!(matches!(
            update_library(&conn, 999, &LibraryUpdate::default()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn random_comic_stays_in_library() {
        let pool = open_in_memory().unwrap();
        let conn = pool.get().unwrap();
        let a = library(&conn, "A", false);
        let b = library(&conn, "B", false);
        comic(&conn, "Foo", "X", Some(a));
        comic(&conn, "Bar", "Y", Some(b));
        for _ in 0..5 {
            let picked = random_comic(&conn, a, HiddenFilter::Hide).unwrap().unwrap();
            assert_eq!(picked.name, "Foo");
        }
        let empty = library(&conn, "Empty", false);
        assert!(random_comic(&conn, empty, HiddenFilter::Include).unwrap().is_none());
    }
}
