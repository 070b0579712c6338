use crate::config::AppPaths;
use crate::error::Result;
use crate::models::{ChapterKind, ComicIdentity};
use crate::schema;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, MAIN_SEPARATOR};

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initializes the catalog connection pool and runs migrations.
pub fn init_database(paths: &AppPaths) -> Result<DbPool> {
    open_pool(&paths.db_path)
}

/// Opens (creating if needed) the catalog at `db_path`.
pub fn open_pool(db_path: &Path) -> Result<DbPool> {
    log::info!("Database path: {}", db_path.display());

    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path).with_init(configure_connection);
    let pool = r2d2::Pool::new(manager)?;

    run_migrations(&mut pool.get()?)?;

    Ok(pool)
}

/// Single-connection in-memory catalog. Every pooled connection to `:memory:`
/// is a separate database, so the pool is capped at one.
pub fn open_in_memory() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory().with_init(configure_connection);
    let pool = r2d2::Pool::builder().max_size(1).build(manager)?;
    run_migrations(&mut pool.get()?)?;
    Ok(pool)
}

fn configure_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
}

pub fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(usize::try_from(version).unwrap_or(0))
}

/// Applies every migration past the stored schema version, in order.
fn run_migrations(connection: &mut DbConnection) -> Result<()> {
    let connection: &mut Connection = connection;
    let current = schema_version(connection)?;
    let target = schema::MIGRATIONS.len();
    if current >= target {
        log::debug!("Schema is current at version {current}");
        return Ok(());
    }

    log::info!("Running database migrations {current} -> {target}...");
    let tx = connection.transaction()?;
    for migration in &schema::MIGRATIONS[current..] {
        tx.execute_batch(migration)?;
    }
    tx.pragma_update(None, "user_version", target as i64)?;
    tx.commit()?;

    log::info!("Migrations applied successfully.");
    Ok(())
}

pub fn find_comic_by_directory(conn: &Connection, directory: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM comic WHERE directory = ?1",
            params![directory],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn find_comic_by_identity(conn: &Connection, identity: &ComicIdentity) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM comic WHERE name = ?1 AND author = ?2 ORDER BY id LIMIT 1",
            params![identity.name, identity.author],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn insert_comic(
    conn: &Connection,
    identity: &ComicIdentity,
    image_path: Option<&str>,
    directory: &str,
    library_id: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO comic (name, author, image_path, directory, library_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![identity.name, identity.author, image_path, directory, library_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Rewrites the scanned columns of an existing comic. `favorite` is untouched.
pub fn update_comic(
    conn: &Connection,
    id: i64,
    identity: &ComicIdentity,
    image_path: Option<&str>,
    directory: &str,
    library_id: Option<i64>,
) -> Result<()> {
    conn.execute(
        "UPDATE comic SET name = ?1, author = ?2, image_path = ?3, directory = ?4, library_id = ?5 WHERE id = ?6",
        params![identity.name, identity.author, image_path, directory, library_id, id],
    )?;
    Ok(())
}

pub fn find_volume(conn: &Connection, comic_id: i64, number: u32) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM volume WHERE comic_id = ?1 AND number = ?2",
            params![comic_id, number],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn insert_volume(
    conn: &Connection,
    comic_id: i64,
    number: u32,
    directory: &str,
    file: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO volume (comic_id, number, directory, file) VALUES (?1, ?2, ?3, ?4)",
        params![comic_id, number, directory, file],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_volume(conn: &Connection, id: i64, directory: &str, file: Option<&str>) -> Result<()> {
    conn.execute(
        "UPDATE volume SET directory = ?1, file = ?2 WHERE id = ?3",
        params![directory, file, id],
    )?;
    Ok(())
}

/// Drops volumes of `comic_id` whose number is not in `keep`. Returns how many went.
pub fn delete_volumes_except(conn: &Connection, comic_id: i64, keep: &[u32]) -> Result<usize> {
    let mut stmt = conn.prepare("SELECT id, number FROM volume WHERE comic_id = ?1")?;
    let stale: Vec<i64> = stmt
        .query_map(params![comic_id], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, u32>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .filter(|(_, number)| !keep.contains(number))
        .map(|(id, _)| id)
        .collect();
    for id in &stale {
        conn.execute("DELETE FROM volume WHERE id = ?1", params![id])?;
    }
    Ok(stale.len())
}

pub fn delete_chapters(conn: &Connection, volume_id: i64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM chapter WHERE volume_id = ?1", params![volume_id])?;
    Ok(removed)
}

pub fn insert_or_replace_chapter(
    conn: &Connection,
    volume_id: i64,
    number: u32,
    kind: ChapterKind,
    file: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT OR REPLACE INTO chapter (volume_id, number, type, file) VALUES (?1, ?2, ?3, ?4)",
        params![volume_id, number, kind, file],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Tracks `path` as an import root. Re-importing the same path moves it to the
/// new library instead of adding a second row.
pub fn upsert_import_directory(conn: &Connection, path: &str, library_id: Option<i64>) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO import_directory (path, library_id, last_imported_at)
         VALUES (?1, ?2, strftime('%s', 'now'))
         ON CONFLICT(path) DO UPDATE SET
            library_id = excluded.library_id,
            last_imported_at = excluded.last_imported_at
         RETURNING id",
        params![path, library_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Deletes every comic whose directory lies strictly below `root`.
pub fn delete_comics_under_path(conn: &Connection, root: &str) -> Result<usize> {
    let prefix = descendant_prefix(root);
    let removed = conn.execute(
        "DELETE FROM comic WHERE substr(directory, 1, length(?1)) = ?1",
        params![prefix],
    )?;
    Ok(removed)
}

pub fn delete_import_directory(conn: &Connection, id: i64) -> Result<bool> {
    let removed = conn.execute("DELETE FROM import_directory WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

/// Removes every catalog row. Callers wrap this in a transaction.
pub fn wipe_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM chapter;
         DELETE FROM volume;
         DELETE FROM comic;
         DELETE FROM import_directory;
         DELETE FROM library;
         DELETE FROM settings;",
    )?;
    Ok(())
}

fn descendant_prefix(root: &str) -> String {
    let trimmed = root.trim_end_matches(MAIN_SEPARATOR);
    format!("{trimmed}{MAIN_SEPARATOR}")
}
