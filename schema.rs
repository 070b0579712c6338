/// MIGRATION 0001: Initial catalog schema.
pub const MIGRATION_0001: &str = r#"
-- Libraries: user-defined shelves that own comics.
CREATE TABLE IF NOT EXISTS library (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    media_type TEXT NOT NULL DEFAULT 'comics',
    image_path TEXT,
    is_hidden BOOLEAN NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);

-- Comics: one row per `<name> (<author>)` folder on disk.
CREATE TABLE IF NOT EXISTS comic (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    author TEXT NOT NULL,
    image_path TEXT,
    directory TEXT NOT NULL UNIQUE,
    library_id INTEGER,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    FOREIGN KEY (library_id) REFERENCES library (id) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS volume (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    comic_id INTEGER NOT NULL,
    number INTEGER NOT NULL,
    directory TEXT NOT NULL,
    file TEXT,
    FOREIGN KEY (comic_id) REFERENCES comic (id) ON DELETE CASCADE,
    UNIQUE (comic_id, number)
);

CREATE TABLE IF NOT EXISTS chapter (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    volume_id INTEGER NOT NULL,
    number INTEGER NOT NULL,
    type TEXT NOT NULL CHECK (type IN ('chapter', 'extra')),
    file TEXT NOT NULL,
    FOREIGN KEY (volume_id) REFERENCES volume (id) ON DELETE CASCADE,
    UNIQUE (volume_id, number, type)
);

CREATE INDEX IF NOT EXISTS idx_comic_library_id ON comic (library_id);
CREATE INDEX IF NOT EXISTS idx_comic_name_author ON comic (name, author);
CREATE INDEX IF NOT EXISTS idx_volume_comic_id ON volume (comic_id);
CREATE INDEX IF NOT EXISTS idx_chapter_volume_id ON chapter (volume_id);
"#;

/// MIGRATION 0002: Favourites.
pub const MIGRATION_0002: &str = r#"
ALTER TABLE comic ADD COLUMN favorite BOOLEAN NOT NULL DEFAULT 0;
CREATE INDEX IF NOT EXISTS idx_comic_favorite ON comic (favorite);
"#;

/// MIGRATION 0003: Settings and tracked import roots.
pub const MIGRATION_0003: &str = r#"
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Import roots, kept so they can be re-scanned or cleared later
CREATE TABLE IF NOT EXISTS import_directory (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    library_id INTEGER,
    last_imported_at INTEGER,
    FOREIGN KEY (library_id) REFERENCES library (id) ON DELETE SET NULL
);
"#;

/// Applied in order; the index of the next pending entry is the stored schema version.
pub const MIGRATIONS: &[&str] = &[MIGRATION_0001, MIGRATION_0002, MIGRATION_0003];
