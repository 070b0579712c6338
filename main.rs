use clap::{Parser, Subcommand, ValueEnum};
use comic_shelf::config::{AppPaths, ShelfConfig};
use comic_shelf::error::{Error, Result};
use comic_shelf::models::{ComicQuery, HiddenFilter, LibraryUpdate, NewLibrary};
use comic_shelf::{db, launcher, queries, ImportCoordinator};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "comic-shelf", version, about = "Catalog and browse a local comic collection")]
struct Cli {
    /// Catalog database to use instead of the one in the data directory.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import every `<name> (<author>)` folder under ROOT.
    Import {
        root: PathBuf,
        #[arg(long)]
        library: Option<i64>,
    },
    /// Re-scan one comic from its folder.
    Refresh { comic_id: i64 },
    /// Re-import a tracked import directory.
    RefreshDir { id: i64 },
    /// List tracked import directories.
    Dirs,
    /// Forget an import directory and every comic below it.
    ClearDir { id: i64 },
    /// Delete everything in the catalog.
    ClearAll {
        #[arg(long)]
        yes: bool,
    },
    Library {
        #[command(subcommand)]
        action: LibraryCommand,
    },
    /// List comics, one page at a time.
    Comics {
        #[arg(long)]
        library: Option<i64>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        favorites: bool,
        #[arg(long, default_value = "hide")]
        hidden: HiddenFilter,
    },
    /// Show one comic with its volumes and chapters.
    Comic { id: i64 },
    Volume { id: i64 },
    /// Pick a random comic from a library.
    Random {
        library_id: i64,
        #[arg(long, default_value = "hide")]
        hidden: HiddenFilter,
    },
    /// Toggle the favorite flag of a comic.
    Favorite { comic_id: i64 },
    /// Open an archive with the configured or default application.
    Open { file: PathBuf },
    /// Show or switch the hidden content setting.
    HiddenContent { state: Option<Switch> },
}

#[derive(Subcommand)]
enum LibraryCommand {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        media_type: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        hidden: bool,
    },
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long, conflicts_with = "clear_image")]
        image: Option<String>,
        #[arg(long)]
        clear_image: bool,
        #[arg(long)]
        hidden: Option<bool>,
    },
    Remove { id: i64 },
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "hide")]
        hidden: HiddenFilter,
    },
    Show { id: i64 },
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `Some(None)` clears the column, `None` leaves it alone.
fn optional_column(value: Option<String>, clear: bool) -> Option<Option<String>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn run_library(pool: &db::DbPool, action: LibraryCommand) -> Result<()> {
    let conn = pool.get()?;
    match action {
        LibraryCommand::Add {
            name,
            description,
            media_type,
            image,
            hidden,
        } => {
            let library = queries::create_library(
                &conn,
                &NewLibrary {
                    name,
                    description,
                    media_type,
                    image_path: image,
                    is_hidden: hidden,
                },
            )?;
            print_json(&library)
        }
        LibraryCommand::Edit {
            id,
            name,
            description,
            clear_description,
            image,
            clear_image,
            hidden,
        } => {
            let update = LibraryUpdate {
                name,
                description: optional_column(description, clear_description),
                image_path: optional_column(image, clear_image),
                is_hidden: hidden,
            };
            print_json(&queries::update_library(&conn, id, &update)?)
        }
        LibraryCommand::Remove { id } => {
            if !queries::delete_library(&conn, id)? {
                return Err(Error::NotFound(format!("library {id}")));
            }
            print_json(&json!({ "removed": id }))
        }
        LibraryCommand::List { search, hidden } => {
            let hidden = queries::effective_hidden_filter(&conn, hidden)?;
            print_json(&queries::list_libraries(&conn, search.as_deref(), hidden)?)
        }
        LibraryCommand::Show { id } => {
            let library = queries::get_library(&conn, id)?
                .ok_or_else(|| Error::NotFound(format!("library {id}")))?;
            print_json(&library)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = ShelfConfig::load(&paths.config_path)?;
    let pool = match &cli.db {
        Some(path) => db::open_pool(path)?,
        None => db::init_database(&paths)?,
    };
    let coordinator = ImportCoordinator::new(pool.clone(), config.scan.clone());

    match cli.command {
        Command::Import { root, library } => print_json(&coordinator.import_root(&root, library)?),
        Command::Refresh { comic_id } => {
            let refreshed = coordinator.refresh_one(comic_id)?;
            print_json(&json!({ "refreshed": refreshed }))
        }
        Command::RefreshDir { id } => {
            let summary = coordinator
                .refresh_directory(id)?
                .ok_or_else(|| Error::NotFound(format!("import directory {id}")))?;
            print_json(&summary)
        }
        Command::Dirs => {
            let conn = pool.get()?;
            print_json(&queries::list_import_directories(&conn)?)
        }
        Command::ClearDir { id } => {
            if !coordinator.clear_directory(id)? {
                return Err(Error::NotFound(format!("import directory {id}")));
            }
            print_json(&json!({ "cleared": id }))
        }
        Command::ClearAll { yes } => {
            if !yes {
                return Err(Error::Invalid("refusing to wipe the catalog without --yes".into()));
            }
            coordinator.clear_all()?;
            print_json(&json!({ "cleared": "all" }))
        }
        Command::Library { action } => run_library(&pool, action),
        Command::Comics {
            library,
            search,
            page,
            favorites,
            hidden,
        } => {
            let conn = pool.get()?;
            let query = ComicQuery {
                library_id: library,
                search,
                favorites_only: favorites,
                hidden: queries::effective_hidden_filter(&conn, hidden)?,
                page,
                page_size: config.page_size,
            };
            print_json(&queries::list_comics(&conn, &query)?)
        }
        Command::Comic { id } => {
            let conn = pool.get()?;
            let comic = queries::get_comic(&conn, id)?
                .ok_or_else(|| Error::NotFound(format!("comic {id}")))?;
            print_json(&comic)
        }
        Command::Volume { id } => {
            let conn = pool.get()?;
            let volume = queries::get_volume(&conn, id)?
                .ok_or_else(|| Error::NotFound(format!("volume {id}")))?;
            print_json(&volume)
        }
        Command::Random { library_id, hidden } => {
            let conn = pool.get()?;
            let hidden = queries::effective_hidden_filter(&conn, hidden)?;
            print_json(&queries::random_comic(&conn, library_id, hidden)?)
        }
        Command::Favorite { comic_id } => {
            let conn = pool.get()?;
            let favorite = queries::toggle_favorite(&conn, comic_id)?
                .ok_or_else(|| Error::NotFound(format!("comic {comic_id}")))?;
            print_json(&json!({ "id": comic_id, "favorite": favorite }))
        }
        Command::Open { file } => print_json(&launcher::open_path(&file, config.opener.as_deref())),
        Command::HiddenContent { state } => {
            let conn = pool.get()?;
            if let Some(state) = state {
                queries::set_hidden_content_enabled(&conn, matches!(state, Switch::On))?;
            }
            print_json(&json!({ "enabled": queries::hidden_content_enabled(&conn)? }))
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(err) = run(Cli::parse()) {
        log::error!("{}", err);
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_commands_parse_ids() {
        let cli = Cli::try_parse_from(["comic-shelf", "--db", "/tmp/c.db", "favorite", "7"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/c.db")));
        assert!(matches!(cli.command, Command::Favorite { comic_id: 7 }));

        let cli = Cli::try_parse_from(["comic-shelf", "volume", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Volume { id: 3 }));
        let cli = Cli::try_parse_from(["comic-shelf", "dirs"]).unwrap();
        assert!(matches!(cli.command, Command::Dirs));
    }

    #[test]
    fn comics_defaults_hide_hidden_content() {
        let cli = Cli::try_parse_from(["comic-shelf", "comics", "--search", "foo"]).unwrap();
        let Command::Comics { page, hidden, search, .. } = cli.command else {
            panic!("expected comics command");
        };
        assert_eq!(page, 1);
        assert_eq!(hidden, HiddenFilter::Hide);
        assert_eq!(search.as_deref(), Some("foo"));
    }

    #[test]
    fn description_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "comic-shelf",
            "library",
            "edit",
            "1",
            "--description",
            "x",
            "--clear-description",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn clear_flag_wins_over_missing_value() {
        assert_eq!(optional_column(None, true), Some(None));
        assert_eq!(optional_column(Some("x".into()), false), Some(Some("x".into())));
        assert_eq!(optional_column(None, false), None);
    }
}
