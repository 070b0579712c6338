use crate::config::ScanConfig;
use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use crate::models::{ComicIdentity, ComicScan, ImportEvent, ImportSummary};
use crate::parse;
use crate::queries;
use crate::reconcile;
use crate::scan;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Runs imports, refreshes and clears against one catalog.
///
/// Every mutating operation claims the shared job slot first; a second caller
/// gets [`Error::ImportBusy`] instead of queueing. Clones share the slot and the
/// subscriber list.
#[derive(Clone)]
pub struct ImportCoordinator {
    pool: DbPool,
    scan: ScanConfig,
    inner: Arc<CoordinatorInner>,
}

#[derive(Default)]
struct CoordinatorInner {
    current: Mutex<Option<JobHandle>>,
    subscribers: Mutex<Vec<Sender<ImportEvent>>>,
}

#[derive(Clone)]
struct JobHandle {
    id: String,
    kind: &'static str,
}

/// Frees the job slot when dropped, whatever way the job ended.
struct JobGuard {
    inner: Arc<CoordinatorInner>,
    id: String,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        let mut current = lock(&self.inner.current);
        if current.as_ref().map(|h| h.id == self.id).unwrap_or(false) {
            *current = None;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ImportCoordinator {
    pub fn new(pool: DbPool, scan: ScanConfig) -> Self {
        Self {
            pool,
            scan,
            inner: Arc::default(),
        }
    }

    /// Receives every event emitted after this call.
    pub fn subscribe(&self) -> Receiver<ImportEvent> {
        let (tx, rx) = unbounded();
        lock(&self.inner.subscribers).push(tx);
        rx
    }

    pub fn is_importing(&self) -> bool {
        lock(&self.inner.current).is_some()
    }

    /// Imports every comic folder directly under `root`.
    pub fn import_root(&self, root: &Path, library_id: Option<i64>) -> Result<ImportSummary> {
        let _job = self.begin_job("import")?;
        self.run_pass(root, library_id)
    }

    /// Entry point for a directory picker. A cancelled dialog is a no-op.
    pub fn import_picked(&self, picked: Option<PathBuf>, library_id: Option<i64>) -> Result<Option<ImportSummary>> {
        match picked {
            Some(root) => self.import_root(&root, library_id).map(Some),
            None => Ok(None),
        }
    }

    /// Re-reads a single comic from its stored directory. The identity is parsed
    /// again from the folder name, and the comic keeps its current library.
    ///
    /// Returns `false` when the comic does not exist or its folder name no
    /// longer parses.
    pub fn refresh_one(&self, comic_id: i64) -> Result<bool> {
        let _job = self.begin_job("refresh")?;
        let mut conn = self.pool.get()?;

        let Some(comic) = queries::get_comic_row(&conn, comic_id)? else {
            return Ok(false);
        };
        let directory = PathBuf::from(&comic.directory);
        let Some(identity) = directory
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse::parse_comic_identity)
        else {
            log::debug!("Skipping refresh of {}: not a comic folder", directory.display());
            return Ok(false);
        };

        let scanned = scan::scan_comic(&directory, &self.scan).map_err(|err| {
            log::warn!("Failed to scan {}: {}", directory.display(), err);
            err
        })?;

        let tx = conn.transaction()?;
        reconcile::reconcile_comic(&tx, &identity, &directory, &scanned, comic.library_id)?;
        tx.commit()?;

        log::info!("Refreshed comic {} ({})", comic_id, directory.display());
        self.emit(ImportEvent::CatalogChanged);
        Ok(true)
    }

    /// Re-imports a tracked root into the library it was last imported into.
    pub fn refresh_directory(&self, import_directory_id: i64) -> Result<Option<ImportSummary>> {
        let _job = self.begin_job("refresh")?;
        let tracked = {
            let conn = self.pool.get()?;
            queries::get_import_directory(&conn, import_directory_id)?
        };
        let Some(tracked) = tracked else {
            return Ok(None);
        };

        let summary = self.run_pass(Path::new(&tracked.path), tracked.library_id)?;
        self.emit(ImportEvent::CatalogChanged);
        Ok(Some(summary))
    }

    /// Forgets a tracked root along with every comic stored below it.
    pub fn clear_directory(&self, import_directory_id: i64) -> Result<bool> {
        let _job = self.begin_job("clear")?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let Some(tracked) = queries::get_import_directory(&tx, import_directory_id)? else {
            return Ok(false);
        };
        let removed = db::delete_comics_under_path(&tx, &tracked.path)?;
        db::delete_import_directory(&tx, tracked.id)?;
        tx.commit()?;

        log::info!("Cleared {}: {} comic(s) removed", tracked.path, removed);
        self.emit(ImportEvent::CatalogChanged);
        Ok(true)
    }

    /// Wipes the whole catalog.
    pub fn clear_all(&self) -> Result<()> {
        let _job = self.begin_job("clear")?;
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        db::wipe_all(&tx)?;
        tx.commit()?;

        log::info!("Catalog wiped");
        self.emit(ImportEvent::CatalogChanged);
        Ok(())
    }

    fn begin_job(&self, kind: &'static str) -> Result<JobGuard> {
        let mut current = lock(&self.inner.current);
        if let Some(running) = current.as_ref() {
            log::warn!("Rejected {} while {} {} is running", kind, running.kind, running.id);
            return Err(Error::ImportBusy);
        }
        let id = Uuid::new_v4().to_string();
        *current = Some(JobHandle {
            id: id.clone(),
            kind,
        });
        Ok(JobGuard {
            inner: self.inner.clone(),
            id,
        })
    }

    fn current_job_id(&self) -> Option<String> {
        lock(&self.inner.current).as_ref().map(|h| h.id.clone())
    }

    fn run_pass(&self, root: &Path, library_id: Option<i64>) -> Result<ImportSummary> {
        let run_id = self.current_job_id().unwrap_or_else(|| Uuid::new_v4().to_string());
        let root_label = root.display().to_string();

        log::info!("Import {} started: {}", run_id, root_label);
        self.emit(ImportEvent::Started {
            run_id: run_id.clone(),
            root: root_label.clone(),
        });

        match self.import_pass(root, library_id) {
            Ok(summary) => {
                log::info!(
                    "Import {} finished: {} imported, {} updated",
                    run_id,
                    summary.imported,
                    summary.updated
                );
                self.emit(ImportEvent::Finished {
                    run_id,
                    root: root_label,
                    summary,
                });
                Ok(summary)
            }
            Err(err) => {
                log::warn!("Import {} failed for {}: {}", run_id, root_label, err);
                self.emit(ImportEvent::Failed {
                    run_id,
                    root: root_label,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Scans everything first and only then opens the write transaction, so a
    /// filesystem error leaves the catalog untouched.
    fn import_pass(&self, root: &Path, library_id: Option<i64>) -> Result<ImportSummary> {
        let root = root.canonicalize().map_err(|err| {
            Error::Path(format!("Cannot resolve import root {}: {}", root.display(), err))
        })?;

        let mut conn = self.pool.get()?;
        if let Some(id) = library_id {
            if !queries::library_exists(&conn, id)? {
                return Err(Error::NotFound(format!("Library {id}")));
            }
        }

        let mut scanned: Vec<(ComicIdentity, PathBuf, ComicScan)> = Vec::new();
        for (directory, identity) in scan::list_comic_folders(&root)? {
            let comic = scan::scan_comic(&directory, &self.scan)?;
            scanned.push((identity, directory, comic));
        }

        let mut summary = ImportSummary::default();
        let tx = conn.transaction()?;
        for (identity, directory, comic) in &scanned {
            let outcome = reconcile::reconcile_comic(&tx, identity, directory, comic, library_id)?;
            summary.record(outcome);
        }
        tx.commit()?;

        db::upsert_import_directory(&conn, &root.to_string_lossy(), library_id)?;
        Ok(summary)
    }

    fn emit(&self, event: ImportEvent) {
        lock(&self.inner.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }
}
