//! File-backed provider store.
//!
//! # File Layout
//!
//! When you open a store at `./data`:
//! - `./data/providers.json` - record list (JSON array)
//! - `./data/embeddings.npy` - embedding matrix (NumPy `.npy`, `<f4`)
//! - `./data/.provider-index.lock` - advisory lock file for writers
//!
//! # Atomicity
//!
//! Each artifact is written to a temporary file in the same directory and
//! then renamed over the committed one. The two renames happen in a fixed
//! order, records first, and the previous record list is staged aside
//! beforehand so a failed matrix rename can be undone:
//!
//! ```text
//! stage records.tmp ─ stage matrix.tmp ─ copy records → backup.tmp
//!     │
//!     ▼
//! rename records.tmp → providers.json ──fail──▶ abort (nothing changed)
//!     │
//!     ▼
//! rename matrix.tmp → embeddings.npy ──fail──▶ rename backup.tmp → providers.json
//! ```
//!
//! Once both renames succeed the save has committed. Under
//! [`SyncMode::Paranoid`] the directory is fsynced afterwards; a failure
//! there is logged and the save still reports success, since the new
//! artifacts are already in place and rolling back is no longer possible.
//!
//! Temporary files left behind by a crash never carry the committed names,
//! so `load` ignores them.
//!
//! # Recovery
//!
//! A crash between the two renames leaves `providers.json` one record ahead
//! of `embeddings.npy`, and `load` refuses the pair with
//! [`StartupError::RowCountMismatch`]. The directory then holds a
//! `.providers.json.*.tmp` backup with the previous record list. Either:
//!
//! - move that backup over `providers.json` to return to the last complete
//!   save, or
//! - run [`prepare::rebuild`](crate::prepare::rebuild) to re-encode the
//!   current record list into a matching matrix, keeping the new record.
//!
//! Stray `.tmp` files can be deleted once the store loads again.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, SyncMode};
use crate::error::{ProviderIndexError, Result, StartupError, StorageError};
use crate::index::Snapshot;
use crate::types::{EmbeddingMatrix, ProviderRecord};

use super::{npy, schema, ProviderStore};

/// Name of the advisory lock file inside the data directory.
const LOCK_FILE_NAME: &str = ".provider-index.lock";

/// Provider store keeping both artifacts in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    records_path: PathBuf,
    embeddings_path: PathBuf,
    sync_mode: SyncMode,
    #[cfg(test)]
    dir_sync_fault: Option<io::ErrorKind>,
}

impl FileStore {
    /// Creates a store rooted at `data_dir`, using the artifact names and
    /// durability mode from `config`.
    ///
    /// Nothing is touched on disk until `load` or `save` is called.
    pub fn new(data_dir: impl AsRef<Path>, config: &Config) -> Self {
        let dir = data_dir.as_ref().to_path_buf();
        Self {
            records_path: config.providers_path(&dir),
            embeddings_path: config.embeddings_path(&dir),
            sync_mode: config.sync_mode,
            dir,
            #[cfg(test)]
            dir_sync_fault: None,
        }
    }

    /// Path of the record list artifact.
    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Path of the embedding matrix artifact.
    pub fn embeddings_path(&self) -> &Path {
        &self.embeddings_path
    }

    /// Reads and validates only the record list.
    ///
    /// Used when rebuilding the matrix from scratch.
    pub fn load_records(&self) -> Result<Vec<ProviderRecord>> {
        let bytes = read_artifact(&self.records_path)?;
        schema::decode_records(&bytes)
            .map_err(|reason| StartupError::malformed(&self.records_path, reason).into())
    }

    fn load_matrix(&self) -> Result<EmbeddingMatrix> {
        let bytes = read_artifact(&self.embeddings_path)?;
        npy::read_matrix(&bytes)
            .map_err(|reason| StartupError::malformed(&self.embeddings_path, reason).into())
    }

    /// Takes the cross-process writer lock. Released when the file is dropped.
    fn lock_writer(&self) -> std::result::Result<File, StorageError> {
        let path = self.dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;
        fs2::FileExt::lock_exclusive(&file)
            .map_err(|e| StorageError::Lock(format!("{}: {e}", path.display())))?;
        Ok(file)
    }

    /// Writes `contents` into a fresh temporary file next to `target`.
    fn stage(
        &self,
        target: &Path,
        contents: impl FnOnce(&mut File) -> io::Result<()>,
    ) -> std::result::Result<NamedTempFile, StorageError> {
        let mut staged = self.temp_for(target)?;
        contents(staged.as_file_mut()).map_err(|e| StorageError::io(staged.path(), e))?;
        if self.sync_mode.syncs_files() {
            staged
                .as_file()
                .sync_all()
                .map_err(|e| StorageError::io(staged.path(), e))?;
        }
        debug!(target = %target.display(), staged = %staged.path().display(), "Staged artifact");
        Ok(staged)
    }

    /// Copies the committed record list aside, if there is one.
    fn stage_backup(&self) -> std::result::Result<Option<NamedTempFile>, StorageError> {
        let mut current = match File::open(&self.records_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.records_path, e)),
        };
        let backup = self.stage(&self.records_path, |out| {
            io::copy(&mut current, out).map(|_| ())
        })?;
        Ok(Some(backup))
    }

    fn temp_for(&self, target: &Path) -> std::result::Result<NamedTempFile, StorageError> {
        let stem = target
            .file_name()
            .map(|n| format!(".{}.", n.to_string_lossy()))
            .unwrap_or_else(|| ".artifact.".to_string());
        tempfile::Builder::new()
            .prefix(&stem)
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| StorageError::io(&self.dir, e))
    }

    /// Puts the previous record list back after a failed matrix replace.
    fn restore_records(&self, backup: Option<NamedTempFile>) {
        let outcome = match backup {
            Some(file) => file.persist(&self.records_path).map(|_| ()).map_err(|e| e.error),
            None => fs::remove_file(&self.records_path),
        };
        match outcome {
            Ok(()) => warn!(path = %self.records_path.display(), "Rolled back record list"),
            Err(e) => warn!(
                path = %self.records_path.display(),
                error = %e,
                "Could not roll back record list; artifacts may disagree until the next save"
            ),
        }
    }

    fn sync_dir(&self) -> io::Result<()> {
        if !self.sync_mode.syncs_directory() {
            return Ok(());
        }
        #[cfg(test)]
        if let Some(kind) = self.dir_sync_fault {
            return Err(io::Error::from(kind));
        }
        #[cfg(unix)]
        File::open(&self.dir).and_then(|d| d.sync_all())?;
        Ok(())
    }
}

impl ProviderStore for FileStore {
    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn load(&self) -> Result<Snapshot> {
        let records = self.load_records()?;
        let matrix = self.load_matrix()?;

        if records.len() != matrix.rows() {
            return Err(StartupError::RowCountMismatch {
                records: records.len(),
                rows: matrix.rows(),
            }
            .into());
        }

        info!(
            records = records.len(),
            dimension = matrix.dimension(),
            "Loaded provider artifacts"
        );

        Snapshot::new(records, matrix).map_err(|e| {
            ProviderIndexError::from(StartupError::malformed(&self.embeddings_path, e.to_string()))
        })
    }

    #[instrument(skip(self, snapshot), fields(dir = %self.dir.display(), records = snapshot.len()))]
    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let _lock = self.lock_writer()?;

        let records_bytes = schema::encode_records(snapshot.records()).map_err(StorageError::from)?;
        let staged_records = self.stage(&self.records_path, |f| f.write_all(&records_bytes))?;
        let staged_matrix = self.stage(&self.embeddings_path, |f| {
            let mut out = io::BufWriter::new(f);
            npy::write_matrix(&mut out, snapshot.matrix())?;
            out.flush()
        })?;
        let backup = self.stage_backup()?;

        staged_records
            .persist(&self.records_path)
            .map_err(|e| StorageError::io(&self.records_path, e.error))?;

        if let Err(e) = staged_matrix.persist(&self.embeddings_path) {
            warn!(
                path = %self.embeddings_path.display(),
                error = %e.error,
                "Matrix replace failed after record list was replaced"
            );
            self.restore_records(backup);
            return Err(StorageError::io(&self.embeddings_path, e.error).into());
        }

        if let Err(e) = self.sync_dir() {
            warn!(
                dir = %self.dir.display(),
                error = %e,
                "Directory sync failed after both artifacts were replaced"
            );
        }
        debug!("Artifacts committed");
        Ok(())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

fn read_artifact(path: &Path) -> std::result::Result<Vec<u8>, StartupError> {
    fs::read(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            StartupError::MissingArtifact(path.to_path_buf())
        } else {
            StartupError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}
