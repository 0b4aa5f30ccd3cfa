// store.rs — Store: tenant-scoped, transactional access to TenantRecords.
//
// Each tenant's records are one JSON document: `<data_dir>/<tenant_id>.json`.
// Writes go through `transact`, which runs the caller against a working
// copy while holding the store lock and commits only when the caller
// returns Ok. A failed guard therefore never leaves a half-applied
// transition behind, and two transactions on the same tenant never
// interleave.
//
// Other processes (every CLI command, the sweep daemon) write the same
// documents, so a file-backed store re-reads a tenant's document before
// each read or transaction instead of trusting what it loaded at open.
//
// Without a data directory the store is purely in memory (tests, demos).

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::StoreError;
use crate::records::TenantRecords;

/// Mutex-guarded map of tenant → records, optionally mirrored to disk.
pub struct Store {
    data_dir: Option<PathBuf>,
    tenants: Mutex<HashMap<Uuid, TenantRecords>>,
}

impl Store {
    /// A store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            tenants: Mutex::new(HashMap::new()),
        }
    }

    /// Open a file-backed store, loading every tenant document in `data_dir`.
    /// Creates the directory if it doesn't exist.
    ///
    /// A tenant document that fails to parse is an error: opening past it
    /// would let the next transaction overwrite it with an empty document.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|source| StoreError::IoError {
            path: data_dir.display().to_string(),
            source,
        })?;

        let mut tenants = HashMap::new();
        for (tenant_id, path) in tenant_files(&data_dir)? {
            let Some(records) = load_document(&path)? else {
                continue;
            };
            tenants.insert(tenant_id, records);
        }

        tracing::info!(tenants = tenants.len(), dir = %data_dir.display(), "store opened");
        Ok(Self {
            data_dir: Some(data_dir),
            tenants: Mutex::new(tenants),
        })
    }

    /// Tenants that have any records, including ones another process
    /// created after this store was opened.
    pub fn tenant_ids(&self) -> Vec<Uuid> {
        let mut ids: BTreeSet<Uuid> = self.lock().keys().copied().collect();
        if let Some(dir) = &self.data_dir {
            match tenant_files(dir) {
                Ok(files) => ids.extend(files.into_iter().map(|(id, _)| id)),
                Err(e) => tracing::warn!(dir = %dir.display(), "listing tenant documents: {}", e),
            }
        }
        ids.into_iter().collect()
    }

    /// Run a read-only closure against a tenant's records. An unknown
    /// tenant reads as empty. If the document on disk can't be re-read,
    /// the last copy this store saw is used.
    pub fn read<T>(&self, tenant_id: Uuid, f: impl FnOnce(&TenantRecords) -> T) -> T {
        let mut tenants = self.lock();
        if let Err(e) = self.refresh(&mut tenants, tenant_id) {
            tracing::warn!(tenant_id = %tenant_id, "reading cached tenant records: {}", e);
        }
        match tenants.get(&tenant_id) {
            Some(records) => f(records),
            None => f(&TenantRecords::new(tenant_id)),
        }
    }

    /// Run `f` against a working copy of the tenant's records and commit the
    /// copy only if `f` succeeds and (for a file-backed store) the document
    /// is written.
    pub fn transact<T, E>(
        &self,
        tenant_id: Uuid,
        f: impl FnOnce(&mut TenantRecords) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut tenants = self.lock();
        self.refresh(&mut tenants, tenant_id)?;
        let mut working = tenants
            .get(&tenant_id)
            .cloned()
            .unwrap_or_else(|| TenantRecords::new(tenant_id));

        let value = f(&mut working)?;

        self.persist(&working)?;
        tenants.insert(tenant_id, working);
        Ok(value)
    }

    /// Replace the cached copy of a tenant with its document on disk.
    fn refresh(
        &self,
        tenants: &mut HashMap<Uuid, TenantRecords>,
        tenant_id: Uuid,
    ) -> Result<(), StoreError> {
        let Some(path) = self.tenant_file(tenant_id) else {
            return Ok(());
        };
        if let Some(records) = load_document(&path)? {
            tenants.insert(tenant_id, records);
        }
        Ok(())
    }

    /// Write a tenant document via a temp file + rename.
    fn persist(&self, records: &TenantRecords) -> Result<(), StoreError> {
        let Some(path) = self.tenant_file(records.tenant_id) else {
            return Ok(());
        };
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records)?;
        fs::write(&tmp, json).map_err(|source| StoreError::IoError {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    fn tenant_file(&self, tenant_id: Uuid) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", tenant_id)))
    }

    // Transactions mutate a clone, so a panic inside one leaves the
    // committed map intact and the poison flag can be ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, TenantRecords>> {
        self.tenants.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `<tenant_id>.json` files in `dir`. Anything else is ignored.
fn tenant_files(dir: &Path) -> Result<Vec<(Uuid, PathBuf)>, StoreError> {
    let io_err = |source: std::io::Error| StoreError::IoError {
        path: dir.display().to_string(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        let tenant_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| Uuid::parse_str(stem).ok());
        match tenant_id {
            Some(id) => files.push((id, path)),
            None => tracing::debug!(path = %path.display(), "ignoring non-tenant file"),
        }
    }
    Ok(files)
}

/// Parse one tenant document. A missing file is `Ok(None)`.
fn load_document(path: &Path) -> Result<Option<TenantRecords>, StoreError> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::IoError {
                path: path.display().to_string(),
                source,
            })
        }
    };
    serde_json::from_str(&json)
        .map(Some)
        .map_err(|source| StoreError::CorruptDocument {
            path: path.display().to_string(),
            source,
        })
}
