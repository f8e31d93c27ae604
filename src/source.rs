//! External asset sources.
//!
//! The resolver and writer read vanilla assets by archive-relative path
//! (`assets/minecraft/models/block/oak_door_bottom.json`). A source is either
//! an extracted directory, a client jar / resource zip, or an in-memory map
//! used by tests and dry runs. A missing entry is `Ok(None)`, not an error.

use std::collections::BTreeMap;
use std::fs::File;
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::config::is_archive_path;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Asset archive {path}: {reason}")]
    Archive { path: String, reason: String },

    #[error("Rejected asset path: {0}")]
    InvalidPath(String),

    #[error("Asset read task failed: {0}")]
    Task(String),
}

pub trait AssetSource: Send + Sync {
    fn read(&self, path: &str) -> impl Future<Output = Result<Option<Vec<u8>>, SourceError>> + Send;
}

/// Archive-relative paths only: no absolute paths, no `..`.
fn check_path(path: &str) -> Result<(), SourceError> {
    let bad = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.split('/').any(|seg| seg == ".." || seg.is_empty());
    if bad {
        return Err(SourceError::InvalidPath(path.to_string()));
    }
    Ok(())
}

// --- Directory ---

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirectorySource {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, SourceError> {
        check_path(path)?;
        match tokio::fs::read(self.root.join(path)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SourceError::Io { path: path.to_string(), source }),
        }
    }
}

// --- Zip / jar ---

/// A zip or jar opened once and shared; entry reads run on the blocking pool.
#[derive(Clone)]
pub struct ArchiveSource {
    path: PathBuf,
    archive: Arc<Mutex<ZipArchive<File>>>,
}

impl std::fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveSource").field("path", &self.path).finish()
    }
}

impl ArchiveSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let path = path.into();
        let display = path.display().to_string();
        let file = File::open(&path).map_err(|source| SourceError::Io { path: display.clone(), source })?;
        let archive = ZipArchive::new(file).map_err(|e| SourceError::Archive {
            path: display,
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), entries = archive.len(), "opened asset archive");
        Ok(Self { path, archive: Arc::new(Mutex::new(archive)) })
    }
}

impl AssetSource for ArchiveSource {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, SourceError> {
        check_path(path)?;
        let archive = Arc::clone(&self.archive);
        let archive_path = self.path.display().to_string();
        let entry = path.to_string();

        tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>, SourceError> {
            let mut zip = archive.lock().map_err(|_| SourceError::Archive {
                path: archive_path.clone(),
                reason: "archive lock poisoned".into(),
            })?;
            let mut file = match zip.by_name(&entry) {
                Ok(f) => f,
                Err(ZipError::FileNotFound) => return Ok(None),
                Err(e) => {
                    return Err(SourceError::Archive {
                        path: format!("{}!{}", archive_path, entry),
                        reason: e.to_string(),
                    })
                }
            };
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)
                .map_err(|source| SourceError::Io { path: entry.clone(), source })?;
            Ok(Some(bytes))
        })
        .await
        .map_err(|e| SourceError::Task(e.to_string()))?
    }
}

// --- In memory ---

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), bytes.into());
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AssetSource for MemorySource {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, SourceError> {
        check_path(path)?;
        Ok(self.entries.get(path).cloned())
    }
}

// --- Selected at runtime ---

/// Source chosen from configuration: `.zip`/`.jar` opens an archive,
/// anything else is a directory, nothing configured is an empty source.
#[derive(Debug, Clone)]
pub enum VanillaSource {
    Directory(DirectorySource),
    Archive(ArchiveSource),
    Memory(MemorySource),
}

impl VanillaSource {
    pub fn open(path: Option<&Path>) -> Result<Self, SourceError> {
        match path {
            Some(p) if is_archive_path(p) => Ok(Self::Archive(ArchiveSource::open(p)?)),
            Some(p) => Ok(Self::Directory(DirectorySource::new(p))),
            None => Ok(Self::Memory(MemorySource::new())),
        }
    }
}

impl AssetSource for VanillaSource {
    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, SourceError> {
        match self {
            Self::Directory(s) => s.read(path).await,
            Self::Archive(s) => s.read(path).await,
            Self::Memory(s) => s.read(path).await,
        }
    }
}
