//! Packaged mod archives.
//!
//! [`ArchiveReader`] owns an open zip for as long as it lives; dropping it
//! closes the file on every path out of the caller, including `?` returns.
//! Entry names are listed from the central directory up front, contents are
//! only inflated when an entry is actually visited.
//!
//! [`pack_resources`] writes the inverse: a deterministic zip of a rendered
//! tree (sorted entries, fixed timestamps, deflate).

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::mapper::MaterializedFile;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a readable zip: {source}")]
    Zip {
        path: String,
        #[source]
        source: ZipError,
    },

    #[error("Entry {entry} in {path} is unreadable: {reason}")]
    Entry { path: String, entry: String, reason: String },

    #[error("Cannot pack {0}: contents were never rendered")]
    Unrendered(String),
}

pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    names: Vec<String>,
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("entries", &self.names.len())
            .finish()
    }
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| ArchiveError::Io { path: display.clone(), source })?;
        let archive = ZipArchive::new(BufReader::new(file))
            .map_err(|source| ArchiveError::Zip { path: display, source })?;
        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(str::to_string)
            .collect();
        names.sort();
        debug!(path = %path.display(), entries = names.len(), "opened mod archive");
        Ok(Self { path: path.to_path_buf(), archive, names })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File entry names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.binary_search_by(|n| n.as_str().cmp(name)).is_ok()
    }

    pub fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>, ArchiveError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(e) => e,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(entry_error(&self.path, name, e.to_string())),
        };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| entry_error(&self.path, name, e.to_string()))?;
        Ok(Some(bytes))
    }

    /// Entries whose name matches `filter`, read one at a time as the
    /// iterator advances.
    pub fn entries<F>(&mut self, filter: F) -> Entries<'_, F>
    where
        F: FnMut(&str) -> bool,
    {
        Entries { reader: self, next: 0, filter }
    }
}

fn entry_error(path: &Path, entry: &str, reason: String) -> ArchiveError {
    ArchiveError::Entry { path: path.display().to_string(), entry: entry.to_string(), reason }
}

pub struct Entries<'a, F> {
    reader: &'a mut ArchiveReader,
    next: usize,
    filter: F,
}

impl<F> Iterator for Entries<'_, F>
where
    F: FnMut(&str) -> bool,
{
    type Item = Result<(String, Vec<u8>), ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.reader.names.len() {
            let name = self.reader.names[self.next].clone();
            self.next += 1;
            if !(self.filter)(&name) {
                continue;
            }
            return Some(match self.reader.read(&name) {
                Ok(Some(bytes)) => Ok((name, bytes)),
                Ok(None) => Err(entry_error(&self.reader.path, &name, "listed but missing".into())),
                Err(e) => Err(e),
            });
        }
        None
    }
}

/// Write `(path, bytes)` entries to a zip at `out`. Entries are sorted and
/// stamped with the zip epoch so equal trees give equal archives.
pub fn pack_entries<'a, I>(entries: I, out: &Path) -> Result<(), ArchiveError>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let out_name = out.display().to_string();
    let io_err = |source| ArchiveError::Io { path: out_name.clone(), source };
    let zip_err = |source| ArchiveError::Zip { path: out_name.clone(), source };

    let mut sorted: Vec<(&str, &[u8])> = entries.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(File::create(out).map_err(io_err)?);
    for (name, bytes) in &sorted {
        zip.start_file(*name, options).map_err(zip_err)?;
        zip.write_all(bytes).map_err(io_err)?;
    }
    zip.finish().map_err(zip_err)?;
    debug!(path = %out_name, entries = sorted.len(), "packed archive");
    Ok(())
}

pub fn pack_resources(files: &[MaterializedFile], out: &Path) -> Result<(), ArchiveError> {
    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let bytes = file.bytes().ok_or_else(|| ArchiveError::Unrendered(file.path.clone()))?;
        entries.push((file.path.as_str(), bytes));
    }
    pack_entries(entries, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::FileContents;

    fn sample(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let entries: [(&str, &[u8]); 3] = [
            ("data/m/recipe/b.json", &b"{}"[..]),
            ("assets/m/lang/en_us.json", &b"{\"a\":1}"[..]),
            ("data/m/recipe/a.json", &b"[]"[..]),
        ];
        pack_entries(entries, &path).unwrap();
        path
    }

    #[test]
    fn test_pack_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let a = std::fs::read(sample(dir.path(), "a.zip")).unwrap();
        let b = std::fs::read(sample(dir.path(), "b.zip")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reader_lists_sorted_and_reads_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = ArchiveReader::open(&sample(dir.path(), "m.zip")).unwrap();
        let names: Vec<&str> = reader.names().collect();
        assert_eq!(names, vec!["assets/m/lang/en_us.json", "data/m/recipe/a.json", "data/m/recipe/b.json"]);
        assert!(reader.contains("data/m/recipe/a.json"));
        assert!(!reader.contains("data/m/recipe/c.json"));

        let recipes: Vec<(String, Vec<u8>)> = reader
            .entries(|n| n.starts_with("data/m/recipe/"))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0], ("data/m/recipe/a.json".to_string(), b"[]".to_vec()));
        assert_eq!(reader.read("missing.json").unwrap(), None);
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.jar");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(ArchiveReader::open(&path), Err(ArchiveError::Zip { .. })));
    }

    #[test]
    fn test_pack_refuses_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let files = [MaterializedFile { path: "x.png".into(), contents: FileContents::Placeholder, metadata: None }];
        assert!(matches!(
            pack_resources(&files, &dir.path().join("x.zip")),
            Err(ArchiveError::Unrendered(_))
        ));
    }
}
