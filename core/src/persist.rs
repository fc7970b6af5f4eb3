use crate::index::{DocId, DocumentInfo, Registry, TermIndex};
use crate::similarity::ScoreRecord;
use crate::tfidf::TfIdfRecord;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const META_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub num_docs: usize,
    pub num_terms: usize,
    pub updated_at: String,
}

impl IndexMeta {
    pub fn now(num_docs: usize, num_terms: usize) -> Result<Self> {
        let updated_at = time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339)?;
        Ok(Self { version: META_VERSION, num_docs, num_terms, updated_at })
    }
}

#[derive(Debug, Clone)]
pub struct StorePaths {
    pub root: PathBuf,
}

impl StorePaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn registry(&self) -> PathBuf { self.root.join("registry.json") }
    pub fn term_index(&self) -> PathBuf { self.root.join("term_index.json") }
    pub fn similarity_results(&self) -> PathBuf { self.root.join("similarity_results.json") }
    pub fn tfidf_results(&self) -> PathBuf { self.root.join("tfidf_results.json") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn lock(&self) -> PathBuf { self.root.join(".lock") }
}

/// The four persisted collections plus index metadata. Every collection is
/// read and written as a whole; callers load at the start of a pass and save
/// at the end.
#[derive(Debug, Clone)]
pub struct Store {
    pub paths: StorePaths,
}

impl Store {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let paths = StorePaths::new(root);
        create_dir_all(&paths.root).map_err(|e| Error::io(&paths.root, e))?;
        Ok(Self { paths })
    }

    /// Exclusive advisory lock on the store, released on drop.
    pub fn lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(&self.paths.lock())
    }

    pub fn load_registry(&self) -> Result<Registry> {
        read_json(&self.paths.registry())
    }

    pub fn save_registry(&self, registry: &Registry) -> Result<()> {
        write_json(&self.paths.registry(), registry)
    }

    /// Register new documents. Any id already stored, or repeated within
    /// `entries`, fails the whole batch before anything is written.
    pub fn add_documents(&self, entries: Vec<(DocId, DocumentInfo)>) -> Result<usize> {
        let mut registry = self.load_registry()?;
        let mut seen: HashSet<&str> = HashSet::new();
        for (id, _) in &entries {
            if registry.contains_key(id) || !seen.insert(id.as_str()) {
                return Err(Error::DuplicateDocument(id.clone()));
            }
        }
        let added = entries.len();
        registry.extend(entries);
        self.save_registry(&registry)?;
        tracing::info!(added, total = registry.len(), "registered documents");
        Ok(added)
    }

    pub fn add_document(&self, id: impl Into<DocId>, info: DocumentInfo) -> Result<()> {
        self.add_documents(vec![(id.into(), info)]).map(|_| ())
    }

    pub fn load_term_index(&self) -> Result<TermIndex> {
        read_json(&self.paths.term_index())
    }

    pub fn save_term_index(&self, index: &TermIndex) -> Result<()> {
        write_json(&self.paths.term_index(), index)
    }

    pub fn load_similarity_results(&self) -> Result<Vec<ScoreRecord>> {
        read_json(&self.paths.similarity_results())
    }

    pub fn append_similarity(&self, record: &ScoreRecord) -> Result<()> {
        append_json(&self.paths.similarity_results(), record)
    }

    pub fn load_tfidf_results(&self) -> Result<Vec<TfIdfRecord>> {
        read_json(&self.paths.tfidf_results())
    }

    pub fn append_tfidf(&self, record: &TfIdfRecord) -> Result<()> {
        append_json(&self.paths.tfidf_results(), record)
    }

    pub fn load_meta(&self) -> Result<Option<IndexMeta>> {
        if !self.paths.meta().exists() {
            return Ok(None);
        }
        read_json(&self.paths.meta()).map(Some)
    }

    pub fn save_meta(&self, meta: &IndexMeta) -> Result<()> {
        write_json(&self.paths.meta(), meta)
    }
}

/// A missing file reads as the empty collection.
fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut buf = String::new();
    f.read_to_string(&mut buf).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&buf).map_err(|e| Error::json(path, e))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::json(path, e))?;
    let mut f = File::create(path).map_err(|e| Error::io(path, e))?;
    f.write_all(json.as_bytes()).map_err(|e| Error::io(path, e))?;
    Ok(())
}

fn append_json<T: Serialize + DeserializeOwned + Clone>(path: &Path, record: &T) -> Result<()> {
    let mut log: Vec<T> = read_json(path)?;
    log.push(record.clone());
    write_json(path, &log)
}

/// Holds an exclusive `flock` on the store's lock file. On non-unix targets
/// only the lock file is created and no lock is taken.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| Error::Lock { path: path.to_path_buf(), source: e })?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if rc != 0 {
                return Err(Error::Lock { path: path.to_path_buf(), source: std::io::Error::last_os_error() });
            }
        }

        #[cfg(not(unix))]
        tracing::warn!(path = %path.display(), "advisory locking is unix-only; store access is not serialized");

        Ok(StoreLock { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_collections_load_empty() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert!(store.load_registry().unwrap().is_empty());
        assert!(store.load_term_index().unwrap().is_empty());
        assert!(store.load_similarity_results().unwrap().is_empty());
        assert!(store.load_meta().unwrap().is_none());
    }

    #[test]
    fn duplicate_in_batch_leaves_registry_untouched() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        store.add_document("a", DocumentInfo::new("a.txt", false)).unwrap();
        let before = std::fs::read(store.paths.registry()).unwrap();

        let batch = vec![
            ("b".to_string(), DocumentInfo::new("b.txt", false)),
            ("b".to_string(), DocumentInfo::new("b2.txt", false)),
        ];
        assert!(matches!(store.add_documents(batch), Err(Error::DuplicateDocument(id)) if id == "b"));
        assert_eq!(std::fs::read(store.paths.registry()).unwrap(), before);
    }

    #[test]
    fn meta_round_trips() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let meta = IndexMeta::now(3, 10).unwrap();
        assert!(time::OffsetDateTime::parse(&meta.updated_at, &time::format_description::well_known::Rfc3339).is_ok());
        store.save_meta(&meta).unwrap();
        assert_eq!(store.load_meta().unwrap(), Some(meta));
    }

    #[test]
    fn lock_can_be_retaken_after_drop() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        drop(store.lock().unwrap());
        let _again = store.lock().unwrap();
    }
}
