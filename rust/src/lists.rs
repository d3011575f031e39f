//! Bookmark and history persistence.
//!
//! Both lists are flat, ordered sequences of document titles. Every mutation is a
//! whole-value read-modify-write against one backing store; there are no partial
//! updates. Bookmarks can live either in a local property-list file or in a cloud
//! key-value slot, chosen per operation from [`Preferences::use_cloud_bookmarks`].
//! The two backends hold independent lists and are never merged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::preferences::Preferences;
use crate::wiki::HOME_DOCUMENT_TITLE;

/// File name (local) and key (cloud) shared by the bookmark backends.
pub const BOOKMARKS_KEY: &str = "bookmarksFile";
pub const HISTORIES_FILE_NAME: &str = "historiesFile";
pub const CLOUD_STORE_FILE_NAME: &str = "cloud_kv.json";

pub const BOOKMARKS_EXPORT_FILE_NAME: &str = "namu_bookmarks.txt";
pub const HISTORY_EXPORT_FILE_NAME: &str = "namu_history.txt";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed list in {path}: {message}")]
    Format { path: String, message: String },

    #[error("cloud store rejected write for key {0}")]
    Cloud(String),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

pub trait ListStore: Send + Sync {
    /// An absent store reads as an empty list.
    fn load(&self) -> Result<Vec<String>, StorageError>;

    /// Overwrites the whole list.
    fn store(&self, items: &[String]) -> Result<(), StorageError>;

    /// Seeds an empty list when the store cannot be read (first run or corruption).
    fn ensure_initialized(&self) -> Result<(), StorageError> {
        match self.load() {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(%e, "list store unreadable, reseeding empty");
                self.store(&[])
            }
        }
    }
}

/// Ordered string list in an XML property-list file.
#[derive(Debug, Clone)]
pub struct PlistFileStore {
    path: PathBuf,
}

impl PlistFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ListStore for PlistFileStore {
    fn load(&self) -> Result<Vec<String>, StorageError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };
        plist::from_bytes::<Vec<String>>(&bytes).map_err(|e| StorageError::Format {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn store(&self, items: &[String]) -> Result<(), StorageError> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, &items).map_err(|e| StorageError::Format {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        write_atomically(&self.path, &buf)
    }

    fn ensure_initialized(&self) -> Result<(), StorageError> {
        if !self.path.exists() || self.load().is_err() {
            tracing::info!(path = %self.path.display(), "seeding empty list file");
            return self.store(&[]);
        }
        Ok(())
    }
}

pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes).map_err(|e| StorageError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

/// Platform cloud key-value slot (iCloud key-value store on iOS).
#[uniffi::export(callback_interface)]
pub trait CloudKeyValueStore: Send + Sync + 'static {
    fn string_list(&self, key: String) -> Option<Vec<String>>;
    /// Returns false when the platform rejected the write.
    fn set_string_list(&self, key: String, values: Vec<String>) -> bool;
}

pub type SharedCloudStore = Arc<RwLock<Arc<dyn CloudKeyValueStore>>>;

/// On-disk stand-in for the cloud slot, used when the platform provides none.
pub struct JsonFileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn in_data_dir(data_dir: &str) -> Self {
        Self::new(Path::new(data_dir).join(CLOUD_STORE_FILE_NAME))
    }

    fn read_all(&self) -> HashMap<String, Vec<String>> {
        let Ok(data) = std::fs::read(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_slice(&data).unwrap_or_else(|e| {
            tracing::warn!(%e, path = %self.path.display(), "cloud stand-in unreadable, starting empty");
            HashMap::new()
        })
    }
}

impl CloudKeyValueStore for JsonFileKeyValueStore {
    fn string_list(&self, key: String) -> Option<Vec<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.read_all().remove(&key)
    }

    fn set_string_list(&self, key: String, values: Vec<String>) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut all = self.read_all();
        all.insert(key, values);
        let Ok(json) = serde_json::to_vec(&all) else {
            return false;
        };
        match write_atomically(&self.path, &json) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%e, "cloud stand-in write failed");
                false
            }
        }
    }
}

/// One key of the cloud key-value store.
#[derive(Clone)]
pub struct CloudListStore {
    kv: SharedCloudStore,
    key: String,
}

impl CloudListStore {
    pub fn new(kv: SharedCloudStore, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    fn backend(&self) -> Arc<dyn CloudKeyValueStore> {
        match self.kv.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }
}

impl ListStore for CloudListStore {
    fn load(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.backend().string_list(self.key.clone()).unwrap_or_default())
    }

    fn store(&self, items: &[String]) -> Result<(), StorageError> {
        if self.backend().set_string_list(self.key.clone(), items.to_vec()) {
            Ok(())
        } else {
            Err(StorageError::Cloud(self.key.clone()))
        }
    }
}

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkBackend {
    Local,
    Cloud,
}

impl BookmarkBackend {
    pub fn from_preferences(prefs: &Preferences) -> Self {
        if prefs.use_cloud_bookmarks {
            Self::Cloud
        } else {
            Self::Local
        }
    }
}

fn export_text(items: Result<Vec<String>, StorageError>) -> Option<String> {
    items.ok().map(|items| items.join("\n"))
}

fn without_offsets(mut items: Vec<String>, offsets: &[u32]) -> Vec<String> {
    let mut offsets: Vec<usize> = offsets.iter().map(|o| *o as usize).collect();
    offsets.sort_unstable();
    offsets.dedup();
    for idx in offsets.into_iter().rev() {
        if idx < items.len() {
            items.remove(idx);
        }
    }
    items
}

pub struct BookmarksRepository {
    local: PlistFileStore,
    cloud: CloudListStore,
}

impl BookmarksRepository {
    pub fn new(local: PlistFileStore, cloud: CloudListStore) -> Self {
        Self { local, cloud }
    }

    pub fn in_data_dir(data_dir: &str, cloud: SharedCloudStore) -> Self {
        Self::new(
            PlistFileStore::new(Path::new(data_dir).join(BOOKMARKS_KEY)),
            CloudListStore::new(cloud, BOOKMARKS_KEY),
        )
    }

    fn backend(&self, backend: BookmarkBackend) -> &dyn ListStore {
        match backend {
            BookmarkBackend::Local => &self.local,
            BookmarkBackend::Cloud => &self.cloud,
        }
    }

    pub fn load(&self, backend: BookmarkBackend) -> Result<Vec<String>, StorageError> {
        self.backend(backend).load()
    }

    pub fn store(&self, backend: BookmarkBackend, items: &[String]) -> Result<(), StorageError> {
        self.backend(backend).store(items)
    }

    pub fn contains(&self, backend: BookmarkBackend, title: &str) -> Result<bool, StorageError> {
        Ok(self.load(backend)?.iter().any(|b| b == title))
    }

    /// Prepends `title` unless it is already bookmarked anywhere in the list.
    pub fn insert_first(&self, backend: BookmarkBackend, title: &str) -> Result<(), StorageError> {
        let mut items = self.load(backend)?;
        if items.iter().any(|b| b == title) {
            return Ok(());
        }
        items.insert(0, title.to_string());
        self.store(backend, &items)
    }

    pub fn remove(&self, backend: BookmarkBackend, title: &str) -> Result<(), StorageError> {
        let mut items = self.load(backend)?;
        items.retain(|b| b != title);
        self.store(backend, &items)
    }

    pub fn remove_at(
        &self,
        backend: BookmarkBackend,
        offsets: &[u32],
    ) -> Result<Vec<String>, StorageError> {
        let items = without_offsets(self.load(backend)?, offsets);
        self.store(backend, &items)?;
        Ok(items)
    }

    /// Moves the entry at `from` so that it ends up at index `to` of the result.
    pub fn move_item(
        &self,
        backend: BookmarkBackend,
        from: u32,
        to: u32,
    ) -> Result<Vec<String>, StorageError> {
        let mut items = self.load(backend)?;
        let (from, to) = (from as usize, to as usize);
        if from < items.len() {
            let item = items.remove(from);
            let to = to.min(items.len());
            items.insert(to, item);
            self.store(backend, &items)?;
        }
        Ok(items)
    }

    pub fn remove_all(&self, backend: BookmarkBackend) -> Result<(), StorageError> {
        self.store(backend, &[])
    }

    pub fn ensure_initialized(&self, backend: BookmarkBackend) -> Result<(), StorageError> {
        self.backend(backend).ensure_initialized()
    }

    pub fn export_text(&self, backend: BookmarkBackend) -> Option<String> {
        export_text(self.load(backend))
    }
}

pub struct HistoryRepository {
    store: PlistFileStore,
}

impl HistoryRepository {
    pub fn new(store: PlistFileStore) -> Self {
        Self { store }
    }

    pub fn in_data_dir(data_dir: &str) -> Self {
        Self::new(PlistFileStore::new(
            Path::new(data_dir).join(HISTORIES_FILE_NAME),
        ))
    }

    pub fn load(&self) -> Result<Vec<String>, StorageError> {
        self.store.load()
    }

    pub fn store(&self, items: &[String]) -> Result<(), StorageError> {
        self.store.store(items)
    }

    /// Records a visit. The home document and a re-visit of the current head are no-ops.
    pub fn insert_first(&self, title: &str) -> Result<(), StorageError> {
        if title == HOME_DOCUMENT_TITLE {
            return Ok(());
        }
        let mut items = self.load()?;
        if items.first().map(String::as_str) == Some(title) {
            return Ok(());
        }
        items.insert(0, title.to_string());
        self.store(&items)
    }

    pub fn remove_at(&self, offsets: &[u32]) -> Result<Vec<String>, StorageError> {
        let items = without_offsets(self.load()?, offsets);
        self.store(&items)?;
        Ok(items)
    }

    pub fn remove_all(&self) -> Result<(), StorageError> {
        self.store(&[])
    }

    pub fn ensure_initialized(&self) -> Result<(), StorageError> {
        self.store.ensure_initialized()
    }

    pub fn export_text(&self) -> Option<String> {
        export_text(self.load())
    }
}

/// Writes exported list text to `dir/file_name` for the share sheet.
pub fn write_export(dir: &Path, file_name: &str, text: &str) -> Result<PathBuf, StorageError> {
    let path = dir.join(file_name);
    write_atomically(&path, text.as_bytes())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemoryKv {
        values: Mutex<HashMap<String, Vec<String>>>,
        reject_writes: bool,
    }

    impl MemoryKv {
        fn shared(reject_writes: bool) -> SharedCloudStore {
            let kv: Arc<dyn CloudKeyValueStore> = Arc::new(MemoryKv {
                values: Mutex::new(HashMap::new()),
                reject_writes,
            });
            Arc::new(RwLock::new(kv))
        }
    }

    impl CloudKeyValueStore for MemoryKv {
        fn string_list(&self, key: String) -> Option<Vec<String>> {
            self.values.lock().unwrap().get(&key).cloned()
        }

        fn set_string_list(&self, key: String, values: Vec<String>) -> bool {
            if self.reject_writes {
                return false;
            }
            self.values.lock().unwrap().insert(key, values);
            true
        }
    }

    fn bookmarks(dir: &Path) -> BookmarksRepository {
        BookmarksRepository::in_data_dir(dir.to_str().unwrap(), MemoryKv::shared(false))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const LOCAL: BookmarkBackend = BookmarkBackend::Local;

    #[test]
    fn absent_file_loads_as_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        assert_eq!(repo.load(LOCAL).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn store_then_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        let list = strings(&["b", "a", "c", "a"]);
        repo.store(LOCAL, &list).unwrap();
        assert_eq!(repo.load(LOCAL).unwrap(), list);
    }

    #[test]
    fn local_file_is_an_xml_property_list() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        repo.insert_first(LOCAL, "Doc").unwrap();
        let raw = std::fs::read_to_string(dir.path().join(BOOKMARKS_KEY)).unwrap();
        assert!(raw.contains("<plist"));
        assert!(raw.contains("<string>Doc</string>"));
    }

    #[test]
    fn insert_first_prepends_and_ignores_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        repo.insert_first(LOCAL, "Doc A").unwrap();
        repo.insert_first(LOCAL, "Doc B").unwrap();
        repo.insert_first(LOCAL, "Doc A").unwrap();
        repo.insert_first(LOCAL, "Doc B").unwrap();
        assert_eq!(repo.load(LOCAL).unwrap(), strings(&["Doc B", "Doc A"]));
    }

    #[test]
    fn remove_drops_every_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        repo.store(LOCAL, &strings(&["x", "y", "x"])).unwrap();
        repo.remove(LOCAL, "x").unwrap();
        assert_eq!(repo.load(LOCAL).unwrap(), strings(&["y"]));
        assert!(!repo.contains(LOCAL, "x").unwrap());
    }

    #[test]
    fn remove_all_then_load_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        repo.store(LOCAL, &strings(&["x", "y"])).unwrap();
        repo.remove_all(LOCAL).unwrap();
        assert!(repo.load(LOCAL).unwrap().is_empty());

        let history = HistoryRepository::in_data_dir(dir.path().to_str().unwrap());
        history.store(&strings(&["h"])).unwrap();
        history.remove_all().unwrap();
        assert!(history.load().unwrap().is_empty());
    }

    #[test]
    fn move_item_and_remove_at_reorder_the_list() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        repo.store(LOCAL, &strings(&["a", "b", "c", "d"])).unwrap();
        assert_eq!(
            repo.move_item(LOCAL, 0, 2).unwrap(),
            strings(&["b", "c", "a", "d"])
        );
        assert_eq!(
            repo.remove_at(LOCAL, &[3, 0, 3, 9]).unwrap(),
            strings(&["c", "a"])
        );
        assert_eq!(repo.load(LOCAL).unwrap(), strings(&["c", "a"]));
    }

    #[test]
    fn corrupt_file_is_an_error_and_ensure_initialized_heals_it() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        std::fs::write(dir.path().join(BOOKMARKS_KEY), b"not a plist").unwrap();
        assert!(matches!(
            repo.load(LOCAL),
            Err(StorageError::Format { .. })
        ));
        assert_eq!(repo.export_text(LOCAL), None);
        assert!(repo.insert_first(LOCAL, "x").is_err());

        repo.ensure_initialized(LOCAL).unwrap();
        assert!(repo.load(LOCAL).unwrap().is_empty());
    }

    #[test]
    fn ensure_initialized_creates_missing_file_and_keeps_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryRepository::in_data_dir(dir.path().to_str().unwrap());
        history.ensure_initialized().unwrap();
        assert!(dir.path().join(HISTORIES_FILE_NAME).exists());

        history.insert_first("kept").unwrap();
        history.ensure_initialized().unwrap();
        assert_eq!(history.load().unwrap(), strings(&["kept"]));
    }

    #[test]
    fn history_skips_consecutive_duplicates_and_home_document() {
        let dir = tempfile::tempdir().unwrap();
        let history = HistoryRepository::in_data_dir(dir.path().to_str().unwrap());
        history.store(&strings(&["X", "Y"])).unwrap();

        history.insert_first("X").unwrap();
        assert_eq!(history.load().unwrap(), strings(&["X", "Y"]));

        history.insert_first(HOME_DOCUMENT_TITLE).unwrap();
        assert_eq!(history.load().unwrap(), strings(&["X", "Y"]));

        // Non-consecutive repeats are recorded again.
        history.insert_first("Y").unwrap();
        assert_eq!(history.load().unwrap(), strings(&["Y", "X", "Y"]));
    }

    #[test]
    fn export_text_joins_with_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        assert_eq!(repo.export_text(LOCAL).as_deref(), Some(""));
        repo.store(LOCAL, &strings(&["a", "b"])).unwrap();
        assert_eq!(repo.export_text(LOCAL).as_deref(), Some("a\nb"));

        let path = write_export(&dir.path().join("cache"), "out.txt", "a\nb").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a\nb");
    }

    #[test]
    fn backends_hold_independent_lists() {
        let dir = tempfile::tempdir().unwrap();
        let repo = bookmarks(dir.path());
        repo.insert_first(LOCAL, "local only").unwrap();

        assert!(repo.load(BookmarkBackend::Cloud).unwrap().is_empty());
        repo.insert_first(BookmarkBackend::Cloud, "cloud only").unwrap();

        assert_eq!(repo.load(LOCAL).unwrap(), strings(&["local only"]));
        assert_eq!(
            repo.load(BookmarkBackend::Cloud).unwrap(),
            strings(&["cloud only"])
        );
    }

    #[test]
    fn rejected_cloud_write_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = BookmarksRepository::in_data_dir(
            dir.path().to_str().unwrap(),
            MemoryKv::shared(true),
        );
        assert!(matches!(
            repo.insert_first(BookmarkBackend::Cloud, "x"),
            Err(StorageError::Cloud(_))
        ));
    }

    #[test]
    fn json_file_key_value_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLOUD_STORE_FILE_NAME);
        let kv = JsonFileKeyValueStore::new(&path);
        assert_eq!(kv.string_list("k".into()), None);
        assert!(kv.set_string_list("k".into(), vec!["v".into()]));
        let reopened = JsonFileKeyValueStore::new(&path);
        assert_eq!(reopened.string_list("k".into()), Some(vec!["v".to_string()]));
    }

    #[test]
    fn corrupt_json_stand_in_reads_empty_and_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLOUD_STORE_FILE_NAME);
        std::fs::write(&path, b"{not json").unwrap();
        let kv = JsonFileKeyValueStore::new(&path);
        assert_eq!(kv.string_list("k".into()), None);
        assert!(kv.set_string_list("k".into(), vec!["v".into()]));
        let raw = std::fs::read(&path).unwrap();
        assert!(serde_json::from_slice::<serde_json::Value>(&raw).is_ok());
        assert_eq!(kv.string_list("k".into()), Some(vec!["v".to_string()]));
    }

    #[test]
    fn backend_follows_preference() {
        let mut prefs = Preferences::default();
        assert_eq!(BookmarkBackend::from_preferences(&prefs), BookmarkBackend::Local);
        prefs.use_cloud_bookmarks = true;
        assert_eq!(BookmarkBackend::from_preferences(&prefs), BookmarkBackend::Cloud);
    }
}
