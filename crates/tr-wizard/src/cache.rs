use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tr_core::core::{CachedSession, LocalCache, StoreError};

/// Cache key for the in-progress session. One entry per profile directory;
/// the entry's own annotation key says which conversation it belongs to.
pub const SESSION_CACHE_KEY: &str = "annotation-wizard-progress";

// ---------------------------------------------------------------------------
// FileCache: one JSON file per key under a profile directory
// ---------------------------------------------------------------------------

pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|err| {
            StoreError::Unavailable(format!("cannot create {}: {err}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<CachedSession>, StoreError> {
        let path = self.path_for(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StoreError::Unavailable(format!(
                    "cannot read {}: {err}",
                    path.display()
                )))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| StoreError::Malformed(format!("{}: {err}", path.display())))
    }

    fn set(&self, key: &str, entry: &CachedSession) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec(entry)
            .map_err(|err| StoreError::Malformed(format!("cannot encode session: {err}")))?;

        std::fs::write(&tmp, content)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|err| {
                StoreError::Unavailable(format!("cannot write {}: {err}", path.display()))
            })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Unavailable(format!(
                "cannot delete {}: {err}",
                path.display()
            ))),
        }
    }
}
