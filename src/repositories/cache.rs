use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{ReposError, VirtualRepository};

/// Single-slot catalog cache owned by the descriptor.
///
/// Holds the result of the last successful fetch. `replace` swaps the whole
/// list, so readers see either the old or the new catalog, never a mix.
/// Concurrent refreshes are last-write-wins.
#[derive(Debug, Default)]
pub struct CatalogCache {
    current: RwLock<Arc<Vec<VirtualRepository>>>,
}

/// On-disk form of the descriptor state.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorState {
    #[serde(default)]
    virtual_repositories: Vec<VirtualRepository>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repositories(repos: Vec<VirtualRepository>) -> Self {
        Self {
            current: RwLock::new(Arc::new(repos)),
        }
    }

    /// Current catalog. Cheap: clones the `Arc`, not the list.
    pub fn snapshot(&self) -> Arc<Vec<VirtualRepository>> {
        // A poisoned lock still holds a whole list; keep serving it.
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn replace(&self, repos: Vec<VirtualRepository>) {
        let next = Arc::new(repos);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Load persisted state. A missing file yields an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReposError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no persisted catalog at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let data = fs::read(path).map_err(ReposError::Io)?;
        let state: DescriptorState = serde_json::from_slice(&data).map_err(ReposError::Json)?;
        debug!(
            "loaded {} cached repositories from {}",
            state.virtual_repositories.len(),
            path.display()
        );
        Ok(Self::with_repositories(state.virtual_repositories))
    }

    /// Persist the current catalog, writing a temp file then renaming it. The
    /// temp file is removed if any step fails.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), ReposError> {
        let path = path.as_ref();
        let state = DescriptorState {
            virtual_repositories: self.snapshot().as_ref().clone(),
        };
        let bytes = serde_json::to_vec_pretty(&state).map_err(ReposError::Json)?;

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(ReposError::Io)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(ReposError::Io)?;
        tmp.write_all(&bytes).map_err(ReposError::Io)?;
        tmp.persist(path).map_err(|e| ReposError::Io(e.error))?;

        debug!("persisted catalog to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn keys(cache: &CatalogCache) -> Vec<String> {
        cache.snapshot().iter().map(|r| r.key().to_string()).collect()
    }

    #[test]
    fn starts_empty_and_replaces_wholesale() {
        let cache = CatalogCache::new();
        assert!(cache.snapshot().is_empty());

        cache.replace(vec![VirtualRepository::from_key("a"), VirtualRepository::from_key("b")]);
        let before = cache.snapshot();
        cache.replace(vec![VirtualRepository::from_key("c")]);

        assert_eq!(keys(&cache), ["c"]);
        // Earlier snapshots are unaffected by later replacement.
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn concurrent_replacements_never_tear() {
        let cache = Arc::new(CatalogCache::new());
        let writers: Vec<_> = (0..4)
            .map(|n| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for _ in 0..100 {
                        let repos = (0..n + 1)
                            .map(|i| VirtualRepository::from_key(format!("w{n}-{i}")))
                            .collect();
                        cache.replace(repos);
                    }
                })
            })
            .collect();

        for _ in 0..100 {
            let snapshot = cache.snapshot();
            if let Some(first) = snapshot.first() {
                let writer = &first.key()[..2];
                assert!(snapshot.iter().all(|r| r.key().starts_with(writer)));
            }
        }
        for w in writers {
            w.join().unwrap();
        }
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("catalog.json");

        let cache = CatalogCache::with_repositories(vec![
            VirtualRepository::new("libs-release", Some("Releases".into())),
            VirtualRepository::from_key("libs-snapshot"),
        ]);
        cache.persist(&path).unwrap();

        let reloaded = CatalogCache::load(&path).unwrap();
        assert_eq!(keys(&reloaded), ["libs-release", "libs-snapshot"]);
        assert_eq!(reloaded.snapshot()[0].description(), Some("Releases"));
    }

    #[test]
    fn failed_persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the target path makes the final rename fail.
        let target = dir.path().join("catalog.json");
        fs::create_dir(&target).unwrap();

        let cache = CatalogCache::with_repositories(vec![VirtualRepository::from_key("libs-release")]);
        assert!(matches!(cache.persist(&target), Err(ReposError::Io(_))));

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(entries, [std::ffi::OsString::from("catalog.json")]);
    }

    #[test]
    fn missing_state_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CatalogCache::load(dir.path().join("absent.json")).unwrap();
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, b"not json").unwrap();
        assert!(matches!(CatalogCache::load(&path), Err(ReposError::Json(_))));
    }
}
