//! Transient artifact storage scoped to a single export.
//!
//! A [`Scratch`] is opened per invocation over some [`ArtifactStore`]. Every
//! artifact it writes is removed when the scope drops, whichever path the
//! export took out of it.

use crate::report::error::ArtifactCleanupWarning;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait ArtifactStore: Send + Sync {
    fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> io::Result<()>;

    fn read(&self, key: &ArtifactKey) -> io::Result<Vec<u8>>;

    fn remove(&self, key: &ArtifactKey) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<ArtifactKey, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<ArtifactKey, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| io::Error::other("memory artifact store poisoned"))
    }
}

impl ArtifactStore for MemoryStore {
    fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> io::Result<()> {
        self.lock()?.insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, key: &ArtifactKey) -> io::Result<Vec<u8>> {
        self.lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no artifact {key}")))
    }

    fn remove(&self, key: &ArtifactKey) -> io::Result<()> {
        match self.lock()?.remove(key) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no artifact {key}"),
            )),
        }
    }
}

/// Artifacts as files in one directory. `ephemeral()` owns a temp dir that is
/// deleted with the store.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    _owned: Option<tempfile::TempDir>,
}

impl DiskStore {
    pub fn in_dir(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, _owned: None })
    }

    pub fn ephemeral() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("gapup-").tempdir()?;
        Ok(Self {
            root: dir.path().to_path_buf(),
            _owned: Some(dir),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

impl ArtifactStore for DiskStore {
    fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(self.path_for(key), bytes)
    }

    fn read(&self, key: &ArtifactKey) -> io::Result<Vec<u8>> {
        std::fs::read(self.path_for(key))
    }

    fn remove(&self, key: &ArtifactKey) -> io::Result<()> {
        std::fs::remove_file(self.path_for(key))
    }
}

pub struct Scratch<'a> {
    store: &'a dyn ArtifactStore,
    scope: Uuid,
    seq: usize,
    held: Vec<ArtifactKey>,
}

impl<'a> Scratch<'a> {
    pub fn new(store: &'a dyn ArtifactStore) -> Self {
        Self {
            store,
            scope: Uuid::new_v4(),
            seq: 0,
            held: Vec::new(),
        }
    }

    /// Writes `bytes` under a key unique to this scope. The key is tracked
    /// before the write so a half-written artifact is still released.
    pub fn stash(&mut self, name: &str, bytes: &[u8]) -> io::Result<ArtifactKey> {
        self.seq += 1;
        let key = ArtifactKey(format!("{}-{}-{}", self.scope, self.seq, sanitize(name)));
        self.held.push(key.clone());
        self.store.put(&key, bytes)?;
        tracing::debug!(key = %key, bytes = bytes.len(), "stashed transient artifact");
        Ok(key)
    }

    pub fn load(&self, key: &ArtifactKey) -> io::Result<Vec<u8>> {
        self.store.read(key)
    }

    pub fn held(&self) -> usize {
        self.held.len()
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        for key in self.held.drain(..) {
            match self.store.remove(&key) {
                Ok(()) => {}
                // Never written (put failed before creating anything).
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    let warning = ArtifactCleanupWarning {
                        key: key.to_string(),
                        source,
                    };
                    tracing::warn!(error = %warning, "artifact cleanup failed");
                }
            }
        }
    }
}

fn sanitize(name: &str) -> String {
    let out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        "artifact".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn scratch_releases_memory_artifacts_on_drop() {
        let store = MemoryStore::new();
        {
            let mut scratch = Scratch::new(&store);
            let key = scratch.stash("Heatmap.png", b"abc").unwrap();
            scratch.stash("Candlestick Chart.png", b"def").unwrap();
            assert_eq!(scratch.load(&key).unwrap(), b"abc");
            assert_eq!(store.len(), 2);
            assert_eq!(scratch.held(), 2);
        }
        assert!(store.is_empty());
    }

    #[test]
    fn scratch_releases_disk_artifacts_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::in_dir(dir.path()).unwrap();
        {
            let mut scratch = Scratch::new(&store);
            scratch.stash("report.pdf", b"%PDF").unwrap();
            assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn ephemeral_disk_store_removes_its_root_on_drop() {
        let store = DiskStore::ephemeral().unwrap();
        let root = store.root().to_path_buf();
        {
            let mut scratch = Scratch::new(&store);
            let key = scratch.stash("Heatmap.png", b"png").unwrap();
            assert!(root.join(key.as_str()).is_file());
        }
        assert!(root.is_dir());
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);

        drop(store);
        assert!(!root.exists());
    }

    #[test]
    fn concurrent_scopes_do_not_collide() {
        let store = MemoryStore::new();
        let mut a = Scratch::new(&store);
        let mut b = Scratch::new(&store);
        let ka = a.stash("heatmap.png", b"a").unwrap();
        let kb = b.stash("heatmap.png", b"b").unwrap();
        assert_ne!(ka, kb);
        assert_eq!(a.load(&ka).unwrap(), b"a");
        assert_eq!(b.load(&kb).unwrap(), b"b");
        drop(a);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn keys_are_sanitized() {
        let store = MemoryStore::new();
        let mut scratch = Scratch::new(&store);
        let key = scratch.stash("../Candlestick Chart.png", b"x").unwrap();
        assert!(key.as_str().ends_with("-1-.._candlestick_chart.png"));
        assert!(!key.as_str().contains('/'));
    }

    struct StubbornStore {
        inner: MemoryStore,
        remove_calls: AtomicUsize,
    }

    impl ArtifactStore for StubbornStore {
        fn put(&self, key: &ArtifactKey, bytes: &[u8]) -> io::Result<()> {
            self.inner.put(key, bytes)
        }

        fn read(&self, key: &ArtifactKey) -> io::Result<Vec<u8>> {
            self.inner.read(key)
        }

        fn remove(&self, _key: &ArtifactKey) -> io::Result<()> {
            self.remove_calls.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[test]
    fn cleanup_failure_is_swallowed() {
        let store = StubbornStore {
            inner: MemoryStore::new(),
            remove_calls: AtomicUsize::new(0),
        };
        {
            let mut scratch = Scratch::new(&store);
            scratch.stash("a", b"1").unwrap();
            scratch.stash("b", b"2").unwrap();
        }
        assert_eq!(store.remove_calls.load(Ordering::SeqCst), 2);
    }
}
