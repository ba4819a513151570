//! Content-addressed store for mode-solve results.
//!
//! Every solve is keyed by a 128-bit hash of the canonical JSON of
//! everything that determines its result. Entries carry that JSON too, and
//! a lookup only counts as a hit when it matches exactly, so a hash
//! collision or a hasher change costs a re-solve and never a wrong result.
//! [`DiskCache`] persists entries as one JSON file per key, written
//! to a temporary file and renamed into place so concurrent writers of the
//! same key never leave a torn file. [`MemoryCache`] keeps entries for the
//! lifetime of the process.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::hash::Hasher;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use log::warn;
use num_complex::Complex64;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialisation error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

/// 32-hex-digit content hash identifying one solve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Canonical JSON form of `inputs`. Maps must be ordered (`BTreeMap`)
    /// for the encoding to be canonical.
    pub fn canonical<T: Serialize + ?Sized>(inputs: &T) -> Result<String, CacheError> {
        Ok(serde_json::to_string(inputs)?)
    }

    /// Key of an already canonical encoding.
    pub fn from_canonical(json: &str) -> Self {
        let hi = lane_hash(0, json.as_bytes());
        let lo = lane_hash(1, json.as_bytes());
        Self(format!("{hi:016x}{lo:016x}"))
    }

    pub fn from_inputs<T: Serialize + ?Sized>(inputs: &T) -> Result<Self, CacheError> {
        Ok(Self::from_canonical(&Self::canonical(inputs)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name under which a mesh for this solve is stored.
    pub fn mesh_filename(&self) -> String {
        format!("{}.msh", self.0)
    }
}

fn lane_hash(lane: u8, bytes: &[u8]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u8(lane);
    hasher.write_usize(bytes.len());
    hasher.write(bytes);
    hasher.finish()
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored solve result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Canonical inputs the entry was solved for.
    pub inputs: String,
    pub neffs: Vec<Complex64>,
    /// Method name of the solver that produced the entry.
    pub solver: String,
    pub mesh_filename: String,
}

pub trait ModeCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;
    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError>;
    fn describe(&self) -> String;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open (creating if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Number of entries on disk.
    pub fn len(&self) -> Result<usize, CacheError> {
        let mut n = 0;
        for entry in fs::read_dir(&self.dir)? {
            if entry?.path().extension().is_some_and(|e| e == "json") {
                n += 1;
            }
        }
        Ok(n)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}

impl ModeCache for DiskCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(key);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // Treated as a miss; the next put replaces the file.
                warn!("Ignoring unreadable cache entry {}: {e}", path.display());
                Ok(None)
            }
        }
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let tmp = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, entry)?;
            writer.flush()?;
        }
        tmp.persist(self.entry_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("disk cache at {}", self.dir.display())
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        let map = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(map.len())
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}

impl ModeCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let map = self.entries.read().map_err(|_| CacheError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut map = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        map.insert(key.clone(), entry.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory cache".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entry() -> CacheEntry {
        CacheEntry {
            inputs: r#"{"width":0.5}"#.into(),
            neffs: vec![Complex64::new(2.45, 1e-5), Complex64::new(1.8, 0.0)],
            solver: "test".into(),
            mesh_filename: "x.msh".into(),
        }
    }

    #[test]
    fn test_key_is_stable_and_sensitive() {
        let mut a = BTreeMap::new();
        a.insert("width", 0.5);
        a.insert("wavelength", 1.55);
        let k1 = CacheKey::from_inputs(&a).unwrap();
        let k2 = CacheKey::from_inputs(&a).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(k1.as_str().len(), 32);
        assert_eq!(k1, CacheKey::from_canonical(&CacheKey::canonical(&a).unwrap()));
        assert!(k1.mesh_filename().ends_with(".msh"));

        a.insert("width", 0.5000001);
        assert_ne!(CacheKey::from_inputs(&a).unwrap(), k1);
    }

    #[test]
    fn test_disk_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path().join("modes")).unwrap();
        let key = CacheKey::from_inputs(&("a", 1)).unwrap();
        assert!(cache.get(&key).unwrap().is_none());

        cache.put(&key, &entry()).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(entry()));
        assert_eq!(cache.len().unwrap(), 1);

        // Overwrite in place.
        let mut e = entry();
        e.neffs.pop();
        cache.put(&key, &e).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(e));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_disk_cache_ignores_corrupt_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let key = CacheKey::from_inputs(&"corrupt").unwrap();
        fs::write(cache.entry_path(&key), "{not json").unwrap();
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        let key = CacheKey::from_inputs(&1.0).unwrap();
        assert!(cache.is_empty().unwrap());
        cache.put(&key, &entry()).unwrap();
        assert_eq!(cache.get(&key).unwrap(), Some(entry()));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_memory_cache_reports_poisoned_lock() {
        let cache = std::sync::Arc::new(MemoryCache::new());
        cache.put(&CacheKey::from_inputs(&1.0).unwrap(), &entry()).unwrap();
        let poisoner = cache.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(matches!(cache.len(), Err(CacheError::Poisoned)));
        assert!(matches!(cache.is_empty(), Err(CacheError::Poisoned)));
        assert!(matches!(
            cache.get(&CacheKey::from_inputs(&1.0).unwrap()),
            Err(CacheError::Poisoned)
        ));
    }

    #[test]
    fn test_wide_keys_differ_in_both_halves() {
        let a = CacheKey::from_inputs(&("strip", 0.5)).unwrap();
        let b = CacheKey::from_inputs(&("strip", 0.6)).unwrap();
        assert_ne!(&a.as_str()[..16], &b.as_str()[..16]);
        assert_ne!(&a.as_str()[16..], &b.as_str()[16..]);
        assert_ne!(&a.as_str()[..16], &a.as_str()[16..]);
    }
}
