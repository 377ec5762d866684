use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// SHA-256 of a file's raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentFingerprint([u8; 32]);

impl ContentFingerprint {
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0_u8; 1024 * 1024];
        loop {
            let read = file.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexEntry {
    /// A worker owns this fingerprint and is writing it.
    Reserved,
    Path(PathBuf),
    PreExisting(PathBuf),
}

impl IndexEntry {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Reserved => None,
            Self::Path(path) | Self::PreExisting(path) => Some(path),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub indexed: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

/// Fingerprint to location map shared by every download worker.
///
/// Each method takes the lock for a single map operation and releases it
/// before returning; callers never hold it across I/O.
#[derive(Debug, Default)]
pub struct ContentIndex {
    entries: Mutex<HashMap<ContentFingerprint, IndexEntry>>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ContentFingerprint, IndexEntry>> {
        // Every critical section is a single map call, so a poisoned map is
        // still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hashes every regular file under `base` and records it as pre-existing.
    /// Unreadable files are logged and left out of the index.
    pub fn scan_seed(base: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(base)?;
        let index = Self::new();

        let hashed = WalkDir::new(base)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    let path = entry.into_path();
                    let fingerprint = ContentFingerprint::of_file(&path);
                    Some((path, fingerprint))
                }
                Ok(_) => None,
                Err(err) => {
                    let path = err.path().unwrap_or(base).to_path_buf();
                    Some((path, Err(io::Error::from(err))))
                }
            });
        let stats = index.seed_from_entries(hashed);

        tracing::info!(
            "hash index built from {}: indexed={} skipped={}",
            base.display(),
            stats.indexed,
            stats.skipped
        );
        Ok(index)
    }

    /// Seeds from already-hashed files. Failed entries are logged and counted
    /// as skipped; the rest are still indexed.
    pub fn seed_from_entries<I>(&self, entries: I) -> SeedStats
    where
        I: IntoIterator<Item = (PathBuf, io::Result<ContentFingerprint>)>,
    {
        let mut stats = SeedStats::default();
        for (path, fingerprint) in entries {
            match fingerprint {
                Ok(fingerprint) => {
                    if self.seed(fingerprint, path) {
                        stats.indexed += 1;
                    } else {
                        stats.duplicates += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!("error hashing {}: {}", path.display(), err);
                    stats.skipped += 1;
                }
            }
        }
        stats
    }

    /// Inserts a pre-existing entry unless the fingerprint is already known.
    pub fn seed(&self, fingerprint: ContentFingerprint, path: PathBuf) -> bool {
        let mut entries = self.entries();
        if entries.contains_key(&fingerprint) {
            return false;
        }
        entries.insert(fingerprint, IndexEntry::PreExisting(path));
        true
    }

    /// Claims the right to write `fingerprint`. Returns `false` when any
    /// entry (reserved, written or pre-existing) already exists.
    pub fn try_reserve(&self, fingerprint: &ContentFingerprint) -> bool {
        let mut entries = self.entries();
        if entries.contains_key(fingerprint) {
            return false;
        }
        entries.insert(*fingerprint, IndexEntry::Reserved);
        true
    }

    /// Records where a reserved fingerprint was written.
    pub fn finalize(&self, fingerprint: &ContentFingerprint, path: PathBuf) {
        let current = {
            let mut entries = self.entries();
            match entries.get_mut(fingerprint) {
                Some(entry) if *entry == IndexEntry::Reserved => {
                    *entry = IndexEntry::Path(path);
                    return;
                }
                other => other.cloned(),
            }
        };
        tracing::warn!(
            "finalize ignored for unreserved fingerprint {} (current={:?})",
            fingerprint.short(),
            current
        );
    }

    pub fn lookup(&self, fingerprint: &ContentFingerprint) -> Option<IndexEntry> {
        self.entries().get(fingerprint).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("channel-sync-index-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn fingerprint_matches_known_sha256() {
        let fingerprint = ContentFingerprint::of(b"abc");
        assert_eq!(
            fingerprint.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fingerprint.short(), "ba7816bf");
    }

    #[test]
    fn reserve_then_finalize() {
        let index = ContentIndex::new();
        let fingerprint = ContentFingerprint::of(b"x");

        assert!(index.try_reserve(&fingerprint));
        assert_eq!(index.lookup(&fingerprint), Some(IndexEntry::Reserved));
        assert!(!index.try_reserve(&fingerprint));

        index.finalize(&fingerprint, PathBuf::from("/tmp/x.bin"));
        assert_eq!(
            index.lookup(&fingerprint),
            Some(IndexEntry::Path(PathBuf::from("/tmp/x.bin")))
        );
        assert!(!index.try_reserve(&fingerprint));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn finalize_without_reservation_changes_nothing() {
        let index = ContentIndex::new();
        let fingerprint = ContentFingerprint::of(b"seeded");
        index.seed(fingerprint, PathBuf::from("/old/seeded.bin"));

        index.finalize(&fingerprint, PathBuf::from("/new/seeded.bin"));
        assert_eq!(
            index.lookup(&fingerprint),
            Some(IndexEntry::PreExisting(PathBuf::from("/old/seeded.bin")))
        );

        let unknown = ContentFingerprint::of(b"unknown");
        index.finalize(&unknown, PathBuf::from("/new/unknown.bin"));
        assert!(index.lookup(&unknown).is_none());
    }

    #[test]
    fn concurrent_reservations_have_one_winner() {
        let index = Arc::new(ContentIndex::new());
        let fingerprint = ContentFingerprint::of(b"contended");
        let barrier = Arc::new(std::sync::Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let index = index.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    index.try_reserve(&fingerprint)
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().expect("join reserve thread"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn scan_seed_indexes_nested_files_and_keeps_first_duplicate() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.join("2024-01")).expect("create bucket");
        std::fs::write(dir.join("2024-01").join("a.jpg"), b"alpha").expect("write a");
        std::fs::write(dir.join("b.jpg"), b"beta").expect("write b");
        std::fs::write(dir.join("copy-of-b.jpg"), b"beta").expect("write b copy");

        let index = ContentIndex::scan_seed(&dir).expect("scan");
        assert_eq!(index.len(), 2);

        let alpha = index
            .lookup(&ContentFingerprint::of(b"alpha"))
            .expect("alpha indexed");
        assert_eq!(
            alpha,
            IndexEntry::PreExisting(dir.join("2024-01").join("a.jpg"))
        );
        assert!(matches!(
            index.lookup(&ContentFingerprint::of(b"beta")),
            Some(IndexEntry::PreExisting(_))
        ));
        assert!(!index.try_reserve(&ContentFingerprint::of(b"beta")));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_entries_are_skipped_and_the_rest_indexed() {
        let index = ContentIndex::new();
        let entries = vec![
            (PathBuf::from("/photos/a.jpg"), Ok(ContentFingerprint::of(b"a"))),
            (
                PathBuf::from("/photos/locked.jpg"),
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            ),
            (PathBuf::from("/photos/a-copy.jpg"), Ok(ContentFingerprint::of(b"a"))),
            (PathBuf::from("/photos/b.jpg"), Ok(ContentFingerprint::of(b"b"))),
        ];

        let stats = index.seed_from_entries(entries);
        assert_eq!(
            stats,
            SeedStats {
                indexed: 2,
                duplicates: 1,
                skipped: 1,
            }
        );
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.lookup(&ContentFingerprint::of(b"a")),
            Some(IndexEntry::PreExisting(PathBuf::from("/photos/a.jpg")))
        );
        assert!(index.lookup(&ContentFingerprint::of(b"b")).is_some());
    }

    #[test]
    fn scan_seed_creates_missing_base() {
        let dir = std::env::temp_dir().join(format!("channel-sync-missing-{}", Uuid::new_v4()));
        let index = ContentIndex::scan_seed(&dir).expect("scan missing dir");
        assert!(index.is_empty());
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
