//! memlog-store
//!
//! The content-addressable blob store. Bodies are
//! named by their SHA-256 digest and written once; two entries with
//! identical bodies share one file on disk.

use std::fs;
use std::path::{Path, PathBuf};

use memlog_core::MemlogError;
use memlog_crypto::hash::{hash, parse_hash};
use tracing::{debug, warn};

/// Aggregate stats over the content directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub file_count: u64,
    pub total_bytes: u64,
    pub oldest_mtime_secs: Option<i64>,
    pub newest_mtime_secs: Option<i64>,
}

/// The content-addressable store rooted at `<data_dir>/content/`.
pub struct ContentStore {
    content_dir: PathBuf,
}

impl ContentStore {
    /// Open (creating if necessary) the content directory under `data_dir`.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self, MemlogError> {
        let content_dir = data_dir.as_ref().join("content");
        fs::create_dir_all(&content_dir)?;
        Ok(Self { content_dir })
    }

    fn path_for(&self, hex_digest: &str) -> PathBuf {
        self.content_dir.join(hex_digest)
    }

    /// Store `body`, returning its tagged content hash
    /// (`"sha256:" + 64 hex`). Idempotent: an identical body already on
    /// disk is not rewritten.
    pub fn put(&self, body: &[u8]) -> Result<String, MemlogError> {
        let content_hash = hash(body);
        let (_, digest) = parse_hash(&content_hash).expect("hash() always produces a parseable tag");
        let hex_digest = hex::encode(digest);
        let path = self.path_for(&hex_digest);

        if path.exists() {
            debug!(hash = %content_hash, "content already present, skipping write");
            return Ok(content_hash);
        }

        fs::write(&path, body)?;
        set_readonly_mode(&path)?;
        debug!(hash = %content_hash, bytes = body.len(), "stored body");
        Ok(content_hash)
    }

    /// Fetch the body for `content_hash`. A missing file returns `Ok(None)`.
    /// When `verify` is set, the body is re-hashed and a mismatch
    /// is reported as `MemlogError::IntegrityError`.
    pub fn get(&self, content_hash: &str, verify: bool) -> Result<Option<Vec<u8>>, MemlogError> {
        let (_, digest) = parse_hash(content_hash).ok_or_else(|| MemlogError::Other(
            format!("malformed content hash: {content_hash}"),
        ))?;
        let hex_digest = hex::encode(digest);
        let path = self.path_for(&hex_digest);

        let body = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if verify {
            let actual = hash(&body);
            if actual != content_hash {
                warn!(expected = %content_hash, actual = %actual, "content integrity mismatch");
                return Err(MemlogError::IntegrityError {
                    expected: content_hash.to_string(),
                    actual,
                });
            }
        }

        Ok(Some(body))
    }

    /// Delete the body for `content_hash` if present. Idempotent.
    pub fn delete(&self, content_hash: &str) -> Result<(), MemlogError> {
        let (_, digest) = parse_hash(content_hash).ok_or_else(|| MemlogError::Other(
            format!("malformed content hash: {content_hash}"),
        ))?;
        let hex_digest = hex::encode(digest);
        let path = self.path_for(&hex_digest);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(hash = %content_hash, "deleted body");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// List all stored content hashes (tagged `"sha256:..."`, strictly
    /// 64-hex-named files only).
    pub fn list(&self) -> Result<Vec<String>, MemlogError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.content_dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if is_hex64(name) {
                    out.push(format!("sha256:{name}"));
                }
            }
        }
        out.sort();
        Ok(out)
    }

    /// Aggregate file count, total bytes, and mtime range.
    pub fn stats(&self) -> Result<StoreStats, MemlogError> {
        let mut stats = StoreStats::default();
        for entry in fs::read_dir(&self.content_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !is_hex64(name) {
                continue;
            }
            let meta = entry.metadata()?;
            stats.file_count += 1;
            stats.total_bytes += meta.len();
            if let Ok(modified) = meta.modified() {
                if let Ok(secs) = modified
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs() as i64)
                {
                    stats.oldest_mtime_secs =
                        Some(stats.oldest_mtime_secs.map_or(secs, |v| v.min(secs)));
                    stats.newest_mtime_secs =
                        Some(stats.newest_mtime_secs.map_or(secs, |v| v.max(secs)));
                }
            }
        }
        Ok(stats)
    }
}

fn is_hex64(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(unix)]
fn set_readonly_mode(path: &Path) -> Result<(), MemlogError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o644);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_readonly_mode(_path: &Path) -> Result<(), MemlogError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();
        let h = store.put(b"hello world").unwrap();
        let body = store.get(&h, true).unwrap().unwrap();
        assert_eq!(body, b"hello world");
    }

    #[test]
    fn put_is_idempotent_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();
        let h1 = store.put(b"same body").unwrap();
        let h2 = store.put(b"same body").unwrap();
        assert_eq!(h1, h2);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn get_missing_returns_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();
        let fake = memlog_crypto::hash::hash(b"never stored");
        assert!(store.get(&fake, true).unwrap().is_none());
    }

    #[test]
    fn tampered_body_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();
        let h = store.put(b"original").unwrap();
        let (_, digest) = parse_hash(&h).unwrap();
        let path = dir.path().join("content").join(hex::encode(digest));
        fs::write(&path, b"tampered").unwrap();

        let err = store.get(&h, true).unwrap_err();
        assert!(matches!(err, MemlogError::IntegrityError { .. }));
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();
        let h = store.put(b"to delete").unwrap();
        store.delete(&h).unwrap();
        store.delete(&h).unwrap();
        assert!(store.get(&h, true).unwrap().is_none());
    }

    #[test]
    fn stats_reports_count_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::open(dir.path()).unwrap();
        store.put(b"abc").unwrap();
        store.put(b"defgh").unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.file_count, 2);
        assert_eq!(stats.total_bytes, 8);
    }
}
