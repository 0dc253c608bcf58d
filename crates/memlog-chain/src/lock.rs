use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::Duration;

use fs2::FileExt;
use memlog_core::constants::{LOCK_BACKOFF_MAX_MS, LOCK_BACKOFF_MIN_MS, LOCK_MAX_RETRIES};
use memlog_core::MemlogError;
use rand::Rng;

/// An exclusive, OS-backed lock on `chain.jsonl`, held for the duration of
/// one append so two writers never interleave. Acquisition retries with
/// jittered exponential backoff; release is guaranteed by `Drop` so a
/// panic mid-append never leaves the journal locked.
pub struct ChainLock {
    file: File,
}

impl ChainLock {
    /// Open `path` (creating it if necessary) and acquire an exclusive
    /// lock, retrying up to `LOCK_MAX_RETRIES` times with backoff from
    /// `LOCK_BACKOFF_MIN_MS` to `LOCK_BACKOFF_MAX_MS`.
    pub fn acquire(path: &Path) -> Result<Self, MemlogError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;

        let mut delay_ms = LOCK_BACKOFF_MIN_MS;
        for attempt in 0..LOCK_MAX_RETRIES {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(_) if attempt + 1 < LOCK_MAX_RETRIES => {
                    let jitter = rand::thread_rng().gen_range(0..=(delay_ms / 4 + 1));
                    std::thread::sleep(Duration::from_millis(delay_ms + jitter));
                    delay_ms = (delay_ms * 2).min(LOCK_BACKOFF_MAX_MS);
                }
                Err(_) => break,
            }
        }

        Err(MemlogError::LockTimeout {
            path: path.display().to_string(),
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for ChainLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_released_on_drop_allows_reacquisition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.jsonl");
        {
            let _lock = ChainLock::acquire(&path).unwrap();
        }
        let _lock2 = ChainLock::acquire(&path).unwrap();
    }
}
