//! The cross-process allocation lock.
//!
//! Both allocators take the same exclusive advisory lock on a single lock file before reading
//! any allocation state, and hold it until their write has completed. Only the lock state of the
//! file matters, its contents are never read.
use crate::error::Error;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// An acquired allocation lock. The lock is released when the guard is dropped.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct AllocationLock {
    file: File,
    path: PathBuf,
}

impl AllocationLock {
    /// Block until the exclusive lock on `path` is held, creating the file and its parent
    /// directories if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lock`] if the lock file can't be created or locked.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let lock_err = |source| Error::Lock {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(lock_err)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(lock_err)?;

        tracing::debug!("waiting for allocation lock {}", path.display());
        FileExt::lock_exclusive(&file).map_err(lock_err)?;
        tracing::debug!("holding allocation lock {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AllocationLock {
    fn drop(&mut self) {
        // Closing the file releases the lock as well, unlocking first just makes it explicit.
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to unlock {}: {err}", self.path.display());
        } else {
            tracing::debug!("released allocation lock {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn is_locked(path: &Path) -> bool {
        let probe = File::open(path).unwrap();
        match FileExt::try_lock_exclusive(&probe) {
            Ok(()) => {
                FileExt::unlock(&probe).unwrap();
                false
            }
            Err(_) => true,
        }
    }

    #[test]
    fn creates_lock_file_and_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run/.ip-alloc.lock");

        let lock = AllocationLock::acquire(&path).unwrap();
        assert!(path.is_file());
        assert_eq!(lock.path(), path);
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ip-alloc.lock");

        let lock = AllocationLock::acquire(&path).unwrap();
        assert!(is_locked(&path));
        drop(lock);
        assert!(!is_locked(&path));
    }

    #[test]
    fn second_acquire_waits_for_the_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ip-alloc.lock");
        let first = AllocationLock::acquire(&path).unwrap();

        let (tx, rx) = mpsc::channel();
        let contender_path = path.clone();
        let contender = thread::spawn(move || {
            let _second = AllocationLock::acquire(&contender_path).unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
        drop(first);
        rx.recv_timeout(Duration::from_secs(10)).unwrap();
        contender.join().unwrap();
    }
}
