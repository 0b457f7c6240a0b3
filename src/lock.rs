//! Single-instance lock.
//!
//! The running instance holds an exclusive `flock(2)` on a per-user file and
//! writes its PID into it.  A second invocation that fails to take the lock
//! can read that PID to signal the owner.
//!
//! # File format
//!
//! The file holds the owner's PID in decimal followed by a newline, e.g.
//! `12345\n`.  External tooling may read it directly, so the format is
//! fixed.
//!
//! Liveness is decided by the kernel's lock table, not by the file's
//! existence: a file left behind by a crashed process is not locked and is
//! simply taken over.

use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// File name of the lock in the user's home directory.
pub const LOCK_FILE_NAME: &str = ".bgcycle.pid";

/// Errors from taking the instance lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another process holds the lock.  `pid` is whatever that process
    /// last wrote to the file, if it could be read.
    #[error("{} is locked by {}", path.display(), describe_pid(*pid))]
    AlreadyLocked { path: PathBuf, pid: Option<u32> },
    /// The lock file could not be opened or written.
    #[error("lock file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn describe_pid(pid: Option<u32>) -> String {
    match pid {
        Some(pid) => format!("process {}", pid),
        None => "an unknown process".into(),
    }
}

/// Exclusive, non-blocking, file-based lock shared across invocations.
///
/// Holding the lock means holding the open file handle; closing it (or
/// process exit) releases the kernel lock.  Dropping a held
/// `InstanceLock` releases it and removes the file.
#[derive(Debug)]
pub struct InstanceLock {
    path: PathBuf,
    /// `Some` while the lock is held.
    file: Option<File>,
}

impl InstanceLock {
    /// An unlocked handle for the lock file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    /// `$HOME/.bgcycle.pid`, falling back to `/tmp` without a home.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(LOCK_FILE_NAME)
    }

    /// The lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Try to take the lock without blocking.
    ///
    /// On success the file is truncated and the calling process's PID is
    /// written into it.  Calling this on a held lock is a no-op.
    pub fn try_acquire(&mut self) -> Result<(), LockError> {
        if self.is_held() {
            return Ok(());
        }

        let io_err = |source| LockError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o644)
            .open(&self.path)
            .map_err(io_err)?;

        if !try_flock_exclusive(&file).map_err(io_err)? {
            return Err(LockError::AlreadyLocked {
                path: self.path.clone(),
                pid: Self::read_owner_pid(&self.path),
            });
        }

        let pid = std::process::id();
        file.set_len(0).map_err(io_err)?;
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        writeln!(file, "{}", pid).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        debug!("locked {} as pid {}", self.path.display(), pid);
        self.file = Some(file);
        Ok(())
    }

    /// Remove the lock file, then close the handle.
    ///
    /// Idempotent.  Does nothing when the lock is not held, so it never
    /// removes a file owned by another process.
    ///
    /// The file is unlinked while still locked, so a starting instance that
    /// opens the path meanwhile sees `AlreadyLocked` rather than locking an
    /// orphaned inode.  Known race: a process that opened the old file
    /// before the unlink and calls `flock` after the close still locks the
    /// orphan.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                debug!("could not remove {}: {}", self.path.display(), e);
            }
            drop(file);
            debug!("released {}", self.path.display());
        }
    }

    /// PID last written to this lock's file.
    pub fn owner_pid(&self) -> Option<u32> {
        Self::read_owner_pid(&self.path)
    }

    /// PID last written to the lock file at `path`.
    ///
    /// Reading takes no lock, so this works while another process holds it.
    /// Returns `None` if the file is missing or does not hold a number.
    pub fn read_owner_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path).ok()?.trim().parse().ok()
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// `flock(LOCK_EX | LOCK_NB)`.
///
/// Returns `Ok(false)` if another open file description holds the lock.
fn try_flock_exclusive(file: &File) -> io::Result<bool> {
    // SAFETY: `file` owns a valid descriptor for the duration of the call.
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return Ok(false);
    }
    Err(err)
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Monotonic counter to generate unique lock paths per test.
    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_lock_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("bgcycle-lock-test-{}-{}.pid", std::process::id(), id))
    }

    #[test]
    fn acquire_writes_own_pid() {
        let path = tmp_lock_path();
        let mut lock = InstanceLock::new(&path);
        lock.try_acquire().unwrap();
        assert!(lock.is_held());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{}\n", std::process::id()));
        assert_eq!(lock.owner_pid(), Some(std::process::id()));
    }

    #[test]
    fn second_acquire_reports_first_owner() {
        let path = tmp_lock_path();
        let mut first = InstanceLock::new(&path);
        first.try_acquire().unwrap();

        let mut second = InstanceLock::new(&path);
        match second.try_acquire() {
            Err(LockError::AlreadyLocked { pid, .. }) => assert_eq!(pid, Some(std::process::id())),
            other => panic!("expected AlreadyLocked, got {:?}", other),
        }
        assert!(!second.is_held());
        // The failed attempt must not disturb the holder's file.
        assert!(path.exists());
    }

    #[test]
    fn release_allows_reacquire() {
        let path = tmp_lock_path();
        let mut first = InstanceLock::new(&path);
        first.try_acquire().unwrap();
        first.release();
        assert!(!path.exists());

        let mut second = InstanceLock::new(&path);
        second.try_acquire().unwrap();
        assert!(second.is_held());
    }

    #[test]
    fn release_unlinks_while_still_locked() {
        use std::os::unix::fs::MetadataExt;

        let path = tmp_lock_path();
        let mut lock = InstanceLock::new(&path);
        lock.try_acquire().unwrap();
        assert_eq!(lock.path(), path.as_path());
        // A starter that opened the file before the release.
        let early = File::open(&path).unwrap();
        let old_inode = early.metadata().unwrap().ino();

        lock.release();
        assert!(!path.exists());

        // The next owner gets a fresh file, not the orphaned one.
        let mut next = InstanceLock::new(&path);
        next.try_acquire().unwrap();
        assert_ne!(std::fs::metadata(&path).unwrap().ino(), old_inode);
    }

    #[test]
    fn release_is_idempotent() {
        let path = tmp_lock_path();
        let mut lock = InstanceLock::new(&path);
        lock.release();
        lock.try_acquire().unwrap();
        lock.release();
        lock.release();
        assert!(!lock.is_held());
    }

    #[test]
    fn unheld_release_keeps_foreign_file() {
        let path = tmp_lock_path();
        let mut owner = InstanceLock::new(&path);
        owner.try_acquire().unwrap();
        let mut other = InstanceLock::new(&path);
        other.release();
        assert!(path.exists());
    }

    #[test]
    fn stale_file_is_taken_over() {
        let path = tmp_lock_path();
        std::fs::write(&path, "999999\n").unwrap();
        let mut lock = InstanceLock::new(&path);
        lock.try_acquire().unwrap();
        assert_eq!(lock.owner_pid(), Some(std::process::id()));
    }

    #[test]
    fn drop_releases() {
        let path = tmp_lock_path();
        {
            let mut lock = InstanceLock::new(&path);
            lock.try_acquire().unwrap();
        }
        assert!(!path.exists());
        InstanceLock::new(&path).try_acquire().unwrap();
    }

    #[test]
    fn owner_pid_of_missing_or_garbage_file() {
        let path = tmp_lock_path();
        assert_eq!(InstanceLock::read_owner_pid(&path), None);
        std::fs::write(&path, "not a pid").unwrap();
        assert_eq!(InstanceLock::read_owner_pid(&path), None);
        let _ = std::fs::remove_file(&path);
    }
}
