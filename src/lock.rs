//! Advisory file locking and the raw file operations behind each data file
//!
//! Stores never hold a lock across calls:
//! - A read opens the file, takes a shared lock, reads everything, and drops it
//! - A commit opens the file, takes an exclusive lock, writes, and drops it
//! - Locks are released when the [`LockedFile`] is dropped, on every exit path
//!
//! Locking is advisory (fs2/flock) and only taken when [`LockPolicy::enabled`]
//! is set.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::error::{Error, Result};

/// Default lock timeout in milliseconds
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Default retry interval when waiting for a lock
const LOCK_RETRY_INTERVAL_MS: u64 = 50;

fn is_lock_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }

    // On Windows, fs2/libc can surface lock/sharing violations as "Other".
    // Treat them as contention so callers get Err(LockFailed) after timeout.
    #[cfg(windows)]
    {
        matches!(err.raw_os_error(), Some(32) | Some(33))
    }
    #[cfg(not(windows))]
    {
        false
    }
}

/// Whether and how long to wait for advisory locks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl LockPolicy {
    /// Never lock
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Lock, waiting at most `timeout_ms` for contention to clear
    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            enabled: true,
            timeout_ms,
        }
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_LOCK_TIMEOUT_MS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockMode {
    Shared,
    Exclusive,
}

/// An open data file, holding an advisory lock until dropped
#[derive(Debug)]
pub struct LockedFile {
    file: File,
    path: PathBuf,
    locked: bool,
}

impl LockedFile {
    /// Open an existing file for reading under a shared lock
    ///
    /// Returns `Ok(None)` when the file does not exist yet.
    pub fn open_read(path: impl AsRef<Path>, policy: LockPolicy) -> Result<Option<Self>> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(Error::Unavailable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::lock(file, path, policy, LockMode::Shared).map(Some)
    }

    /// Open (creating if needed) a file for appending under an exclusive lock
    pub fn open_append(path: impl AsRef<Path>, policy: LockPolicy) -> Result<Self> {
        let path = path.as_ref();
        let file = open_with(path, OpenOptions::new().create(true).append(true))?;
        Self::lock(file, path, policy, LockMode::Exclusive)
    }

    /// Open (creating if needed) a file for rewriting under an exclusive lock
    ///
    /// The file is not truncated until [`LockedFile::truncate`] is called, so a
    /// failed lock never destroys content.
    pub fn open_rewrite(path: impl AsRef<Path>, policy: LockPolicy) -> Result<Self> {
        let path = path.as_ref();
        let file = open_with(
            path,
            OpenOptions::new().create(true).write(true).truncate(false),
        )?;
        Self::lock(file, path, policy, LockMode::Exclusive)
    }

    fn lock(file: File, path: &Path, policy: LockPolicy, mode: LockMode) -> Result<Self> {
        if !policy.enabled {
            return Ok(LockedFile {
                file,
                path: path.to_path_buf(),
                locked: false,
            });
        }

        let start = Instant::now();
        let timeout = Duration::from_millis(policy.timeout_ms);
        let retry_interval = Duration::from_millis(LOCK_RETRY_INTERVAL_MS);

        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            match attempt {
                Ok(()) => {
                    return Ok(LockedFile {
                        file,
                        path: path.to_path_buf(),
                        locked: true,
                    });
                }
                Err(e) if is_lock_contended(&e) => {
                    if start.elapsed() >= timeout {
                        return Err(Error::LockFailed(path.to_path_buf()));
                    }
                    std::thread::sleep(retry_interval);
                }
                Err(source) => {
                    return Err(Error::Unavailable {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }

    /// Read the whole file as text
    pub fn read_all(&mut self) -> Result<String> {
        let mut contents = String::new();
        self.file
            .read_to_string(&mut contents)
            .map_err(|source| self.unavailable(source))?;
        Ok(contents)
    }

    /// Write one line, adding the terminating newline
    pub fn append_line(&mut self, line: &str) -> Result<()> {
        let mut buffer = String::with_capacity(line.len() + 1);
        buffer.push_str(line);
        buffer.push('\n');
        self.file
            .write_all(buffer.as_bytes())
            .map_err(|source| self.unavailable(source))
    }

    /// Drop all content and rewind to the start
    pub fn truncate(&mut self) -> Result<()> {
        self.file
            .set_len(0)
            .and_then(|()| self.file.seek(SeekFrom::Start(0)).map(|_| ()))
            .map_err(|source| self.unavailable(source))
    }

    /// Current size of the file in bytes
    pub fn byte_len(&self) -> Result<u64> {
        self.file
            .metadata()
            .map(|metadata| metadata.len())
            .map_err(|source| self.unavailable(source))
    }

    /// Cut the file back to `len` bytes, dropping anything written after it
    pub fn truncate_to(&mut self, len: u64) -> Result<()> {
        self.file
            .set_len(len)
            .map_err(|source| self.unavailable(source))
    }

    /// Flush written data to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all().map_err(|source| self.unavailable(source))
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, source: io::Error) -> Error {
        Error::Unavailable {
            path: self.path.clone(),
            source,
        }
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if self.locked {
            // Unlock the file - ignore errors during drop
            let _ = FileExt::unlock(&self.file);
        }
    }
}

fn open_with(path: &Path, options: &OpenOptions) -> Result<File> {
    options.open(path).map_err(|source| Error::Unavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Whether the file exists and can be opened for reading
pub fn is_readable(path: impl AsRef<Path>) -> bool {
    File::open(path.as_ref()).is_ok()
}

/// Whether the file (or, if it does not exist yet, its directory) is writable
pub fn is_writable(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(metadata) => !metadata.permissions().readonly(),
        Err(_) => path
            .parent()
            .map(|parent| if parent.as_os_str().is_empty() { Path::new(".") } else { parent })
            .and_then(|parent| fs::metadata(parent).ok())
            .map(|metadata| metadata.is_dir() && !metadata.permissions().readonly())
            .unwrap_or(false),
    }
}
