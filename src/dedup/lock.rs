use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use crate::core::error::{Error, ErrorKind, Result};

/// Advisory single-writer lock held next to the duplicate log
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Take an exclusive, non-blocking lock on `<log>.lock`
    pub fn acquire(log_path: &Path) -> Result<Self> {
        let mut lock_path = log_path.as_os_str().to_owned();
        lock_path.push(".lock");
        let path = PathBuf::from(lock_path);

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_EX, LOCK_NB};

            let fd = file.as_raw_fd();
            unsafe {
                if flock(fd, LOCK_EX | LOCK_NB) != 0 {
                    return Err(Error::new(ErrorKind::InvalidState,
                                          format!("duplicate log {} is locked by another writer", log_path.display())));
                }
            }
        }

        Ok(FileLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            use libc::{flock, LOCK_UN};

            let fd = self.file.as_raw_fd();
            unsafe {
                flock(fd, LOCK_UN);
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn second_writer_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("records.log");

        let first = FileLock::acquire(&log).unwrap();
        let err = FileLock::acquire(&log).err().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidState);

        drop(first);
        assert!(FileLock::acquire(&log).is_ok());
    }
}
