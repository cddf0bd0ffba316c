// Directory-backed key-value store: one `<key>.json` file per key

use crate::kv::{KvStore, validate_key};
use eyre::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileKv {
    base_path: PathBuf,
}

impl FileKv {
    /// Open or create a store rooted at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    /// Exclusive lock serializing writers of `key`; released on drop
    fn lock_key(&self, key: &str) -> Result<File> {
        let lock_path = self.base_path.join(format!("{}.lock", key));
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .wrap_err_with(|| format!("Failed to open {}", lock_path.display()))?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;
        Ok(lock)
    }

    /// Flush the directory entry so a completed rename survives a crash
    fn sync_dir(&self) -> Result<()> {
        #[cfg(unix)]
        File::open(&self.base_path)
            .and_then(|dir| dir.sync_all())
            .wrap_err_with(|| format!("Failed to sync {}", self.base_path.display()))?;
        Ok(())
    }
}

impl KvStore for FileKv {
    // Writers replace the file with a rename, so readers see the old or the
    // new value and never a partial one.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp_path = self.base_path.join(format!("{}.json.tmp", key));
        let _lock = self.lock_key(key)?;

        let mut tmp = File::create(&tmp_path)
            .wrap_err_with(|| format!("Failed to create {}", tmp_path.display()))?;
        tmp.write_all(value)?;
        tmp.sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &path)
            .wrap_err_with(|| format!("Failed to replace {}", path.display()))?;
        self.sync_dir()?;

        debug!(key, bytes = value.len(), "file_kv: wrote key");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        let _lock = self.lock_key(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                self.sync_dir()?;
                debug!(key, "file_kv: removed key");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).wrap_err_with(|| format!("Failed to remove {}", path.display())),
        }
    }
}
