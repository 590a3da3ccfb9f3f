//! # Bind Record Storage
//!
//! Non-volatile home of the 25-byte [`BindInfo`] record.
//!
//! The record is read once at startup and written only when a handshake
//! completes or the binding is explicitly forgotten. Writes replace the whole
//! record.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, RxError};
use crate::protocol::BindInfo;

/// Persistent storage for the bind record
#[cfg_attr(test, mockall::automock)]
pub trait BindStore {
    /// Read the stored record; a store that was never written reads as unbound
    fn load(&mut self) -> Result<BindInfo>;

    /// Replace the stored record
    fn store(&mut self, info: &BindInfo) -> Result<()>;
}

/// Bind record kept in a file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BindStore for FileStore {
    fn load(&mut self) -> Result<BindInfo> {
        match fs::read(&self.path) {
            Ok(record) => BindInfo::from_bytes(&record),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No bind record at {}, starting unbound", self.path.display());
                Ok(BindInfo::unbound())
            }
            Err(e) => Err(RxError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn store(&mut self, info: &BindInfo) -> Result<()> {
        // Write beside the target, then rename over it
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, info.to_bytes())
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                RxError::Storage(format!("Failed to write {}: {}", self.path.display(), e))
            })?;

        debug!("Bind record written to {}", self.path.display());
        Ok(())
    }
}

/// Bind record held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: Option<BindInfo>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with `info`
    pub fn with_record(info: BindInfo) -> Self {
        Self {
            record: Some(info),
            writes: 0,
        }
    }

    #[must_use]
    pub fn record(&self) -> Option<&BindInfo> {
        self.record.as_ref()
    }

    /// Number of `store` calls so far
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl BindStore for MemoryStore {
    fn load(&mut self) -> Result<BindInfo> {
        Ok(self.record.unwrap_or_else(BindInfo::unbound))
    }

    fn store(&mut self, info: &BindInfo) -> Result<()> {
        self.record = Some(*info);
        self.writes += 1;
        Ok(())
    }
}
