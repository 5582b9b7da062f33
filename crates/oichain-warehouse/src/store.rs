use crate::config::Symbol;
use anyhow::Result;
use oichain_util::write_atomic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// One JSON document per symbol, in a single directory.
///
/// Documents are only ever replaced whole (see [`write_atomic`]), so a reader running alongside
/// the polling loop sees the previous snapshot or the new one, never half of each. Every
/// publish through this handle bumps a version counter, which readers in the same process can
/// compare to tell whether anything changed since they last looked.
#[derive(Debug)]
pub struct SnapshotStore {
    dir: PathBuf,
    version: AtomicU64,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            version: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, symbol: &Symbol) -> PathBuf {
        self.dir.join(symbol.file_name())
    }

    /// Last version published through this handle; `0` before the first publish.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Replace `symbol`'s document with `body`, verbatim. Returns the new version.
    pub async fn publish(&self, symbol: &Symbol, body: &[u8]) -> Result<u64> {
        let path = self.path_for(symbol);
        write_atomic(&path, body).await?;
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("[{symbol}] snapshot v{version} saved to {}", path.display());
        Ok(version)
    }

    /// The stored bytes of `symbol`, or `None` if nothing has been saved for it yet.
    pub async fn read_raw(&self, symbol: &Symbol) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(symbol);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!("[{symbol}] no snapshot at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the store directory and everything in it.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
