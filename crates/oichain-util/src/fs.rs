use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{error, trace, warn};

/// Replace the file at `path` with `bytes`, such that a concurrent reader sees either the
/// previous contents or the new contents, never a partial write.
///
/// The bytes go to a uniquely named hidden sibling (`.{name}.XXXXXX.tmp`), are synced, and the
/// sibling is then renamed over `path`; a rename within one directory is atomic on the
/// platforms we run on. Parent directories are created, as necessary. If any step fails the
/// sibling is removed.
///
/// ```ignore
/// oichain_util::write_atomic("snapshots/nifty.json", &body).await?;
/// ```
pub async fn write_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || replace_file(&path, &bytes)).await?
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => anyhow::bail!("Failed to get directory path of {}", path.display()),
    };
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Failed to get file name of {}", path.display()))?
        .to_string_lossy();
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(&dir)?;
    if let Err(e) = tmp.write_all(bytes).and_then(|()| tmp.as_file().sync_all()) {
        error!("failed to write {}: {e}", tmp.path().display());
        discard(tmp);
        return Err(e.into());
    }

    if let Err(e) = tmp.persist(path) {
        error!("failed to move {} over {}: {}", e.file.path().display(), path.display(), e.error);
        discard(e.file);
        return Err(e.error.into());
    }
    trace!("{} bytes written to {}", bytes.len(), path.display());

    Ok(())
}

fn discard(tmp: NamedTempFile) {
    let tmp_path = tmp.path().to_path_buf();
    if let Err(e) = tmp.close() {
        warn!("failed to remove {}: {e}", tmp_path.display());
    }
}
