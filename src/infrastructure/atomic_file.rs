use std::io;
use std::path::Path;

use tokio::fs;

/// Writes `bytes` next to `path` and renames over it, so readers never see a
/// half-written file.
pub async fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(|err| {
                io::Error::new(
                    err.kind(),
                    format!("failed to create parent directory '{}': {err}", parent.display()),
                )
            })?;
        }
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await.map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("failed to write temp file '{}': {err}", tmp.display()),
        )
    })?;

    fs::rename(&tmp, path).await.map_err(|err| {
        io::Error::new(
            err.kind(),
            format!(
                "failed to rename temp file '{}' -> '{}': {err}",
                tmp.display(),
                path.display()
            ),
        )
    })
}

/// Reads a file, treating "does not exist" as `None`.
pub async fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
