//! Reading whole media files into memory for buffer probes.

use std::path::{Path, PathBuf};

/// Largest file a buffer probe accepts.
pub const MAX_BUFFER_LEN: u64 = u32::MAX as u64;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("file is empty: {0}")]
    Empty(PathBuf),

    #[error("file too large for a buffer probe: {path} ({len} bytes)")]
    TooLarge { path: PathBuf, len: u64 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read `path` completely.
pub fn read_media_file(path: &Path) -> Result<Vec<u8>, LoadError> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    if !metadata.is_file() {
        return Err(LoadError::NotAFile(path.to_path_buf()));
    }
    match metadata.len() {
        0 => return Err(LoadError::Empty(path.to_path_buf())),
        len if len > MAX_BUFFER_LEN => {
            return Err(LoadError::TooLarge {
                path: path.to_path_buf(),
                len,
            })
        }
        _ => {}
    }

    let data = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}
