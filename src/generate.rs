//! Input file generation for workers.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One megabyte as used for generated file sizes.
pub const MB: usize = 1024 * 1024;

/// Byte every generated file is filled with.
pub const FILLER: u8 = b'X';

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("File creation failed for {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Write failed for {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Input file name for the 1-based worker `index`.
pub fn worker_file_name(index: usize) -> String {
    format!("worker{}.bin", index)
}

/// Creates (or truncates) `path` with `size_mb` megabytes of filler bytes.
pub fn generate_binary_file(path: &Path, size_mb: u64) -> Result<(), GenerateError> {
    let file = File::create(path).map_err(|source| GenerateError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let write_err = |source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    };

    let block = vec![FILLER; MB];
    let mut writer = BufWriter::with_capacity(MB, file);
    for _ in 0..size_mb {
        writer.write_all(&block).map_err(write_err)?;
    }
    writer.flush().map_err(write_err)?;

    debug!("Generated {} ({} MB)", path.display(), size_mb);
    Ok(())
}
