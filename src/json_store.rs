//! Whole-file JSON persistence shared by the cache and history stores.
//! Reads are tolerant (missing or corrupt file -> default value); writes go
//! through a temp file in the same directory and an atomic rename.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::error::{StoreError, StoreResult};

/// Load `path` as JSON, falling back to `T::default()` when the file is absent,
/// unreadable or malformed. Failures other than "not found" are logged at error level.
pub(crate) fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no store file, starting empty");
            return T::default();
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to read store file, treating as empty");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to parse store file, treating as empty");
            T::default()
        }
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
/// Creates the parent directory when missing.
pub(crate) fn write_atomic<T>(path: &Path, value: &T) -> StoreResult<()>
where
    T: Serialize + ?Sized,
{
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| StoreError::io(parent, e))?;
    {
        let mut writer = BufWriter::new(temp_file.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| StoreError::encode(path, e))?;
        writer.flush().map_err(|e| StoreError::io(path, e))?;
    }

    temp_file
        .persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

/// Delete `path`. A file that is already gone is not an error.
pub(crate) fn remove_if_exists(path: &Path) -> StoreResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(StoreError::io(path, err)),
    }
}
