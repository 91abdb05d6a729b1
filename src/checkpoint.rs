//! Last-backup checkpoint persistence.
//!
//! A single ISO-8601 UTC timestamp in a flat file, overwritten wholesale on
//! each successful backup. A missing file means "no prior backup" - a
//! reportable state, not an error. The stored value is monotonically
//! non-decreasing because every writer saves an instant at or after the
//! one it loaded.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Checkpoint read/write errors.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The checkpoint file exists but could not be read or written.
    #[error("checkpoint file {path}: {source}")]
    Io {
        /// Path of the checkpoint file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The file's contents are not a valid timestamp.
    #[error("invalid checkpoint timestamp '{value}' in {path}")]
    Invalid {
        /// Path of the checkpoint file.
        path: PathBuf,
        /// The malformed contents.
        value: String,
    },
}

/// Read the checkpoint; `Ok(None)` when no backup has run yet.
pub fn load(path: &Path) -> Result<Option<DateTime<Utc>>, CheckpointError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CheckpointError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let trimmed = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(trimmed).map_err(|_| CheckpointError::Invalid {
        path: path.to_path_buf(),
        value: trimmed.to_string(),
    })?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

/// Overwrite the checkpoint with the given instant.
pub fn save(path: &Path, instant: DateTime<Utc>) -> Result<(), CheckpointError> {
    let io_err = |source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, instant.to_rfc3339()).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.txt")).unwrap().is_none());
    }

    #[test]
    fn round_trips_and_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups").join("last_backup.txt");
        let instant = Utc.with_ymd_and_hms(2025, 3, 9, 14, 30, 0).unwrap();

        save(&path, instant).unwrap();
        assert_eq!(load(&path).unwrap(), Some(instant));
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_backup.txt");
        fs::write(&path, "not a timestamp").unwrap();

        assert!(matches!(
            load(&path),
            Err(CheckpointError::Invalid { .. })
        ));
    }
}
