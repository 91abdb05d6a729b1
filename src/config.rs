//! Server profiles and the local data layout.
//!
//! One parameterized profile replaces per-guild entrypoints: which guild to
//! operate on, where its catalog index and checkpoint live, and which local
//! timezone to stamp incremental export names with. Missing required
//! identifiers are fatal at startup - the CLI layer enforces presence, this
//! module validates values.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;

use crate::remote::GuildId;

/// Configuration validation errors; all fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The UTC offset string is not `UTC` or `+HH:MM`/`-HH:MM`.
    #[error("invalid UTC offset '{0}' (expected 'UTC' or '+HH:MM')")]
    InvalidOffset(String),
}

/// Parse a profile timezone: `UTC` or a fixed `+HH:MM`/`-HH:MM` offset.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    if value.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }
    value
        .parse::<FixedOffset>()
        .map_err(|_| ConfigError::InvalidOffset(value.to_string()))
}

/// Everything a command needs to know about the guild it operates on.
#[derive(Debug, Clone)]
pub struct ServerProfile {
    /// The guild to synchronize.
    pub server_id: GuildId,
    /// Catalog index file driving `create`.
    pub index_file: PathBuf,
    /// Checkpoint file gating incremental exports.
    pub checkpoint_file: PathBuf,
    /// Local timezone for incremental export file names.
    pub utc_offset: FixedOffset,
}

impl ServerProfile {
    /// Build a profile with a UTC timezone.
    pub fn new(
        server_id: GuildId,
        index_file: impl Into<PathBuf>,
        checkpoint_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            server_id,
            index_file: index_file.into(),
            checkpoint_file: checkpoint_file.into(),
            utc_offset: Utc.fix(),
        }
    }

    /// Set the local timezone.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

/// Where local artifacts live: exports under the data directory, role
/// assignments next to them.
#[derive(Debug, Clone)]
pub struct DataLayout {
    /// Root data directory.
    pub data_dir: PathBuf,
}

impl DataLayout {
    /// Layout rooted at the given directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory full backups are written to.
    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    /// Directory incremental exports are written to.
    pub fn updates_dir(&self) -> PathBuf {
        self.data_dir.join("updates")
    }

    /// The role store file.
    pub fn roles_file(&self) -> PathBuf {
        self.data_dir.join("roles.json")
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(Path::new("data"))
    }
}
