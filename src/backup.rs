//! Backup snapshot engine.
//!
//! Walks every category -> forum channel -> thread (active and archived)
//! and emits one export row per thread. Full mode writes the whole guild
//! and advances the checkpoint; incremental mode keeps only threads whose
//! last activity is strictly newer than the checkpoint, writes a
//! range-stamped file, and leaves the checkpoint untouched when nothing
//! qualifies. A forum whose listing fails is skipped and reported, never
//! fatal; a missing starter message becomes an empty field.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::ExportRow;
use crate::checkpoint::{self, CheckpointError};
use crate::remote::{
    GuildId, MessageId, RemoteApi, RemoteCategory, RemoteChannel, RemoteError, RemoteForum,
    RemoteThread,
};

/// Timestamp format for the "Date Created" export column.
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local-time format stamped into incremental file names.
const STAMP_FORMAT: &str = "%d.%m.%y_%H%M";

/// Backup engine errors.
///
/// Only total inability to reach the guild, or local file trouble, surfaces
/// here; per-forum and per-thread failures degrade to empty fields.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The guild itself could not be read.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The export file could not be written.
    #[error("failed to write export {path}: {source}")]
    Export {
        /// Path of the export file.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Local filesystem trouble around the export.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Checkpoint persistence failed.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Result of a full export.
#[derive(Debug)]
pub struct BackupReport {
    /// Where the export was written.
    pub path: PathBuf,
    /// Number of thread rows exported.
    pub rows: usize,
    /// Forums whose thread listings failed and were skipped.
    pub skipped_forums: Vec<String>,
}

/// Result of an incremental export.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// No checkpoint exists; a full backup must run first. The guild was
    /// not contacted.
    NoPriorBackup,

    /// No thread changed since the checkpoint; nothing was written and the
    /// checkpoint was not advanced.
    NoChanges,

    /// Changed threads were exported.
    Written {
        /// Where the export was written.
        path: PathBuf,
        /// Number of thread rows exported.
        rows: usize,
        /// Human-readable digest of the captured link/message fields.
        digest: String,
    },
}

struct Collected {
    rows: Vec<ExportRow>,
    links: Vec<String>,
    skipped_forums: Vec<String>,
}

/// Export the entire guild and advance the checkpoint.
pub async fn full_export(
    remote: &dyn RemoteApi,
    guild: GuildId,
    backups_dir: &Path,
    checkpoint_file: &Path,
) -> Result<BackupReport, BackupError> {
    let guild_name = remote.guild_name(guild).await?;
    let collected = collect_rows(remote, guild, None).await?;

    fs::create_dir_all(backups_dir)?;
    let file_name = format!("{} backup.csv", guild_name.replace(['/', '\\'], "_"));
    let path = backups_dir.join(file_name);
    write_rows(&path, &collected.rows)?;

    checkpoint::save(checkpoint_file, Utc::now())?;

    info!(
        path = %path.display(),
        rows = collected.rows.len(),
        skipped_forums = collected.skipped_forums.len(),
        "full backup complete"
    );
    Ok(BackupReport {
        path,
        rows: collected.rows.len(),
        skipped_forums: collected.skipped_forums,
    })
}

/// Export threads changed since the checkpoint.
pub async fn incremental_export(
    remote: &dyn RemoteApi,
    guild: GuildId,
    updates_dir: &Path,
    checkpoint_file: &Path,
    local_offset: FixedOffset,
) -> Result<UpdateOutcome, BackupError> {
    // Checked before any remote read: a missing checkpoint is an answer,
    // not a reason to touch the guild.
    let Some(since) = checkpoint::load(checkpoint_file)? else {
        return Ok(UpdateOutcome::NoPriorBackup);
    };
    let now = Utc::now();

    let collected = collect_rows(remote, guild, Some(since)).await?;
    if collected.rows.is_empty() {
        info!("no threads changed since the last backup");
        return Ok(UpdateOutcome::NoChanges);
    }

    fs::create_dir_all(updates_dir)?;
    let file_name = format!(
        "Update {}_to_{}.csv",
        stamp(since, local_offset),
        stamp(now, local_offset)
    );
    let path = updates_dir.join(file_name);
    write_rows(&path, &collected.rows)?;

    checkpoint::save(checkpoint_file, now)?;

    let digest = if collected.links.is_empty() {
        "No captured links.".to_string()
    } else {
        collected.links.join("\n")
    };

    info!(
        path = %path.display(),
        rows = collected.rows.len(),
        "incremental backup complete"
    );
    Ok(UpdateOutcome::Written {
        path,
        rows: collected.rows.len(),
        digest,
    })
}

fn stamp(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant
        .with_timezone(&offset)
        .format(STAMP_FORMAT)
        .to_string()
}

fn write_rows(path: &Path, rows: &[ExportRow]) -> Result<(), BackupError> {
    let export_err = |source| BackupError::Export {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(export_err)?;
    for row in rows {
        writer.serialize(row).map_err(export_err)?;
    }
    writer.flush()?;
    Ok(())
}

async fn collect_rows(
    remote: &dyn RemoteApi,
    guild: GuildId,
    since: Option<DateTime<Utc>>,
) -> Result<Collected, RemoteError> {
    let channels = remote.list_channels(guild).await?;

    let mut categories: Vec<RemoteCategory> = Vec::new();
    let mut forums: Vec<RemoteForum> = Vec::new();
    for channel in channels {
        match channel {
            RemoteChannel::Category(category) => categories.push(category),
            RemoteChannel::Forum(forum) => forums.push(forum),
            RemoteChannel::Other { .. } => {}
        }
    }

    let mut collected = Collected {
        rows: Vec::new(),
        links: Vec::new(),
        skipped_forums: Vec::new(),
    };

    for category in &categories {
        for forum in forums.iter().filter(|f| f.parent_id == Some(category.id)) {
            let threads = match all_threads(remote, forum).await {
                Ok(threads) => threads,
                Err(err) => {
                    warn!(forum = %forum.name, error = %err, "skipping forum, could not list threads");
                    collected.skipped_forums.push(forum.name.clone());
                    continue;
                }
            };

            for thread in threads {
                if let Some(since) = since {
                    // Strictly newer than the checkpoint; threads with no
                    // usable timestamp at all are excluded.
                    match thread.last_activity() {
                        Some(activity) if activity > since => {}
                        _ => continue,
                    }
                }

                let starter = starter_content(remote, &thread).await;
                if !starter.is_empty() {
                    collected.links.push(starter.clone());
                }

                collected.rows.push(ExportRow {
                    category: category.name.clone(),
                    forum: forum.name.clone(),
                    title: thread.name.clone(),
                    tags: thread.applied_tags.join(", "),
                    message: starter,
                    catbox_link: thread
                        .last_message
                        .as_ref()
                        .map(|m| m.content.clone())
                        .unwrap_or_default(),
                    created: thread
                        .created_at
                        .map(|t| t.format(CREATED_FORMAT).to_string())
                        .unwrap_or_default(),
                });
            }
        }
    }

    Ok(collected)
}

async fn all_threads(
    remote: &dyn RemoteApi,
    forum: &RemoteForum,
) -> Result<Vec<RemoteThread>, RemoteError> {
    let mut threads = remote.list_active_threads(forum.id).await?;
    threads.extend(remote.list_archived_threads(forum.id).await?);
    Ok(threads)
}

/// Resolve a thread's starter content: cached reference, then explicit
/// fetch (the starter shares the thread's id), then empty on not-found or
/// permission trouble. Never aborts the walk.
pub(crate) async fn starter_content(remote: &dyn RemoteApi, thread: &RemoteThread) -> String {
    if let Some(starter) = &thread.starter_message {
        return starter.content.clone();
    }

    match remote.fetch_message(thread.id, MessageId(thread.id.0)).await {
        Ok(message) => message.content,
        Err(RemoteError::NotFound(_)) => {
            warn!(thread = %thread.name, "starter message not found");
            String::new()
        }
        Err(RemoteError::Permission(_)) => {
            warn!(thread = %thread.name, "missing permissions to fetch starter message");
            String::new()
        }
        Err(err) => {
            warn!(thread = %thread.name, error = %err, "failed to fetch starter message");
            String::new()
        }
    }
}
