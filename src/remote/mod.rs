//! Remote platform interface.
//!
//! The engines never talk to the chat platform directly - everything goes
//! through [`RemoteApi`], an object-safe async trait mirroring the handful
//! of guild operations the system needs. Channels come back as the closed
//! [`RemoteChannel`] variant so callers pattern-match instead of
//! type-sniffing handles.
//!
//! Implementations:
//! - [`rest::RestRemote`] - JSON REST client for a live guild
//! - [`memory::MemoryRemote`] - scriptable in-memory guild for tests

pub mod memory;
pub mod rest;
pub mod snapshot;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Guild identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildId(pub u64);

/// Channel identifier (categories, forums, and other channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

/// Thread identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(pub u64);

/// Message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Caller identifier, used by the permission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl std::fmt::Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A forum tag definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumTag {
    /// Display name of the tag.
    pub name: String,
}

impl ForumTag {
    /// Build a tag from a display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A category channel in the guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCategory {
    /// Channel id.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
}

/// A forum channel in the guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteForum {
    /// Channel id.
    pub id: ChannelId,
    /// Display name.
    pub name: String,
    /// Parent category, if the forum sits under one.
    pub parent_id: Option<ChannelId>,
    /// Tag vocabulary currently configured on the forum.
    pub available_tags: Vec<ForumTag>,
}

/// A message inside a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// Message id.
    pub id: MessageId,
    /// Message body.
    pub content: String,
    /// Creation time, when the platform reports one.
    pub created_at: Option<DateTime<Utc>>,
}

/// A thread inside a forum channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteThread {
    /// Thread id. The starter message shares this id by platform convention.
    pub id: ThreadId,
    /// Thread title.
    pub name: String,
    /// Names of the tags applied to the thread.
    pub applied_tags: Vec<String>,
    /// Creation time, when the platform reports one.
    pub created_at: Option<DateTime<Utc>>,
    /// Starter message, when the platform had it cached in the listing.
    pub starter_message: Option<RemoteMessage>,
    /// Most recent message, when the platform had it cached in the listing.
    pub last_message: Option<RemoteMessage>,
}

impl RemoteThread {
    /// Last-activity instant: last message time, else creation time.
    ///
    /// This is the timestamp incremental exports filter on.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_message
            .as_ref()
            .and_then(|m| m.created_at)
            .or(self.created_at)
    }
}

/// A guild channel, as a closed set of the kinds the system cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteChannel {
    /// A category container.
    Category(RemoteCategory),
    /// A forum channel.
    Forum(RemoteForum),
    /// Any other channel kind (text, voice, ...) - listed, never touched.
    Other {
        /// Channel id.
        id: ChannelId,
        /// Display name.
        name: String,
    },
}

/// Errors surfaced by remote operations.
///
/// All three kinds are retryable by re-running the command; the engines
/// treat them as item-level failures, never as fatal conditions.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The platform could not be reached or returned an unexpected payload.
    #[error("transport error: {0}")]
    Transport(String),

    /// The requested entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The credentials lack access to the requested entity.
    #[error("missing access to {0}")]
    Permission(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// The guild operations consumed by the reconciliation and backup engines.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Display name of the guild.
    async fn guild_name(&self, guild: GuildId) -> Result<String, RemoteError>;

    /// List every channel in the guild.
    async fn list_channels(&self, guild: GuildId) -> Result<Vec<RemoteChannel>, RemoteError>;

    /// Active (non-archived) threads of a forum channel.
    async fn list_active_threads(&self, forum: ChannelId)
        -> Result<Vec<RemoteThread>, RemoteError>;

    /// Archived threads of a forum channel, with no limit.
    async fn list_archived_threads(
        &self,
        forum: ChannelId,
    ) -> Result<Vec<RemoteThread>, RemoteError>;

    /// Create a category.
    async fn create_category(
        &self,
        guild: GuildId,
        name: &str,
    ) -> Result<RemoteCategory, RemoteError>;

    /// Create a forum channel under a category, with a tag vocabulary.
    async fn create_forum(
        &self,
        guild: GuildId,
        name: &str,
        category: ChannelId,
        tags: &[ForumTag],
    ) -> Result<RemoteForum, RemoteError>;

    /// Overwrite a forum's tag vocabulary.
    async fn update_forum_tags(
        &self,
        forum: ChannelId,
        tags: &[ForumTag],
    ) -> Result<(), RemoteError>;

    /// Create a thread in a forum, with its starter message content.
    async fn create_thread(
        &self,
        forum: ChannelId,
        name: &str,
        content: &str,
        tags: &[ForumTag],
        auto_archive_minutes: u32,
    ) -> Result<RemoteThread, RemoteError>;

    /// Fetch a single message from a thread.
    async fn fetch_message(
        &self,
        thread: ThreadId,
        message: MessageId,
    ) -> Result<RemoteMessage, RemoteError>;

    /// Categories of the guild, in listing order.
    async fn list_categories(&self, guild: GuildId) -> Result<Vec<RemoteCategory>, RemoteError> {
        Ok(self
            .list_channels(guild)
            .await?
            .into_iter()
            .filter_map(|c| match c {
                RemoteChannel::Category(cat) => Some(cat),
                _ => None,
            })
            .collect())
    }

    /// Forum channels of the guild, in listing order.
    async fn list_forum_channels(&self, guild: GuildId) -> Result<Vec<RemoteForum>, RemoteError> {
        Ok(self
            .list_channels(guild)
            .await?
            .into_iter()
            .filter_map(|c| match c {
                RemoteChannel::Forum(forum) => Some(forum),
                _ => None,
            })
            .collect())
    }
}
