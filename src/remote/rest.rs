//! JSON REST implementation of [`RemoteApi`].
//!
//! Thin client over the platform's HTTP surface. Status codes map onto the
//! three remote failure kinds: 401/403 -> Permission, 404 -> NotFound,
//! everything else non-2xx -> Transport. No retries here - the engines'
//! idempotent re-run is the retry mechanism.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ChannelId, ForumTag, GuildId, MessageId, RemoteApi, RemoteCategory, RemoteChannel,
    RemoteError, RemoteForum, RemoteMessage, RemoteThread, ThreadId,
};

/// Channel kind code for categories.
const KIND_CATEGORY: u8 = 4;
/// Channel kind code for forum channels.
const KIND_FORUM: u8 = 15;

/// REST client for a live guild.
pub struct RestRemote {
    client: Client,
    base_url: String,
    token: String,
}

impl RestRemote {
    /// Build a client against a platform API base URL with a bot token.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("Bot {}", self.token))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<T, RemoteError> {
        debug!(path = %path, "remote GET");
        let response = self
            .authorized(self.client.get(self.url(path)))
            .send()
            .await?;
        Ok(checked(response, what).await?.json().await?)
    }
}

async fn checked(response: Response, what: &str) -> Result<Response, RemoteError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(RemoteError::NotFound(what.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(RemoteError::Permission(what.to_string()))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(RemoteError::Transport(format!("{what}: {status} - {body}")))
        }
    }
}

#[derive(Debug, Deserialize)]
struct GuildPayload {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct TagPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    id: u64,
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    parent_id: Option<u64>,
    #[serde(default)]
    available_tags: Vec<TagPayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    id: u64,
    #[serde(default)]
    content: String,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ThreadPayload {
    id: u64,
    name: String,
    #[serde(default)]
    applied_tags: Vec<TagPayload>,
    created_at: Option<DateTime<Utc>>,
    starter_message: Option<MessagePayload>,
    last_message: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct ThreadListPayload {
    threads: Vec<ThreadPayload>,
}

#[derive(Debug, Serialize)]
struct CreateChannelRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    available_tags: Vec<TagPayload>,
}

#[derive(Debug, Serialize)]
struct UpdateTagsRequest {
    available_tags: Vec<TagPayload>,
}

#[derive(Debug, Serialize)]
struct CreateThreadRequest<'a> {
    name: &'a str,
    auto_archive_duration: u32,
    applied_tags: Vec<TagPayload>,
    message: StarterPayload<'a>,
}

#[derive(Debug, Serialize)]
struct StarterPayload<'a> {
    content: &'a str,
}

fn wire_tags(tags: &[ForumTag]) -> Vec<TagPayload> {
    tags.iter()
        .map(|t| TagPayload {
            name: t.name.clone(),
        })
        .collect()
}

impl From<MessagePayload> for RemoteMessage {
    fn from(payload: MessagePayload) -> Self {
        RemoteMessage {
            id: MessageId(payload.id),
            content: payload.content,
            created_at: payload.created_at,
        }
    }
}

impl From<ThreadPayload> for RemoteThread {
    fn from(payload: ThreadPayload) -> Self {
        RemoteThread {
            id: ThreadId(payload.id),
            name: payload.name,
            applied_tags: payload.applied_tags.into_iter().map(|t| t.name).collect(),
            created_at: payload.created_at,
            starter_message: payload.starter_message.map(RemoteMessage::from),
            last_message: payload.last_message.map(RemoteMessage::from),
        }
    }
}

impl From<ChannelPayload> for RemoteChannel {
    fn from(payload: ChannelPayload) -> Self {
        match payload.kind {
            KIND_CATEGORY => RemoteChannel::Category(RemoteCategory {
                id: ChannelId(payload.id),
                name: payload.name,
            }),
            KIND_FORUM => RemoteChannel::Forum(RemoteForum {
                id: ChannelId(payload.id),
                name: payload.name,
                parent_id: payload.parent_id.map(ChannelId),
                available_tags: payload
                    .available_tags
                    .into_iter()
                    .map(|t| ForumTag { name: t.name })
                    .collect(),
            }),
            _ => RemoteChannel::Other {
                id: ChannelId(payload.id),
                name: payload.name,
            },
        }
    }
}

#[async_trait]
impl RemoteApi for RestRemote {
    async fn guild_name(&self, guild: GuildId) -> Result<String, RemoteError> {
        let payload: GuildPayload = self
            .get_json(&format!("/guilds/{guild}"), &format!("guild {guild}"))
            .await?;
        Ok(payload.name)
    }

    async fn list_channels(&self, guild: GuildId) -> Result<Vec<RemoteChannel>, RemoteError> {
        let payload: Vec<ChannelPayload> = self
            .get_json(
                &format!("/guilds/{guild}/channels"),
                &format!("channels of guild {guild}"),
            )
            .await?;
        Ok(payload.into_iter().map(RemoteChannel::from).collect())
    }

    async fn list_active_threads(
        &self,
        forum: ChannelId,
    ) -> Result<Vec<RemoteThread>, RemoteError> {
        let payload: ThreadListPayload = self
            .get_json(
                &format!("/channels/{forum}/threads/active"),
                &format!("active threads of forum {forum}"),
            )
            .await?;
        Ok(payload.threads.into_iter().map(RemoteThread::from).collect())
    }

    async fn list_archived_threads(
        &self,
        forum: ChannelId,
    ) -> Result<Vec<RemoteThread>, RemoteError> {
        let payload: ThreadListPayload = self
            .get_json(
                &format!("/channels/{forum}/threads/archived"),
                &format!("archived threads of forum {forum}"),
            )
            .await?;
        Ok(payload.threads.into_iter().map(RemoteThread::from).collect())
    }

    async fn create_category(
        &self,
        guild: GuildId,
        name: &str,
    ) -> Result<RemoteCategory, RemoteError> {
        let request = CreateChannelRequest {
            name,
            kind: KIND_CATEGORY,
            parent_id: None,
            available_tags: Vec::new(),
        };
        let response = self
            .authorized(self.client.post(self.url(&format!("/guilds/{guild}/channels"))))
            .json(&request)
            .send()
            .await?;
        let payload: ChannelPayload = checked(response, &format!("category '{name}'"))
            .await?
            .json()
            .await?;
        Ok(RemoteCategory {
            id: ChannelId(payload.id),
            name: payload.name,
        })
    }

    async fn create_forum(
        &self,
        guild: GuildId,
        name: &str,
        category: ChannelId,
        tags: &[ForumTag],
    ) -> Result<RemoteForum, RemoteError> {
        let request = CreateChannelRequest {
            name,
            kind: KIND_FORUM,
            parent_id: Some(category.0),
            available_tags: wire_tags(tags),
        };
        let response = self
            .authorized(self.client.post(self.url(&format!("/guilds/{guild}/channels"))))
            .json(&request)
            .send()
            .await?;
        let payload: ChannelPayload = checked(response, &format!("forum '{name}'"))
            .await?
            .json()
            .await?;
        Ok(RemoteForum {
            id: ChannelId(payload.id),
            name: payload.name,
            parent_id: payload.parent_id.map(ChannelId),
            available_tags: tags.to_vec(),
        })
    }

    async fn update_forum_tags(
        &self,
        forum: ChannelId,
        tags: &[ForumTag],
    ) -> Result<(), RemoteError> {
        let request = UpdateTagsRequest {
            available_tags: wire_tags(tags),
        };
        let response = self
            .authorized(self.client.patch(self.url(&format!("/channels/{forum}"))))
            .json(&request)
            .send()
            .await?;
        checked(response, &format!("forum {forum}")).await?;
        Ok(())
    }

    async fn create_thread(
        &self,
        forum: ChannelId,
        name: &str,
        content: &str,
        tags: &[ForumTag],
        auto_archive_minutes: u32,
    ) -> Result<RemoteThread, RemoteError> {
        let request = CreateThreadRequest {
            name,
            auto_archive_duration: auto_archive_minutes,
            applied_tags: wire_tags(tags),
            message: StarterPayload { content },
        };
        let response = self
            .authorized(self.client.post(self.url(&format!("/channels/{forum}/threads"))))
            .json(&request)
            .send()
            .await?;
        let payload: ThreadPayload = checked(response, &format!("thread '{name}'"))
            .await?
            .json()
            .await?;
        Ok(RemoteThread::from(payload))
    }

    async fn fetch_message(
        &self,
        thread: ThreadId,
        message: MessageId,
    ) -> Result<RemoteMessage, RemoteError> {
        let payload: MessagePayload = self
            .get_json(
                &format!("/channels/{thread}/messages/{}", message.0),
                &format!("message {} in thread {thread}", message.0),
            )
            .await?;
        Ok(RemoteMessage::from(payload))
    }
}
