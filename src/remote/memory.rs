//! In-memory guild for tests.
//!
//! Seedable state, per-item failure injection, and read/mutation counters -
//! enough to exercise every engine property without a live platform.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    ChannelId, ForumTag, GuildId, MessageId, RemoteApi, RemoteCategory, RemoteChannel,
    RemoteError, RemoteForum, RemoteMessage, RemoteThread, ThreadId,
};

#[derive(Default)]
struct GuildState {
    name: String,
    channels: Vec<RemoteChannel>,
    active: HashMap<ChannelId, Vec<RemoteThread>>,
    archived: HashMap<ChannelId, Vec<RemoteThread>>,
    messages: HashMap<(ThreadId, MessageId), RemoteMessage>,
}

#[derive(Default)]
struct Faults {
    category_creates: HashSet<String>,
    forum_creates: HashSet<String>,
    thread_creates: HashSet<String>,
    thread_listings: HashSet<ChannelId>,
}

/// Scriptable in-memory [`RemoteApi`] implementation.
pub struct MemoryRemote {
    state: Mutex<GuildState>,
    faults: Mutex<Faults>,
    next_id: AtomicU64,
    reads: AtomicUsize,
    mutations: AtomicUsize,
}

impl MemoryRemote {
    /// The single guild every `MemoryRemote` serves.
    pub const GUILD: GuildId = GuildId(1);

    /// Create an empty guild with the given display name.
    pub fn new(name: &str) -> Self {
        Self {
            state: Mutex::new(GuildState {
                name: name.to_string(),
                ..GuildState::default()
            }),
            faults: Mutex::new(Faults::default()),
            next_id: AtomicU64::new(1000),
            reads: AtomicUsize::new(0),
            mutations: AtomicUsize::new(0),
        }
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Seed an existing category.
    pub fn seed_category(&self, name: &str) -> RemoteCategory {
        let category = RemoteCategory {
            id: ChannelId(self.fresh_id()),
            name: name.to_string(),
        };
        let mut state = self.state.lock().unwrap();
        state
            .channels
            .push(RemoteChannel::Category(category.clone()));
        category
    }

    /// Seed an existing forum channel.
    pub fn seed_forum(
        &self,
        name: &str,
        parent: Option<ChannelId>,
        tags: &[ForumTag],
    ) -> RemoteForum {
        let forum = RemoteForum {
            id: ChannelId(self.fresh_id()),
            name: name.to_string(),
            parent_id: parent,
            available_tags: tags.to_vec(),
        };
        let mut state = self.state.lock().unwrap();
        state.channels.push(RemoteChannel::Forum(forum.clone()));
        state.active.insert(forum.id, Vec::new());
        state.archived.insert(forum.id, Vec::new());
        forum
    }

    /// Seed an active thread into a forum.
    pub fn seed_thread(&self, forum: ChannelId, thread: RemoteThread) {
        self.state
            .lock()
            .unwrap()
            .active
            .entry(forum)
            .or_default()
            .push(thread);
    }

    /// Seed an archived thread into a forum.
    pub fn seed_archived_thread(&self, forum: ChannelId, thread: RemoteThread) {
        self.state
            .lock()
            .unwrap()
            .archived
            .entry(forum)
            .or_default()
            .push(thread);
    }

    /// Make a message fetchable via [`RemoteApi::fetch_message`].
    pub fn insert_message(&self, thread: ThreadId, message: RemoteMessage) {
        self.state
            .lock()
            .unwrap()
            .messages
            .insert((thread, message.id), message);
    }

    /// Minimal thread fixture with no timestamps or cached messages.
    pub fn thread(id: ThreadId, title: &str) -> RemoteThread {
        RemoteThread {
            id,
            name: title.to_string(),
            applied_tags: Vec::new(),
            created_at: None,
            starter_message: None,
            last_message: None,
        }
    }

    /// Make creates of this category name fail.
    pub fn fail_category_create(&self, name: &str) {
        self.faults
            .lock()
            .unwrap()
            .category_creates
            .insert(name.to_string());
    }

    /// Make creates of this forum name fail.
    pub fn fail_forum_create(&self, name: &str) {
        self.faults
            .lock()
            .unwrap()
            .forum_creates
            .insert(name.to_string());
    }

    /// Make creates of this thread title fail.
    pub fn fail_thread_create(&self, title: &str) {
        self.faults
            .lock()
            .unwrap()
            .thread_creates
            .insert(title.to_string());
    }

    /// Make thread listings for this forum fail.
    pub fn fail_thread_listing(&self, forum: ChannelId) {
        self.faults
            .lock()
            .unwrap()
            .thread_listings
            .insert(forum);
    }

    /// Number of mutation calls issued so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::Relaxed)
    }

    /// Number of read calls issued so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn mutate(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl RemoteApi for MemoryRemote {
    async fn guild_name(&self, _guild: GuildId) -> Result<String, RemoteError> {
        self.read();
        Ok(self.state.lock().unwrap().name.clone())
    }

    async fn list_channels(&self, _guild: GuildId) -> Result<Vec<RemoteChannel>, RemoteError> {
        self.read();
        Ok(self.state.lock().unwrap().channels.clone())
    }

    async fn list_active_threads(
        &self,
        forum: ChannelId,
    ) -> Result<Vec<RemoteThread>, RemoteError> {
        self.read();
        if self.faults.lock().unwrap().thread_listings.contains(&forum) {
            return Err(RemoteError::Permission(format!("forum {forum}")));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .active
            .get(&forum)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_archived_threads(
        &self,
        forum: ChannelId,
    ) -> Result<Vec<RemoteThread>, RemoteError> {
        self.read();
        if self.faults.lock().unwrap().thread_listings.contains(&forum) {
            return Err(RemoteError::Permission(format!("forum {forum}")));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .archived
            .get(&forum)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_category(
        &self,
        _guild: GuildId,
        name: &str,
    ) -> Result<RemoteCategory, RemoteError> {
        self.mutate();
        if self.faults.lock().unwrap().category_creates.contains(name) {
            return Err(RemoteError::Transport(format!(
                "injected failure creating category '{name}'"
            )));
        }
        let category = RemoteCategory {
            id: ChannelId(self.fresh_id()),
            name: name.to_string(),
        };
        self.state
            .lock()
            .unwrap()
            .channels
            .push(RemoteChannel::Category(category.clone()));
        Ok(category)
    }

    async fn create_forum(
        &self,
        _guild: GuildId,
        name: &str,
        category: ChannelId,
        tags: &[ForumTag],
    ) -> Result<RemoteForum, RemoteError> {
        self.mutate();
        if self.faults.lock().unwrap().forum_creates.contains(name) {
            return Err(RemoteError::Transport(format!(
                "injected failure creating forum '{name}'"
            )));
        }
        let forum = RemoteForum {
            id: ChannelId(self.fresh_id()),
            name: name.to_string(),
            parent_id: Some(category),
            available_tags: tags.to_vec(),
        };
        let mut state = self.state.lock().unwrap();
        state.channels.push(RemoteChannel::Forum(forum.clone()));
        state.active.insert(forum.id, Vec::new());
        state.archived.insert(forum.id, Vec::new());
        Ok(forum)
    }

    async fn update_forum_tags(
        &self,
        forum: ChannelId,
        tags: &[ForumTag],
    ) -> Result<(), RemoteError> {
        self.mutate();
        let mut state = self.state.lock().unwrap();
        for channel in &mut state.channels {
            if let RemoteChannel::Forum(f) = channel {
                if f.id == forum {
                    f.available_tags = tags.to_vec();
                    return Ok(());
                }
            }
        }
        Err(RemoteError::NotFound(format!("forum {forum}")))
    }

    async fn create_thread(
        &self,
        forum: ChannelId,
        name: &str,
        content: &str,
        tags: &[ForumTag],
        _auto_archive_minutes: u32,
    ) -> Result<RemoteThread, RemoteError> {
        self.mutate();
        if self.faults.lock().unwrap().thread_creates.contains(name) {
            return Err(RemoteError::Transport(format!(
                "injected failure creating thread '{name}'"
            )));
        }
        let id = ThreadId(self.fresh_id());
        let starter = RemoteMessage {
            id: MessageId(id.0),
            content: content.to_string(),
            created_at: None,
        };
        let thread = RemoteThread {
            id,
            name: name.to_string(),
            applied_tags: tags.iter().map(|t| t.name.clone()).collect(),
            created_at: None,
            starter_message: Some(starter.clone()),
            last_message: None,
        };
        let mut state = self.state.lock().unwrap();
        state.messages.insert((id, starter.id), starter);
        state.active.entry(forum).or_default().push(thread.clone());
        Ok(thread)
    }

    async fn fetch_message(
        &self,
        thread: ThreadId,
        message: MessageId,
    ) -> Result<RemoteMessage, RemoteError> {
        self.read();
        self.state
            .lock()
            .unwrap()
            .messages
            .get(&(thread, message))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("message {} in thread {thread}", message.0)))
    }
}
