//! Pre-fetched view of live guild state.
//!
//! One read pass at the start of a reconciliation run builds the lookup
//! maps the engine diffs against. Categories and forums are keyed by their
//! normalized names; post titles stay exact. A forum whose thread listing
//! fails is logged and treated as empty - a single inaccessible forum must
//! not block reconciliation of the rest.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::normalize::normalize;

use super::{GuildId, RemoteApi, RemoteCategory, RemoteChannel, RemoteError, RemoteForum};

/// Lookup maps over the guild's current categories, forums, and threads.
///
/// Owned by the run that fetched it; never cached across runs. The engine
/// registers entities it creates so later catalog items see them.
#[derive(Debug, Default)]
pub struct GuildSnapshot {
    /// Existing categories. Fetched entries are keyed by normalized name;
    /// entries registered during a run keep the catalog's name as-is.
    pub categories: HashMap<String, RemoteCategory>,
    /// Existing forum channels, keyed like `categories`.
    pub forums: HashMap<String, RemoteForum>,
    /// Exact thread titles per forum (active and archived combined),
    /// keyed by normalized forum name.
    pub posts: HashMap<String, BTreeSet<String>>,
}

impl GuildSnapshot {
    /// Fetch a fresh snapshot of the guild.
    ///
    /// Fails only when the channel listing itself is unreachable; per-forum
    /// thread fetches are failure-isolated.
    pub async fn fetch(remote: &dyn RemoteApi, guild: GuildId) -> Result<Self, RemoteError> {
        let channels = remote.list_channels(guild).await?;

        let mut snapshot = GuildSnapshot::default();
        for channel in channels {
            match channel {
                RemoteChannel::Category(category) => {
                    snapshot
                        .categories
                        .insert(normalize(&category.name), category);
                }
                RemoteChannel::Forum(forum) => {
                    let titles = match forum_titles(remote, &forum).await {
                        Ok(titles) => titles,
                        Err(err) => {
                            warn!(
                                forum = %forum.name,
                                error = %err,
                                "failed to fetch threads for forum, treating as empty"
                            );
                            BTreeSet::new()
                        }
                    };
                    let key = normalize(&forum.name);
                    snapshot.posts.insert(key.clone(), titles);
                    snapshot.forums.insert(key, forum);
                }
                RemoteChannel::Other { .. } => {}
            }
        }

        debug!(
            categories = snapshot.categories.len(),
            forums = snapshot.forums.len(),
            "guild snapshot complete"
        );
        Ok(snapshot)
    }

    /// Look up a category by normalized name.
    pub fn category(&self, name: &str) -> Option<&RemoteCategory> {
        self.categories.get(&normalize(name))
    }

    /// Look up a forum by normalized name.
    pub fn forum(&self, name: &str) -> Option<&RemoteForum> {
        self.forums.get(&normalize(name))
    }

    /// Register a category created during this run, under the name the
    /// catalog spelled it.
    pub fn register_category(&mut self, name: &str, category: RemoteCategory) {
        self.categories.insert(name.to_string(), category);
    }

    /// Register a forum created during this run and give it an empty post
    /// set. The forum keeps the catalog's spelling; the post set is keyed
    /// normalized like every other post set.
    pub fn register_forum(&mut self, name: &str, forum: RemoteForum) {
        self.posts.entry(normalize(name)).or_default();
        self.forums.insert(name.to_string(), forum);
    }

    /// Whether a forum already holds a thread with this exact title.
    pub fn has_post(&self, forum_name: &str, title: &str) -> bool {
        self.posts
            .get(&normalize(forum_name))
            .is_some_and(|titles| titles.contains(title))
    }

    /// Record a thread created during this run.
    pub fn record_post(&mut self, forum_name: &str, title: &str) {
        self.posts
            .entry(normalize(forum_name))
            .or_default()
            .insert(title.to_string());
    }
}

async fn forum_titles(
    remote: &dyn RemoteApi,
    forum: &RemoteForum,
) -> Result<BTreeSet<String>, RemoteError> {
    let mut titles = BTreeSet::new();
    for thread in remote.list_active_threads(forum.id).await? {
        titles.insert(thread.name);
    }
    for thread in remote.list_archived_threads(forum.id).await? {
        titles.insert(thread.name);
    }
    Ok(titles)
}
