//! Reconciliation engine.
//!
//! Walks the catalog in order - category, forum within category, post
//! within forum - and issues the minimal set of creations to bring the
//! guild up to the catalog. Matching is normalized for categories and
//! forums, exact-title for posts. Every mutation is followed by a pacing
//! sleep; every failure is recorded and prunes exactly its own subtree.
//! Partial success is the expected common case - the run itself never
//! fails, it reports.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::remote::snapshot::GuildSnapshot;
use crate::remote::{ForumTag, GuildId, RemoteApi};
use crate::tags::tags_for;

/// Auto-archive duration applied to every created thread.
pub const AUTO_ARCHIVE_MINUTES: u32 = 60;

/// Courtesy delays between remote mutations.
///
/// The platform enforces per-action throughput ceilings; thread creation
/// additionally counts against an active-thread ceiling, so the post delay
/// is the longest.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Delay after creating a category.
    pub category: Duration,
    /// Delay after creating a forum.
    pub forum: Duration,
    /// Delay after creating a thread.
    pub post: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            category: Duration::from_secs(1),
            forum: Duration::from_secs(1),
            post: Duration::from_secs(3),
        }
    }
}

impl Pacing {
    /// Zero delays, for tests.
    pub fn none() -> Self {
        Self {
            category: Duration::ZERO,
            forum: Duration::ZERO,
            post: Duration::ZERO,
        }
    }
}

/// One failed creation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// The item that failed (category name, forum name, or post title).
    pub item: String,
    /// The enclosing item, empty for categories.
    pub parent: String,
    /// Description of the error.
    pub error: String,
}

impl FailureRecord {
    fn new(item: &str, parent: &str, error: impl ToString) -> Self {
        Self {
            item: item.to_string(),
            parent: parent.to_string(),
            error: error.to_string(),
        }
    }
}

/// Aggregated outcome of one reconciliation run.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Categories created this run.
    pub created_categories: usize,
    /// Forums created this run.
    pub created_forums: usize,
    /// Posts created this run.
    pub created_posts: usize,
    /// Posts skipped because their exact title already existed.
    pub skipped_posts: usize,
    /// Category creations that failed (their subtrees were skipped).
    pub failed_categories: Vec<FailureRecord>,
    /// Forum creations or tag updates that failed (their posts were skipped).
    pub failed_forums: Vec<FailureRecord>,
    /// Post creations that failed.
    pub failed_posts: Vec<FailureRecord>,
}

impl ReconcileReport {
    /// Whether the run completed without a single failure.
    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0
    }

    /// Total number of failed items.
    pub fn failure_count(&self) -> usize {
        self.failed_categories.len() + self.failed_forums.len() + self.failed_posts.len()
    }

    /// Total number of entities created.
    pub fn created_count(&self) -> usize {
        self.created_categories + self.created_forums + self.created_posts
    }

    fn log_failures(&self) {
        for failure in &self.failed_categories {
            error!(category = %failure.item, error = %failure.error, "category failed");
        }
        for failure in &self.failed_forums {
            error!(
                forum = %failure.item,
                category = %failure.parent,
                error = %failure.error,
                "forum failed"
            );
        }
        for failure in &self.failed_posts {
            error!(
                post = %failure.item,
                forum = %failure.parent,
                error = %failure.error,
                "post failed"
            );
        }
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "created {} categories, {} forums, {} posts ({} posts already present)",
            self.created_categories, self.created_forums, self.created_posts, self.skipped_posts
        )?;
        if self.is_clean() {
            return write!(f, "; no failures");
        }
        for failure in &self.failed_categories {
            write!(f, "\nfailed category '{}': {}", failure.item, failure.error)?;
        }
        for failure in &self.failed_forums {
            write!(
                f,
                "\nfailed forum '{}' (category '{}'): {}",
                failure.item, failure.parent, failure.error
            )?;
        }
        for failure in &self.failed_posts {
            write!(
                f,
                "\nfailed post '{}' (forum '{}'): {}",
                failure.item, failure.parent, failure.error
            )?;
        }
        Ok(())
    }
}

/// Bring the guild up to the catalog.
///
/// The snapshot must have been fetched for the same guild immediately
/// before; entities created here are registered into it so later catalog
/// items see them. Item-level failures never abort the run.
pub async fn reconcile(
    remote: &dyn RemoteApi,
    guild: GuildId,
    catalog: &Catalog,
    snapshot: &mut GuildSnapshot,
    pacing: &Pacing,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for (category_name, forums) in &catalog.categories {
        let category = match snapshot.category(category_name) {
            Some(existing) => {
                info!(category = %category_name, "category already exists, skipping creation");
                existing.clone()
            }
            None => match remote.create_category(guild, category_name).await {
                Ok(created) => {
                    info!(category = %category_name, id = %created.id, "created category");
                    report.created_categories += 1;
                    snapshot.register_category(category_name, created.clone());
                    sleep(pacing.category).await;
                    created
                }
                Err(err) => {
                    // The category is a hard prerequisite for its subtree.
                    report
                        .failed_categories
                        .push(FailureRecord::new(category_name, "", &err));
                    continue;
                }
            },
        };

        for (forum_name, posts) in forums {
            let forum_tags = tags_for(category_name);

            let forum = match snapshot.forum(forum_name) {
                Some(existing) => {
                    let existing = existing.clone();
                    // Re-issue the tag vocabulary so pre-existing forums
                    // stay current; the overwrite is idempotent.
                    if let Err(err) = remote.update_forum_tags(existing.id, &forum_tags).await {
                        warn!(forum = %forum_name, error = %err, "failed to refresh forum tags");
                        report
                            .failed_forums
                            .push(FailureRecord::new(forum_name, category_name, &err));
                        continue;
                    }
                    info!(forum = %forum_name, "forum already exists, skipping creation");
                    existing
                }
                None => {
                    match remote
                        .create_forum(guild, forum_name, category.id, &forum_tags)
                        .await
                    {
                        Ok(created) => {
                            info!(
                                forum = %forum_name,
                                category = %category_name,
                                id = %created.id,
                                "created forum"
                            );
                            report.created_forums += 1;
                            snapshot.register_forum(forum_name, created.clone());
                            sleep(pacing.forum).await;
                            created
                        }
                        Err(err) => {
                            report
                                .failed_forums
                                .push(FailureRecord::new(forum_name, category_name, &err));
                            continue;
                        }
                    }
                }
            };

            for post in posts {
                // Exact title match, deliberately not normalized: titles are
                // the catalog's primary key and must not collide on
                // near-matches.
                if snapshot.has_post(forum_name, &post.title) {
                    info!(post = %post.title, forum = %forum_name, "post already exists, skipping");
                    report.skipped_posts += 1;
                    continue;
                }

                let applied: Vec<ForumTag> = forum_tags
                    .iter()
                    .filter(|t| post.tags.contains(&t.name))
                    .cloned()
                    .collect();

                match remote
                    .create_thread(
                        forum.id,
                        &post.title,
                        &post.body_text,
                        &applied,
                        AUTO_ARCHIVE_MINUTES,
                    )
                    .await
                {
                    Ok(_) => {
                        info!(post = %post.title, forum = %forum_name, "created post");
                        report.created_posts += 1;
                        snapshot.record_post(forum_name, &post.title);
                        sleep(pacing.post).await;
                    }
                    Err(err) => {
                        report
                            .failed_posts
                            .push(FailureRecord::new(&post.title, forum_name, &err));
                    }
                }
            }
        }
    }

    report.log_failures();
    info!(
        created = report.created_count(),
        skipped = report.skipped_posts,
        failed = report.failure_count(),
        "reconciliation complete"
    );
    report
}
