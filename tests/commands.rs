//! Command surface: permission gating, confirmation gating, lookup.

use std::fs;
use std::path::Path;

use curator::commands::{self, CommandContext, CommandError, CreateOutcome, LookupOutcome};
use curator::config::{DataLayout, ServerProfile};
use curator::reconcile::Pacing;
use curator::remote::memory::MemoryRemote;
use curator::remote::{MessageId, RemoteMessage, ThreadId, UserId};
use curator::roles::RoleStore;

const ADMIN: UserId = UserId(10);
const OWNER: UserId = UserId(11);
const MEMBER: UserId = UserId(12);
const STRANGER: UserId = UserId(13);

fn roles(dir: &Path) -> RoleStore {
    let mut store = RoleStore::load(&dir.join("roles.json")).unwrap();
    store.assign(ADMIN, "ADMIN").unwrap();
    store.assign(OWNER, "OWNER").unwrap();
    store.assign(MEMBER, "VERIFIED").unwrap();
    store
}

fn profile(dir: &Path) -> ServerProfile {
    ServerProfile::new(
        MemoryRemote::GUILD,
        dir.join("index.csv"),
        dir.join("last_backup.txt"),
    )
}

fn write_index(dir: &Path) {
    fs::write(
        dir.join("index.csv"),
        "Category,Forum Name,Title,Ravelry Link/Message,Tags,Catbox link\n\
         Designers,Lace Shawls,Evening Star,msg,Accessory,\n",
    )
    .unwrap();
}

#[tokio::test]
async fn create_is_denied_below_admin() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MemoryRemote::new("Guild");
    let roles = roles(dir.path());
    let profile = profile(dir.path());
    let layout = DataLayout::new(dir.path());
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::none(),
    };

    for caller in [MEMBER, STRANGER] {
        let err = commands::create(&ctx, caller, true).await.unwrap_err();
        assert!(matches!(err, CommandError::Permission(_)));
    }
    assert_eq!(remote.read_count(), 0);
    assert_eq!(remote.mutation_count(), 0);
}

#[tokio::test]
async fn unconfirmed_create_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MemoryRemote::new("Guild");
    let roles = roles(dir.path());
    let profile = profile(dir.path());
    let layout = DataLayout::new(dir.path());
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::none(),
    };

    let outcome = commands::create(&ctx, ADMIN, false).await.unwrap();
    assert!(matches!(outcome, CreateOutcome::ConfirmationRequired));
    assert_eq!(remote.read_count(), 0);
    assert_eq!(remote.mutation_count(), 0);
}

#[tokio::test]
async fn confirmed_create_materializes_the_catalog() {
    let dir = tempfile::tempdir().unwrap();
    write_index(dir.path());
    let remote = MemoryRemote::new("Guild");
    let roles = roles(dir.path());
    let profile = profile(dir.path());
    let layout = DataLayout::new(dir.path());
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::none(),
    };

    let outcome = commands::create(&ctx, ADMIN, true).await.unwrap();
    let CreateOutcome::Completed(report) = outcome else {
        panic!("expected a completed run");
    };
    assert!(report.is_clean());
    assert_eq!(report.created_categories, 1);
    assert_eq!(report.created_forums, 1);
    assert_eq!(report.created_posts, 1);
}

#[tokio::test]
async fn backup_and_update_require_owner() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MemoryRemote::new("Guild");
    let roles = roles(dir.path());
    let profile = profile(dir.path());
    let layout = DataLayout::new(dir.path());
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::none(),
    };

    // Admin is not enough for either backup flavor.
    let err = commands::backup(&ctx, ADMIN).await.unwrap_err();
    assert!(matches!(err, CommandError::Permission(_)));
    let err = commands::update(&ctx, ADMIN).await.unwrap_err();
    assert!(matches!(err, CommandError::Permission(_)));

    let report = commands::backup(&ctx, OWNER).await.unwrap();
    assert_eq!(report.rows, 0);
}

#[tokio::test]
async fn lookup_finds_the_starter_field() {
    let dir = tempfile::tempdir().unwrap();
    let remote = MemoryRemote::new("Guild");
    let cat = remote.seed_category("Designers");
    let forum = remote.seed_forum("Lace Shawls", Some(cat.id), &[]);
    let mut thread = MemoryRemote::thread(ThreadId(100), "Evening Star");
    thread.starter_message = Some(RemoteMessage {
        id: MessageId(100),
        content: "https://example.org/p/1".to_string(),
        created_at: None,
    });
    remote.seed_thread(forum.id, thread);

    let roles = roles(dir.path());
    let profile = profile(dir.path());
    let layout = DataLayout::new(dir.path());
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::none(),
    };

    // Forum names are matched with normalization; titles exactly.
    let found = commands::lookup(&ctx, MEMBER, "lace   shawls!", "Evening Star")
        .await
        .unwrap();
    assert_eq!(
        found,
        LookupOutcome::Found {
            title: "Evening Star".to_string(),
            message: "https://example.org/p/1".to_string(),
        }
    );

    let missing_thread = commands::lookup(&ctx, MEMBER, "Lace Shawls", "evening star")
        .await
        .unwrap();
    assert_eq!(missing_thread, LookupOutcome::ThreadNotFound);

    let missing_forum = commands::lookup(&ctx, MEMBER, "Knit Alongs", "Evening Star")
        .await
        .unwrap();
    assert_eq!(missing_forum, LookupOutcome::ForumNotFound);

    let err = commands::lookup(&ctx, STRANGER, "Lace Shawls", "Evening Star")
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Permission(_)));
}

#[tokio::test]
async fn assign_role_validates_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = RoleStore::load(&dir.path().join("roles.json")).unwrap();

    commands::assign_role(&mut store, UserId(99), "trusted").unwrap();
    let reloaded = RoleStore::load(&dir.path().join("roles.json")).unwrap();
    assert_eq!(reloaded.role_of(UserId(99)), curator::roles::Role::Trusted);

    let err = commands::assign_role(&mut store, UserId(99), "WIZARD").unwrap_err();
    assert!(matches!(err, CommandError::Role(_)));
}
