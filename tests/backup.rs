//! Backup snapshot engine: full exports, incremental outcomes, round-trip.

use chrono::{DateTime, TimeZone, Utc};
use curator::backup::{full_export, incremental_export, UpdateOutcome};
use curator::catalog::Catalog;
use curator::checkpoint;
use curator::remote::memory::MemoryRemote;
use curator::remote::{
    ChannelId, MessageId, RemoteMessage, RemoteThread, ThreadId,
};

fn utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn offset_utc() -> chrono::FixedOffset {
    chrono::FixedOffset::east_opt(0).unwrap()
}

fn message(id: u64, content: &str, at: i64) -> RemoteMessage {
    RemoteMessage {
        id: MessageId(id),
        content: content.to_string(),
        created_at: Some(utc(at)),
    }
}

fn thread(id: u64, title: &str, created: i64) -> RemoteThread {
    RemoteThread {
        id: ThreadId(id),
        name: title.to_string(),
        applied_tags: Vec::new(),
        created_at: Some(utc(created)),
        starter_message: None,
        last_message: None,
    }
}

/// A guild with one category, one forum, and three threads exercising all
/// three starter-message tiers.
fn seed_guild(remote: &MemoryRemote) -> ChannelId {
    let cat = remote.seed_category("Designers");
    let forum = remote.seed_forum("Lace Shawls", Some(cat.id), &[]);

    // Tier 1: starter cached in the listing.
    let mut cached = thread(100, "Evening Star", 1_000);
    cached.applied_tags = vec!["Accessory".to_string(), "Neckwear".to_string()];
    cached.starter_message = Some(message(100, "https://example.org/p/1", 1_000));
    remote.seed_thread(forum.id, cached);

    // Tier 2: no cached starter, but fetchable by the thread's own id.
    let fetched = thread(101, "Morning Mist", 2_000);
    remote.seed_archived_thread(forum.id, fetched);
    remote.insert_message(ThreadId(101), message(101, "https://example.org/p/2", 2_000));

    // Tier 3: starter gone entirely - exported with empty content.
    remote.seed_thread(forum.id, thread(102, "Lost Pattern", 3_000));

    forum.id
}

#[tokio::test]
async fn full_export_writes_all_threads_and_advances_checkpoint() {
    let remote = MemoryRemote::new("Wool Guild");
    seed_guild(&remote);
    let dir = tempfile::tempdir().unwrap();
    let checkpoint_file = dir.path().join("last_backup.txt");

    let report = full_export(
        &remote,
        MemoryRemote::GUILD,
        &dir.path().join("backups"),
        &checkpoint_file,
    )
    .await
    .unwrap();

    assert_eq!(report.rows, 3);
    assert!(report.skipped_forums.is_empty());
    assert_eq!(
        report.path.file_name().unwrap().to_str().unwrap(),
        "Wool Guild backup.csv"
    );
    assert!(checkpoint::load(&checkpoint_file).unwrap().is_some());

    let body = std::fs::read_to_string(&report.path).unwrap();
    let mut lines = body.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Category,Forum Name,Title,Tags,Ravelry Link/Message,Catbox Link,Date Created"
    );
    assert!(body.contains("Evening Star"));
    assert!(body.contains("https://example.org/p/1"));
    // Tier 2 starter was resolved through an explicit fetch.
    assert!(body.contains("https://example.org/p/2"));
    assert!(body.contains("1970-01-01 00:16:40"));
}

#[tokio::test]
async fn missing_starter_becomes_empty_field_not_an_error() {
    let remote = MemoryRemote::new("Wool Guild");
    seed_guild(&remote);
    let dir = tempfile::tempdir().unwrap();

    let report = full_export(
        &remote,
        MemoryRemote::GUILD,
        &dir.path().join("backups"),
        &dir.path().join("last_backup.txt"),
    )
    .await
    .unwrap();

    let mut reader = csv::Reader::from_path(&report.path).unwrap();
    let rows: Vec<curator::catalog::ExportRow> =
        reader.deserialize().collect::<Result<_, _>>().unwrap();
    let lost = rows.iter().find(|r| r.title == "Lost Pattern").unwrap();
    assert_eq!(lost.message, "");
}

#[tokio::test]
async fn forum_with_unreadable_threads_is_skipped_and_reported() {
    let remote = MemoryRemote::new("Wool Guild");
    seed_guild(&remote);
    let cat2 = remote.seed_category("Publisher");
    let broken = remote.seed_forum("Back Issues", Some(cat2.id), &[]);
    remote.fail_thread_listing(broken.id);

    let dir = tempfile::tempdir().unwrap();
    let report = full_export(
        &remote,
        MemoryRemote::GUILD,
        &dir.path().join("backups"),
        &dir.path().join("last_backup.txt"),
    )
    .await
    .unwrap();

    assert_eq!(report.rows, 3);
    assert_eq!(report.skipped_forums, ["Back Issues"]);
}

#[tokio::test]
async fn incremental_without_checkpoint_reads_nothing_from_the_guild() {
    let remote = MemoryRemote::new("Wool Guild");
    seed_guild(&remote);
    let dir = tempfile::tempdir().unwrap();

    let outcome = incremental_export(
        &remote,
        MemoryRemote::GUILD,
        &dir.path().join("updates"),
        &dir.path().join("absent.txt"),
        offset_utc(),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, UpdateOutcome::NoPriorBackup));
    assert_eq!(remote.read_count(), 0);
}

#[tokio::test]
async fn incremental_with_no_qualifying_threads_leaves_checkpoint_alone() {
    let remote = MemoryRemote::new("Wool Guild");
    seed_guild(&remote);
    let dir = tempfile::tempdir().unwrap();
    let checkpoint_file = dir.path().join("last_backup.txt");
    // Everything in the guild predates the checkpoint.
    let stamp = utc(10_000);
    checkpoint::save(&checkpoint_file, stamp).unwrap();

    let outcome = incremental_export(
        &remote,
        MemoryRemote::GUILD,
        &dir.path().join("updates"),
        &checkpoint_file,
        offset_utc(),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, UpdateOutcome::NoChanges));
    assert_eq!(checkpoint::load(&checkpoint_file).unwrap(), Some(stamp));
    assert!(!dir.path().join("updates").exists());
}

#[tokio::test]
async fn incremental_keeps_only_strictly_newer_activity() {
    let remote = MemoryRemote::new("Wool Guild");
    let forum = seed_guild(&remote);
    let dir = tempfile::tempdir().unwrap();
    let checkpoint_file = dir.path().join("last_backup.txt");
    checkpoint::save(&checkpoint_file, utc(2_500)).unwrap();

    // Old thread, but its last message is newer than the checkpoint.
    let mut revived = thread(103, "Revived Pattern", 500);
    revived.starter_message = Some(message(103, "old starter", 500));
    revived.last_message = Some(message(900, "fresh reply", 9_000));
    remote.seed_thread(forum, revived);

    let outcome = incremental_export(
        &remote,
        MemoryRemote::GUILD,
        &dir.path().join("updates"),
        &checkpoint_file,
        offset_utc(),
    )
    .await
    .unwrap();

    let UpdateOutcome::Written { path, rows, digest } = outcome else {
        panic!("expected a written update");
    };
    // "Lost Pattern" (created 3000) and "Revived Pattern" qualify; the two
    // threads whose activity predates 2500 do not.
    assert_eq!(rows, 2);
    assert!(digest.contains("old starter"));
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("Update 01.01.70_0041_to_"), "got {name}");

    // The checkpoint moved forward.
    let advanced = checkpoint::load(&checkpoint_file).unwrap().unwrap();
    assert!(advanced > utc(2_500));
}

#[tokio::test]
async fn export_round_trips_through_the_catalog_loader() {
    let remote = MemoryRemote::new("Wool Guild");
    seed_guild(&remote);
    let dir = tempfile::tempdir().unwrap();

    let report = full_export(
        &remote,
        MemoryRemote::GUILD,
        &dir.path().join("backups"),
        &dir.path().join("last_backup.txt"),
    )
    .await
    .unwrap();

    let reloaded = Catalog::load(&report.path).unwrap();
    assert_eq!(reloaded.post_count(), 3);

    let posts = &reloaded.categories["Designers"]["Lace Shawls"];
    let star = posts.iter().find(|p| p.title == "Evening Star").unwrap();
    assert_eq!(star.body_text, "https://example.org/p/1");
    let tags: Vec<_> = star.tags.iter().cloned().collect();
    assert_eq!(tags, ["Accessory", "Neckwear"]);

    // Empty starter content comes back as the "." body fallback.
    let lost = posts.iter().find(|p| p.title == "Lost Pattern").unwrap();
    assert_eq!(lost.body_text, ".");
}
