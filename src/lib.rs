//! Curator - catalog-driven forum curation for chat-platform guilds.
//!
//! Curator keeps a guild's category/forum/thread hierarchy in sync with a
//! flat tabular catalog, and snapshots the hierarchy back out again.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       CATALOG (CSV)                      │
//! │  One row per desired post, grouped category → forum      │
//! └──────────────────────────────┬───────────────────────────┘
//!                                │ load
//! ┌──────────────────────────────┴───────────────────────────┐
//! │                   RECONCILIATION ENGINE                  │
//! │  Diffs catalog against a live guild snapshot and issues  │
//! │  the minimal creations: idempotent, paced, failure-      │
//! │  isolated per item                                       │
//! └──────────────────────────────┬───────────────────────────┘
//!                                │ RemoteApi
//! ┌──────────────────────────────┴───────────────────────────┐
//! │                       GUILD (remote)                     │
//! │  Categories, forum channels, threads; walked back out by │
//! │  the backup engine (full + checkpoint-gated incremental) │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key properties
//!
//! - **Idempotent**: a second run over unchanged state issues zero mutations
//! - **Failure-isolated**: one bad item prunes only its own subtree
//! - **Paced**: every mutation is followed by a courtesy delay
//! - **Re-runnable**: a crash mid-run leaves state that is safe to re-run

// === Core Engines ===

/// Reconciliation engine: diff-and-create traversal.
pub mod reconcile;

/// Backup snapshot engine: full and incremental tabular exports.
pub mod backup;

// === Supporting Modules ===

/// Catalog loading and tabular row shapes.
pub mod catalog;

/// Last-backup checkpoint persistence.
pub mod checkpoint;

/// Command surface with permission gating.
pub mod commands;

/// Server profiles and local data layout.
pub mod config;

/// Keep-alive web listener.
pub mod keepalive;

/// Name canonicalization for fuzzy matching.
pub mod normalize;

/// Remote platform interface and implementations.
pub mod remote;

/// Roles and the permission gate.
pub mod roles;

/// Per-category tag vocabularies.
pub mod tags;

// === Re-exports ===

pub use backup::{BackupReport, UpdateOutcome};
pub use catalog::{Catalog, CatalogEntry, ExportRow};
pub use reconcile::{FailureRecord, Pacing, ReconcileReport};
pub use remote::snapshot::GuildSnapshot;
pub use remote::{GuildId, RemoteApi, RemoteChannel, UserId};
pub use roles::{Role, RoleStore};
