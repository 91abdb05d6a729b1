//! Command surface.
//!
//! The four caller operations, each headed by an explicit permission
//! guard. Handlers return structured outcomes; rendering them is the
//! caller's concern. `create` supports confirmation gating: an unconfirmed
//! request comes back as [`CreateOutcome::ConfirmationRequired`] without a
//! single remote call.

use thiserror::Error;
use tracing::info;

use crate::backup::{self, BackupError, BackupReport, UpdateOutcome};
use crate::catalog::{Catalog, CatalogError};
use crate::config::{DataLayout, ServerProfile};
use crate::normalize::normalize;
use crate::reconcile::{reconcile, Pacing, ReconcileReport};
use crate::remote::snapshot::GuildSnapshot;
use crate::remote::{RemoteApi, RemoteError, UserId};
use crate::roles::{PermissionError, Role, RoleError, RoleStore};

/// Errors a command can surface to its caller.
///
/// Item-level remote failures never appear here - they live inside the
/// returned reports. What does appear is the fatal tier: denied callers,
/// unreadable catalogs, an unreachable guild, broken local files.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The caller's role is below the command's minimum.
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// The catalog index could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The guild could not be reached at all.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The export or checkpoint machinery failed.
    #[error(transparent)]
    Backup(#[from] BackupError),

    /// The role store could not be read or written.
    #[error(transparent)]
    Role(#[from] RoleError),
}

/// Shared wiring every command runs against.
pub struct CommandContext<'a> {
    /// The guild connection.
    pub remote: &'a dyn RemoteApi,
    /// Role assignments for the permission gate.
    pub roles: &'a RoleStore,
    /// Which guild and files to operate on.
    pub profile: &'a ServerProfile,
    /// Where exports land locally.
    pub layout: &'a DataLayout,
    /// Delays between remote mutations.
    pub pacing: Pacing,
}

/// Outcome of the `create` command.
#[derive(Debug)]
pub enum CreateOutcome {
    /// The request was not confirmed; nothing was done.
    ConfirmationRequired,
    /// The reconciliation ran; partial failures are inside the report.
    Completed(ReconcileReport),
}

/// Outcome of the `lookup` command.
#[derive(Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    /// No forum matched the given name (normalized).
    ForumNotFound,
    /// The forum exists but holds no thread with that exact title.
    ThreadNotFound,
    /// The thread's starter-message field.
    Found {
        /// The thread's exact title.
        title: String,
        /// Starter message content, empty when unavailable.
        message: String,
    },
}

/// Materialize the catalog into the guild. Requires [`Role::Admin`].
pub async fn create(
    ctx: &CommandContext<'_>,
    caller: UserId,
    confirmed: bool,
) -> Result<CreateOutcome, CommandError> {
    ctx.roles.require(caller, Role::Admin)?;

    if !confirmed {
        return Ok(CreateOutcome::ConfirmationRequired);
    }

    let catalog = Catalog::load(&ctx.profile.index_file)?;
    info!(
        posts = catalog.post_count(),
        index = %ctx.profile.index_file.display(),
        "catalog loaded"
    );

    let mut snapshot = GuildSnapshot::fetch(ctx.remote, ctx.profile.server_id).await?;
    let report = reconcile(
        ctx.remote,
        ctx.profile.server_id,
        &catalog,
        &mut snapshot,
        &ctx.pacing,
    )
    .await;
    Ok(CreateOutcome::Completed(report))
}

/// Export the whole guild and advance the checkpoint. Requires [`Role::Owner`].
pub async fn backup(
    ctx: &CommandContext<'_>,
    caller: UserId,
) -> Result<BackupReport, CommandError> {
    ctx.roles.require(caller, Role::Owner)?;

    Ok(backup::full_export(
        ctx.remote,
        ctx.profile.server_id,
        &ctx.layout.backups_dir(),
        &ctx.profile.checkpoint_file,
    )
    .await?)
}

/// Export threads changed since the checkpoint. Requires [`Role::Owner`].
pub async fn update(
    ctx: &CommandContext<'_>,
    caller: UserId,
) -> Result<UpdateOutcome, CommandError> {
    ctx.roles.require(caller, Role::Owner)?;

    Ok(backup::incremental_export(
        ctx.remote,
        ctx.profile.server_id,
        &ctx.layout.updates_dir(),
        &ctx.profile.checkpoint_file,
        ctx.profile.utc_offset,
    )
    .await?)
}

/// Fetch one thread's starter field by forum name (normalized) and exact
/// title. Requires [`Role::Verified`].
pub async fn lookup(
    ctx: &CommandContext<'_>,
    caller: UserId,
    forum_name: &str,
    title: &str,
) -> Result<LookupOutcome, CommandError> {
    ctx.roles.require(caller, Role::Verified)?;

    let wanted = normalize(forum_name);
    let forums = ctx.remote.list_forum_channels(ctx.profile.server_id).await?;
    let Some(forum) = forums.into_iter().find(|f| normalize(&f.name) == wanted) else {
        return Ok(LookupOutcome::ForumNotFound);
    };

    let mut threads = ctx.remote.list_active_threads(forum.id).await?;
    threads.extend(ctx.remote.list_archived_threads(forum.id).await?);
    let Some(thread) = threads.into_iter().find(|t| t.name == title) else {
        return Ok(LookupOutcome::ThreadNotFound);
    };

    let message = backup::starter_content(ctx.remote, &thread).await;
    Ok(LookupOutcome::Found {
        title: thread.name,
        message,
    })
}

/// Validate and persist a role assignment.
///
/// Not role-gated: this edits the local store file directly, so filesystem
/// access is already the gate (and the first Owner has to come from
/// somewhere).
pub fn assign_role(
    roles: &mut RoleStore,
    target: UserId,
    role_name: &str,
) -> Result<Role, CommandError> {
    let role = roles.assign(target, role_name)?;
    info!(user = %target, role = %role, "role assigned");
    Ok(role)
}
