//! Curator CLI.
//!
//! One parameterized entrypoint: every command takes the guild profile
//! (id, index file, checkpoint file, timezone) from flags or environment.

use std::io::{self, Write as _};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curator::{
    backup::UpdateOutcome,
    commands::{self, CommandContext, CreateOutcome, LookupOutcome},
    config::{parse_utc_offset, DataLayout, ServerProfile},
    keepalive,
    reconcile::Pacing,
    remote::rest::RestRemote,
    remote::{GuildId, UserId},
    roles::RoleStore,
};

/// Catalog-driven forum curation for chat-platform guilds.
#[derive(Parser)]
#[command(name = "curator", about = "Catalog-driven forum curation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RemoteArgs {
    /// Platform API base URL.
    #[arg(long, env = "REMOTE_API_URL")]
    api_url: String,

    /// Bot token for the platform API.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Args)]
struct ProfileArgs {
    /// Guild to operate on.
    #[arg(long, env = "SERVER_ID")]
    server_id: u64,

    /// Catalog index file driving creation.
    #[arg(long, env = "INDEX_FILE", default_value = "data/backups/backup.csv")]
    index_file: PathBuf,

    /// Checkpoint file recording the last successful backup.
    #[arg(
        long,
        env = "LAST_BACKUP_FILE",
        default_value = "data/backups/last_backup.txt"
    )]
    checkpoint_file: PathBuf,

    /// Local timezone for incremental export names ('UTC' or '+HH:MM').
    #[arg(long, env = "LOCAL_UTC_OFFSET", default_value = "UTC")]
    utc_offset: String,

    /// Root directory for exports and the role store.
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
}

#[derive(Args)]
struct CallerArgs {
    /// Acting user for permission checks.
    #[arg(long, env = "OWNER_ID")]
    user_id: u64,
}

#[derive(Args)]
struct DataArgs {
    /// Root directory for exports and the role store.
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize the catalog into the guild's categories, forums, and posts.
    Create {
        #[command(flatten)]
        remote: RemoteArgs,
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        caller: CallerArgs,

        /// Skip the interactive confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Export the whole guild to CSV and advance the checkpoint.
    Backup {
        #[command(flatten)]
        remote: RemoteArgs,
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        caller: CallerArgs,
    },

    /// Export threads changed since the last backup.
    Update {
        #[command(flatten)]
        remote: RemoteArgs,
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        caller: CallerArgs,
    },

    /// Fetch one thread's starter field.
    Lookup {
        #[command(flatten)]
        remote: RemoteArgs,
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        caller: CallerArgs,

        /// Forum name (matched with normalization).
        #[arg(long)]
        forum: String,

        /// Exact thread title.
        #[arg(long)]
        title: String,
    },

    /// Set a user's role in the local role store.
    AssignRole {
        #[command(flatten)]
        data: DataArgs,

        /// User whose role to set.
        #[arg(long)]
        target: u64,

        /// Role name (UNVERIFIED, VERIFIED, TRUSTED, ADMIN, OWNER).
        #[arg(long)]
        role: String,
    },

    /// Run the keep-alive listener.
    Serve {
        /// Address to bind.
        #[arg(long, env = "CURATOR_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curator=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Create {
            remote,
            profile,
            caller,
            yes,
        } => run_create(remote, profile, caller, yes).await?,
        Commands::Backup {
            remote,
            profile,
            caller,
        } => run_backup(remote, profile, caller).await?,
        Commands::Update {
            remote,
            profile,
            caller,
        } => run_update(remote, profile, caller).await?,
        Commands::Lookup {
            remote,
            profile,
            caller,
            forum,
            title,
        } => run_lookup(remote, profile, caller, &forum, &title).await?,
        Commands::AssignRole { data, target, role } => run_assign_role(data, target, &role)?,
        Commands::Serve { bind } => keepalive::serve(&bind).await?,
    }

    Ok(())
}

fn build_profile(args: &ProfileArgs) -> Result<(ServerProfile, DataLayout)> {
    let offset = parse_utc_offset(&args.utc_offset)?;
    let profile = ServerProfile::new(
        GuildId(args.server_id),
        args.index_file.clone(),
        args.checkpoint_file.clone(),
    )
    .with_utc_offset(offset);
    Ok((profile, DataLayout::new(args.data_dir.clone())))
}

async fn run_create(
    remote_args: RemoteArgs,
    profile_args: ProfileArgs,
    caller_args: CallerArgs,
    yes: bool,
) -> Result<()> {
    let (profile, layout) = build_profile(&profile_args)?;
    let roles = RoleStore::load(&layout.roles_file())?;
    let remote = RestRemote::new(remote_args.api_url, remote_args.token);
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::default(),
    };
    let caller = UserId(caller_args.user_id);

    let mut outcome = commands::create(&ctx, caller, yes).await?;
    if matches!(outcome, CreateOutcome::ConfirmationRequired) {
        if !prompt_confirm()? {
            println!("Aborted.");
            return Ok(());
        }
        outcome = commands::create(&ctx, caller, true).await?;
    }

    if let CreateOutcome::Completed(report) = outcome {
        println!("{report}");
        if !report.is_clean() {
            println!("Some operations failed; re-run the command after fixing the causes.");
        }
    }
    Ok(())
}

fn prompt_confirm() -> Result<bool> {
    print!("This will create categories, forums, and posts in the guild. Continue? [y/N] ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

async fn run_backup(
    remote_args: RemoteArgs,
    profile_args: ProfileArgs,
    caller_args: CallerArgs,
) -> Result<()> {
    let (profile, layout) = build_profile(&profile_args)?;
    let roles = RoleStore::load(&layout.roles_file())?;
    let remote = RestRemote::new(remote_args.api_url, remote_args.token);
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::default(),
    };

    let report = commands::backup(&ctx, UserId(caller_args.user_id)).await?;
    println!(
        "Backup complete: {} threads written to {}",
        report.rows,
        report.path.display()
    );
    for forum in &report.skipped_forums {
        println!("  skipped forum (threads unavailable): {forum}");
    }
    Ok(())
}

async fn run_update(
    remote_args: RemoteArgs,
    profile_args: ProfileArgs,
    caller_args: CallerArgs,
) -> Result<()> {
    let (profile, layout) = build_profile(&profile_args)?;
    let roles = RoleStore::load(&layout.roles_file())?;
    let remote = RestRemote::new(remote_args.api_url, remote_args.token);
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::default(),
    };

    match commands::update(&ctx, UserId(caller_args.user_id)).await? {
        UpdateOutcome::NoPriorBackup => {
            println!("No previous backup found. Run the backup command first.");
        }
        UpdateOutcome::NoChanges => {
            println!("No new or updated threads found since the last backup.");
        }
        UpdateOutcome::Written { path, rows, digest } => {
            println!("Update saved: {} threads written to {}", rows, path.display());
            println!("Captured links/messages:\n{digest}");
        }
    }
    Ok(())
}

async fn run_lookup(
    remote_args: RemoteArgs,
    profile_args: ProfileArgs,
    caller_args: CallerArgs,
    forum: &str,
    title: &str,
) -> Result<()> {
    let (profile, layout) = build_profile(&profile_args)?;
    let roles = RoleStore::load(&layout.roles_file())?;
    let remote = RestRemote::new(remote_args.api_url, remote_args.token);
    let ctx = CommandContext {
        remote: &remote,
        roles: &roles,
        profile: &profile,
        layout: &layout,
        pacing: Pacing::default(),
    };

    match commands::lookup(&ctx, UserId(caller_args.user_id), forum, title).await? {
        LookupOutcome::ForumNotFound => println!("No forum named '{forum}' found."),
        LookupOutcome::ThreadNotFound => {
            println!("No thread titled '{title}' found in forum '{forum}'.");
        }
        LookupOutcome::Found { title, message } => {
            if message.is_empty() {
                println!("'{title}' has no starter message content.");
            } else {
                println!("{message}");
            }
        }
    }
    Ok(())
}

fn run_assign_role(data_args: DataArgs, target: u64, role: &str) -> Result<()> {
    let layout = DataLayout::new(data_args.data_dir);
    let mut roles = RoleStore::load(&layout.roles_file())?;

    let assigned = commands::assign_role(&mut roles, UserId(target), role)?;
    println!("Assigned {assigned} to user {target}.");
    Ok(())
}
