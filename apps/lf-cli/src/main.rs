//! # lf-cli
//!
//! Command-line interface for leadflow.
//!
//! - `leadflow user add` / `leadflow team add` — manage the tenant directory
//! - `leadflow lead create/transition/undo/show/surrender/resolve` — move leads through the pipeline
//! - `leadflow extension request/approve/reject` — negotiate deadline extensions
//! - `leadflow goal plan/target/pin/report/check` — goal plans and achievement
//! - `leadflow activity call/meeting/deal/approve-deal/approve-closure` — record metric inputs
//! - `leadflow sweep` — one deadline sweep over every tenant
//! - `leadflow daemon` — sweep on a timer until Ctrl-C

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use lf_engine::EngineConfig;

/// leadflow — sales pipeline deadlines and goal tracking.
#[derive(Parser)]
#[command(name = "leadflow", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Tenant the command operates on.
    #[arg(long, global = true)]
    tenant: Option<Uuid>,

    /// User performing the action.
    #[arg(long, global = true)]
    actor: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users.
    User {
        #[command(subcommand)]
        command: commands::directory::UserCommands,
    },
    /// Manage teams.
    Team {
        #[command(subcommand)]
        command: commands::directory::TeamCommands,
    },
    /// Create leads and move them through the pipeline.
    Lead {
        #[command(subcommand)]
        command: commands::lead::LeadCommands,
    },
    /// Request and decide deadline extensions.
    Extension {
        #[command(subcommand)]
        command: commands::extension::ExtensionCommands,
    },
    /// Goal plans, targets, and achievement.
    Goal {
        #[command(subcommand)]
        command: commands::goal::GoalCommands,
    },
    /// Record calls, meetings, and deals.
    Activity {
        #[command(subcommand)]
        command: commands::activity::ActivityCommands,
    },
    /// Run one deadline sweep over every tenant.
    Sweep,
    /// Sweep every tenant on a timer until interrupted.
    Daemon {
        /// Seconds between sweeps (overrides config).
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("lf_engine=info".parse()?)
                .add_directive("lf_lifecycle=info".parse()?)
                .add_directive("lf_goals=info".parse()?)
                .add_directive("lf_events=info".parse()?)
                .add_directive("lf_store=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = EngineConfig::load(&project_root)?;
    let scope = commands::Scope {
        tenant: cli.tenant,
        actor: cli.actor,
    };

    match &cli.command {
        Commands::User { command } => commands::directory::execute_user(command, &config, &scope),
        Commands::Team { command } => commands::directory::execute_team(command, &config, &scope),
        Commands::Lead { command } => commands::lead::execute(command, &config, &scope),
        Commands::Extension { command } => commands::extension::execute(command, &config, &scope),
        Commands::Goal { command } => commands::goal::execute(command, &config, &scope),
        Commands::Activity { command } => commands::activity::execute(command, &config, &scope),
        Commands::Sweep => commands::sweep::execute_once(&config),
        Commands::Daemon { interval_secs } => commands::sweep::execute_daemon(&config, *interval_secs),
    }
}
