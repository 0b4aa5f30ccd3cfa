// extension.rs — Extension subcommands: request, approve, reject.

use clap::Subcommand;
use uuid::Uuid;

use lf_engine::{Engine, EngineConfig};
use lf_store::Extension;

use super::Scope;

#[derive(Subcommand)]
pub enum ExtensionCommands {
    /// Ask for more time on a lead's deadline.
    Request {
        /// Lead ID.
        lead: Uuid,
        /// Stage the extension applies to.
        #[arg(long)]
        stage: String,
        /// Extra hours requested.
        #[arg(long)]
        hours: i64,
        /// Why the extension is needed.
        #[arg(long)]
        reason: String,
    },
    /// Approve a pending extension.
    Approve {
        /// Extension ID.
        id: Uuid,
    },
    /// Reject a pending extension.
    Reject {
        /// Extension ID.
        id: Uuid,
        /// Why the request was turned down.
        #[arg(long)]
        reason: String,
    },
}

pub fn execute(cmd: &ExtensionCommands, config: &EngineConfig, scope: &Scope) -> anyhow::Result<()> {
    let tenant = scope.tenant()?;
    let actor = scope.actor()?;
    let engine = Engine::open(config)?;

    let extension = match cmd {
        ExtensionCommands::Request {
            lead,
            stage,
            hours,
            reason,
        } => engine.request_extension(tenant, *lead, stage, actor, *hours, reason)?,
        ExtensionCommands::Approve { id } => engine.approve_extension(tenant, *id, actor)?,
        ExtensionCommands::Reject { id, reason } => {
            engine.reject_extension(tenant, *id, actor, reason)?
        }
    };
    print_extension(&extension);
    Ok(())
}

fn print_extension(extension: &Extension) {
    println!("Extension {}: {}", extension.extension_id, extension.status);
    println!("  Lead:  {}", extension.lead_id);
    println!("  Stage: {}", extension.stage);
    println!("  Hours: {}", extension.hours);
    if let Some(reason) = &extension.decision_reason {
        println!("  Note:  {}", reason);
    }
}
