// directory.rs — User and team subcommands.

use clap::Subcommand;
use uuid::Uuid;

use lf_engine::{Engine, EngineConfig};
use lf_store::Role;

use super::Scope;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user to the tenant.
    Add {
        /// Display name.
        name: String,
        /// Role (owner, team_leader, sales). Repeat for several.
        #[arg(long = "role", required = true)]
        roles: Vec<Role>,
        /// Team the user belongs to.
        #[arg(long)]
        team: Option<Uuid>,
    },
    /// List the tenant's users.
    List,
}

#[derive(Subcommand)]
pub enum TeamCommands {
    /// Add a team.
    Add {
        /// Team name.
        name: String,
        /// Team leader's user id.
        #[arg(long)]
        leader: Option<Uuid>,
    },
}

pub fn execute_user(cmd: &UserCommands, config: &EngineConfig, scope: &Scope) -> anyhow::Result<()> {
    let tenant = scope.tenant()?;
    let engine = Engine::open(config)?;

    match cmd {
        UserCommands::Add { name, roles, team } => {
            let user = engine.add_user(tenant, name, roles.clone(), *team)?;
            println!("User added: {}", user.user_id);
            println!("  Name:  {}", user.name);
            let roles: Vec<String> = user.roles.iter().map(|r| r.to_string()).collect();
            println!("  Roles: {}", roles.join(", "));
            Ok(())
        }
        UserCommands::List => {
            let users = engine
                .store()
                .read(tenant, |records| records.users.values().cloned().collect::<Vec<_>>());
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            println!("{:<38} {:<20} {:<10} ROLES", "ID", "NAME", "STATUS");
            for user in users {
                let roles: Vec<String> = user.roles.iter().map(|r| r.to_string()).collect();
                println!(
                    "{:<38} {:<20} {:<10} {}",
                    user.user_id,
                    user.name,
                    format!("{:?}", user.status).to_lowercase(),
                    roles.join(",")
                );
            }
            Ok(())
        }
    }
}

pub fn execute_team(cmd: &TeamCommands, config: &EngineConfig, scope: &Scope) -> anyhow::Result<()> {
    let tenant = scope.tenant()?;
    let engine = Engine::open(config)?;

    match cmd {
        TeamCommands::Add { name, leader } => {
            let team = engine.add_team(tenant, name, *leader)?;
            println!("Team added: {}", team.team_id);
            println!("  Name: {}", team.name);
            Ok(())
        }
    }
}
