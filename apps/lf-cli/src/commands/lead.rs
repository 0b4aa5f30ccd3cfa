// lead.rs — Lead subcommands: create, transition, undo, show, surrender, resolve.

use clap::Subcommand;
use uuid::Uuid;

use lf_engine::{Engine, EngineConfig, StageResult};

use super::{parse_answers, print_json, Scope};

#[derive(Subcommand)]
pub enum LeadCommands {
    /// Create a lead.
    Create {
        /// Lead name (usually the client).
        name: String,
        /// User the lead is assigned to. The lead joins that user's team.
        #[arg(long)]
        assignee: Option<Uuid>,
    },
    /// Move a lead into a stage.
    Transition {
        /// Lead ID.
        lead: Uuid,
        /// Target stage code (call, meeting, site_visit, closing).
        stage: String,
        /// Stage answer as key=value. Repeat for several.
        #[arg(long = "answer")]
        answers: Vec<String>,
    },
    /// Reverse the lead's most recent transition.
    Undo {
        /// Lead ID.
        lead: Uuid,
    },
    /// Show a lead with its history, deadline, extensions, and failures.
    Show {
        /// Lead ID.
        lead: Uuid,
    },
    /// Give up on a lead.
    Surrender {
        /// Lead ID.
        lead: Uuid,
        /// Why the lead is being given up.
        #[arg(long)]
        reason: String,
    },
    /// Resolve a pending failure with an explanation.
    Resolve {
        /// Failure ID.
        failure: Uuid,
        /// Resolution note.
        #[arg(long)]
        reason: String,
    },
}

pub fn execute(cmd: &LeadCommands, config: &EngineConfig, scope: &Scope) -> anyhow::Result<()> {
    let tenant = scope.tenant()?;
    let engine = Engine::open(config)?;

    match cmd {
        LeadCommands::Create { name, assignee } => {
            let actor = scope.actor()?;
            let lead = engine.create_lead(tenant, name, *assignee, actor)?;
            println!("Lead created: {}", lead.lead_id);
            println!("  Name:     {}", lead.name);
            if let Some(user) = lead.assigned_user_id {
                println!("  Assignee: {}", user);
            }
            Ok(())
        }
        LeadCommands::Transition {
            lead,
            stage,
            answers,
        } => {
            let actor = scope.actor()?;
            let answers = parse_answers(answers)?;
            let result = engine.transition_lead(tenant, *lead, stage, actor, Some(answers))?;
            print_stage_result("Transitioned", &result);
            Ok(())
        }
        LeadCommands::Undo { lead } => {
            let actor = scope.actor()?;
            let result = engine.undo_last_transition(tenant, *lead, actor)?;
            print_stage_result("Undone", &result);
            Ok(())
        }
        LeadCommands::Show { lead } => print_json(&engine.lead_snapshot(tenant, *lead)?),
        LeadCommands::Surrender { lead, reason } => {
            let actor = scope.actor()?;
            let failure = engine.surrender_lead(tenant, *lead, actor, reason)?;
            println!("Lead surrendered: {}", lead);
            println!("  Failure: {}", failure.failure_id);
            Ok(())
        }
        LeadCommands::Resolve { failure, reason } => {
            let actor = scope.actor()?;
            let failure = engine.resolve_failure(tenant, *failure, actor, reason)?;
            println!("Failure resolved: {}", failure.failure_id);
            Ok(())
        }
    }
}

fn print_stage_result(verb: &str, result: &StageResult) {
    println!(
        "{} {}: {} -> {}",
        verb,
        result.lead_id,
        result.from_state.as_deref().unwrap_or("(new)"),
        result.to_state
    );
    if let Some(deadline) = result.deadline_id {
        let note = if result.deadline_opened { "opened" } else { "kept" };
        println!("  Deadline: {} ({})", deadline, note);
    }
    if let Some(closure) = result.closure_id {
        println!("  Closure:  {} (awaiting approval)", closure);
    }
}
