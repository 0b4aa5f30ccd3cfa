// activity.rs — Record calls, meetings, and deals; approve deals and closures.

use clap::Subcommand;
use rust_decimal::Decimal;
use uuid::Uuid;

use lf_engine::{Engine, EngineConfig};

use super::{parse_time, Scope};

#[derive(Subcommand)]
pub enum ActivityCommands {
    /// Log a call made by the acting user.
    Call {
        /// Lead the call was about.
        #[arg(long)]
        lead: Option<Uuid>,
        /// Call length in seconds.
        #[arg(long, default_value_t = 0)]
        duration_secs: u32,
    },
    /// Record a meeting organized by the acting user.
    Meeting {
        /// Meeting title.
        title: String,
        /// When the meeting takes place (YYYY-MM-DD or RFC 3339).
        #[arg(long)]
        at: String,
        #[arg(long)]
        lead: Option<Uuid>,
    },
    /// Record a deal awaiting approval.
    Deal {
        /// Deal price.
        price: Decimal,
        #[arg(long)]
        lead: Option<Uuid>,
    },
    /// Approve a pending deal.
    ApproveDeal {
        /// Deal ID.
        id: Uuid,
    },
    /// Approve a pending closure created by a closing transition.
    ApproveClosure {
        /// Closure ID.
        id: Uuid,
    },
}

pub fn execute(cmd: &ActivityCommands, config: &EngineConfig, scope: &Scope) -> anyhow::Result<()> {
    let tenant = scope.tenant()?;
    let actor = scope.actor()?;
    let engine = Engine::open(config)?;

    match cmd {
        ActivityCommands::Call {
            lead,
            duration_secs,
        } => {
            let call = engine.record_call(tenant, actor, *lead, *duration_secs)?;
            println!("Call logged: {}", call.call_id);
        }
        ActivityCommands::Meeting { title, at, lead } => {
            let meeting = engine.record_meeting(tenant, actor, *lead, title, parse_time(at)?)?;
            println!("Meeting recorded: {}", meeting.meeting_id);
        }
        ActivityCommands::Deal { price, lead } => {
            let deal = engine.record_deal(tenant, actor, *lead, *price)?;
            println!("Deal recorded: {} (pending approval)", deal.deal_id);
        }
        ActivityCommands::ApproveDeal { id } => {
            let deal = engine.approve_deal(tenant, *id, actor)?;
            println!("Deal approved: {} ({})", deal.deal_id, deal.price);
        }
        ActivityCommands::ApproveClosure { id } => {
            let closure = engine.approve_closure(tenant, *id, actor)?;
            println!("Closure approved: {} ({})", closure.closure_id, closure.amount);
        }
    }
    Ok(())
}
