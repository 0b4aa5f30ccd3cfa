// event.rs — Domain events emitted by the lifecycle and goal engines.
//
// Events carry everything the dispatcher needs to address and word a
// notification (owner, team, lead name, amounts), so dispatch never reads
// the store back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lf_store::MetricKey;

use crate::notify::NotifyTarget;

/// Events emitted at lifecycle and achievement points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A lead entered a stage.
    StageCompleted {
        tenant_id: Uuid,
        lead_id: Uuid,
        lead_name: String,
        from_state: Option<String>,
        to_state: String,
        actor_id: Uuid,
        owner_id: Option<Uuid>,
        team_id: Option<Uuid>,
        /// True when the stage is the terminal (closing) stage.
        terminal: bool,
        /// The `amount` answer, for terminal stages.
        closed_amount: Option<Decimal>,
        timestamp: DateTime<Utc>,
    },

    /// The most recent transition of a lead was reversed.
    TransitionUndone {
        tenant_id: Uuid,
        lead_id: Uuid,
        lead_name: String,
        undone_state: String,
        restored_state: String,
        actor_id: Uuid,
        owner_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    },

    /// The sweep found a lead past its deadline and failed it.
    LeadOverdue {
        tenant_id: Uuid,
        lead_id: Uuid,
        lead_name: String,
        deadline_id: Uuid,
        /// `None` when a pending overdue failure already existed.
        failure_id: Option<Uuid>,
        former_owner_id: Option<Uuid>,
        owner_deactivated: bool,
        timestamp: DateTime<Utc>,
    },

    /// A user gave up on a lead.
    LeadSurrendered {
        tenant_id: Uuid,
        lead_id: Uuid,
        lead_name: String,
        failure_id: Uuid,
        actor_id: Uuid,
        team_id: Option<Uuid>,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A deadline extension is waiting for a decision.
    ExtensionRequested {
        tenant_id: Uuid,
        extension_id: Uuid,
        lead_id: Uuid,
        lead_name: String,
        requested_by: Uuid,
        hours: u32,
        reason: String,
        /// Team leader, or tenant owners for teamless leads.
        resolver: NotifyTarget,
        timestamp: DateTime<Utc>,
    },

    /// An extension request was approved or rejected.
    ExtensionDecided {
        tenant_id: Uuid,
        extension_id: Uuid,
        lead_id: Uuid,
        requested_by: Uuid,
        decided_by: Uuid,
        approved: bool,
        hours: u32,
        /// The deadline's new due time after an approval.
        new_due_at: Option<DateTime<Utc>>,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A goal target crossed 100% for the first time since it was last armed.
    TargetAchieved {
        tenant_id: Uuid,
        plan_id: Uuid,
        target_id: Uuid,
        metric: MetricKey,
        recipients: Vec<Uuid>,
        bonus_amount: Option<Decimal>,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::StageCompleted { .. } => "stage_completed",
            DomainEvent::TransitionUndone { .. } => "transition_undone",
            DomainEvent::LeadOverdue { .. } => "lead_overdue",
            DomainEvent::LeadSurrendered { .. } => "lead_surrendered",
            DomainEvent::ExtensionRequested { .. } => "extension_requested",
            DomainEvent::ExtensionDecided { .. } => "extension_decided",
            DomainEvent::TargetAchieved { .. } => "target_achieved",
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        match self {
            DomainEvent::StageCompleted { tenant_id, .. }
            | DomainEvent::TransitionUndone { tenant_id, .. }
            | DomainEvent::LeadOverdue { tenant_id, .. }
            | DomainEvent::LeadSurrendered { tenant_id, .. }
            | DomainEvent::ExtensionRequested { tenant_id, .. }
            | DomainEvent::ExtensionDecided { tenant_id, .. }
            | DomainEvent::TargetAchieved { tenant_id, .. } => *tenant_id,
        }
    }

    /// The lead the event is about, if any.
    pub fn lead_id(&self) -> Option<Uuid> {
        match self {
            DomainEvent::StageCompleted { lead_id, .. }
            | DomainEvent::TransitionUndone { lead_id, .. }
            | DomainEvent::LeadOverdue { lead_id, .. }
            | DomainEvent::LeadSurrendered { lead_id, .. }
            | DomainEvent::ExtensionRequested { lead_id, .. }
            | DomainEvent::ExtensionDecided { lead_id, .. } => Some(*lead_id),
            DomainEvent::TargetAchieved { .. } => None,
        }
    }
}
