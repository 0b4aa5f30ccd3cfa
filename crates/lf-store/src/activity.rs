// activity.rs — Raw activity facts that goal metrics aggregate.
//
// These rows are owned by their respective entity stores; the goal
// evaluator only reads them. Each carries the team the actor belonged to
// when the row was written so team-scoped metrics don't shift when people
// change teams.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// A logged phone call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLog {
    pub call_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
    pub caller_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub duration_secs: u32,
    pub created_at: DateTime<Utc>,
}

/// A meeting with a prospect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub meeting_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
    pub organizer_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    pub title: String,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A deal recorded outside the stage pipeline (e.g. a repeat sale).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub deal_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    pub price: Decimal,
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The closure request recorded when a lead enters the terminal stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Closure {
    pub closure_id: Uuid,
    pub lead_id: Uuid,
    /// The seller credited with the closure.
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_date: Option<String>,
    pub status: ApprovalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
