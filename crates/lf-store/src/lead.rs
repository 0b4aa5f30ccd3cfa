// lead.rs — Leads and the rows they own.
//
// A Lead owns its history (append-only transition log), its deadlines
// (at most one `active` at a time), its extension requests, and its
// failure records. Deleting a lead cascades at the storage layer; the
// engine only ever soft-checks `deleted`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a lead currently sits.
///
/// `#[serde(tag, content)]` serializes as `{"kind": "in_stage", "stage": "call"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "stage", rename_all = "snake_case")]
pub enum LeadStatus {
    /// Created, not yet entered into the pipeline.
    New,
    /// In the stage with this catalog code.
    InStage(String),
    /// Stopped by an overdue sweep or a surrender.
    Failed,
}

impl LeadStatus {
    /// The stage code, if the lead is in one.
    pub fn stage(&self) -> Option<&str> {
        match self {
            LeadStatus::InStage(code) => Some(code),
            LeadStatus::New | LeadStatus::Failed => None,
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadStatus::New => write!(f, "new"),
            LeadStatus::InStage(code) => write!(f, "{}", code),
            LeadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A sales lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub lead_id: Uuid,
    pub name: String,
    pub status: LeadStatus,
    /// Owner. `None` once an overdue sweep clears the assignment.
    pub assigned_user_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(name: impl Into<String>, assigned_user_id: Option<Uuid>, team_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            lead_id: Uuid::new_v4(),
            name: name.into(),
            status: LeadStatus::New,
            assigned_user_id,
            team_id,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Undo bookkeeping on a history row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryMetadata {
    /// Set on a reversing row: the entry it reverses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undo_of: Option<Uuid>,
    /// Set on an undone row: the reversing row that undid it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undone_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub undone_at: Option<DateTime<Utc>>,
}

/// One row of a lead's append-only transition log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry_id: Uuid,
    pub lead_id: Uuid,
    /// `None` for the lead's first entry into the pipeline.
    pub from_state: Option<String>,
    pub to_state: String,
    pub changed_by: Uuid,
    #[serde(default)]
    pub answers: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: HistoryMetadata,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// True if this row was undone or is itself an undo.
    pub fn carries_undo_marker(&self) -> bool {
        self.metadata.undo_of.is_some() || self.metadata.undone_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    Active,
    /// The lead reached a terminal stage, or the clock was reset by an undo.
    Completed,
    /// The sweep found the deadline past due.
    Overdue,
    /// Voided by a surrender.
    Expired,
}

/// The SLA clock for a lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deadline {
    pub deadline_id: Uuid,
    pub lead_id: Uuid,
    /// The stage the deadline was opened under.
    pub stage: String,
    pub due_at: DateTime<Utc>,
    pub status: DeadlineStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionStatus::Pending => write!(f, "pending"),
            ExtensionStatus::Approved => write!(f, "approved"),
            ExtensionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// A request to push a deadline out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extension {
    pub extension_id: Uuid,
    pub lead_id: Uuid,
    /// The deadline that was active when the request was made.
    pub deadline_id: Uuid,
    pub stage: String,
    pub requested_by: Uuid,
    pub hours: u32,
    pub reason: String,
    pub status: ExtensionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    /// Detected by the sweep.
    Overdue,
    /// Declared by a user.
    Surrender,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureStatus {
    Pending,
    Resolved,
}

/// Why a lead stopped progressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub failure_id: Uuid,
    pub lead_id: Uuid,
    pub failure_type: FailureType,
    /// `None` for system-detected failures.
    pub failed_by: Option<Uuid>,
    pub status: FailureStatus,
    /// Required up front for a surrender; supplied at resolution for an overdue.
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// What the resolver wrote when closing the failure out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
}
