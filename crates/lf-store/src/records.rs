// records.rs — TenantRecords: one tenant's tables and their row guards.
//
// Reads are plain lookups. Every write that the engine may race on is a
// conditional update that checks and writes in one step:
//
//   open_deadline_if_none                  — one active deadline per lead
//   mark_overdue_if_active                 — a deadline flips to overdue once
//   create_overdue_failure_if_none_pending — one pending overdue failure per lead
//   try_mark_achieved                      — one payout per achievement crossing
//
// The Store runs callers against a locked working copy, so each of these is
// atomic with respect to every other transaction on the tenant.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::activity::{CallLog, Closure, Deal, Meeting};
use crate::goal::{GoalPlan, GoalTarget};
use crate::lead::{
    Deadline, DeadlineStatus, Extension, ExtensionStatus, Failure, FailureStatus, FailureType,
    HistoryEntry, Lead,
};
use crate::people::{Role, Team, User};

/// Outcome of `open_deadline_if_none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineSlot {
    /// A new active deadline was written.
    Opened(Uuid),
    /// An active deadline already existed; nothing was written.
    Existing(Uuid),
}

impl DeadlineSlot {
    pub fn deadline_id(&self) -> Uuid {
        match self {
            DeadlineSlot::Opened(id) | DeadlineSlot::Existing(id) => *id,
        }
    }
}

/// Every record belonging to one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecords {
    pub tenant_id: Uuid,
    #[serde(default)]
    pub users: BTreeMap<Uuid, User>,
    #[serde(default)]
    pub teams: BTreeMap<Uuid, Team>,
    #[serde(default)]
    pub leads: BTreeMap<Uuid, Lead>,
    /// Append-only, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub deadlines: Vec<Deadline>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
    #[serde(default)]
    pub failures: Vec<Failure>,
    #[serde(default)]
    pub plans: BTreeMap<Uuid, GoalPlan>,
    #[serde(default)]
    pub targets: BTreeMap<Uuid, GoalTarget>,
    #[serde(default)]
    pub calls: Vec<CallLog>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub closures: Vec<Closure>,
}

impl TenantRecords {
    /// An empty document for a tenant.
    pub fn new(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            users: BTreeMap::new(),
            teams: BTreeMap::new(),
            leads: BTreeMap::new(),
            history: Vec::new(),
            deadlines: Vec::new(),
            extensions: Vec::new(),
            failures: Vec::new(),
            plans: BTreeMap::new(),
            targets: BTreeMap::new(),
            calls: Vec::new(),
            meetings: Vec::new(),
            deals: Vec::new(),
            closures: Vec::new(),
        }
    }

    // ── people ──────────────────────────────────────────────────────────

    pub fn add_user(&mut self, user: User) -> Uuid {
        let id = user.user_id;
        self.users.insert(id, user);
        id
    }

    pub fn add_team(&mut self, team: Team) -> Uuid {
        let id = team.team_id;
        self.teams.insert(id, team);
        id
    }

    /// Every active user in the tenant.
    pub fn active_users(&self) -> Vec<Uuid> {
        self.users
            .values()
            .filter(|u| u.is_active())
            .map(|u| u.user_id)
            .collect()
    }

    /// Active users currently on `team_id`.
    pub fn active_members(&self, team_id: Uuid) -> Vec<Uuid> {
        self.users
            .values()
            .filter(|u| u.is_active() && u.team_id == Some(team_id))
            .map(|u| u.user_id)
            .collect()
    }

    /// Active users holding `role`.
    pub fn active_users_with_role(&self, role: Role) -> Vec<Uuid> {
        self.users
            .values()
            .filter(|u| u.is_active() && u.has_role(role))
            .map(|u| u.user_id)
            .collect()
    }

    /// The team's leader, if one is set and still active.
    pub fn active_team_leader(&self, team_id: Uuid) -> Option<Uuid> {
        let leader_id = self.teams.get(&team_id)?.leader_id?;
        self.users
            .get(&leader_id)
            .filter(|u| u.is_active())
            .map(|u| u.user_id)
    }

    // ── leads and history ───────────────────────────────────────────────

    pub fn add_lead(&mut self, lead: Lead) -> Uuid {
        let id = lead.lead_id;
        self.leads.insert(id, lead);
        id
    }

    /// A lead that exists and has not been deleted.
    pub fn live_lead(&self, lead_id: Uuid) -> Option<&Lead> {
        self.leads.get(&lead_id).filter(|l| !l.deleted)
    }

    pub fn live_lead_mut(&mut self, lead_id: Uuid) -> Option<&mut Lead> {
        self.leads.get_mut(&lead_id).filter(|l| !l.deleted)
    }

    /// The most recent history row for a lead.
    pub fn latest_history(&self, lead_id: Uuid) -> Option<&HistoryEntry> {
        self.history.iter().rev().find(|h| h.lead_id == lead_id)
    }

    /// A lead's history, oldest first.
    pub fn history_for(&self, lead_id: Uuid) -> Vec<&HistoryEntry> {
        self.history.iter().filter(|h| h.lead_id == lead_id).collect()
    }

    pub fn history_entry_mut(&mut self, entry_id: Uuid) -> Option<&mut HistoryEntry> {
        self.history.iter_mut().find(|h| h.entry_id == entry_id)
    }

    // ── deadlines ───────────────────────────────────────────────────────

    pub fn active_deadline(&self, lead_id: Uuid) -> Option<&Deadline> {
        self.deadlines
            .iter()
            .find(|d| d.lead_id == lead_id && d.status == DeadlineStatus::Active)
    }

    pub fn active_deadline_mut(&mut self, lead_id: Uuid) -> Option<&mut Deadline> {
        self.deadlines
            .iter_mut()
            .find(|d| d.lead_id == lead_id && d.status == DeadlineStatus::Active)
    }

    /// Open a deadline for `lead_id` unless one is already active.
    pub fn open_deadline_if_none(
        &mut self,
        lead_id: Uuid,
        stage: &str,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DeadlineSlot {
        if let Some(existing) = self.active_deadline(lead_id) {
            return DeadlineSlot::Existing(existing.deadline_id);
        }
        let deadline = Deadline {
            deadline_id: Uuid::new_v4(),
            lead_id,
            stage: stage.to_string(),
            due_at,
            status: DeadlineStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let id = deadline.deadline_id;
        self.deadlines.push(deadline);
        DeadlineSlot::Opened(id)
    }

    /// Move the lead's active deadline (if any) to `status`.
    pub fn close_active_deadline(
        &mut self,
        lead_id: Uuid,
        status: DeadlineStatus,
        now: DateTime<Utc>,
    ) -> Option<Uuid> {
        let deadline = self.active_deadline_mut(lead_id)?;
        deadline.status = status;
        deadline.updated_at = now;
        Some(deadline.deadline_id)
    }

    /// Active deadlines whose due time is strictly before `now`.
    pub fn overdue_deadlines(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        self.deadlines
            .iter()
            .filter(|d| d.status == DeadlineStatus::Active && d.due_at < now)
            .map(|d| d.deadline_id)
            .collect()
    }

    /// Flip a deadline to `overdue` if it is still active. Returns the lead
    /// it belongs to when the flip happened, `None` if another pass got
    /// there first.
    pub fn mark_overdue_if_active(&mut self, deadline_id: Uuid, now: DateTime<Utc>) -> Option<Uuid> {
        let deadline = self
            .deadlines
            .iter_mut()
            .find(|d| d.deadline_id == deadline_id && d.status == DeadlineStatus::Active)?;
        deadline.status = DeadlineStatus::Overdue;
        deadline.updated_at = now;
        Some(deadline.lead_id)
    }

    // ── failures ────────────────────────────────────────────────────────

    pub fn pending_failure(&self, lead_id: Uuid, failure_type: FailureType) -> Option<&Failure> {
        self.failures.iter().find(|f| {
            f.lead_id == lead_id
                && f.failure_type == failure_type
                && f.status == FailureStatus::Pending
        })
    }

    /// Record a reasonless, system-caused overdue failure unless one is
    /// already pending for the lead.
    pub fn create_overdue_failure_if_none_pending(
        &mut self,
        lead_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<Uuid> {
        if self.pending_failure(lead_id, FailureType::Overdue).is_some() {
            return None;
        }
        let failure = Failure {
            failure_id: Uuid::new_v4(),
            lead_id,
            failure_type: FailureType::Overdue,
            failed_by: None,
            status: FailureStatus::Pending,
            reason: None,
            resolved_by: None,
            resolved_at: None,
            resolution_note: None,
            created_at: now,
        };
        let id = failure.failure_id;
        self.failures.push(failure);
        Some(id)
    }

    pub fn failure_mut(&mut self, failure_id: Uuid) -> Option<&mut Failure> {
        self.failures.iter_mut().find(|f| f.failure_id == failure_id)
    }

    // ── extensions ──────────────────────────────────────────────────────

    /// Hours already pending or approved for a lead in a stage.
    pub fn committed_extension_hours(&self, lead_id: Uuid, stage: &str) -> u32 {
        self.extensions
            .iter()
            .filter(|e| {
                e.lead_id == lead_id
                    && e.stage == stage
                    && matches!(e.status, ExtensionStatus::Pending | ExtensionStatus::Approved)
            })
            .map(|e| e.hours)
            .sum()
    }

    pub fn extension(&self, extension_id: Uuid) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.extension_id == extension_id)
    }

    pub fn extension_mut(&mut self, extension_id: Uuid) -> Option<&mut Extension> {
        self.extensions
            .iter_mut()
            .find(|e| e.extension_id == extension_id)
    }

    // ── goals ───────────────────────────────────────────────────────────

    /// Active plans whose window covers `now`.
    pub fn current_plans(&self, now: DateTime<Utc>) -> Vec<&GoalPlan> {
        self.plans.values().filter(|p| p.is_current(now)).collect()
    }

    pub fn targets_for_plan(&self, plan_id: Uuid) -> Vec<&GoalTarget> {
        self.targets
            .values()
            .filter(|t| t.plan_id == plan_id)
            .collect()
    }

    /// Pin one plan and unpin every other. Returns false if the plan is unknown.
    pub fn pin_plan(&mut self, plan_id: Uuid) -> bool {
        if !self.plans.contains_key(&plan_id) {
            return false;
        }
        for plan in self.plans.values_mut() {
            plan.is_pinned = plan.plan_id == plan_id;
        }
        true
    }

    /// Set `achieved_at` if it is currently unset. Returns true only for the
    /// caller that performed the write.
    pub fn try_mark_achieved(&mut self, target_id: Uuid, now: DateTime<Utc>) -> bool {
        match self.targets.get_mut(&target_id) {
            Some(target) if target.achieved_at.is_none() => {
                target.achieved_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Clear `achieved_at` if it is set, re-arming the target.
    pub fn clear_achieved(&mut self, target_id: Uuid) -> bool {
        match self.targets.get_mut(&target_id) {
            Some(target) if target.achieved_at.is_some() => {
                target.achieved_at = None;
                true
            }
            _ => false,
        }
    }
}
