// engine.rs — Engine: the operations request handlers and schedulers call.
//
// Each public operation runs the underlying lifecycle or goal operation,
// which commits on its own, then hands the collected events to the
// dispatcher. Dispatch and the follow-up achievement check after an
// activity are best-effort: their failures are logged and never turn a
// committed operation into an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use lf_events::{
    DispatchSummary, EventDispatcher, FanoutNotifier, JsonlDelivery, JsonlLedger, Outbox,
};
use lf_goals::{build_report, AchievementOutcome, AchievementTrigger, GoalPlanner, GoalReport};
use lf_lifecycle::{
    DeadlineSweeper, ExtensionNegotiator, LeadLifecycle, SlaPolicy, StageResult, SweepReport,
};
use lf_stages::{Answers, CatalogRegistry};
use lf_store::{
    ApprovalStatus, CallLog, Closure, Deadline, Deal, Extension, Failure, GoalPeriod, GoalPlan,
    GoalSubject, GoalTarget, HistoryEntry, Lead, Meeting, MetricKey, Role, Store, Team, User,
};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;

/// A lead with everything it owns, for display.
#[derive(Debug, Clone, Serialize)]
pub struct LeadSnapshot {
    pub lead: Lead,
    pub history: Vec<HistoryEntry>,
    pub active_deadline: Option<Deadline>,
    pub extensions: Vec<Extension>,
    pub failures: Vec<Failure>,
}

pub struct Engine {
    store: Arc<Store>,
    catalogs: Arc<CatalogRegistry>,
    lifecycle: LeadLifecycle,
    sweeper: DeadlineSweeper,
    extensions: ExtensionNegotiator,
    trigger: AchievementTrigger,
    planner: GoalPlanner,
    dispatcher: EventDispatcher,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(
        store: Arc<Store>,
        catalogs: Arc<CatalogRegistry>,
        dispatcher: EventDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let policy = SlaPolicy::default();
        Self {
            lifecycle: LeadLifecycle::new(store.clone(), catalogs.clone(), policy),
            sweeper: DeadlineSweeper::new(store.clone(), catalogs.clone(), policy),
            extensions: ExtensionNegotiator::new(store.clone(), catalogs.clone(), policy),
            trigger: AchievementTrigger::new(store.clone()),
            planner: GoalPlanner::new(store.clone()),
            store,
            catalogs,
            dispatcher,
            clock,
        }
    }

    /// File-backed engine with JSONL notification and ledger logs.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        let store = Arc::new(Store::open(&config.data_dir)?);
        let mut dispatcher = EventDispatcher::new(Arc::new(JsonlLedger::new(&config.ledger_log)));
        dispatcher.add_notifier(Arc::new(FanoutNotifier::new(
            store.clone(),
            JsonlDelivery::new(&config.notifications_log),
        )));
        Ok(Self::new(
            store,
            Arc::new(CatalogRegistry::default()),
            dispatcher,
            Arc::new(SystemClock),
        ))
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn catalogs(&self) -> &Arc<CatalogRegistry> {
        &self.catalogs
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn dispatch(&self, mut outbox: Outbox) -> DispatchSummary {
        if outbox.is_empty() {
            return DispatchSummary::default();
        }
        let summary = self.dispatcher.dispatch_all(&outbox.drain());
        if summary.notification_failures > 0 || summary.ledger_failures > 0 {
            tracing::warn!(
                notification_failures = summary.notification_failures,
                ledger_failures = summary.ledger_failures,
                "some side effects failed"
            );
        }
        summary
    }

    /// Run the achievement check for `user_id` after an activity, logging
    /// rather than returning failures.
    fn follow_up_achievement(&self, tenant_id: Uuid, user_id: Uuid) {
        let mut outbox = Outbox::new();
        if let Err(e) = self
            .trigger
            .check_achievement(tenant_id, user_id, self.now(), &mut outbox)
        {
            tracing::warn!(%tenant_id, %user_id, "achievement check failed: {}", e);
        }
        self.dispatch(outbox);
    }

    /// The user's current team; errors if the user is unknown.
    fn user_team(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Option<Uuid>, EngineError> {
        self.store
            .read(tenant_id, |records| records.users.get(&user_id).map(|u| u.team_id))
            .ok_or(EngineError::NotFound {
                entity: "user",
                id: user_id,
            })
    }

    // ── directory ───────────────────────────────────────────────────────

    pub fn add_team(
        &self,
        tenant_id: Uuid,
        name: &str,
        leader_id: Option<Uuid>,
    ) -> Result<Team, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidInput("team name is empty".to_string()));
        }
        let team = self.store.transact(tenant_id, |records| {
            if let Some(leader) = leader_id {
                if !records.users.contains_key(&leader) {
                    return Err(EngineError::NotFound {
                        entity: "user",
                        id: leader,
                    });
                }
            }
            let team = Team::new(name.trim(), leader_id);
            records.add_team(team.clone());
            Ok(team)
        })?;
        tracing::info!(%tenant_id, team_id = %team.team_id, "team added");
        Ok(team)
    }

    pub fn add_user(
        &self,
        tenant_id: Uuid,
        name: &str,
        roles: Vec<Role>,
        team_id: Option<Uuid>,
    ) -> Result<User, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidInput("user name is empty".to_string()));
        }
        if roles.is_empty() {
            return Err(EngineError::InvalidInput("a user needs at least one role".to_string()));
        }
        let user = self.store.transact(tenant_id, |records| {
            let mut user = User::new(name.trim(), roles);
            if let Some(team) = team_id {
                if !records.teams.contains_key(&team) {
                    return Err(EngineError::NotFound {
                        entity: "team",
                        id: team,
                    });
                }
                user = user.with_team(team);
            }
            records.add_user(user.clone());
            Ok(user)
        })?;
        tracing::info!(%tenant_id, user_id = %user.user_id, "user added");
        Ok(user)
    }

    // ── leads ───────────────────────────────────────────────────────────

    /// Create a lead, assigned to `assigned_user_id` and that user's team.
    pub fn create_lead(
        &self,
        tenant_id: Uuid,
        name: &str,
        assigned_user_id: Option<Uuid>,
        actor_id: Uuid,
    ) -> Result<Lead, EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidInput("lead name is empty".to_string()));
        }
        let now = self.now();
        let lead = self.store.transact(tenant_id, |records| {
            let team_id = match assigned_user_id {
                Some(user_id) => {
                    let user = records.users.get(&user_id).ok_or(EngineError::NotFound {
                        entity: "user",
                        id: user_id,
                    })?;
                    if !user.is_active() {
                        return Err(EngineError::InvalidInput(format!(
                            "user {} is inactive and cannot own leads",
                            user_id
                        )));
                    }
                    user.team_id
                }
                None => None,
            };
            let mut lead = Lead::new(name.trim(), assigned_user_id, team_id);
            lead.created_at = now;
            lead.updated_at = now;
            records.add_lead(lead.clone());
            Ok(lead)
        })?;
        tracing::info!(%tenant_id, lead_id = %lead.lead_id, "lead created");
        self.follow_up_achievement(tenant_id, assigned_user_id.unwrap_or(actor_id));
        Ok(lead)
    }

    pub fn transition_lead(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        to_state: &str,
        actor_id: Uuid,
        answers: Option<Answers>,
    ) -> Result<StageResult, EngineError> {
        let mut outbox = Outbox::new();
        let result = self.lifecycle.transition(
            tenant_id,
            lead_id,
            to_state,
            actor_id,
            answers.unwrap_or_default(),
            self.now(),
            &mut outbox,
        )?;
        self.dispatch(outbox);
        Ok(result)
    }

    pub fn undo_last_transition(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        actor_id: Uuid,
    ) -> Result<StageResult, EngineError> {
        let mut outbox = Outbox::new();
        let result = self
            .lifecycle
            .undo(tenant_id, lead_id, actor_id, self.now(), &mut outbox)?;
        self.dispatch(outbox);
        Ok(result)
    }

    pub fn surrender_lead(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        actor_id: Uuid,
        reason: &str,
    ) -> Result<Failure, EngineError> {
        let mut outbox = Outbox::new();
        let failure = self
            .lifecycle
            .surrender(tenant_id, lead_id, actor_id, reason, self.now(), &mut outbox)?;
        self.dispatch(outbox);
        Ok(failure)
    }

    pub fn resolve_failure(
        &self,
        tenant_id: Uuid,
        failure_id: Uuid,
        actor_id: Uuid,
        reason: &str,
    ) -> Result<Failure, EngineError> {
        Ok(self
            .lifecycle
            .resolve_failure(tenant_id, failure_id, actor_id, reason, self.now())?)
    }

    pub fn lead_snapshot(&self, tenant_id: Uuid, lead_id: Uuid) -> Result<LeadSnapshot, EngineError> {
        self.store.read(tenant_id, |records| {
            let lead = records.live_lead(lead_id).ok_or(EngineError::NotFound {
                entity: "lead",
                id: lead_id,
            })?;
            Ok(LeadSnapshot {
                lead: lead.clone(),
                history: records.history_for(lead_id).into_iter().cloned().collect(),
                active_deadline: records.active_deadline(lead_id).cloned(),
                extensions: records
                    .extensions
                    .iter()
                    .filter(|e| e.lead_id == lead_id)
                    .cloned()
                    .collect(),
                failures: records
                    .failures
                    .iter()
                    .filter(|f| f.lead_id == lead_id)
                    .cloned()
                    .collect(),
            })
        })
    }

    // ── deadlines ───────────────────────────────────────────────────────

    /// One SLA pass over a tenant, followed by a re-evaluation of the
    /// tenant's current goal targets.
    pub fn run_deadline_sweep(&self, tenant_id: Uuid) -> SweepReport {
        let now = self.now();
        let mut outbox = Outbox::new();
        let report = self.sweeper.sweep(tenant_id, now, &mut outbox);
        self.trigger.check_current_plans(tenant_id, now, &mut outbox);
        self.dispatch(outbox);
        report
    }

    /// Sweep every tenant the store knows about.
    pub fn sweep_all(&self) -> Vec<SweepReport> {
        self.store
            .tenant_ids()
            .into_iter()
            .map(|tenant_id| self.run_deadline_sweep(tenant_id))
            .collect()
    }

    pub fn request_extension(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        stage: &str,
        requested_by: Uuid,
        hours: i64,
        reason: &str,
    ) -> Result<Extension, EngineError> {
        let mut outbox = Outbox::new();
        let extension = self.extensions.request(
            tenant_id,
            lead_id,
            stage,
            requested_by,
            hours,
            reason,
            self.now(),
            &mut outbox,
        )?;
        self.dispatch(outbox);
        Ok(extension)
    }

    pub fn approve_extension(
        &self,
        tenant_id: Uuid,
        extension_id: Uuid,
        approver_id: Uuid,
    ) -> Result<Extension, EngineError> {
        let mut outbox = Outbox::new();
        let extension =
            self.extensions
                .approve(tenant_id, extension_id, approver_id, self.now(), &mut outbox)?;
        self.dispatch(outbox);
        Ok(extension)
    }

    pub fn reject_extension(
        &self,
        tenant_id: Uuid,
        extension_id: Uuid,
        approver_id: Uuid,
        reason: &str,
    ) -> Result<Extension, EngineError> {
        let mut outbox = Outbox::new();
        let extension = self.extensions.reject(
            tenant_id,
            extension_id,
            approver_id,
            reason,
            self.now(),
            &mut outbox,
        )?;
        self.dispatch(outbox);
        Ok(extension)
    }

    // ── goals ───────────────────────────────────────────────────────────

    pub fn create_plan(
        &self,
        tenant_id: Uuid,
        name: &str,
        period: GoalPeriod,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<GoalPlan, EngineError> {
        Ok(self
            .planner
            .create_plan(tenant_id, name, period, starts_at, ends_at)?)
    }

    pub fn add_target(
        &self,
        tenant_id: Uuid,
        plan_id: Uuid,
        subject: GoalSubject,
        metric: MetricKey,
        target_value: Decimal,
        bonus_amount: Option<Decimal>,
    ) -> Result<GoalTarget, EngineError> {
        Ok(self.planner.add_target(
            tenant_id,
            plan_id,
            subject,
            metric,
            target_value,
            bonus_amount,
        )?)
    }

    pub fn pin_plan(&self, tenant_id: Uuid, plan_id: Uuid) -> Result<(), EngineError> {
        Ok(self.planner.pin_plan(tenant_id, plan_id)?)
    }

    pub fn build_goal_report(&self, tenant_id: Uuid, plan_id: Uuid) -> Result<GoalReport, EngineError> {
        let now = self.now();
        Ok(self
            .store
            .read(tenant_id, |records| build_report(records, plan_id, now))?)
    }

    pub fn check_achievement(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<AchievementOutcome>, EngineError> {
        let mut outbox = Outbox::new();
        let outcomes = self
            .trigger
            .check_achievement(tenant_id, user_id, self.now(), &mut outbox)?;
        self.dispatch(outbox);
        Ok(outcomes)
    }

    // ── activity ────────────────────────────────────────────────────────

    pub fn record_call(
        &self,
        tenant_id: Uuid,
        caller_id: Uuid,
        lead_id: Option<Uuid>,
        duration_secs: u32,
    ) -> Result<CallLog, EngineError> {
        let team_id = self.user_team(tenant_id, caller_id)?;
        let call = CallLog {
            call_id: Uuid::new_v4(),
            lead_id,
            caller_id,
            team_id,
            duration_secs,
            created_at: self.now(),
        };
        let call = self.store.transact(tenant_id, |records| {
            records.calls.push(call.clone());
            Ok::<_, EngineError>(call)
        })?;
        tracing::info!(%tenant_id, call_id = %call.call_id, "call logged");
        self.follow_up_achievement(tenant_id, caller_id);
        Ok(call)
    }

    pub fn record_meeting(
        &self,
        tenant_id: Uuid,
        organizer_id: Uuid,
        lead_id: Option<Uuid>,
        title: &str,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Meeting, EngineError> {
        let team_id = self.user_team(tenant_id, organizer_id)?;
        let meeting = Meeting {
            meeting_id: Uuid::new_v4(),
            lead_id,
            organizer_id,
            team_id,
            title: title.trim().to_string(),
            scheduled_at,
            created_at: self.now(),
        };
        let meeting = self.store.transact(tenant_id, |records| {
            records.meetings.push(meeting.clone());
            Ok::<_, EngineError>(meeting)
        })?;
        tracing::info!(%tenant_id, meeting_id = %meeting.meeting_id, "meeting recorded");
        self.follow_up_achievement(tenant_id, organizer_id);
        Ok(meeting)
    }

    /// Record a deal awaiting approval. It counts toward goals once approved.
    pub fn record_deal(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        lead_id: Option<Uuid>,
        price: Decimal,
    ) -> Result<Deal, EngineError> {
        if price <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "deal price must be positive, got {}",
                price
            )));
        }
        let team_id = self.user_team(tenant_id, user_id)?;
        let deal = Deal {
            deal_id: Uuid::new_v4(),
            lead_id,
            user_id,
            team_id,
            price,
            status: ApprovalStatus::Pending,
            approved_at: None,
            created_at: self.now(),
        };
        let deal = self.store.transact(tenant_id, |records| {
            records.deals.push(deal.clone());
            Ok::<_, EngineError>(deal)
        })?;
        tracing::info!(%tenant_id, deal_id = %deal.deal_id, "deal recorded");
        Ok(deal)
    }

    pub fn approve_deal(
        &self,
        tenant_id: Uuid,
        deal_id: Uuid,
        approver_id: Uuid,
    ) -> Result<Deal, EngineError> {
        let now = self.now();
        let deal = self.store.transact(tenant_id, |records| {
            let deal = records
                .deals
                .iter_mut()
                .find(|d| d.deal_id == deal_id)
                .ok_or(EngineError::NotFound {
                    entity: "deal",
                    id: deal_id,
                })?;
            if deal.status != ApprovalStatus::Pending {
                return Err(EngineError::AlreadyDecided {
                    entity: "deal",
                    id: deal_id,
                });
            }
            deal.status = ApprovalStatus::Approved;
            deal.approved_at = Some(now);
            Ok(deal.clone())
        })?;
        tracing::info!(%tenant_id, %deal_id, approver = %approver_id, "deal approved");
        self.follow_up_achievement(tenant_id, deal.user_id);
        Ok(deal)
    }

    pub fn approve_closure(
        &self,
        tenant_id: Uuid,
        closure_id: Uuid,
        approver_id: Uuid,
    ) -> Result<Closure, EngineError> {
        let now = self.now();
        let closure = self.store.transact(tenant_id, |records| {
            let closure = records
                .closures
                .iter_mut()
                .find(|c| c.closure_id == closure_id)
                .ok_or(EngineError::NotFound {
                    entity: "closure",
                    id: closure_id,
                })?;
            if closure.status != ApprovalStatus::Pending {
                return Err(EngineError::AlreadyDecided {
                    entity: "closure",
                    id: closure_id,
                });
            }
            closure.status = ApprovalStatus::Approved;
            closure.approved_by = Some(approver_id);
            closure.approved_at = Some(now);
            Ok(closure.clone())
        })?;
        tracing::info!(%tenant_id, %closure_id, amount = %closure.amount, "closure approved");
        self.follow_up_achievement(tenant_id, closure.user_id);
        Ok(closure)
    }
}
