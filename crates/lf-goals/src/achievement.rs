// achievement.rs — The one-time crossing rule.
//
// Each target is evaluated and marked inside its own store transaction, so
// the check of `achieved_at` and its write are one atomic step: of several
// racing callers, exactly one sees the crossing and queues TargetAchieved.
// A target that falls back under 100% has `achieved_at` cleared, which
// re-arms it; a later re-crossing pays again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use lf_events::{resolve_recipients, DomainEvent, NotifyTarget, Outbox};
use lf_store::{GoalSubject, Store, TenantRecords};

use crate::error::GoalError;
use crate::evaluator::{evaluate_target, TargetEvaluation};

/// What happened to one target in a trigger pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AchievementOutcome {
    pub evaluation: TargetEvaluation,
    /// This pass set `achieved_at`.
    pub crossed: bool,
    /// This pass cleared `achieved_at`.
    pub rearmed: bool,
    pub recipients: Vec<Uuid>,
}

pub struct AchievementTrigger {
    store: Arc<Store>,
}

impl AchievementTrigger {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Re-evaluate the targets that can move when `user_id` does something:
    /// targets on the user, the user's current team, or everyone, in plans
    /// whose window covers `now`.
    pub fn check_achievement(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Vec<AchievementOutcome>, GoalError> {
        let target_ids = self.store.read(tenant_id, |records| {
            let user = records.users.get(&user_id).ok_or(GoalError::UserNotFound(user_id))?;
            let team_id = user.team_id;
            let ids: Vec<Uuid> = records
                .current_plans(now)
                .into_iter()
                .flat_map(|plan| records.targets_for_plan(plan.plan_id))
                .filter(|target| match target.subject {
                    GoalSubject::User(id) => id == user_id,
                    GoalSubject::Team(id) => team_id == Some(id),
                    GoalSubject::All => true,
                })
                .map(|target| target.target_id)
                .collect();
            Ok::<_, GoalError>(ids)
        })?;

        if target_ids.is_empty() {
            tracing::debug!(%tenant_id, %user_id, "no current targets for user");
        }
        Ok(self.trigger(tenant_id, &target_ids, now, outbox))
    }

    /// Re-evaluate every target of every plan current at `now`.
    pub fn check_current_plans(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Vec<AchievementOutcome> {
        let target_ids: Vec<Uuid> = self.store.read(tenant_id, |records| {
            records
                .current_plans(now)
                .into_iter()
                .flat_map(|plan| records.targets_for_plan(plan.plan_id))
                .map(|target| target.target_id)
                .collect()
        });
        self.trigger(tenant_id, &target_ids, now, outbox)
    }

    /// Apply the crossing rule to each target, one transaction per target.
    /// A target that can't be evaluated is logged and skipped; the rest of
    /// the pass still runs.
    pub fn trigger(
        &self,
        tenant_id: Uuid,
        target_ids: &[Uuid],
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Vec<AchievementOutcome> {
        let mut outcomes = Vec::with_capacity(target_ids.len());
        for &target_id in target_ids {
            let outcome = match self
                .store
                .transact(tenant_id, |records| apply_crossing_rule(records, target_id, now))
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(%tenant_id, %target_id, "target evaluation failed: {}", e);
                    continue;
                }
            };

            if outcome.crossed {
                tracing::info!(
                    %tenant_id,
                    %target_id,
                    metric = %outcome.evaluation.metric,
                    recipients = outcome.recipients.len(),
                    "goal target achieved"
                );
                outbox.push(DomainEvent::TargetAchieved {
                    tenant_id,
                    plan_id: outcome.evaluation.plan_id,
                    target_id,
                    metric: outcome.evaluation.metric,
                    recipients: outcome.recipients.clone(),
                    bonus_amount: outcome
                        .evaluation
                        .bonus_amount
                        .filter(|b| *b > Decimal::ZERO),
                    timestamp: now,
                });
            } else if outcome.rearmed {
                tracing::info!(%tenant_id, %target_id, "goal target fell below 100%, re-armed");
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn apply_crossing_rule(
    records: &mut TenantRecords,
    target_id: Uuid,
    now: DateTime<Utc>,
) -> Result<AchievementOutcome, GoalError> {
    let target = records
        .targets
        .get(&target_id)
        .ok_or(GoalError::TargetNotFound(target_id))?;
    let plan = records
        .plans
        .get(&target.plan_id)
        .ok_or(GoalError::PlanNotFound(target.plan_id))?;
    let mut evaluation = evaluate_target(records, plan, target, now);

    let mut crossed = false;
    let mut rearmed = false;
    let mut recipients = Vec::new();
    if evaluation.is_met() {
        if records.try_mark_achieved(target_id, now) {
            crossed = true;
            evaluation.achieved_at = Some(now);
            recipients = resolve_recipients(records, &subject_target(&evaluation.subject));
        }
    } else if records.clear_achieved(target_id) {
        rearmed = true;
        evaluation.achieved_at = None;
    }

    Ok(AchievementOutcome {
        evaluation,
        crossed,
        rearmed,
        recipients,
    })
}

fn subject_target(subject: &GoalSubject) -> NotifyTarget {
    match subject {
        GoalSubject::User(id) => NotifyTarget::User(*id),
        GoalSubject::Team(id) => NotifyTarget::Team(*id),
        GoalSubject::All => NotifyTarget::All,
    }
}
