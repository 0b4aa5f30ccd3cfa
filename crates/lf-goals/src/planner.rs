// planner.rs — Creating plans and targets, and pinning a plan.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use lf_store::{GoalPeriod, GoalPlan, GoalSubject, GoalTarget, MetricKey, Store};

use crate::error::GoalError;

pub struct GoalPlanner {
    store: Arc<Store>,
}

impl GoalPlanner {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn create_plan(
        &self,
        tenant_id: Uuid,
        name: &str,
        period: GoalPeriod,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<GoalPlan, GoalError> {
        if name.trim().is_empty() {
            return Err(GoalError::InvalidDefinition("plan name is empty".to_string()));
        }
        if ends_at <= starts_at {
            return Err(GoalError::InvalidDefinition(format!(
                "plan ends ({}) before it starts ({})",
                ends_at, starts_at
            )));
        }
        let plan = GoalPlan::new(name.trim(), period, starts_at, ends_at);
        let created = self.store.transact(tenant_id, |records| {
            records.plans.insert(plan.plan_id, plan.clone());
            Ok::<_, GoalError>(plan)
        })?;
        tracing::info!(%tenant_id, plan_id = %created.plan_id, "goal plan created");
        Ok(created)
    }

    pub fn add_target(
        &self,
        tenant_id: Uuid,
        plan_id: Uuid,
        subject: GoalSubject,
        metric: MetricKey,
        target_value: Decimal,
        bonus_amount: Option<Decimal>,
    ) -> Result<GoalTarget, GoalError> {
        if target_value.is_sign_negative() {
            return Err(GoalError::InvalidDefinition(format!(
                "target value {} is negative",
                target_value
            )));
        }
        if bonus_amount.is_some_and(|b| b.is_sign_negative()) {
            return Err(GoalError::InvalidDefinition("bonus is negative".to_string()));
        }

        let target = self.store.transact(tenant_id, |records| {
            if !records.plans.contains_key(&plan_id) {
                return Err(GoalError::PlanNotFound(plan_id));
            }
            match subject {
                GoalSubject::User(id) if !records.users.contains_key(&id) => {
                    return Err(GoalError::UserNotFound(id));
                }
                GoalSubject::Team(id) if !records.teams.contains_key(&id) => {
                    return Err(GoalError::TeamNotFound(id));
                }
                _ => {}
            }
            let mut target = GoalTarget::new(plan_id, subject, metric, target_value);
            target.bonus_amount = bonus_amount;
            records.targets.insert(target.target_id, target.clone());
            Ok(target)
        })?;
        tracing::info!(
            %tenant_id,
            %plan_id,
            target_id = %target.target_id,
            metric = %metric,
            "goal target added"
        );
        Ok(target)
    }

    /// Pin `plan_id` and unpin every other plan of the tenant.
    pub fn pin_plan(&self, tenant_id: Uuid, plan_id: Uuid) -> Result<(), GoalError> {
        self.store.transact(tenant_id, |records| {
            if records.pin_plan(plan_id) {
                Ok(())
            } else {
                Err(GoalError::PlanNotFound(plan_id))
            }
        })?;
        tracing::info!(%tenant_id, %plan_id, "goal plan pinned");
        Ok(())
    }
}
