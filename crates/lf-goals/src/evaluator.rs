// evaluator.rs — Target evaluation and the plan report.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use lf_store::{GoalPlan, GoalSubject, GoalTarget, MetricKey, TenantRecords};

use crate::error::GoalError;
use crate::metric::{actual_value, TimeWindow};

/// Traffic-light status of a target relative to the plan's elapsed time.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// At or above 100%.
    Success,
    /// Below 100% but keeping pace with the period.
    Warning,
    /// Behind the period's pace.
    Danger,
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStatus::Success => write!(f, "success"),
            TargetStatus::Warning => write!(f, "warning"),
            TargetStatus::Danger => write!(f, "danger"),
        }
    }
}

/// One report row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TargetEvaluation {
    pub target_id: Uuid,
    pub plan_id: Uuid,
    pub subject: GoalSubject,
    pub metric: MetricKey,
    pub target_value: Decimal,
    pub actual_value: Decimal,
    pub ratio: Decimal,
    /// `ratio * 100` clamped to 0..=100.
    pub score: Decimal,
    pub status: TargetStatus,
    pub bonus_amount: Option<Decimal>,
    pub achieved_at: Option<DateTime<Utc>>,
}

impl TargetEvaluation {
    pub fn is_met(&self) -> bool {
        self.ratio >= Decimal::ONE
    }
}

/// `{ plan, period_progress, rows }` for one plan.
#[derive(Debug, Clone, Serialize)]
pub struct GoalReport {
    pub plan: GoalPlan,
    pub period_progress: Decimal,
    pub rows: Vec<TargetEvaluation>,
}

/// The window metrics are aggregated over: plan start up to now, capped at
/// the plan end.
pub fn evaluation_window(plan: &GoalPlan, now: DateTime<Utc>) -> TimeWindow {
    TimeWindow::new(plan.starts_at, now.min(plan.ends_at))
}

/// Elapsed share of the plan's duration, clamped to 0..=1.
pub fn period_progress(plan: &GoalPlan, now: DateTime<Utc>) -> Decimal {
    let total = (plan.ends_at - plan.starts_at).num_milliseconds();
    if total <= 0 {
        return Decimal::ONE;
    }
    let elapsed = (now - plan.starts_at).num_milliseconds();
    (Decimal::from(elapsed) / Decimal::from(total)).clamp(Decimal::ZERO, Decimal::ONE)
}

/// `actual / target`, saturating at the Decimal bounds on overflow.
fn ratio(actual: Decimal, target: Decimal) -> Decimal {
    if target.is_zero() {
        return Decimal::ZERO;
    }
    actual.checked_div(target).unwrap_or_else(|| {
        if actual.is_sign_negative() == target.is_sign_negative() {
            Decimal::MAX
        } else {
            Decimal::MIN
        }
    })
}

/// The ratio as a percentage, clamped to 0..=100.
fn score(ratio: Decimal) -> Decimal {
    let percent = ratio.checked_mul(Decimal::ONE_HUNDRED).unwrap_or(if ratio.is_sign_negative() {
        Decimal::ZERO
    } else {
        Decimal::ONE_HUNDRED
    });
    percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

pub fn evaluate_target(
    records: &TenantRecords,
    plan: &GoalPlan,
    target: &GoalTarget,
    now: DateTime<Utc>,
) -> TargetEvaluation {
    let window = evaluation_window(plan, now);
    let actual = actual_value(records, target.metric, &target.subject, &window);
    let ratio = ratio(actual, target.target_value);
    let score = score(ratio);
    let status = if ratio >= Decimal::ONE {
        TargetStatus::Success
    } else if ratio >= period_progress(plan, now) {
        TargetStatus::Warning
    } else {
        TargetStatus::Danger
    };

    TargetEvaluation {
        target_id: target.target_id,
        plan_id: plan.plan_id,
        subject: target.subject,
        metric: target.metric,
        target_value: target.target_value,
        actual_value: actual,
        ratio,
        score,
        status,
        bonus_amount: target.bonus_amount,
        achieved_at: target.achieved_at,
    }
}

/// Evaluate every target of a plan.
pub fn build_report(
    records: &TenantRecords,
    plan_id: Uuid,
    now: DateTime<Utc>,
) -> Result<GoalReport, GoalError> {
    let plan = records
        .plans
        .get(&plan_id)
        .ok_or(GoalError::PlanNotFound(plan_id))?;
    let rows = records
        .targets_for_plan(plan_id)
        .into_iter()
        .map(|target| evaluate_target(records, plan, target, now))
        .collect();
    Ok(GoalReport {
        plan: plan.clone(),
        period_progress: period_progress(plan, now),
        rows,
    })
}
