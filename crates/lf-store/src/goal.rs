// goal.rs — Goal plans and the targets they own.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalPeriod {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    Custom,
}

impl FromStr for GoalPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(GoalPeriod::Weekly),
            "monthly" => Ok(GoalPeriod::Monthly),
            "quarterly" => Ok(GoalPeriod::Quarterly),
            "yearly" => Ok(GoalPeriod::Yearly),
            "custom" => Ok(GoalPeriod::Custom),
            other => Err(format!("unknown goal period '{}'", other)),
        }
    }
}

/// A time-boxed set of targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalPlan {
    pub plan_id: Uuid,
    pub name: String,
    pub period: GoalPeriod,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// At most one plan per tenant is pinned.
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl GoalPlan {
    pub fn new(
        name: impl Into<String>,
        period: GoalPeriod,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            plan_id: Uuid::new_v4(),
            name: name.into(),
            period,
            starts_at,
            ends_at,
            is_pinned: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// True when the plan is active and `now` falls inside its window.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.starts_at <= now && now <= self.ends_at
    }
}

/// Which activity a target measures.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    LeadsCreated,
    LeadsClosed,
    Revenue,
    Meetings,
    Calls,
}

impl MetricKey {
    pub const ALL: [MetricKey; 5] = [
        MetricKey::LeadsCreated,
        MetricKey::LeadsClosed,
        MetricKey::Revenue,
        MetricKey::Meetings,
        MetricKey::Calls,
    ];
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKey::LeadsCreated => write!(f, "leads_created"),
            MetricKey::LeadsClosed => write!(f, "leads_closed"),
            MetricKey::Revenue => write!(f, "revenue"),
            MetricKey::Meetings => write!(f, "meetings"),
            MetricKey::Calls => write!(f, "calls"),
        }
    }
}

impl FromStr for MetricKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .into_iter()
            .find(|m| m.to_string() == s)
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}

/// Who a target is assigned to.
///
/// Serializes as `{"subject_type": "team", "subject_id": "..."}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "subject_type", content = "subject_id", rename_all = "snake_case")]
pub enum GoalSubject {
    User(Uuid),
    Team(Uuid),
    All,
}

/// A quantified metric assignment inside a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalTarget {
    pub target_id: Uuid,
    pub plan_id: Uuid,
    pub subject: GoalSubject,
    pub metric: MetricKey,
    pub target_value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_amount: Option<Decimal>,
    /// Set on the first crossing of 100%; the payout idempotency marker.
    #[serde(default)]
    pub achieved_at: Option<DateTime<Utc>>,
}

impl GoalTarget {
    pub fn new(plan_id: Uuid, subject: GoalSubject, metric: MetricKey, target_value: Decimal) -> Self {
        Self {
            target_id: Uuid::new_v4(),
            plan_id,
            subject,
            metric,
            target_value,
            bonus_amount: None,
            achieved_at: None,
        }
    }

    /// Attach a bonus paid on achievement (builder style).
    pub fn with_bonus(mut self, amount: Decimal) -> Self {
        self.bonus_amount = Some(amount);
        self
    }
}
