// metric.rs — One aggregation function per metric.
//
// Every metric shares the signature `(records, subject, window) -> Decimal`
// and is picked by an exhaustive match on MetricKey, so adding a metric
// without an aggregator does not compile.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use lf_store::{ApprovalStatus, GoalSubject, MetricKey, TenantRecords};

/// An inclusive time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

pub type Aggregator = fn(&TenantRecords, &GoalSubject, &TimeWindow) -> Decimal;

pub fn aggregator(metric: MetricKey) -> Aggregator {
    match metric {
        MetricKey::LeadsCreated => leads_created,
        MetricKey::LeadsClosed => leads_closed,
        MetricKey::Revenue => revenue,
        MetricKey::Meetings => meetings,
        MetricKey::Calls => calls,
    }
}

/// The actual value of `metric` for `subject` over `window`.
pub fn actual_value(
    records: &TenantRecords,
    metric: MetricKey,
    subject: &GoalSubject,
    window: &TimeWindow,
) -> Decimal {
    aggregator(metric)(records, subject, window)
}

/// Whether a row credited to `user_id` (written while on `team_id`) counts
/// toward `subject`.
fn in_scope(subject: &GoalSubject, user_id: Option<Uuid>, team_id: Option<Uuid>) -> bool {
    match subject {
        GoalSubject::User(id) => user_id == Some(*id),
        GoalSubject::Team(id) => team_id == Some(*id),
        GoalSubject::All => true,
    }
}

fn count(n: usize) -> Decimal {
    Decimal::from(n as u64)
}

fn leads_created(records: &TenantRecords, subject: &GoalSubject, window: &TimeWindow) -> Decimal {
    count(
        records
            .leads
            .values()
            .filter(|l| !l.deleted && window.contains(l.created_at))
            .filter(|l| in_scope(subject, l.assigned_user_id, l.team_id))
            .count(),
    )
}

/// Approved closures and approved deals as `(amount)` rows in scope.
fn closed_amounts<'a>(
    records: &'a TenantRecords,
    subject: &'a GoalSubject,
    window: &'a TimeWindow,
) -> impl Iterator<Item = Decimal> + 'a {
    let approved_in = move |status: ApprovalStatus, at: Option<DateTime<Utc>>| {
        status == ApprovalStatus::Approved && at.is_some_and(|t| window.contains(t))
    };
    let closures = records
        .closures
        .iter()
        .filter(move |c| approved_in(c.status, c.approved_at))
        .filter(move |c| in_scope(subject, Some(c.user_id), c.team_id))
        .map(|c| c.amount);
    let deals = records
        .deals
        .iter()
        .filter(move |d| approved_in(d.status, d.approved_at))
        .filter(move |d| in_scope(subject, Some(d.user_id), d.team_id))
        .map(|d| d.price);
    closures.chain(deals)
}

fn leads_closed(records: &TenantRecords, subject: &GoalSubject, window: &TimeWindow) -> Decimal {
    count(closed_amounts(records, subject, window).count())
}

fn revenue(records: &TenantRecords, subject: &GoalSubject, window: &TimeWindow) -> Decimal {
    closed_amounts(records, subject, window).sum()
}

fn meetings(records: &TenantRecords, subject: &GoalSubject, window: &TimeWindow) -> Decimal {
    count(
        records
            .meetings
            .iter()
            .filter(|m| window.contains(m.created_at))
            .filter(|m| in_scope(subject, Some(m.organizer_id), m.team_id))
            .count(),
    )
}

fn calls(records: &TenantRecords, subject: &GoalSubject, window: &TimeWindow) -> Decimal {
    count(
        records
            .calls
            .iter()
            .filter(|c| window.contains(c.created_at))
            .filter(|c| in_scope(subject, Some(c.caller_id), c.team_id))
            .count(),
    )
}
