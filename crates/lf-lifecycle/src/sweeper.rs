// sweeper.rs — Periodic SLA pass over one tenant.
//
// Step 1 opens a deadline for every lead sitting in a tracked stage without
// one. Step 2 fails every lead whose active deadline is past due, clears its
// assignment, and deactivates a sales-only former owner.
//
// Each lead is processed in its own transaction. A lead that errors is
// logged and counted, and the pass moves on. Every write goes through a
// conditional row helper, so overlapping passes over the same tenant only
// ever act once per deadline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use lf_events::{DomainEvent, Outbox};
use lf_stages::CatalogRegistry;
use lf_store::{DeadlineSlot, DeadlineStatus, LeadStatus, Store, TenantRecords, UserStatus};

use crate::error::LifecycleError;
use crate::policy::SlaPolicy;

/// Counts from one sweep pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub tenant_id: Uuid,
    pub deadlines_opened: usize,
    pub deadlines_overdue: usize,
    pub failures_created: usize,
    pub users_deactivated: usize,
    /// Leads (or deadlines) whose processing failed this pass.
    pub errors: usize,
}

impl SweepReport {
    pub fn is_quiet(&self) -> bool {
        self.deadlines_opened == 0 && self.deadlines_overdue == 0 && self.errors == 0
    }
}

pub struct DeadlineSweeper {
    store: Arc<Store>,
    catalogs: Arc<CatalogRegistry>,
    policy: SlaPolicy,
}

impl DeadlineSweeper {
    pub fn new(store: Arc<Store>, catalogs: Arc<CatalogRegistry>, policy: SlaPolicy) -> Self {
        Self {
            store,
            catalogs,
            policy,
        }
    }

    /// Run one pass over `tenant_id`.
    pub fn sweep(&self, tenant_id: Uuid, now: DateTime<Utc>, outbox: &mut Outbox) -> SweepReport {
        let mut report = SweepReport {
            tenant_id,
            ..SweepReport::default()
        };
        self.open_missing_deadlines(tenant_id, now, &mut report);
        self.fail_overdue_leads(tenant_id, now, &mut report, outbox);

        if report.is_quiet() {
            tracing::debug!(%tenant_id, "sweep found nothing to do");
        } else {
            tracing::info!(
                %tenant_id,
                opened = report.deadlines_opened,
                overdue = report.deadlines_overdue,
                failures = report.failures_created,
                deactivated = report.users_deactivated,
                errors = report.errors,
                "deadline sweep finished"
            );
        }
        report
    }

    fn open_missing_deadlines(&self, tenant_id: Uuid, now: DateTime<Utc>, report: &mut SweepReport) {
        let catalog = self.catalogs.for_tenant(tenant_id);
        let candidates: Vec<Uuid> = self.store.read(tenant_id, |records| {
            records
                .leads
                .values()
                .filter(|lead| !lead.deleted && lead.assigned_user_id.is_some())
                .filter(|lead| lead.status.stage().is_some_and(|s| catalog.is_tracked(s)))
                .filter(|lead| records.active_deadline(lead.lead_id).is_none())
                .map(|lead| lead.lead_id)
                .collect()
        });

        for lead_id in candidates {
            let outcome = self.store.transact(tenant_id, |records| {
                // Re-check under the transaction; the lead may have moved on.
                let Some(stage) = records
                    .live_lead(lead_id)
                    .filter(|lead| lead.assigned_user_id.is_some())
                    .and_then(|lead| lead.status.stage())
                    .filter(|s| catalog.is_tracked(s))
                    .map(str::to_string)
                else {
                    return Ok::<_, LifecycleError>(None);
                };
                Ok(Some(records.open_deadline_if_none(
                    lead_id,
                    &stage,
                    self.policy.due_from(now),
                    now,
                )))
            });
            match outcome {
                Ok(Some(DeadlineSlot::Opened(deadline_id))) => {
                    tracing::info!(%tenant_id, %lead_id, %deadline_id, "deadline opened by sweep");
                    report.deadlines_opened += 1;
                }
                Ok(Some(DeadlineSlot::Existing(_))) | Ok(None) => {
                    tracing::debug!(%tenant_id, %lead_id, "deadline already handled");
                }
                Err(e) => {
                    tracing::warn!(%tenant_id, %lead_id, "could not open deadline: {}", e);
                    report.errors += 1;
                }
            }
        }
    }

    fn fail_overdue_leads(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
        report: &mut SweepReport,
        outbox: &mut Outbox,
    ) {
        let overdue = self
            .store
            .read(tenant_id, |records| records.overdue_deadlines(now));

        for deadline_id in overdue {
            let outcome = self
                .store
                .transact(tenant_id, |records| fail_overdue(records, deadline_id, now));
            match outcome {
                Ok(Some(overdue)) => {
                    report.deadlines_overdue += 1;
                    if overdue.failure_id.is_some() {
                        report.failures_created += 1;
                    }
                    if overdue.owner_deactivated {
                        report.users_deactivated += 1;
                    }
                    tracing::info!(
                        %tenant_id,
                        lead_id = %overdue.lead_id,
                        %deadline_id,
                        owner_deactivated = overdue.owner_deactivated,
                        "lead failed as overdue"
                    );
                    outbox.push(DomainEvent::LeadOverdue {
                        tenant_id,
                        lead_id: overdue.lead_id,
                        lead_name: overdue.lead_name,
                        deadline_id,
                        failure_id: overdue.failure_id,
                        former_owner_id: overdue.former_owner_id,
                        owner_deactivated: overdue.owner_deactivated,
                        timestamp: now,
                    });
                }
                Ok(None) => {
                    tracing::debug!(%tenant_id, %deadline_id, "deadline no longer active");
                }
                Err(e) => {
                    tracing::warn!(%tenant_id, %deadline_id, "overdue processing failed: {}", e);
                    report.errors += 1;
                }
            }
        }
    }
}

struct OverdueLead {
    lead_id: Uuid,
    lead_name: String,
    failure_id: Option<Uuid>,
    former_owner_id: Option<Uuid>,
    owner_deactivated: bool,
}

/// Apply the overdue compensation for one deadline. `None` when another
/// pass already flipped it, or the lead is gone.
fn fail_overdue(
    records: &mut TenantRecords,
    deadline_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<OverdueLead>, LifecycleError> {
    let Some(lead_id) = records
        .deadlines
        .iter()
        .find(|d| d.deadline_id == deadline_id && d.status == DeadlineStatus::Active)
        .map(|d| d.lead_id)
    else {
        return Ok(None);
    };
    if records.live_lead(lead_id).is_none() {
        return Ok(None);
    }

    records.mark_overdue_if_active(deadline_id, now);
    let failure_id = records.create_overdue_failure_if_none_pending(lead_id, now);

    let Some(lead) = records.live_lead_mut(lead_id) else {
        return Ok(None);
    };
    lead.status = LeadStatus::Failed;
    lead.updated_at = now;
    let former_owner_id = lead.assigned_user_id.take();
    let lead_name = lead.name.clone();

    let mut owner_deactivated = false;
    if let Some(owner) = former_owner_id.and_then(|id| records.users.get_mut(&id)) {
        if owner.is_active() && owner.is_sales_only() {
            owner.status = UserStatus::Inactive;
            owner.updated_at = now;
            owner_deactivated = true;
        }
    }

    Ok(Some(OverdueLead {
        lead_id,
        lead_name,
        failure_id,
        former_owner_id,
        owner_deactivated,
    }))
}
