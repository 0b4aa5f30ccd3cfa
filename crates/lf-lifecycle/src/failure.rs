// failure.rs — User-declared surrender and failure resolution.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use lf_events::{DomainEvent, Outbox};
use lf_store::{DeadlineStatus, Failure, FailureStatus, FailureType, LeadStatus};

use crate::error::LifecycleError;
use crate::machine::LeadLifecycle;

impl LeadLifecycle {
    /// Give up on a lead. The reason is mandatory; the active deadline is
    /// voided and the lead stops moving.
    pub fn surrender(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        actor_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Failure, LifecycleError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LifecycleError::InvalidRequest(
                "a surrender needs a reason".to_string(),
            ));
        }

        let (failure, event) = self.store().transact(tenant_id, |records| {
            let lead = records
                .live_lead_mut(lead_id)
                .ok_or(LifecycleError::LeadNotFound(lead_id))?;
            if lead.status == LeadStatus::Failed {
                return Err(LifecycleError::LeadFailed(lead_id));
            }
            lead.status = LeadStatus::Failed;
            lead.updated_at = now;
            let lead_name = lead.name.clone();
            let team_id = lead.team_id;

            records.close_active_deadline(lead_id, DeadlineStatus::Expired, now);

            let failure = Failure {
                failure_id: Uuid::new_v4(),
                lead_id,
                failure_type: FailureType::Surrender,
                failed_by: Some(actor_id),
                status: FailureStatus::Pending,
                reason: Some(reason.to_string()),
                resolved_by: None,
                resolved_at: None,
                resolution_note: None,
                created_at: now,
            };
            records.failures.push(failure.clone());

            let event = DomainEvent::LeadSurrendered {
                tenant_id,
                lead_id,
                lead_name,
                failure_id: failure.failure_id,
                actor_id,
                team_id,
                reason: reason.to_string(),
                timestamp: now,
            };
            Ok((failure, event))
        })?;

        tracing::info!(%tenant_id, %lead_id, failure_id = %failure.failure_id, "lead surrendered");
        outbox.push(event);
        Ok(failure)
    }

    /// Close out a pending failure. An overdue failure gets its reason here.
    pub fn resolve_failure(
        &self,
        tenant_id: Uuid,
        failure_id: Uuid,
        actor_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Failure, LifecycleError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LifecycleError::InvalidRequest(
                "resolving a failure needs a reason".to_string(),
            ));
        }

        let failure = self.store().transact(tenant_id, |records| {
            let failure = records
                .failure_mut(failure_id)
                .ok_or(LifecycleError::FailureNotFound(failure_id))?;
            if failure.status == FailureStatus::Resolved {
                return Err(LifecycleError::FailureAlreadyResolved(failure_id));
            }
            failure.status = FailureStatus::Resolved;
            failure.resolved_by = Some(actor_id);
            failure.resolved_at = Some(now);
            failure.resolution_note = Some(reason.to_string());
            if failure.reason.is_none() {
                failure.reason = Some(reason.to_string());
            }
            Ok(failure.clone())
        })?;

        tracing::info!(%tenant_id, %failure_id, "failure resolved");
        Ok(failure)
    }
}
