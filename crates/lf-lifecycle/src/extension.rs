// extension.rs — Deadline extension requests and decisions.
//
// Hours already pending or approved for a lead and stage count against one
// cumulative cap. A request that would cross it writes nothing. Requests are
// only taken for the stage the lead is in, so the cap can't be spread over
// stages the lead hasn't reached.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use lf_events::{DomainEvent, NotifyTarget, Outbox};
use lf_stages::CatalogRegistry;
use lf_store::{Extension, ExtensionStatus, Role, Store};

use crate::error::LifecycleError;
use crate::policy::SlaPolicy;

pub struct ExtensionNegotiator {
    store: Arc<Store>,
    catalogs: Arc<CatalogRegistry>,
    policy: SlaPolicy,
}

impl ExtensionNegotiator {
    pub fn new(store: Arc<Store>, catalogs: Arc<CatalogRegistry>, policy: SlaPolicy) -> Self {
        Self {
            store,
            catalogs,
            policy,
        }
    }

    /// Ask for `hours` more on the lead's active deadline.
    #[allow(clippy::too_many_arguments)]
    pub fn request(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        stage: &str,
        requested_by: Uuid,
        hours: i64,
        reason: &str,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Extension, LifecycleError> {
        let cap = self.policy.extension_cap_hours;
        if hours <= 0 || hours > i64::from(cap) {
            return Err(LifecycleError::InvalidRequest(format!(
                "extension hours must be between 1 and {}, got {}",
                cap, hours
            )));
        }
        let hours = u32::try_from(hours).map_err(|_| {
            LifecycleError::InvalidRequest(format!("extension hours out of range: {}", hours))
        })?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LifecycleError::InvalidRequest(
                "an extension request needs a reason".to_string(),
            ));
        }
        self.catalogs.for_tenant(tenant_id).require_stage(stage)?;

        let (extension, event) = self.store.transact(tenant_id, |records| {
            let lead = records
                .live_lead(lead_id)
                .ok_or(LifecycleError::LeadNotFound(lead_id))?;
            if lead.status.stage() != Some(stage) {
                return Err(LifecycleError::InvalidRequest(format!(
                    "extensions for lead {} apply to its current state '{}', not '{}'",
                    lead_id, lead.status, stage
                )));
            }
            let lead_name = lead.name.clone();
            let team_id = lead.team_id;

            let deadline_id = records
                .active_deadline(lead_id)
                .map(|d| d.deadline_id)
                .ok_or(LifecycleError::NoActiveDeadline(lead_id))?;

            let committed = records.committed_extension_hours(lead_id, stage);
            if committed + hours > cap {
                return Err(LifecycleError::CapExceeded {
                    lead_id,
                    stage: stage.to_string(),
                    committed,
                    requested: hours,
                    cap,
                });
            }

            let resolver = match team_id.and_then(|team| records.active_team_leader(team)) {
                Some(leader) => NotifyTarget::User(leader),
                None => NotifyTarget::Role(Role::Owner),
            };

            let extension = Extension {
                extension_id: Uuid::new_v4(),
                lead_id,
                deadline_id,
                stage: stage.to_string(),
                requested_by,
                hours,
                reason: reason.to_string(),
                status: ExtensionStatus::Pending,
                decided_by: None,
                decision_reason: None,
                created_at: now,
                decided_at: None,
            };
            records.extensions.push(extension.clone());

            let event = DomainEvent::ExtensionRequested {
                tenant_id,
                extension_id: extension.extension_id,
                lead_id,
                lead_name,
                requested_by,
                hours,
                reason: reason.to_string(),
                resolver,
                timestamp: now,
            };
            Ok((extension, event))
        })?;

        tracing::info!(
            %tenant_id,
            %lead_id,
            extension_id = %extension.extension_id,
            hours,
            "extension requested"
        );
        outbox.push(event);
        Ok(extension)
    }

    /// Approve a pending request and push the active deadline out.
    pub fn approve(
        &self,
        tenant_id: Uuid,
        extension_id: Uuid,
        approver_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Extension, LifecycleError> {
        let (extension, new_due_at) = self.store.transact(tenant_id, |records| {
            let pending = pending_extension(records.extension(extension_id), extension_id)?;
            let lead_id = pending.lead_id;
            let hours = pending.hours;

            let deadline = records
                .active_deadline_mut(lead_id)
                .ok_or(LifecycleError::NoActiveDeadline(lead_id))?;
            deadline.due_at += Duration::hours(i64::from(hours));
            deadline.updated_at = now;
            let new_due_at = deadline.due_at;

            let extension = records
                .extension_mut(extension_id)
                .ok_or(LifecycleError::ExtensionNotFound(extension_id))?;
            extension.status = ExtensionStatus::Approved;
            extension.decided_by = Some(approver_id);
            extension.decided_at = Some(now);
            Ok::<_, LifecycleError>((extension.clone(), new_due_at))
        })?;

        tracing::info!(
            %tenant_id,
            %extension_id,
            lead_id = %extension.lead_id,
            new_due_at = %new_due_at,
            "extension approved"
        );
        outbox.push(decided_event(tenant_id, &extension, true, Some(new_due_at), now));
        Ok(extension)
    }

    /// Reject a pending request. The deadline is left as it is.
    pub fn reject(
        &self,
        tenant_id: Uuid,
        extension_id: Uuid,
        approver_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<Extension, LifecycleError> {
        let reason = reason.trim();
        let extension = self.store.transact(tenant_id, |records| {
            pending_extension(records.extension(extension_id), extension_id)?;
            let extension = records
                .extension_mut(extension_id)
                .ok_or(LifecycleError::ExtensionNotFound(extension_id))?;
            extension.status = ExtensionStatus::Rejected;
            extension.decided_by = Some(approver_id);
            extension.decided_at = Some(now);
            extension.decision_reason = (!reason.is_empty()).then(|| reason.to_string());
            Ok::<_, LifecycleError>(extension.clone())
        })?;

        tracing::info!(%tenant_id, %extension_id, lead_id = %extension.lead_id, "extension rejected");
        outbox.push(decided_event(tenant_id, &extension, false, None, now));
        Ok(extension)
    }
}

fn pending_extension(
    extension: Option<&Extension>,
    extension_id: Uuid,
) -> Result<&Extension, LifecycleError> {
    let extension = extension.ok_or(LifecycleError::ExtensionNotFound(extension_id))?;
    if extension.status != ExtensionStatus::Pending {
        return Err(LifecycleError::AlreadyDecided {
            extension_id,
            status: extension.status,
        });
    }
    Ok(extension)
}

fn decided_event(
    tenant_id: Uuid,
    extension: &Extension,
    approved: bool,
    new_due_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DomainEvent {
    DomainEvent::ExtensionDecided {
        tenant_id,
        extension_id: extension.extension_id,
        lead_id: extension.lead_id,
        requested_by: extension.requested_by,
        decided_by: extension.decided_by.unwrap_or_default(),
        approved,
        hours: extension.hours,
        new_due_at,
        reason: extension.decision_reason.clone(),
        timestamp: now,
    }
}
