// machine.rs — The lead lifecycle state machine.
//
// One transition is one store transaction: validate the answers against the
// target stage, check the edge from the lead's last history row, append the
// history row, move the lead, then either complete the deadline (terminal
// stage) or open one if none is active. The DomainEvent is queued only after
// the transaction has committed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use lf_events::{DomainEvent, Outbox};
use lf_stages::{parse_number, Answers, CatalogRegistry};
use lf_store::{
    ApprovalStatus, Closure, DeadlineSlot, DeadlineStatus, HistoryEntry, HistoryMetadata,
    LeadStatus, Store, TenantRecords,
};

use crate::error::LifecycleError;
use crate::policy::SlaPolicy;

/// Answer ids the terminal stage uses to describe the closed deal.
const AMOUNT_ANSWER: &str = "amount";
const CONTRACT_DATE_ANSWER: &str = "contract_date";

/// What a transition or undo did.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StageResult {
    pub lead_id: Uuid,
    pub from_state: Option<String>,
    pub to_state: String,
    pub history_entry_id: Uuid,
    /// The lead's active deadline afterwards; `None` after a terminal stage.
    pub deadline_id: Option<Uuid>,
    /// True if this call opened that deadline.
    pub deadline_opened: bool,
    pub terminal: bool,
    /// The closure request recorded on entering the terminal stage.
    pub closure_id: Option<Uuid>,
}

/// Executes guarded stage transitions and single-level undo.
pub struct LeadLifecycle {
    store: Arc<Store>,
    catalogs: Arc<CatalogRegistry>,
    policy: SlaPolicy,
}

impl LeadLifecycle {
    pub fn new(store: Arc<Store>, catalogs: Arc<CatalogRegistry>, policy: SlaPolicy) -> Self {
        Self {
            store,
            catalogs,
            policy,
        }
    }

    pub fn policy(&self) -> &SlaPolicy {
        &self.policy
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    /// Move a lead into `to_state`.
    #[allow(clippy::too_many_arguments)]
    pub fn transition(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        to_state: &str,
        actor_id: Uuid,
        answers: Answers,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<StageResult, LifecycleError> {
        let catalog = self.catalogs.for_tenant(tenant_id);
        let target = catalog.require_stage(to_state)?;
        catalog.validate_answers(to_state, &answers)?;
        let terminal = target.is_terminal;

        let (result, event) = self.store.transact(tenant_id, |records| {
            let lead = records
                .live_lead(lead_id)
                .ok_or(LifecycleError::LeadNotFound(lead_id))?;
            if lead.status == LeadStatus::Failed {
                return Err(LifecycleError::LeadFailed(lead_id));
            }
            let lead_name = lead.name.clone();
            let owner_id = lead.assigned_user_id;
            let team_id = lead.team_id;

            let from_state = records.latest_history(lead_id).map(|h| h.to_state.clone());
            let edge = catalog
                .edge(from_state.as_deref(), to_state)
                .ok_or_else(|| LifecycleError::InvalidTransition {
                    lead_id,
                    from: from_state.clone().unwrap_or_else(|| "none".to_string()),
                    to: to_state.to_string(),
                })?;
            let requires_approval = edge.requires_approval;

            let entry = HistoryEntry {
                entry_id: Uuid::new_v4(),
                lead_id,
                from_state: from_state.clone(),
                to_state: to_state.to_string(),
                changed_by: actor_id,
                answers: answers.clone(),
                metadata: HistoryMetadata::default(),
                created_at: now,
            };
            let history_entry_id = entry.entry_id;
            records.history.push(entry);
            set_stage(records, lead_id, to_state, now)?;

            let mut deadline_id = None;
            let mut deadline_opened = false;
            let mut closure_id = None;
            let mut closed_amount = None;

            if terminal {
                if let Some(id) = records.close_active_deadline(lead_id, DeadlineStatus::Completed, now)
                {
                    tracing::debug!(%lead_id, deadline_id = %id, "deadline completed at terminal stage");
                }
                let amount = parse_amount(to_state, answers.get(AMOUNT_ANSWER))?;
                let closure = Closure {
                    closure_id: Uuid::new_v4(),
                    lead_id,
                    user_id: owner_id.unwrap_or(actor_id),
                    team_id,
                    amount,
                    contract_date: answers
                        .get(CONTRACT_DATE_ANSWER)
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    status: if requires_approval {
                        ApprovalStatus::Pending
                    } else {
                        ApprovalStatus::Approved
                    },
                    approved_by: None,
                    approved_at: (!requires_approval).then_some(now),
                    created_at: now,
                };
                closure_id = Some(closure.closure_id);
                closed_amount = Some(amount);
                records.closures.push(closure);
            } else if owner_id.is_some() {
                let slot =
                    records.open_deadline_if_none(lead_id, to_state, self.policy.due_from(now), now);
                match slot {
                    DeadlineSlot::Opened(_) => deadline_opened = true,
                    DeadlineSlot::Existing(id) => {
                        tracing::debug!(%lead_id, deadline_id = %id, "active deadline kept");
                    }
                }
                deadline_id = Some(slot.deadline_id());
            } else {
                tracing::debug!(%lead_id, "unassigned lead, no deadline opened");
            }

            let result = StageResult {
                lead_id,
                from_state: from_state.clone(),
                to_state: to_state.to_string(),
                history_entry_id,
                deadline_id,
                deadline_opened,
                terminal,
                closure_id,
            };
            let event = DomainEvent::StageCompleted {
                tenant_id,
                lead_id,
                lead_name,
                from_state,
                to_state: to_state.to_string(),
                actor_id,
                owner_id,
                team_id,
                terminal,
                closed_amount,
                timestamp: now,
            };
            Ok((result, event))
        })?;

        tracing::info!(
            %tenant_id,
            %lead_id,
            from = result.from_state.as_deref().unwrap_or("none"),
            to = %result.to_state,
            actor = %actor_id,
            "lead transitioned"
        );
        outbox.push(event);
        Ok(result)
    }

    /// Reverse the lead's most recent transition.
    pub fn undo(
        &self,
        tenant_id: Uuid,
        lead_id: Uuid,
        actor_id: Uuid,
        now: DateTime<Utc>,
        outbox: &mut Outbox,
    ) -> Result<StageResult, LifecycleError> {
        let (result, event) = self.store.transact(tenant_id, |records| {
            let lead = records
                .live_lead(lead_id)
                .ok_or(LifecycleError::LeadNotFound(lead_id))?;
            if lead.status == LeadStatus::Failed {
                return Err(LifecycleError::LeadFailed(lead_id));
            }
            let lead_name = lead.name.clone();
            let owner_id = lead.assigned_user_id;

            let latest = records
                .latest_history(lead_id)
                .ok_or(LifecycleError::NothingToUndo(lead_id))?;
            if latest.carries_undo_marker() {
                return Err(LifecycleError::AlreadyUndone {
                    lead_id,
                    entry_id: latest.entry_id,
                });
            }
            let Some(restored) = latest.from_state.clone() else {
                return Err(LifecycleError::NothingToUndo(lead_id));
            };
            let original_id = latest.entry_id;
            let undone_state = latest.to_state.clone();

            let reversing = HistoryEntry {
                entry_id: Uuid::new_v4(),
                lead_id,
                from_state: Some(undone_state.clone()),
                to_state: restored.clone(),
                changed_by: actor_id,
                answers: Answers::new(),
                metadata: HistoryMetadata {
                    undo_of: Some(original_id),
                    ..HistoryMetadata::default()
                },
                created_at: now,
            };
            let reversing_id = reversing.entry_id;
            if let Some(original) = records.history_entry_mut(original_id) {
                original.metadata.undone_by = Some(reversing_id);
                original.metadata.undone_at = Some(now);
            }
            records.history.push(reversing);
            set_stage(records, lead_id, &restored, now)?;

            // An undone closing withdraws its pending closure request.
            for closure in records
                .closures
                .iter_mut()
                .filter(|c| c.lead_id == lead_id && c.status == ApprovalStatus::Pending)
            {
                closure.status = ApprovalStatus::Rejected;
            }

            records.close_active_deadline(lead_id, DeadlineStatus::Completed, now);
            let slot = owner_id.map(|_| {
                records.open_deadline_if_none(lead_id, &restored, self.policy.due_from(now), now)
            });

            let result = StageResult {
                lead_id,
                from_state: Some(undone_state.clone()),
                to_state: restored.clone(),
                history_entry_id: reversing_id,
                deadline_id: slot.as_ref().map(DeadlineSlot::deadline_id),
                deadline_opened: matches!(slot, Some(DeadlineSlot::Opened(_))),
                terminal: false,
                closure_id: None,
            };
            let event = DomainEvent::TransitionUndone {
                tenant_id,
                lead_id,
                lead_name,
                undone_state,
                restored_state: restored,
                actor_id,
                owner_id,
                timestamp: now,
            };
            Ok((result, event))
        })?;

        tracing::info!(
            %tenant_id,
            %lead_id,
            restored = %result.to_state,
            actor = %actor_id,
            "transition undone"
        );
        outbox.push(event);
        Ok(result)
    }
}

fn set_stage(
    records: &mut TenantRecords,
    lead_id: Uuid,
    stage: &str,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    let lead = records
        .live_lead_mut(lead_id)
        .ok_or(LifecycleError::LeadNotFound(lead_id))?;
    lead.status = LeadStatus::InStage(stage.to_string());
    lead.updated_at = now;
    Ok(())
}

/// The closed amount from the `amount` answer, zero if the stage has none.
fn parse_amount(stage: &str, answer: Option<&Value>) -> Result<Decimal, LifecycleError> {
    let Some(value) = answer else {
        return Ok(Decimal::ZERO);
    };
    parse_number(value).ok_or_else(|| LifecycleError::InvalidAnswer {
        stage: stage.to_string(),
        question: AMOUNT_ANSWER.to_string(),
        reason: format!("{} is not a non-negative number", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use chrono::Duration;
    use lf_store::{Lead, Role, StoreError, User};
    use serde_json::json;

    struct Fixture {
        lifecycle: LeadLifecycle,
        store: Arc<Store>,
        tenant: Uuid,
        seller: Uuid,
        lead: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(Store::in_memory());
        let tenant = Uuid::new_v4();
        let (seller, lead) = store
            .transact(tenant, |r| {
                let seller = r.add_user(User::new("Sam", vec![Role::Sales]));
                let lead = r.add_lead(Lead::new("Acme", Some(seller), None));
                Ok::<_, StoreError>((seller, lead))
            })
            .unwrap();
        let lifecycle = LeadLifecycle::new(
            store.clone(),
            Arc::new(CatalogRegistry::default()),
            SlaPolicy::default(),
        );
        Fixture {
            lifecycle,
            store,
            tenant,
            seller,
            lead,
        }
    }

    fn answers(pairs: &[(&str, Value)]) -> Answers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn call_answers() -> Answers {
        answers(&[("outcome", json!("interested"))])
    }

    impl Fixture {
        fn move_to(&self, stage: &str, answers: Answers, now: DateTime<Utc>) -> Result<StageResult, LifecycleError> {
            let mut outbox = Outbox::new();
            self.lifecycle
                .transition(self.tenant, self.lead, stage, self.seller, answers, now, &mut outbox)
        }

        fn status(&self) -> LeadStatus {
            self.store
                .read(self.tenant, |r| r.leads[&self.lead].status.clone())
        }
    }

    #[test]
    fn first_entry_opens_a_seven_day_deadline() {
        let f = fixture();
        let now = Utc::now();
        let result = f.move_to("call", call_answers(), now).unwrap();
        assert!(result.deadline_opened);
        assert_eq!(result.from_state, None);
        assert_eq!(f.status(), LeadStatus::InStage("call".to_string()));

        let due = f
            .store
            .read(f.tenant, |r| r.active_deadline(f.lead).unwrap().due_at);
        assert_eq!(due, now + Duration::days(7));
    }

    #[test]
    fn unassigned_lead_gets_no_deadline() {
        let f = fixture();
        let unassigned = f
            .store
            .transact(f.tenant, |r| Ok::<_, StoreError>(r.add_lead(Lead::new("Initech", None, None))))
            .unwrap();
        let now = Utc::now();
        let mut outbox = Outbox::new();
        let result = f
            .lifecycle
            .transition(f.tenant, unassigned, "call", f.seller, call_answers(), now, &mut outbox)
            .unwrap();
        assert!(!result.deadline_opened);
        assert_eq!(result.deadline_id, None);
        assert!(f.store.read(f.tenant, |r| r.active_deadline(unassigned).is_none()));
    }

    #[test]
    fn later_transitions_keep_the_same_deadline() {
        let f = fixture();
        let now = Utc::now();
        let first = f.move_to("call", call_answers(), now).unwrap();
        let second = f
            .move_to("meeting", answers(&[("meeting_date", json!("2026-03-01"))]), now + Duration::days(2))
            .unwrap();
        assert!(!second.deadline_opened);
        assert_eq!(first.deadline_id, second.deadline_id);
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let f = fixture();
        f.move_to("call", call_answers(), Utc::now()).unwrap();
        let err = f
            .move_to(
                "closing",
                answers(&[("amount", json!(1000)), ("contract_date", json!("2026-03-01"))]),
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(f.status(), LeadStatus::InStage("call".to_string()));
    }

    #[test]
    fn initial_entry_must_be_the_first_stage() {
        let f = fixture();
        let err = f
            .move_to("meeting", answers(&[("meeting_date", json!("2026-03-01"))]), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(f.status(), LeadStatus::New);
    }

    #[test]
    fn missing_answer_names_the_question() {
        let f = fixture();
        let err = f.move_to("call", Answers::new(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("outcome"));
        assert!(f.store.read(f.tenant, |r| r.history.is_empty()));
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let f = fixture();
        let err = f.move_to("negotiation", Answers::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, LifecycleError::UnknownStage(_)));
    }

    #[test]
    fn closing_completes_deadline_and_records_closure() {
        let f = fixture();
        let now = Utc::now();
        f.move_to("call", call_answers(), now).unwrap();
        f.move_to("meeting", answers(&[("meeting_date", json!("2026-03-01"))]), now)
            .unwrap();
        f.move_to("site_visit", answers(&[("visit_date", json!("2026-03-05"))]), now)
            .unwrap();

        let mut outbox = Outbox::new();
        let result = f
            .lifecycle
            .transition(
                f.tenant,
                f.lead,
                "closing",
                f.seller,
                answers(&[("amount", json!("15000.50")), ("contract_date", json!("2026-03-10"))]),
                now,
                &mut outbox,
            )
            .unwrap();
        assert!(result.terminal);
        assert!(result.deadline_id.is_none());

        f.store.read(f.tenant, |r| {
            assert!(r.active_deadline(f.lead).is_none());
            let closure = &r.closures[0];
            assert_eq!(closure.amount, Decimal::from_str("15000.50").unwrap());
            assert_eq!(closure.status, ApprovalStatus::Pending);
            assert_eq!(closure.user_id, f.seller);
        });
        match &outbox.events()[0] {
            DomainEvent::StageCompleted {
                terminal,
                closed_amount,
                ..
            } => {
                assert!(terminal);
                assert_eq!(*closed_amount, Some(Decimal::from_str("15000.50").unwrap()));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn undo_restores_previous_stage_once() {
        let f = fixture();
        let now = Utc::now();
        f.move_to("call", call_answers(), now).unwrap();
        f.move_to("meeting", answers(&[("meeting_date", json!("2026-03-01"))]), now)
            .unwrap();

        let mut outbox = Outbox::new();
        let later = now + Duration::days(3);
        let undone = f
            .lifecycle
            .undo(f.tenant, f.lead, f.seller, later, &mut outbox)
            .unwrap();
        assert_eq!(undone.to_state, "call");
        assert!(undone.deadline_opened);
        assert_eq!(f.status(), LeadStatus::InStage("call".to_string()));

        f.store.read(f.tenant, |r| {
            assert_eq!(r.active_deadline(f.lead).unwrap().due_at, later + Duration::days(7));
            let history = r.history_for(f.lead);
            assert_eq!(history.len(), 3);
            assert_eq!(history[1].metadata.undone_by, Some(undone.history_entry_id));
            assert_eq!(history[2].metadata.undo_of, Some(history[1].entry_id));
        });

        let again = f.lifecycle.undo(f.tenant, f.lead, f.seller, later, &mut outbox);
        assert!(matches!(again, Err(LifecycleError::AlreadyUndone { .. })));
        assert_eq!(f.status(), LeadStatus::InStage("call".to_string()));
    }

    #[test]
    fn undo_of_initial_entry_has_nothing_to_undo() {
        let f = fixture();
        let mut outbox = Outbox::new();
        let none = f.lifecycle.undo(f.tenant, f.lead, f.seller, Utc::now(), &mut outbox);
        assert!(matches!(none, Err(LifecycleError::NothingToUndo(_))));

        f.move_to("call", call_answers(), Utc::now()).unwrap();
        let first = f.lifecycle.undo(f.tenant, f.lead, f.seller, Utc::now(), &mut outbox);
        assert!(matches!(first, Err(LifecycleError::NothingToUndo(_))));
    }

    #[test]
    fn transition_after_undo_follows_restored_stage() {
        let f = fixture();
        let now = Utc::now();
        f.move_to("call", call_answers(), now).unwrap();
        f.move_to("meeting", answers(&[("meeting_date", json!("2026-03-01"))]), now)
            .unwrap();
        let mut outbox = Outbox::new();
        f.lifecycle
            .undo(f.tenant, f.lead, f.seller, now, &mut outbox)
            .unwrap();
        let redo = f
            .move_to("meeting", answers(&[("meeting_date", json!("2026-03-02"))]), now)
            .unwrap();
        assert_eq!(redo.from_state.as_deref(), Some("call"));
    }

    #[test]
    fn failed_leads_cannot_move() {
        let f = fixture();
        f.move_to("call", call_answers(), Utc::now()).unwrap();
        f.store
            .transact(f.tenant, |r| {
                r.live_lead_mut(f.lead).unwrap().status = LeadStatus::Failed;
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let err = f
            .move_to("meeting", answers(&[("meeting_date", json!("2026-03-01"))]), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::LeadFailed(_)));
    }

    #[test]
    fn amounts_parse_from_numbers_and_strings() {
        assert_eq!(parse_amount("closing", Some(&json!(250))).unwrap(), Decimal::from(250));
        assert_eq!(
            parse_amount("closing", Some(&json!(" 99.95 "))).unwrap(),
            Decimal::from_str("99.95").unwrap()
        );
        assert_eq!(
            parse_amount("closing", Some(&json!("1e6"))).unwrap(),
            Decimal::from(1_000_000)
        );
        assert_eq!(parse_amount("closing", None).unwrap(), Decimal::ZERO);
        for bad in [json!(true), json!("NaN"), json!("inf"), json!("-1")] {
            assert!(matches!(
                parse_amount("closing", Some(&bad)),
                Err(LifecycleError::InvalidAnswer { .. })
            ));
        }
    }
}
