// dispatcher.rs — Maps domain events onto notifications and ledger writes.
//
// Dispatch runs after the operation that produced the events has committed.
// Every notifier receives every notification; errors from a notifier or the
// ledger are logged and counted, and never stop the rest of the dispatch.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use lf_store::Role;

use crate::event::DomainEvent;
use crate::ledger::{CommissionLedger, LedgerEntryType};
use crate::notify::{Notification, NotificationLevel, Notifier, NotifyTarget};

/// Counts of side effects attempted for a batch of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub notifications_sent: usize,
    pub notification_failures: usize,
    pub ledger_entries: usize,
    pub ledger_failures: usize,
}

impl DispatchSummary {
    fn merge(&mut self, other: DispatchSummary) {
        self.notifications_sent += other.notifications_sent;
        self.notification_failures += other.notification_failures;
        self.ledger_entries += other.ledger_entries;
        self.ledger_failures += other.ledger_failures;
    }
}

/// Fans events out to the registered notifiers and the commission ledger.
pub struct EventDispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
    ledger: Arc<dyn CommissionLedger>,
}

impl EventDispatcher {
    /// Create a dispatcher with no notifiers.
    pub fn new(ledger: Arc<dyn CommissionLedger>) -> Self {
        Self {
            notifiers: Vec::new(),
            ledger,
        }
    }

    pub fn add_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Dispatch a batch of events in order.
    pub fn dispatch_all(&self, events: &[DomainEvent]) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for event in events {
            summary.merge(self.dispatch(event));
        }
        summary
    }

    /// Dispatch one event.
    pub fn dispatch(&self, event: &DomainEvent) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let tenant_id = event.tenant_id();

        if let DomainEvent::TargetAchieved {
            recipients,
            bonus_amount: Some(bonus),
            ..
        } = event
        {
            if *bonus > Decimal::ZERO {
                for user_id in recipients {
                    match self
                        .ledger
                        .create_entry(tenant_id, *user_id, *bonus, LedgerEntryType::GoalBonus)
                    {
                        Ok(entry) => {
                            tracing::info!(
                                %tenant_id,
                                user_id = %user_id,
                                entry_id = %entry.entry_id,
                                amount = %bonus,
                                "goal bonus recorded"
                            );
                            summary.ledger_entries += 1;
                        }
                        Err(e) => {
                            tracing::warn!(%tenant_id, user_id = %user_id, "ledger write failed: {}", e);
                            summary.ledger_failures += 1;
                        }
                    }
                }
            }
        }

        for (target, notification) in notifications_for(event) {
            for notifier in &self.notifiers {
                match notifier.notify(tenant_id, &target, &notification) {
                    Ok(()) => summary.notifications_sent += 1,
                    Err(e) => {
                        tracing::warn!(
                            %tenant_id,
                            event_type = event.event_type(),
                            "notifier error: {}",
                            e
                        );
                        summary.notification_failures += 1;
                    }
                }
            }
        }

        summary
    }
}

fn message(
    event: &DomainEvent,
    level: NotificationLevel,
    title: impl Into<String>,
    body: impl Into<String>,
) -> Notification {
    Notification {
        title: title.into(),
        body: body.into(),
        level,
        event_type: event.event_type().to_string(),
        lead_id: event.lead_id(),
    }
}

/// The (target, notification) pairs an event produces.
pub(crate) fn notifications_for(event: &DomainEvent) -> Vec<(NotifyTarget, Notification)> {
    let mut out = Vec::new();
    match event {
        DomainEvent::StageCompleted {
            lead_name,
            to_state,
            actor_id,
            owner_id,
            team_id,
            terminal: true,
            closed_amount,
            ..
        } => {
            let amount = closed_amount
                .map(|a| format!(" for {}", a))
                .unwrap_or_default();
            let n = message(
                event,
                NotificationLevel::Success,
                format!("Deal closed: {}", lead_name),
                format!("{} reached {}{}", lead_name, to_state, amount),
            );
            let credited = owner_id.unwrap_or(*actor_id);
            out.push((NotifyTarget::User(credited), n.clone()));
            if let Some(team) = team_id {
                out.push((NotifyTarget::Team(*team), n.clone()));
            }
            out.push((NotifyTarget::Role(Role::Owner), n));
        }
        DomainEvent::StageCompleted {
            lead_name,
            to_state,
            actor_id,
            owner_id: Some(owner),
            ..
        } if owner != actor_id => {
            out.push((
                NotifyTarget::User(*owner),
                message(
                    event,
                    NotificationLevel::Info,
                    format!("{} moved to {}", lead_name, to_state),
                    format!("Your lead {} entered stage {}", lead_name, to_state),
                ),
            ));
        }
        DomainEvent::StageCompleted { .. } => {}
        DomainEvent::TransitionUndone {
            lead_name,
            undone_state,
            restored_state,
            actor_id,
            owner_id: Some(owner),
            ..
        } if owner != actor_id => {
            out.push((
                NotifyTarget::User(*owner),
                message(
                    event,
                    NotificationLevel::Warning,
                    format!("{} returned to {}", lead_name, restored_state),
                    format!(
                        "The move of {} into {} was undone",
                        lead_name, undone_state
                    ),
                ),
            ));
        }
        DomainEvent::TransitionUndone { .. } => {}
        DomainEvent::LeadOverdue {
            lead_name,
            owner_deactivated,
            ..
        } => {
            let suffix = if *owner_deactivated {
                "; the assigned seller was deactivated"
            } else {
                ""
            };
            out.push((
                NotifyTarget::Role(Role::Owner),
                message(
                    event,
                    NotificationLevel::Danger,
                    format!("Lead overdue: {}", lead_name),
                    format!("{} missed its stage deadline{}", lead_name, suffix),
                ),
            ));
        }
        DomainEvent::LeadSurrendered {
            lead_name,
            team_id,
            reason,
            ..
        } => {
            let n = message(
                event,
                NotificationLevel::Warning,
                format!("Lead surrendered: {}", lead_name),
                format!("{} was given up: {}", lead_name, reason),
            );
            if let Some(team) = team_id {
                out.push((NotifyTarget::Team(*team), n.clone()));
            }
            out.push((NotifyTarget::Role(Role::Owner), n));
        }
        DomainEvent::ExtensionRequested {
            lead_name,
            hours,
            reason,
            resolver,
            ..
        } => {
            out.push((
                *resolver,
                message(
                    event,
                    NotificationLevel::Info,
                    format!("Extension requested: {}", lead_name),
                    format!("{} more hours requested for {}: {}", hours, lead_name, reason),
                ),
            ));
        }
        DomainEvent::ExtensionDecided {
            requested_by,
            approved,
            hours,
            reason,
            ..
        } => {
            let (level, title) = if *approved {
                (NotificationLevel::Success, "Extension approved")
            } else {
                (NotificationLevel::Warning, "Extension rejected")
            };
            let body = match reason {
                Some(r) => format!("Your request for {} hours: {}", hours, r),
                None => format!("Your request for {} hours", hours),
            };
            out.push((
                NotifyTarget::User(*requested_by),
                message(event, level, title, body),
            ));
        }
        DomainEvent::TargetAchieved {
            metric,
            recipients,
            bonus_amount,
            ..
        } => {
            let body = match bonus_amount {
                Some(b) if *b > Decimal::ZERO => {
                    format!("The {} target was reached; bonus {}", metric, b)
                }
                _ => format!("The {} target was reached", metric),
            };
            let n = message(event, NotificationLevel::Success, "Goal achieved", body);
            out.extend(
                recipients
                    .iter()
                    .map(|user_id: &Uuid| (NotifyTarget::User(*user_id), n.clone())),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EventError;
    use crate::ledger::MemoryLedger;
    use crate::notify::MemoryNotifier;
    use chrono::Utc;
    use lf_store::MetricKey;

    struct BrokenNotifier;

    impl Notifier for BrokenNotifier {
        fn notify(&self, _: Uuid, _: &NotifyTarget, _: &Notification) -> Result<(), EventError> {
            Err(EventError::DeliveryFailed("offline".to_string()))
        }
    }

    fn stage_completed(actor: Uuid, owner: Option<Uuid>, terminal: bool) -> DomainEvent {
        DomainEvent::StageCompleted {
            tenant_id: Uuid::new_v4(),
            lead_id: Uuid::new_v4(),
            lead_name: "Acme".to_string(),
            from_state: Some("site_visit".to_string()),
            to_state: if terminal { "closing" } else { "site_visit" }.to_string(),
            actor_id: actor,
            owner_id: owner,
            team_id: Some(Uuid::new_v4()),
            terminal,
            closed_amount: terminal.then(|| Decimal::from(12_000)),
            timestamp: Utc::now(),
        }
    }

    fn achieved(recipients: Vec<Uuid>, bonus: Option<Decimal>) -> DomainEvent {
        DomainEvent::TargetAchieved {
            tenant_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            target_id: Uuid::new_v4(),
            metric: MetricKey::Revenue,
            recipients,
            bonus_amount: bonus,
            timestamp: Utc::now(),
        }
    }

    fn dispatcher() -> (EventDispatcher, Arc<MemoryNotifier>, Arc<MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new());
        let notifier = Arc::new(MemoryNotifier::new());
        let mut dispatcher = EventDispatcher::new(ledger.clone());
        dispatcher.add_notifier(notifier.clone());
        (dispatcher, notifier, ledger)
    }

    #[test]
    fn owner_hears_about_moves_by_someone_else() {
        let (dispatcher, notifier, _) = dispatcher();
        let owner = Uuid::new_v4();
        dispatcher.dispatch(&stage_completed(Uuid::new_v4(), Some(owner), false));
        assert_eq!(notifier.sent_to(&NotifyTarget::User(owner)).len(), 1);
    }

    #[test]
    fn self_moves_are_silent() {
        let (dispatcher, notifier, _) = dispatcher();
        let owner = Uuid::new_v4();
        let summary = dispatcher.dispatch(&stage_completed(owner, Some(owner), false));
        assert_eq!(summary, DispatchSummary::default());
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn closing_is_broadcast_with_amount() {
        let (dispatcher, notifier, _) = dispatcher();
        let owner = Uuid::new_v4();
        dispatcher.dispatch(&stage_completed(owner, Some(owner), true));

        let to_owners = notifier.sent_to(&NotifyTarget::Role(Role::Owner));
        assert_eq!(to_owners.len(), 1);
        assert!(to_owners[0].body.contains("12000"));
        assert_eq!(to_owners[0].level, NotificationLevel::Success);
        assert_eq!(notifier.sent_to(&NotifyTarget::User(owner)).len(), 1);
        assert_eq!(notifier.sent().len(), 3);
    }

    #[test]
    fn achievement_writes_one_bonus_per_recipient() {
        let (dispatcher, notifier, ledger) = dispatcher();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let summary = dispatcher.dispatch(&achieved(vec![a, b], Some(Decimal::from(250))));

        assert_eq!(summary.ledger_entries, 2);
        assert_eq!(ledger.entries_for(a).len(), 1);
        assert_eq!(ledger.entries_for(b)[0].entry_type, LedgerEntryType::GoalBonus);
        assert_eq!(notifier.sent_to(&NotifyTarget::User(a)).len(), 1);
    }

    #[test]
    fn achievement_without_bonus_only_notifies() {
        let (dispatcher, notifier, ledger) = dispatcher();
        let a = Uuid::new_v4();
        dispatcher.dispatch(&achieved(vec![a], None));
        dispatcher.dispatch(&achieved(vec![a], Some(Decimal::ZERO)));
        assert!(ledger.entries().is_empty());
        assert_eq!(notifier.sent_to(&NotifyTarget::User(a)).len(), 2);
    }

    #[test]
    fn failing_notifier_does_not_block_others() {
        let ledger = Arc::new(MemoryLedger::new());
        let working = Arc::new(MemoryNotifier::new());
        let mut dispatcher = EventDispatcher::new(ledger);
        dispatcher.add_notifier(Arc::new(BrokenNotifier));
        dispatcher.add_notifier(working.clone());

        let owner = Uuid::new_v4();
        let summary = dispatcher.dispatch(&stage_completed(Uuid::new_v4(), Some(owner), false));
        assert_eq!(summary.notification_failures, 1);
        assert_eq!(summary.notifications_sent, 1);
        assert_eq!(working.sent().len(), 1);
    }

    #[test]
    fn extension_decision_goes_to_requester() {
        let (dispatcher, notifier, _) = dispatcher();
        let requester = Uuid::new_v4();
        let event = DomainEvent::ExtensionDecided {
            tenant_id: Uuid::new_v4(),
            extension_id: Uuid::new_v4(),
            lead_id: Uuid::new_v4(),
            requested_by: requester,
            decided_by: Uuid::new_v4(),
            approved: false,
            hours: 24,
            new_due_at: None,
            reason: Some("not this week".to_string()),
            timestamp: Utc::now(),
        };
        dispatcher.dispatch_all(&[event]);
        let sent = notifier.sent_to(&NotifyTarget::User(requester));
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Extension rejected");
    }
}
