// notify.rs — Notification fan-out boundary.
//
// The engine addresses notifications logically (a user, a team, a role, or
// everyone in the tenant). A Notifier turns that into deliveries. The
// reference FanoutNotifier resolves the target to active users through the
// store and hands one Delivery per recipient to a DeliverySink; the real
// transport (push, socket, email) lives behind that sink.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lf_store::{Role, Store, TenantRecords};

use crate::error::EventError;

/// A logical notification audience.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "target", content = "id", rename_all = "snake_case")]
pub enum NotifyTarget {
    User(Uuid),
    Team(Uuid),
    Role(Role),
    All,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Danger,
}

/// The message itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub level: NotificationLevel,
    /// The domain event that produced this notification.
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
}

/// Receives logically addressed notifications.
pub trait Notifier: Send + Sync {
    /// Deliver `notification` to everyone `target` resolves to.
    fn notify(
        &self,
        tenant_id: Uuid,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), EventError>;
}

/// Resolve a logical target to the active users it covers.
pub fn resolve_recipients(records: &TenantRecords, target: &NotifyTarget) -> Vec<Uuid> {
    match target {
        NotifyTarget::User(user_id) => records
            .users
            .get(user_id)
            .filter(|u| u.is_active())
            .map(|u| vec![u.user_id])
            .unwrap_or_default(),
        NotifyTarget::Team(team_id) => records.active_members(*team_id),
        NotifyTarget::Role(role) => records.active_users_with_role(*role),
        NotifyTarget::All => records.active_users(),
    }
}

/// One notification for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub tenant_id: Uuid,
    pub recipient_id: Uuid,
    pub notification: Notification,
    pub delivered_at: DateTime<Utc>,
}

/// A concrete delivery transport.
pub trait DeliverySink: Send + Sync {
    fn deliver(&self, delivery: &Delivery) -> Result<(), EventError>;
}

/// Resolves targets through the store and delivers per recipient.
pub struct FanoutNotifier<D> {
    store: Arc<Store>,
    sink: D,
}

impl<D: DeliverySink> FanoutNotifier<D> {
    pub fn new(store: Arc<Store>, sink: D) -> Self {
        Self { store, sink }
    }
}

impl<D: DeliverySink> Notifier for FanoutNotifier<D> {
    fn notify(
        &self,
        tenant_id: Uuid,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), EventError> {
        let recipients = self
            .store
            .read(tenant_id, |records| resolve_recipients(records, target));
        if recipients.is_empty() {
            tracing::debug!(%tenant_id, ?target, "notification has no active recipients");
            return Ok(());
        }

        // Deliver to everyone even if one recipient fails; report the last error.
        let mut last_error = None;
        for recipient_id in recipients {
            let delivery = Delivery {
                tenant_id,
                recipient_id,
                notification: notification.clone(),
                delivered_at: Utc::now(),
            };
            if let Err(e) = self.sink.deliver(&delivery) {
                tracing::warn!(%tenant_id, %recipient_id, "delivery failed: {}", e);
                last_error = Some(e);
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Appends deliveries as JSONL to a file.
pub struct JsonlDelivery {
    path: PathBuf,
}

impl JsonlDelivery {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DeliverySink for JsonlDelivery {
    fn deliver(&self, delivery: &Delivery) -> Result<(), EventError> {
        append_jsonl(&self.path, delivery)
    }
}

/// Append one JSON line to `path`, creating parent directories as needed.
pub(crate) fn append_jsonl<T: Serialize>(path: &Path, value: &T) -> Result<(), EventError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| EventError::IoError {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| EventError::IoError {
            path: path.display().to_string(),
            source,
        })?;

    let json = serde_json::to_string(value)?;
    writeln!(file, "{}", json).map_err(|source| EventError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}

/// A notify call captured by [`MemoryNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub tenant_id: Uuid,
    pub target: NotifyTarget,
    pub notification: Notification,
}

/// Records every notify call in memory without resolving recipients.
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notifications addressed to exactly `target`.
    pub fn sent_to(&self, target: &NotifyTarget) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|s| s.target == *target)
            .map(|s| s.notification)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(
        &self,
        tenant_id: Uuid,
        target: &NotifyTarget,
        notification: &Notification,
    ) -> Result<(), EventError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentNotification {
                tenant_id,
                target: *target,
                notification: notification.clone(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_store::{Team, User, UserStatus};
    use tempfile::tempdir;

    struct FailingSink;

    impl DeliverySink for FailingSink {
        fn deliver(&self, delivery: &Delivery) -> Result<(), EventError> {
            Err(EventError::DeliveryFailed(format!(
                "transport down for {}",
                delivery.recipient_id
            )))
        }
    }

    fn notification() -> Notification {
        Notification {
            title: "Hello".to_string(),
            body: "World".to_string(),
            level: NotificationLevel::Info,
            event_type: "stage_completed".to_string(),
            lead_id: None,
        }
    }

    fn seeded_store() -> (Arc<Store>, Uuid, Uuid, Uuid, Uuid) {
        let store = Arc::new(Store::in_memory());
        let tenant = Uuid::new_v4();
        let (team, seller, owner) = store
            .transact(tenant, |r| {
                let team = r.add_team(Team::new("North", None));
                let seller = r.add_user(User::new("Sam", vec![Role::Sales]).with_team(team));
                let owner = r.add_user(User::new("Olga", vec![Role::Owner]));
                let mut left = User::new("Lee", vec![Role::Sales]).with_team(team);
                left.status = UserStatus::Inactive;
                r.add_user(left);
                Ok::<_, lf_store::StoreError>((team, seller, owner))
            })
            .unwrap();
        (store, tenant, team, seller, owner)
    }

    #[test]
    fn targets_resolve_to_active_users() {
        let (store, tenant, team, seller, owner) = seeded_store();
        store.read(tenant, |r| {
            assert_eq!(resolve_recipients(r, &NotifyTarget::User(seller)), vec![seller]);
            assert_eq!(resolve_recipients(r, &NotifyTarget::Team(team)), vec![seller]);
            assert_eq!(resolve_recipients(r, &NotifyTarget::Role(Role::Owner)), vec![owner]);
            assert_eq!(resolve_recipients(r, &NotifyTarget::All).len(), 2);
            assert!(resolve_recipients(r, &NotifyTarget::User(Uuid::new_v4())).is_empty());
        });
    }

    #[test]
    fn fanout_writes_one_delivery_per_recipient() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/notifications.jsonl");
        let (store, tenant, _, _, _) = seeded_store();
        let notifier = FanoutNotifier::new(store, JsonlDelivery::new(&path));

        notifier
            .notify(tenant, &NotifyTarget::All, &notification())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        let first: Delivery = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(first.tenant_id, tenant);
        assert_eq!(first.notification.title, "Hello");
    }

    #[test]
    fn fanout_reports_sink_failures() {
        let (store, tenant, _, seller, _) = seeded_store();
        let notifier = FanoutNotifier::new(store, FailingSink);
        let result = notifier.notify(tenant, &NotifyTarget::User(seller), &notification());
        assert!(matches!(result, Err(EventError::DeliveryFailed(_))));
    }

    #[test]
    fn fanout_with_no_recipients_is_ok() {
        let (store, tenant, _, _, _) = seeded_store();
        let notifier = FanoutNotifier::new(store, FailingSink);
        let result = notifier.notify(tenant, &NotifyTarget::Team(Uuid::new_v4()), &notification());
        assert!(result.is_ok());
    }

    #[test]
    fn memory_notifier_filters_by_target() {
        let notifier = MemoryNotifier::new();
        let tenant = Uuid::new_v4();
        notifier
            .notify(tenant, &NotifyTarget::Role(Role::Owner), &notification())
            .unwrap();
        notifier.notify(tenant, &NotifyTarget::All, &notification()).unwrap();
        assert_eq!(notifier.sent().len(), 2);
        assert_eq!(notifier.sent_to(&NotifyTarget::Role(Role::Owner)).len(), 1);
    }

    #[test]
    fn target_serializes_with_tag_and_id() {
        let json = serde_json::to_value(NotifyTarget::Role(Role::Owner)).unwrap();
        assert_eq!(json["target"], "role");
        assert_eq!(json["id"], "owner");
    }
}
