//! # lf-events
//!
//! Domain events and the side-effect boundary of the leadflow engine.
//!
//! Lifecycle and goal operations never notify anyone or write ledger
//! entries themselves. They push typed [`DomainEvent`]s into an [`Outbox`];
//! once the primary operation has committed, the [`EventDispatcher`] maps
//! each event onto [`Notifier`] and [`CommissionLedger`] calls. Failures on
//! that side are logged and counted, never propagated.
//!
//! ## Key components
//!
//! - [`DomainEvent`] — stage completed, undo, overdue, extension, achievement
//! - [`Outbox`] — events collected during one operation
//! - [`EventDispatcher`] — event → notification / ledger mapping
//! - [`Notifier`] — `notify(target, message)` where the target is a user,
//!   team, role, or everyone; [`FanoutNotifier`] resolves and delivers
//! - [`CommissionLedger`] — `create_entry(tenant, user, amount, type)`

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod ledger;
pub mod notify;
pub mod outbox;

pub use dispatcher::{DispatchSummary, EventDispatcher};
pub use error::EventError;
pub use event::DomainEvent;
pub use ledger::{CommissionLedger, JsonlLedger, LedgerEntry, LedgerEntryType, LedgerStatus, MemoryLedger};
pub use notify::{
    resolve_recipients, Delivery, DeliverySink, FanoutNotifier, JsonlDelivery, MemoryNotifier,
    Notification, NotificationLevel, Notifier, NotifyTarget, SentNotification,
};
pub use outbox::Outbox;
