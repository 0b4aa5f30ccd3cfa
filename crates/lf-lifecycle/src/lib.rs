//! # lf-lifecycle
//!
//! The lead lifecycle: guarded stage transitions with single-level undo, the
//! per-lead SLA deadline, the periodic overdue sweep with its compensating
//! account action, deadline extensions under a cumulative cap, and failure
//! records (overdue or surrendered).
//!
//! Every operation runs in one [`lf_store::Store`] transaction and pushes
//! its [`lf_events::DomainEvent`]s into the caller's
//! [`lf_events::Outbox`] only after that transaction commits.
//!
//! ## Key types
//!
//! - [`LeadLifecycle`] — `transition`, `undo`, `surrender`, `resolve_failure`
//! - [`DeadlineSweeper`] — one SLA pass per tenant, returns a [`SweepReport`]
//! - [`ExtensionNegotiator`] — `request`, `approve`, `reject`
//! - [`SlaPolicy`] — 7-day window, 72-hour extension cap
//! - [`LifecycleError`] / [`ErrorKind`] — caller-facing error taxonomy

pub mod error;
pub mod extension;
pub mod failure;
pub mod machine;
pub mod policy;
pub mod sweeper;

pub use error::{ErrorKind, LifecycleError};
pub use extension::ExtensionNegotiator;
pub use machine::{LeadLifecycle, StageResult};
pub use policy::SlaPolicy;
pub use sweeper::{DeadlineSweeper, SweepReport};
