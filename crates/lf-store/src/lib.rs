//! # lf-store
//!
//! Records and persistence for the leadflow engine.
//!
//! Every tenant's data lives in one [`TenantRecords`] document. The
//! [`Store`] hands out read access and all-or-nothing transactions over that
//! document; the conditional row helpers on [`TenantRecords`]
//! (`open_deadline_if_none`, `mark_overdue_if_active`, `try_mark_achieved`,
//! ...) are the guards that keep concurrent callers from double-creating
//! deadlines, failures, or bonus payouts.
//!
//! ## Modules
//!
//! - [`people`] — users, roles, teams
//! - [`lead`] — leads and their history, deadlines, extensions, failures
//! - [`activity`] — call logs, meetings, deals, closures (metric inputs)
//! - [`goal`] — goal plans and targets
//! - [`records`] — the per-tenant document and its conditional updates
//! - [`store`] — mutex-guarded, optionally file-backed tenant map

pub mod activity;
pub mod error;
pub mod goal;
pub mod lead;
pub mod people;
pub mod records;
pub mod store;

pub use activity::{ApprovalStatus, CallLog, Closure, Deal, Meeting};
pub use error::StoreError;
pub use goal::{GoalPeriod, GoalPlan, GoalSubject, GoalTarget, MetricKey};
pub use lead::{
    Deadline, DeadlineStatus, Extension, ExtensionStatus, Failure, FailureStatus, FailureType,
    HistoryEntry, HistoryMetadata, Lead, LeadStatus,
};
pub use people::{Role, Team, User, UserStatus};
pub use records::{DeadlineSlot, TenantRecords};
pub use store::Store;
