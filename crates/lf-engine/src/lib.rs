//! # lf-engine
//!
//! The lead lifecycle and achievement engine as one facade.
//!
//! [`Engine`] wires the stage catalog, store, lifecycle state machine,
//! deadline sweeper, extension negotiator, goal evaluator and achievement
//! trigger together, and dispatches the events each operation produces to
//! notifiers and the commission ledger once the operation has committed.
//!
//! Request handlers call `transition_lead`, `undo_last_transition`, the
//! extension operations, `build_goal_report` and `check_achievement`; a
//! scheduler calls `run_deadline_sweep` (or `sweep_all`) every few minutes.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{Engine, LeadSnapshot};
pub use error::EngineError;

pub use lf_events::{DispatchSummary, EventDispatcher, MemoryLedger, MemoryNotifier};
pub use lf_goals::{AchievementOutcome, GoalReport, TargetEvaluation, TargetStatus};
pub use lf_lifecycle::{ErrorKind, SlaPolicy, StageResult, SweepReport};
pub use lf_stages::{Answers, CatalogRegistry, StageCatalog};
