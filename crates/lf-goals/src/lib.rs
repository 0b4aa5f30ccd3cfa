//! # lf-goals
//!
//! Goal plans, target evaluation, and the achievement trigger.
//!
//! The evaluator turns raw activity rows into an actual value per target
//! over the plan window, then a ratio, score, and traffic-light status. The
//! trigger applies the one-time crossing rule: the first evaluation at or
//! above 100% marks the target achieved and queues a
//! [`lf_events::DomainEvent::TargetAchieved`]; dropping back below 100%
//! clears the mark so a later crossing fires again.

pub mod achievement;
pub mod error;
pub mod evaluator;
pub mod metric;
pub mod planner;

pub use achievement::{AchievementOutcome, AchievementTrigger};
pub use error::GoalError;
pub use evaluator::{
    build_report, evaluate_target, period_progress, GoalReport, TargetEvaluation, TargetStatus,
};
pub use metric::{actual_value, aggregator, Aggregator, TimeWindow};
pub use planner::GoalPlanner;
