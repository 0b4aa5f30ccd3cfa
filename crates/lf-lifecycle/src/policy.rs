// policy.rs — SLA business constants.

use chrono::{DateTime, Duration, Utc};

/// Deadline window and extension budget.
///
/// The window is a single rolling budget per unresolved deadline, not a
/// fresh allowance per stage: the deadline opens once and survives later
/// transitions until the lead closes, fails, or an undo resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaPolicy {
    pub deadline_window: Duration,
    /// Cumulative pending + approved extension hours per lead and stage.
    pub extension_cap_hours: u32,
}

impl SlaPolicy {
    pub fn due_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.deadline_window
    }
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            deadline_window: Duration::days(7),
            extension_cap_hours: 72,
        }
    }
}
