// people.rs — Users, roles, and teams.
//
// Only the fields the lifecycle engine touches are modelled here: who is
// active, which roles they hold, and which team they belong to. Credentials
// and profile data belong to other subsystems.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant-level role. A user may hold several.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Tenant owner; receives broadcasts and resolves extensions for teamless leads.
    Owner,
    /// Leads a team; resolves extension requests for the team's leads.
    TeamLeader,
    /// Front-line seller; subject to account deactivation on an overdue lead.
    Sales,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::TeamLeader => write!(f, "team_leader"),
            Role::Sales => write!(f, "sales"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "team_leader" => Ok(Role::TeamLeader),
            "sales" => Ok(Role::Sales),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
}

/// A user account within a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub roles: Vec<Role>,
    pub status: UserStatus,
    /// The team the user currently belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create an active user with the given roles.
    pub fn new(name: impl Into<String>, roles: Vec<Role>) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4(),
            name: name.into(),
            roles,
            status: UserStatus::Active,
            team_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Place the user on a team (builder style).
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// True when `sales` is the user's only role. Team leaders and owners
    /// who also sell are not covered.
    pub fn is_sales_only(&self) -> bool {
        !self.roles.is_empty() && self.roles.iter().all(|r| *r == Role::Sales)
    }
}

/// A sales team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub team_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Team {
    pub fn new(name: impl Into<String>, leader_id: Option<Uuid>) -> Self {
        Self {
            team_id: Uuid::new_v4(),
            name: name.into(),
            leader_id,
            created_at: Utc::now(),
        }
    }
}
