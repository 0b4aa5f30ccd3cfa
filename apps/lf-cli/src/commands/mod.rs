// mod.rs — Shared helpers for the subcommands.

pub mod activity;
pub mod directory;
pub mod extension;
pub mod goal;
pub mod lead;
pub mod sweep;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use lf_engine::Answers;

/// Tenant and acting user from the global flags.
pub struct Scope {
    pub tenant: Option<Uuid>,
    pub actor: Option<Uuid>,
}

impl Scope {
    pub fn tenant(&self) -> anyhow::Result<Uuid> {
        self.tenant
            .ok_or_else(|| anyhow::anyhow!("--tenant <uuid> is required for this command"))
    }

    pub fn actor(&self) -> anyhow::Result<Uuid> {
        self.actor
            .ok_or_else(|| anyhow::anyhow!("--actor <uuid> is required for this command"))
    }
}

/// Parse `key=value` answer flags. Values that parse as JSON keep their
/// type (`amount=12000` is a number); anything else is a string.
pub fn parse_answers(pairs: &[String]) -> anyhow::Result<Answers> {
    let mut answers = Answers::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("answer '{}' is not in key=value form", pair))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("answer '{}' has an empty key", pair);
        }
        let value = serde_json::from_str(raw.trim())
            .unwrap_or_else(|_| serde_json::Value::String(raw.trim().to_string()));
        answers.insert(key.to_string(), value);
    }
    Ok(answers)
}

/// Accept `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_time(s: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid date '{}': {}", s, e))?;
    date.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| anyhow::anyhow!("invalid date '{}'", s))
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
