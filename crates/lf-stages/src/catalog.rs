// catalog.rs — StageCatalog: the ordered pipeline and its answer schema.
//
// The pipeline is strictly linear:
//   (entry) → call → meeting → site_visit → closing
// Every non-terminal stage has exactly one successor, the terminal stage is
// last, and the only registered edges are the ones between neighbours.
// Entering the terminal stage is an approval-gated edge: the closure it
// records waits for a manager before counting as revenue.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CatalogError;

/// Answers submitted with a transition, keyed by question id.
pub type Answers = BTreeMap<String, Value>;

/// The expected shape of an answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Text,
    /// A non-negative JSON number or numeric string (e.g. `"125000.50"`,
    /// `"1.2e5"`). NaN and infinities are not numbers here.
    Number,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    Date,
    Boolean,
}

/// One question a user answers when moving a lead into a stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageQuestion {
    pub id: String,
    pub label: String,
    pub required: bool,
    pub kind: QuestionKind,
}

impl StageQuestion {
    pub fn required(id: impl Into<String>, label: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            required: true,
            kind,
        }
    }

    pub fn optional(id: impl Into<String>, label: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            required: false,
            kind,
        }
    }
}

/// A named step in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageDefinition {
    /// Unique code within a tenant (e.g. "site_visit").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Sort key; stages are ordered by ascending position.
    pub position: u32,
    /// Entering a terminal stage ends the lead's SLA clock.
    pub is_terminal: bool,
    /// Ordered answer schema.
    #[serde(default)]
    pub questions: Vec<StageQuestion>,
}

/// A registered `from → to` move. `from: None` is the entry edge for a lead
/// with no history yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageEdge {
    pub from: Option<String>,
    pub to: String,
    #[serde(default)]
    pub requires_approval: bool,
}

/// Result of seeding a single stage into an existing catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// The ordered stage list plus the edge set derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageCatalog {
    stages: Vec<StageDefinition>,
    edges: Vec<StageEdge>,
}

impl StageCatalog {
    /// The standard sales pipeline: call → meeting → site_visit → closing.
    pub fn standard() -> Self {
        Self::linear(vec![
            StageDefinition {
                code: "call".to_string(),
                name: "Call".to_string(),
                position: 1,
                is_terminal: false,
                questions: vec![
                    StageQuestion::required("outcome", "Call outcome", QuestionKind::Text),
                    StageQuestion::optional("notes", "Notes", QuestionKind::Text),
                ],
            },
            StageDefinition {
                code: "meeting".to_string(),
                name: "Meeting".to_string(),
                position: 2,
                is_terminal: false,
                questions: vec![
                    StageQuestion::required("meeting_date", "Meeting date", QuestionKind::Date),
                    StageQuestion::optional("attendees", "Attendees", QuestionKind::Text),
                ],
            },
            StageDefinition {
                code: "site_visit".to_string(),
                name: "Site visit".to_string(),
                position: 3,
                is_terminal: false,
                questions: vec![
                    StageQuestion::required("visit_date", "Visit date", QuestionKind::Date),
                    StageQuestion::optional("feedback", "Client feedback", QuestionKind::Text),
                ],
            },
            StageDefinition {
                code: "closing".to_string(),
                name: "Closing".to_string(),
                position: 4,
                is_terminal: true,
                questions: vec![
                    StageQuestion::required("amount", "Contract amount", QuestionKind::Number),
                    StageQuestion::required("contract_date", "Contract date", QuestionKind::Date),
                ],
            },
        ])
    }

    /// Build a catalog from arbitrary stage definitions, checking that they
    /// form one linear run of non-terminal stages ending in a single
    /// terminal stage.
    pub fn from_stages(mut stages: Vec<StageDefinition>) -> Result<Self, CatalogError> {
        if stages.is_empty() {
            return Err(CatalogError::InvalidOrdering(
                "catalog has no stages".to_string(),
            ));
        }
        stages.sort_by_key(|s| s.position);

        let mut seen = HashSet::new();
        for stage in &stages {
            if !seen.insert(stage.code.as_str()) {
                return Err(CatalogError::DuplicateStage(stage.code.clone()));
            }
        }
        for pair in stages.windows(2) {
            if pair[0].position == pair[1].position {
                return Err(CatalogError::InvalidOrdering(format!(
                    "stages '{}' and '{}' share position {}",
                    pair[0].code, pair[1].code, pair[0].position
                )));
            }
        }

        let terminal_count = stages.iter().filter(|s| s.is_terminal).count();
        if terminal_count != 1 {
            return Err(CatalogError::InvalidOrdering(format!(
                "expected exactly one terminal stage, found {}",
                terminal_count
            )));
        }
        if let Some(last) = stages.last() {
            if !last.is_terminal {
                return Err(CatalogError::InvalidOrdering(format!(
                    "stage '{}' follows the terminal stage",
                    last.code
                )));
            }
        }

        Ok(Self::linear(stages))
    }

    /// Derive the edge set for stages already known to be well ordered.
    fn linear(stages: Vec<StageDefinition>) -> Self {
        let mut edges = Vec::with_capacity(stages.len());
        if let Some(first) = stages.first() {
            edges.push(StageEdge {
                from: None,
                to: first.code.clone(),
                requires_approval: false,
            });
        }
        for pair in stages.windows(2) {
            edges.push(StageEdge {
                from: Some(pair[0].code.clone()),
                to: pair[1].code.clone(),
                requires_approval: pair[1].is_terminal,
            });
        }
        Self { stages, edges }
    }

    /// Stages in pipeline order.
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    pub fn edges(&self) -> &[StageEdge] {
        &self.edges
    }

    /// Look up a stage by code.
    pub fn stage(&self, code: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.code == code)
    }

    /// Look up a stage by code, failing with `UnknownStage`.
    pub fn require_stage(&self, code: &str) -> Result<&StageDefinition, CatalogError> {
        self.stage(code)
            .ok_or_else(|| CatalogError::UnknownStage(code.to_string()))
    }

    /// The stage a brand-new lead enters first.
    pub fn entry_stage(&self) -> Option<&StageDefinition> {
        self.stages.first()
    }

    pub fn terminal_stage(&self) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.is_terminal)
    }

    /// The registered edge for `from → to`, if any.
    pub fn edge(&self, from: Option<&str>, to: &str) -> Option<&StageEdge> {
        self.edges
            .iter()
            .find(|e| e.from.as_deref() == from && e.to == to)
    }

    /// The stage immediately after `code`.
    pub fn successor(&self, code: &str) -> Option<&StageDefinition> {
        let idx = self.stages.iter().position(|s| s.code == code)?;
        self.stages.get(idx + 1)
    }

    /// True when `code` is a known, non-terminal stage (one that runs an SLA clock).
    pub fn is_tracked(&self, code: &str) -> bool {
        self.stage(code).is_some_and(|s| !s.is_terminal)
    }

    /// Check `answers` against the questions defined on stage `code`.
    ///
    /// Every required question must have a non-blank answer; any answer that
    /// is present must match its question's kind.
    pub fn validate_answers(&self, code: &str, answers: &Answers) -> Result<(), CatalogError> {
        let stage = self.require_stage(code)?;

        for question in &stage.questions {
            let value = answers.get(&question.id).filter(|v| !is_blank(v));
            match value {
                None if question.required => {
                    return Err(CatalogError::MissingAnswer {
                        stage: stage.code.clone(),
                        question: question.id.clone(),
                    });
                }
                None => {}
                Some(value) => {
                    if let Err(reason) = check_kind(question.kind, value) {
                        return Err(CatalogError::InvalidAnswer {
                            stage: stage.code.clone(),
                            question: question.id.clone(),
                            reason,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Insert or replace a stage by code, re-validating the ordering.
    ///
    /// Re-seeding an identical definition is a no-op.
    pub fn upsert(&mut self, stage: StageDefinition) -> Result<UpsertOutcome, CatalogError> {
        let mut stages = self.stages.clone();
        let outcome = match stages.iter_mut().find(|s| s.code == stage.code) {
            Some(existing) if *existing == stage => return Ok(UpsertOutcome::Unchanged),
            Some(existing) => {
                *existing = stage;
                UpsertOutcome::Updated
            }
            None => {
                stages.push(stage);
                UpsertOutcome::Inserted
            }
        };
        *self = Self::from_stages(stages)?;
        Ok(outcome)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn check_kind(kind: QuestionKind, value: &Value) -> Result<(), String> {
    match (kind, value) {
        (QuestionKind::Text, Value::String(_) | Value::Number(_) | Value::Bool(_)) => Ok(()),
        (QuestionKind::Text, _) => Err("expected text".to_string()),
        (QuestionKind::Number, _) => match parse_number(value) {
            Some(_) => Ok(()),
            None => Err("expected a non-negative number".to_string()),
        },
        (QuestionKind::Date, Value::String(s)) if parses_as_date(s.trim()) => Ok(()),
        (QuestionKind::Date, _) => Err("expected a date (YYYY-MM-DD)".to_string()),
        (QuestionKind::Boolean, Value::Bool(_)) => Ok(()),
        (QuestionKind::Boolean, _) => Err("expected true or false".to_string()),
    }
}

/// The exact decimal value of a `Number` answer, or `None` if it is not a
/// finite, non-negative number that fits a `Decimal`.
pub fn parse_number(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    let parsed = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;
    (!parsed.is_sign_negative() || parsed.is_zero()).then_some(parsed)
}

fn parses_as_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || DateTime::parse_from_rfc3339(s).is_ok()
}
