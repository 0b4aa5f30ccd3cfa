//! # lf-stages
//!
//! The ordered sales pipeline a lead moves through.
//!
//! A [`StageCatalog`] is the fixed business definition of the pipeline:
//! a linear run of non-terminal stages followed by exactly one terminal
//! stage, the edges between them, and the questions each stage requires
//! answered before a lead may enter it.
//!
//! ## Key components
//!
//! - [`StageCatalog`] — ordered stages plus the derived edge set
//!   (call → meeting → site_visit → closing in the standard catalog)
//! - [`StageDefinition`] / [`StageQuestion`] — one stage and its answer schema
//! - [`CatalogRegistry`] — per-tenant catalogs, lazily seeded and upserted by code

pub mod catalog;
pub mod error;
pub mod registry;

pub use catalog::{
    parse_number, Answers, QuestionKind, StageCatalog, StageDefinition, StageEdge, StageQuestion, UpsertOutcome,
};
pub use error::CatalogError;
pub use registry::CatalogRegistry;
