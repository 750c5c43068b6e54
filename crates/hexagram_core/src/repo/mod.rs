//! Repository layer: entity-oriented access over pluggable adapters.
//!
//! # Responsibility
//! - Translate between entities and adapter records.
//! - Enforce `Entity::validate()` before any write reaches storage.
//!
//! # Invariants
//! - Validation rejection is an outcome (`SaveOutcome::ValidationFailed`),
//!   not a silent no-op and not an error.
//! - Repository APIs return semantic adapter errors (`NotFound`) unchanged.

pub mod mapper;
pub mod repository;

pub use mapper::{AttributeMapper, RecordMapper};
pub use repository::{RepoError, RepoResult, Repository, SaveOutcome};
