//! Entity contract and validation context.
//!
//! # Responsibility
//! - Define what a domain entity exposes to repositories: identity,
//!   attribute map, attribute assignment and self-validation.
//! - Define the narrow query surface entities may use while validating.
//!
//! # Invariants
//! - `attributes()` includes the `id` key.
//! - `validate()` owns the rules; repositories only act on its verdict.
//! - An empty violation list means the entity is valid.

use crate::adapter::AdapterResult;
use crate::model::filter::Filter;
use crate::model::record::{PersistenceRecord, RecordId};
use crate::model::value::{Attributes, FieldValue};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Domain-facing value holder managed by a repository.
pub trait Entity {
    /// Storage identity, `None` before the first save.
    fn id(&self) -> Option<RecordId>;

    /// Current attribute values keyed by attribute name, including `id`.
    fn attributes(&self) -> Attributes;

    /// Assigns one attribute by name.
    ///
    /// # Errors
    /// - `MappingError::UnknownAttribute` when the entity has no such attribute.
    /// - `MappingError::TypeMismatch` when `value` cannot be stored in it.
    fn assign(&mut self, name: &str, value: FieldValue) -> Result<(), MappingError>;

    /// Returns every rule this entity currently violates.
    ///
    /// `ctx` is the owning repository seen through its query-only surface,
    /// so rules such as uniqueness can consult persisted state.
    fn validate(&self, ctx: &dyn ValidationContext) -> AdapterResult<Vec<Violation>>;
}

/// Query capabilities available to entities during validation.
pub trait ValidationContext {
    /// Raw records matching every pair in `filter`.
    fn find_where_records(&self, filter: &Filter) -> AdapterResult<Vec<PersistenceRecord>>;

    /// True when no persisted record matches any single pair of `attributes`.
    fn unique(&self, attributes: &Filter) -> AdapterResult<bool>;

    /// Same as [`ValidationContext::unique`], ignoring the record `except`.
    fn unique_except(&self, attributes: &Filter, except: Option<RecordId>)
        -> AdapterResult<bool>;
}

/// One failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Record -> entity mapping errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingError {
    /// Entity declares an attribute the source record does not carry.
    MissingField { entity: String, field: String },
    /// Attribute name is not declared by the entity.
    UnknownAttribute { entity: String, field: String },
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl MappingError {
    /// Convenience constructor for `Entity::assign` implementations.
    pub fn type_mismatch(field: &str, expected: &'static str, value: &FieldValue) -> Self {
        Self::TypeMismatch {
            field: field.to_string(),
            expected,
            actual: value.type_name(),
        }
    }
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { entity, field } => {
                write!(f, "record for {entity} has no attribute `{field}`")
            }
            Self::UnknownAttribute { entity, field } => {
                write!(f, "{entity} has no attribute `{field}`")
            }
            Self::TypeMismatch {
                field,
                expected,
                actual,
            } => write!(f, "attribute `{field}` expects {expected}, got {actual}"),
        }
    }
}

impl Error for MappingError {}
