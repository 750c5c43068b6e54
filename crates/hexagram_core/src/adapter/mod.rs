//! Adapter contract between repositories and storage backends.
//!
//! # Responsibility
//! - Define the six storage operations every backend must provide.
//! - Define the error vocabulary adapters report to repositories.
//!
//! # Invariants
//! - `save` is the only mutating operation.
//! - `find` of an unknown id fails with `AdapterError::NotFound`.
//! - `each` and `find_where` return records in ascending id order.
//! - Filter and attribute keys must be `id` or a declared descriptor field.

use crate::db::DbError;
use crate::model::descriptor::{Descriptor, FieldKind, ID_FIELD};
use crate::model::entity::Entity;
use crate::model::filter::Filter;
use crate::model::record::{PersistenceRecord, RecordId};
use crate::model::value::{Attributes, FieldValue};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryAdapter;
pub use sqlite::SqliteAdapter;

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Storage-level error reported by adapters.
#[derive(Debug)]
pub enum AdapterError {
    NotFound {
        descriptor: String,
        id: RecordId,
    },
    /// Filter or attribute key not declared by the descriptor.
    UnknownField {
        descriptor: String,
        field: String,
    },
    MissingRequiredTable(String),
    MissingRequiredColumn {
        table: String,
        column: String,
    },
    InvalidData(String),
    Db(DbError),
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { descriptor, id } => write!(f, "{descriptor} not found: {id}"),
            Self::UnknownField { descriptor, field } => {
                write!(f, "{descriptor} has no field `{field}`")
            }
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AdapterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for AdapterError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for AdapterError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage capability set required by [`crate::repo::Repository`].
pub trait Adapter {
    /// Loads one record by id.
    fn find(&self, id: RecordId, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord>;

    /// Lists every persisted record.
    fn each(&self, descriptor: &Descriptor) -> AdapterResult<Vec<PersistenceRecord>>;

    /// Returns a new, unsaved record with all fields empty.
    fn build(&self, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord>;

    /// Returns whether a record with the entity's id is persisted.
    fn exists(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<bool>;

    /// Lists records matching every pair of `filter`.
    fn find_where(
        &self,
        filter: &Filter,
        descriptor: &Descriptor,
    ) -> AdapterResult<Vec<PersistenceRecord>>;

    /// Upserts the entity's attributes and returns the record id.
    fn save(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<RecordId>;
}

impl<A: Adapter + ?Sized> Adapter for &A {
    fn find(&self, id: RecordId, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
        (**self).find(id, descriptor)
    }

    fn each(&self, descriptor: &Descriptor) -> AdapterResult<Vec<PersistenceRecord>> {
        (**self).each(descriptor)
    }

    fn build(&self, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
        (**self).build(descriptor)
    }

    fn exists(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<bool> {
        (**self).exists(entity, descriptor)
    }

    fn find_where(
        &self,
        filter: &Filter,
        descriptor: &Descriptor,
    ) -> AdapterResult<Vec<PersistenceRecord>> {
        (**self).find_where(filter, descriptor)
    }

    fn save(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<RecordId> {
        (**self).save(entity, descriptor)
    }
}

/// Rejects keys that are neither `id` nor a declared field.
pub(crate) fn ensure_known_keys<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    descriptor: &Descriptor,
) -> AdapterResult<()> {
    for key in keys {
        if !descriptor.has_attribute(key) {
            return Err(AdapterError::UnknownField {
                descriptor: descriptor.simple_name().to_string(),
                field: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Splits entity attributes into declared field values, dropping `id`.
///
/// Values are normalized to the declared field kind.
pub(crate) fn writable_fields(
    attributes: Attributes,
    descriptor: &Descriptor,
) -> AdapterResult<Attributes> {
    ensure_known_keys(attributes.keys().map(String::as_str), descriptor)?;
    attributes
        .into_iter()
        .filter(|(name, _)| name != ID_FIELD)
        .map(|(name, value)| {
            let value = normalize_value(&name, value, descriptor)?;
            Ok((name, value))
        })
        .collect()
}

/// Validates filter keys and normalizes filter values to field kinds.
pub(crate) fn normalized_filter(
    filter: &Filter,
    descriptor: &Descriptor,
) -> AdapterResult<Attributes> {
    ensure_known_keys(filter.iter().map(|(name, _)| name), descriptor)?;
    filter
        .iter()
        .map(|(name, value)| {
            let value = normalize_value(name, value.clone(), descriptor)?;
            Ok((name.to_string(), value))
        })
        .collect()
}

/// Coerces `value` into the storage kind declared for `name`.
///
/// `Null` is accepted for every field. Integers widen into `Real` fields and
/// `0`/`1` integers are accepted for `Boolean` fields.
pub(crate) fn normalize_value(
    name: &str,
    value: FieldValue,
    descriptor: &Descriptor,
) -> AdapterResult<FieldValue> {
    let kind = if name == ID_FIELD {
        FieldKind::Integer
    } else {
        match descriptor.field(name) {
            Some(field) => field.kind,
            None => {
                return Err(AdapterError::UnknownField {
                    descriptor: descriptor.simple_name().to_string(),
                    field: name.to_string(),
                })
            }
        }
    };

    let normalized = match (kind, value) {
        (_, FieldValue::Null) => FieldValue::Null,
        (FieldKind::Integer, FieldValue::Integer(value)) => FieldValue::Integer(value),
        (FieldKind::Real, FieldValue::Real(value)) => FieldValue::Real(value),
        (FieldKind::Real, FieldValue::Integer(value)) => FieldValue::Real(value as f64),
        (FieldKind::Text, FieldValue::Text(value)) => FieldValue::Text(value),
        (FieldKind::Boolean, FieldValue::Bool(value)) => FieldValue::Bool(value),
        (FieldKind::Boolean, FieldValue::Integer(0)) => FieldValue::Bool(false),
        (FieldKind::Boolean, FieldValue::Integer(1)) => FieldValue::Bool(true),
        (kind, other) => {
            return Err(AdapterError::InvalidData(format!(
                "{}.{} expects {:?}, got {}",
                descriptor.simple_name(),
                name,
                kind,
                other.type_name()
            )))
        }
    };
    Ok(normalized)
}
