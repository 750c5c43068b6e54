//! Record -> entity mapping strategies.
//!
//! # Responsibility
//! - Define the mapping function a repository is constructed with.
//! - Provide the attribute-name mapping as an explicit, opt-in strategy.
//!
//! # Invariants
//! - `AttributeMapper` never yields a partially populated entity: every
//!   attribute the entity reports must be present on the record.

use crate::model::entity::{Entity, MappingError};
use crate::model::record::PersistenceRecord;
use std::any::type_name;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Converts one persistence record into an entity.
pub trait RecordMapper<E> {
    fn map_record(&self, record: &PersistenceRecord) -> Result<E, MappingError>;
}

impl<E, F> RecordMapper<E> for F
where
    F: Fn(&PersistenceRecord) -> Result<E, MappingError>,
{
    fn map_record(&self, record: &PersistenceRecord) -> Result<E, MappingError> {
        self(record)
    }
}

/// Maps records by copying every same-named attribute onto `E::default()`.
pub struct AttributeMapper<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E> AttributeMapper<E> {
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<E> Default for AttributeMapper<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for AttributeMapper<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E> Debug for AttributeMapper<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AttributeMapper<{}>", type_name::<E>())
    }
}

impl<E: Entity + Default> RecordMapper<E> for AttributeMapper<E> {
    fn map_record(&self, record: &PersistenceRecord) -> Result<E, MappingError> {
        let mut entity = E::default();
        let names = entity.attributes().into_keys().collect::<Vec<_>>();

        for name in names {
            let value = record
                .get(&name)
                .ok_or_else(|| MappingError::MissingField {
                    entity: short_type_name::<E>().to_string(),
                    field: name.clone(),
                })?;
            entity.assign(&name, value)?;
        }

        Ok(entity)
    }
}

fn short_type_name<E>() -> &'static str {
    let full = type_name::<E>();
    full.rsplit("::").next().unwrap_or(full)
}
