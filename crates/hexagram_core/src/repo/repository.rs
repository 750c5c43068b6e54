//! Generic entity repository over an adapter.
//!
//! # Responsibility
//! - Bind one entity type to one descriptor, adapter and mapper.
//! - Gate every write behind entity validation.
//! - Map adapter records into entities on every read path.
//!
//! # Invariants
//! - An invalid entity never reaches `Adapter::save`.
//! - Adapter errors are carried unchanged inside `RepoError::Adapter`.
//! - The repository holds no mutable state after construction.

use super::mapper::{AttributeMapper, RecordMapper};
use crate::adapter::{Adapter, AdapterError, AdapterResult};
use crate::model::descriptor::Descriptor;
use crate::model::entity::{Entity, MappingError, ValidationContext, Violation};
use crate::model::filter::Filter;
use crate::model::record::{PersistenceRecord, RecordId};
use crate::model::value::Attributes;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository-level error.
#[derive(Debug)]
pub enum RepoError {
    /// Error raised by the adapter, passed through untouched.
    Adapter(AdapterError),
    Mapping(MappingError),
    /// Only produced by [`SaveOutcome::into_result`].
    ValidationFailed {
        entity: String,
        violations: Vec<Violation>,
    },
}

impl RepoError {
    /// Returns the adapter error when this is an adapter failure.
    pub fn as_adapter(&self) -> Option<&AdapterError> {
        match self {
            Self::Adapter(err) => Some(err),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Adapter(err) => write!(f, "{err}"),
            Self::Mapping(err) => write!(f, "{err}"),
            Self::ValidationFailed { entity, violations } => {
                let details = violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "{entity} failed validation: {details}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Adapter(err) => Some(err),
            Self::Mapping(err) => Some(err),
            Self::ValidationFailed { .. } => None,
        }
    }
}

impl From<AdapterError> for RepoError {
    fn from(value: AdapterError) -> Self {
        Self::Adapter(value)
    }
}

impl From<MappingError> for RepoError {
    fn from(value: MappingError) -> Self {
        Self::Mapping(value)
    }
}

/// Result of a gated write.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum SaveOutcome {
    /// The adapter persisted the entity under `id`.
    Saved { id: RecordId },
    /// The entity was rejected; the adapter was not called.
    ValidationFailed(Vec<Violation>),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    pub fn saved_id(&self) -> Option<RecordId> {
        match self {
            Self::Saved { id } => Some(*id),
            Self::ValidationFailed(_) => None,
        }
    }

    /// Converts a rejection into `RepoError::ValidationFailed`.
    pub fn into_result(self, entity: &str) -> RepoResult<RecordId> {
        match self {
            Self::Saved { id } => Ok(id),
            Self::ValidationFailed(violations) => Err(RepoError::ValidationFailed {
                entity: entity.to_string(),
                violations,
            }),
        }
    }
}

/// Entity-oriented façade over one adapter and descriptor.
pub struct Repository<E, A, M> {
    descriptor: Descriptor,
    adapter: A,
    mapper: M,
    _entity: PhantomData<fn() -> E>,
}

impl<E, A> Repository<E, A, AttributeMapper<E>>
where
    E: Entity + Default,
    A: Adapter,
{
    /// Creates a repository that maps records by attribute name.
    pub fn with_attribute_mapping(descriptor: Descriptor, adapter: A) -> Self {
        Self::new(descriptor, adapter, AttributeMapper::new())
    }
}

impl<E, A, M> Repository<E, A, M>
where
    E: Entity,
    A: Adapter,
    M: RecordMapper<E>,
{
    /// Creates a repository with an explicit record -> entity mapper.
    pub fn new(descriptor: Descriptor, adapter: A, mapper: M) -> Self {
        Self {
            descriptor,
            adapter,
            mapper,
            _entity: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Loads and maps one entity.
    ///
    /// # Errors
    /// - `RepoError::Adapter(AdapterError::NotFound { .. })` for unknown ids.
    pub fn find(&self, id: RecordId) -> RepoResult<E> {
        debug!(
            "event=entity_find module=repo entity={} id={}",
            self.descriptor.simple_name(),
            id
        );
        let record = self.adapter.find(id, &self.descriptor)?;
        self.map_record(&record)
    }

    /// Returns a fresh, unsaved entity with every attribute empty.
    pub fn build(&self) -> RepoResult<E> {
        let record = self.adapter.build(&self.descriptor)?;
        self.map_record(&record)
    }

    /// Same as [`Repository::build`], then assigns `initial` onto the entity.
    pub fn build_with(&self, initial: Attributes) -> RepoResult<E> {
        let mut entity = self.build()?;
        for (name, value) in initial {
            entity.assign(&name, value)?;
        }
        Ok(entity)
    }

    /// Loads and maps every persisted entity, in id order.
    pub fn all(&self) -> RepoResult<Vec<E>> {
        let records = self.adapter.each(&self.descriptor)?;
        self.map_records(&records)
    }

    /// Persists `entity` when it passes validation.
    ///
    /// Invalid entities are reported as `SaveOutcome::ValidationFailed` and
    /// the adapter is not called.
    pub fn save(&self, entity: &E) -> RepoResult<SaveOutcome> {
        let violations = self.validate(entity)?;
        if !violations.is_empty() {
            warn!(
                "event=entity_save module=repo status=rejected entity={} id={} violations={}",
                self.descriptor.simple_name(),
                format_id(entity.id()),
                violations.len()
            );
            return Ok(SaveOutcome::ValidationFailed(violations));
        }

        let id = self.adapter.save(entity, &self.descriptor)?;
        info!(
            "event=entity_save module=repo status=ok entity={} id={}",
            self.descriptor.simple_name(),
            id
        );
        Ok(SaveOutcome::Saved { id })
    }

    /// Alias of [`Repository::save`]; the adapter decides insert vs update.
    pub fn update(&self, entity: &E) -> RepoResult<SaveOutcome> {
        self.save(entity)
    }

    /// Returns exactly what the adapter reports.
    pub fn exists(&self, entity: &E) -> RepoResult<bool> {
        Ok(self.adapter.exists(entity, &self.descriptor)?)
    }

    /// Returns whether `entity` reports no violations.
    pub fn valid(&self, entity: &E) -> RepoResult<bool> {
        Ok(self.validate(entity)?.is_empty())
    }

    /// Runs the entity's own rules with this repository as context.
    pub fn validate(&self, entity: &E) -> RepoResult<Vec<Violation>> {
        Ok(entity.validate(self)?)
    }

    /// Loads and maps every entity matching `filter`.
    pub fn find_where(&self, filter: &Filter) -> RepoResult<Vec<E>> {
        let records = self.adapter.find_where(filter, &self.descriptor)?;
        self.map_records(&records)
    }

    /// Unmapped variant of [`Repository::find_where`].
    pub fn find_where_records(&self, filter: &Filter) -> RepoResult<Vec<PersistenceRecord>> {
        Ok(self.adapter.find_where(filter, &self.descriptor)?)
    }

    /// True when no persisted record matches any single pair of `attributes`.
    ///
    /// Issues one single-pair query per key, in key order, and stops at the
    /// first match.
    pub fn unique(&self, attributes: &Filter) -> RepoResult<bool> {
        Ok(self.check_unique(attributes, None)?)
    }

    /// Same as [`Repository::unique`], ignoring the record `except`.
    pub fn unique_except(&self, attributes: &Filter, except: Option<RecordId>) -> RepoResult<bool> {
        Ok(self.check_unique(attributes, except)?)
    }

    fn check_unique(&self, attributes: &Filter, except: Option<RecordId>) -> AdapterResult<bool> {
        for (name, value) in attributes.iter() {
            let hits = self
                .adapter
                .find_where(&Filter::single(name, value.clone()), &self.descriptor)?;
            if hits.iter().any(|record| except.is_none() || record.id != except) {
                debug!(
                    "event=entity_unique module=repo entity={} field={} status=taken",
                    self.descriptor.simple_name(),
                    name
                );
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn map_record(&self, record: &PersistenceRecord) -> RepoResult<E> {
        Ok(self.mapper.map_record(record)?)
    }

    fn map_records(&self, records: &[PersistenceRecord]) -> RepoResult<Vec<E>> {
        records.iter().map(|record| self.map_record(record)).collect()
    }
}

impl<E, A, M> ValidationContext for Repository<E, A, M>
where
    E: Entity,
    A: Adapter,
    M: RecordMapper<E>,
{
    fn find_where_records(&self, filter: &Filter) -> AdapterResult<Vec<PersistenceRecord>> {
        self.adapter.find_where(filter, &self.descriptor)
    }

    fn unique(&self, attributes: &Filter) -> AdapterResult<bool> {
        self.check_unique(attributes, None)
    }

    fn unique_except(
        &self,
        attributes: &Filter,
        except: Option<RecordId>,
    ) -> AdapterResult<bool> {
        self.check_unique(attributes, except)
    }
}

fn format_id(id: Option<RecordId>) -> String {
    id.map_or_else(|| "new".to_string(), |id| id.to_string())
}
