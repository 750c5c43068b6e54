//! Storage-shaped records produced and consumed by adapters.

use crate::model::descriptor::{Descriptor, ID_FIELD};
use crate::model::value::{Attributes, FieldValue};

/// Storage identity of one record.
pub type RecordId = i64;

/// Raw record as returned by an adapter.
///
/// Repositories only read a record during a single mapping step and never
/// keep it afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistenceRecord {
    /// `None` until the record has been persisted.
    pub id: Option<RecordId>,
    pub fields: Attributes,
}

impl PersistenceRecord {
    pub fn new(id: Option<RecordId>, fields: Attributes) -> Self {
        Self { id, fields }
    }

    /// Empty, unsaved record with every descriptor field set to `Null`.
    pub fn empty(descriptor: &Descriptor) -> Self {
        let fields = descriptor
            .fields()
            .iter()
            .map(|field| (field.name.clone(), FieldValue::Null))
            .collect();
        Self { id: None, fields }
    }

    /// Reads one attribute by name. `id` resolves to the record identity.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        if name == ID_FIELD {
            return Some(self.id.into());
        }
        self.fields.get(name).cloned()
    }

    /// Returns whether every `(name, value)` pair matches by equality.
    pub fn matches(&self, filter: &Attributes) -> bool {
        filter
            .iter()
            .all(|(name, expected)| self.get(name).as_ref() == Some(expected))
    }
}
