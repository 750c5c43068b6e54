//! In-process adapter backed by ordered maps.
//!
//! # Responsibility
//! - Provide a storage backend with no external dependencies, for tests and
//!   embedded use.
//!
//! # Invariants
//! - Tables are keyed by `Descriptor::table()`; records by id.
//! - Generated ids are `max(existing) + 1`, starting at `1`; past `i64::MAX`
//!   saves fail with `InvalidData` instead of wrapping.
//! - Returned records always carry every declared field, `Null` when unset.

use super::{normalized_filter, writable_fields, Adapter, AdapterError, AdapterResult};
use crate::model::descriptor::Descriptor;
use crate::model::entity::Entity;
use crate::model::filter::Filter;
use crate::model::record::{PersistenceRecord, RecordId};
use crate::model::value::{Attributes, FieldValue};
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;

type Table = BTreeMap<RecordId, Attributes>;

/// Map-backed adapter. Not `Sync`; share it by reference.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    tables: RefCell<BTreeMap<String, Table>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored for `descriptor`.
    pub fn len(&self, descriptor: &Descriptor) -> usize {
        self.tables
            .borrow()
            .get(descriptor.table())
            .map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, descriptor: &Descriptor) -> bool {
        self.len(descriptor) == 0
    }
}

impl Adapter for MemoryAdapter {
    fn find(&self, id: RecordId, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
        let tables = self.tables.borrow();
        tables
            .get(descriptor.table())
            .and_then(|table| table.get(&id))
            .map(|fields| to_record(id, fields, descriptor))
            .ok_or_else(|| AdapterError::NotFound {
                descriptor: descriptor.simple_name().to_string(),
                id,
            })
    }

    fn each(&self, descriptor: &Descriptor) -> AdapterResult<Vec<PersistenceRecord>> {
        let tables = self.tables.borrow();
        Ok(tables
            .get(descriptor.table())
            .map(|table| {
                table
                    .iter()
                    .map(|(id, fields)| to_record(*id, fields, descriptor))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn build(&self, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
        Ok(PersistenceRecord::empty(descriptor))
    }

    fn exists(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<bool> {
        let Some(id) = entity.id() else {
            return Ok(false);
        };
        Ok(self
            .tables
            .borrow()
            .get(descriptor.table())
            .is_some_and(|table| table.contains_key(&id)))
    }

    fn find_where(
        &self,
        filter: &Filter,
        descriptor: &Descriptor,
    ) -> AdapterResult<Vec<PersistenceRecord>> {
        let filter = normalized_filter(filter, descriptor)?;
        let records = self
            .each(descriptor)?
            .into_iter()
            .filter(|record| record.matches(&filter))
            .collect::<Vec<_>>();
        debug!(
            "event=adapter_where module=adapter backend=memory table={} filter_keys={} hits={}",
            descriptor.table(),
            filter.len(),
            records.len()
        );
        Ok(records)
    }

    fn save(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<RecordId> {
        let fields = writable_fields(entity.attributes(), descriptor)?;
        let mut tables = self.tables.borrow_mut();
        let table = tables.entry(descriptor.table().to_string()).or_default();

        let id = match entity.id() {
            Some(id) => id,
            None => next_id(table)?,
        };

        // Updates only touch the attributes the entity reported.
        let stored = table.entry(id).or_default();
        stored.extend(fields);

        debug!(
            "event=adapter_save module=adapter backend=memory table={} id={}",
            descriptor.table(),
            id
        );
        Ok(id)
    }
}

fn next_id(table: &Table) -> AdapterResult<RecordId> {
    match table.keys().next_back() {
        None => Ok(1),
        Some(last) => last.checked_add(1).ok_or_else(|| {
            AdapterError::InvalidData(format!("id space exhausted after {last}"))
        }),
    }
}

fn to_record(id: RecordId, stored: &Attributes, descriptor: &Descriptor) -> PersistenceRecord {
    let fields = descriptor
        .fields()
        .iter()
        .map(|field| {
            let value = stored.get(&field.name).cloned().unwrap_or(FieldValue::Null);
            (field.name.clone(), value)
        })
        .collect();
    PersistenceRecord::new(Some(id), fields)
}
