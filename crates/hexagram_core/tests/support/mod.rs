#![allow(dead_code)]

use hexagram_core::{
    Adapter, AdapterResult, Attributes, Descriptor, Entity, FieldKind, FieldValue, Filter,
    MappingError, MemoryAdapter, PersistenceRecord, RecordId, ValidationContext, Violation,
};
use std::cell::{Cell, RefCell};

pub const CAMPUS_TABLE_SQL: &str = "CREATE TABLE campuses (
    id INTEGER PRIMARY KEY,
    name TEXT,
    abbreviation TEXT,
    value REAL,
    active INTEGER
);";

pub fn campus_descriptor() -> Descriptor {
    Descriptor::builder("Persisters::Campus", "campuses")
        .field("name", FieldKind::Text)
        .field("abbreviation", FieldKind::Text)
        .field("value", FieldKind::Real)
        .field("active", FieldKind::Boolean)
        .build()
        .unwrap()
}

/// Test entity: `name` is required and `abbreviation` must be unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Campus {
    pub id: Option<RecordId>,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub value: Option<f64>,
    pub active: Option<bool>,
}

impl Campus {
    pub fn named(name: &str, abbreviation: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            abbreviation: Some(abbreviation.to_string()),
            ..Self::default()
        }
    }
}

impl Entity for Campus {
    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("id".to_string(), self.id.into());
        attributes.insert("name".to_string(), self.name.clone().into());
        attributes.insert("abbreviation".to_string(), self.abbreviation.clone().into());
        attributes.insert("value".to_string(), self.value.into());
        attributes.insert("active".to_string(), self.active.into());
        attributes
    }

    fn assign(&mut self, name: &str, value: FieldValue) -> Result<(), MappingError> {
        match name {
            "id" => self.id = integer(name, value)?,
            "name" => self.name = text(name, value)?,
            "abbreviation" => self.abbreviation = text(name, value)?,
            "value" => self.value = real(name, value)?,
            "active" => self.active = boolean(name, value)?,
            other => {
                return Err(MappingError::UnknownAttribute {
                    entity: "Campus".to_string(),
                    field: other.to_string(),
                })
            }
        }
        Ok(())
    }

    fn validate(&self, ctx: &dyn ValidationContext) -> AdapterResult<Vec<Violation>> {
        let mut violations = Vec::new();

        if self.name.as_deref().map_or(true, |name| name.trim().is_empty()) {
            violations.push(Violation::new("name", "can't be blank"));
        }

        if let Some(abbreviation) = &self.abbreviation {
            let filter = Filter::single("abbreviation", abbreviation.as_str());
            if !ctx.unique_except(&filter, self.id)? {
                violations.push(Violation::new("abbreviation", "has already been taken"));
            }
        }

        Ok(violations)
    }
}

fn integer(name: &str, value: FieldValue) -> Result<Option<i64>, MappingError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Integer(value) => Ok(Some(value)),
        other => Err(MappingError::type_mismatch(name, "integer", &other)),
    }
}

fn text(name: &str, value: FieldValue) -> Result<Option<String>, MappingError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Text(value) => Ok(Some(value)),
        other => Err(MappingError::type_mismatch(name, "text", &other)),
    }
}

fn real(name: &str, value: FieldValue) -> Result<Option<f64>, MappingError> {
    match value {
        FieldValue::Null => Ok(None),
        other => other
            .as_f64()
            .map(Some)
            .ok_or_else(|| MappingError::type_mismatch(name, "real", &other)),
    }
}

fn boolean(name: &str, value: FieldValue) -> Result<Option<bool>, MappingError> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Bool(value) => Ok(Some(value)),
        other => Err(MappingError::type_mismatch(name, "bool", &other)),
    }
}

/// One adapter call observed by [`RecordingAdapter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Find(RecordId),
    Each,
    Build,
    Exists(Option<RecordId>),
    Where(Filter),
    Save(Option<RecordId>, String),
}

/// Memory-backed adapter that records every call it receives.
///
/// `exists` and `find_where` answers can be scripted to observe pure
/// delegation.
#[derive(Default)]
pub struct RecordingAdapter {
    pub inner: MemoryAdapter,
    calls: RefCell<Vec<Call>>,
    exists_answer: Cell<Option<bool>>,
    where_answer: RefCell<Option<Vec<PersistenceRecord>>>,
}

impl RecordingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_exists(&self, answer: bool) {
        self.exists_answer.set(Some(answer));
    }

    pub fn script_where(&self, answer: Vec<PersistenceRecord>) {
        *self.where_answer.borrow_mut() = Some(answer);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn save_calls(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, Call::Save(..)))
            .count()
    }

    pub fn where_calls(&self) -> Vec<Filter> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Where(filter) => Some(filter.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl Adapter for RecordingAdapter {
    fn find(&self, id: RecordId, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
        self.record(Call::Find(id));
        self.inner.find(id, descriptor)
    }

    fn each(&self, descriptor: &Descriptor) -> AdapterResult<Vec<PersistenceRecord>> {
        self.record(Call::Each);
        self.inner.each(descriptor)
    }

    fn build(&self, descriptor: &Descriptor) -> AdapterResult<PersistenceRecord> {
        self.record(Call::Build);
        self.inner.build(descriptor)
    }

    fn exists(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<bool> {
        self.record(Call::Exists(entity.id()));
        match self.exists_answer.get() {
            Some(answer) => Ok(answer),
            None => self.inner.exists(entity, descriptor),
        }
    }

    fn find_where(
        &self,
        filter: &Filter,
        descriptor: &Descriptor,
    ) -> AdapterResult<Vec<PersistenceRecord>> {
        self.record(Call::Where(filter.clone()));
        match self.where_answer.borrow().as_ref() {
            Some(answer) => Ok(answer.clone()),
            None => self.inner.find_where(filter, descriptor),
        }
    }

    fn save(&self, entity: &dyn Entity, descriptor: &Descriptor) -> AdapterResult<RecordId> {
        self.record(Call::Save(entity.id(), descriptor.name().to_string()));
        self.inner.save(entity, descriptor)
    }
}
